pub mod intake;
pub mod media;

pub use intake::{NotificationMode, OrderIntake, Reconciliation, Submission};
pub use media::{MediaLibrary, MediaUpload};
