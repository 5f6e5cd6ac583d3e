use std::sync::Arc;

use crate::{
    api::OrderNotifier,
    repositories::{CatalogRepository, MediaRepository, OrderRepository, SettingsRepository},
    services::{MediaLibrary, NotificationMode, OrderIntake},
    storage::ObjectStorage,
};

#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<dyn OrderRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub settings: Arc<dyn SettingsRepository>,
    pub intake: Arc<OrderIntake>,
    pub media: Arc<MediaLibrary>,
}

impl AppState {
    /// Wires every service onto one repository backend.
    pub fn new<R>(
        repository: Arc<R>,
        notifier: Arc<dyn OrderNotifier>,
        storage: Arc<dyn ObjectStorage>,
        mode: NotificationMode,
    ) -> Self
    where
        R: OrderRepository + CatalogRepository + MediaRepository + SettingsRepository + 'static,
    {
        let intake = OrderIntake::new(repository.clone(), notifier, mode);
        Self::with_intake(repository, intake, storage)
    }

    /// Like [`AppState::new`], with a pre-built intake coordinator.
    pub fn with_intake<R>(
        repository: Arc<R>,
        intake: OrderIntake,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self
    where
        R: OrderRepository + CatalogRepository + MediaRepository + SettingsRepository + 'static,
    {
        Self {
            orders: repository.clone(),
            catalog: repository.clone(),
            settings: repository.clone(),
            media: Arc::new(MediaLibrary::new(repository, storage)),
            intake: Arc::new(intake),
        }
    }
}
