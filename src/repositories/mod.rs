//! Persistence layer.
//!
//! Every table is reached through one of the traits below. [`PgRepository`]
//! is the production backend; [`MemoryRepository`] keeps everything in process
//! and backs the test-suite as well as database-less local runs.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    domain::{NewOrder, NotificationOutcome, OrderStatus},
    models::{
        CategoryEntity, CreateCategoryEntity, CreateProductEntity, CreateProductMediaEntity,
        OrderEntity, OrderWithItems, ProductDetails, ProductEntity, ProductMediaEntity,
        SaveSettingsEntity, SettingsEntity, UpdateProductEntity,
    },
    platform::retry::RetryPolicy,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,
    #[error("{0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(diesel::result::Error),
    #[error("Connection pool error: {0}")]
    Pool(String),
}

impl From<diesel::result::Error> for RepositoryError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match err {
            Error::NotFound => RepositoryError::NotFound,
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                RepositoryError::Conflict(info.message().to_string())
            }
            Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                RepositoryError::NotFound
            }
            err => RepositoryError::Database(err),
        }
    }
}

/// Retries only failures that may go away on their own.
pub struct TransientRepositoryErrors;

impl RetryPolicy<RepositoryError> for TransientRepositoryErrors {
    fn is_retryable(&self, error: &RepositoryError) -> bool {
        use diesel::result::{DatabaseErrorKind, Error};

        match error {
            RepositoryError::Pool(_) => true,
            RepositoryError::Database(Error::DatabaseError(kind, _)) => matches!(
                kind,
                DatabaseErrorKind::SerializationFailure
                    | DatabaseErrorKind::ClosedConnection
                    | DatabaseErrorKind::UnableToSendCommand
            ),
            RepositoryError::Database(Error::BrokenTransactionManager) => true,
            _ => false,
        }
    }
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persists the header (status `new`) and all items atomically.
    async fn create_order(&self, order: NewOrder) -> Result<OrderWithItems, RepositoryError>;

    /// Records the notification outcome. Applies only while no outcome has been
    /// recorded yet; otherwise `NotFound`.
    async fn record_notification(
        &self,
        order_id: Uuid,
        outcome: &NotificationOutcome,
    ) -> Result<(), RepositoryError>;

    /// All orders with their items, newest first.
    async fn list_orders(&self) -> Result<Vec<OrderWithItems>, RepositoryError>;

    async fn get_order(&self, order_id: Uuid) -> Result<OrderWithItems, RepositoryError>;

    /// Compare-and-set of the fulfillment status. `Conflict` when the stored
    /// status is no longer `expected`.
    async fn update_status(
        &self,
        order_id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> Result<OrderEntity, RepositoryError>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Ordered by `sort_order`, newest first within the same position.
    async fn list_products(&self) -> Result<Vec<ProductDetails>, RepositoryError>;

    async fn get_product(&self, product_id: Uuid) -> Result<ProductDetails, RepositoryError>;

    /// Inserts the product and links it to `category_ids` atomically. An
    /// unknown category is `NotFound` and nothing is stored.
    async fn create_product(
        &self,
        product: CreateProductEntity,
        category_ids: Vec<Uuid>,
    ) -> Result<ProductDetails, RepositoryError>;

    /// Applies `changes`. `Some(category_ids)` replaces every category link of
    /// the product in the same transaction.
    async fn update_product(
        &self,
        product_id: Uuid,
        changes: UpdateProductEntity,
        category_ids: Option<Vec<Uuid>>,
    ) -> Result<ProductDetails, RepositoryError>;

    /// Deletes the product, its media records and its category links.
    async fn delete_product(&self, product_id: Uuid) -> Result<ProductEntity, RepositoryError>;

    /// Active categories ordered by `sort_order`.
    async fn list_categories(&self) -> Result<Vec<CategoryEntity>, RepositoryError>;

    async fn create_category(
        &self,
        category: CreateCategoryEntity,
    ) -> Result<CategoryEntity, RepositoryError>;
}

#[async_trait]
pub trait MediaRepository: Send + Sync {
    async fn list_media(&self, product_id: Uuid) -> Result<Vec<ProductMediaEntity>, RepositoryError>;

    async fn get_media(&self, media_id: Uuid) -> Result<ProductMediaEntity, RepositoryError>;

    /// Inserts the record after the product's last media item. The `position`
    /// of `media` is ignored.
    async fn create_media(
        &self,
        media: CreateProductMediaEntity,
    ) -> Result<ProductMediaEntity, RepositoryError>;

    async fn delete_media(&self, media_id: Uuid) -> Result<ProductMediaEntity, RepositoryError>;

    /// Makes `media_id` the only primary media item of `product_id`.
    async fn set_primary(
        &self,
        media_id: Uuid,
        product_id: Uuid,
    ) -> Result<ProductMediaEntity, RepositoryError>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get_settings(&self) -> Result<SettingsEntity, RepositoryError>;

    async fn save_settings(
        &self,
        settings: SaveSettingsEntity,
    ) -> Result<SettingsEntity, RepositoryError>;
}
