use chrono::{DateTime, Utc};
use diesel::{
    Selectable,
    prelude::{AsChangeset, Identifiable, Insertable, Queryable},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::NotificationOutcome;

// Orders

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderEntity {
    pub id: Uuid,
    pub order_type: String,
    pub customer_name: String,
    pub phone: String,
    pub telegram: Option<String>,
    pub city: Option<String>,
    pub delivery_method: String,
    pub comment: Option<String>,
    pub status: String,
    pub notification_status: Option<String>,
    pub notification_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderEntity {
    pub fn notification_outcome(&self) -> Option<NotificationOutcome> {
        NotificationOutcome::from_columns(
            self.notification_status.as_deref(),
            self.notification_error.as_deref(),
        )
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateOrderEntity {
    pub order_type: String,
    pub customer_name: String,
    pub phone: String,
    pub telegram: Option<String>,
    pub city: Option<String>,
    pub delivery_method: String,
    pub comment: Option<String>,
    pub status: String,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemEntity {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_code: String,
    pub color: String,
    pub qty: i32,
    pub price_snapshot: f64,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateOrderItemEntity {
    pub order_id: Uuid,
    pub position: i32,
    pub product_code: String,
    pub color: String,
    pub qty: i32,
    pub price_snapshot: f64,
}

/// An order header together with its line items, in submission order.
#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct OrderWithItems {
    pub order: OrderEntity,
    pub items: Vec<OrderItemEntity>,
}

impl OrderWithItems {
    pub fn total_price(&self) -> f64 {
        self.items
            .iter()
            .map(|item| item.qty as f64 * item.price_snapshot)
            .sum()
    }
}

// Catalog

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductEntity {
    pub id: Uuid,
    pub code: String,
    pub slug: String,
    pub name_uk: String,
    pub name_ru: Option<String>,
    pub description_uk: String,
    pub description_ru: Option<String>,
    pub material_uk: String,
    pub material_ru: Option<String>,
    pub size_text: String,
    /// Array of `{color, price_retail, price_drop}` objects.
    pub colors_json: serde_json::Value,
    pub price_retail: f64,
    pub price_drop: f64,
    pub stock_status: String,
    pub is_new: bool,
    pub is_hit: bool,
    pub is_sale: bool,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn no_colors() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}

#[derive(Insertable, Deserialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateProductEntity {
    pub code: String,
    pub slug: String,
    pub name_uk: String,
    #[serde(default)]
    pub name_ru: Option<String>,
    #[serde(default)]
    pub description_uk: String,
    #[serde(default)]
    pub description_ru: Option<String>,
    #[serde(default)]
    pub material_uk: String,
    #[serde(default)]
    pub material_ru: Option<String>,
    #[serde(default)]
    pub size_text: String,
    #[serde(default = "no_colors")]
    pub colors_json: serde_json::Value,
    pub price_retail: f64,
    pub price_drop: f64,
    pub stock_status: String,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_hit: bool,
    #[serde(default)]
    pub is_sale: bool,
    pub is_active: bool,
    pub sort_order: i32,
}

#[derive(AsChangeset, Deserialize, Debug, Clone, Default, ToSchema)]
#[diesel(table_name = crate::schema::products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UpdateProductEntity {
    pub slug: Option<String>,
    pub name_uk: Option<String>,
    pub name_ru: Option<String>,
    pub description_uk: Option<String>,
    pub description_ru: Option<String>,
    pub material_uk: Option<String>,
    pub material_ru: Option<String>,
    pub size_text: Option<String>,
    pub colors_json: Option<serde_json::Value>,
    pub price_retail: Option<f64>,
    pub price_drop: Option<f64>,
    pub stock_status: Option<String>,
    pub is_new: Option<bool>,
    pub is_hit: Option<bool>,
    pub is_sale: Option<bool>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

impl UpdateProductEntity {
    pub fn is_empty(&self) -> bool {
        self.slug.is_none()
            && self.name_uk.is_none()
            && self.name_ru.is_none()
            && self.description_uk.is_none()
            && self.description_ru.is_none()
            && self.material_uk.is_none()
            && self.material_ru.is_none()
            && self.size_text.is_none()
            && self.colors_json.is_none()
            && self.price_retail.is_none()
            && self.price_drop.is_none()
            && self.stock_status.is_none()
            && self.is_new.is_none()
            && self.is_hit.is_none()
            && self.is_sale.is_none()
            && self.is_active.is_none()
            && self.sort_order.is_none()
    }
}

/// A product with the ids of the categories it is listed under.
#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
pub struct ProductDetails {
    #[serde(flatten)]
    pub product: ProductEntity,
    pub category_ids: Vec<Uuid>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CategoryEntity {
    pub id: Uuid,
    pub slug: String,
    pub name_uk: String,
    pub name_ru: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateCategoryEntity {
    pub slug: String,
    pub name_uk: String,
    #[serde(default)]
    pub name_ru: Option<String>,
    #[serde(default = "active")]
    pub is_active: bool,
    #[serde(default)]
    pub sort_order: i32,
}

fn active() -> bool {
    true
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::product_categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductCategoryEntity {
    pub product_id: Uuid,
    pub category_id: Uuid,
}

// Media

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::product_media)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductMediaEntity {
    pub id: Uuid,
    pub product_id: Uuid,
    pub media_type: String,
    pub url: String,
    pub storage_path: Option<String>,
    pub position: i32,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::product_media)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateProductMediaEntity {
    pub product_id: Uuid,
    pub media_type: String,
    pub url: String,
    pub storage_path: Option<String>,
    pub position: i32,
    pub is_primary: bool,
}

// Settings

#[derive(Queryable, Selectable, Serialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::settings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SettingsEntity {
    pub id: i32,
    pub brand_name: String,
    pub phone: String,
    pub instagram_url: String,
    pub facebook_url: String,
    pub telegram_url: String,
    pub default_locale: String,
    pub updated_at: DateTime<Utc>,
}

impl Default for SettingsEntity {
    fn default() -> Self {
        Self {
            id: SettingsEntity::SINGLETON_ID,
            brand_name: String::new(),
            phone: String::new(),
            instagram_url: String::new(),
            facebook_url: String::new(),
            telegram_url: String::new(),
            default_locale: "uk".into(),
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl SettingsEntity {
    pub const SINGLETON_ID: i32 = 1;
}

#[derive(Insertable, AsChangeset, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[diesel(table_name = crate::schema::settings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SaveSettingsEntity {
    pub brand_name: String,
    pub phone: String,
    pub instagram_url: String,
    pub facebook_url: String,
    pub telegram_url: String,
    pub default_locale: String,
}
