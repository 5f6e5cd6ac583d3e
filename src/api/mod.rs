//! Outbound integrations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{domain::NotificationOutcome, models::OrderWithItems};

pub mod webhook;

pub use webhook::WebhookNotifier;

/// Body posted to the fulfillment automation endpoint for every new order.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OrderPayload {
    pub order_id: Uuid,
    pub order_type: String,
    pub customer_name: String,
    pub phone: String,
    pub telegram: Option<String>,
    pub city: Option<String>,
    pub delivery_method: String,
    pub comment: Option<String>,
    pub items: Vec<OrderPayloadItem>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OrderPayloadItem {
    pub product_code: String,
    pub color: String,
    pub qty: i32,
    pub price_snapshot: f64,
}

impl From<&OrderWithItems> for OrderPayload {
    fn from(value: &OrderWithItems) -> Self {
        let order = &value.order;
        Self {
            order_id: order.id,
            order_type: order.order_type.clone(),
            customer_name: order.customer_name.clone(),
            phone: order.phone.clone(),
            telegram: order.telegram.clone(),
            city: order.city.clone(),
            delivery_method: order.delivery_method.clone(),
            comment: order.comment.clone(),
            items: value
                .items
                .iter()
                .map(|item| OrderPayloadItem {
                    product_code: item.product_code.clone(),
                    color: item.color.clone(),
                    qty: item.qty,
                    price_snapshot: item.price_snapshot,
                })
                .collect(),
            created_at: order.created_at,
        }
    }
}

/// Informs an external system about a new order.
///
/// Implementations never fail: every problem is reported as
/// [`NotificationOutcome::Failed`].
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    async fn notify(&self, payload: &OrderPayload) -> NotificationOutcome;
}
