//! Typed vocabulary shared by the repositories, services and routes.
//!
//! Entities in [`crate::models`] keep these values as plain strings, the same
//! way they are stored. Everything crossing the HTTP boundary is parsed into
//! the enums below first, so unknown values are rejected instead of persisted.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderType {
    Retail,
    /// Dropship order priced at the distributor rate.
    Drop,
    Wholesale,
}

/// Operator-controlled fulfillment stage of an order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    New,
    Confirmed,
    Packed,
    Shipped,
    Completed,
    Canceled,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Canceled)
    }

    /// Rank along the forward fulfillment chain. `Canceled` sits outside of it.
    fn stage(self) -> Option<u8> {
        match self {
            OrderStatus::New => Some(0),
            OrderStatus::Confirmed => Some(1),
            OrderStatus::Packed => Some(2),
            OrderStatus::Shipped => Some(3),
            OrderStatus::Completed => Some(4),
            OrderStatus::Canceled => None,
        }
    }

    /// Whether an operator may move an order from `self` to `next`.
    ///
    /// Moves go forward along `new → confirmed → packed → shipped → completed`
    /// (stages may be skipped), and `canceled` is reachable from every
    /// non-terminal state. Terminal states never change.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.stage(), next.stage()) {
            (_, None) => true,
            (Some(current), Some(next)) => next > current,
            (None, Some(_)) => false,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryMethod {
    /// Nova Poshta branch or parcel locker.
    Nova,
    /// Ukrposhta.
    Ukr,
    Courier,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationStatus {
    Success,
    Failed,
}

/// Result of informing the fulfillment automation endpoint about an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationOutcome {
    Success,
    Failed { error: String },
}

impl NotificationOutcome {
    pub fn failed(error: impl Into<String>) -> Self {
        let error = error.into();
        if error.trim().is_empty() {
            NotificationOutcome::Failed {
                error: "unknown error".into(),
            }
        } else {
            NotificationOutcome::Failed { error }
        }
    }

    pub fn status(&self) -> NotificationStatus {
        match self {
            NotificationOutcome::Success => NotificationStatus::Success,
            NotificationOutcome::Failed { .. } => NotificationStatus::Failed,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            NotificationOutcome::Success => None,
            NotificationOutcome::Failed { error } => Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, NotificationOutcome::Success)
    }

    /// Rebuilds an outcome from the stored `notification_status` /
    /// `notification_error` columns. `None` means nothing was recorded yet.
    pub fn from_columns(status: Option<&str>, error: Option<&str>) -> Option<Self> {
        match status?.parse::<NotificationStatus>().ok()? {
            NotificationStatus::Success => Some(NotificationOutcome::Success),
            NotificationStatus::Failed => Some(NotificationOutcome::failed(error.unwrap_or_default())),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MediaType {
    Photo,
    Video,
}

impl MediaType {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        if content_type.starts_with("video/") {
            Some(MediaType::Video)
        } else if content_type.starts_with("image/") {
            Some(MediaType::Photo)
        } else {
            None
        }
    }

    /// Folder under `products/{code}/` holding objects of this type.
    pub fn folder(self) -> &'static str {
        match self {
            MediaType::Photo => "images",
            MediaType::Video => "video",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    Preorder,
    OutOfStock,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Locale {
    Uk,
    Ru,
}

/// Color variant of a product with its own prices. `colors_json` holds a list
/// of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductColor {
    pub color: String,
    pub price_retail: f64,
    pub price_drop: f64,
}

// Order submission

/// Raw order submission as posted by the storefront order form.
///
/// Every field is optional at this level so that missing values are reported
/// through [`ValidationErrors`] together with the other problems.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SubmitOrderReq {
    #[serde(default)]
    pub order_type: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub telegram: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub delivery_method: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<SubmitOrderItemReq>>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SubmitOrderItemReq {
    #[serde(default)]
    pub product_code: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub qty: Option<i64>,
    #[serde(default)]
    pub price_snapshot: Option<f64>,
}

/// A validated order, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewOrder {
    pub order_type: OrderType,
    pub customer_name: String,
    pub phone: String,
    pub telegram: Option<String>,
    pub city: Option<String>,
    pub delivery_method: DeliveryMethod,
    pub comment: Option<String>,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewOrderItem {
    pub product_code: String,
    pub color: String,
    pub qty: i32,
    /// Unit price at the moment of ordering. Never recalculated.
    pub price_snapshot: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("validation failed: {}", .errors.iter().map(|e| format!("{}: {}", e.field, e.message)).collect::<Vec<_>>().join(", "))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

/// Empty and whitespace-only text is stored as `None`, never as `""`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_text(value: Option<String>, field: &str, errors: &mut ValidationErrors) -> String {
    match normalize_optional(value) {
        Some(value) => value,
        None => {
            errors.push(field, "is required");
            String::new()
        }
    }
}

fn required_enum<T: std::str::FromStr>(
    value: Option<String>,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<T> {
    let Some(raw) = normalize_optional(value) else {
        errors.push(field, "is required");
        return None;
    };
    match raw.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            errors.push(field, format!("'{raw}' is not a recognized value"));
            None
        }
    }
}

impl TryFrom<SubmitOrderReq> for NewOrder {
    type Error = ValidationErrors;

    fn try_from(req: SubmitOrderReq) -> Result<Self, Self::Error> {
        let mut errors = ValidationErrors::default();

        let order_type = required_enum::<OrderType>(req.order_type, "order_type", &mut errors);
        let customer_name = required_text(req.customer_name, "customer_name", &mut errors);
        let phone = required_text(req.phone, "phone", &mut errors);
        let delivery_method =
            required_enum::<DeliveryMethod>(req.delivery_method, "delivery_method", &mut errors);

        let raw_items = req.items.unwrap_or_default();
        if raw_items.is_empty() {
            errors.push("items", "must contain at least one item");
        }

        let mut items = Vec::with_capacity(raw_items.len());
        for (idx, item) in raw_items.into_iter().enumerate() {
            let product_code =
                required_text(item.product_code, &format!("items[{idx}].product_code"), &mut errors);
            let color = required_text(item.color, &format!("items[{idx}].color"), &mut errors);

            let qty = match item.qty {
                Some(qty) if qty >= 1 && qty <= i32::MAX as i64 => qty as i32,
                Some(_) => {
                    errors.push(format!("items[{idx}].qty"), "must be a positive integer");
                    0
                }
                None => {
                    errors.push(format!("items[{idx}].qty"), "is required");
                    0
                }
            };

            let price_snapshot = match item.price_snapshot {
                Some(price) if price.is_finite() && price >= 0.0 => price,
                Some(_) => {
                    errors.push(format!("items[{idx}].price_snapshot"), "must be a non-negative number");
                    0.0
                }
                None => {
                    errors.push(format!("items[{idx}].price_snapshot"), "is required");
                    0.0
                }
            };

            items.push(NewOrderItem {
                product_code,
                color,
                qty,
                price_snapshot,
            });
        }

        match (order_type, delivery_method) {
            (Some(order_type), Some(delivery_method)) if errors.is_empty() => Ok(NewOrder {
                order_type,
                customer_name,
                phone,
                telegram: normalize_optional(req.telegram),
                city: normalize_optional(req.city),
                delivery_method,
                comment: normalize_optional(req.comment),
                items,
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_req() -> SubmitOrderReq {
        SubmitOrderReq {
            order_type: Some("retail".into()),
            customer_name: Some("Olena K.".into()),
            phone: Some("+380501112233".into()),
            telegram: Some("".into()),
            city: Some("  ".into()),
            delivery_method: Some("nova".into()),
            comment: None,
            items: Some(vec![SubmitOrderItemReq {
                product_code: Some("BAG-042".into()),
                color: Some("чорний".into()),
                qty: Some(1),
                price_snapshot: Some(740.0),
            }]),
        }
    }

    #[test]
    fn valid_submission_normalizes_optional_fields() {
        let order = NewOrder::try_from(valid_req()).unwrap();
        assert_eq!(order.order_type, OrderType::Retail);
        assert_eq!(order.delivery_method, DeliveryMethod::Nova);
        assert_eq!(order.telegram, None);
        assert_eq!(order.city, None);
        assert_eq!(order.comment, None);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].price_snapshot, 740.0);
    }

    #[test]
    fn empty_items_are_rejected() {
        let mut req = valid_req();
        req.items = Some(vec![]);
        let errors = NewOrder::try_from(req).unwrap_err();
        assert!(errors.contains("items"));

        let mut req = valid_req();
        req.items = None;
        assert!(NewOrder::try_from(req).unwrap_err().contains("items"));
    }

    #[test]
    fn all_problems_are_reported_together() {
        let req = SubmitOrderReq {
            order_type: Some("bulk".into()),
            delivery_method: Some("pigeon".into()),
            items: Some(vec![SubmitOrderItemReq {
                product_code: Some("BAG-1".into()),
                color: None,
                qty: Some(0),
                price_snapshot: Some(-5.0),
            }]),
            ..Default::default()
        };
        let errors = NewOrder::try_from(req).unwrap_err();
        for field in [
            "order_type",
            "customer_name",
            "phone",
            "delivery_method",
            "items[0].color",
            "items[0].qty",
            "items[0].price_snapshot",
        ] {
            assert!(errors.contains(field), "missing error for {field}: {errors}");
        }
    }

    #[test]
    fn status_transitions_follow_the_fulfillment_chain() {
        use OrderStatus::*;
        assert!(New.can_transition_to(Confirmed));
        assert!(New.can_transition_to(Shipped));
        assert!(Packed.can_transition_to(Canceled));
        assert!(!Shipped.can_transition_to(Confirmed));
        assert!(!Completed.can_transition_to(Canceled));
        assert!(!Canceled.can_transition_to(New));
        assert!(!New.can_transition_to(New));
    }

    #[test]
    fn outcome_round_trips_through_columns() {
        assert_eq!(NotificationOutcome::from_columns(None, None), None);
        assert_eq!(
            NotificationOutcome::from_columns(Some("success"), None),
            Some(NotificationOutcome::Success)
        );
        let failed = NotificationOutcome::from_columns(Some("failed"), Some("HTTP 502")).unwrap();
        assert_eq!(failed.error(), Some("HTTP 502"));
        let blank = NotificationOutcome::from_columns(Some("failed"), None).unwrap();
        assert!(!blank.error().unwrap().is_empty());
    }
}
