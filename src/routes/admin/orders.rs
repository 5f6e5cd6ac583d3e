use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    domain::OrderStatus,
    models::{OrderEntity, OrderItemEntity, OrderWithItems},
    platform::{
        app_error::{AppError, AppJson, ErrorResponse, StdResponse},
        app_state::AppState,
    },
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/api/admin/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_orders))
            .routes(utoipa_axum::routes!(get_order))
            .routes(utoipa_axum::routes!(update_order_status)),
    )
}

/// One row of the order ledger: the order with its notification outcome,
/// its items and the computed total.
#[derive(Serialize, ToSchema)]
pub struct OrderLedgerEntry {
    pub order: OrderEntity,
    pub items: Vec<OrderItemEntity>,
    pub total_price: f64,
}

impl From<OrderWithItems> for OrderLedgerEntry {
    fn from(value: OrderWithItems) -> Self {
        let total_price = value.total_price();
        Self {
            order: value.order,
            items: value.items,
            total_price,
        }
    }
}

/// Order ledger, newest first.
///
/// Orders whose `notification_status` is `failed` need manual follow-up;
/// a null status means the notification has not been recorded yet.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Admin orders"],
    responses(
        (status = 200, description = "List all orders", body = StdResponse<Vec<OrderLedgerEntry>, String>)
    )
)]
async fn get_orders(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let orders: Vec<OrderLedgerEntry> = state
        .orders
        .list_orders()
        .await?
        .into_iter()
        .map(OrderLedgerEntry::from)
        .collect();

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get orders successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Admin orders"],
    params(
        ("id" = Uuid, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<OrderLedgerEntry, String>),
        (status = 404, description = "Order not found", body = ErrorResponse)
    )
)]
async fn get_order(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.get_order(id).await?;

    Ok(StdResponse {
        data: Some(OrderLedgerEntry::from(order)),
        message: Some("Get order successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateOrderStatusReq {
    pub status: String,
}

/// Move an order along its fulfillment lifecycle.
#[utoipa::path(
    patch,
    path = "/{id}/status",
    tags = ["Admin orders"],
    params(
        ("id" = Uuid, Path, description = "Order ID to update")
    ),
    request_body = UpdateOrderStatusReq,
    responses(
        (status = 200, description = "Status updated", body = StdResponse<OrderEntity, String>),
        (status = 400, description = "Unknown status", body = ErrorResponse),
        (status = 404, description = "Order not found", body = ErrorResponse),
        (status = 409, description = "Transition not allowed", body = ErrorResponse)
    )
)]
async fn update_order_status(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    AppJson(body): AppJson<UpdateOrderStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let next: OrderStatus = body
        .status
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Unknown order status '{}'", body.status)))?;

    let order = state.intake.change_status(id, next).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Update order status successfully"),
    })
}
