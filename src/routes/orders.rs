use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    domain::{NewOrder, SubmitOrderReq},
    platform::{
        app_error::{AppError, AppJson, ErrorResponse},
        app_state::AppState,
    },
};

/// Storefront-facing order routes.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/api/orders",
        OpenApiRouter::new().routes(utoipa_axum::routes!(submit_order)),
    )
}

#[derive(Serialize, ToSchema)]
pub struct SubmitOrderRes {
    pub success: bool,
    pub order_id: Uuid,
}

/// Submit an order from the storefront order form.
///
/// Answers as soon as the order is stored. Delivery of the order to the
/// fulfillment automation endpoint never fails this request.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Orders"],
    request_body = SubmitOrderReq,
    responses(
        (status = 200, description = "Order accepted", body = SubmitOrderRes),
        (status = 400, description = "Invalid submission", body = ErrorResponse),
        (status = 500, description = "Order could not be stored", body = ErrorResponse)
    )
)]
async fn submit_order(
    State(state): State<AppState>,
    AppJson(body): AppJson<SubmitOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    let order = NewOrder::try_from(body)?;
    let submission = state.intake.submit(order).await?;

    Ok(Json(SubmitOrderRes {
        success: true,
        order_id: submission.order_id(),
    }))
}
