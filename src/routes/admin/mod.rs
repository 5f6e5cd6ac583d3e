//! Back-office routes. They carry no authentication of their own and are
//! expected to be reachable only through the admin gateway.

use utoipa_axum::router::OpenApiRouter;

use crate::platform::app_state::AppState;

pub mod categories;
pub mod media;
pub mod orders;
pub mod products;
pub mod settings;

pub fn routes_with_openapi(max_upload_bytes: usize) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(orders::routes_with_openapi())
        .merge(products::routes_with_openapi())
        .merge(categories::routes_with_openapi())
        .merge(media::routes_with_openapi(max_upload_bytes))
        .merge(settings::routes_with_openapi())
}
