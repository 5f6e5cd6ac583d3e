use axum::Router;
use tower_http::services::ServeDir;
use utoipa_axum::router::OpenApiRouter;

use crate::platform::{app_state::AppState, config::MediaConfig, swagger};

pub mod admin;
pub mod orders;

/// Every API route, with its OpenAPI description.
pub fn routes_with_openapi(max_upload_bytes: usize) -> OpenApiRouter<AppState> {
    orders::routes_with_openapi().merge(admin::routes_with_openapi(max_upload_bytes))
}

/// The complete application: API routes, Swagger UI and the locally stored
/// media under `/media`.
pub fn app(state: AppState, media: &MediaConfig) -> Router {
    let (router, mut openapi) = routes_with_openapi(media.max_upload_bytes).split_for_parts();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("Storefront OrderService API")
        .version(env!("CARGO_PKG_VERSION"))
        .build();

    router
        .merge(swagger::create_swagger_ui(openapi))
        .nest_service("/media", ServeDir::new(&media.root_dir))
        .with_state(state)
}
