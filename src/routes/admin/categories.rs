use axum::{extract::State, response::IntoResponse};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    domain::ValidationErrors,
    models::{CategoryEntity, CreateCategoryEntity},
    platform::{
        app_error::{AppError, AppJson, ErrorResponse, StdResponse},
        app_state::AppState,
    },
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/api/admin/categories",
        OpenApiRouter::new().routes(utoipa_axum::routes!(get_categories, create_category)),
    )
}

/// Active categories in display order, as offered by the product form.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Admin categories"],
    responses(
        (status = 200, description = "Active categories", body = StdResponse<Vec<CategoryEntity>, String>)
    )
)]
async fn get_categories(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let categories = state.catalog.list_categories().await?;

    Ok(StdResponse {
        data: Some(categories),
        message: Some("Get categories successfully"),
    })
}

#[utoipa::path(
    post,
    path = "/",
    tags = ["Admin categories"],
    request_body = CreateCategoryEntity,
    responses(
        (status = 200, description = "Category created", body = StdResponse<CategoryEntity, String>),
        (status = 400, description = "Invalid category", body = ErrorResponse),
        (status = 409, description = "Slug already taken", body = ErrorResponse)
    )
)]
async fn create_category(
    State(state): State<AppState>,
    AppJson(mut body): AppJson<CreateCategoryEntity>,
) -> Result<impl IntoResponse, AppError> {
    body.slug = body.slug.trim().to_string();

    let mut errors = ValidationErrors::default();
    if body.slug.is_empty() {
        errors.push("slug", "is required");
    }
    if body.name_uk.trim().is_empty() {
        errors.push("name_uk", "is required");
    }
    if !errors.is_empty() {
        return Err(errors.into());
    }

    let category = state.catalog.create_category(body).await?;
    tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");

    Ok(StdResponse {
        data: Some(category),
        message: Some("Create category successfully"),
    })
}
