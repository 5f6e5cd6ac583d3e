use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    domain::{ProductColor, StockStatus, ValidationErrors},
    models::{
        CreateProductEntity, ProductDetails, ProductEntity, ProductMediaEntity,
        UpdateProductEntity,
    },
    platform::{
        app_error::{AppError, AppJson, ErrorResponse, StdResponse},
        app_state::AppState,
    },
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/api/admin/products",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_products, create_product))
            .routes(utoipa_axum::routes!(
                get_product,
                update_product,
                delete_product
            ))
            .routes(utoipa_axum::routes!(get_product_media)),
    )
}

#[derive(Deserialize, ToSchema)]
pub struct CreateProductReq {
    #[serde(flatten)]
    pub product: CreateProductEntity,
    /// Categories the product is listed under.
    #[serde(default)]
    pub category_ids: Vec<Uuid>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateProductReq {
    #[serde(flatten)]
    pub changes: UpdateProductEntity,
    /// Replaces every category link of the product when present.
    #[serde(default)]
    pub category_ids: Option<Vec<Uuid>>,
}

#[utoipa::path(
    get,
    path = "/",
    tags = ["Admin products"],
    responses(
        (status = 200, description = "List all products", body = StdResponse<Vec<ProductDetails>, String>)
    )
)]
async fn get_products(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let products = state.catalog.list_products().await?;

    Ok(StdResponse {
        data: Some(products),
        message: Some("Get products successfully"),
    })
}

#[utoipa::path(
    post,
    path = "/",
    tags = ["Admin products"],
    request_body = CreateProductReq,
    responses(
        (status = 200, description = "Product created", body = StdResponse<ProductDetails, String>),
        (status = 400, description = "Invalid product", body = ErrorResponse),
        (status = 404, description = "Unknown category", body = ErrorResponse),
        (status = 409, description = "Code or slug already taken", body = ErrorResponse)
    )
)]
async fn create_product(
    State(state): State<AppState>,
    AppJson(CreateProductReq {
        product: mut body,
        category_ids,
    }): AppJson<CreateProductReq>,
) -> Result<impl IntoResponse, AppError> {
    body.code = body.code.trim().to_string();
    body.slug = body.slug.trim().to_string();

    let mut errors = ValidationErrors::default();
    if body.code.is_empty() {
        errors.push("code", "is required");
    }
    if body.slug.is_empty() {
        errors.push("slug", "is required");
    }
    if body.name_uk.trim().is_empty() {
        errors.push("name_uk", "is required");
    }
    check_price(&mut errors, "price_retail", body.price_retail);
    check_price(&mut errors, "price_drop", body.price_drop);
    check_stock_status(&mut errors, &body.stock_status);
    check_colors(&mut errors, &body.colors_json);
    if !errors.is_empty() {
        return Err(errors.into());
    }

    let product = state.catalog.create_product(body, category_ids).await?;
    tracing::info!(
        product_id = %product.product.id,
        code = %product.product.code,
        categories = product.category_ids.len(),
        "Product created"
    );

    Ok(StdResponse {
        data: Some(product),
        message: Some("Create product successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Admin products"],
    params(
        ("id" = Uuid, Path, description = "Product ID to fetch")
    ),
    responses(
        (status = 200, description = "Get product successfully", body = StdResponse<ProductDetails, String>),
        (status = 404, description = "Product not found", body = ErrorResponse)
    )
)]
async fn get_product(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let product = state.catalog.get_product(id).await?;

    Ok(StdResponse {
        data: Some(product),
        message: Some("Get product successfully"),
    })
}

/// Partial update. Price changes never touch the snapshots of existing orders.
/// `category_ids` replaces the product's category links as a whole.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Admin products"],
    params(
        ("id" = Uuid, Path, description = "Product ID to update")
    ),
    request_body = UpdateProductReq,
    responses(
        (status = 200, description = "Product updated", body = StdResponse<ProductDetails, String>),
        (status = 400, description = "Invalid update", body = ErrorResponse),
        (status = 404, description = "Product or category not found", body = ErrorResponse)
    )
)]
async fn update_product(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    AppJson(UpdateProductReq {
        changes: body,
        category_ids,
    }): AppJson<UpdateProductReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.is_empty() && category_ids.is_none() {
        return Err(AppError::BadRequest("Nothing to update".into()));
    }

    let mut errors = ValidationErrors::default();
    if body.slug.as_deref().is_some_and(|slug| slug.trim().is_empty()) {
        errors.push("slug", "must not be empty");
    }
    if body.name_uk.as_deref().is_some_and(|name| name.trim().is_empty()) {
        errors.push("name_uk", "must not be empty");
    }
    if let Some(price) = body.price_retail {
        check_price(&mut errors, "price_retail", price);
    }
    if let Some(price) = body.price_drop {
        check_price(&mut errors, "price_drop", price);
    }
    if let Some(stock_status) = &body.stock_status {
        check_stock_status(&mut errors, stock_status);
    }
    if let Some(colors) = &body.colors_json {
        check_colors(&mut errors, colors);
    }
    if !errors.is_empty() {
        return Err(errors.into());
    }

    let product = state.catalog.update_product(id, body, category_ids).await?;

    Ok(StdResponse {
        data: Some(product),
        message: Some("Update product successfully"),
    })
}

/// Deletes the product, its media records and the stored media objects.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Admin products"],
    params(
        ("id" = Uuid, Path, description = "Product ID to delete")
    ),
    responses(
        (status = 200, description = "Product deleted", body = StdResponse<ProductEntity, String>),
        (status = 404, description = "Product not found", body = ErrorResponse)
    )
)]
async fn delete_product(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let media = state.media.list(id).await?;
    let product = state.catalog.delete_product(id).await?;
    state.media.discard_objects(&media).await;

    tracing::info!(product_id = %product.id, media = media.len(), "Product deleted");

    Ok(StdResponse {
        data: Some(product),
        message: Some("Delete product successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/{id}/media",
    tags = ["Admin products"],
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Media ordered by position", body = StdResponse<Vec<ProductMediaEntity>, String>)
    )
)]
async fn get_product_media(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let media = state.media.list(id).await?;

    Ok(StdResponse {
        data: Some(media),
        message: Some("Get product media successfully"),
    })
}

fn check_price(errors: &mut ValidationErrors, field: &str, price: f64) {
    if !price.is_finite() || price < 0.0 {
        errors.push(field, "must be a non-negative number");
    }
}

fn check_colors(errors: &mut ValidationErrors, colors: &serde_json::Value) {
    match serde_json::from_value::<Vec<ProductColor>>(colors.clone()) {
        Ok(colors) => {
            for (idx, color) in colors.iter().enumerate() {
                if color.color.trim().is_empty() {
                    errors.push(format!("colors_json[{idx}].color"), "is required");
                }
                check_price(errors, &format!("colors_json[{idx}].price_retail"), color.price_retail);
                check_price(errors, &format!("colors_json[{idx}].price_drop"), color.price_drop);
            }
        }
        Err(_) => errors.push(
            "colors_json",
            "must be a list of {color, price_retail, price_drop} objects",
        ),
    }
}

fn check_stock_status(errors: &mut ValidationErrors, value: &str) {
    if value.parse::<StockStatus>().is_err() {
        errors.push(
            "stock_status",
            "must be one of in_stock, low_stock, preorder, out_of_stock",
        );
    }
}
