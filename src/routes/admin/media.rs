use anyhow::Context;
use axum::{
    Json,
    extract::{DefaultBodyLimit, Multipart, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    models::ProductMediaEntity,
    platform::{
        app_error::{AppError, AppJson, ErrorResponse},
        app_state::AppState,
    },
    services::MediaUpload,
};

/// Media routes of the admin console. Request bodies accept both snake_case
/// and the storefront's camelCase keys.
pub fn routes_with_openapi(max_upload_bytes: usize) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/api/admin/media",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(upload_media))
            .routes(utoipa_axum::routes!(delete_media))
            .routes(utoipa_axum::routes!(set_primary_media))
            .layer(DefaultBodyLimit::max(max_upload_bytes)),
    )
}

#[derive(Serialize, ToSchema)]
pub struct MediaRes {
    pub media: ProductMediaEntity,
}

#[derive(Serialize, ToSchema)]
pub struct SuccessRes {
    pub success: bool,
}

/// Multipart form of `POST /api/admin/media/upload`.
#[allow(dead_code)]
#[derive(ToSchema)]
struct UploadMediaForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    product_id: Uuid,
    product_code: String,
}

/// Upload a photo or video for a product.
///
/// The object lands under `products/{code}/{images|video}/` and a
/// non-primary media record is appended after the product's last one.
#[utoipa::path(
    post,
    path = "/upload",
    tags = ["Admin media"],
    request_body(content = UploadMediaForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Media uploaded", body = MediaRes),
        (status = 400, description = "Missing field or unsupported file", body = ErrorResponse),
        (status = 404, description = "Product not found", body = ErrorResponse)
    )
)]
async fn upload_media(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut file: Option<(String, String, axum::body::Bytes)> = None;
    let mut product_id: Option<String> = None;
    let mut product_code: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(format!("Malformed multipart body: {err}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::BadRequest(format!("Failed to read file: {err}")))?;
                file = Some((file_name, content_type, bytes));
            }
            "product_id" | "productId" => {
                product_id = Some(field.text().await.context("Failed to read product_id")?);
            }
            "product_code" | "productCode" => {
                product_code = Some(field.text().await.context("Failed to read product_code")?);
            }
            _ => {}
        }
    }

    let (file_name, content_type, bytes) =
        file.ok_or_else(|| AppError::BadRequest("Missing 'file' field".into()))?;
    let product_id = product_id
        .ok_or_else(|| AppError::BadRequest("Missing 'product_id' field".into()))?;
    let product_id = Uuid::parse_str(product_id.trim())
        .map_err(|_| AppError::BadRequest(format!("Invalid product_id '{product_id}'")))?;
    let product_code = product_code
        .ok_or_else(|| AppError::BadRequest("Missing 'product_code' field".into()))?;

    let media = state
        .media
        .upload(MediaUpload {
            product_id,
            product_code,
            file_name,
            content_type,
            bytes,
        })
        .await?;

    Ok(Json(MediaRes { media }))
}

#[derive(Deserialize, ToSchema)]
pub struct DeleteMediaReq {
    #[serde(alias = "mediaId")]
    pub media_id: Uuid,
    #[serde(default, alias = "storagePath")]
    pub storage_path: Option<String>,
}

#[utoipa::path(
    post,
    path = "/delete",
    tags = ["Admin media"],
    request_body = DeleteMediaReq,
    responses(
        (status = 200, description = "Media deleted", body = SuccessRes),
        (status = 404, description = "Media not found", body = ErrorResponse)
    )
)]
async fn delete_media(
    State(state): State<AppState>,
    AppJson(body): AppJson<DeleteMediaReq>,
) -> Result<impl IntoResponse, AppError> {
    state.media.delete(body.media_id, body.storage_path).await?;

    Ok(Json(SuccessRes { success: true }))
}

#[derive(Deserialize, ToSchema)]
pub struct SetPrimaryMediaReq {
    #[serde(alias = "mediaId")]
    pub media_id: Uuid,
    #[serde(alias = "productId")]
    pub product_id: Uuid,
}

/// Make a media item the product's only primary one.
#[utoipa::path(
    post,
    path = "/set-primary",
    tags = ["Admin media"],
    request_body = SetPrimaryMediaReq,
    responses(
        (status = 200, description = "Primary media set", body = SuccessRes),
        (status = 404, description = "Media not found for this product", body = ErrorResponse)
    )
)]
async fn set_primary_media(
    State(state): State<AppState>,
    AppJson(body): AppJson<SetPrimaryMediaReq>,
) -> Result<impl IntoResponse, AppError> {
    state.media.set_primary(body.media_id, body.product_id).await?;

    Ok(Json(SuccessRes { success: true }))
}
