use std::sync::Arc;

use axum::body::Bytes;
use chrono::Utc;
use futures::future::join_all;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    domain::MediaType,
    models::{CreateProductMediaEntity, ProductMediaEntity},
    platform::app_error::AppError,
    repositories::MediaRepository,
    storage::{ObjectStorage, StorageError},
};

/// A media file received from the admin console.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub product_id: Uuid,
    pub product_code: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Product media records plus the objects they point to.
pub struct MediaLibrary {
    media: Arc<dyn MediaRepository>,
    storage: Arc<dyn ObjectStorage>,
}

impl MediaLibrary {
    pub fn new(media: Arc<dyn MediaRepository>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { media, storage }
    }

    pub async fn list(&self, product_id: Uuid) -> Result<Vec<ProductMediaEntity>, AppError> {
        Ok(self.media.list_media(product_id).await?)
    }

    /// Stores the file and appends a non-primary media record to the product.
    pub async fn upload(&self, upload: MediaUpload) -> Result<ProductMediaEntity, AppError> {
        let media_type = MediaType::from_content_type(&upload.content_type).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Unsupported content type '{}': expected an image or a video",
                upload.content_type
            ))
        })?;
        if upload.bytes.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".into()));
        }

        let stem = format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            &Uuid::new_v4().simple().to_string()[..8]
        );
        let path = storage_path(&upload.product_code, media_type, &upload.file_name, &stem)?;

        self.storage
            .put(&path, upload.bytes, &upload.content_type)
            .await
            .map_err(|err| match err {
                StorageError::AlreadyExists(path) => {
                    AppError::Conflict(format!("Object '{path}' already exists"))
                }
                StorageError::InvalidPath(path) => {
                    AppError::BadRequest(format!("Invalid storage path '{path}'"))
                }
                err => AppError::Other(anyhow::Error::new(err).context("Upload failed")),
            })?;

        let record = self
            .media
            .create_media(CreateProductMediaEntity {
                product_id: upload.product_id,
                media_type: media_type.to_string(),
                url: self.storage.public_url(&path),
                storage_path: Some(path.clone()),
                position: 0,
                is_primary: false,
            })
            .await;

        match record {
            Ok(record) => {
                info!(media_id = %record.id, product_id = %record.product_id, %path, "Media uploaded");
                Ok(record)
            }
            Err(err) => {
                // Do not leave an object behind that no record points to.
                if let Err(cleanup) = self.storage.remove(&path).await {
                    error!(%path, error = %cleanup, "Failed to remove orphaned media object");
                }
                Err(err.into())
            }
        }
    }

    /// Deletes the record, then its stored object.
    ///
    /// The object path comes from the record; `storage_path` is only used for
    /// records that have none.
    pub async fn delete(
        &self,
        media_id: Uuid,
        storage_path: Option<String>,
    ) -> Result<ProductMediaEntity, AppError> {
        let deleted = self.media.delete_media(media_id).await?;

        if let Some(path) = deleted.storage_path.clone().or(storage_path) {
            if let Err(err) = self.storage.remove(&path).await {
                warn!(%media_id, %path, error = %err, "Media record deleted but object removal failed");
            }
        }

        info!(%media_id, product_id = %deleted.product_id, "Media deleted");
        Ok(deleted)
    }

    /// Removes the stored objects of records that are already gone, e.g. after
    /// their product was deleted.
    pub async fn discard_objects(&self, media: &[ProductMediaEntity]) {
        let removals = media
            .iter()
            .filter_map(|m| m.storage_path.as_deref())
            .map(|path| async move { (path, self.storage.remove(path).await) });

        for (path, result) in join_all(removals).await {
            if let Err(err) = result {
                warn!(%path, error = %err, "Failed to remove media object");
            }
        }
    }

    pub async fn set_primary(
        &self,
        media_id: Uuid,
        product_id: Uuid,
    ) -> Result<ProductMediaEntity, AppError> {
        let media = self
            .media
            .set_primary(media_id, product_id)
            .await
            .map_err(AppError::from)?;
        info!(%media_id, %product_id, "Primary media changed");
        Ok(media)
    }
}

/// `products/{code}/{images|video}/{stem}.{ext}`, the extension taken from
/// the uploaded file name.
pub fn storage_path(
    product_code: &str,
    media_type: MediaType,
    file_name: &str,
    stem: &str,
) -> Result<String, AppError> {
    let code = product_code.trim();
    let code_is_safe = !code.is_empty()
        && code != "."
        && code != ".."
        && code
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !code_is_safe {
        return Err(AppError::BadRequest(format!(
            "Invalid product code '{product_code}'"
        )));
    }

    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string());

    Ok(format!(
        "products/{code}/{}/{stem}.{extension}",
        media_type.folder()
    ))
}
