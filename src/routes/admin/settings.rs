use axum::{extract::State, response::IntoResponse};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    domain::{Locale, ValidationErrors},
    models::{SaveSettingsEntity, SettingsEntity},
    platform::{
        app_error::{AppError, AppJson, ErrorResponse, StdResponse},
        app_state::AppState,
    },
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/api/admin/settings",
        OpenApiRouter::new().routes(utoipa_axum::routes!(get_settings, save_settings)),
    )
}

/// Site settings. Defaults are returned until they are saved once.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Admin settings"],
    responses(
        (status = 200, description = "Current settings", body = StdResponse<SettingsEntity, String>)
    )
)]
async fn get_settings(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let settings = state.settings.get_settings().await?;

    Ok(StdResponse {
        data: Some(settings),
        message: Some("Get settings successfully"),
    })
}

#[utoipa::path(
    put,
    path = "/",
    tags = ["Admin settings"],
    request_body = SaveSettingsEntity,
    responses(
        (status = 200, description = "Settings saved", body = StdResponse<SettingsEntity, String>),
        (status = 400, description = "Invalid settings", body = ErrorResponse)
    )
)]
async fn save_settings(
    State(state): State<AppState>,
    AppJson(mut body): AppJson<SaveSettingsEntity>,
) -> Result<impl IntoResponse, AppError> {
    body.default_locale = body.default_locale.trim().to_string();

    let mut errors = ValidationErrors::default();
    if body.brand_name.trim().is_empty() {
        errors.push("brand_name", "is required");
    }
    if body.default_locale.parse::<Locale>().is_err() {
        errors.push("default_locale", "must be one of uk, ru");
    }
    if !errors.is_empty() {
        return Err(errors.into());
    }

    let settings = state.settings.save_settings(body).await?;
    tracing::info!(locale = %settings.default_locale, "Settings saved");

    Ok(StdResponse {
        data: Some(settings),
        message: Some("Save settings successfully"),
    })
}
