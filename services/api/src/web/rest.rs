//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::editor::{load_or_default, LoadSource};
use crate::web::{auth, public, state::AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use portfolio_core::domain::{
    validate_username, AuthUser, DocumentDraft, PortfolioDocument, Preset, Theme,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        get_portfolio_handler,
        put_portfolio_handler,
        username_availability_handler,
        list_presets_handler,
        public::public_portfolio_handler,
    ),
    components(
        schemas(
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
            PortfolioResponse,
            SavedResponse,
            AvailabilityResponse,
            PresetResponse,
            public::NotFoundResponse,
        )
    ),
    tags(
        (name = "Portfolio Builder API", description = "Editing, saving and publishing portfolios.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct PortfolioResponse {
    #[schema(value_type = String, example = "stored")]
    source: LoadSource,
    #[schema(value_type = Object)]
    document: PortfolioDocument,
}

#[derive(Serialize, ToSchema)]
pub struct SavedResponse {
    updated_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct AvailabilityResponse {
    username: String,
    available: bool,
}

#[derive(Serialize, ToSchema)]
pub struct PresetResponse {
    id: String,
    name: String,
    description: String,
    /// Absent for the "custom" preset, which keeps the current theme.
    #[schema(value_type = Object)]
    theme: Option<Theme>,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Load the signed-in user's portfolio, or the starter document if there is none yet.
#[utoipa::path(
    get,
    path = "/portfolio",
    responses(
        (status = 200, description = "The editable document", body = PortfolioResponse),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn get_portfolio_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<PortfolioResponse> {
    let (document, source) = load_or_default(app_state.store.as_ref(), &user).await;
    Json(PortfolioResponse { source, document })
}

/// Save the whole document now. Overwrites whatever was stored.
///
/// The draft is held to the same rules as editor edits: unique section ids, a valid
/// username, http(s) images only on sections that show one.
#[utoipa::path(
    put,
    path = "/portfolio",
    request_body(content = Object, description = "The complete portfolio document."),
    responses(
        (status = 200, description = "Saved", body = SavedResponse),
        (status = 400, description = "Invalid document, with the reason"),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn put_portfolio_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(draft): Json<DocumentDraft>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let document = PortfolioDocument::try_from(draft).map_err(|e| {
        info!("Rejected portfolio of {}: {}", user.uid, e);
        (StatusCode::BAD_REQUEST, e.to_string())
    })?;

    let updated_at = app_state
        .store
        .put_portfolio(user.uid, &document)
        .await
        .map_err(|e| {
            error!("Error saving portfolio of {}: {:?}", user.uid, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save portfolio".to_string(),
            )
        })?;
    info!("Portfolio of {} saved explicitly", user.uid);

    Ok(Json(SavedResponse { updated_at }))
}

/// Whether a username is free for the signed-in user. Taken names are not blocked on save.
#[utoipa::path(
    get,
    path = "/usernames/{username}",
    params(("username" = String, Path, description = "Handle to check")),
    responses(
        (status = 200, description = "Availability", body = AvailabilityResponse),
        (status = 400, description = "Not a valid username"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn username_availability_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let username =
        validate_username(&username).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let matches = app_state
        .store
        .find_by_username(&username)
        .await
        .map_err(|e| {
            error!("Error checking username @{}: {:?}", username, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to check username".to_string(),
            )
        })?;
    let available = matches.iter().all(|p| p.owner == user.uid);

    Ok(Json(AvailabilityResponse {
        username,
        available,
    }))
}

/// The looks offered on the landing page.
#[utoipa::path(
    get,
    path = "/presets",
    responses((status = 200, description = "Preset catalogue", body = [PresetResponse]))
)]
pub async fn list_presets_handler() -> Json<Vec<PresetResponse>> {
    Json(
        Preset::ALL
            .into_iter()
            .map(|preset| PresetResponse {
                id: preset.id().to_string(),
                name: preset.name().to_string(),
                description: preset.description().to_string(),
                theme: preset.theme(),
            })
            .collect(),
    )
}
