//! services/api/src/web/public.rs
//!
//! The public portfolio page served at `/@{username}`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use portfolio_core::ports::DocumentStore;
use portfolio_core::render::{render, RenderedPage};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::web::state::AppState;

/// Outcome of a public lookup. "Not found" also covers lookup failures, so a
/// broken store and an unpublished handle look the same to visitors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicPage {
    Found(RenderedPage),
    NotFound,
}

#[derive(Serialize, ToSchema)]
pub struct NotFoundResponse {
    pub error: String,
    pub message: String,
}

/// Strips the leading `@` of a public route segment.
pub fn parse_handle(segment: &str) -> Option<&str> {
    segment.strip_prefix('@').filter(|handle| !handle.is_empty())
}

/// Performs exactly one lookup by username and renders the first match.
pub async fn resolve_public_page(store: &dyn DocumentStore, username: &str) -> PublicPage {
    let matches = match store.find_by_username(username).await {
        Ok(matches) => matches,
        Err(e) => {
            error!("Error loading portfolio @{}: {:?}", username, e);
            return PublicPage::NotFound;
        }
    };
    if matches.len() > 1 {
        warn!(
            "{} portfolios share the username @{}; serving the oldest",
            matches.len(),
            username
        );
    }
    match matches.into_iter().next() {
        Some(published) => PublicPage::Found(render(&published.document)),
        None => PublicPage::NotFound,
    }
}

fn not_found(handle: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundResponse {
            error: "Portfolio Not Found".to_string(),
            message: format!(
                "The portfolio @{} doesn't exist or hasn't been published yet.",
                handle
            ),
        }),
    )
        .into_response()
}

/// GET /@{username} - The published portfolio, rendered
#[utoipa::path(
    get,
    path = "/@{username}",
    params(("username" = String, Path, description = "Public handle of the portfolio")),
    responses(
        (status = 200, description = "Rendered portfolio page"),
        (status = 404, description = "No portfolio under this handle", body = NotFoundResponse)
    )
)]
pub async fn public_portfolio_handler(
    State(state): State<Arc<AppState>>,
    Path(segment): Path<String>,
) -> Response {
    let Some(handle) = parse_handle(&segment) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match resolve_public_page(state.store.as_ref(), handle).await {
        PublicPage::Found(page) => Json(page).into_response(),
        PublicPage::NotFound => not_found(handle),
    }
}
