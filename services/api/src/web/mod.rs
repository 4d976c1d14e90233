pub mod auth;
pub mod editor_ws;
pub mod middleware;
pub mod protocol;
pub mod public;
pub mod rest;
pub mod state;

pub use editor_ws::editor_ws_handler;
pub use middleware::require_auth;

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use self::state::AppState;

/// Builds the complete application router: public routes, auth-protected routes,
/// CORS for the configured web origin, and the Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/presets", get(rest::list_presets_handler))
        .route("/{handle}", get(public::public_portfolio_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route(
            "/portfolio",
            get(rest::get_portfolio_handler).put(rest::put_portfolio_handler),
        )
        .route(
            "/usernames/{username}",
            get(rest::username_availability_handler),
        )
        .route("/editor/ws", get(editor_ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let mut api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state.clone());

    match app_state.config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => {
            let cors = CorsLayer::new()
                .allow_origin(origin)
                .allow_credentials(true)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
                .allow_headers([CONTENT_TYPE, ACCEPT]);
            api_router = api_router.layer(cors);
        }
        Err(e) => warn!(
            "CORS disabled, '{}' is not a valid origin: {}",
            app_state.config.cors_origin, e
        ),
    }

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", rest::ApiDoc::openapi()))
}
