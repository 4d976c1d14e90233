//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use portfolio_core::ports::{AuthProvider, DocumentStore};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
/// Per-connection editing state lives in `EditorSession`, owned by the socket task.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub config: Arc<Config>,
}
