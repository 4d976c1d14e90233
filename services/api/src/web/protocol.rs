//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the editor UI and the API server.

use chrono::{DateTime, Utc};
use portfolio_core::domain::{PortfolioDocument, Preset, SectionId, SectionKind, Theme};
use serde::{Deserialize, Serialize};

use crate::editor::LoadSource;

//=========================================================================================
// Messages Sent FROM the Client (Editor UI) TO the Server
//=========================================================================================

/// Every message is one edit (or a save request) against the session's document.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    AddSection {
        section_type: SectionKind,
    },

    /// Fields left out are not touched. An empty `image` removes the image.
    UpdateSection {
        id: SectionId,
        title: Option<String>,
        content: Option<String>,
        image: Option<String>,
    },

    DeleteSection {
        id: SectionId,
    },

    MoveSection {
        id: SectionId,
        to: usize,
    },

    SetTitle {
        title: String,
    },

    SetDescription {
        description: String,
    },

    SetUsername {
        username: String,
    },

    SetTheme {
        theme: Theme,
    },

    ApplyPreset {
        preset: Preset,
    },

    /// Write the current document now instead of waiting for the autosave.
    SaveNow,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Editor UI)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First message on every connection.
    SessionLoaded {
        source: LoadSource,
        revision: u64,
        document: PortfolioDocument,
    },

    /// The document after an accepted edit.
    DocumentUpdated {
        revision: u64,
        document: PortfolioDocument,
    },

    /// Drives the "Saving..." indicator. Failed saves simply clear it.
    SaveStatus {
        saving: bool,
        saved_at: Option<DateTime<Utc>>,
    },

    /// A rejected edit or malformed message. The connection stays open.
    Error { message: String },
}
