//! services/api/src/web/editor_ws.rs
//!
//! The editor's WebSocket. Each connection owns one `EditorSession`: client edits
//! are applied to it in order, save progress is pushed back, and closing the socket
//! ends the session, dropping any autosave that has not fired yet.

use crate::editor::{EditorSession, SaveEvent, SessionOptions};
use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use portfolio_core::domain::{AuthUser, DocumentError, Preset, SectionPatch};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
pub struct EditorParams {
    /// Preset chosen on the landing page, handed over explicitly instead of via storage.
    pub preset: Option<String>,
}

/// The handler for upgrading HTTP requests to editor WebSocket connections.
pub async fn editor_ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<EditorParams>,
) -> Response {
    let preset = params
        .preset
        .as_deref()
        .and_then(|id| match id.parse::<Preset>() {
            Ok(preset) => Some(preset),
            Err(e) => {
                warn!("Ignoring preset for {}: {}", user.uid, e);
                None
            }
        });
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user, preset))
}

async fn handle_socket(
    socket: WebSocket,
    app_state: Arc<AppState>,
    user: AuthUser,
    preset: Option<Preset>,
) {
    info!("New editor connection for user: {}", user.uid);
    let (mut sender, mut receiver) = socket.split();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    // --- 1. Load Phase ---
    let options = SessionOptions {
        debounce: app_state.config.autosave_debounce,
        preset,
        events: Some(events_tx),
    };
    let mut session = EditorSession::load(app_state.store.clone(), &user, options).await;

    let loaded = ServerMessage::SessionLoaded {
        source: session.source(),
        revision: session.revision(),
        document: session.document().clone(),
    };
    if !send(&mut sender, &loaded).await {
        error!("Failed to send session loaded message.");
        session.close();
        return;
    }

    // --- 2. Main Message Loop ---
    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let reply = match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(message) => apply_client_message(&mut session, message).await,
                        Err(e) => Some(ServerMessage::Error {
                            message: format!("Malformed message: {}", e),
                        }),
                    };
                    if let Some(reply) = reply {
                        if !send(&mut sender, &reply).await {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Editor connection closed by client.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Editor connection error: {:?}", e);
                    break;
                }
            },
            Some(event) = events_rx.recv() => {
                if !send(&mut sender, &save_status(&event)).await {
                    break;
                }
            }
        }
    }

    // --- 3. Teardown ---
    session.close();
}

/// Applies one client message to the session and returns the reply, if any.
pub async fn apply_client_message(
    session: &mut EditorSession,
    message: ClientMessage,
) -> Option<ServerMessage> {
    let result: Result<(), DocumentError> = match message {
        ClientMessage::AddSection { section_type } => session.add_section(section_type).map(|_| ()),
        ClientMessage::UpdateSection {
            id,
            title,
            content,
            image,
        } => session.update_section(
            &id,
            &SectionPatch {
                title,
                content,
                image,
            },
        ),
        ClientMessage::DeleteSection { id } => session.delete_section(&id),
        ClientMessage::MoveSection { id, to } => session.move_section(&id, to),
        ClientMessage::SetTitle { title } => {
            session.set_title(title);
            Ok(())
        }
        ClientMessage::SetDescription { description } => {
            session.set_description(description);
            Ok(())
        }
        ClientMessage::SetUsername { username } => session.set_username(&username),
        ClientMessage::SetTheme { theme } => {
            session.set_theme(theme);
            Ok(())
        }
        ClientMessage::ApplyPreset { preset } => {
            session.apply_preset(preset);
            Ok(())
        }
        ClientMessage::SaveNow => {
            // Progress and failures reach the client through the save events.
            if let Err(e) = session.save_now().await {
                warn!("Manual save for {} failed: {:?}", session.owner(), e);
            }
            return None;
        }
    };

    Some(match result {
        Ok(()) => ServerMessage::DocumentUpdated {
            revision: session.revision(),
            document: session.document().clone(),
        },
        Err(e) => ServerMessage::Error {
            message: e.to_string(),
        },
    })
}

fn save_status(event: &SaveEvent) -> ServerMessage {
    match event {
        SaveEvent::Started { .. } => ServerMessage::SaveStatus {
            saving: true,
            saved_at: None,
        },
        SaveEvent::Saved { updated_at, .. } => ServerMessage::SaveStatus {
            saving: false,
            saved_at: Some(*updated_at),
        },
        SaveEvent::Failed { .. } => ServerMessage::SaveStatus {
            saving: false,
            saved_at: None,
        },
    }
}

/// Serializes and sends one message. Returns `false` once the client is gone.
async fn send(sender: &mut SplitSink<WebSocket, Message>, message: &ServerMessage) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {:?}", e);
            return true;
        }
    };
    sender.send(Message::Text(json.into())).await.is_ok()
}
