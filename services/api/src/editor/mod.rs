//! services/api/src/editor/mod.rs
//!
//! The editor session and its debounced autosave.

pub mod autosave;
pub mod session;

pub use autosave::{SaveEvent, Snapshot};
pub use session::{load_or_default, EditorSession, LoadSource, SessionOptions, DEFAULT_DEBOUNCE};
