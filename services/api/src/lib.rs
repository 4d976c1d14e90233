//! services/api/src/lib.rs
//!
//! The portfolio builder service: storage and auth adapters, the editor session
//! with debounced autosave, and the HTTP/WebSocket surface.

pub mod adapters;
pub mod config;
pub mod editor;
pub mod error;
pub mod web;
