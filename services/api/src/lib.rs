//! Classroom API Library Crate
//!
//! This library contains the web service around the classroom engine: the
//! application state, in-memory session store, REST handlers, WebSocket
//! session logic, vendor clients and routing. The `api` binary is a thin
//! wrapper around it.

pub mod analytics;
pub mod audio_utils;
pub mod config;
pub mod handlers;
pub mod models;
pub mod narration;
pub mod prompts;
pub mod router;
pub mod state;
pub mod store;
pub mod voices;
pub mod ws;
