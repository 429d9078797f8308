//! WebSocket Session Management
//!
//! - `protocol`: the JSON message format between browser and server.
//! - `session`: connection lifecycle, from `init` to teardown.

pub mod protocol;
pub mod session;

pub use session::ws_handler;
