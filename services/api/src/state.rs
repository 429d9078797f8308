//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable resources like the session store and service clients.

use crate::{config::Config, store::SessionStore};
use classroom_core::{analytics::TextAnalytics, content::ContentProvider};
use std::{sync::Arc, time::Duration};

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub content: Arc<dyn ContentProvider>,
    /// `None` when no analytics service is configured; insights come back empty.
    pub analytics: Option<Arc<dyn TextAnalytics>>,
    /// Pooled HTTP client shared by the vendor integrations.
    pub http: reqwest::Client,
    pub config: Arc<Config>,
}

/// Upper bound on any single vendor request (TTS audio, text analytics).
pub const VENDOR_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// The HTTP client shared by the vendor integrations.
pub fn vendor_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(VENDOR_REQUEST_TIMEOUT)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_client_builds_with_a_timeout() {
        assert!(vendor_http_client().is_ok());
        assert!(VENDOR_REQUEST_TIMEOUT > Duration::ZERO);
    }
}
