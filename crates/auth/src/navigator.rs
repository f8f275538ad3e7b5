//! Recording navigator for tests.
//!
//! In production the host shell (webview or browser binding) implements
//! `Navigator`; tests use this one to observe where the handshake sends
//! the user and how it rewrites the visible URL.

use std::sync::{Arc, Mutex};

use retenly_core::auth::{AuthError, Navigator, Result};
use url::Url;

#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    navigations: Arc<Mutex<Vec<String>>>,
    rewrites: Arc<Mutex<Vec<Url>>>,
    fail_navigation: Arc<Mutex<Option<String>>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `navigate` target so far, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    /// The most recent full-page navigation target.
    pub fn last_navigation(&self) -> Option<String> {
        self.navigations.lock().unwrap().last().cloned()
    }

    /// Every `rewrite_location` URL so far, in order.
    pub fn rewrites(&self) -> Vec<Url> {
        self.rewrites.lock().unwrap().clone()
    }

    /// Make every subsequent `navigate` fail with `message`.
    pub fn fail_navigation_with(&self, message: &str) {
        *self.fail_navigation.lock().unwrap() = Some(message.to_string());
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, target: &str) -> Result<()> {
        if let Some(message) = self.fail_navigation.lock().unwrap().clone() {
            return Err(AuthError::RedirectFailed(message));
        }
        self.navigations.lock().unwrap().push(target.to_string());
        Ok(())
    }

    fn rewrite_location(&self, url: &Url) -> Result<()> {
        self.rewrites.lock().unwrap().push(url.clone());
        Ok(())
    }
}
