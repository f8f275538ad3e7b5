//! Countdown auto-redirect policy.
//!
//! Some deployments send the user straight to the identity provider
//! after a short countdown unless they interact with the login screen.
//! This is a UX policy layered on top of `begin_login`, not part of the
//! handshake's contract.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::config::AuthConfig;
use crate::handshake::AuthHandshake;

/// A scheduled automatic login. Dropping it cancels the countdown.
pub struct AutoLogin {
    handle: JoinHandle<()>,
}

impl AutoLogin {
    /// Call `begin_login(redirect_target)` after `delay`, unless
    /// cancelled first.
    pub fn schedule(
        handshake: AuthHandshake,
        redirect_target: impl Into<String>,
        delay: Duration,
    ) -> Self {
        let target = redirect_target.into();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = handshake.begin_login(&target).await {
                warn!("auto-login redirect failed: {e}");
            }
        });
        Self { handle }
    }

    /// Schedule from configuration. Returns `None` when the deployment
    /// has no auto-login countdown configured.
    pub fn from_config(
        handshake: AuthHandshake,
        config: &AuthConfig,
        redirect_target: impl Into<String>,
    ) -> Option<Self> {
        config
            .auto_login_delay
            .map(|delay| Self::schedule(handshake, redirect_target.into(), delay))
    }

    /// Cancel the countdown. A no-op if the login already fired.
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for AutoLogin {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
