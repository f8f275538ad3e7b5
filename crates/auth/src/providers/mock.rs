//! Mock identity provider for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use retenly_core::auth::{AuthError, IdentityProvider, Result, TokenInfo, UserInfo};
use url::Url;

/// Mock provider whose authorization codes carry the user info inline,
/// base64-encoded JSON. Counts exchange calls so tests can assert the
/// at-most-once-per-code guarantee, and can be switched to fail.
pub struct MockProvider {
    base_url: Url,
    redirect_uri: Url,
    exchange_calls: AtomicUsize,
    exchange_failure: Mutex<Option<String>>,
}

impl MockProvider {
    pub fn new(base_url: Url, redirect_uri: Url) -> Self {
        Self {
            base_url,
            redirect_uri,
            exchange_calls: AtomicUsize::new(0),
            exchange_failure: Mutex::new(None),
        }
    }

    /// Build an authorization code the way the mock IdP would.
    pub fn make_code(subject: &str, email: Option<&str>, name: Option<&str>) -> String {
        let json = serde_json::json!({
            "sub": subject,
            "email": email,
            "name": name,
        });
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json.to_string())
    }

    /// Number of `exchange_code` invocations so far.
    pub fn exchange_count(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent exchange fail with `message`.
    pub fn fail_exchanges_with(&self, message: &str) {
        *self.exchange_failure.lock().unwrap() = Some(message.to_string());
    }
}

#[async_trait]
impl IdentityProvider for MockProvider {
    async fn authorization_url(&self, state: &str) -> Result<Url> {
        let mut url = self
            .base_url
            .join("/authorize")
            .map_err(|e| AuthError::Provider(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("state", state)
            .append_pair("redirect_uri", self.redirect_uri.as_str());
        Ok(url)
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenInfo> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.exchange_failure.lock().unwrap().clone() {
            return Err(AuthError::ExchangeFailed(message));
        }

        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(code)
            .map_err(|e| AuthError::ExchangeFailed(e.to_string()))?;
        let json: serde_json::Value =
            serde_json::from_slice(&decoded).map_err(|e| AuthError::ExchangeFailed(e.to_string()))?;

        let subject = json["sub"]
            .as_str()
            .ok_or_else(|| AuthError::ExchangeFailed("missing subject in mock code".to_string()))?
            .to_string();

        Ok(TokenInfo {
            access_token: format!("mock-token-{subject}"),
            user_info: UserInfo {
                subject,
                email: json["email"].as_str().map(String::from),
                name: json["name"].as_str().map(String::from),
            },
            obtained_at: Utc::now(),
        })
    }

    async fn logout_url(&self, redirect_to: &Url) -> Result<Url> {
        let mut url = self
            .base_url
            .join("/logout")
            .map_err(|e| AuthError::Provider(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("redirect_uri", redirect_to.as_str());
        Ok(url)
    }
}
