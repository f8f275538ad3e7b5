//! HTTP session store backed by the Retenly session API.

use async_trait::async_trait;
use retenly_core::auth::{AuthError, Result, SessionBackend};
use url::Url;

/// Establishes and tears down local sessions over the backend's session
/// endpoints: `POST /api/session/sso` with the provider access token, and
/// `DELETE /api/session` on logout. The backend sets/clears the session
/// cookie; this client only reports success or failure.
pub struct HttpSessionStore {
    api_base_url: Url,
    http_client: reqwest::Client,
}

impl HttpSessionStore {
    pub fn new(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            http_client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_base_url
            .join(path)
            .map_err(|e| AuthError::SessionEstablishFailed(e.to_string()))
    }
}

#[async_trait]
impl SessionBackend for HttpSessionStore {
    async fn create_from_token(&self, access_token: &str) -> Result<()> {
        let url = self.endpoint("/api/session/sso")?;
        let response = self
            .http_client
            .post(url)
            .json(&serde_json::json!({ "token": access_token }))
            .send()
            .await
            .map_err(|e| AuthError::SessionEstablishFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::SessionEstablishFailed(format!(
                "session endpoint returned {status}: {body}"
            )));
        }
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        let url = self.endpoint("/api/session")?;
        let response = self
            .http_client
            .delete(url)
            .send()
            .await
            .map_err(|e| AuthError::SessionEstablishFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::SessionEstablishFailed(format!(
                "session delete returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
