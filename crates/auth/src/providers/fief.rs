//! Fief identity-provider client.

use async_trait::async_trait;
use chrono::Utc;
use retenly_core::auth::{AuthError, IdentityProvider, Result, TokenInfo, UserInfo};
use serde::Deserialize;
use url::Url;

use crate::config::ProviderConfig;

/// Client for a Fief tenant (e.g. `https://auth.retenly.com`).
///
/// Uses the tenant's fixed endpoint layout: `/authorize` for the login
/// redirect, `/api/token` for the code exchange, `/api/userinfo` for
/// claims, and `/logout` to end the provider-side session.
pub struct FiefProvider {
    base_url: Url,
    client_id: String,
    redirect_uri: Url,
    http_client: reqwest::Client,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserinfoResponse {
    sub: String,
    email: Option<String>,
    name: Option<String>,
}

impl FiefProvider {
    /// Create a new Fief client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig, redirect_uri: Url) -> Result<Self> {
        // Build HTTP client without redirect following (security requirement)
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::Provider(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.clone(),
            client_id: config.client_id.clone(),
            redirect_uri,
            http_client,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AuthError::Provider(e.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for FiefProvider {
    async fn authorization_url(&self, state: &str) -> Result<Url> {
        let mut url = self.endpoint("/authorize")?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", self.redirect_uri.as_str())
            .append_pair("scope", "openid")
            .append_pair("state", state);
        Ok(url)
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenInfo> {
        let token_url = self.endpoint("/api/token")?;
        let response = self
            .http_client
            .post(token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", &self.client_id),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::ExchangeFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::ExchangeFailed(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::ExchangeFailed(e.to_string()))?;

        let userinfo_url = self.endpoint("/api/userinfo")?;
        let response = self
            .http_client
            .get(userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| AuthError::ExchangeFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AuthError::ExchangeFailed(format!(
                "userinfo endpoint returned {status}"
            )));
        }

        let userinfo: UserinfoResponse = response
            .json()
            .await
            .map_err(|e| AuthError::ExchangeFailed(e.to_string()))?;

        Ok(TokenInfo {
            access_token: token.access_token,
            user_info: UserInfo {
                subject: userinfo.sub,
                email: userinfo.email,
                name: userinfo.name,
            },
            obtained_at: Utc::now(),
        })
    }

    async fn logout_url(&self, redirect_to: &Url) -> Result<Url> {
        let mut url = self.endpoint("/logout")?;
        url.query_pairs_mut()
            .append_pair("redirect_uri", redirect_to.as_str());
        Ok(url)
    }
}
