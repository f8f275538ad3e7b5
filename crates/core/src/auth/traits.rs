use async_trait::async_trait;
use url::Url;

use super::{AuthError, TokenInfo};

/// Result type for auth operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Abstraction over the external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authorization endpoint URL the browser is sent to, with the opaque
    /// state token attached.
    async fn authorization_url(&self, state: &str) -> Result<Url>;

    /// Exchange an authorization code for an access token and claims.
    async fn exchange_code(&self, code: &str) -> Result<TokenInfo>;

    /// Provider endpoint that ends the provider-side session and then
    /// redirects to `redirect_to`.
    async fn logout_url(&self, redirect_to: &Url) -> Result<Url>;
}

/// Local session establishment and teardown, given a bearer token.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Establish a local authenticated session from an access token.
    async fn create_from_token(&self, access_token: &str) -> Result<()>;

    /// End the current local session.
    async fn destroy(&self) -> Result<()>;
}

/// The browser address bar, as far as the handshake is concerned.
pub trait Navigator: Send + Sync {
    /// Full-page navigation. `target` may be an absolute URL (the
    /// provider's authorization endpoint) or a relative path within the
    /// application.
    fn navigate(&self, target: &str) -> Result<()>;

    /// Replace the visible URL without navigating, used to strip the
    /// callback query parameters so a refresh cannot replay them.
    fn rewrite_location(&self, url: &Url) -> Result<()>;
}
