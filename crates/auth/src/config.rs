use std::time::Duration;

use retenly_core::auth::validate_redirect_target;
use url::Url;

/// Configuration for the Fief identity provider.
///
/// Always an explicit record: the provider base URL and client ID are
/// never derived from another setting's internal format. When the record
/// is absent, `begin_login` fails fast with `ConfigMissing` instead of
/// navigating to a malformed endpoint.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: Url,
    pub client_id: String,
}

/// Complete auth configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub provider: Option<ProviderConfig>,
    /// Application origin. The provider redirects back to
    /// `{site_url}/auth/login`, and post-logout navigation lands here.
    pub site_url: Url,
    /// Backend serving the session API.
    pub api_base_url: Url,
    /// Fallback target when the state token is missing or unrecognized.
    pub default_redirect: String,
    /// When set, the login screen schedules an automatic `begin_login`
    /// after this delay unless the user cancels.
    pub auto_login_delay: Option<Duration>,
}

impl AuthConfig {
    /// Load from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SITE_URL`: Application origin (default: `http://localhost:3000`)
    /// - `API_BASE_URL`: Session API base URL (default: `SITE_URL`)
    /// - `FIEF_BASE_URL`: Provider base URL (optional, enables SSO)
    /// - `FIEF_CLIENT_ID`: Provider client ID (required if SSO enabled)
    /// - `DEFAULT_REDIRECT`: Fallback redirect target (default: `/`)
    /// - `AUTO_LOGIN_SECONDS`: Auto-login countdown (default: disabled)
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is partially configured (base URL
    /// without client ID).
    pub fn from_env() -> Result<Self, std::env::VarError> {
        let site_url: Url = std::env::var("SITE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .parse()
            .expect("SITE_URL must be valid URL");

        let api_base_url: Url = std::env::var("API_BASE_URL")
            .unwrap_or_else(|_| site_url.to_string())
            .parse()
            .expect("API_BASE_URL must be valid URL");

        let provider = match std::env::var("FIEF_BASE_URL") {
            Ok(base_url) => Some(ProviderConfig {
                base_url: base_url.parse().expect("FIEF_BASE_URL must be valid URL"),
                client_id: std::env::var("FIEF_CLIENT_ID")?,
            }),
            Err(_) => None,
        };

        let default_redirect = std::env::var("DEFAULT_REDIRECT")
            .ok()
            .filter(|t| validate_redirect_target(t).is_some())
            .unwrap_or_else(|| "/".to_string());

        let auto_login_delay = std::env::var("AUTO_LOGIN_SECONDS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);

        Ok(Self {
            provider,
            site_url,
            api_base_url,
            default_redirect,
            auto_login_delay,
        })
    }

    /// The fixed callback URL the provider redirects back to.
    pub fn callback_url(&self) -> Result<Url, url::ParseError> {
        self.site_url.join("/auth/login")
    }
}
