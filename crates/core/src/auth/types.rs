use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase of a single federated-login attempt.
///
/// The full cycle is `Idle → AwaitingRedirect → (provider round trip) →
/// AwaitingCallback → ExchangingToken → EstablishingSession → Complete`.
/// `Failed` is reachable from the exchange and session-establishment
/// phases and is left only via an explicit reset or a fresh login.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakePhase {
    #[default]
    Idle,
    AwaitingRedirect,
    AwaitingCallback,
    ExchangingToken,
    EstablishingSession,
    Complete,
    Failed,
}

impl std::fmt::Display for HandshakePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingRedirect => write!(f, "awaiting_redirect"),
            Self::AwaitingCallback => write!(f, "awaiting_callback"),
            Self::ExchangingToken => write!(f, "exchanging_token"),
            Self::EstablishingSession => write!(f, "establishing_session"),
            Self::Complete => write!(f, "complete"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Identity claims returned by the provider alongside an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Provider's unique user identifier.
    pub subject: String,
    /// User's email address.
    pub email: Option<String>,
    /// User's display name.
    pub name: Option<String>,
}

/// Result of a successful authorization-code exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Bearer credential for the local session store.
    pub access_token: String,
    /// Claims issued with the token.
    pub user_info: UserInfo,
    pub obtained_at: DateTime<Utc>,
}

/// Query parameters the provider attaches to the callback URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: String,
    /// Opaque state token round-tripped through the provider. May be
    /// absent or garbled; the caller falls back to a default target.
    pub state: Option<String>,
}
