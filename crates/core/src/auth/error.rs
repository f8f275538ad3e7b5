use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("identity provider is not configured")]
    ConfigMissing,

    #[error("failed to navigate to identity provider: {0}")]
    RedirectFailed(String),

    #[error("failed to exchange authorization code: {0}")]
    ExchangeFailed(String),

    #[error("failed to establish local session: {0}")]
    SessionEstablishFailed(String),

    #[error("a login attempt is already in progress")]
    AlreadyInProgress,

    #[error("provider error: {0}")]
    Provider(String),
}
