//! The federated-login handshake driver.
//!
//! Coordinates the redirect to the identity provider, the
//! authorization-code callback, the token exchange, and the handoff into
//! local session establishment. Every external call can fail
//! independently; each failure is recorded into the handshake state and
//! returned to the caller, never retried automatically.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use retenly_core::auth::{
    decode_state, encode_state, parse_callback, strip_callback_params, validate_redirect_target,
    AuthError, HandshakePhase, HandshakeState, IdentityProvider, Navigator, Result,
    SessionBackend, TokenInfo,
};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use url::Url;

use crate::config::AuthConfig;
use crate::providers::FiefProvider;
use crate::sessions::HttpSessionStore;

/// Drives a user through the external-identity-provider login and into a
/// local session.
///
/// Cheap to clone; clones share the same attempt state. The state lock is
/// never held across a network call: the machine's processed-codes guard
/// is what keeps a re-invocation from starting a second exchange for the
/// same code while one is in flight.
#[derive(Clone)]
pub struct AuthHandshake {
    state: Arc<Mutex<HandshakeState>>,
    provider: Option<Arc<dyn IdentityProvider>>,
    sessions: Arc<dyn SessionBackend>,
    navigator: Arc<dyn Navigator>,
    site_url: Url,
    default_redirect: String,
    closed: Arc<AtomicBool>,
}

impl AuthHandshake {
    pub fn new(
        provider: Option<Arc<dyn IdentityProvider>>,
        sessions: Arc<dyn SessionBackend>,
        navigator: Arc<dyn Navigator>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(HandshakeState::new())),
            provider,
            sessions,
            navigator,
            site_url: config.site_url.clone(),
            default_redirect: config.default_redirect.clone(),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build a handshake wired to the real Fief provider and the HTTP
    /// session store described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the callback URL cannot be derived or the
    /// provider client cannot be built.
    pub fn from_config(config: &AuthConfig, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let provider = match &config.provider {
            Some(provider_config) => {
                let callback_url = config
                    .callback_url()
                    .map_err(|e| AuthError::Provider(e.to_string()))?;
                let fief = FiefProvider::new(provider_config, callback_url)?;
                Some(Arc::new(fief) as Arc<dyn IdentityProvider>)
            }
            None => None,
        };
        let sessions = Arc::new(HttpSessionStore::new(config.api_base_url.clone()));
        Ok(Self::new(provider, sessions, navigator, config))
    }

    pub async fn phase(&self) -> HandshakePhase {
        self.state.lock().await.phase()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.lock().await.last_error().map(String::from)
    }

    pub async fn token_info(&self) -> Option<TokenInfo> {
        self.state.lock().await.token_info().cloned()
    }

    /// Start a login attempt and navigate to the provider's authorization
    /// endpoint, with `redirect_target` round-tripped through the opaque
    /// state parameter.
    ///
    /// Fails fast with `ConfigMissing` when no provider is configured;
    /// no navigation is attempted in that case. An invalid target falls
    /// back to the configured default. Navigation is attempted at most
    /// once per invocation.
    pub async fn begin_login(&self, redirect_target: &str) -> Result<()> {
        let provider = self.provider.as_ref().ok_or(AuthError::ConfigMissing)?;

        let target = validate_redirect_target(redirect_target).unwrap_or(&self.default_redirect);
        self.state.lock().await.begin(target)?;
        info!(redirect_target = target, "starting federated login");

        let state_token = encode_state(target);
        let auth_url = match provider.authorization_url(&state_token).await {
            Ok(url) => url,
            Err(e) => {
                let message = e.to_string();
                if !self.is_closed() {
                    self.state.lock().await.redirect_failed(&message);
                }
                error!("failed to build authorization URL: {message}");
                return Err(e);
            }
        };

        if self.is_closed() {
            return Ok(());
        }

        if let Err(e) = self.navigator.navigate(auth_url.as_str()) {
            let message = e.to_string();
            self.state.lock().await.redirect_failed(&message);
            error!("failed to navigate to identity provider: {message}");
            return Err(e);
        }
        Ok(())
    }

    /// Process the URL the browser loaded after the provider redirected
    /// back. Safe to call on every render: a URL without an authorization
    /// code, or one whose code was already handled, is a no-op.
    ///
    /// The `code`/`state` parameters are stripped from the visible URL
    /// before the exchange, so a refresh cannot replay them whether the
    /// exchange succeeds or fails. On a successful exchange the session
    /// is established automatically and the browser is sent to the
    /// recovered redirect target.
    pub async fn handle_return(&self, current_url: &Url) -> Result<()> {
        let Some(params) = parse_callback(current_url) else {
            return Ok(());
        };
        let provider = self.provider.as_ref().ok_or(AuthError::ConfigMissing)?;

        let target = {
            let mut state = self.state.lock().await;
            if !state.callback_received(&params.code) {
                return Ok(());
            }
            // Recover the target round-tripped through the provider. A
            // missing or unrecognized state token falls back to the
            // configured default rather than failing the handshake.
            let recovered = params
                .state
                .as_deref()
                .and_then(decode_state)
                .and_then(|t| validate_redirect_target(&t).map(str::to_string));
            let target = recovered.unwrap_or_else(|| self.default_redirect.clone());
            state.exchange_started(&target);
            target
        };
        info!(redirect_target = %target, "authorization code received, exchanging");

        let stripped = strip_callback_params(current_url);
        if let Err(e) = self.navigator.rewrite_location(&stripped) {
            warn!("failed to strip callback parameters from URL: {e}");
        }

        let token = match provider.exchange_code(&params.code).await {
            Ok(token) => token,
            Err(e) => {
                if self.is_closed() {
                    return Ok(());
                }
                let message = e.to_string();
                self.state.lock().await.exchange_failed(&message);
                warn!("token exchange failed: {message}");
                return Err(e);
            }
        };

        if self.is_closed() {
            return Ok(());
        }
        let access_token = token.access_token.clone();
        self.state.lock().await.exchange_succeeded(token);

        self.establish_session(&access_token, &target).await
    }

    /// Retry session establishment with the token retained from a failed
    /// attempt, without a fresh provider round trip.
    pub async fn retry_session(&self) -> Result<()> {
        let (access_token, target) = {
            let mut state = self.state.lock().await;
            if !state.session_retry() {
                return Err(AuthError::SessionEstablishFailed(
                    "no retained token to retry with".to_string(),
                ));
            }
            let token = state
                .token_info()
                .map(|t| t.access_token.clone())
                .unwrap_or_default();
            let target = state
                .pending_redirect_target()
                .unwrap_or(&self.default_redirect)
                .to_string();
            (token, target)
        };
        self.establish_session(&access_token, &target).await
    }

    async fn establish_session(&self, access_token: &str, target: &str) -> Result<()> {
        if let Err(e) = self.sessions.create_from_token(access_token).await {
            if self.is_closed() {
                return Ok(());
            }
            let message = e.to_string();
            self.state.lock().await.session_failed(&message);
            error!("session establishment failed: {message}");
            return Err(e);
        }

        if self.is_closed() {
            return Ok(());
        }
        self.state.lock().await.session_established();
        info!(redirect_target = target, "session established, returning to application");

        if let Err(e) = self.navigator.navigate(target) {
            warn!("failed to navigate to redirect target: {e}");
        }
        Ok(())
    }

    /// End the local session, then the provider-side one.
    ///
    /// The provider leg is best-effort: when the provider is not
    /// configured or its logout URL cannot be obtained, the user is sent
    /// to the default redirect instead.
    pub async fn logout(&self) -> Result<()> {
        if let Err(e) = self.sessions.destroy().await {
            warn!("failed to end local session: {e}");
        }
        self.state.lock().await.reset();

        let logout_url = match &self.provider {
            Some(provider) => provider.logout_url(&self.site_url).await,
            None => Err(AuthError::ConfigMissing),
        };
        match logout_url {
            Ok(url) => self.navigator.navigate(url.as_str()),
            Err(e) => {
                warn!("provider logout unavailable, falling back: {e}");
                self.navigator.navigate(&self.default_redirect)
            }
        }
    }

    /// Return to `Idle`, clearing the last error and any token. Used
    /// before starting a fresh attempt after a failure.
    pub async fn reset(&self) {
        self.state.lock().await.reset();
    }

    /// Teardown guard: after this, any in-flight provider or session
    /// response is discarded instead of being applied to the state.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use chrono::Utc;
    use retenly_core::auth::UserInfo;
    use tokio::sync::Notify;

    use crate::navigator::RecordingNavigator;
    use crate::providers::MockProvider;
    use crate::sessions::InMemorySessionStore;

    struct Harness {
        handshake: AuthHandshake,
        provider: Arc<MockProvider>,
        sessions: Arc<InMemorySessionStore>,
        navigator: Arc<RecordingNavigator>,
    }

    fn test_config() -> AuthConfig {
        AuthConfig {
            provider: None,
            site_url: Url::parse("http://localhost:3000").unwrap(),
            api_base_url: Url::parse("http://localhost:3000").unwrap(),
            default_redirect: "/".to_string(),
            auto_login_delay: None,
        }
    }

    fn harness() -> Harness {
        let provider = Arc::new(MockProvider::new(
            Url::parse("http://localhost:3001").unwrap(),
            Url::parse("http://localhost:3000/auth/login").unwrap(),
        ));
        let sessions = Arc::new(InMemorySessionStore::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let handshake = AuthHandshake::new(
            Some(provider.clone() as Arc<dyn IdentityProvider>),
            sessions.clone() as Arc<dyn SessionBackend>,
            navigator.clone() as Arc<dyn Navigator>,
            &test_config(),
        );
        Harness {
            handshake,
            provider,
            sessions,
            navigator,
        }
    }

    fn callback_url(code: &str, state: Option<&str>) -> Url {
        let mut url = Url::parse("http://localhost:3000/auth/login").unwrap();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("code", code);
            if let Some(state) = state {
                pairs.append_pair("state", state);
            }
        }
        url
    }

    // ==================== begin_login ====================

    #[tokio::test]
    async fn begin_login_navigates_with_round_trippable_state() {
        let h = harness();
        h.handshake.begin_login("/dashboard/7").await.unwrap();

        assert_eq!(h.handshake.phase().await, HandshakePhase::AwaitingRedirect);

        let destination = Url::parse(&h.navigator.last_navigation().unwrap()).unwrap();
        assert_eq!(destination.path(), "/authorize");

        let state = destination
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.to_string())
            .unwrap();
        assert_eq!(decode_state(&state), Some("/dashboard/7".to_string()));
    }

    #[tokio::test]
    async fn begin_login_falls_back_on_invalid_target() {
        let h = harness();
        h.handshake.begin_login("https://evil.com").await.unwrap();

        let destination = Url::parse(&h.navigator.last_navigation().unwrap()).unwrap();
        let state = destination
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.to_string())
            .unwrap();
        assert_eq!(decode_state(&state), Some("/".to_string()));
    }

    #[tokio::test]
    async fn begin_login_without_provider_fails_fast() {
        let config = test_config();
        let sessions = Arc::new(InMemorySessionStore::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let handshake = AuthHandshake::new(
            None,
            sessions as Arc<dyn SessionBackend>,
            navigator.clone() as Arc<dyn Navigator>,
            &config,
        );

        let err = handshake.begin_login("/dashboard").await.unwrap_err();
        assert!(matches!(err, AuthError::ConfigMissing));
        assert!(navigator.navigations().is_empty());
        assert_eq!(handshake.phase().await, HandshakePhase::Idle);
    }

    #[tokio::test]
    async fn begin_login_records_navigation_failure() {
        let h = harness();
        h.navigator.fail_navigation_with("popup blocked");

        let err = h.handshake.begin_login("/dashboard").await.unwrap_err();
        assert!(matches!(err, AuthError::RedirectFailed(_)));
        assert_eq!(h.handshake.phase().await, HandshakePhase::Failed);
        assert!(h
            .handshake
            .last_error()
            .await
            .unwrap()
            .contains("popup blocked"));
    }

    #[tokio::test]
    async fn begin_login_rejected_mid_attempt() {
        let h = harness();
        h.handshake.begin_login("/dashboard").await.unwrap();
        // Simulate the callback leg having started an exchange.
        h.handshake
            .state
            .lock()
            .await
            .callback_received("some-code");

        let err = h.handshake.begin_login("/reports").await.unwrap_err();
        assert!(matches!(err, AuthError::AlreadyInProgress));
    }

    // ==================== handle_return ====================

    #[tokio::test]
    async fn return_without_code_is_a_noop() {
        let h = harness();
        let url = Url::parse("http://localhost:3000/auth/login").unwrap();

        h.handshake.handle_return(&url).await.unwrap();

        assert_eq!(h.handshake.phase().await, HandshakePhase::Idle);
        assert_eq!(h.provider.exchange_count(), 0);
        assert!(h.navigator.rewrites().is_empty());
    }

    #[tokio::test]
    async fn full_round_trip_lands_on_redirect_target() {
        let h = harness();
        let code = MockProvider::make_code("user-1", Some("user@retenly.com"), None);
        let url = callback_url(&code, Some(&encode_state("/dashboard")));

        h.handshake.handle_return(&url).await.unwrap();

        assert_eq!(h.handshake.phase().await, HandshakePhase::Complete);
        assert_eq!(h.navigator.last_navigation(), Some("/dashboard".to_string()));
        assert_eq!(
            h.sessions.created_tokens().await,
            vec!["mock-token-user-1".to_string()]
        );

        let token = h.handshake.token_info().await.unwrap();
        assert_eq!(token.user_info.subject, "user-1");
    }

    #[tokio::test]
    async fn callback_params_are_stripped_from_visible_url() {
        let h = harness();
        let code = MockProvider::make_code("user-1", None, None);
        let url = callback_url(&code, Some(&encode_state("/dashboard")));

        h.handshake.handle_return(&url).await.unwrap();

        let rewrites = h.navigator.rewrites();
        assert_eq!(rewrites.len(), 1);
        assert_eq!(rewrites[0].as_str(), "http://localhost:3000/auth/login");
    }

    #[tokio::test]
    async fn repeated_return_exchanges_at_most_once() {
        let h = harness();
        let code = MockProvider::make_code("user-1", None, None);
        let url = callback_url(&code, Some(&encode_state("/dashboard")));

        h.handshake.handle_return(&url).await.unwrap();
        h.handshake.handle_return(&url).await.unwrap();
        h.handshake.handle_return(&url).await.unwrap();

        assert_eq!(h.provider.exchange_count(), 1);
        assert_eq!(h.sessions.created_tokens().await.len(), 1);
    }

    #[tokio::test]
    async fn missing_state_falls_back_to_default_redirect() {
        let h = harness();
        let code = MockProvider::make_code("user-1", None, None);
        let url = callback_url(&code, None);

        h.handshake.handle_return(&url).await.unwrap();

        assert_eq!(h.handshake.phase().await, HandshakePhase::Complete);
        assert_eq!(h.navigator.last_navigation(), Some("/".to_string()));
    }

    #[tokio::test]
    async fn unrecognized_state_falls_back_to_default_redirect() {
        let h = harness();
        let code = MockProvider::make_code("user-1", None, None);
        let url = callback_url(&code, Some("definitely-not-ours"));

        h.handshake.handle_return(&url).await.unwrap();

        assert_eq!(h.handshake.phase().await, HandshakePhase::Complete);
        assert_eq!(h.navigator.last_navigation(), Some("/".to_string()));
    }

    #[tokio::test]
    async fn exchange_failure_never_reaches_session_store() {
        let h = harness();
        h.provider.fail_exchanges_with("code expired");
        let code = MockProvider::make_code("user-1", None, None);
        let url = callback_url(&code, Some(&encode_state("/dashboard")));

        let err = h.handshake.handle_return(&url).await.unwrap_err();
        assert!(matches!(err, AuthError::ExchangeFailed(_)));

        assert_eq!(h.handshake.phase().await, HandshakePhase::Failed);
        assert!(h.handshake.token_info().await.is_none());
        assert!(h.sessions.created_tokens().await.is_empty());
        // The URL is stripped even on the failure path.
        assert_eq!(h.navigator.rewrites().len(), 1);
        // No navigation away from the login page either.
        assert!(h.navigator.navigations().is_empty());
    }

    #[tokio::test]
    async fn session_failure_retains_token() {
        let h = harness();
        h.sessions.fail_with("backend unavailable").await;
        let code = MockProvider::make_code("user-1", None, None);
        let url = callback_url(&code, Some(&encode_state("/dashboard")));

        let err = h.handshake.handle_return(&url).await.unwrap_err();
        assert!(matches!(err, AuthError::SessionEstablishFailed(_)));

        assert_eq!(h.handshake.phase().await, HandshakePhase::Failed);
        let token = h.handshake.token_info().await.unwrap();
        assert_eq!(token.access_token, "mock-token-user-1");
    }

    #[tokio::test]
    async fn retry_session_reuses_retained_token() {
        let h = harness();
        h.sessions.fail_with("backend unavailable").await;
        let code = MockProvider::make_code("user-1", None, None);
        let url = callback_url(&code, Some(&encode_state("/dashboard")));
        h.handshake.handle_return(&url).await.unwrap_err();

        h.sessions.recover().await;
        h.handshake.retry_session().await.unwrap();

        assert_eq!(h.handshake.phase().await, HandshakePhase::Complete);
        assert_eq!(h.navigator.last_navigation(), Some("/dashboard".to_string()));
        // Retried with the retained token, without a second exchange.
        assert_eq!(h.provider.exchange_count(), 1);
        assert_eq!(
            h.sessions.created_tokens().await,
            vec!["mock-token-user-1".to_string()]
        );
    }

    #[tokio::test]
    async fn retry_session_refused_without_token() {
        let h = harness();
        let err = h.handshake.retry_session().await.unwrap_err();
        assert!(matches!(err, AuthError::SessionEstablishFailed(_)));
    }

    // ==================== teardown ====================

    struct GatedProvider {
        release: Arc<Notify>,
    }

    #[async_trait]
    impl IdentityProvider for GatedProvider {
        async fn authorization_url(&self, _state: &str) -> Result<Url> {
            Ok(Url::parse("http://localhost:3001/authorize").unwrap())
        }

        async fn exchange_code(&self, _code: &str) -> Result<TokenInfo> {
            self.release.notified().await;
            Ok(TokenInfo {
                access_token: "late-token".to_string(),
                user_info: UserInfo {
                    subject: "user-1".to_string(),
                    email: None,
                    name: None,
                },
                obtained_at: Utc::now(),
            })
        }

        async fn logout_url(&self, _redirect_to: &Url) -> Result<Url> {
            Ok(Url::parse("http://localhost:3001/logout").unwrap())
        }
    }

    #[tokio::test]
    async fn late_exchange_response_is_discarded_after_close() {
        let release = Arc::new(Notify::new());
        let provider = Arc::new(GatedProvider {
            release: release.clone(),
        });
        let sessions = Arc::new(InMemorySessionStore::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let handshake = AuthHandshake::new(
            Some(provider as Arc<dyn IdentityProvider>),
            sessions.clone() as Arc<dyn SessionBackend>,
            navigator.clone() as Arc<dyn Navigator>,
            &test_config(),
        );

        let url = callback_url("gated-code", Some(&encode_state("/dashboard")));
        let in_flight = tokio::spawn({
            let handshake = handshake.clone();
            async move { handshake.handle_return(&url).await }
        });

        // Let the exchange reach its await point, then tear down.
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        handshake.close();
        release.notify_one();

        in_flight.await.unwrap().unwrap();

        // The late token was discarded: no session, no navigation, no
        // token applied to state.
        assert!(handshake.token_info().await.is_none());
        assert!(sessions.created_tokens().await.is_empty());
        assert!(navigator.navigations().is_empty());
        assert_ne!(handshake.phase().await, HandshakePhase::Complete);
    }

    // ==================== logout ====================

    #[tokio::test]
    async fn logout_destroys_session_and_visits_provider() {
        let h = harness();
        h.sessions.create_from_token("existing").await.unwrap();

        h.handshake.logout().await.unwrap();

        assert!(!h.sessions.has_session().await);
        let destination = Url::parse(&h.navigator.last_navigation().unwrap()).unwrap();
        assert_eq!(destination.path(), "/logout");
        assert!(destination
            .query()
            .unwrap()
            .contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000"));
    }

    #[tokio::test]
    async fn logout_falls_back_when_provider_missing() {
        let sessions = Arc::new(InMemorySessionStore::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let handshake = AuthHandshake::new(
            None,
            sessions.clone() as Arc<dyn SessionBackend>,
            navigator.clone() as Arc<dyn Navigator>,
            &test_config(),
        );
        sessions.create_from_token("existing").await.unwrap();

        handshake.logout().await.unwrap();

        assert!(!sessions.has_session().await);
        assert_eq!(navigator.last_navigation(), Some("/".to_string()));
    }

    // ==================== reset ====================

    #[tokio::test]
    async fn reset_clears_failure_for_fresh_attempt() {
        let h = harness();
        h.provider.fail_exchanges_with("code expired");
        let code = MockProvider::make_code("user-1", None, None);
        let url = callback_url(&code, None);
        h.handshake.handle_return(&url).await.unwrap_err();

        h.handshake.reset().await;

        assert_eq!(h.handshake.phase().await, HandshakePhase::Idle);
        assert!(h.handshake.last_error().await.is_none());

        h.handshake.begin_login("/dashboard").await.unwrap();
        assert_eq!(h.handshake.phase().await, HandshakePhase::AwaitingRedirect);
    }
}
