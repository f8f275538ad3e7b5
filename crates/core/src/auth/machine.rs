use std::collections::HashSet;

use super::{AuthError, HandshakePhase, TokenInfo};

/// Mutable record of a single login attempt.
///
/// One instance exists per login surface; all transitions are pure and
/// synchronous, the I/O shell decides when to apply them. The
/// `processed_codes` set is the reentrancy guard: a callback that has
/// already been handled is never handled again, even across a reset.
#[derive(Debug, Clone, Default)]
pub struct HandshakeState {
    phase: HandshakePhase,
    pending_redirect_target: Option<String>,
    last_error: Option<String>,
    token_info: Option<TokenInfo>,
    processed_codes: HashSet<String>,
}

impl HandshakeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> HandshakePhase {
        self.phase
    }

    pub fn pending_redirect_target(&self) -> Option<&str> {
        self.pending_redirect_target.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Present only once the provider has answered with a valid code and
    /// the code has been exchanged. Retained through a session-establish
    /// failure so a retry does not force a fresh provider round trip.
    pub fn token_info(&self) -> Option<&TokenInfo> {
        self.token_info.as_ref()
    }

    /// Start a fresh attempt aimed at `redirect_target`.
    ///
    /// Allowed from `Idle`, `Failed`, or `Complete` (a completed attempt
    /// is terminal; a new login starts a new cycle). Any other phase
    /// means an attempt is mid-flight and the call is rejected without
    /// touching state.
    pub fn begin(&mut self, redirect_target: &str) -> Result<(), AuthError> {
        match self.phase {
            HandshakePhase::Idle | HandshakePhase::Failed | HandshakePhase::Complete => {
                self.phase = HandshakePhase::AwaitingRedirect;
                self.pending_redirect_target = Some(redirect_target.to_string());
                self.last_error = None;
                self.token_info = None;
                Ok(())
            }
            _ => Err(AuthError::AlreadyInProgress),
        }
    }

    /// Record that the provider redirected back with `code`.
    ///
    /// Returns `false` when this exact code was already handled or an
    /// exchange is already past the callback point, in which case the
    /// caller must treat the invocation as a no-op.
    pub fn callback_received(&mut self, code: &str) -> bool {
        if self.processed_codes.contains(code) {
            return false;
        }
        match self.phase {
            HandshakePhase::Idle
            | HandshakePhase::AwaitingRedirect
            | HandshakePhase::AwaitingCallback => {
                self.processed_codes.insert(code.to_string());
                self.phase = HandshakePhase::AwaitingCallback;
                true
            }
            _ => false,
        }
    }

    /// The navigation to the provider's authorization endpoint could not
    /// be made.
    pub fn redirect_failed(&mut self, message: &str) {
        self.last_error = Some(message.to_string());
        self.phase = HandshakePhase::Failed;
    }

    /// Begin the code exchange with the target recovered from the state
    /// token (or the caller's fallback default).
    pub fn exchange_started(&mut self, redirect_target: &str) {
        self.pending_redirect_target = Some(redirect_target.to_string());
        self.last_error = None;
        self.phase = HandshakePhase::ExchangingToken;
    }

    pub fn exchange_succeeded(&mut self, token: TokenInfo) {
        self.token_info = Some(token);
        self.phase = HandshakePhase::EstablishingSession;
    }

    pub fn exchange_failed(&mut self, message: &str) {
        self.last_error = Some(message.to_string());
        self.token_info = None;
        self.phase = HandshakePhase::Failed;
    }

    pub fn session_established(&mut self) {
        self.phase = HandshakePhase::Complete;
    }

    /// The token already obtained is kept so a retry can reuse it.
    pub fn session_failed(&mut self, message: &str) {
        self.last_error = Some(message.to_string());
        self.phase = HandshakePhase::Failed;
    }

    /// Re-enter `EstablishingSession` with the retained token after a
    /// session-establish failure. Returns `false` when there is nothing
    /// to retry.
    pub fn session_retry(&mut self) -> bool {
        if self.phase == HandshakePhase::Failed && self.token_info.is_some() {
            self.last_error = None;
            self.phase = HandshakePhase::EstablishingSession;
            true
        } else {
            false
        }
    }

    /// Back to `Idle`, clearing the error and token. Processed codes are
    /// kept: a reset must not allow an old callback URL to be replayed.
    pub fn reset(&mut self) {
        self.phase = HandshakePhase::Idle;
        self.pending_redirect_target = None;
        self.last_error = None;
        self.token_info = None;
    }
}
