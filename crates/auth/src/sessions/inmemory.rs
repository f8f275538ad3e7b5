//! In-memory session store for tests.

use std::sync::Arc;

use async_trait::async_trait;
use retenly_core::auth::{AuthError, Result, SessionBackend};
use tokio::sync::RwLock;

/// Records the tokens sessions were created from, and can be switched to
/// fail so tests can drive the session-establishment failure path.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    created_tokens: Arc<RwLock<Vec<String>>>,
    failure: Arc<RwLock<Option<String>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokens passed to `create_from_token`, in order.
    pub async fn created_tokens(&self) -> Vec<String> {
        self.created_tokens.read().await.clone()
    }

    pub async fn has_session(&self) -> bool {
        !self.created_tokens.read().await.is_empty()
    }

    /// Make every subsequent `create_from_token` fail with `message`.
    pub async fn fail_with(&self, message: &str) {
        *self.failure.write().await = Some(message.to_string());
    }

    /// Clear a previously configured failure.
    pub async fn recover(&self) {
        *self.failure.write().await = None;
    }
}

#[async_trait]
impl SessionBackend for InMemorySessionStore {
    async fn create_from_token(&self, access_token: &str) -> Result<()> {
        if let Some(message) = self.failure.read().await.clone() {
            return Err(AuthError::SessionEstablishFailed(message));
        }
        self.created_tokens
            .write()
            .await
            .push(access_token.to_string());
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        self.created_tokens.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_created_tokens() {
        let store = InMemorySessionStore::new();
        store.create_from_token("token-1").await.unwrap();
        store.create_from_token("token-2").await.unwrap();
        assert_eq!(store.created_tokens().await, vec!["token-1", "token-2"]);
    }

    #[tokio::test]
    async fn destroy_clears_sessions() {
        let store = InMemorySessionStore::new();
        store.create_from_token("token-1").await.unwrap();
        store.destroy().await.unwrap();
        assert!(!store.has_session().await);
    }

    #[tokio::test]
    async fn fails_when_configured_then_recovers() {
        let store = InMemorySessionStore::new();
        store.fail_with("backend unavailable").await;
        assert!(store.create_from_token("token-1").await.is_err());

        store.recover().await;
        store.create_from_token("token-1").await.unwrap();
        assert!(store.has_session().await);
    }
}
