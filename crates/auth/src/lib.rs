//! Federated-login handshake for the Retenly frontend shell.
//!
//! This crate provides:
//! - The `AuthHandshake` driver: provider redirect, authorization-code
//!   callback, token exchange, and local session establishment
//! - A Fief identity-provider client and an HTTP session store
//! - The auto-login countdown policy layered on top of `begin_login`
//! - Mock collaborators for tests (behind the `mock` feature)

mod autologin;
mod config;
mod handshake;
#[cfg(any(test, feature = "mock"))]
mod navigator;
mod providers;
mod sessions;

pub use autologin::AutoLogin;
pub use config::{AuthConfig, ProviderConfig};
pub use handshake::AuthHandshake;
#[cfg(any(test, feature = "mock"))]
pub use navigator::RecordingNavigator;
#[cfg(any(test, feature = "mock"))]
pub use providers::MockProvider;
pub use providers::FiefProvider;
#[cfg(any(test, feature = "mock"))]
pub use sessions::InMemorySessionStore;
pub use sessions::HttpSessionStore;
