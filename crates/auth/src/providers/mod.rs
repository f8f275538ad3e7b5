//! Identity-provider clients.
//!
//! `FiefProvider` talks to a real Fief tenant; `MockProvider` decodes
//! self-contained authorization codes for tests.

mod fief;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use fief::FiefProvider;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockProvider;
