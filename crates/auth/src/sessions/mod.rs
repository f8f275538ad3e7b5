//! Session-store implementations.
//!
//! `HttpSessionStore` talks to the Retenly backend session API;
//! `InMemorySessionStore` backs tests.

mod http;
#[cfg(any(test, feature = "mock"))]
mod inmemory;

pub use http::HttpSessionStore;
#[cfg(any(test, feature = "mock"))]
pub use inmemory::InMemorySessionStore;
