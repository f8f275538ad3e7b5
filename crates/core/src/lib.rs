//! Functional core for the Retenly frontend shell.
//!
//! Pure types and transitions for the federated-login handshake, plus the
//! trait seams the I/O shell (`retenly_auth`) implements. Nothing in this
//! crate performs network or browser I/O.

pub mod auth;
