//! Dual-factor authentication core.
//!
//! Two independent credentials gate access: a shared-secret API key and a
//! Casdoor identity proven via the `OAuth2` authorization-code flow. The
//! handshake collapses both proofs into one signed session token
//! ([`session::SessionClaims`]); from then on every request is judged by
//! that token alone.
//!
//! Nothing in this module holds global state. Configuration is built once
//! at startup ([`config::AuthConfig`]) and injected, so tests run against
//! fixture secrets without touching the environment.

pub mod casdoor;
pub mod config;
pub mod error;
pub mod session;
pub mod verifier;
