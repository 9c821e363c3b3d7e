//! # Ethan Hole
//!
//! Backend for an anonymous bulletin board ("holes") protected by
//! dual-factor authentication: a shared-secret API key plus a Casdoor
//! (`OAuth2`) identity, collapsed into a single signed session token.
//!
//! ## Authentication model
//!
//! Login is a two-stage handshake. Stage 1 verifies the API key, stage 2
//! verifies a Casdoor bearer token obtained via the authorization-code
//! flow. Only when both succeed does the server issue a compact `HS256`
//! session token carrying `key_verified` and `identity_verified` claims.
//! Steady-state requests are gated on that token alone; the credential
//! verifiers never run outside the handshake.
//!
//! Session tokens are self-contained and never persisted server-side, so
//! instances share nothing but the signing secret.

pub mod api;
pub mod auth;
pub mod cli;
pub mod client;
pub mod hole;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
