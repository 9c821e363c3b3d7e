//! Credential verifiers, one per authentication factor.
//!
//! Both verifiers fail closed: an unconfigured access key rejects every
//! candidate, and any provider failure counts as "not verified" rather
//! than a pass or a crash.

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use tracing::warn;

use super::casdoor::{CasdoorClient, Identity};
use super::error::AuthError;

/// Exact, case-sensitive comparison of the candidate against the
/// configured access key. Digests are compared rather than the raw
/// strings so the comparison cost does not depend on the match prefix.
///
/// # Errors
///
/// `MissingCredential` for an empty candidate, `InvalidCredential` on
/// mismatch or when no key is configured.
pub fn verify_api_key(candidate: &str, configured: &SecretString) -> Result<(), AuthError> {
    if candidate.is_empty() {
        return Err(AuthError::MissingCredential("Missing API key"));
    }

    let configured = configured.expose_secret();
    if configured.is_empty() {
        warn!("access key is not configured, rejecting all candidates");
        return Err(AuthError::InvalidCredential("Invalid API key"));
    }

    let candidate_digest = Sha256::digest(candidate.as_bytes());
    let configured_digest = Sha256::digest(configured.as_bytes());
    if candidate_digest == configured_digest {
        Ok(())
    } else {
        Err(AuthError::InvalidCredential("Invalid API key"))
    }
}

/// Resolve a bearer token to an identity via the provider's account
/// endpoint. `Ok` only on HTTP 200 with a well-formed subject record.
///
/// # Errors
///
/// `MissingCredential` for an empty token, `UpstreamUnavailable` when
/// the provider cannot answer, `InvalidCredential` otherwise.
pub async fn verify_identity_token(
    client: &CasdoorClient,
    bearer_token: &str,
) -> Result<Identity, AuthError> {
    if bearer_token.is_empty() {
        return Err(AuthError::MissingCredential("Missing identity token"));
    }

    client.fetch_account(bearer_token).await.map_err(|err| {
        let err = AuthError::from(err);
        if err == AuthError::UpstreamUnavailable {
            warn!("identity provider unreachable during token verification");
        }
        err
    })
}
