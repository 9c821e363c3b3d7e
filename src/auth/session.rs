//! Session token codec.
//!
//! Issues and verifies the compact `HS256` token that asserts both
//! authentication stages succeeded. Tokens are self-contained and signed
//! with a process-wide symmetric secret; the server keeps no session
//! state, so verification is a pure function over (token, secret, now).

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use utoipa::ToSchema;

type HmacSha256 = Hmac<Sha256>;

/// Default session lifetime: 7 days.
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

const ALG: &str = "HS256";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct SessionTokenHeader {
    alg: String,
    typ: String,
}

impl SessionTokenHeader {
    fn hs256() -> Self {
        Self {
            alg: ALG.to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Signed assertion of completed dual-factor authentication.
///
/// A token is fully authenticated iff both flags are true, the signature
/// validates, and the expiry has not passed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct SessionClaims {
    pub sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub key_verified: bool,
    pub identity_verified: bool,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    #[must_use]
    pub fn fully_authenticated(&self) -> bool {
        self.key_verified && self.identity_verified
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("signing secret not configured")]
    UnconfiguredSecret,
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, Error> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, Error> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| Error::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Symmetric codec shared by the issuance handler and the request gate.
#[derive(Clone)]
pub struct SessionCodec {
    secret: SecretString,
    ttl_seconds: i64,
}

impl SessionCodec {
    #[must_use]
    pub fn new(secret: SecretString, ttl_seconds: i64) -> Self {
        Self {
            secret,
            ttl_seconds,
        }
    }

    /// Fails closed: an unconfigured (empty) secret never signs or
    /// verifies anything.
    fn mac(&self) -> Result<HmacSha256, Error> {
        let secret = self.secret.expose_secret();
        if secret.is_empty() {
            return Err(Error::UnconfiguredSecret);
        }
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| Error::UnconfiguredSecret)
    }

    /// Issue a signed session token for the given subject.
    ///
    /// # Errors
    ///
    /// Returns an error if the signing secret is unconfigured or the
    /// claims cannot be encoded.
    pub fn issue(
        &self,
        sub: &str,
        email: Option<String>,
        key_verified: bool,
        identity_verified: bool,
    ) -> Result<String, Error> {
        self.issue_at(
            sub,
            email,
            key_verified,
            identity_verified,
            Utc::now().timestamp(),
        )
    }

    /// Deterministic variant of [`Self::issue`] given an explicit clock.
    pub fn issue_at(
        &self,
        sub: &str,
        email: Option<String>,
        key_verified: bool,
        identity_verified: bool,
        now_unix_seconds: i64,
    ) -> Result<String, Error> {
        let claims = SessionClaims {
            sub: sub.to_string(),
            email,
            key_verified,
            identity_verified,
            iat: now_unix_seconds,
            exp: now_unix_seconds + self.ttl_seconds,
        };

        let header_b64 = b64e_json(&SessionTokenHeader::hs256())?;
        let claims_b64 = b64e_json(&claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Verify a session token and return its decoded claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed, the signature does not
    /// match, or `exp <= now` (the expiry instant itself is rejected).
    pub fn verify(&self, token: &str) -> Result<SessionClaims, Error> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Deterministic variant of [`Self::verify`] given an explicit clock.
    pub fn verify_at(&self, token: &str, now_unix_seconds: i64) -> Result<SessionClaims, Error> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(Error::TokenFormat)?;
        let claims_b64 = parts.next().ok_or(Error::TokenFormat)?;
        let sig_b64 = parts.next().ok_or(Error::TokenFormat)?;
        if parts.next().is_some() {
            return Err(Error::TokenFormat);
        }

        let header: SessionTokenHeader = b64d_json(header_b64)?;
        if header.alg != ALG {
            return Err(Error::UnsupportedAlg(header.alg));
        }

        let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| Error::Base64)?;
        let mut mac = self.mac()?;
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        // Constant-time comparison; the signature check runs before any
        // claim is inspected so bad-signature and expired tokens share a
        // single verification path.
        mac.verify_slice(&signature)
            .map_err(|_| Error::InvalidSignature)?;

        let claims: SessionClaims = b64d_json(claims_b64)?;
        if claims.exp <= now_unix_seconds {
            return Err(Error::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn codec() -> SessionCodec {
        SessionCodec::new(
            SecretString::from("fixture-signing-secret".to_string()),
            DEFAULT_TOKEN_TTL_SECONDS,
        )
    }

    #[test]
    fn issue_and_verify_round_trip() -> Result<(), Error> {
        let codec = codec();
        let token = codec.issue_at(
            "alice",
            Some("alice@example.com".to_string()),
            true,
            true,
            NOW,
        )?;

        let claims = codec.verify_at(&token, NOW)?;
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.email.as_deref(), Some("alice@example.com"));
        assert!(claims.key_verified);
        assert!(claims.identity_verified);
        assert!(claims.fully_authenticated());
        assert_eq!(claims.iat, NOW);
        assert_eq!(claims.exp, NOW + DEFAULT_TOKEN_TTL_SECONDS);
        Ok(())
    }

    #[test]
    fn verify_preserves_issued_flags() -> Result<(), Error> {
        let codec = codec();
        let token = codec.issue_at("bob", None, true, false, NOW)?;
        let claims = codec.verify_at(&token, NOW)?;
        assert!(claims.key_verified);
        assert!(!claims.identity_verified);
        assert!(!claims.fully_authenticated());
        Ok(())
    }

    #[test]
    fn rejects_at_and_after_expiry() -> Result<(), Error> {
        let codec = codec();
        let token = codec.issue_at("alice", None, true, true, NOW)?;

        // One second before expiry still verifies.
        let just_before = NOW + DEFAULT_TOKEN_TTL_SECONDS - 1;
        assert!(codec.verify_at(&token, just_before).is_ok());

        // The expiry instant itself counts as expired.
        let at_expiry = NOW + DEFAULT_TOKEN_TTL_SECONDS;
        assert!(matches!(
            codec.verify_at(&token, at_expiry),
            Err(Error::Expired)
        ));
        assert!(matches!(
            codec.verify_at(&token, at_expiry + 1),
            Err(Error::Expired)
        ));
        Ok(())
    }

    #[test]
    fn rejects_tampered_payload() -> Result<(), Error> {
        let codec = codec();
        let token = codec.issue_at("alice", None, true, true, NOW)?;

        // Flip one character in the claims segment.
        let mut parts: Vec<String> = token.split('.').map(ToString::to_string).collect();
        let mut claims_bytes = parts[1].clone().into_bytes();
        claims_bytes[0] = if claims_bytes[0] == b'A' { b'B' } else { b'A' };
        parts[1] = String::from_utf8(claims_bytes).expect("ascii");
        let tampered = parts.join(".");

        assert!(matches!(
            codec.verify_at(&tampered, NOW),
            Err(Error::InvalidSignature) | Err(Error::Base64) | Err(Error::Json(_))
        ));
        Ok(())
    }

    #[test]
    fn rejects_signature_from_other_secret() -> Result<(), Error> {
        let codec = codec();
        let other = SessionCodec::new(
            SecretString::from("other-secret".to_string()),
            DEFAULT_TOKEN_TTL_SECONDS,
        );
        let token = other.issue_at("alice", None, true, true, NOW)?;
        assert!(matches!(
            codec.verify_at(&token, NOW),
            Err(Error::InvalidSignature)
        ));
        Ok(())
    }

    #[test]
    fn rejects_malformed_tokens() {
        let codec = codec();
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.!!.!!"] {
            assert!(codec.verify_at(token, NOW).is_err(), "accepted {token:?}");
        }
    }

    #[test]
    fn unconfigured_secret_fails_closed() {
        let codec = SessionCodec::new(SecretString::default(), DEFAULT_TOKEN_TTL_SECONDS);
        assert!(matches!(
            codec.issue_at("alice", None, true, true, NOW),
            Err(Error::UnconfiguredSecret)
        ));

        // A token signed elsewhere is not accepted either.
        let other = SessionCodec::new(SecretString::from("secret".to_string()), 60);
        let token = other
            .issue_at("alice", None, true, true, NOW)
            .expect("issue");
        assert!(matches!(
            codec.verify_at(&token, NOW),
            Err(Error::UnconfiguredSecret)
        ));
    }

    #[test]
    fn honors_configured_ttl() -> Result<(), Error> {
        let codec = SessionCodec::new(SecretString::from("secret".to_string()), 60);
        let token = codec.issue_at("alice", None, true, true, NOW)?;
        assert!(codec.verify_at(&token, NOW + 59).is_ok());
        assert!(matches!(
            codec.verify_at(&token, NOW + 60),
            Err(Error::Expired)
        ));
        Ok(())
    }
}
