//! Authentication configuration and shared state.
//!
//! Built once in the CLI dispatcher and injected into the router as an
//! `Arc<AuthState>` extension. Handlers never read the environment.

use anyhow::Result;
use secrecy::SecretString;

use super::casdoor::{CasdoorClient, CasdoorConfig, REDIRECT_PATH};
use super::session::{SessionCodec, DEFAULT_TOKEN_TTL_SECONDS};

#[derive(Debug, Clone)]
pub struct AuthConfig {
    base_url: String,
    access_key: SecretString,
    signing_secret: SecretString,
    token_ttl_seconds: i64,
    casdoor: CasdoorConfig,
}

impl AuthConfig {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_key: SecretString::default(),
            signing_secret: SecretString::default(),
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            casdoor: CasdoorConfig::default(),
        }
    }

    #[must_use]
    pub fn with_access_key(mut self, access_key: SecretString) -> Self {
        self.access_key = access_key;
        self
    }

    #[must_use]
    pub fn with_signing_secret(mut self, signing_secret: SecretString) -> Self {
        self.signing_secret = signing_secret;
        self
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, ttl: i64) -> Self {
        self.token_ttl_seconds = ttl;
        self
    }

    #[must_use]
    pub fn with_casdoor(mut self, casdoor: CasdoorConfig) -> Self {
        self.casdoor = casdoor;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub const fn access_key(&self) -> &SecretString {
        &self.access_key
    }

    #[must_use]
    pub const fn signing_secret(&self) -> &SecretString {
        &self.signing_secret
    }

    #[must_use]
    pub const fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }

    #[must_use]
    pub const fn casdoor(&self) -> &CasdoorConfig {
        &self.casdoor
    }

    /// Absolute callback URL registered with the identity provider.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("{}{REDIRECT_PATH}", self.base_url)
    }
}

/// Everything the auth handlers and the gate share per process.
pub struct AuthState {
    config: AuthConfig,
    codec: SessionCodec,
    casdoor: CasdoorClient,
}

impl AuthState {
    /// # Errors
    ///
    /// Returns an error if the identity-provider HTTP client cannot be
    /// built.
    pub fn new(config: AuthConfig) -> Result<Self> {
        let codec = SessionCodec::new(
            config.signing_secret().clone(),
            config.token_ttl_seconds(),
        );
        let casdoor = CasdoorClient::new(config.casdoor().clone())?;
        Ok(Self {
            config,
            codec,
            casdoor,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub const fn codec(&self) -> &SessionCodec {
        &self.codec
    }

    #[must_use]
    pub const fn casdoor(&self) -> &CasdoorClient {
        &self.casdoor
    }
}
