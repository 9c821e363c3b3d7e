//! Client-side auth state manager.
//!
//! Drives the handshake against a running server and owns every
//! authentication artifact the client holds: the pending API key while
//! the handshake is in flight, then the session token and cached user
//! info once it completes. The raw key exists only between stage 1 and
//! stage 2 and is wiped the moment the session token is issued.

use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::api::handlers::auth::{
    token::IssueTokenResponse, verify_key::VerifyKeyResponse, verify_token::VerifyTokenResponse,
};
use crate::auth::casdoor::{Identity, PublicConfig};
use crate::auth::session::SessionClaims;

const AUTH_TOKEN_KEY: &str = "auth_token";
const USER_INFO_KEY: &str = "user_info";
const TEMP_API_KEY: &str = "temp_api_key";
const IDENTITY_TOKEN_KEY: &str = "casdoor_token";

/// Where the manager persists its artifacts. Browser builds back this
/// with local storage; tests and native callers use the in-memory one.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: Mutex<HashMap<String, String>>,
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.remove(key);
        }
    }
}

/// Where a handshake currently stands, derived from stored artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStage {
    AwaitingKey,
    AwaitingIdentity,
    Complete,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http request failed")]
    Http(#[from] reqwest::Error),
    #[error("server rejected the request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },
    #[error("{0}")]
    WrongStage(&'static str),
    #[error("invalid response body")]
    Decode(#[from] serde_json::Error),
    #[error("invalid url")]
    Url(#[from] url::ParseError),
}

/// Build the provider login URL from the server's public configuration.
///
/// # Errors
///
/// Returns an error if the configured endpoint is not a valid URL.
pub fn authorize_url(config: &PublicConfig, state: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&format!(
        "{}/login/oauth/authorize",
        config.endpoint.trim_end_matches('/')
    ))?;
    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("scope", "profile")
        .append_pair("state", state);
    Ok(url)
}

pub struct AuthManager<S: TokenStore> {
    base_url: String,
    store: S,
    http: reqwest::Client,
}

impl<S: TokenStore> AuthManager<S> {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, store: S) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
            http,
        })
    }

    #[must_use]
    pub fn stage(&self) -> HandshakeStage {
        if self.store.get(AUTH_TOKEN_KEY).is_some() {
            HandshakeStage::Complete
        } else if self.store.get(TEMP_API_KEY).is_some() {
            HandshakeStage::AwaitingIdentity
        } else {
            HandshakeStage::AwaitingKey
        }
    }

    #[must_use]
    pub fn session_token(&self) -> Option<String> {
        self.store.get(AUTH_TOKEN_KEY)
    }

    #[must_use]
    pub fn cached_user(&self) -> Option<Identity> {
        let raw = self.store.get(USER_INFO_KEY)?;
        serde_json::from_str(&raw).ok()
    }

    /// Stage 1: have the server check the API key, then hold it pending
    /// the identity leg.
    ///
    /// # Errors
    ///
    /// `Rejected` when the server refuses the key; transport failures
    /// surface as `Http`.
    pub async fn submit_key(&self, key: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(format!("{}/api/auth/verify-key", self.base_url))
            .json(&serde_json::json!({ "key": key }))
            .send()
            .await?;
        let response = rejected(response).await?;
        let body: VerifyKeyResponse = response.json().await?;
        if !body.success {
            return Err(ClientError::Rejected {
                status: StatusCode::UNAUTHORIZED,
                message: "Invalid API key".to_string(),
            });
        }

        self.store.set(TEMP_API_KEY, key);
        Ok(())
    }

    /// Record the identity token handed back by the OAuth callback.
    pub fn store_identity_token(&self, identity_token: &str) {
        self.store.set(IDENTITY_TOKEN_KEY, identity_token);
    }

    /// Stage 2: trade the pending key plus the identity token for the
    /// session token. On success every transitional artifact is wiped.
    ///
    /// # Errors
    ///
    /// `WrongStage` when no key is pending, `Rejected` when either
    /// factor fails server-side.
    pub async fn complete_handshake(
        &self,
        identity_token: &str,
    ) -> Result<Identity, ClientError> {
        let Some(key) = self.store.get(TEMP_API_KEY) else {
            return Err(ClientError::WrongStage("no API key pending"));
        };

        let response = self
            .http
            .post(format!("{}/api/auth/token", self.base_url))
            .bearer_auth(identity_token)
            .json(&serde_json::json!({ "key": key }))
            .send()
            .await?;
        let response = rejected(response).await?;
        let body: IssueTokenResponse = response.json().await?;

        self.store.set(AUTH_TOKEN_KEY, &body.token);
        self.store
            .set(USER_INFO_KEY, &serde_json::to_string(&body.user)?);
        // The raw key and the provider token have served their purpose.
        self.store.remove(TEMP_API_KEY);
        self.store.remove(IDENTITY_TOKEN_KEY);

        Ok(body.user)
    }

    /// Revalidate a stored session token on load. An invalid or expired
    /// token wipes all state so the handshake restarts cleanly.
    ///
    /// # Errors
    ///
    /// Transport failures surface as `Http`; a rejected token is not an
    /// error, it simply yields `None`.
    pub async fn restore(&self) -> Result<Option<SessionClaims>, ClientError> {
        let Some(token) = self.store.get(AUTH_TOKEN_KEY) else {
            return Ok(None);
        };

        let response = self
            .http
            .post(format!("{}/api/auth/verify-token", self.base_url))
            .bearer_auth(&token)
            .send()
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            self.logout();
            return Ok(None);
        }
        let response = rejected(response).await?;
        let body: VerifyTokenResponse = response.json().await?;
        Ok(Some(body.payload))
    }

    /// GET with the session token attached when one is held.
    #[must_use]
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let builder = self.http.get(format!("{}{path}", self.base_url));
        match self.store.get(AUTH_TOKEN_KEY) {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Drop every authentication artifact, including stage-pending
    /// residue, so nothing can resume at the wrong stage.
    pub fn logout(&self) {
        for key in [AUTH_TOKEN_KEY, USER_INFO_KEY, TEMP_API_KEY, IDENTITY_TOKEN_KEY] {
            self.store.remove(key);
        }
    }
}

async fn rejected(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| body["error"].as_str().map(ToString::to_string))
        .unwrap_or_else(|| status.to_string());
    Err(ClientError::Rejected { status, message })
}
