//! Casdoor identity-provider client.
//!
//! The handshake depends on exactly three provider operations: the
//! authorization URL the browser is sent to, the authorization-code
//! exchange, and the bearer-token account-info fetch. Everything else
//! Casdoor offers is out of scope.

use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;
use utoipa::ToSchema;

/// Where the provider sends the browser back to after login.
pub const REDIRECT_PATH: &str = "/api/auth/callback";

const AUTHORIZE_PATH: &str = "/login/oauth/authorize";
const TOKEN_PATH: &str = "/api/login/oauth/access_token";
const ACCOUNT_PATH: &str = "/api/get-account";

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid provider endpoint")]
    Url(#[from] url::ParseError),
    #[error("token exchange failed")]
    Exchange(#[source] reqwest::Error),
    #[error("provider returned no access token")]
    NoAccessToken,
    #[error("identity provider unavailable")]
    Unavailable(#[source] reqwest::Error),
    #[error("{0}")]
    Rejected(&'static str),
}

/// Provider coordinates, safe defaults for a local demo instance.
#[derive(Debug, Clone)]
pub struct CasdoorConfig {
    endpoint: String,
    client_id: String,
    client_secret: SecretString,
    app_name: String,
    org_name: String,
}

impl Default for CasdoorConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://demo.casdoor.com".to_string(),
            client_id: String::new(),
            client_secret: SecretString::default(),
            app_name: "ethan-hole".to_string(),
            org_name: "Ethan Club".to_string(),
        }
    }
}

impl CasdoorConfig {
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_client_id(mut self, client_id: String) -> Self {
        self.client_id = client_id;
        self
    }

    #[must_use]
    pub fn with_client_secret(mut self, client_secret: SecretString) -> Self {
        self.client_secret = client_secret;
        self
    }

    #[must_use]
    pub fn with_app_name(mut self, app_name: String) -> Self {
        self.app_name = app_name;
        self
    }

    #[must_use]
    pub fn with_org_name(mut self, org_name: String) -> Self {
        self.org_name = org_name;
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    #[must_use]
    pub fn org_name(&self) -> &str {
        &self.org_name
    }

    /// Client-visible subset, served by `GET /api/casdoor-config`.
    /// The client secret never leaves the server.
    #[must_use]
    pub fn public(&self, base_url: &str) -> PublicConfig {
        PublicConfig {
            endpoint: self.endpoint.clone(),
            client_id: self.client_id.clone(),
            app_name: self.app_name.clone(),
            organization_name: self.org_name.clone(),
            redirect_uri: format!("{}{REDIRECT_PATH}", base_url.trim_end_matches('/')),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicConfig {
    pub endpoint: String,
    pub client_id: String,
    pub app_name: String,
    pub organization_name: String,
    pub redirect_uri: String,
}

/// Subject record extracted from the provider's account-info response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountRecord {
    #[serde(default)]
    id: String,
    #[serde(default)]
    email: Option<String>,
}

// Casdoor serves the account either bare or wrapped in a `data` envelope
// depending on version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AccountEnvelope {
    Wrapped { data: AccountRecord },
    Bare(AccountRecord),
}

impl AccountEnvelope {
    fn into_record(self) -> AccountRecord {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data,
        }
    }
}

fn sanitize_email(email: Option<String>) -> Option<String> {
    let email = email?;
    let ok = Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .map(|re| re.is_match(&email))
        .unwrap_or(false);
    ok.then_some(email)
}

/// Opaque value tying the authorize redirect to its callback.
#[must_use]
pub fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

#[derive(Debug, Clone)]
pub struct CasdoorClient {
    config: CasdoorConfig,
    client: reqwest::Client,
}

impl CasdoorClient {
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: CasdoorConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { config, client })
    }

    #[must_use]
    pub const fn config(&self) -> &CasdoorConfig {
        &self.config
    }

    /// Build the browser redirect that starts the provider login.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured endpoint is not a valid URL.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<Url, Error> {
        let mut url = Url::parse(&format!("{}{AUTHORIZE_PATH}", self.config.endpoint))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", "profile")
            .append_pair("state", state);
        Ok(url)
    }

    /// Exchange an authorization code for a bearer access token.
    ///
    /// # Errors
    ///
    /// `Exchange` when the provider cannot be reached or answers with a
    /// non-success status, `NoAccessToken` when the response carries no
    /// token.
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<String, Error> {
        let response = self
            .client
            .post(format!("{}{TOKEN_PATH}", self.config.endpoint))
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", &self.config.client_id),
                ("client_secret", self.config.client_secret.expose_secret()),
                ("code", code),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await
            .map_err(Error::Exchange)?
            .error_for_status()
            .map_err(Error::Exchange)?;

        let token: TokenResponse = response.json().await.map_err(Error::Exchange)?;
        match token.access_token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(Error::NoAccessToken),
        }
    }

    /// Fetch the account record the bearer token resolves to.
    ///
    /// Fails closed: any non-200 status, transport error, or record
    /// without a subject id is a rejection, never a partial identity.
    ///
    /// # Errors
    ///
    /// `Unavailable` on transport failure or 5xx, `Rejected` otherwise.
    pub async fn fetch_account(&self, bearer_token: &str) -> Result<Identity, Error> {
        let response = self
            .client
            .get(format!("{}{ACCOUNT_PATH}", self.config.endpoint))
            .bearer_auth(bearer_token)
            .send()
            .await
            .map_err(Error::Unavailable)?;

        let response = match response.error_for_status() {
            Ok(response) => response,
            Err(err) if err.status().is_some_and(|s| s.is_server_error()) => {
                return Err(Error::Unavailable(err));
            }
            Err(_) => return Err(Error::Rejected("Invalid identity token")),
        };

        let envelope: AccountEnvelope = response
            .json()
            .await
            .map_err(|_| Error::Rejected("Malformed account record"))?;
        let record = envelope.into_record();
        if record.id.is_empty() {
            return Err(Error::Rejected("Account record missing subject id"));
        }

        Ok(Identity {
            id: record.id,
            email: sanitize_email(record.email),
        })
    }
}
