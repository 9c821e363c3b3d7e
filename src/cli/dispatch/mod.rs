use crate::auth::{
    casdoor::CasdoorConfig,
    config::AuthConfig,
    session::DEFAULT_TOKEN_TTL_SECONDS,
};
use crate::cli::actions::Action;
use anyhow::{Context, Result};
use secrecy::SecretString;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(5632);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let base_url = matches
        .get_one::<String>("base-url")
        .cloned()
        .unwrap_or_else(|| "http://localhost:5632".to_string());

    let mut casdoor = CasdoorConfig::default();
    if let Some(endpoint) = matches.get_one::<String>("casdoor-endpoint") {
        casdoor = casdoor.with_endpoint(endpoint.clone());
    }
    if let Some(client_id) = matches.get_one::<String>("casdoor-client-id") {
        casdoor = casdoor.with_client_id(client_id.clone());
    }
    if let Some(client_secret) = matches.get_one::<String>("casdoor-client-secret") {
        casdoor = casdoor.with_client_secret(SecretString::from(client_secret.clone()));
    }
    if let Some(app_name) = matches.get_one::<String>("casdoor-app-name") {
        casdoor = casdoor.with_app_name(app_name.clone());
    }
    if let Some(org_name) = matches.get_one::<String>("casdoor-org-name") {
        casdoor = casdoor.with_org_name(org_name.clone());
    }

    let mut config = AuthConfig::new(base_url)
        .with_casdoor(casdoor)
        .with_token_ttl_seconds(
            matches
                .get_one::<i64>("token-ttl")
                .copied()
                .unwrap_or(DEFAULT_TOKEN_TTL_SECONDS),
        );

    // Secrets stay empty when unset; the verifiers fail closed on empty.
    if let Some(key) = matches.get_one::<String>("access-key") {
        config = config.with_access_key(SecretString::from(key.clone()));
    }
    if let Some(secret) = matches.get_one::<String>("signing-secret") {
        config = config.with_signing_secret(SecretString::from(secret.clone()));
    }

    Ok(Action::Server { port, dsn, config })
}
