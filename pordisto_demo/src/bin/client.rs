use std::path::PathBuf;

use aliri::jwt;
use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use pordisto::Scope;
use pordisto_tokens::{
    dto::{ClientCredentials, ClientCredentialsRequest},
    ClientCredentialsTokenSource, ClientId, ClientSecret,
};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Debug, Parser)]
#[command(about = "Fetches an access token and calls the greeting API with it", version)]
struct Opts {
    /// The issuing authority's token request URL
    #[arg(
        long,
        env = "PORDISTO_TOKEN_URL",
        default_value = "https://apitoday.auth0.com/oauth/token"
    )]
    token_url: Url,

    /// JSON file holding `client_id`, `client_secret` and optionally `audience`
    #[arg(short = 'f', long, env = "PORDISTO_SECRETS_FILE")]
    secrets_file: Option<PathBuf>,

    /// The client ID of the client
    #[arg(short, long, env = "PORDISTO_CLIENT_ID")]
    client_id: Option<ClientId>,

    /// The client secret used to identify the client to the issuing authority
    #[arg(short = 's', long, env = "PORDISTO_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<ClientSecret>,

    /// The audience to request a token for
    #[arg(short, long, env = "PORDISTO_AUDIENCE")]
    audience: Option<jwt::Audience>,

    /// The scope to request, space separated
    #[arg(long, env = "PORDISTO_SCOPE", default_value = "greet")]
    scope: Scope,

    /// The API endpoint to call with the token
    #[arg(
        long,
        env = "PORDISTO_API_URL",
        default_value = "http://localhost:3000/greet"
    )]
    api_url: Url,
}

const DEFAULT_AUDIENCE: &str = "http://localhost:3000/ping";

#[derive(Debug, Deserialize)]
struct SecretsFile {
    #[serde(flatten)]
    credentials: ClientCredentials,
    #[serde(default)]
    audience: Option<jwt::Audience>,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    let secrets = match &opts.secrets_file {
        Some(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .wrap_err_with(|| format!("unable to read secrets from {}", path.display()))?;
            let secrets: SecretsFile =
                serde_json::from_slice(&bytes).wrap_err("malformed secrets file")?;
            Some(secrets)
        }
        None => None,
    };

    let request = credentials_request(
        opts.client_id,
        opts.client_secret,
        opts.audience,
        opts.scope,
        secrets,
    )?;

    let client = reqwest::Client::new();
    let source = ClientCredentialsTokenSource::new(client.clone(), opts.token_url, request);

    let token = source.request_token().await?;
    println!("{token:?}");

    let user: serde_json::Value = client
        .get(opts.api_url)
        .bearer_auth(token.access_token.as_str())
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    println!("{}", serde_json::to_string_pretty(&user)?);

    Ok(())
}

fn credentials_request(
    client_id: Option<ClientId>,
    client_secret: Option<ClientSecret>,
    audience: Option<jwt::Audience>,
    scope: Scope,
    secrets: Option<SecretsFile>,
) -> color_eyre::Result<ClientCredentialsRequest> {
    let (file_credentials, file_audience) = match secrets {
        Some(s) => (Some(s.credentials), s.audience),
        None => (None, None),
    };

    let (client_id, client_secret) = match (client_id, client_secret, file_credentials) {
        (Some(id), Some(secret), _) => (id, secret),
        (id, secret, Some(file)) => (
            id.unwrap_or(file.client_id),
            secret.unwrap_or(file.client_secret),
        ),
        _ => {
            return Err(eyre!(
                "client credentials are required: pass --client-id and --client-secret or --secrets-file"
            ))
        }
    };

    let audience = audience
        .or(file_audience)
        .unwrap_or_else(|| jwt::Audience::from_static(DEFAULT_AUDIENCE));

    Ok(ClientCredentialsRequest {
        credentials: ClientCredentials {
            client_id,
            client_secret,
        }
        .into(),
        audience,
        scope,
    })
}

#[cfg(test)]
mod tests {
    use pordisto::scope;

    use super::*;

    fn secrets(audience: Option<&'static str>) -> SecretsFile {
        SecretsFile {
            credentials: ClientCredentials {
                client_id: ClientId::from_static("file-id"),
                client_secret: ClientSecret::from_static("file-secret"),
            },
            audience: audience.map(jwt::Audience::from_static),
        }
    }

    #[test]
    fn flags_win_over_secrets_file() {
        let request = credentials_request(
            Some(ClientId::from_static("flag-id")),
            Some(ClientSecret::from_static("flag-secret")),
            Some(jwt::Audience::from_static("https://flag.example.com/")),
            scope!["greet"],
            Some(secrets(Some("https://file.example.com/"))),
        )
        .unwrap();

        assert_eq!(request.credentials.client_id.as_str(), "flag-id");
        assert_eq!(request.credentials.client_secret.as_str(), "flag-secret");
        assert_eq!(request.audience.as_str(), "https://flag.example.com/");
        assert_eq!(request.scope, scope!["greet"]);
    }

    #[test]
    fn partial_flags_are_completed_from_secrets_file() {
        let request = credentials_request(
            Some(ClientId::from_static("flag-id")),
            None,
            None,
            scope!["greet"],
            Some(secrets(Some("https://file.example.com/"))),
        )
        .unwrap();

        assert_eq!(request.credentials.client_id.as_str(), "flag-id");
        assert_eq!(request.credentials.client_secret.as_str(), "file-secret");
        assert_eq!(request.audience.as_str(), "https://file.example.com/");
    }

    #[test]
    fn audience_falls_back_to_demo_api() {
        let request =
            credentials_request(None, None, None, scope!["greet"], Some(secrets(None))).unwrap();

        assert_eq!(request.credentials.client_id.as_str(), "file-id");
        assert_eq!(request.audience.as_str(), DEFAULT_AUDIENCE);
        assert_eq!(request.audience.as_str(), "http://localhost:3000/ping");
    }

    #[test]
    fn credentials_are_required() {
        let err = credentials_request(None, None, None, scope!["greet"], None).unwrap_err();
        assert!(err.to_string().contains("client credentials are required"));

        let missing_secret = credentials_request(
            Some(ClientId::from_static("flag-id")),
            None,
            None,
            scope!["greet"],
            None,
        );
        assert!(missing_secret.is_err());
    }

    #[test]
    fn secrets_file_reads_flattened_credentials() {
        let secrets: SecretsFile = serde_json::from_str(
            r#"{"client_id":"abc","client_secret":"shh","audience":"http://localhost:3000/ping"}"#,
        )
        .unwrap();

        assert_eq!(secrets.credentials.client_id.as_str(), "abc");
        assert_eq!(secrets.credentials.client_secret.as_str(), "shh");
        assert_eq!(
            secrets.audience.as_ref().map(|a| a.as_str()),
            Some("http://localhost:3000/ping")
        );
    }
}
