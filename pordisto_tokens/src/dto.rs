//! DTOs for the OAuth2 client credentials exchange

use std::sync::Arc;

use aliri::jwt;
use pordisto::Scope;
use serde::{Deserialize, Serialize, Serializer};

use crate::{AccessToken, ClientId, ClientSecret};

/// Client credentials
#[derive(Debug, Deserialize, Serialize)]
pub struct ClientCredentials {
    /// The client ID
    pub client_id: ClientId,

    /// The client secret
    pub client_secret: ClientSecret,
}

/// A client credentials grant request
///
/// Serializes with `grant_type` set to `client_credentials`. The `scope`
/// field is omitted when no scope is requested.
#[derive(Debug)]
pub struct ClientCredentialsRequest {
    /// The client credentials
    pub credentials: Arc<ClientCredentials>,

    /// The API the token is requested for
    pub audience: jwt::Audience,

    /// The scope requested for the token
    pub scope: Scope,
}

impl Serialize for ClientCredentialsRequest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut ser = serializer.serialize_struct("ClientCredentialsRequest", 5)?;
        ser.serialize_field("grant_type", "client_credentials")?;
        ser.serialize_field("client_id", &self.credentials.client_id)?;
        ser.serialize_field("client_secret", &self.credentials.client_secret)?;
        ser.serialize_field("audience", &self.audience)?;
        if self.scope.is_empty() {
            ser.skip_field("scope")?;
        } else {
            ser.serialize_field("scope", &self.scope)?;
        }
        ser.end()
    }
}

/// A successful response from the token endpoint
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    /// The issued access token
    pub access_token: AccessToken,

    /// The kind of token issued, usually `Bearer`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    /// Lifetime of the token in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,

    /// The scope granted, if it differs from what was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
}

#[cfg(test)]
mod tests {
    use pordisto::scope;
    use serde_json::json;

    use super::*;

    fn request(scope: Scope) -> ClientCredentialsRequest {
        ClientCredentialsRequest {
            credentials: Arc::new(ClientCredentials {
                client_id: ClientId::from_static("client"),
                client_secret: ClientSecret::from_static("secret"),
            }),
            audience: jwt::Audience::from_static("http://localhost:3000/ping"),
            scope,
        }
    }

    #[test]
    fn request_carries_grant_type_and_scope() {
        let value = serde_json::to_value(request(scope!["greet"])).unwrap();

        assert_eq!(
            value,
            json!({
                "grant_type": "client_credentials",
                "client_id": "client",
                "client_secret": "secret",
                "audience": "http://localhost:3000/ping",
                "scope": "greet",
            })
        );
    }

    #[test]
    fn empty_scope_is_omitted() {
        let value = serde_json::to_value(request(Scope::empty())).unwrap();

        assert!(value.get("scope").is_none());
    }

    #[test]
    fn minimal_token_response_parses() {
        let resp: TokenResponse =
            serde_json::from_value(json!({ "access_token": "abc.def.ghi" })).unwrap();

        assert_eq!(resp.access_token.as_str(), "abc.def.ghi");
        assert_eq!(resp.expires_in, None);
        assert_eq!(resp.scope, None);
    }

    #[test]
    fn full_token_response_parses() {
        let resp: TokenResponse = serde_json::from_value(json!({
            "access_token": "abc.def.ghi",
            "token_type": "Bearer",
            "expires_in": 86400,
            "scope": "greet",
        }))
        .unwrap();

        assert_eq!(resp.token_type.as_deref(), Some("Bearer"));
        assert_eq!(resp.expires_in, Some(86400));
        assert_eq!(resp.scope, Some(scope!["greet"]));
    }

    #[test]
    fn token_response_debug_hides_token() {
        let resp: TokenResponse =
            serde_json::from_value(json!({ "access_token": "abc.def.ghi" })).unwrap();

        assert!(!format!("{resp:?}").contains("abc.def.ghi"));
    }
}
