//! A token source that exchanges client credentials with an OAuth2 server

use std::marker::PhantomData;

use reqwest::Url;
use thiserror::Error;

use crate::dto;

/// Requests access tokens with the client credentials grant
#[derive(Debug)]
pub struct ClientCredentialsTokenSource<T = JsonBody> {
    client: reqwest::Client,
    token_url: Url,
    request: dto::ClientCredentialsRequest,
    content_type: PhantomData<fn() -> T>,
}

impl ClientCredentialsTokenSource<JsonBody> {
    /// Constructs a new client credentials source that sends its request
    /// as JSON
    pub fn new(
        client: reqwest::Client,
        token_url: Url,
        request: dto::ClientCredentialsRequest,
    ) -> Self {
        Self {
            client,
            token_url,
            request,
            content_type: PhantomData,
        }
    }

    /// Configures the token source to send credentials to
    /// the authority as form data
    pub fn using_form_data(self) -> ClientCredentialsTokenSource<FormBody> {
        ClientCredentialsTokenSource {
            client: self.client,
            token_url: self.token_url,
            request: self.request,
            content_type: PhantomData,
        }
    }
}

impl<T: RequestType> ClientCredentialsTokenSource<T> {
    /// The token endpoint this source requests tokens from
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// Requests a new access token from the authority
    #[tracing::instrument(
        err,
        skip(self),
        fields(
            token_url = %self.token_url,
            credentials.client_id = %self.request.credentials.client_id,
            credentials.audience = %self.request.audience,
            credentials.scope = %self.request.scope,
        ),
    )]
    pub async fn request_token(&self) -> Result<dto::TokenResponse, TokenRequestError> {
        tracing::trace!("requesting token from authority");

        let req = T::attach_payload(self.client.post(self.token_url.clone()), &self.request);
        let resp = req.send().await.map_err(TokenRequestError::RequestSend)?;

        tracing::debug!(
            response.status = resp.status().as_u16(),
            "received token response from issuing authority"
        );

        if let Err(error) = resp.error_for_status_ref() {
            let body = resp
                .text()
                .await
                .map_err(TokenRequestError::BodyReadError)?;
            return Err(TokenRequestError::ErrorWithBody {
                source: error,
                body,
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(TokenRequestError::BodyReadError)?;
        let token: dto::TokenResponse = serde_json::from_slice(&body)?;

        tracing::info!(
            token_type = token.token_type.as_deref().unwrap_or("unspecified"),
            expires_in = token.expires_in,
            "received new access token"
        );

        Ok(token)
    }
}

/// An error while attempting to request a new token from the authority
#[derive(Debug, Error)]
pub enum TokenRequestError {
    /// An error from the authority with an error body
    #[error("error requesting token from authority: {body}")]
    ErrorWithBody {
        /// The underlying request error
        source: reqwest::Error,
        /// The body of the error
        body: String,
    },
    /// Unable to deserialize the token body
    #[error("error deserializing token body from authority")]
    TokenBodyError(#[from] serde_json::Error),
    /// Unable to read the response
    #[error("error reading response body")]
    BodyReadError(#[source] reqwest::Error),
    /// Unable to send a token request to the authority
    #[error("error sending request to authority")]
    RequestSend(#[source] reqwest::Error),
}

/// A manner of attaching a serializable payload to a request
pub trait RequestType {
    /// Attaches the serializable payload to the request body
    fn attach_payload<S: serde::Serialize>(
        request: reqwest::RequestBuilder,
        payload: &S,
    ) -> reqwest::RequestBuilder;
}

/// Attaches credentials to the request body as JSON
#[derive(Debug)]
pub struct JsonBody;

/// Attaches credentials to the request body as URL-encoded form data
#[derive(Debug)]
pub struct FormBody;

impl RequestType for JsonBody {
    fn attach_payload<S: serde::Serialize>(
        request: reqwest::RequestBuilder,
        payload: &S,
    ) -> reqwest::RequestBuilder {
        request.json(payload)
    }
}

impl RequestType for FormBody {
    fn attach_payload<S: serde::Serialize>(
        request: reqwest::RequestBuilder,
        payload: &S,
    ) -> reqwest::RequestBuilder {
        request.form(payload)
    }
}
