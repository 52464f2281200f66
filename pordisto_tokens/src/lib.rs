//! Access token acquisition for clients of `pordisto`-guarded APIs
//!
//! A client exchanges its credentials with an OAuth2 authorization server
//! using the client credentials grant and presents the returned access
//! token as a bearer token to the resource server.
//!
//! ```no_run
//! use aliri::jwt;
//! use pordisto::scope;
//! use pordisto_tokens::{
//!     dto::{ClientCredentials, ClientCredentialsRequest},
//!     ClientCredentialsTokenSource, ClientId, ClientSecret,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let request = ClientCredentialsRequest {
//!     credentials: ClientCredentials {
//!         client_id: ClientId::from_static("my-client"),
//!         client_secret: ClientSecret::from_static("my-secret"),
//!     }
//!     .into(),
//!     audience: jwt::Audience::from_static("http://localhost:3000/ping"),
//!     scope: scope!["greet"],
//! };
//!
//! let source = ClientCredentialsTokenSource::new(
//!     reqwest::Client::new(),
//!     "https://tenant.example.com/oauth/token".parse()?,
//!     request,
//! );
//!
//! let token = source.request_token().await?;
//! println!("received {:?}", token.access_token);
//! # Ok(())
//! # }
//! ```
//!
//! Secrets are wrapped in types whose `Debug` and `Display` output is
//! redacted, so they can be logged safely. Use the alternate format
//! (`{:#}`) to reveal the underlying value.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod braids;
pub mod dto;
mod source;

pub use braids::*;
pub use source::{
    ClientCredentialsTokenSource, FormBody, JsonBody, RequestType, TokenRequestError,
};
