//! Bearer token gate for HTTP resource servers
//!
//! `pordisto` decides whether a request carrying an OAuth2 bearer token may
//! reach a protected resource. The decision is made in three strictly
//! ordered stages:
//!
//! 1. the token is [extracted][extract] from the `Authorization` header or
//!    the `access_token` query parameter,
//! 2. the token is verified: its signing key is resolved by key ID through a
//!    [`KeyResolver`], then signature, audience, issuer and expiry are
//!    checked,
//! 3. the token's `scope` claim is compared against the route's
//!    [`ScopeRequirement`].
//!
//! The [`Gate`] composes these stages and yields an [`Identity`] only when
//! every stage succeeds. Each failure is reported as an [`AuthError`] whose
//! [`kind`][AuthError::kind] distinguishes the reason for rejection.
//!
//! ```
//! use aliri::{jwa, jwt, Jwks};
//! use pordisto::{jwks::LocalKeySet, Gate, VerificationConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = VerificationConfig::new(
//!     "https://issuer.example.com/.well-known/jwks.json".parse()?,
//!     jwt::Audience::from_static("https://api.example.com/"),
//!     jwt::Issuer::from_static("https://issuer.example.com/"),
//! )
//! .with_algorithms([jwa::Algorithm::RS256]);
//!
//! let gate = Gate::new(config, LocalKeySet::new(Jwks::default()))?;
//! # let _ = gate;
//! # Ok(())
//! # }
//! ```
//!
//! # Feature flags
//!
//! The `remote` feature (enabled by default) provides
//! [`RemoteKeySet`][jwks::RemoteKeySet], which fetches keys from a JWKS
//! endpoint with `reqwest`. This crate does not enable TLS support in
//! `reqwest` itself; enable `default-tls` or `rustls-tls` if nothing else
//! in your application does.

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

mod claims;
mod config;
mod error;
pub mod extract;
mod gate;
pub mod jwks;
pub mod scope;

pub use claims::{AccessClaims, Identity};
pub use config::{ConfigError, VerificationConfig};
pub use error::{AuthError, ErrorKind};
pub use gate::Gate;
pub use jwks::{KeyResolutionError, KeyResolver};
pub use scope::{InsufficientScope, Scope, ScopeRequirement};
