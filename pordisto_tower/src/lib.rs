//! Route guards for `tower_http` and the frameworks built on it, such as
//! `axum`
//!
//! An [`Authorizer`] wraps a [`pordisto::Gate`] and hands out one layer per
//! route, each carrying that route's scope requirement. Requests that pass
//! the gate reach the inner service with the caller's
//! [`Identity`][pordisto::Identity] in their extensions; all others are
//! answered by an [`OnAuthError`] handler.
//!
//! ```
//! use aliri::{jwt, Jwks};
//! use axum::{routing::get, Extension, Router};
//! use pordisto::{jwks::LocalKeySet, scope, Gate, Identity, VerificationConfig};
//! use pordisto_tower::Authorizer;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = VerificationConfig::new(
//!     "https://tenant.example.com/.well-known/jwks.json".parse()?,
//!     jwt::Audience::from_static("my_api"),
//!     jwt::Issuer::from_static("https://tenant.example.com/"),
//! );
//! let gate = Gate::new(config, LocalKeySet::new(Jwks::default()))?;
//!
//! let authorizer = Authorizer::new(gate).with_terse_error_handler::<axum::body::Body>();
//!
//! let app: Router = Router::new()
//!     .route(
//!         "/messages",
//!         get(list_messages).route_layer(authorizer.require(scope!["read:messages"])),
//!     )
//!     .route(
//!         "/whoami",
//!         get(whoami).route_layer(authorizer.authenticated()),
//!     )
//!     .route("/health", get(|| async { "ok" }));
//! # let _ = app;
//! # Ok(())
//! # }
//!
//! async fn list_messages() -> &'static str {
//!     "[]"
//! }
//!
//! async fn whoami(Extension(identity): Extension<Identity>) -> String {
//!     identity.id().to_string()
//! }
//! ```

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

use std::{fmt, marker::PhantomData};

mod authorizer;
mod error;
mod guard;
pub mod util;

pub use authorizer::Authorizer;
pub use error::OnAuthError;
pub use guard::RequireToken;

/// Error handler that responds with the status and `www-authenticate`
/// header only
///
/// The header carries the RFC 6750 error code but no description, and the
/// body is empty.
pub struct TerseErrorHandler<ResBody> {
    _ty: PhantomData<fn() -> ResBody>,
}

impl<ResBody> TerseErrorHandler<ResBody> {
    /// Instantiates a new instance over a given body type
    #[inline]
    pub fn new() -> Self {
        Self { _ty: PhantomData }
    }
}

impl<ResBody> fmt::Debug for TerseErrorHandler<ResBody> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("TerseErrorHandler")
    }
}

impl<ResBody> Default for TerseErrorHandler<ResBody> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<ResBody> Clone for TerseErrorHandler<ResBody> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<ResBody> Copy for TerseErrorHandler<ResBody> {}

/// Error handler that explains each rejection
///
/// The `www-authenticate` header gains an `error_description`, and the body
/// is a JSON object with `error` and `error_description` fields.
pub struct VerboseErrorHandler<ResBody> {
    _ty: PhantomData<fn() -> ResBody>,
}

impl<ResBody> VerboseErrorHandler<ResBody> {
    /// Instantiates a new instance over a given body type
    #[inline]
    pub fn new() -> Self {
        Self { _ty: PhantomData }
    }
}

impl<ResBody> fmt::Debug for VerboseErrorHandler<ResBody> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("VerboseErrorHandler")
    }
}

impl<ResBody> Default for VerboseErrorHandler<ResBody> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<ResBody> Clone for VerboseErrorHandler<ResBody> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<ResBody> Copy for VerboseErrorHandler<ResBody> {}
