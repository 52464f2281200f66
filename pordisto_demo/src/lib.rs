//! Example resource server guarded by a `pordisto` gate
//!
//! The server exposes two routes:
//!
//! * `GET /ping` answers anyone with a greeting and an echo of the request.
//! * `GET /greet` requires a bearer token granting the `greet` scope and
//!   answers with the caller's identity.

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

use axum::{body::Body, routing::get, Router};
use pordisto::scope;
use pordisto_tower::{Authorizer, OnAuthError};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod routes;

/// Builds the application router
///
/// `/greet` is guarded by `authorizer` and requires the `greet` scope.
/// `/ping` is open to all.
pub fn app<OnError>(authorizer: &Authorizer<OnError>) -> Router
where
    OnError: OnAuthError<Body = Body> + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/ping", get(routes::ping))
        .route(
            "/greet",
            get(routes::greet).route_layer(authorizer.require(scope!["greet"])),
        )
        .layer(TraceLayer::new_for_http())
}
