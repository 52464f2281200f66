use std::fmt;

use http_body::Body;
use pordisto::{Gate, ScopeRequirement};
use tower_http::auth::AsyncRequireAuthorizationLayer;

use crate::{guard::RequireToken, OnAuthError, TerseErrorHandler, VerboseErrorHandler};

/// Builder for layers that guard routes with a [`Gate`]
///
/// One authorizer is built at startup and hands out a layer per route.
/// Every layer shares the same gate, so keys resolved for one route are
/// reused by all others.
pub struct Authorizer<OnError> {
    gate: Gate,
    on_error: OnError,
}

impl<OnError> Clone for Authorizer<OnError>
where
    OnError: Clone,
{
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<OnError> fmt::Debug for Authorizer<OnError>
where
    OnError: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Authorizer")
            .field("gate", &self.gate)
            .field("on_error", &self.on_error)
            .finish()
    }
}

impl Authorizer<()> {
    /// Constructs a new authorizer around a gate
    ///
    /// An error handler must be attached before any layers can be built.
    #[inline]
    pub fn new(gate: Gate) -> Self {
        Self { gate, on_error: () }
    }

    /// Attaches a custom error handler to generate responses
    /// in the event of a rejection
    #[inline]
    pub fn with_error_handler<OnError>(self, on_error: OnError) -> Authorizer<OnError> {
        Authorizer {
            gate: self.gate,
            on_error,
        }
    }

    /// Attaches the default terse error handler: [`TerseErrorHandler`]
    ///
    /// This error handler generates responses containing the relevant
    /// status code and challenge with an empty body
    #[inline]
    pub fn with_terse_error_handler<ResBody: Body + Default>(
        self,
    ) -> Authorizer<TerseErrorHandler<ResBody>> {
        self.with_error_handler(TerseErrorHandler::new())
    }

    /// Attaches the verbose error handler: [`VerboseErrorHandler`]
    ///
    /// This error handler generates responses containing the relevant
    /// status code and a JSON body describing the rejection
    #[inline]
    pub fn with_verbose_error_handler<ResBody: Body + Default + From<String>>(
        self,
    ) -> Authorizer<VerboseErrorHandler<ResBody>> {
        self.with_error_handler(VerboseErrorHandler::new())
    }
}

impl<OnError> Authorizer<OnError> {
    /// The gate shared by every layer this authorizer builds
    #[inline]
    pub fn gate(&self) -> &Gate {
        &self.gate
    }
}

impl<OnError> Authorizer<OnError>
where
    OnError: OnAuthError + Clone,
{
    /// Layer that admits only requests whose token verifies and grants
    /// every scope in `requirement`
    ///
    /// The caller's [`Identity`][pordisto::Identity] is made available
    /// through [`Request::extensions`][http::Request::extensions].
    pub fn require(
        &self,
        requirement: impl Into<ScopeRequirement>,
    ) -> AsyncRequireAuthorizationLayer<RequireToken<OnError>> {
        AsyncRequireAuthorizationLayer::new(RequireToken::new(
            self.gate.clone(),
            requirement.into(),
            self.on_error.clone(),
        ))
    }

    /// Layer that admits any request whose token verifies, regardless of
    /// the scope it grants
    #[inline]
    pub fn authenticated(&self) -> AsyncRequireAuthorizationLayer<RequireToken<OnError>> {
        self.require(ScopeRequirement::none())
    }
}
