use std::{fmt, sync::Arc};

use aliri::{
    jwt::{self, CoreClaims, CoreHeaders, HasAlgorithm},
    JwtRef,
};
use aliri_clock::{Clock, System};

use crate::{
    AccessClaims, AuthError, ConfigError, Identity, KeyResolver, ScopeRequirement,
    VerificationConfig,
};

/// The composed bearer token check
///
/// A gate owns the startup configuration, a [`KeyResolver`] and a clock.
/// It is cheap to clone and safe to share across concurrently handled
/// requests.
///
/// Checks run strictly in order: token presence, then signature and claim
/// verification, then scope authorization. The first failing stage decides
/// the rejection; later stages do not run.
#[derive(Clone)]
pub struct Gate {
    inner: Arc<Inner>,
}

struct Inner {
    config: VerificationConfig,
    validator: jwt::CoreValidator,
    resolver: Arc<dyn KeyResolver>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Gate")
            .field("config", &self.inner.config)
            .field("resolver", &self.inner.resolver)
            .finish_non_exhaustive()
    }
}

impl Gate {
    /// Constructs a gate that reads the system clock
    ///
    /// # Errors
    ///
    /// Fails if the configuration accepts no signing algorithm.
    pub fn new<R>(config: VerificationConfig, resolver: R) -> Result<Self, ConfigError>
    where
        R: KeyResolver + 'static,
    {
        Self::with_clock(config, resolver, System)
    }

    /// Constructs a gate that reads time from the given clock
    ///
    /// # Errors
    ///
    /// Fails if the configuration accepts no signing algorithm.
    pub fn with_clock<R, C>(
        config: VerificationConfig,
        resolver: R,
        clock: C,
    ) -> Result<Self, ConfigError>
    where
        R: KeyResolver + 'static,
        C: Clock + Send + Sync + 'static,
    {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(Inner {
                validator: config.claims_validator(),
                config,
                resolver: Arc::new(resolver),
                clock: Arc::new(clock),
            }),
        })
    }

    /// The configuration this gate enforces
    pub fn config(&self) -> &VerificationConfig {
        &self.inner.config
    }

    /// Verifies a token and returns its claims
    ///
    /// The token's algorithm is checked against the accepted set, its
    /// signing key is resolved by `kid`, and the signature is verified.
    /// Only then are audience, issuer and subject inspected, followed by
    /// `exp` and `nbf`.
    pub async fn verify(&self, token: Option<&JwtRef>) -> Result<AccessClaims, AuthError> {
        let token = token.ok_or(AuthError::Unauthenticated)?;

        let decomposed: jwt::Decomposed = token.decompose()?;

        let alg = decomposed.alg();
        if !self.inner.config.accepts(alg) {
            return Err(AuthError::invalid_signature(format!(
                "signing algorithm `{alg}` is not accepted"
            )));
        }

        let key = {
            let kid = decomposed
                .kid()
                .ok_or_else(|| AuthError::invalid_signature("token does not name a signing key"))?;
            tracing::trace!(%kid, %alg, "resolving signing key");
            self.inner.resolver.resolve_key(kid).await?
        };

        let validated: jwt::Validated<AccessClaims> =
            decomposed.verify(&*key, &self.inner.validator)?;
        let (_, claims) = validated.extract();

        self.check_lifetime(&claims)?;

        Ok(claims)
    }

    /// Checks verified claims against a route's scope requirement
    ///
    /// A requirement with no scopes is not evaluated at all.
    pub fn authorize(
        &self,
        claims: &AccessClaims,
        requirement: &ScopeRequirement,
    ) -> Result<(), AuthError> {
        if requirement.is_empty() {
            tracing::trace!("route requires no scope");
            return Ok(());
        }

        requirement.evaluate(claims.scope())?;
        Ok(())
    }

    /// Runs the full check for a request to a route
    ///
    /// Produces the caller's [`Identity`] only if the token verifies and
    /// satisfies `requirement`.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(scope.required = %requirement.scope(), auth.subject = tracing::field::Empty),
    )]
    pub async fn check(
        &self,
        token: Option<&JwtRef>,
        requirement: &ScopeRequirement,
    ) -> Result<Identity, AuthError> {
        let claims = self.verify(token).await?;
        tracing::Span::current().record("auth.subject", claims.subject().as_str());

        self.authorize(&claims, requirement)?;

        tracing::debug!("access granted");
        Ok(Identity::from_verified(claims))
    }

    fn check_lifetime(&self, claims: &AccessClaims) -> Result<(), AuthError> {
        let now = self.inner.clock.now();
        let leeway = self.inner.config.leeway().as_secs();

        let exp = claims
            .exp()
            .ok_or_else(|| AuthError::invalid_claims("required `exp` claim missing"))?;
        if now.0 >= exp.0.saturating_add(leeway) {
            return Err(AuthError::Expired { expired_at: exp });
        }

        if let Some(nbf) = claims.nbf() {
            if nbf.0 > now.0.saturating_add(leeway) {
                return Err(AuthError::invalid_claims("token is not yet valid"));
            }
        }

        Ok(())
    }
}
