use std::{borrow::Cow, error::Error as StdError, fmt};

use aliri::error::{ClaimsRejected, JwtVerifyError};
use aliri_clock::UnixTime;
use http::StatusCode;
use thiserror::Error;

use crate::{InsufficientScope, KeyResolutionError, Scope};

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The stable category of a rejection
///
/// Every [`AuthError`] maps onto exactly one kind. The kind decides the
/// HTTP status of the rejection and is what callers should match on.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum ErrorKind {
    /// No bearer token was presented
    Unauthenticated,
    /// The token is malformed, uses an unaccepted algorithm, names an
    /// unknown key, or its signature does not verify
    InvalidSignature,
    /// The token's audience, issuer, subject or time bounds are wrong
    InvalidClaims,
    /// The token's `exp` has passed
    Expired,
    /// The token is valid but lacks a scope the route requires
    InsufficientScope,
    /// The signing key could not be fetched
    KeyResolutionFailure,
}

impl ErrorKind {
    /// A stable, snake-cased name for logs and response bodies
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::InvalidSignature => "invalid_signature",
            Self::InvalidClaims => "invalid_claims",
            Self::Expired => "expired",
            Self::InsufficientScope => "insufficient_scope",
            Self::KeyResolutionFailure => "key_resolution_failure",
        }
    }

    /// The HTTP status a rejection of this kind is answered with
    ///
    /// Only [`InsufficientScope`][Self::InsufficientScope] is `403 Forbidden`;
    /// every other kind means the caller is not authenticated.
    pub const fn status(self) -> StatusCode {
        match self {
            Self::InsufficientScope => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason a request was refused by the gate
///
/// The messages describe the failure without ever including key material
/// or the token itself.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer token was presented
    #[error("authorization token is missing")]
    Unauthenticated,

    /// The token could not be trusted
    #[error("invalid token signature: {reason}")]
    InvalidSignature {
        /// What was wrong
        reason: Cow<'static, str>,
        /// The underlying failure, if any
        #[source]
        source: Option<BoxError>,
    },

    /// The token is authentic but its claims are unacceptable
    #[error("invalid token claims: {reason}")]
    InvalidClaims {
        /// What was wrong
        reason: Cow<'static, str>,
        /// The underlying failure, if any
        #[source]
        source: Option<BoxError>,
    },

    /// The token has expired
    #[error("token expired at {}", .expired_at.0)]
    Expired {
        /// The token's `exp` claim
        expired_at: UnixTime,
    },

    /// The token does not grant what the route requires
    #[error(transparent)]
    InsufficientScope(InsufficientScope),

    /// The signing key could not be obtained
    #[error("unable to resolve token signing key")]
    KeyResolutionFailure(#[source] KeyResolutionError),
}

impl AuthError {
    /// The category of this rejection
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::InvalidSignature { .. } => ErrorKind::InvalidSignature,
            Self::InvalidClaims { .. } => ErrorKind::InvalidClaims,
            Self::Expired { .. } => ErrorKind::Expired,
            Self::InsufficientScope(_) => ErrorKind::InsufficientScope,
            Self::KeyResolutionFailure(_) => ErrorKind::KeyResolutionFailure,
        }
    }

    /// The HTTP status this rejection is answered with
    pub fn status(&self) -> StatusCode {
        self.kind().status()
    }

    /// The scope the route demanded, when the rejection is for lack of scope
    pub fn required_scope(&self) -> Option<&Scope> {
        match self {
            Self::InsufficientScope(denial) => Some(&denial.required),
            _ => None,
        }
    }

    /// Renders the error together with its chain of causes on one line
    pub fn description(&self) -> String {
        use std::fmt::Write;

        let mut description = self.to_string();
        let mut err: &dyn StdError = self;
        while let Some(next) = err.source() {
            let _ = write!(&mut description, ": {next}");
            err = next;
        }
        description
    }

    pub(crate) fn invalid_signature(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidSignature {
            reason: reason.into(),
            source: None,
        }
    }

    pub(crate) fn invalid_claims(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidClaims {
            reason: reason.into(),
            source: None,
        }
    }

    fn invalid_signature_from(
        reason: impl Into<Cow<'static, str>>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::InvalidSignature {
            reason: reason.into(),
            source: Some(source.into()),
        }
    }

    fn invalid_claims_from(
        reason: impl Into<Cow<'static, str>>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::InvalidClaims {
            reason: reason.into(),
            source: Some(source.into()),
        }
    }
}

impl From<InsufficientScope> for AuthError {
    fn from(denial: InsufficientScope) -> Self {
        Self::InsufficientScope(denial)
    }
}

impl From<KeyResolutionError> for AuthError {
    fn from(error: KeyResolutionError) -> Self {
        match error {
            KeyResolutionError::UnknownKeyId(kid) => {
                Self::invalid_signature(format!("signing key `{kid}` is not trusted"))
            }
            other => Self::KeyResolutionFailure(other),
        }
    }
}

impl From<JwtVerifyError> for AuthError {
    fn from(error: JwtVerifyError) -> Self {
        match error {
            JwtVerifyError::JwkVerifyError(err) => {
                Self::invalid_signature_from("signature rejected by signing key", err)
            }
            JwtVerifyError::MalformedTokenPayload(err) => {
                Self::invalid_claims_from("malformed token payload", err)
            }
            JwtVerifyError::ClaimsRejected(rejected) => match rejected {
                ClaimsRejected::InvalidAlgorithm => {
                    Self::invalid_signature("signing algorithm is not accepted")
                }
                ClaimsRejected::InvalidAudience => {
                    Self::invalid_claims("token was not issued for this audience")
                }
                ClaimsRejected::InvalidIssuer => {
                    Self::invalid_claims("token was not issued by the trusted issuer")
                }
                ClaimsRejected::MissingRequiredClaim(claim) => {
                    Self::invalid_claims(format!("required `{claim}` claim missing"))
                }
                other => Self::invalid_claims_from("claims rejected", other),
            },
            other => Self::invalid_signature_from("malformed token", other),
        }
    }
}
