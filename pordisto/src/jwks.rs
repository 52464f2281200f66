//! Resolution of token signing keys by key ID
//!
//! The gate never holds keys itself. It asks a [`KeyResolver`] for the key
//! named by a token's `kid` header each time it verifies a token.
//! [`LocalKeySet`] answers from an in-memory key set; [`RemoteKeySet`]
//! fetches the issuer's published key set on demand and caches the result.

use std::{error::Error as StdError, fmt, sync::Arc};

use aliri::{
    jwk::{KeyId, KeyIdRef},
    Jwk,
};
use async_trait::async_trait;
use thiserror::Error;

mod local;
#[cfg(feature = "remote")]
mod remote;
#[cfg(feature = "remote")]
mod retry;

pub use local::LocalKeySet;
#[cfg(feature = "remote")]
#[cfg_attr(docsrs, doc(cfg(feature = "remote")))]
pub use remote::{RemoteKeySet, RemoteKeySetBuilder};
#[cfg(feature = "remote")]
#[cfg_attr(docsrs, doc(cfg(feature = "remote")))]
pub use retry::RetryPolicy;

/// A source of signing keys, looked up by key ID
///
/// Implementations must be safe to share between concurrently verified
/// requests.
#[async_trait]
pub trait KeyResolver: Send + Sync + fmt::Debug {
    /// Looks up the signing key with the given key ID
    async fn resolve_key(&self, kid: &KeyIdRef) -> Result<Arc<Jwk>, KeyResolutionError>;
}

#[async_trait]
impl<T> KeyResolver for Arc<T>
where
    T: KeyResolver + ?Sized,
{
    async fn resolve_key(&self, kid: &KeyIdRef) -> Result<Arc<Jwk>, KeyResolutionError> {
        T::resolve_key(self, kid).await
    }
}

/// A failure to produce a signing key
#[derive(Debug, Error)]
pub enum KeyResolutionError {
    /// The key set does not contain a key with the requested ID
    #[error("no signing key found with key ID `{0}`")]
    UnknownKeyId(KeyId),

    /// Too many key set lookups were made recently
    #[error("key set lookups are rate limited")]
    RateLimited,

    /// The key set could not be retrieved
    #[error("key set unavailable")]
    Unavailable(#[source] Box<dyn StdError + Send + Sync + 'static>),
}
