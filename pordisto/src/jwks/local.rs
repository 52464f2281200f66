use std::sync::Arc;

use aliri::{jwk::KeyIdRef, Jwk, Jwks};
use arc_swap::ArcSwap;
use async_trait::async_trait;

use super::{KeyResolutionError, KeyResolver};

/// A key set held in memory
///
/// The set can be replaced at any time with [`set_jwks`][Self::set_jwks];
/// lookups in flight keep using the set they started with.
#[derive(Debug)]
pub struct LocalKeySet {
    jwks: ArcSwap<Jwks>,
}

impl LocalKeySet {
    /// Constructs a resolver over a fixed key set
    pub fn new(jwks: Jwks) -> Self {
        Self {
            jwks: ArcSwap::from_pointee(jwks),
        }
    }

    /// Replaces the key set used for future lookups
    pub fn set_jwks(&self, jwks: Jwks) {
        self.jwks.store(Arc::new(jwks));
        tracing::debug!("local key set replaced");
    }
}

#[async_trait]
impl KeyResolver for LocalKeySet {
    async fn resolve_key(&self, kid: &KeyIdRef) -> Result<Arc<Jwk>, KeyResolutionError> {
        let jwks = self.jwks.load();
        jwks.keys()
            .iter()
            .find(|k| k.key_id() == Some(kid))
            .cloned()
            .map(Arc::new)
            .ok_or_else(|| KeyResolutionError::UnknownKeyId(kid.to_owned()))
    }
}
