use std::{fmt, num::NonZeroU32, sync::Arc, time::Duration};

use aliri::{
    jwk::{KeyId, KeyIdRef},
    Jwk, Jwks,
};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use moka::future::Cache;
use reqwest::{header, StatusCode};
use thiserror::Error;
use tracing::Instrument;
use url::Url;

use super::{retry::RetryPolicy, KeyResolutionError, KeyResolver};

const DEFAULT_REQUESTS_PER_MINUTE: u32 = 5;
const DEFAULT_CACHE_MAX_ENTRIES: u64 = 5;
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Signing keys fetched on demand from a published JSON Web Key Set
///
/// Keys are cached by key ID for a bounded time. When a token names a key
/// that is not cached, the key set is fetched from the remote endpoint.
/// Fetches are throttled to a fixed number per minute; a lookup that would
/// exceed the budget fails immediately instead of waiting.
///
/// Concurrent lookups of the same missing key share a single fetch. The
/// lookup runs on its own task and fills the cache itself, so a request that
/// gives up early neither wastes the work nor causes the requests waiting
/// on it to fetch again.
///
/// Cloning is cheap; clones share the same cache and budget.
///
/// ```no_run
/// use std::{num::NonZeroU32, time::Duration};
/// use pordisto::jwks::RemoteKeySet;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let keys = RemoteKeySet::builder(
///     "https://tenant.example.com/.well-known/jwks.json".parse()?,
/// )
/// .requests_per_minute(NonZeroU32::new(10).unwrap())
/// .cache_ttl(Duration::from_secs(300))
/// .build()?;
/// # let _ = keys;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RemoteKeySet {
    inner: Arc<Inner>,
}

impl fmt::Debug for RemoteKeySet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

struct Inner {
    jwks_uri: Url,
    client: reqwest::Client,
    keys: Cache<KeyId, Arc<Jwk>>,
    limiter: DefaultDirectRateLimiter,
    retry: RetryPolicy,
}

impl fmt::Debug for Inner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RemoteKeySet")
            .field("jwks_uri", &self.jwks_uri.as_str())
            .field("cached_keys", &self.keys.entry_count())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl RemoteKeySet {
    /// Starts configuring a key set fetched from `jwks_uri`
    pub fn builder(jwks_uri: Url) -> RemoteKeySetBuilder {
        RemoteKeySetBuilder {
            jwks_uri,
            client: None,
            requests_per_minute: NonZeroU32::new(DEFAULT_REQUESTS_PER_MINUTE)
                .unwrap_or(NonZeroU32::MIN),
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            cache_ttl: DEFAULT_CACHE_TTL,
            retry: RetryPolicy::default(),
        }
    }

    /// The endpoint keys are fetched from
    pub fn jwks_uri(&self) -> &Url {
        &self.inner.jwks_uri
    }
}

#[async_trait]
impl KeyResolver for RemoteKeySet {
    #[tracing::instrument(skip(self), fields(jwks.url = %self.inner.jwks_uri))]
    async fn resolve_key(&self, kid: &KeyIdRef) -> Result<Arc<Jwk>, KeyResolutionError> {
        if let Some(key) = self.inner.keys.get(kid).await {
            tracing::trace!("signing key found in cache");
            return Ok(key);
        }

        let inner = Arc::clone(&self.inner);
        let kid = kid.to_owned();
        let lookup = async move {
            let loader = Arc::clone(&inner);
            inner
                .keys
                .try_get_with(kid.clone(), loader.load_key(kid))
                .await
        };

        tokio::spawn(lookup.in_current_span())
            .await
            .map_err(|err| Arc::new(FetchError::Task(err)))
            .and_then(|result| result)
            .map_err(into_resolution_error)
    }
}

impl Inner {
    async fn load_key(self: Arc<Self>, kid: KeyId) -> Result<Arc<Jwk>, FetchError> {
        if self.limiter.check().is_err() {
            tracing::warn!("key set lookup refused; request budget exhausted");
            return Err(FetchError::RateLimited);
        }

        self.fetch_key(kid).await
    }

    async fn fetch_key(&self, kid: KeyId) -> Result<Arc<Jwk>, FetchError> {
        let jwks = self.fetch_jwks().await?;

        let mut found = None;
        for key in jwks.keys() {
            if let Some(id) = key.key_id() {
                let key = Arc::new(key.clone());
                if id == &*kid {
                    found = Some(Arc::clone(&key));
                }
                self.keys.insert(id.to_owned(), key).await;
            }
        }

        tracing::info!(keys = jwks.keys().len(), "key set fetched");

        found.ok_or_else(|| {
            tracing::debug!(%kid, "key set does not contain requested key");
            FetchError::UnknownKeyId(kid)
        })
    }

    async fn fetch_jwks(&self) -> Result<Jwks, FetchError> {
        let mut backoff = self.retry.backoff();

        loop {
            match self.fetch_once().await {
                Ok(jwks) => return Ok(jwks),
                Err(err) if err.is_transient() => match backoff.next_delay() {
                    Some(delay) => {
                        let error: &(dyn std::error::Error + Send + Sync + 'static) = &err;
                        tracing::warn!(
                            error,
                            retry = backoff.attempts(),
                            ?delay,
                            "key set fetch failed; retrying",
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(err),
                },
                Err(err) => return Err(err),
            }
        }
    }

    async fn fetch_once(&self) -> Result<Jwks, FetchError> {
        tracing::debug!("fetching key set");

        let response = self
            .client
            .get(self.jwks_uri.clone())
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(FetchError::Request)?;

        let status = response.status();
        tracing::debug!(http.status_code = status.as_u16(), "received key set response");

        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        response.json::<Jwks>().await.map_err(FetchError::Decode)
    }
}

/// Configuration for a [`RemoteKeySet`]
#[derive(Debug)]
#[must_use]
pub struct RemoteKeySetBuilder {
    jwks_uri: Url,
    client: Option<reqwest::Client>,
    requests_per_minute: NonZeroU32,
    cache_max_entries: u64,
    cache_ttl: Duration,
    retry: RetryPolicy,
}

impl RemoteKeySetBuilder {
    /// Uses the given HTTP client instead of a default one
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Maximum number of key set fetches per minute (default 5)
    pub fn requests_per_minute(mut self, requests: NonZeroU32) -> Self {
        self.requests_per_minute = requests;
        self
    }

    /// Maximum number of keys held in the cache (default 5)
    pub fn cache_max_entries(mut self, entries: u64) -> Self {
        self.cache_max_entries = entries;
        self
    }

    /// How long a fetched key stays cached (default 10 minutes)
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// How failed fetches are retried
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Finishes configuration
    ///
    /// # Errors
    ///
    /// Fails if no HTTP client was supplied and a default one cannot be
    /// constructed.
    pub fn build(self) -> Result<RemoteKeySet, reqwest::Error> {
        let client = match self.client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .user_agent(concat!("pordisto/", env!("CARGO_PKG_VERSION")))
                .build()?,
        };

        let keys = Cache::builder()
            .max_capacity(self.cache_max_entries)
            .time_to_live(self.cache_ttl)
            .build();

        Ok(RemoteKeySet {
            inner: Arc::new(Inner {
                jwks_uri: self.jwks_uri,
                client,
                keys,
                limiter: RateLimiter::direct(Quota::per_minute(self.requests_per_minute)),
                retry: self.retry,
            }),
        })
    }
}

#[derive(Debug, Error)]
enum FetchError {
    #[error("key set lookups are rate limited")]
    RateLimited,
    #[error("no signing key found with key ID `{0}`")]
    UnknownKeyId(KeyId),
    #[error("error requesting key set")]
    Request(#[source] reqwest::Error),
    #[error("key set endpoint responded with {0}")]
    Status(StatusCode),
    #[error("error decoding key set")]
    Decode(#[source] reqwest::Error),
    #[error("key set fetch was aborted")]
    Task(#[source] tokio::task::JoinError),
}

impl FetchError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Status(status) => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

fn into_resolution_error(err: Arc<FetchError>) -> KeyResolutionError {
    match &*err {
        FetchError::RateLimited => KeyResolutionError::RateLimited,
        FetchError::UnknownKeyId(kid) => KeyResolutionError::UnknownKeyId(kid.clone()),
        _ => KeyResolutionError::Unavailable(Box::new(err)),
    }
}
