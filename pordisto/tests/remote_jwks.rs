use std::{num::NonZeroU32, sync::Arc, time::Duration};

use aliri::{jwa, jwk, Jwk, Jwks};
use aliri_base64::Base64UrlRef;
use pordisto::{
    jwks::{RemoteKeySet, RetryPolicy},
    KeyResolutionError, KeyResolver,
};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

const JWKS_PATH: &str = "/.well-known/jwks.json";

fn key(kid: &'static str) -> Jwk {
    Jwk::from(jwa::Hmac::new(Base64UrlRef::from_slice(kid.as_bytes()).to_owned()))
        .with_algorithm(jwa::Algorithm::HS256)
        .with_key_id(jwk::KeyId::from_static(kid))
}

fn jwks(kids: &[&'static str]) -> Jwks {
    let mut jwks = Jwks::default();
    for kid in kids {
        jwks.add_key(key(kid));
    }
    jwks
}

fn kid(s: &str) -> &jwk::KeyIdRef {
    jwk::KeyIdRef::from_str(s)
}

fn key_set(server: &MockServer) -> color_eyre::Result<RemoteKeySet> {
    Ok(
        RemoteKeySet::builder(format!("{}{JWKS_PATH}", server.uri()).parse()?)
            .retry_policy(RetryPolicy::new(
                2,
                Duration::from_millis(5),
                Duration::from_millis(20),
                2,
            ))
            .build()?,
    )
}

async fn serve_jwks(server: &MockServer, jwks: &Jwks, expected_fetches: u64) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks))
        .expect(expected_fetches)
        .mount(server)
        .await;
}

#[tokio::test]
async fn resolved_keys_are_cached() -> color_eyre::Result<()> {
    let server = MockServer::start().await;
    serve_jwks(&server, &jwks(&["one", "two"]), 1).await;
    let keys = key_set(&server)?;

    let first = keys.resolve_key(kid("one")).await?;
    let again = keys.resolve_key(kid("one")).await?;
    let sibling = keys.resolve_key(kid("two")).await?;

    assert_eq!(first.key_id(), Some(kid("one")));
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(sibling.key_id(), Some(kid("two")));
    Ok(())
}

#[tokio::test]
async fn concurrent_misses_share_one_fetch() -> color_eyre::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(jwks(&["one"]))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;
    let keys = key_set(&server)?;

    let lookups = (0..8).map(|_| {
        let keys = keys.clone();
        tokio::spawn(async move { keys.resolve_key(kid("one")).await })
    });

    for lookup in lookups.collect::<Vec<_>>() {
        assert!(lookup.await?.is_ok());
    }
    Ok(())
}

#[tokio::test]
async fn unknown_key_id_is_reported_and_not_cached() -> color_eyre::Result<()> {
    let server = MockServer::start().await;
    serve_jwks(&server, &jwks(&["one"]), 2).await;
    let keys = key_set(&server)?;

    for _ in 0..2 {
        let err = keys.resolve_key(kid("missing")).await.unwrap_err();
        assert!(matches!(err, KeyResolutionError::UnknownKeyId(k) if k.as_str() == "missing"));
    }
    Ok(())
}

#[tokio::test]
async fn lookups_beyond_budget_fail_fast() -> color_eyre::Result<()> {
    let server = MockServer::start().await;
    serve_jwks(&server, &jwks(&["one"]), 1).await;
    let keys = RemoteKeySet::builder(format!("{}{JWKS_PATH}", server.uri()).parse()?)
        .requests_per_minute(NonZeroU32::new(1).unwrap())
        .build()?;

    let first = keys.resolve_key(kid("unknown-a")).await.unwrap_err();
    let second = keys.resolve_key(kid("unknown-b")).await.unwrap_err();

    assert!(matches!(first, KeyResolutionError::UnknownKeyId(_)));
    assert!(matches!(second, KeyResolutionError::RateLimited));

    // The key fetched alongside the first lookup is served from cache.
    assert!(keys.resolve_key(kid("one")).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn server_errors_are_retried_then_reported() -> color_eyre::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;
    let keys = key_set(&server)?;

    let err = keys.resolve_key(kid("one")).await.unwrap_err();

    assert!(matches!(err, KeyResolutionError::Unavailable(_)));
    Ok(())
}

#[tokio::test]
async fn transient_failure_recovers_on_retry() -> color_eyre::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    serve_jwks(&server, &jwks(&["one"]), 1).await;
    let keys = key_set(&server)?;

    assert!(keys.resolve_key(kid("one")).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn client_errors_are_not_retried() -> color_eyre::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    let keys = key_set(&server)?;

    let err = keys.resolve_key(kid("one")).await.unwrap_err();

    assert!(matches!(err, KeyResolutionError::Unavailable(_)));
    Ok(())
}

#[tokio::test]
async fn abandoned_lookup_still_fills_cache() -> color_eyre::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(jwks(&["one"]))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;
    let keys = key_set(&server)?;

    let abandoned =
        tokio::time::timeout(Duration::from_millis(20), keys.resolve_key(kid("one"))).await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(keys.resolve_key(kid("one")).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn abandoned_lookup_keeps_serving_its_waiters() -> color_eyre::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(jwks(&["one"]))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;
    let keys = key_set(&server)?;

    let abandoned = tokio::time::timeout(Duration::from_millis(30), keys.resolve_key(kid("one")));
    let waiter = async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        keys.resolve_key(kid("one")).await
    };

    let (abandoned, waited) = tokio::join!(abandoned, waiter);

    assert!(abandoned.is_err());
    assert_eq!(waited?.key_id(), Some(kid("one")));
    Ok(())
}
