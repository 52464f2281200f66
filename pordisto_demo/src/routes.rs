//! Route handlers

use std::collections::{btree_map::Entry, BTreeMap};

use axum::{Extension, Json};
use http::{HeaderMap, Uri};
use pordisto::Identity;
use serde::Serialize;
use time::OffsetDateTime;

/// Greeting sent by the server
pub const GREETING: &str = "Hello from LoopBack";

/// Body of a `GET /ping` response
#[derive(Debug, Serialize)]
pub struct Ping {
    greeting: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    date: OffsetDateTime,
    url: String,
    headers: BTreeMap<String, String>,
}

/// Replies with a greeting, the current time, the request URL and the
/// request headers
pub async fn ping(uri: Uri, headers: HeaderMap) -> Json<Ping> {
    let url = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_owned(), |pq| pq.as_str().to_owned());

    Json(Ping {
        greeting: GREETING,
        date: OffsetDateTime::now_utc(),
        url,
        headers: echo_headers(&headers),
    })
}

/// Replies with the identity of the authorized caller
pub async fn greet(Extension(identity): Extension<Identity>) -> Json<Identity> {
    tracing::debug!(subject = %identity.id(), "greeting caller");
    Json(identity)
}

fn echo_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut echoed = BTreeMap::<String, String>::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        match echoed.entry(name.as_str().to_owned()) {
            Entry::Occupied(mut joined) => {
                let joined = joined.get_mut();
                joined.push_str(", ");
                joined.push_str(&value);
            }
            Entry::Vacant(slot) => {
                slot.insert(value.into_owned());
            }
        }
    }
    echoed
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;

    #[test]
    fn repeated_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append("accept", HeaderValue::from_static("text/plain"));
        headers.append("accept", HeaderValue::from_static("application/json"));
        headers.insert("host", HeaderValue::from_static("localhost:3000"));

        let echoed = echo_headers(&headers);

        assert_eq!(echoed["accept"], "text/plain, application/json");
        assert_eq!(echoed["host"], "localhost:3000");
    }
}
