//! Locating the bearer token in a request
//!
//! The token is taken from the first of these that applies:
//!
//! 1. an `Authorization` header whose first word is exactly `Bearer`: the
//!    second word is the token. If there is no second word, the request is
//!    treated as carrying no token at all, and the query string is not
//!    consulted.
//! 2. the `access_token` query parameter, when present and non-empty.
//!
//! Any other `Authorization` header (another scheme, different casing, or
//! a value that is not visible ASCII) is ignored.

use aliri::Jwt;
use http::{header, HeaderMap, Request};

const BEARER: &str = "Bearer";
const ACCESS_TOKEN_PARAM: &str = "access_token";

/// Extracts the bearer token from request headers and the raw query string
///
/// ```
/// use http::{header, HeaderMap, HeaderValue};
/// use pordisto::extract::extract_token;
///
/// let mut headers = HeaderMap::new();
/// headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
///
/// let token = extract_token(&headers, Some("access_token=ignored")).unwrap();
/// assert_eq!(token.as_str(), "abc.def.ghi");
///
/// let token = extract_token(&HeaderMap::new(), Some("access_token=from.query.string")).unwrap();
/// assert_eq!(token.as_str(), "from.query.string");
///
/// assert!(extract_token(&HeaderMap::new(), None).is_none());
/// ```
pub fn extract_token(headers: &HeaderMap, query: Option<&str>) -> Option<Jwt> {
    if let Some(header_value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        let mut words = header_value.split_whitespace();
        if words.next() == Some(BEARER) {
            tracing::trace!("bearer scheme found in authorization header");
            return words.next().map(Jwt::from);
        }
    }

    query.and_then(from_query)
}

/// Extracts the bearer token from a request
pub fn extract_from_request<B>(request: &Request<B>) -> Option<Jwt> {
    extract_token(request.headers(), request.uri().query())
}

fn from_query(query: &str) -> Option<Jwt> {
    let (_, value) = url::form_urlencoded::parse(query.as_bytes())
        .find(|(name, _)| name == ACCESS_TOKEN_PARAM)?;

    if value.is_empty() {
        None
    } else {
        tracing::trace!("bearer token found in query string");
        Some(Jwt::from(value.into_owned()))
    }
}
