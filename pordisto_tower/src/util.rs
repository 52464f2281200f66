//! Utilities for generating HTTP responses on authentication and
//! authorization failures
//!
//! Challenges follow [RFC 6750, Section 3][RFC6750 3].
//!
//!   [RFC6750 3]: https://datatracker.ietf.org/doc/html/rfc6750#section-3

use http::{header, HeaderValue, Response, StatusCode};
use pordisto::{AuthError, ErrorKind, Scope};

/// Build the response for a gate rejection
///
/// The status and challenge are chosen from the error's kind: a request
/// without a token gets a bare challenge, lack of scope gets
/// `403 Forbidden`, and every other failure gets `401 Unauthorized` with
/// `error="invalid_token"`.
///
/// `description` is placed in `error_description` unless it is empty.
pub fn rejection<Body: Default>(error: &AuthError, description: &str) -> Response<Body> {
    match error.kind() {
        ErrorKind::Unauthenticated => unauthenticated(),
        ErrorKind::InsufficientScope => forbidden(description, error.required_scope()),
        _ => unauthorized(description),
    }
}

/// Build a `401 Unauthorized` response for a request that carried no token
///
/// ```http
/// HTTP/1.1 401 Unauthorized
/// www-authenticate: Bearer
/// ```
pub fn unauthenticated<Body: Default>() -> Response<Body> {
    let mut resp = Response::new(Body::default());
    *resp.status_mut() = StatusCode::UNAUTHORIZED;
    resp.headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    resp
}

/// Build a `401 Unauthorized` response with the appropriate `www-authenticate`
/// header
///
/// The description provided will be automatically escaped to make sure it
/// is header-friendly.
///
/// ```http
/// HTTP/1.1 401 Unauthorized
/// www-authenticate: Bearer error="invalid_token" error_description="{description}"
/// ```
///
/// `error_description` is omitted if `description` is empty.
pub fn unauthorized<Body: Default>(description: &str) -> Response<Body> {
    let mut resp = Response::new(Body::default());
    *resp.status_mut() = StatusCode::UNAUTHORIZED;
    resp.headers_mut()
        .insert(header::WWW_AUTHENTICATE, invalid_token(description));
    resp
}

/// Build a `403 Forbidden` response with the appropriate `www-authenticate`
/// header
///
/// The description provided will be automatically escaped to make sure it
/// is header-friendly. When the required scope is known and non-empty, it
/// is advertised in the challenge:
///
/// ```http
/// HTTP/1.1 403 Forbidden
/// www-authenticate: Bearer error="insufficient_scope" error_description="{description}" scope="greet"
/// ```
///
/// `error_description` is omitted if `description` is empty.
pub fn forbidden<Body: Default>(description: &str, required: Option<&Scope>) -> Response<Body> {
    let mut resp = Response::new(Body::default());
    *resp.status_mut() = StatusCode::FORBIDDEN;
    resp.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        insufficient_scope(description, required.filter(|s| !s.is_empty())),
    );
    resp
}

fn invalid_token(description: &str) -> HeaderValue {
    if description.is_empty() {
        HeaderValue::from_static(r#"Bearer error="invalid_token""#)
    } else {
        HeaderValue::try_from(format!(
            r#"Bearer error="invalid_token" error_description="{}""#,
            description.escape_default()
        ))
        .expect("escaped description is a valid header value")
    }
}

// A `Scope` only holds printable ASCII without `\` or `"`, so it never needs
// escaping to be placed in a header.
fn insufficient_scope(description: &str, scope: Option<&Scope>) -> HeaderValue {
    let mut challenge = String::from(r#"Bearer error="insufficient_scope""#);
    if !description.is_empty() {
        challenge.push_str(&format!(
            r#" error_description="{}""#,
            description.escape_default()
        ));
    }
    if let Some(scope) = scope {
        challenge.push_str(&format!(r#" scope="{scope}""#));
    }

    HeaderValue::try_from(challenge).expect("escaped challenge is a valid header value")
}

#[cfg(test)]
mod tests {
    use pordisto::{scope, InsufficientScope};

    use super::*;

    #[test]
    fn in_unauthorized_description_unicode_and_non_printing_description_does_not_panic() {
        let resp = unauthorized::<()>("\0\n\tŝlosilo™: \"ne fidinda\"");

        assert_eq!(
            www_authenticate(&resp),
            r#"Bearer error="invalid_token" error_description="\u{0}\n\t\u{15d}losilo\u{2122}: \"ne fidinda\"""#
        );
    }

    #[test]
    fn in_unauthorized_with_empty_description_doesnt_include_description() {
        let resp = unauthorized::<()>("");

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(www_authenticate(&resp), r#"Bearer error="invalid_token""#);
    }

    #[test]
    fn in_forbidden_required_scope_is_advertised() {
        let resp = forbidden::<()>("token lacks scope", Some(&scope!["greet", "read"]));

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            www_authenticate(&resp),
            r#"Bearer error="insufficient_scope" error_description="token lacks scope" scope="greet read""#
        );
    }

    #[test]
    fn in_forbidden_with_empty_scope_omits_scope() {
        let resp = forbidden::<()>("", Some(&Scope::empty()));

        assert_eq!(www_authenticate(&resp), r#"Bearer error="insufficient_scope""#);
    }

    #[test]
    fn in_forbidden_with_no_scope_and_description_includes_description() {
        let resp = forbidden::<()>("descriptive error", None);

        assert_eq!(
            www_authenticate(&resp),
            r#"Bearer error="insufficient_scope" error_description="descriptive error""#
        );
    }

    #[test]
    fn rejection_without_token_is_bare_challenge() {
        let resp = rejection::<()>(&AuthError::Unauthenticated, "ignored");

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(www_authenticate(&resp), "Bearer");
    }

    #[test]
    fn rejection_for_scope_is_forbidden_with_scope() {
        let err = AuthError::from(InsufficientScope {
            required: scope!["greet"],
            missing: scope!["greet"],
        });
        let resp = rejection::<()>(&err, "");

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            www_authenticate(&resp),
            r#"Bearer error="insufficient_scope" scope="greet""#
        );
    }

    #[test]
    fn rejection_for_expiry_is_invalid_token() {
        let err = AuthError::Expired {
            expired_at: aliri_clock::UnixTime(1),
        };
        let resp = rejection::<()>(&err, "");

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(www_authenticate(&resp), r#"Bearer error="invalid_token""#);
    }

    fn www_authenticate<B>(resp: &Response<B>) -> &str {
        let mut values = resp.headers().get_all(header::WWW_AUTHENTICATE).iter();
        let value = values.next().unwrap().to_str().unwrap();
        assert!(values.next().is_none());
        value
    }
}
