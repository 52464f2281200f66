use http::{header, HeaderValue, Response};
use pordisto::AuthError;

use crate::{util, TerseErrorHandler, VerboseErrorHandler};

/// Handler for responding to requests the gate refused
pub trait OnAuthError {
    /// The body type returned on an error
    type Body;

    /// Response for a refused request
    ///
    /// Use [`AuthError::status`] for the status code and
    /// [`util::rejection`] for a matching `www-authenticate` challenge.
    fn on_rejected(&self, error: &AuthError) -> Response<Self::Body>;
}

macro_rules! delegate_impls {
    ($($ty:ty)*) => {
        $(
            impl<T> OnAuthError for $ty
            where
                T: OnAuthError + ?Sized,
            {
                type Body = T::Body;

                #[inline]
                fn on_rejected(&self, error: &AuthError) -> Response<Self::Body> {
                    T::on_rejected(self, error)
                }
            }
        )*
    }
}

delegate_impls!(
    &'_ T
    Box<T>
    std::sync::Arc<T>
);

impl<ResBody> OnAuthError for TerseErrorHandler<ResBody>
where
    ResBody: Default,
{
    type Body = ResBody;

    #[inline]
    fn on_rejected(&self, error: &AuthError) -> Response<Self::Body> {
        util::rejection(error, "")
    }
}

impl<ResBody> OnAuthError for VerboseErrorHandler<ResBody>
where
    ResBody: Default + From<String>,
{
    type Body = ResBody;

    fn on_rejected(&self, error: &AuthError) -> Response<Self::Body> {
        let description = error.description();
        let (mut parts, ()) = util::rejection::<()>(error, &description).into_parts();

        let body = serde_json::json!({
            "error": error.kind().as_str(),
            "error_description": description,
        });

        parts.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        Response::from_parts(parts, ResBody::from(body.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use pordisto::{scope, InsufficientScope};

    use super::*;

    #[test]
    fn terse_handler_sends_empty_body() {
        let resp = TerseErrorHandler::<String>::new().on_rejected(&AuthError::Unauthenticated);

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(resp.body().is_empty());
    }

    #[test]
    fn verbose_handler_explains_rejection() {
        let err = AuthError::from(InsufficientScope {
            required: scope!["greet"],
            missing: scope!["greet"],
        });
        let resp = VerboseErrorHandler::<String>::new().on_rejected(&err);

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            HeaderValue::from_static("application/json")
        );

        let body: serde_json::Value = serde_json::from_str(resp.body()).unwrap();
        assert_eq!(body["error"], "insufficient_scope");
        assert_eq!(
            body["error_description"],
            "insufficient scope: token lacks \"greet\""
        );
    }

    #[test]
    fn handlers_can_be_shared() {
        let handler = std::sync::Arc::new(TerseErrorHandler::<String>::new());
        let resp = handler.on_rejected(&AuthError::Unauthenticated);

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
