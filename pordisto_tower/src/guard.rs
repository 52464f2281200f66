use std::{fmt, future::Future, pin::Pin, sync::Arc};

use http::{Request, Response};
use pordisto::{extract, Gate, ScopeRequirement};
use tower_http::auth::AsyncAuthorizeRequest;

use crate::OnAuthError;

/// Authorization check for a single route
///
/// The bearer token is taken from the request, run through the [`Gate`]
/// against this route's [`ScopeRequirement`], and on success the caller's
/// [`Identity`][pordisto::Identity] is placed into the
/// [`Request::extensions`]. A refused request never reaches the inner
/// service; it is answered by the `OnError` handler instead.
///
/// Constructed through [`Authorizer::require`][crate::Authorizer::require].
pub struct RequireToken<OnError> {
    gate: Gate,
    requirement: Arc<ScopeRequirement>,
    on_error: OnError,
}

impl<OnError> RequireToken<OnError> {
    #[inline]
    pub(crate) fn new(gate: Gate, requirement: ScopeRequirement, on_error: OnError) -> Self {
        Self {
            gate,
            requirement: Arc::new(requirement),
            on_error,
        }
    }

    /// The scope requirement enforced for this route
    pub fn requirement(&self) -> &ScopeRequirement {
        &self.requirement
    }
}

impl<OnError> Clone for RequireToken<OnError>
where
    OnError: Clone,
{
    #[inline]
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
            requirement: Arc::clone(&self.requirement),
            on_error: self.on_error.clone(),
        }
    }
}

impl<OnError> fmt::Debug for RequireToken<OnError>
where
    OnError: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RequireToken")
            .field("gate", &self.gate)
            .field("requirement", &self.requirement)
            .field("on_error", &self.on_error)
            .finish()
    }
}

impl<OnError, B> AsyncAuthorizeRequest<B> for RequireToken<OnError>
where
    OnError: OnAuthError + Clone + Send + Sync + 'static,
    OnError::Body: Send + 'static,
    B: Send + 'static,
{
    type RequestBody = B;
    type ResponseBody = OnError::Body;
    #[allow(clippy::type_complexity)]
    type Future = Pin<
        Box<dyn Future<Output = Result<Request<B>, Response<OnError::Body>>> + Send + 'static>,
    >;

    fn authorize(&mut self, mut request: Request<B>) -> Self::Future {
        let gate = self.gate.clone();
        let requirement = Arc::clone(&self.requirement);
        let on_error = self.on_error.clone();

        Box::pin(async move {
            let token = extract::extract_from_request(&request);

            match gate.check(token.as_deref(), &requirement).await {
                Ok(identity) => {
                    tracing::trace!(subject = %identity.id(), "request authorized");
                    let _ = request.extensions_mut().insert(identity);
                    Ok(request)
                }
                Err(error) => {
                    tracing::info!(
                        auth.kind = %error.kind(),
                        status = error.status().as_u16(),
                        error = %error.description(),
                        method = %request.method(),
                        path = request.uri().path(),
                        "request rejected",
                    );
                    Err(on_error.on_rejected(&error))
                }
            }
        })
    }
}
