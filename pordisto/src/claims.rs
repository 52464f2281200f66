use aliri::jwt;
use aliri_clock::UnixTime;
use serde::{Deserialize, Serialize};

use crate::Scope;

/// The claims of an access token that the gate inspects
///
/// `sub` is mandatory: a token without a subject cannot name the caller
/// and fails payload decoding. `exp` is deserialized as optional so that
/// its absence can be reported explicitly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    sub: jwt::Subject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iss: Option<jwt::Issuer>,
    #[serde(default)]
    aud: jwt::Audiences,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<UnixTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nbf: Option<UnixTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iat: Option<UnixTime>,
    #[serde(default, skip_serializing_if = "Scope::is_empty")]
    scope: Scope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl AccessClaims {
    /// The subject (`sub`) of the token
    pub fn subject(&self) -> &jwt::SubjectRef {
        &self.sub
    }

    /// When the token was issued (`iat`), if stated
    pub fn issued_at(&self) -> Option<UnixTime> {
        self.iat
    }

    /// The scope granted to the token
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// The caller's e-mail address, if the issuer includes one
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// The caller's display name, if the issuer includes one
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl jwt::CoreClaims for AccessClaims {
    #[inline]
    fn nbf(&self) -> Option<UnixTime> {
        self.nbf
    }

    #[inline]
    fn exp(&self) -> Option<UnixTime> {
        self.exp
    }

    #[inline]
    fn aud(&self) -> &jwt::Audiences {
        &self.aud
    }

    #[inline]
    fn iss(&self) -> Option<&jwt::IssuerRef> {
        self.iss.as_deref()
    }

    #[inline]
    fn sub(&self) -> Option<&jwt::SubjectRef> {
        Some(&self.sub)
    }
}

/// The authenticated caller
///
/// An identity is only ever produced by [`Gate::check`][crate::Gate::check]
/// after the token has passed every verification stage and the route's
/// scope requirement, so its presence on a request is proof of access.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Identity {
    id: jwt::Subject,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip)]
    scope: Scope,
}

impl Identity {
    pub(crate) fn from_verified(claims: AccessClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
            scope: claims.scope,
        }
    }

    /// The caller's identifier, taken from the token subject
    pub fn id(&self) -> &jwt::SubjectRef {
        &self.id
    }

    /// The caller's e-mail address, if known
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// The caller's display name, if known
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The scope granted to the caller's token
    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

#[cfg(test)]
mod tests {
    use aliri::jwt::CoreClaims;

    use super::*;

    #[test]
    fn decodes_single_and_array_audiences() {
        let single: AccessClaims =
            serde_json::from_str(r#"{"sub":"a","aud":"https://api/","exp":10}"#).unwrap();
        let many: AccessClaims =
            serde_json::from_str(r#"{"sub":"a","aud":["x","https://api/"],"exp":10}"#).unwrap();

        assert_eq!(single.aud().iter().count(), 1);
        assert_eq!(many.aud().iter().count(), 2);
        assert_eq!(single.exp(), Some(UnixTime(10)));
    }

    #[test]
    fn rejects_missing_subject() {
        let result = serde_json::from_str::<AccessClaims>(r#"{"aud":"x","exp":10}"#);
        assert!(result.is_err());
    }

    #[test]
    fn identity_carries_profile_claims() {
        let claims: AccessClaims = serde_json::from_str(
            r#"{"sub":"auth0|123","email":"ana@example.com","name":"Ana","scope":"greet"}"#,
        )
        .unwrap();

        let identity = Identity::from_verified(claims);
        let json = serde_json::to_value(&identity).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"id":"auth0|123","email":"ana@example.com","name":"Ana"})
        );
        assert_eq!(identity.scope().to_string(), "greet");
    }

    #[test]
    fn identity_omits_unknown_profile_fields() {
        let claims: AccessClaims = serde_json::from_str(r#"{"sub":"client@clients"}"#).unwrap();
        let json = serde_json::to_value(Identity::from_verified(claims)).unwrap();
        assert_eq!(json, serde_json::json!({"id":"client@clients"}));
    }
}
