use std::time::Duration;

use aliri::{jwa, jwt};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Parameters that decide which tokens the gate trusts
///
/// A configuration is assembled once at startup and handed to
/// [`Gate::new`][crate::Gate::new]; it never changes afterwards.
///
/// ```
/// use std::time::Duration;
/// use aliri::{jwa, jwt};
/// use pordisto::VerificationConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = VerificationConfig::new(
///     "https://tenant.example.com/.well-known/jwks.json".parse()?,
///     jwt::Audience::from_static("http://localhost:3000/ping"),
///     jwt::Issuer::from_static("https://tenant.example.com/"),
/// )
/// .with_leeway(Duration::from_secs(5));
///
/// assert_eq!(config.algorithms(), &[jwa::Algorithm::RS256]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct VerificationConfig {
    jwks_uri: Url,
    audience: jwt::Audience,
    issuer: jwt::Issuer,
    #[serde(default = "default_algorithms")]
    algorithms: Vec<jwa::Algorithm>,
    #[serde(default, rename = "leeway_secs", deserialize_with = "de_secs")]
    leeway: Duration,
}

fn default_algorithms() -> Vec<jwa::Algorithm> {
    vec![jwa::Algorithm::RS256]
}

fn de_secs<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}

impl VerificationConfig {
    /// Constructs a configuration accepting only `RS256` with no clock leeway
    pub fn new(jwks_uri: Url, audience: jwt::Audience, issuer: jwt::Issuer) -> Self {
        Self {
            jwks_uri,
            audience,
            issuer,
            algorithms: default_algorithms(),
            leeway: Duration::ZERO,
        }
    }

    /// Replaces the set of accepted signing algorithms
    pub fn with_algorithms<I>(mut self, algorithms: I) -> Self
    where
        I: IntoIterator<Item = jwa::Algorithm>,
    {
        self.algorithms = algorithms.into_iter().collect();
        self.algorithms.dedup();
        self
    }

    /// Tolerance applied to `exp` and `nbf` when comparing against the clock
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Location of the JSON Web Key Set used to resolve signing keys
    pub fn jwks_uri(&self) -> &Url {
        &self.jwks_uri
    }

    /// The audience a token must be issued for
    pub fn audience(&self) -> &jwt::AudienceRef {
        &self.audience
    }

    /// The issuer a token must come from
    pub fn issuer(&self) -> &jwt::IssuerRef {
        &self.issuer
    }

    /// Accepted signing algorithms
    pub fn algorithms(&self) -> &[jwa::Algorithm] {
        &self.algorithms
    }

    /// Whether a token signed with `alg` may be accepted
    pub fn accepts(&self, alg: jwa::Algorithm) -> bool {
        self.algorithms.contains(&alg)
    }

    /// Clock tolerance for time-based claims
    pub fn leeway(&self) -> Duration {
        self.leeway
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.algorithms.is_empty() {
            return Err(ConfigError::NoAlgorithms);
        }

        Ok(())
    }

    pub(crate) fn claims_validator(&self) -> jwt::CoreValidator {
        jwt::CoreValidator::default()
            .ignore_expiration()
            .extend_approved_algorithms(self.algorithms.iter().copied())
            .add_allowed_audience(self.audience.clone())
            .require_issuer(self.issuer.clone())
    }
}

/// A configuration that cannot be used to verify tokens
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No signing algorithm was accepted, so no token could ever pass
    #[error("at least one signing algorithm must be accepted")]
    NoAlgorithms,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let config: VerificationConfig = serde_json::from_value(serde_json::json!({
            "jwks_uri": "https://tenant.example.com/.well-known/jwks.json",
            "audience": "http://localhost:3000/ping",
            "issuer": "https://tenant.example.com/",
        }))
        .unwrap();

        assert_eq!(config.algorithms(), &[jwa::Algorithm::RS256]);
        assert_eq!(config.leeway(), Duration::ZERO);
        assert_eq!(config.audience().as_str(), "http://localhost:3000/ping");
    }

    #[test]
    fn deserializes_explicit_algorithms_and_leeway() {
        let config: VerificationConfig = serde_json::from_value(serde_json::json!({
            "jwks_uri": "https://tenant.example.com/.well-known/jwks.json",
            "audience": "api",
            "issuer": "https://tenant.example.com/",
            "algorithms": ["RS256", "PS256"],
            "leeway_secs": 30,
        }))
        .unwrap();

        assert!(config.accepts(jwa::Algorithm::PS256));
        assert!(!config.accepts(jwa::Algorithm::HS256));
        assert_eq!(config.leeway(), Duration::from_secs(30));
    }

    #[test]
    fn empty_algorithm_list_is_rejected() {
        let config = VerificationConfig::new(
            "https://tenant.example.com/jwks.json".parse().unwrap(),
            jwt::Audience::from_static("api"),
            jwt::Issuer::from_static("https://tenant.example.com/"),
        )
        .with_algorithms([]);

        assert!(matches!(config.validate(), Err(ConfigError::NoAlgorithms)));
    }
}
