//! Command line and environment configuration

use std::{net::SocketAddr, num::NonZeroU32, time::Duration};

use aliri::{error::UnknownAlgorithm, jwa, jwt};
use pordisto::VerificationConfig;
use url::Url;

/// Options for the resource server
#[derive(Debug, clap::Parser)]
#[command(about, version)]
pub struct ServerOpts {
    /// Address to listen on
    #[arg(long, env = "PORDISTO_LISTEN", default_value = "127.0.0.1:3000")]
    pub listen: SocketAddr,

    /// URL of the JSON Web Key Set used to verify token signatures
    #[arg(
        long,
        env = "PORDISTO_JWKS_URI",
        default_value = "https://apitoday.auth0.com/.well-known/jwks.json"
    )]
    pub jwks_uri: Url,

    /// Audience tokens must be issued for
    #[arg(
        long,
        env = "PORDISTO_AUDIENCE",
        default_value = "http://localhost:3000/ping"
    )]
    pub audience: jwt::Audience,

    /// Issuer tokens must be issued by
    #[arg(
        long,
        env = "PORDISTO_ISSUER",
        default_value = "https://apitoday.auth0.com/"
    )]
    pub issuer: jwt::Issuer,

    /// Signing algorithms accepted on tokens
    #[arg(
        long = "algorithm",
        env = "PORDISTO_ALGORITHMS",
        value_delimiter = ',',
        default_value = "RS256",
        value_parser = parse_algorithm
    )]
    pub algorithms: Vec<jwa::Algorithm>,

    /// Clock skew tolerated when checking token lifetimes, in seconds
    #[arg(long, env = "PORDISTO_LEEWAY_SECS", default_value_t = 0)]
    pub leeway_secs: u64,

    /// Maximum number of key set lookups per minute
    #[arg(long, env = "PORDISTO_JWKS_REQUESTS_PER_MINUTE", default_value = "5")]
    pub jwks_requests_per_minute: NonZeroU32,

    /// Describe rejections in responses
    #[arg(long, env = "PORDISTO_VERBOSE_ERRORS")]
    pub verbose_errors: bool,
}

impl ServerOpts {
    /// The gate configuration described by these options
    pub fn verification_config(&self) -> VerificationConfig {
        VerificationConfig::new(
            self.jwks_uri.clone(),
            self.audience.clone(),
            self.issuer.clone(),
        )
        .with_algorithms(self.algorithms.iter().copied())
        .with_leeway(Duration::from_secs(self.leeway_secs))
    }
}

fn parse_algorithm(s: &str) -> Result<jwa::Algorithm, UnknownAlgorithm> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn defaults_target_demo_tenant() {
        let opts = ServerOpts::try_parse_from(["pordisto_server"]).unwrap();
        let config = opts.verification_config();

        assert_eq!(opts.listen.to_string(), "127.0.0.1:3000");
        assert_eq!(
            config.jwks_uri().as_str(),
            "https://apitoday.auth0.com/.well-known/jwks.json"
        );
        assert_eq!(config.audience().as_str(), "http://localhost:3000/ping");
        assert_eq!(config.issuer().as_str(), "https://apitoday.auth0.com/");
        assert_eq!(config.algorithms(), &[jwa::Algorithm::RS256]);
        assert_eq!(opts.jwks_requests_per_minute.get(), 5);
        assert!(!opts.verbose_errors);
    }

    #[test]
    fn algorithms_are_comma_separated() {
        let opts =
            ServerOpts::try_parse_from(["pordisto_server", "--algorithm", "RS256,PS256"]).unwrap();

        assert_eq!(
            opts.verification_config().algorithms(),
            &[jwa::Algorithm::RS256, jwa::Algorithm::PS256]
        );
    }

    #[test]
    fn unknown_algorithm_is_refused() {
        assert!(ServerOpts::try_parse_from(["pordisto_server", "--algorithm", "XX999"]).is_err());
    }

    #[test]
    fn command_is_well_formed() {
        use clap::CommandFactory;
        ServerOpts::command().debug_assert();
    }
}
