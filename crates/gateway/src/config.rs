// Gateway configuration loaded from environment variables.
// Decision: Environment only (plus optional .env loaded by main), no config files
// Decision: Unparsable values are fatal at startup instead of silently defaulted

use std::str::FromStr;
use std::time::Duration;

use phoenix_core::ThreatLevel;
use thiserror::Error;

use crate::auth::{AuthConfig, AuthMode, JwtConfig};

/// Startup configuration error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable required")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Which content generator backs `generate_content`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    /// Deterministic in-process generator (dev mode)
    Echo,
}

impl FromStr for ProviderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "echo" => Ok(ProviderKind::Echo),
            _ => Err(()),
        }
    }
}

/// Complete gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: String,
    /// Prefix for all API routes (e.g. "/api")
    pub api_prefix: String,
    pub cors_origins: Vec<String>,
    /// Postgres URL; in-memory store when unset
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub auth: AuthConfig,
    pub provider: ProviderKind,
    pub consumer_batch_size: usize,
    pub consumer_poll_interval: Duration,
    pub flywheel_summary_interval: u64,
    /// Minimum level at which the guardian agent publishes ThreatDetected
    pub guardian_publish_level: ThreatLevel,
    /// Level at which synchronous validation rejects a request
    pub guardian_block_level: ThreatLevel,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:9000".to_string(),
            api_prefix: String::new(),
            cors_origins: Vec::new(),
            database_url: None,
            database_max_connections: 10,
            auth: AuthConfig::default(),
            provider: ProviderKind::Echo,
            consumer_batch_size: 100,
            consumer_poll_interval: Duration::from_millis(100),
            flywheel_summary_interval: 50,
            guardian_publish_level: ThreatLevel::Medium,
            guardian_block_level: ThreatLevel::High,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let mode = match get("AUTH_MODE") {
            Some(value) => parse_auth_mode(&value)?,
            None => AuthMode::Jwt,
        };
        let secret = get("AUTH_JWT_SECRET");
        if mode == AuthMode::Jwt && secret.is_none() {
            return Err(ConfigError::Missing("AUTH_JWT_SECRET"));
        }
        let token_lifetime = parse_or(
            &get,
            "AUTH_JWT_TOKEN_LIFETIME",
            JwtConfig::default().token_lifetime.as_secs(),
        )?;
        let auth = AuthConfig {
            mode,
            jwt: JwtConfig {
                secret: secret.unwrap_or_else(random_secret),
                token_lifetime: Duration::from_secs(token_lifetime),
            },
        };

        let provider = match get("DEFAULT_PROVIDER") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "DEFAULT_PROVIDER",
                value,
            })?,
            None if get("OPENAI_API_KEY").is_some() => ProviderKind::OpenAi,
            None if get("ANTHROPIC_API_KEY").is_some() => ProviderKind::Anthropic,
            None => ProviderKind::Echo,
        };

        let cors_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let consumer_batch_size = parse_or(&get, "CONSUMER_BATCH_SIZE", defaults.consumer_batch_size)?;
        if consumer_batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "CONSUMER_BATCH_SIZE",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            api_prefix: get("API_PREFIX").unwrap_or_default(),
            cors_origins,
            database_url: get("DATABASE_URL"),
            database_max_connections: parse_or(
                &get,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            auth,
            provider,
            consumer_batch_size,
            consumer_poll_interval: Duration::from_millis(parse_or(
                &get,
                "CONSUMER_POLL_INTERVAL_MS",
                defaults.consumer_poll_interval.as_millis() as u64,
            )?),
            flywheel_summary_interval: parse_or(
                &get,
                "FLYWHEEL_SUMMARY_INTERVAL",
                defaults.flywheel_summary_interval,
            )?,
            guardian_publish_level: parse_or(
                &get,
                "GUARDIAN_PUBLISH_LEVEL",
                defaults.guardian_publish_level,
            )?,
            guardian_block_level: parse_or(
                &get,
                "GUARDIAN_BLOCK_LEVEL",
                defaults.guardian_block_level,
            )?,
        })
    }

    /// Storage backend name for logs and the health endpoint
    pub fn storage_backend(&self) -> &'static str {
        if self.database_url.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }
}

fn parse_auth_mode(value: &str) -> Result<AuthMode, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "none" => Ok(AuthMode::None),
        "jwt" => Ok(AuthMode::Jwt),
        _ => Err(ConfigError::Invalid {
            key: "AUTH_MODE",
            value: value.to_string(),
        }),
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

/// Random signing secret for `none` mode, where tokens are never checked
fn random_secret() -> String {
    use rand::Rng;
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<GatewayConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GatewayConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_jwt_mode_requires_secret() {
        assert_eq!(
            config_from(&[]).unwrap_err(),
            ConfigError::Missing("AUTH_JWT_SECRET")
        );
        assert_eq!(
            config_from(&[("AUTH_MODE", "jwt"), ("AUTH_JWT_SECRET", "  ")]).unwrap_err(),
            ConfigError::Missing("AUTH_JWT_SECRET")
        );
    }

    #[test]
    fn test_none_mode_defaults() {
        let config = config_from(&[("AUTH_MODE", "none")]).unwrap();

        assert_eq!(config.auth.mode, AuthMode::None);
        assert_eq!(config.auth.jwt.secret.len(), 64);
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.provider, ProviderKind::Echo);
        assert_eq!(config.storage_backend(), "memory");
        assert_eq!(config.guardian_publish_level, ThreatLevel::Medium);
        assert_eq!(config.guardian_block_level, ThreatLevel::High);
    }

    #[test]
    fn test_full_config() {
        let config = config_from(&[
            ("AUTH_MODE", "JWT"),
            ("AUTH_JWT_SECRET", "s3cret"),
            ("AUTH_JWT_TOKEN_LIFETIME", "60"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("API_PREFIX", "/api"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
            ("DATABASE_URL", "postgres://localhost/phoenix"),
            ("DEFAULT_PROVIDER", "anthropic"),
            ("CONSUMER_BATCH_SIZE", "25"),
            ("CONSUMER_POLL_INTERVAL_MS", "250"),
            ("FLYWHEEL_SUMMARY_INTERVAL", "10"),
            ("GUARDIAN_PUBLISH_LEVEL", "high"),
            ("GUARDIAN_BLOCK_LEVEL", "critical"),
        ])
        .unwrap();

        assert_eq!(config.auth.jwt.secret, "s3cret");
        assert_eq!(config.auth.jwt.token_lifetime, Duration::from_secs(60));
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(config.storage_backend(), "postgres");
        assert_eq!(config.provider, ProviderKind::Anthropic);
        assert_eq!(config.consumer_batch_size, 25);
        assert_eq!(config.consumer_poll_interval, Duration::from_millis(250));
        assert_eq!(config.flywheel_summary_interval, 10);
        assert_eq!(config.guardian_publish_level, ThreatLevel::High);
        assert_eq!(config.guardian_block_level, ThreatLevel::Critical);
    }

    #[test]
    fn test_provider_inferred_from_api_keys() {
        let config = config_from(&[("AUTH_MODE", "none"), ("ANTHROPIC_API_KEY", "k")]).unwrap();
        assert_eq!(config.provider, ProviderKind::Anthropic);

        let config = config_from(&[
            ("AUTH_MODE", "none"),
            ("ANTHROPIC_API_KEY", "k"),
            ("OPENAI_API_KEY", "k"),
        ])
        .unwrap();
        assert_eq!(config.provider, ProviderKind::OpenAi);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = config_from(&[("AUTH_MODE", "admin")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "AUTH_MODE", .. }));

        let err = config_from(&[("AUTH_MODE", "none"), ("CONSUMER_BATCH_SIZE", "many")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "CONSUMER_BATCH_SIZE", .. }));

        let err = config_from(&[("AUTH_MODE", "none"), ("CONSUMER_BATCH_SIZE", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "CONSUMER_BATCH_SIZE", .. }));

        let err = config_from(&[("AUTH_MODE", "none"), ("GUARDIAN_BLOCK_LEVEL", "severe")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "GUARDIAN_BLOCK_LEVEL", .. }));

        let err = config_from(&[("AUTH_MODE", "none"), ("DEFAULT_PROVIDER", "mistral")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DEFAULT_PROVIDER", .. }));
    }
}
