// Authentication configuration.
// Loaded as part of GatewayConfig (AUTH_ prefix).

use std::time::Duration;

/// Authentication mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// No authentication required (local development)
    None,
    /// Bearer JWT on every /v1 route
    #[default]
    Jwt,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::None => "none",
            AuthMode::Jwt => "jwt",
        }
    }
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HS256 signing secret
    pub secret: String,
    /// Lifetime of issued tokens
    pub token_lifetime: Duration,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token_lifetime: Duration::from_secs(60 * 60), // 1 hour
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub mode: AuthMode,
    pub jwt: JwtConfig,
}

impl AuthConfig {
    /// Config with authentication disabled
    pub fn disabled() -> Self {
        Self {
            mode: AuthMode::None,
            jwt: JwtConfig::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mode != AuthMode::None
    }
}
