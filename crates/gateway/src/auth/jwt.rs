// JWT token service
// Decision: HS256 (symmetric key), access tokens only; no refresh flow

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::config::JwtConfig;

const TOKEN_TYPE_ACCESS: &str = "access";

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (client or user identifier)
    pub sub: String,
    pub roles: Vec<String>,
    pub token_type: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// Issues and verifies bearer tokens
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Issue a token for `subject` valid for the configured lifetime
    pub fn issue(&self, subject: &str, roles: &[String]) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::from_std(self.config.token_lifetime)?;

        let claims = Claims {
            sub: subject.to_string(),
            roles: roles.to_vec(),
            token_type: TOKEN_TYPE_ACCESS.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).context("Failed to encode token")
    }

    /// Validate signature and expiry, returning the claims
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).context("Invalid token")?;

        if token_data.claims.token_type != TOKEN_TYPE_ACCESS {
            anyhow::bail!("Invalid token type");
        }

        Ok(token_data.claims)
    }

    pub fn token_lifetime_secs(&self) -> i64 {
        self.config.token_lifetime.as_secs() as i64
    }
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("token_lifetime", &self.config.token_lifetime)
            .finish()
    }
}
