// Authentication extractor
// Decision: Header-based bearer auth only (API clients, no UI cookies)
// Decision: In "none" mode, every request gets an anonymous principal

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::{
    config::{AuthConfig, AuthMode},
    jwt::JwtService,
};

/// Authentication error
#[derive(Debug, Clone, Serialize)]
pub struct AuthError {
    pub error: String,
    #[serde(skip)]
    pub status: StatusCode,
}

impl AuthError {
    pub fn unauthorized(message: &str) -> Self {
        Self {
            error: message.to_string(),
            status: StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    None,
    Jwt,
}

/// Authenticated principal extracted from the request
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub subject: String,
    pub roles: Vec<String>,
    pub auth_method: AuthMethod,
}

impl AuthUser {
    pub fn anonymous() -> Self {
        Self {
            subject: "anonymous".to_string(),
            roles: vec![],
            auth_method: AuthMethod::None,
        }
    }
}

/// Auth state shared across routes
#[derive(Clone, Debug)]
pub struct AuthState {
    pub mode: AuthMode,
    pub jwt: Arc<JwtService>,
}

impl AuthState {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            mode: config.mode,
            jwt: Arc::new(JwtService::new(config.jwt.clone())),
        }
    }

    fn authenticate(&self, parts: &Parts) -> Result<AuthUser, AuthError> {
        if self.mode == AuthMode::None {
            return Ok(AuthUser::anonymous());
        }

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AuthError::unauthorized("Authentication required"))?;
        let token = header_value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| AuthError::unauthorized("Invalid authorization header"))?;

        let claims = self.jwt.verify(token.trim()).map_err(|e| {
            tracing::debug!("JWT validation failed: {}", e);
            AuthError::unauthorized("Invalid or expired token")
        })?;

        Ok(AuthUser {
            subject: claims.sub,
            roles: claims.roles,
            auth_method: AuthMethod::Jwt,
        })
    }
}

/// Required auth: 401 unless the request carries a valid token (jwt mode)
#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        AuthState::from_ref(state).authenticate(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::JwtConfig;
    use axum::http::Request;

    fn jwt_state() -> AuthState {
        AuthState::new(&AuthConfig {
            mode: AuthMode::Jwt,
            jwt: JwtConfig {
                secret: "secret".to_string(),
                ..Default::default()
            },
        })
    }

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/v1/streams");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_none_mode_is_anonymous() {
        let state = AuthState::new(&AuthConfig::disabled());
        let user = state.authenticate(&parts(None)).unwrap();
        assert_eq!(user.auth_method, AuthMethod::None);
        assert_eq!(user.subject, "anonymous");
    }

    #[test]
    fn test_missing_header_rejected() {
        let err = jwt_state().authenticate(&parts(None)).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.error, "Authentication required");
    }

    #[test]
    fn test_non_bearer_scheme_rejected() {
        let err = jwt_state()
            .authenticate(&parts(Some("Basic dXNlcjpwYXNz")))
            .unwrap_err();
        assert_eq!(err.error, "Invalid authorization header");
    }

    #[test]
    fn test_valid_bearer_token() {
        let state = jwt_state();
        let token = state.jwt.issue("letters-app", &["client".to_string()]).unwrap();
        let user = state
            .authenticate(&parts(Some(&format!("Bearer {token}"))))
            .unwrap();
        assert_eq!(user.subject, "letters-app");
        assert_eq!(user.auth_method, AuthMethod::Jwt);
    }
}
