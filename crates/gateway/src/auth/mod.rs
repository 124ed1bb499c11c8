// Authentication
// Decision: "none" mode for local development, "jwt" mode for deployments

mod config;
pub mod jwt;
mod middleware;

pub use config::{AuthConfig, AuthMode, JwtConfig};
pub use jwt::{Claims, JwtService};
pub use middleware::{AuthError, AuthMethod, AuthState, AuthUser};
