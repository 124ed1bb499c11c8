// Issue a bearer token for a gateway client
//
// Usage: AUTH_JWT_SECRET=... cargo run --bin issue-token -- <subject> [role...]

use anyhow::{bail, Context, Result};
use phoenix_gateway::config::GatewayConfig;
use phoenix_gateway::auth::JwtService;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let mut args = std::env::args().skip(1);
    let Some(subject) = args.next() else {
        bail!("usage: issue-token <subject> [role...]");
    };
    let roles: Vec<String> = args.collect();

    let config = GatewayConfig::from_env().context("Invalid configuration")?;
    if !config.auth.is_enabled() {
        bail!("AUTH_MODE is none; tokens would not be checked");
    }

    let jwt = JwtService::new(config.auth.jwt);
    let token = jwt.issue(&subject, &roles)?;
    eprintln!("expires in {}s", jwt.token_lifetime_secs());
    println!("{token}");
    Ok(())
}
