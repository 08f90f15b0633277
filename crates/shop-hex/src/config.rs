use anyhow::Context;
use std::env;

/// Runtime configuration, read once at startup.
///
/// `SERVER_PORT` defaults to 3000 and must be a valid TCP port.
/// `DATABASE_URL` names the sqlite file the store opens; when unset the
/// store falls back to `sqlite://shop.db` (or the in-process adapter when
/// only the `memory` feature is enabled).
#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let server_port = match env::var("SERVER_PORT") {
            Ok(raw) => parse_port(&raw)?,
            Err(_) => 3000,
        };
        let database_url = env::var("DATABASE_URL").ok();
        Ok(Self {
            server_port,
            database_url,
        })
    }
}

fn parse_port(raw: &str) -> anyhow::Result<u16> {
    raw.parse::<u16>()
        .with_context(|| format!("SERVER_PORT is not a valid port: {raw}"))
}
