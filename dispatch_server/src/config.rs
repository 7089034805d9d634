use std::{env, fmt::Display, str::FromStr};

use dispatch_engine::PlatformConfig;
use log::*;

const DEFAULT_DISPATCH_HOST: &str = "127.0.0.1";
const DEFAULT_DISPATCH_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/dispatch.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The size of the SQLite connection pool.
    pub max_connections: u32,
    /// How many events each hook channel holds before publishers have to wait.
    pub event_buffer_size: usize,
    /// Pricing and dispatch settings handed to the engine.
    pub platform: PlatformConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DISPATCH_HOST.to_string(),
            port: DEFAULT_DISPATCH_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            platform: PlatformConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let host = lookup("DISPATCH_HOST").unwrap_or_else(|| DEFAULT_DISPATCH_HOST.into());
        let port = parse_or_default(&lookup, "DISPATCH_PORT", DEFAULT_DISPATCH_PORT);
        let database_url = lookup("DISPATCH_DATABASE_URL").unwrap_or_else(|| {
            info!("🪛️ DISPATCH_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.into()
        });
        let max_connections = parse_or_default(&lookup, "DISPATCH_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS);
        let event_buffer_size = parse_or_default(&lookup, "DISPATCH_EVENT_BUFFER_SIZE", DEFAULT_EVENT_BUFFER_SIZE);
        let platform = PlatformConfig::from_env_or_default();
        Self { host, port, database_url, max_connections, event_buffer_size, platform }
    }
}

fn parse_or_default<T, F>(lookup: &F, name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        None => default,
    }
}
