use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context as _;
use chatterbox_database::normalize_database_url;
use chatterbox_utils::parse::parse_bool_flag;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:5000";
const DEFAULT_UPLOAD_DIR: &str = "static/uploads";
const DEFAULT_UPLOAD_MAX_BYTES: usize = 16 * 1024 * 1024;
const DEFAULT_REDIS_KEY_PREFIX: &str = "chatterbox:prod";

/// Process configuration, read from the environment (after `.env`).
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub database_url: String,
    pub bind_address: SocketAddr,
    pub upload_dir: PathBuf,
    pub upload_max_bytes: usize,
    pub redis_enabled: bool,
    pub redis_url: Option<String>,
    pub redis_key_prefix: String,
    pub auto_run_migrations: bool,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let database_url = non_empty("DATABASE_URL").context("DATABASE_URL must be set")?;

        let bind_raw = non_empty("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_owned());
        let bind_address = bind_raw
            .parse::<SocketAddr>()
            .with_context(|| format!("BIND_ADDRESS is not a socket address: {bind_raw}"))?;

        let upload_max_bytes = non_empty("UPLOAD_MAX_BYTES")
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_UPLOAD_MAX_BYTES);

        Ok(Self {
            database_url: normalize_database_url(&database_url),
            bind_address,
            upload_dir: PathBuf::from(
                non_empty("UPLOAD_DIR").unwrap_or_else(|| DEFAULT_UPLOAD_DIR.to_owned()),
            ),
            upload_max_bytes,
            redis_enabled: non_empty("REDIS_ENABLED").is_some_and(|value| parse_bool_flag(&value)),
            redis_url: non_empty("REDIS_URL"),
            redis_key_prefix: non_empty("REDIS_KEY_PREFIX")
                .unwrap_or_else(|| DEFAULT_REDIS_KEY_PREFIX.to_owned()),
            auto_run_migrations: non_empty("AUTO_RUN_MIGRATIONS")
                .is_none_or(|value| parse_bool_flag(&value)),
        })
    }
}
