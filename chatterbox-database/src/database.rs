use anyhow::Context as _;
use sqlx::{PgPool, migrate::Migrator, postgres::PgPoolOptions};
use tracing::info;

use crate::cache::CacheService;

/// Compile-time discovered SQLx migrations (`chatterbox-database/migrations`).
pub static MIGRATOR: Migrator = sqlx::migrate!();

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Shared database handle cloned into every request handler.
#[derive(Clone, Debug)]
pub struct Database {
    pool: PgPool,
    cache: CacheService,
}

impl Database {
    /// Open a pool against `database_url` and attach `cache`.
    pub async fn connect(database_url: &str, cache: CacheService) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .connect(database_url)
            .await
            .context("failed to connect to PostgreSQL")?;
        info!(max_connections = DEFAULT_MAX_CONNECTIONS, "PostgreSQL connection established.");

        Ok(Self::with_cache(pool, cache))
    }

    /// Create a database handle from an existing pool and cache service.
    pub fn with_cache(pool: PgPool, cache: CacheService) -> Self {
        Self { pool, cache }
    }

    /// Apply pending migrations.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .context("failed to apply database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn cache(&self) -> &CacheService {
        &self.cache
    }
}

/// Accept the legacy `postgres://` scheme by rewriting it to `postgresql://`.
pub fn normalize_database_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.strip_prefix("postgres://") {
        Some(rest) => format!("postgresql://{}", rest),
        None => trimmed.to_owned(),
    }
}
