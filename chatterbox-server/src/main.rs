mod config;

use tracing::{info, warn};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use rustls::crypto::ring::default_provider;

use chatterbox_core::{AppState, UploadSettings};
use chatterbox_database::{CacheService, Database};
use chatterbox_llm::LlmService;

use config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(filter_fn(|metadata| {
        let target = metadata.target();

        let within_info_level = *metadata.level() <= tracing::Level::INFO;
        if !within_info_level {
            return false;
        }

        !(target.starts_with("sqlx::query") || target.starts_with("hyper"))
    }));

    tracing_subscriber::registry().with(fmt_layer).init();

    default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls ring provider"))?;

    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;

    let cache = build_cache(&config).await;
    let db = Database::connect(&config.database_url, cache).await?;

    if config.auto_run_migrations {
        db.migrate().await?;
        info!("Database migrations applied.");
    } else {
        info!("Auto migrations disabled (set AUTO_RUN_MIGRATIONS=true to run at startup).");
    }

    let llm = LlmService::from_env_optional()?;
    match &llm {
        Some(llm) => info!(model = llm.model(), "LLM integration enabled."),
        None => info!(
            "LLM integration disabled (missing/empty OLLAMA_* vars or OLLAMA_ENABLED=false); replies use the fallback text."
        ),
    }

    tokio::fs::create_dir_all(&config.upload_dir).await?;
    let state = AppState::new(
        db,
        llm,
        UploadSettings {
            dir: config.upload_dir.clone(),
            max_bytes: config.upload_max_bytes,
        },
    );

    for route in chatterbox_routes::ROUTES {
        info!(method = route.method, path = route.path, "{}", route.desc);
    }

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    info!(address = %config.bind_address, "Chatterbox is listening.");

    axum::serve(listener, chatterbox_routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Chatterbox stopped.");
    Ok(())
}

async fn build_cache(config: &ServerConfig) -> CacheService {
    let prefix = config.redis_key_prefix.clone();

    if !config.redis_enabled {
        info!("Redis cache disabled (set REDIS_ENABLED=true to enable).");
        return CacheService::disabled(prefix);
    }

    let Some(redis_url) = config.redis_url.as_deref() else {
        warn!(key_prefix = %prefix, "REDIS_ENABLED=true but REDIS_URL is missing; continuing with DB-only mode.");
        return CacheService::disabled(prefix);
    };

    let cache = match CacheService::redis(redis_url, prefix.clone()) {
        Ok(cache) => {
            info!(key_prefix = %prefix, "Redis cache enabled.");
            cache
        }
        Err(err) => {
            warn!(?err, key_prefix = %prefix, "Failed to initialize Redis cache; continuing with DB-only mode.");
            return CacheService::disabled(prefix);
        }
    };

    if let Err(err) = cache.ping().await {
        warn!(
            ?err,
            "Redis cache ping failed; cache operations will continue with fallback behavior."
        );
    } else {
        info!("Redis cache health check passed.");
    }

    cache
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(?err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}
