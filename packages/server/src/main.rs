use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use arena_server::build_router;
use arena_server::config::AppConfig;
use arena_server::database::init_db;
use arena_server::judge::HttpJudgeClient;
use arena_server::notify::{BroadcastNotifier, Notifier, RedisNotifier};
use arena_server::rate_limit::{MemoryWindowStore, RedisWindowStore, WindowStore};
use arena_server::seed::ensure_indexes;
use arena_server::services::run_finalizer_sweep;
use arena_server::session::spawn_sweeper;
use arena_server::state::{AppState, Backends};
use arena_server::store::{DbStore, Stores};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = init_db(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    ensure_indexes(&db).await?;
    let stores = Stores::shared(Arc::new(DbStore::new(db)));

    let (notifier, windows) = connect_redis(&config).await;
    let judge = Arc::new(
        HttpJudgeClient::new(&config.judge).context("Failed to build judge client")?,
    );
    info!(base_url = %config.judge.base_url, "Judge client ready");

    let state = AppState::new(
        config.clone(),
        Backends {
            stores,
            judge,
            notifier,
            windows,
        },
    );

    // TODO: Keep the handles for graceful shutdown. Both loops run until process exit.
    let _run_sweeper = spawn_sweeper(
        state.runs.clone(),
        "run reports",
        Duration::from_secs(config.session.sweep_interval_secs),
    );
    if config.finalizer.enabled {
        tokio::spawn(run_finalizer_sweep(
            state.finalizer.clone(),
            config.finalizer.clone(),
        ));
    } else {
        info!("Leaderboard finalizer disabled");
    }

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    info!("Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Redis-backed notifier and rate-limit window, or in-process fallbacks
/// when Redis is disabled or unreachable.
async fn connect_redis(config: &AppConfig) -> (Arc<dyn Notifier>, Arc<dyn WindowStore>) {
    if !config.redis.enabled {
        info!("Redis disabled, using in-process notifier and rate-limit window");
        return in_process();
    }

    let conn = match redis::Client::open(config.redis.url.as_str()) {
        Ok(client) => client.get_multiplexed_async_connection().await,
        Err(e) => Err(e),
    };

    match conn {
        Ok(conn) => {
            info!(url = %config.redis.url, "Redis connected");
            (
                Arc::new(RedisNotifier::new(
                    conn.clone(),
                    config.redis.channel_prefix.clone(),
                )),
                Arc::new(RedisWindowStore::new(conn)),
            )
        }
        Err(e) => {
            warn!(
                url = %config.redis.url,
                error = %e,
                "Redis unreachable, falling back to in-process backends"
            );
            in_process()
        }
    }
}

fn in_process() -> (Arc<dyn Notifier>, Arc<dyn WindowStore>) {
    (
        Arc::new(BroadcastNotifier::default()),
        Arc::new(MemoryWindowStore::new()),
    )
}
