//! Run the HTTP API

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use pipetgo_server::db::{create_pool_with_options, migrations};
use pipetgo_server::{run_server, AppState, MemoryStore, PgStore, PipetgoConfig, ServerConfig, Store};

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (overrides config; default 127.0.0.1:3030)
    #[arg(long, short = 'b')]
    pub bind: Option<SocketAddr>,

    /// Allow any CORS origin instead of localhost only
    #[arg(long)]
    pub cors_permissive: bool,

    /// PostgreSQL connection string (overrides config)
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// TOML config file
    #[arg(long, short = 'c', env = "PIPETGO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Keep everything in memory, seeded with demo accounts (ignores any database URL)
    #[arg(long)]
    pub memory: bool,

    /// Skip schema creation at startup
    #[arg(long)]
    pub no_migrate: bool,

    /// Disable rate limiting on auth endpoints
    #[arg(long)]
    pub no_rate_limit: bool,
}

pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let mut config = PipetgoConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if args.cors_permissive {
        config.server.cors_permissive = true;
    }
    if args.no_rate_limit {
        config.rate_limit.enabled = false;
    }
    if let Some(url) = args.database_url {
        config.database.url = Some(url);
    }

    let store: Arc<dyn Store> = if args.memory {
        tracing::warn!("using in-memory store; data is lost on exit");
        Arc::new(MemoryStore::with_demo_data())
    } else {
        let url = config
            .database
            .url
            .as_deref()
            .context("DATABASE_URL not set. Set via --database-url, DATABASE_URL env, the config file, or pass --memory")?;
        let pool = create_pool_with_options(url, config.database.max_connections)
            .await
            .context("failed to create database pool")?;
        if !args.no_migrate {
            migrations::run(&pool).await.context("migrations failed")?;
        }
        Arc::new(PgStore::new(pool))
    };

    tracing::info!(
        bind = %config.server.bind,
        rate_limit = config.rate_limit.enabled,
        "starting pipetgo server"
    );

    let state = Arc::new(AppState::from_config(store, &config));
    let server = ServerConfig {
        bind_addr: config.server.bind,
        cors_permissive: config.server.cors_permissive,
    };
    run_server(state, server).await.context("server error")?;

    Ok(())
}
