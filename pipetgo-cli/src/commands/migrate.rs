//! Create or update the database schema without starting the server

use anyhow::{Context, Result};
use clap::Parser;

use pipetgo_server::db::{create_pool, migrations};

#[derive(Parser, Debug)]
pub struct MigrateArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,
}

pub async fn run_migrate(args: MigrateArgs) -> Result<()> {
    let pool = create_pool(&args.database_url)
        .await
        .context("failed to create database pool")?;
    migrations::run(&pool).await.context("migrations failed")?;
    pool.close().await;
    println!("schema up to date");
    Ok(())
}
