//! pipetgo - run and administer the PipetGo marketplace API
//!
//! - `serve`: start the HTTP API against PostgreSQL or an in-memory store
//! - `migrate`: create the schema
//! - `hash-password`: print an Argon2id hash
//! - `completions`: shell completion scripts

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

mod commands;
mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "pipetgo",
    author,
    version,
    about = "API server for the PipetGo lab testing marketplace"
)]
struct Cli {
    /// Debug logging (unless RUST_LOG is set)
    #[arg(long, global = true)]
    debug: bool,

    /// Export traces over OTLP (needs the telemetry feature)
    #[arg(long, global = true)]
    otel: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API server
    Serve(commands::serve::ServeArgs),
    /// Create or update the database schema
    Migrate(commands::migrate::MigrateArgs),
    /// Print an Argon2id hash for a password
    HashPassword(commands::hash_password::HashPasswordArgs),
    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // a missing .env is fine
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_setup::init(&tracing_setup::TracingConfig {
        debug: cli.debug,
        otel: cli.otel,
    })?;

    let result = match cli.command {
        Commands::Serve(args) => commands::run_serve(args).await,
        Commands::Migrate(args) => commands::run_migrate(args).await,
        Commands::HashPassword(args) => commands::run_hash_password(args),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "pipetgo", &mut std::io::stdout());
            Ok(())
        }
    };

    tracing_setup::shutdown();
    result
}
