//! pipetgo-server: HTTP API for the PipetGo lab testing marketplace
//!
//! Clients browse a catalog of lab services and place orders; labs quote,
//! acknowledge and complete them. Storage sits behind the [`db::Store`]
//! trait with a PostgreSQL implementation and an in-memory one.

pub mod auth;
pub mod config;
pub mod db;
pub mod http;
pub mod models;
pub mod state;
pub mod workflow;

pub use config::{ConfigError, PipetgoConfig};
pub use db::{create_pool, MemoryStore, PgStore, Store};
pub use http::{build_router, run_server, ApiError, ServerConfig, ServerError};
pub use state::AppState;
