//! Subcommand implementations for the pipetgo binary

pub mod hash_password;
pub mod migrate;
pub mod serve;

pub use hash_password::run_hash_password;
pub use migrate::run_migrate;
pub use serve::run_serve;
