//! Application state shared across handlers

use std::sync::Arc;

use crate::auth::{RateLimitConfig, RateLimiter, SessionKeys};
use crate::config::PipetgoConfig;
use crate::db::Store;

/// Rate limiters for the credential endpoints
#[derive(Debug)]
pub struct Limiters {
    pub login: RateLimiter,
    pub signup: RateLimiter,
    pub set_password: RateLimiter,
}

impl Limiters {
    pub fn new(enabled: bool) -> Self {
        Self {
            login: RateLimiter::new("login", RateLimitConfig::LOGIN, enabled),
            signup: RateLimiter::new("signup", RateLimitConfig::SIGNUP, enabled),
            set_password: RateLimiter::new("set_password", RateLimitConfig::SET_PASSWORD, enabled),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub keys: SessionKeys,
    pub limiters: Limiters,
    /// Accounts without a password hash may sign in by email alone
    pub allow_legacy_email_login: bool,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, keys: SessionKeys) -> Self {
        Self {
            store,
            keys,
            limiters: Limiters::new(true),
            allow_legacy_email_login: true,
        }
    }

    /// Build state from loaded configuration.
    pub fn from_config(store: Arc<dyn Store>, config: &PipetgoConfig) -> Self {
        let keys = match &config.auth.session_secret {
            Some(secret) => SessionKeys::new(secret.as_bytes(), config.auth.session_ttl_days),
            None => {
                tracing::warn!("no session secret configured; sessions will not survive a restart");
                SessionKeys::ephemeral(config.auth.session_ttl_days)
            }
        };
        Self {
            store,
            keys,
            limiters: Limiters::new(config.rate_limit.enabled),
            allow_legacy_email_login: config.auth.allow_legacy_email_login,
        }
    }

    pub fn with_rate_limiting(mut self, enabled: bool) -> Self {
        self.limiters = Limiters::new(enabled);
        self
    }

    pub fn with_legacy_email_login(mut self, allowed: bool) -> Self {
        self.allow_legacy_email_login = allowed;
        self
    }
}
