//! Authentication: password hashing, signed sessions, rate limiting

pub mod password;
pub mod rate_limit;
pub mod session;

pub use password::{hash_password, verify_password, PasswordError};
pub use rate_limit::{client_ip, Decision, RateLimitConfig, RateLimiter};
pub use session::{SessionClaims, SessionError, SessionKeys, SESSION_COOKIE};
