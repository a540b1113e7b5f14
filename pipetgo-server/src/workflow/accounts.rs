//! Sign-in, sign-up and first-password setup

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{hash_password, verify_password, Decision, RateLimiter, SessionClaims};
use crate::db::NewUser;
use crate::http::ApiError;
use crate::models::{check_password_policy, Email, SignInRequest, SignUpRequest, User, ValidationError};
use crate::state::AppState;

const BAD_CREDENTIALS: &str = "Invalid email or password";

/// Issued session plus the public user record
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGrant {
    pub token: String,
    pub user: User,
    /// Account has no password yet and signed in by email alone
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub password_setup_required: bool,
}

/// POST /api/auth/set-password body
#[derive(Debug, Default, Deserialize)]
pub struct SetPasswordRequest {
    pub password: Option<String>,
}

pub(crate) async fn enforce(limiter: &RateLimiter, key: &str) -> Result<(), ApiError> {
    match limiter.check(key).await {
        Decision::Allowed { .. } => Ok(()),
        Decision::Limited { retry_after, limit } => Err(ApiError::RateLimited { retry_after, limit }),
    }
}

fn grant(state: &AppState, user: User, password_setup_required: bool) -> Result<SessionGrant, ApiError> {
    let token = state.keys.issue(&state.keys.claims_for(&user))?;
    Ok(SessionGrant {
        token,
        user,
        password_setup_required,
    })
}

/// Credential login, rate-limited per client IP.
pub async fn sign_in(state: &AppState, ip: &str, req: SignInRequest) -> Result<SessionGrant, ApiError> {
    enforce(&state.limiters.login, ip).await?;

    let email = Email::new(req.email.as_deref().unwrap_or_default())?;
    let password = req.password.unwrap_or_default();

    let Some(user) = state.store.user_by_email(email.as_str()).await? else {
        tracing::info!(ip, "sign-in for unknown email");
        return Err(ApiError::Unauthorized {
            message: BAD_CREDENTIALS.into(),
        });
    };

    match user.password_hash.as_deref() {
        Some(hash) => {
            if password.is_empty() || !verify_password(&password, hash) {
                tracing::info!(user_id = %user.id, "sign-in with wrong password");
                return Err(ApiError::Unauthorized {
                    message: BAD_CREDENTIALS.into(),
                });
            }
            tracing::info!(user_id = %user.id, role = %user.role, "signed in");
            grant(state, user, false)
        }
        None if state.allow_legacy_email_login => {
            tracing::info!(user_id = %user.id, "legacy email sign-in; password setup required");
            grant(state, user, true)
        }
        None => Err(ApiError::Unauthorized {
            message: BAD_CREDENTIALS.into(),
        }),
    }
}

/// Create a CLIENT or LAB_ADMIN account and sign it in.
pub async fn sign_up(state: &AppState, ip: &str, req: SignUpRequest) -> Result<SessionGrant, ApiError> {
    enforce(&state.limiters.signup, ip).await?;

    let signup = req.validate()?;
    let password_hash = hash_password(&signup.password)?;

    let user = state
        .store
        .create_user(NewUser {
            name: Some(signup.name),
            email: signup.email.into_string(),
            role: signup.role,
            password_hash: Some(password_hash),
        })
        .await
        .map_err(|e| match e {
            crate::db::DbError::Conflict { .. } => {
                ApiError::conflict("An account with this email already exists")
            }
            other => other.into(),
        })?;

    tracing::info!(user_id = %user.id, role = %user.role, "account created");
    grant(state, user, false)
}

/// Store a first password for an account that has none.
pub async fn set_password(
    state: &AppState,
    claims: &SessionClaims,
    req: SetPasswordRequest,
) -> Result<(), ApiError> {
    enforce(&state.limiters.set_password, &claims.sub.to_string()).await?;

    let password = req.password.unwrap_or_default();
    if password.is_empty() {
        return Err(ValidationError::Empty { field: "password" }.into());
    }
    check_password_policy(&password)?;

    let user_id: Uuid = claims.sub;
    let user = state
        .store
        .user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    if user.has_password() {
        return Err(ApiError::conflict(
            "Password already set. Use password reset instead.",
        ));
    }

    let hash = hash_password(&password)?;
    if !state.store.set_initial_password(user_id, &hash).await? {
        // another request set it between the read and the write
        return Err(ApiError::conflict(
            "Password already set. Use password reset instead.",
        ));
    }
    tracing::info!(%user_id, "initial password set");
    Ok(())
}
