//! Email, password policy, sign-in and sign-up input

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::validation::required_text;
use super::{UserRole, ValidationError, ValidationErrors};

/// Maximum length for email addresses
const MAX_EMAIL_LEN: usize = 254;

const MIN_PASSWORD_LEN: usize = 8;
/// Upper bound kept from the bcrypt era so existing clients see the same limit
const MAX_PASSWORD_LEN: usize = 72;

/// Pragmatic address shape: something@something.tld, no whitespace
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("invalid email regex")
});

/// Validated, normalized (trimmed + lowercase) email address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        Self::for_field("email", s)
    }

    /// Validate an email stored under a different field name.
    pub fn for_field(field: &'static str, s: &str) -> Result<Self, ValidationError> {
        let normalized = s.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(ValidationError::Empty { field });
        }

        if normalized.len() > MAX_EMAIL_LEN {
            return Err(ValidationError::TooLong {
                field,
                max: MAX_EMAIL_LEN,
            });
        }

        if !EMAIL_RE.is_match(&normalized) {
            return Err(ValidationError::InvalidFormat {
                field,
                reason: "invalid email address",
            });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Check a new password against the account policy.
///
/// # Rules
/// - 8 to 72 characters
/// - at least one uppercase letter, one lowercase letter and one digit
pub fn check_password_policy(password: &str) -> Result<(), ValidationErrors> {
    let mut errs = ValidationErrors::new();
    let len = password.chars().count();

    if len == 0 {
        errs.push(ValidationError::Empty { field: "password" });
        return errs.finish();
    }
    if len < MIN_PASSWORD_LEN {
        errs.push(ValidationError::TooShort {
            field: "password",
            min: MIN_PASSWORD_LEN,
        });
    }
    if len > MAX_PASSWORD_LEN {
        errs.push(ValidationError::TooLong {
            field: "password",
            max: MAX_PASSWORD_LEN,
        });
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errs.push(ValidationError::Rule {
            field: "password",
            message: "Password must contain at least one uppercase letter",
        });
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errs.push(ValidationError::Rule {
            field: "password",
            message: "Password must contain at least one lowercase letter",
        });
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errs.push(ValidationError::Rule {
            field: "password",
            message: "Password must contain at least one number",
        });
    }

    errs.finish()
}

/// POST /api/auth/signin body
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// POST /api/auth/signup body
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
}

/// Validated sign-up input
#[derive(Debug, Clone)]
pub struct SignUp {
    pub name: String,
    pub email: Email,
    pub role: UserRole,
    pub password: String,
}

impl SignUpRequest {
    pub fn validate(self) -> Result<SignUp, ValidationErrors> {
        let mut errs = ValidationErrors::new();

        let name = errs.check(required_text("name", self.name.as_deref(), 2, 100));
        let email = errs.check(Email::new(self.email.as_deref().unwrap_or_default()));
        let role = match self.role.as_deref() {
            Some("CLIENT") => Some(UserRole::Client),
            Some("LAB_ADMIN") => Some(UserRole::LabAdmin),
            _ => {
                errs.push(ValidationError::Rule {
                    field: "role",
                    message: "Please select a valid role",
                });
                None
            }
        };
        let password = self.password.unwrap_or_default();
        if let Err(policy) = check_password_policy(&password) {
            for e in policy.errors() {
                errs.push(e.clone());
            }
        }

        match (name, email, role) {
            (Some(name), Some(email), Some(role)) if errs.is_empty() => Ok(SignUp {
                name,
                email,
                role,
                password,
            }),
            _ => Err(errs),
        }
    }
}
