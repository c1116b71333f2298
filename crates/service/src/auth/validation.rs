//! Input shape and password policy checks.
//!
//! Run by the HTTP layer before the service is invoked; the service itself
//! trusts its input.

use super::domain::{LoginInput, RegisterInput};
use super::errors::AuthError;

pub const USERNAME_MAX_CHARS: usize = 64;
pub const PASSWORD_MIN_CHARS: usize = 8;
/// bcrypt only reads the first 72 bytes of its input.
pub const PASSWORD_MAX_BYTES: usize = 72;

fn invalid(msg: &str) -> AuthError {
    AuthError::Validation(msg.to_string())
}

pub fn validate_username(username: &str) -> Result<(), AuthError> {
    if username.is_empty() {
        return Err(invalid("Username cannot be empty"));
    }
    if username.chars().count() > USERNAME_MAX_CHARS {
        return Err(AuthError::Validation(format!(
            "Username must be at most {USERNAME_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

/// Complexity policy applied at registration.
pub fn validate_password_policy(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(AuthError::Validation(format!(
            "Password must be at least {PASSWORD_MIN_CHARS} characters"
        )));
    }
    if password.len() > PASSWORD_MAX_BYTES {
        return Err(AuthError::Validation(format!(
            "Password must be at most {PASSWORD_MAX_BYTES} bytes"
        )));
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(invalid("Password must contain an uppercase letter"));
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(invalid("Password must contain a lowercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(invalid("Password must contain a number"));
    }
    if !password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace()) {
        return Err(invalid("Password must contain a special character"));
    }
    Ok(())
}

pub fn validate_register(input: &RegisterInput) -> Result<(), AuthError> {
    validate_username(&input.username)?;
    if input.password.is_empty() {
        return Err(invalid("Password cannot be empty"));
    }
    validate_password_policy(&input.password)
}

pub fn validate_login(input: &LoginInput) -> Result<(), AuthError> {
    if input.username.is_empty() {
        return Err(invalid("Username cannot be empty"));
    }
    if input.password.is_empty() {
        return Err(invalid("Password cannot be empty"));
    }
    Ok(())
}
