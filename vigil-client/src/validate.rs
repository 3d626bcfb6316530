//! Form checks that run before any request is built.

use crate::error::{ClientError, Result};

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn email(value: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ClientError::validation("Email is required"));
    }
    if !is_well_formed_email(value) {
        return Err(ClientError::validation("Invalid email"));
    }
    Ok(())
}

pub fn password(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ClientError::validation("Password is required"));
    }
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(ClientError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn password_confirmation(password: &str, confirm: &str) -> Result<()> {
    if confirm.is_empty() {
        return Err(ClientError::validation("Confirm Password is required"));
    }
    if password != confirm {
        return Err(ClientError::validation("Passwords must match"));
    }
    Ok(())
}

/// Rejects values that are empty after trimming; `field` names the input
/// in the message.
pub fn required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ClientError::validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn is_well_formed_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains('@') {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    labels.iter().all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_alphanumeric() || c == '-')
    })
}
