use std::sync::LazyLock;

use regex::Regex;

use crate::errors::AppError;

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));

/// Loose `local@domain.tld` shape check.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_SHAPE.is_match(email.trim())
}

/// Lowercased, trimmed email or a validation error naming `field`.
pub fn normalize_email(email: &str, field: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::Validation(format!("{field} must be a valid email address")));
    }
    Ok(email)
}

/// Trimmed value, or a validation error when blank.
pub fn require_text<'a>(value: &'a str, field: &str) -> Result<&'a str, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(trimmed)
}

/// Uppercased ISO-style code, `USD` when absent.
pub fn normalize_currency(currency: Option<&str>) -> Result<String, AppError> {
    let code = currency.map(str::trim).filter(|c| !c.is_empty()).unwrap_or("USD");
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::Validation(
            "currency must be a three-letter code".to_string(),
        ));
    }
    Ok(code.to_ascii_uppercase())
}
