//! Input validation for API requests.
//!
//! Body shape and types are enforced by the JSON extractor. The checks here cover the
//! few value rules the schema alone cannot express. Use `ValidationErrorBuilder` from
//! the `error` module to report several of them at once.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// ISO 4217 style currency code (three letters)
    static ref CURRENCY_REGEX: Regex = Regex::new(r"^[A-Za-z]{3}$").unwrap();
}

/// Maximum length of a user name
const MAX_NAME_LEN: usize = 100;

/// Validate a user's display name
pub fn validate_user_name(name: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Name is required".to_string());
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(format!("Name is too long (max {} characters)", MAX_NAME_LEN));
    }

    Ok(())
}

/// Validate and normalize a currency code to upper case
pub fn normalize_currency(currency: &str) -> Result<String, String> {
    let currency = currency.trim();
    if !CURRENCY_REGEX.is_match(currency) {
        return Err("Currency must be a 3-letter code (e.g. USD)".to_string());
    }
    Ok(currency.to_ascii_uppercase())
}

/// Validate an expense description
pub fn validate_description(description: &str) -> Result<(), String> {
    if description.trim().is_empty() {
        return Err("Description is required".to_string());
    }
    Ok(())
}
