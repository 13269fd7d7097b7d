use std::sync::OnceLock;

use regex::Regex;

use crate::error::ApiError;

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

/// Rejects blank required fields with the storefront's generic message.
pub fn require_fields<S: AsRef<str>>(fields: &[S]) -> Result<(), ApiError> {
    if fields.iter().any(|f| f.as_ref().trim().is_empty()) {
        return Err(ApiError::bad_request("Please provide the all fields!"));
    }
    Ok(())
}

pub fn require_email(email: &str) -> Result<(), ApiError> {
    if !is_valid_email(email) {
        return Err(ApiError::bad_request("Please enter a valid email"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("seller@shop.in"));
        assert!(!is_valid_email("seller@shop"));
        assert!(!is_valid_email("two words@shop.in"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn blank_fields_are_rejected() {
        assert!(require_fields(&["a", "b"]).is_ok());
        let err = require_fields(&["a", "  "]).unwrap_err();
        assert_eq!(err.to_string(), "Please provide the all fields!");
    }
}
