//! Local format checks that need no external lookup.
//!
//! Each check returns `(is_valid, score)`; the score feeds confidence
//! calculations even when the value is invalid.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

pub fn digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// US phone numbers: 10 digits, or 11 with a leading country code `1`.
pub fn validate_phone(phone: Option<&str>) -> (bool, f64) {
    let Some(phone) = phone.filter(|p| !p.trim().is_empty()) else {
        return (false, 0.0);
    };

    let digits = digits(phone);
    match digits.len() {
        10 => (true, 1.0),
        11 if digits.starts_with('1') => (true, 0.9),
        _ => (false, 0.3),
    }
}

pub fn validate_email(email: Option<&str>) -> (bool, f64) {
    let Some(email) = email.filter(|e| !e.trim().is_empty()) else {
        return (false, 0.0);
    };

    if EMAIL_RE.is_match(email) {
        (true, 1.0)
    } else {
        (false, 0.2)
    }
}

/// ZIP or ZIP+4.
pub fn validate_zip(zip: Option<&str>) -> (bool, f64) {
    let Some(zip) = zip.filter(|z| !z.trim().is_empty()) else {
        return (false, 0.0);
    };

    match digits(zip).len() {
        5 => (true, 1.0),
        9 => (true, 0.95),
        _ => (false, 0.3),
    }
}
