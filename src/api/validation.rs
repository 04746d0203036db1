use regex::Regex;
use std::sync::OnceLock;

/// Loose RFC-5322-ish shape check; the mail provider is the real arbiter.
fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"))
}

pub fn validate_email(value: &str, field: &str, errors: &mut Vec<String>) {
    if value.trim().is_empty() {
        errors.push(format!("{field} is required"));
    } else if !email_regex().is_match(value) {
        errors.push(format!("{field} must be a valid email address"));
    }
}

pub fn validate_required(value: &str, field: &str, errors: &mut Vec<String>) {
    if value.trim().is_empty() {
        errors.push(format!("{field} is required"));
    }
}

pub fn validate_max_length(value: &str, field: &str, max: usize, errors: &mut Vec<String>) {
    if value.chars().count() > max {
        errors.push(format!("{field} must be {max} characters or less"));
    }
}

pub fn validate_slug(value: &str, field: &str, errors: &mut Vec<String>) {
    if value.is_empty() {
        errors.push(format!("{field} is required"));
        return;
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        errors.push(format!(
            "{field} may only contain lowercase letters, digits, and hyphens"
        ));
    }
}
