//! Password strength rules.
//!
//! Pure evaluation, no I/O. Five rules worth one point each; the
//! registration/reset gate is [`is_acceptable`], the rest of the evaluation
//! is advisory feedback for the client.

use serde::Serialize;

/// Special characters counted by the punctuation rule.
const SPECIAL_CHARS: &str = "!@#$%^&*()_+-=[]{}|;:'\",.<>/?`~\\";

const MIN_LENGTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Weak,
    Medium,
    Strong,
}

impl Strength {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Medium => "medium",
            Self::Strong => "strong",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordEvaluation {
    /// One point per satisfied rule, 0..=5.
    pub score: u8,

    pub strength: Strength,

    /// Actionable messages for each unsatisfied rule.
    pub missing: Vec<String>,
}

pub fn evaluate(password: &str) -> PasswordEvaluation {
    let mut score = 0u8;
    let mut missing = Vec::new();

    if password.chars().count() >= MIN_LENGTH {
        score += 1;
    } else {
        missing.push(format!("At least {MIN_LENGTH} characters"));
    }

    if password.chars().any(char::is_uppercase) {
        score += 1;
    } else {
        missing.push("At least one uppercase letter".to_string());
    }

    if password.chars().any(char::is_lowercase) {
        score += 1;
    } else {
        missing.push("At least one lowercase letter".to_string());
    }

    if password.chars().any(|c| c.is_ascii_digit()) {
        score += 1;
    } else {
        missing.push("At least one digit".to_string());
    }

    if password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        score += 1;
    } else {
        missing.push("At least one special character".to_string());
    }

    let strength = match score {
        0..=2 => Strength::Weak,
        3 | 4 => Strength::Medium,
        _ => Strength::Strong,
    };

    PasswordEvaluation {
        score,
        strength,
        missing,
    }
}

/// Gate for registration and password reset: minimum length plus at least
/// three of the five rule categories.
#[must_use]
pub fn is_acceptable(password: &str) -> bool {
    password.chars().count() >= MIN_LENGTH && evaluate(password).score >= 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_rules_satisfied_is_strong() {
        let eval = evaluate("Abc12345!");
        assert_eq!(eval.score, 5);
        assert_eq!(eval.strength, Strength::Strong);
        assert!(eval.missing.is_empty());
        assert!(is_acceptable("Abc12345!"));
    }

    #[test]
    fn short_password_is_never_acceptable() {
        // Satisfies four categories but misses the length rule.
        assert!(!is_acceptable("Ab1!"));
        let eval = evaluate("Ab1!");
        assert_eq!(eval.score, 4);
    }

    #[test]
    fn missing_three_categories_is_rejected() {
        // Long and lowercase only: score 2.
        let eval = evaluate("aaaaaaaaaa");
        assert_eq!(eval.score, 2);
        assert_eq!(eval.strength, Strength::Weak);
        assert_eq!(eval.missing.len(), 3);
        assert!(!is_acceptable("aaaaaaaaaa"));
    }

    #[test]
    fn three_categories_is_medium_and_acceptable() {
        // Length + lowercase + digits.
        let eval = evaluate("abcdef123");
        assert_eq!(eval.score, 3);
        assert_eq!(eval.strength, Strength::Medium);
        assert!(is_acceptable("abcdef123"));
    }

    #[test]
    fn empty_password_reports_all_rules() {
        let eval = evaluate("");
        assert_eq!(eval.score, 0);
        assert_eq!(eval.missing.len(), 5);
        assert_eq!(eval.strength, Strength::Weak);
    }
}
