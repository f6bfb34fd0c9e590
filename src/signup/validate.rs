// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Field validation for the sign-up form

use regex::Regex;
use std::sync::OnceLock;

use super::{Field, FieldErrors, IssueKind, RegistrationForm};

/// Symbols a password must draw at least one character from
pub const PASSWORD_SYMBOLS: &str = "@$!%*?&";

/// Minimum password length
pub const PASSWORD_MIN_LEN: usize = 8;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static PASSWORD_CHARSET_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
            .unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

fn password_charset_regex() -> &'static Regex {
    PASSWORD_CHARSET_RE.get_or_init(|| {
        // Length and character classes are checked separately.
        Regex::new(r"^[A-Za-z0-9@$!%*?&]+$")
            .unwrap_or_else(|error| panic!("password regex failed to compile: {error}"))
    })
}

/// Result of validating one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: FieldErrors,
    /// The passwords differed; the submission was aborted on that check
    pub password_mismatch: bool,
}

impl ValidationReport {
    /// Submission may proceed to the uniqueness check
    pub fn is_clean(&self) -> bool {
        !self.password_mismatch && self.errors.is_empty()
    }
}

/// `local@domain.tld` with no whitespace and a single `@`
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// At least 8 characters from letters, digits and [`PASSWORD_SYMBOLS`],
/// including one of each of lower case, upper case, digit and symbol
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= PASSWORD_MIN_LEN
        && password_charset_regex().is_match(password)
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SYMBOLS.contains(c))
}

/// Check every field independently, then the password confirmation.
pub fn validate(form: &RegistrationForm) -> ValidationReport {
    let mut errors = FieldErrors::default();

    for (field, value) in [
        (Field::FirstName, &form.first_name),
        (Field::LastName, &form.last_name),
        (Field::Birthday, &form.birthday),
        (Field::PhoneNumber, &form.phone_number),
    ] {
        if value.is_empty() {
            errors.insert(field, IssueKind::Required);
        }
    }

    if form.email.is_empty() {
        errors.insert(Field::Email, IssueKind::Required);
    } else if !is_valid_email(&form.email) {
        errors.insert(Field::Email, IssueKind::InvalidFormat);
    }

    if form.password.is_empty() {
        errors.insert(Field::Password, IssueKind::Required);
    } else if !is_strong_password(&form.password) {
        errors.insert(Field::Password, IssueKind::TooWeak);
    }

    if form.confirm_password.is_empty() {
        errors.insert(Field::ConfirmPassword, IssueKind::Required);
    }

    let password_mismatch = form.password != form.confirm_password;
    if password_mismatch {
        errors.insert(Field::ConfirmPassword, IssueKind::Mismatch);
    }

    ValidationReport { errors, password_mismatch }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> RegistrationForm {
        RegistrationForm {
            first_name: "Noura".to_string(),
            last_name: "Alharbi".to_string(),
            birthday: "1999-04-12".to_string(),
            email: "noura@example.com".to_string(),
            phone_number: "0551234567".to_string(),
            password: "Abcdef1!".to_string(),
            confirm_password: "Abcdef1!".to_string(),
        }
    }

    #[test]
    fn test_valid_form_is_clean() {
        let report = validate(&valid_form());
        assert!(report.is_clean());
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_password_strength() {
        assert!(is_strong_password("Abcdef1!"));
        assert!(!is_strong_password("abcdefgh"));
        assert!(!is_strong_password("Abcdef1"));
        assert!(!is_strong_password("ABCDEFG1!"));
        assert!(!is_strong_password("Abcdefg!"));
        // '#' is outside the allowed symbol set
        assert!(!is_strong_password("Abcdef1#"));
        assert!(!is_strong_password("Abcde f1!"));
    }

    #[test]
    fn test_empty_password_is_required_not_weak() {
        let mut form = valid_form();
        form.password.clear();
        form.confirm_password.clear();

        let report = validate(&form);
        assert_eq!(report.errors.kind(Field::Password), Some(IssueKind::Required));
        assert_eq!(report.errors.kind(Field::ConfirmPassword), Some(IssueKind::Required));
        assert!(!report.password_mismatch);
    }

    #[test]
    fn test_weak_password_reported() {
        let mut form = valid_form();
        form.password = "abcdefgh".to_string();
        form.confirm_password = "abcdefgh".to_string();

        let report = validate(&form);
        assert_eq!(report.errors.kind(Field::Password), Some(IssueKind::TooWeak));
        assert!(!report.is_clean());
    }

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("first.last@sub.domain.sa"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("a@@b.com"));
        assert!(!is_valid_email("a@b@c.com"));
        assert!(!is_valid_email("@b.com"));
        assert!(!is_valid_email("a@b."));
    }

    #[test]
    fn test_email_required_before_format() {
        let mut form = valid_form();
        form.email.clear();
        assert_eq!(validate(&form).errors.kind(Field::Email), Some(IssueKind::Required));

        form.email = "a@b".to_string();
        assert_eq!(validate(&form).errors.kind(Field::Email), Some(IssueKind::InvalidFormat));
    }

    #[test]
    fn test_mismatch_always_aborts() {
        let mut form = valid_form();
        form.confirm_password = "Abcdef1?".to_string();
        let report = validate(&form);
        assert!(report.password_mismatch);
        assert!(!report.is_clean());
        assert_eq!(report.errors.kind(Field::ConfirmPassword), Some(IssueKind::Mismatch));

        let empty_other_fields = RegistrationForm {
            password: "Abcdef1!".to_string(),
            ..RegistrationForm::default()
        };
        let report = validate(&empty_other_fields);
        assert!(report.password_mismatch);
        assert_eq!(report.errors.kind(Field::ConfirmPassword), Some(IssueKind::Mismatch));
        assert_eq!(report.errors.kind(Field::FirstName), Some(IssueKind::Required));
    }

    #[test]
    fn test_fields_checked_independently() {
        let report = validate(&RegistrationForm::default());
        assert_eq!(report.errors.len(), 7);
        assert!(!report.password_mismatch);
    }

    #[test]
    fn test_validation_is_deterministic() {
        let mut form = valid_form();
        form.email = "bad".to_string();
        form.last_name.clear();
        assert_eq!(validate(&form), validate(&form));
    }
}
