use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

/// Outcome of a caller-supplied field check. `FailWith` carries a message
/// used verbatim; a plain `Fail` produces the generic "Invalid value".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Pass,
    Fail,
    FailWith(String),
}

pub type CustomCheck = Box<dyn Fn(&str) -> CheckOutcome + Send + Sync>;

/// Composable per-field rule. Rules are evaluated in a fixed order —
/// required, min_length, max_length, pattern, custom check — and the first
/// failing rule wins; the rest are not evaluated.
#[derive(Default)]
pub struct ValidationRule {
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Regex>,
    pub check: Option<CustomCheck>,
}

impl ValidationRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn check(mut self, check: impl Fn(&str) -> CheckOutcome + Send + Sync + 'static) -> Self {
        self.check = Some(Box::new(check));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Required,
    Length,
    Format,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub kind: ErrorKind,
    pub message: String,
}

impl FieldError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

pub type RuleSet = BTreeMap<String, ValidationRule>;
pub type ValidationErrors = BTreeMap<String, FieldError>;

/// Validates a single value against one rule. Pure; returns `None` iff
/// every present rule passes.
pub fn validate_field(value: &str, rule: &ValidationRule) -> Option<FieldError> {
    if rule.required && value.is_empty() {
        return Some(FieldError::new(ErrorKind::Required, "This field is required"));
    }

    if let Some(min) = rule.min_length {
        if value.chars().count() < min {
            return Some(FieldError::new(
                ErrorKind::Length,
                format!("Minimum length is {min} characters"),
            ));
        }
    }

    if let Some(max) = rule.max_length {
        if value.chars().count() > max {
            return Some(FieldError::new(
                ErrorKind::Length,
                format!("Maximum length is {max} characters"),
            ));
        }
    }

    if let Some(pattern) = &rule.pattern {
        if !pattern.is_match(value) {
            return Some(FieldError::new(ErrorKind::Format, "Invalid format"));
        }
    }

    if let Some(check) = &rule.check {
        match check(value) {
            CheckOutcome::Pass => {}
            CheckOutcome::Fail => {
                return Some(FieldError::new(ErrorKind::Invalid, "Invalid value"));
            }
            CheckOutcome::FailWith(message) => {
                return Some(FieldError::new(ErrorKind::Invalid, message));
            }
        }
    }

    None
}

/// Validates every field named by the ruleset independently and returns
/// only the fields with errors. A field missing from `values` validates as
/// empty; fields absent from the ruleset are never checked.
pub fn validate_form(values: &BTreeMap<String, String>, rules: &RuleSet) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    for (field, rule) in rules {
        let value = values.get(field).map(String::as_str).unwrap_or("");
        if let Some(error) = validate_field(value, rule) {
            errors.insert(field.clone(), error);
        }
    }
    errors
}

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern")
});

pub fn email_pattern() -> Regex {
    EMAIL_PATTERN.clone()
}

const SPECIAL_CHARS: &str = "@$!%*?&";

/// Password strength check. Unlike the rule engine this does not
/// short-circuit: every failed requirement is enumerated in one message,
/// joined by commas. Empty input passes — the `required` rule owns that
/// case.
pub fn validate_password_strength(password: &str) -> Option<String> {
    if password.is_empty() {
        return None;
    }

    let checks = [
        (password.chars().count() >= 8, "at least 8 characters"),
        (
            password.chars().any(|c| c.is_ascii_uppercase()),
            "an uppercase letter",
        ),
        (
            password.chars().any(|c| c.is_ascii_lowercase()),
            "a lowercase letter",
        ),
        (password.chars().any(|c| c.is_ascii_digit()), "a number"),
        (
            password.chars().any(|c| SPECIAL_CHARS.contains(c)),
            "a special character",
        ),
    ];

    let failed: Vec<&str> = checks
        .iter()
        .filter(|(passed, _)| !passed)
        .map(|(_, requirement)| *requirement)
        .collect();

    if failed.is_empty() {
        None
    } else {
        Some(format!("Password must contain {}", failed.join(", ")))
    }
}

/// Strength check adapted to the rule engine's custom-check seam.
pub fn password_strength_check(value: &str) -> CheckOutcome {
    match validate_password_strength(value) {
        None => CheckOutcome::Pass,
        Some(message) => CheckOutcome::FailWith(message),
    }
}

/// Ruleset for the sign-in form: email format plus non-empty password.
pub fn login_rules() -> RuleSet {
    let mut rules = RuleSet::new();
    rules.insert(
        "email".to_string(),
        ValidationRule::new().required().pattern(email_pattern()),
    );
    rules.insert("password".to_string(), ValidationRule::new().required());
    rules
}

/// Ruleset for the registration form. The confirm-password check is
/// cross-field, so the caller supplies the current password value.
pub fn registration_rules(current_password: &str) -> RuleSet {
    let password = current_password.to_string();
    let mut rules = RuleSet::new();
    rules.insert(
        "name".to_string(),
        ValidationRule::new().required().min_length(2),
    );
    rules.insert(
        "email".to_string(),
        ValidationRule::new().required().pattern(email_pattern()),
    );
    rules.insert(
        "password".to_string(),
        ValidationRule::new().required().check(password_strength_check),
    );
    rules.insert(
        "confirm_password".to_string(),
        ValidationRule::new().required().check(move |value| {
            if value == password {
                CheckOutcome::Pass
            } else {
                CheckOutcome::FailWith("Passwords do not match".to_string())
            }
        }),
    );
    rules
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
