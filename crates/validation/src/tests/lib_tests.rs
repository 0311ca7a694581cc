use super::*;

#[test]
fn empty_rule_passes_everything() {
    assert_eq!(validate_field("", &ValidationRule::new()), None);
    assert_eq!(validate_field("anything", &ValidationRule::new()), None);
}

#[test]
fn required_rejects_empty_value() {
    let rule = ValidationRule::new().required();
    let error = validate_field("", &rule).expect("error");
    assert_eq!(error.kind, ErrorKind::Required);
    assert_eq!(error.message, "This field is required");
    assert_eq!(validate_field("x", &rule), None);
}

#[test]
fn length_bounds_are_enforced() {
    let rule = ValidationRule::new().min_length(2).max_length(4);
    let too_short = validate_field("a", &rule).expect("error");
    assert_eq!(too_short.kind, ErrorKind::Length);
    assert_eq!(too_short.message, "Minimum length is 2 characters");

    let too_long = validate_field("abcde", &rule).expect("error");
    assert_eq!(too_long.kind, ErrorKind::Length);
    assert_eq!(too_long.message, "Maximum length is 4 characters");

    assert_eq!(validate_field("abc", &rule), None);
}

#[test]
fn pattern_mismatch_reports_format_error() {
    let rule = ValidationRule::new().pattern(email_pattern());
    let error = validate_field("not-an-email", &rule).expect("error");
    assert_eq!(error.kind, ErrorKind::Format);
    assert_eq!(error.message, "Invalid format");
    assert_eq!(validate_field("a@b.co", &rule), None);
}

#[test]
fn custom_check_outcomes_map_to_errors() {
    let fail = ValidationRule::new().check(|_| CheckOutcome::Fail);
    let error = validate_field("x", &fail).expect("error");
    assert_eq!(error.kind, ErrorKind::Invalid);
    assert_eq!(error.message, "Invalid value");

    let fail_with =
        ValidationRule::new().check(|_| CheckOutcome::FailWith("no good".to_string()));
    let error = validate_field("x", &fail_with).expect("error");
    assert_eq!(error.message, "no good");

    let pass = ValidationRule::new().check(|_| CheckOutcome::Pass);
    assert_eq!(validate_field("x", &pass), None);
}

#[test]
fn first_failing_rule_wins_in_fixed_order() {
    // required outranks everything else on an empty value
    let rule = ValidationRule::new()
        .required()
        .min_length(3)
        .pattern(email_pattern())
        .check(|_| CheckOutcome::Fail);
    assert_eq!(
        validate_field("", &rule).expect("error").kind,
        ErrorKind::Required
    );

    // min_length outranks pattern and the custom check
    assert_eq!(
        validate_field("ab", &rule).expect("error").kind,
        ErrorKind::Length
    );

    // pattern outranks the custom check
    assert_eq!(
        validate_field("abcd", &rule).expect("error").kind,
        ErrorKind::Format
    );

    // with everything else satisfied the custom check is reached
    assert_eq!(
        validate_field("a@b.co", &rule).expect("error").kind,
        ErrorKind::Invalid
    );
}

#[test]
fn short_circuit_skips_later_rules() {
    let rule = ValidationRule::new()
        .min_length(5)
        .check(|_| panic!("custom check must not run after a length failure"));
    let error = validate_field("ab", &rule).expect("error");
    assert_eq!(error.kind, ErrorKind::Length);
}

#[test]
fn validate_form_checks_each_field_independently() {
    let mut values = BTreeMap::new();
    values.insert("email".to_string(), "broken".to_string());
    values.insert("password".to_string(), "hunter2".to_string());
    values.insert("unchecked".to_string(), String::new());

    let errors = validate_form(&values, &login_rules());
    assert_eq!(errors.len(), 1);
    assert_eq!(errors["email"].kind, ErrorKind::Format);
    // fields absent from the ruleset are never checked
    assert!(!errors.contains_key("unchecked"));
}

#[test]
fn validate_form_treats_missing_values_as_empty() {
    let errors = validate_form(&BTreeMap::new(), &login_rules());
    assert_eq!(errors["email"].kind, ErrorKind::Required);
    assert_eq!(errors["password"].kind, ErrorKind::Required);
}

#[test]
fn password_strength_accepts_a_conforming_password() {
    assert_eq!(validate_password_strength("Abcdef1!"), None);
}

#[test]
fn password_strength_enumerates_every_failed_requirement() {
    let message = validate_password_strength("abc").expect("message");
    assert!(message.starts_with("Password must contain "));
    assert!(message.contains("at least 8 characters"));
    assert!(message.contains("an uppercase letter"));
    assert!(message.contains("a number"));
    assert!(message.contains("a special character"));
    assert!(!message.contains("a lowercase letter"));
}

#[test]
fn password_strength_ignores_empty_input() {
    // the required rule owns the empty case
    assert_eq!(validate_password_strength(""), None);
}

#[test]
fn registration_rules_cover_the_cross_field_confirmation() {
    let mut values = BTreeMap::new();
    values.insert("name".to_string(), "Jo".to_string());
    values.insert("email".to_string(), "jo@example.com".to_string());
    values.insert("password".to_string(), "Abcdef1!".to_string());
    values.insert("confirm_password".to_string(), "different".to_string());

    let errors = validate_form(&values, &registration_rules("Abcdef1!"));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors["confirm_password"].message, "Passwords do not match");

    values.insert("confirm_password".to_string(), "Abcdef1!".to_string());
    assert!(validate_form(&values, &registration_rules("Abcdef1!")).is_empty());
}

#[test]
fn registration_rules_surface_the_strength_message() {
    let mut values = BTreeMap::new();
    values.insert("name".to_string(), "J".to_string());
    values.insert("email".to_string(), "jo@example.com".to_string());
    values.insert("password".to_string(), "weak".to_string());
    values.insert("confirm_password".to_string(), "weak".to_string());

    let errors = validate_form(&values, &registration_rules("weak"));
    assert_eq!(errors["name"].message, "Minimum length is 2 characters");
    assert!(errors["password"].message.contains("an uppercase letter"));
}
