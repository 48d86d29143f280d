//! Per-step validation: required fields, formats, cross-field and consent
//! rules, evaluated in that priority order.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::wizard::derived::password_strength;
use crate::wizard::value::FieldStore;

pub const REQUIRED_MESSAGE: &str = "Please fill in all required fields";

const PHONE_DIGITS: usize = 11;
const COUNTRY_PREFIX: &str = "234";

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

/// Names of fields currently flagged as invalid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeSet<String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, field: impl Into<String>) {
        self.0.insert(field.into());
    }

    /// Clears a single field's flag. Returns whether it was set.
    pub fn clear_field(&mut self, field: &str) -> bool {
        self.0.remove(field)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for FieldErrors {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Outcome of running a step's validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub field_errors: FieldErrors,
    pub message: Option<String>,
}

impl ValidationResult {
    pub fn pass() -> Self {
        Self {
            valid: true,
            field_errors: FieldErrors::new(),
            message: None,
        }
    }

    pub fn fail(field_errors: FieldErrors, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            field_errors,
            message: Some(message.into()),
        }
    }
}

/// Rule families, in the order a validator reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RuleCategory {
    Required,
    Format,
    CrossField,
    Consent,
}

type CheckFn = dyn Fn(&FieldStore) -> bool + Send + Sync;

/// A single non-required validation rule.
#[derive(Clone)]
pub enum Rule {
    /// Exactly `count` digits once non-digit characters are stripped.
    Digits {
        field: &'static str,
        count: usize,
        message: String,
    },
    Email {
        field: &'static str,
        message: String,
    },
    /// Normalizes to an 11-digit local number.
    Phone {
        field: &'static str,
        message: String,
    },
    /// `confirm` must equal `field`; flags `confirm`.
    Matches {
        field: &'static str,
        confirm: &'static str,
        message: String,
    },
    MinStrength {
        field: &'static str,
        min: u8,
        message: String,
    },
    /// `field` must differ from `other`; flags `field`.
    Differs {
        field: &'static str,
        other: &'static str,
        message: String,
    },
    Consent {
        field: &'static str,
        message: String,
    },
    Custom {
        category: RuleCategory,
        fields: Vec<&'static str>,
        check: Arc<CheckFn>,
        message: String,
    },
}

impl Rule {
    pub fn digits(field: &'static str, count: usize, message: impl Into<String>) -> Self {
        Rule::Digits {
            field,
            count,
            message: message.into(),
        }
    }

    pub fn email(field: &'static str, message: impl Into<String>) -> Self {
        Rule::Email {
            field,
            message: message.into(),
        }
    }

    pub fn phone(field: &'static str, message: impl Into<String>) -> Self {
        Rule::Phone {
            field,
            message: message.into(),
        }
    }

    pub fn matches(
        field: &'static str,
        confirm: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Rule::Matches {
            field,
            confirm,
            message: message.into(),
        }
    }

    pub fn min_strength(field: &'static str, min: u8, message: impl Into<String>) -> Self {
        Rule::MinStrength {
            field,
            min,
            message: message.into(),
        }
    }

    pub fn differs(field: &'static str, other: &'static str, message: impl Into<String>) -> Self {
        Rule::Differs {
            field,
            other,
            message: message.into(),
        }
    }

    pub fn consent(field: &'static str, message: impl Into<String>) -> Self {
        Rule::Consent {
            field,
            message: message.into(),
        }
    }

    /// Arbitrary predicate; `check` returns `true` when the rule passes.
    pub fn custom(
        category: RuleCategory,
        fields: Vec<&'static str>,
        message: impl Into<String>,
        check: impl Fn(&FieldStore) -> bool + Send + Sync + 'static,
    ) -> Self {
        Rule::Custom {
            category,
            fields,
            check: Arc::new(check),
            message: message.into(),
        }
    }

    pub fn category(&self) -> RuleCategory {
        match self {
            Rule::Digits { .. } | Rule::Email { .. } | Rule::Phone { .. } => RuleCategory::Format,
            Rule::Matches { .. } | Rule::MinStrength { .. } | Rule::Differs { .. } => {
                RuleCategory::CrossField
            }
            Rule::Consent { .. } => RuleCategory::Consent,
            Rule::Custom { category, .. } => *category,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Rule::Digits { message, .. }
            | Rule::Email { message, .. }
            | Rule::Phone { message, .. }
            | Rule::Matches { message, .. }
            | Rule::MinStrength { message, .. }
            | Rule::Differs { message, .. }
            | Rule::Consent { message, .. }
            | Rule::Custom { message, .. } => message,
        }
    }

    /// Fields to flag when the rule fails, or `None` when it passes.
    ///
    /// Format rules skip blank values; emptiness is the required check's job.
    fn failures(&self, fields: &FieldStore) -> Option<Vec<&'static str>> {
        let failed = match self {
            Rule::Digits { field, count, .. } => {
                let raw = fields.text(field);
                !raw.trim().is_empty() && digits_only(raw).len() != *count
            }
            Rule::Email { field, .. } => {
                let raw = fields.text(field);
                !raw.trim().is_empty() && !is_valid_email(raw)
            }
            Rule::Phone { field, .. } => {
                let raw = fields.text(field);
                !raw.trim().is_empty() && normalize_phone(raw).is_none()
            }
            Rule::Matches { field, confirm, .. } => {
                return (fields.text(field) != fields.text(confirm)).then(|| vec![*confirm]);
            }
            Rule::MinStrength { field, min, .. } => password_strength(fields.text(field)) < *min,
            Rule::Differs { field, other, .. } => {
                let value = fields.text(field);
                !value.is_empty() && value == fields.text(other)
            }
            Rule::Consent { field, .. } => !fields.flag(field),
            Rule::Custom {
                fields: flagged,
                check,
                ..
            } => return (!check(fields)).then(|| flagged.clone()),
        };
        if failed {
            Some(vec![self.field()])
        } else {
            None
        }
    }

    /// Field a failure of this rule is reported against.
    pub fn field(&self) -> &'static str {
        match self {
            Rule::Digits { field, .. }
            | Rule::Email { field, .. }
            | Rule::Phone { field, .. }
            | Rule::MinStrength { field, .. }
            | Rule::Differs { field, .. }
            | Rule::Consent { field, .. } => *field,
            Rule::Matches { confirm, .. } => *confirm,
            Rule::Custom { fields, .. } => fields.first().copied().unwrap_or(""),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("category", &self.category())
            .field("field", &self.field())
            .field("message", &self.message())
            .finish()
    }
}

/// Pure validator for one step.
#[derive(Debug, Clone, Default)]
pub struct StepValidator {
    required: Vec<&'static str>,
    rules: Vec<Rule>,
}

impl StepValidator {
    pub fn new(required: Vec<&'static str>, rules: Vec<Rule>) -> Self {
        Self { required, rules }
    }

    pub fn required(&self) -> &[&'static str] {
        &self.required
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Every empty required field is flagged together. Later categories
    /// only run once all earlier ones pass; within a category every failing
    /// field is flagged and the first failing rule supplies the message.
    pub fn validate(&self, fields: &FieldStore) -> ValidationResult {
        let missing: FieldErrors = self
            .required
            .iter()
            .copied()
            .filter(|name| fields.is_blank(name))
            .collect();
        if !missing.is_empty() {
            return ValidationResult::fail(missing, REQUIRED_MESSAGE);
        }

        for category in [
            RuleCategory::Format,
            RuleCategory::CrossField,
            RuleCategory::Consent,
        ] {
            let mut flagged = FieldErrors::new();
            let mut message = None;
            for rule in self.rules.iter().filter(|rule| rule.category() == category) {
                if let Some(failed) = rule.failures(fields) {
                    failed.into_iter().for_each(|name| flagged.mark(name));
                    message.get_or_insert_with(|| rule.message().to_string());
                }
            }
            if let Some(message) = message {
                return ValidationResult::fail(flagged, message);
            }
        }

        ValidationResult::pass()
    }
}

pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|ch| ch.is_ascii_digit()).collect()
}

pub fn is_valid_email(raw: &str) -> bool {
    EMAIL_PATTERN.is_match(raw.trim())
}

/// Normalizes a Nigerian phone number to its 11-digit local form.
///
/// Accepts `+234` / `234` prefixes and numbers missing the leading zero.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits = digits_only(raw);
    let local = if digits.len() == PHONE_DIGITS + 2 && digits.starts_with(COUNTRY_PREFIX) {
        format!("0{}", &digits[COUNTRY_PREFIX.len()..])
    } else if digits.len() == PHONE_DIGITS - 1 && !digits.starts_with('0') {
        format!("0{}", digits)
    } else {
        digits
    };
    (local.len() == PHONE_DIGITS).then_some(local)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank_validator() -> StepValidator {
        StepValidator::new(
            vec!["bvn", "account_number"],
            vec![
                Rule::digits("bvn", 11, "BVN must be 11 digits"),
                Rule::digits("account_number", 10, "Account number must be 10 digits"),
            ],
        )
    }

    #[test]
    fn flags_every_missing_required_field_at_once() {
        let result = bank_validator().validate(&FieldStore::new());
        assert!(!result.valid);
        assert!(result.field_errors.contains("bvn"));
        assert!(result.field_errors.contains("account_number"));
        assert_eq!(result.message.as_deref(), Some(REQUIRED_MESSAGE));
    }

    #[test]
    fn digit_checks_strip_separators() {
        let mut fields = FieldStore::new();
        fields.insert("bvn", "123-456-789-01");
        fields.insert("account_number", "0123456789");
        assert!(bank_validator().validate(&fields).valid);

        fields.insert("bvn", "1234");
        let result = bank_validator().validate(&fields);
        assert_eq!(result.message.as_deref(), Some("BVN must be 11 digits"));
        assert_eq!(result.field_errors.iter().collect::<Vec<_>>(), vec!["bvn"]);
    }

    #[test]
    fn format_failures_are_all_flagged_with_first_message() {
        let mut fields = FieldStore::new();
        fields.insert("bvn", "1234");
        fields.insert("account_number", "12345");
        let result = bank_validator().validate(&fields);
        assert_eq!(result.field_errors.len(), 2);
        assert_eq!(result.message.as_deref(), Some("BVN must be 11 digits"));
    }

    #[test]
    fn categories_short_circuit_in_priority_order() {
        let validator = StepValidator::new(
            vec!["email"],
            vec![
                Rule::consent("accept_terms", "You must accept the terms"),
                Rule::matches("password", "confirm_password", "Passwords do not match"),
                Rule::email("email", "Please enter a valid email address"),
            ],
        );
        let mut fields = FieldStore::new();
        fields.insert("email", "not-an-email");
        fields.insert("password", "a");
        fields.insert("confirm_password", "b");

        let result = validator.validate(&fields);
        assert_eq!(
            result.message.as_deref(),
            Some("Please enter a valid email address")
        );

        fields.insert("email", "ops@example.com");
        let result = validator.validate(&fields);
        assert_eq!(result.message.as_deref(), Some("Passwords do not match"));
        assert!(result.field_errors.contains("confirm_password"));

        fields.insert("confirm_password", "a");
        let result = validator.validate(&fields);
        assert_eq!(result.message.as_deref(), Some("You must accept the terms"));

        fields.insert("accept_terms", true);
        assert!(validator.validate(&fields).valid);
    }

    #[test]
    fn empty_validator_always_passes() {
        assert!(StepValidator::default().validate(&FieldStore::new()).valid);
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("ops@bank.ng"));
        assert!(!is_valid_email("ops@bank"));
        assert!(!is_valid_email("ops bank@x.ng"));
        assert!(!is_valid_email("@bank.ng"));
    }

    #[test]
    fn phone_normalization() {
        assert_eq!(normalize_phone("0803 123 4567").as_deref(), Some("08031234567"));
        assert_eq!(normalize_phone("+234 803 123 4567").as_deref(), Some("08031234567"));
        assert_eq!(normalize_phone("8031234567").as_deref(), Some("08031234567"));
        assert_eq!(normalize_phone("12345"), None);
    }

    #[test]
    fn differs_and_strength_rules() {
        let validator = StepValidator::new(
            vec![],
            vec![
                Rule::min_strength("new_password", 4, "Password is too weak"),
                Rule::differs(
                    "new_password",
                    "current_password",
                    "New password must be different from the current password",
                ),
            ],
        );
        let mut fields = FieldStore::new();
        fields.insert("current_password", "Abc12345!");
        fields.insert("new_password", "abc");
        assert_eq!(
            validator.validate(&fields).message.as_deref(),
            Some("Password is too weak")
        );

        fields.insert("new_password", "Abc12345!");
        assert_eq!(
            validator.validate(&fields).message.as_deref(),
            Some("New password must be different from the current password")
        );

        fields.insert("new_password", "Xyz98765?");
        assert!(validator.validate(&fields).valid);
    }
}
