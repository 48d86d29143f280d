use crate::config::WizardConfig;
use crate::errors::Result;
use crate::flows::USE_SUGGESTION_FIELD;
use crate::wizard::{
    DerivedRule, FieldDescriptor, FieldKind, FieldStore, FieldValue, Rule, StepDefinition,
    SubmitSpec, VerificationSpec, WizardDefinition,
};

pub const NAME: &str = "tenant-signup";

const DERIVED_DISPLAY_NAME: &str = "derived_display_name";

pub fn definition(config: &WizardConfig) -> Result<WizardDefinition> {
    WizardDefinition::builder(
        NAME,
        SubmitSpec {
            action: "register_tenant",
            success_title: "Account created",
            success_description: "Your business account is ready. Sign in to continue.",
            redirect_to: "/login",
        },
    )
    .step(
        StepDefinition::new("Business")
            .field(
                FieldDescriptor::new("rc_number", "RC number", FieldKind::Text)
                    .with_help("CAC registration number"),
            )
            .field(FieldDescriptor::new(
                "business_name",
                "Business name",
                FieldKind::Text,
            ))
            .rule(Rule::digits("rc_number", 7, "RC number must be 7 digits"))
            .verification(
                VerificationSpec::new("verify_business", vec!["rc_number"])
                    .autofill("business_name", "business_name"),
            ),
    )
    .step(
        StepDefinition::new("Administrator")
            .field(FieldDescriptor::new("first_name", "First name", FieldKind::Text))
            .field(FieldDescriptor::new("last_name", "Last name", FieldKind::Text))
            .field(
                FieldDescriptor::new("display_name", "Display name", FieldKind::Text)
                    .with_help("Defaults to your full name"),
            )
            .field(
                FieldDescriptor::new(
                    DERIVED_DISPLAY_NAME,
                    "Derived display name",
                    FieldKind::Text,
                )
                .internal(),
            )
            .field(FieldDescriptor::new("admin_email", "Email", FieldKind::Text))
            .field(FieldDescriptor::new("admin_phone", "Phone", FieldKind::Text))
            .rule(Rule::email("admin_email", "Enter a valid email address"))
            .rule(Rule::phone("admin_phone", "Enter a valid 11-digit phone number")),
    )
    .step(
        StepDefinition::new("Security")
            .field(FieldDescriptor::new("password", "Password", FieldKind::Secret))
            .field(FieldDescriptor::new(
                "confirm_password",
                "Confirm password",
                FieldKind::Secret,
            ))
            .field(
                FieldDescriptor::new(
                    "suggested_password",
                    "Suggested password",
                    FieldKind::Secret,
                )
                .internal(),
            )
            .field(
                FieldDescriptor::new(
                    USE_SUGGESTION_FIELD,
                    "Use suggested password",
                    FieldKind::Checkbox,
                )
                .with_optional(),
            )
            .rule(Rule::matches(
                "password",
                "confirm_password",
                "Passwords do not match",
            ))
            .rule(Rule::min_strength(
                "password",
                config.min_password_strength,
                "Password is too weak",
            ))
            .suggestion_slot("suggested_password"),
    )
    .step(
        StepDefinition::new("Terms").field(FieldDescriptor::new(
            "accept_terms",
            "I accept the terms of service",
            FieldKind::Checkbox,
        ))
        .rule(Rule::consent(
            "accept_terms",
            "You must accept the terms of service",
        )),
    )
    .derive(DerivedRule::new("first_name", "display_name", display_name))
    .derive(DerivedRule::new("first_name", DERIVED_DISPLAY_NAME, |fields| {
        Some(FieldValue::Text(full_name(fields)))
    }))
    .derive(DerivedRule::new("last_name", "display_name", display_name))
    .derive(DerivedRule::new("last_name", DERIVED_DISPLAY_NAME, |fields| {
        Some(FieldValue::Text(full_name(fields)))
    }))
    .derive(DerivedRule::copy_when_checked(
        USE_SUGGESTION_FIELD,
        "suggested_password",
        "password",
    ))
    .derive(DerivedRule::copy_when_checked(
        USE_SUGGESTION_FIELD,
        "suggested_password",
        "confirm_password",
    ))
    .build()
}

fn full_name(fields: &FieldStore) -> String {
    let name = format!(
        "{} {}",
        fields.text("first_name").trim(),
        fields.text("last_name").trim()
    );
    name.trim().to_string()
}

/// Follows the full name until the user types their own display name.
/// Must be declared before the rule that refreshes the tracking field.
fn display_name(fields: &FieldStore) -> Option<FieldValue> {
    let current = fields.text("display_name");
    if current.trim().is_empty() || current == fields.text(DERIVED_DISPLAY_NAME) {
        Some(FieldValue::Text(full_name(fields)))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::WizardSession;
    use std::sync::Arc;

    #[test]
    fn display_name_follows_name_edits() {
        let definition = definition(&WizardConfig::default()).expect("valid flow");
        let mut session = WizardSession::new(Arc::new(definition));
        session.update("first_name", "Ada").unwrap();
        assert_eq!(session.fields().text("display_name"), "Ada");
        session.update("last_name", "Obi").unwrap();
        assert_eq!(session.fields().text("display_name"), "Ada Obi");
        session.update("display_name", "Ada O.").unwrap();
        assert_eq!(session.fields().text("display_name"), "Ada O.");
    }

    #[test]
    fn edited_display_name_survives_later_name_changes() {
        let definition = definition(&WizardConfig::default()).expect("valid flow");
        let mut session = WizardSession::new(Arc::new(definition));
        session.update("first_name", "Ada").unwrap();
        session.update("display_name", "The Boss").unwrap();
        session.update("last_name", "Obi").unwrap();
        session.update("first_name", "Adaeze").unwrap();
        assert_eq!(session.fields().text("display_name"), "The Boss");

        session.update("display_name", "").unwrap();
        session.update("last_name", "Okafor").unwrap();
        assert_eq!(session.fields().text("display_name"), "Adaeze Okafor");
        assert!(session
            .summary()
            .iter()
            .all(|line| line.label != "Derived display name"));
    }

    #[test]
    fn strength_threshold_comes_from_config() {
        let config = WizardConfig {
            min_password_strength: 2,
            ..WizardConfig::default()
        };
        let definition = definition(&config).expect("valid flow");
        let security = definition.step(3).expect("security step");
        assert!(security
            .rules
            .iter()
            .any(|rule| matches!(rule, Rule::MinStrength { min: 2, .. })));
    }
}
