use crate::config::WizardConfig;
use crate::errors::Result;
use crate::flows::USE_SUGGESTION_FIELD;
use crate::wizard::{
    DerivedRule, FieldDescriptor, FieldKind, Rule, StepDefinition, SubmitSpec, WizardDefinition,
};

pub const NAME: &str = "password-setup";

pub fn definition(config: &WizardConfig) -> Result<WizardDefinition> {
    WizardDefinition::builder(
        NAME,
        SubmitSpec {
            action: "set_password",
            success_title: "Password updated",
            success_description: "Use your new password the next time you sign in.",
            redirect_to: "/dashboard",
        },
    )
    .step(StepDefinition::new("Current password").field(FieldDescriptor::new(
        "current_password",
        "Current password",
        FieldKind::Secret,
    )))
    .step(
        StepDefinition::new("New password")
            .field(FieldDescriptor::new("new_password", "New password", FieldKind::Secret))
            .field(FieldDescriptor::new(
                "confirm_password",
                "Confirm new password",
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
                "new_password",
                "confirm_password",
                "Passwords do not match",
            ))
            .rule(Rule::min_strength(
                "new_password",
                config.min_password_strength,
                "Password is too weak",
            ))
            .rule(Rule::differs(
                "new_password",
                "current_password",
                "New password must differ from the current one",
            ))
            .suggestion_slot("suggested_password"),
    )
    .derive(DerivedRule::copy_when_checked(
        USE_SUGGESTION_FIELD,
        "suggested_password",
        "new_password",
    ))
    .derive(DerivedRule::copy_when_checked(
        USE_SUGGESTION_FIELD,
        "suggested_password",
        "confirm_password",
    ))
    .build()
}
