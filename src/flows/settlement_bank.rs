use crate::config::WizardConfig;
use crate::errors::Result;
use crate::wizard::{
    bank_codes, DerivedRule, FieldDescriptor, FieldKind, FieldValue, Rule, RuleCategory,
    StepDefinition, SubmitSpec, VerificationSpec, WizardDefinition,
};

pub const NAME: &str = "settlement-bank";

/// Settlement bank onboarding: bank details, identity check against the BVN,
/// contact details and consent.
pub fn definition(_config: &WizardConfig) -> Result<WizardDefinition> {
    WizardDefinition::builder(
        NAME,
        SubmitSpec {
            action: "register_settlement_bank",
            success_title: "Settlement bank added",
            success_description: "Your settlement bank account has been registered.",
            redirect_to: "/settlement-banks",
        },
    )
    .step(
        StepDefinition::new("Bank details")
            .field(
                FieldDescriptor::new("bank_code", "Bank", FieldKind::Choice(bank_codes()))
                    .with_help("Three-digit CBN bank code"),
            )
            .field(FieldDescriptor::new("bank_name", "Bank name", FieldKind::Text).read_only())
            .field(FieldDescriptor::new(
                "account_number",
                "Account number",
                FieldKind::Text,
            ))
            .rule(Rule::digits("account_number", 10, "Account number must be 10 digits")),
    )
    .step(
        StepDefinition::new("Identity verification")
            .field(
                FieldDescriptor::new("bvn", "BVN", FieldKind::Text)
                    .with_help("Bank Verification Number, 11 digits"),
            )
            .field(
                FieldDescriptor::new("account_name", "Account name", FieldKind::Text)
                    .read_only()
                    .with_optional(),
            )
            .field(
                FieldDescriptor::new("bvn_verified", "BVN verified", FieldKind::Checkbox)
                    .internal(),
            )
            .rule(Rule::digits("bvn", 11, "BVN must be 11 digits"))
            .rule(Rule::custom(
                RuleCategory::CrossField,
                vec!["bvn"],
                "Verify the BVN before continuing",
                |fields| fields.flag("bvn_verified"),
            ))
            .verification(
                VerificationSpec::new(
                    "verify_identity",
                    vec!["bvn", "account_number", "bank_code"],
                )
                .autofill("account_name", "account_name")
                .flag("bvn_verified"),
            ),
    )
    .step(
        StepDefinition::new("Contact details")
            .field(FieldDescriptor::new("contact_email", "Email", FieldKind::Text))
            .field(FieldDescriptor::new("contact_phone", "Phone", FieldKind::Text))
            .rule(Rule::email("contact_email", "Enter a valid email address"))
            .rule(Rule::phone("contact_phone", "Enter a valid 11-digit phone number")),
    )
    .step(
        StepDefinition::new("Review and consent").field(FieldDescriptor::new(
            "accept_terms",
            "I confirm these details are correct",
            FieldKind::Checkbox,
        ))
        .rule(Rule::consent(
            "accept_terms",
            "You must confirm the details before submitting",
        )),
    )
    .derive(DerivedRule::bank_name("bank_code", "bank_name"))
    .derive(DerivedRule::reset("bvn", "bvn_verified", FieldValue::Bool(false)))
    .derive(DerivedRule::reset("bvn", "account_name", FieldValue::empty()))
    .derive(DerivedRule::reset("account_number", "bvn_verified", FieldValue::Bool(false)))
    .derive(DerivedRule::reset("account_number", "account_name", FieldValue::empty()))
    .derive(DerivedRule::reset("bank_code", "bvn_verified", FieldValue::Bool(false)))
    .derive(DerivedRule::reset("bank_code", "account_name", FieldValue::empty()))
    .build()
}
