//! Concrete wizards built on the engine.

pub mod password_setup;
pub mod settlement_bank;
pub mod tenant_signup;

use crate::config::WizardConfig;
use crate::errors::{Result, WizardError};
use crate::wizard::WizardDefinition;

/// Names accepted by [`build`], in display order.
pub const FLOW_NAMES: [&str; 3] = [
    settlement_bank::NAME,
    tenant_signup::NAME,
    password_setup::NAME,
];

/// Checkbox that copies the generated suggestion into the password fields.
pub const USE_SUGGESTION_FIELD: &str = "use_suggestion";

pub fn build(name: &str, config: &WizardConfig) -> Result<WizardDefinition> {
    match name {
        settlement_bank::NAME => settlement_bank::definition(config),
        tenant_signup::NAME => tenant_signup::definition(config),
        password_setup::NAME => password_setup::definition(config),
        other => Err(WizardError::UnknownFlow(other.to_string())),
    }
}
