//! Static description of a wizard: ordered steps, their fields and rules,
//! the derived-field table and the terminal action.

use crate::errors::{Result, WizardError};
use crate::wizard::derived::DerivedRule;
use crate::wizard::validation::{Rule, StepValidator};
use crate::wizard::value::FieldKind;

/// Who may write a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAccess {
    Editable,
    /// Shown to the user, written only by derived rules or verification.
    ReadOnly,
    /// Engine bookkeeping, never shown.
    Internal,
}

/// Declarative description of a single form field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub access: FieldAccess,
    pub help: Option<&'static str>,
}

impl FieldDescriptor {
    pub fn new(key: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            label,
            kind,
            required: true,
            access: FieldAccess::Editable,
            help: None,
        }
    }

    pub fn with_optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.access = FieldAccess::ReadOnly;
        self
    }

    /// Hidden engine-managed field. Never required.
    pub fn internal(mut self) -> Self {
        self.access = FieldAccess::Internal;
        self.required = false;
        self
    }

    pub fn is_editable(&self) -> bool {
        self.access == FieldAccess::Editable
    }

    pub fn is_visible(&self) -> bool {
        self.access != FieldAccess::Internal
    }
}

/// Asynchronous lookup a step performs before it can be completed.
#[derive(Debug, Clone)]
pub struct VerificationSpec {
    /// Action name sent to the dispatcher.
    pub action: &'static str,
    /// Fields copied into the request payload.
    pub inputs: Vec<&'static str>,
    /// `(response key, target field)` pairs copied from the response data.
    pub autofill: Vec<(&'static str, &'static str)>,
    /// Checkbox set to `true` once the verification succeeds.
    pub verified_flag: Option<&'static str>,
}

impl VerificationSpec {
    pub fn new(action: &'static str, inputs: Vec<&'static str>) -> Self {
        Self {
            action,
            inputs,
            autofill: Vec::new(),
            verified_flag: None,
        }
    }

    pub fn autofill(mut self, response_key: &'static str, target: &'static str) -> Self {
        self.autofill.push((response_key, target));
        self
    }

    pub fn flag(mut self, field: &'static str) -> Self {
        self.verified_flag = Some(field);
        self
    }
}

/// One screen of a wizard.
#[derive(Debug, Clone)]
pub struct StepDefinition {
    pub index: usize,
    pub title: &'static str,
    pub fields: Vec<FieldDescriptor>,
    pub rules: Vec<Rule>,
    pub verification: Option<VerificationSpec>,
    /// Internal field receiving generated password suggestions.
    pub suggestion_slot: Option<&'static str>,
    validator: StepValidator,
}

impl StepDefinition {
    pub fn new(title: &'static str) -> Self {
        Self {
            index: 0,
            title,
            fields: Vec::new(),
            rules: Vec::new(),
            verification: None,
            suggestion_slot: None,
            validator: StepValidator::default(),
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn verification(mut self, spec: VerificationSpec) -> Self {
        self.verification = Some(spec);
        self
    }

    pub fn suggestion_slot(mut self, field: &'static str) -> Self {
        self.suggestion_slot = Some(field);
        self
    }

    pub fn validator(&self) -> &StepValidator {
        &self.validator
    }

    pub fn descriptor(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.key == key)
    }

    fn seal(mut self, index: usize) -> Self {
        let required = self
            .fields
            .iter()
            .filter(|field| field.required)
            .map(|field| field.key)
            .collect();
        self.validator = StepValidator::new(required, self.rules.clone());
        self.index = index;
        self
    }
}

/// What happens after a successful terminal submission.
#[derive(Debug, Clone)]
pub struct SubmitSpec {
    pub action: &'static str,
    pub success_title: &'static str,
    pub success_description: &'static str,
    pub redirect_to: &'static str,
}

/// A complete, statically ordered wizard.
#[derive(Debug, Clone)]
pub struct WizardDefinition {
    pub name: &'static str,
    steps: Vec<StepDefinition>,
    derived: Vec<DerivedRule>,
    submit: SubmitSpec,
}

impl WizardDefinition {
    pub fn builder(name: &'static str, submit: SubmitSpec) -> WizardBuilder {
        WizardBuilder {
            name,
            steps: Vec::new(),
            derived: Vec::new(),
            submit,
        }
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// Step by 1-based index.
    pub fn step(&self, index: usize) -> Option<&StepDefinition> {
        index.checked_sub(1).and_then(|pos| self.steps.get(pos))
    }

    pub fn derived_rules(&self) -> &[DerivedRule] {
        &self.derived
    }

    pub fn submit(&self) -> &SubmitSpec {
        &self.submit
    }

    pub fn descriptor(&self, key: &str) -> Option<&FieldDescriptor> {
        self.steps.iter().find_map(|step| step.descriptor(key))
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.steps.iter().flat_map(|step| step.fields.iter())
    }
}

pub struct WizardBuilder {
    name: &'static str,
    steps: Vec<StepDefinition>,
    derived: Vec<DerivedRule>,
    submit: SubmitSpec,
}

impl WizardBuilder {
    pub fn step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    pub fn derive(mut self, rule: DerivedRule) -> Self {
        self.derived.push(rule);
        self
    }

    pub fn build(self) -> Result<WizardDefinition> {
        if self.steps.is_empty() {
            return Err(WizardError::EmptyDefinition(self.name.to_string()));
        }
        let mut seen = std::collections::HashSet::new();
        for field in self.steps.iter().flat_map(|step| step.fields.iter()) {
            if !seen.insert(field.key) {
                return Err(WizardError::Config(format!(
                    "field `{}` is declared twice in `{}`",
                    field.key, self.name
                )));
            }
        }
        for rule in &self.derived {
            for key in [rule.source, rule.target] {
                if !seen.contains(key) {
                    return Err(WizardError::UnknownField(key.to_string()));
                }
            }
        }
        let steps = self
            .steps
            .into_iter()
            .enumerate()
            .map(|(pos, step)| step.seal(pos + 1))
            .collect();
        Ok(WizardDefinition {
            name: self.name,
            steps,
            derived: self.derived,
            submit: self.submit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submit() -> SubmitSpec {
        SubmitSpec {
            action: "noop",
            success_title: "Done",
            success_description: "Saved",
            redirect_to: "/",
        }
    }

    #[test]
    fn empty_definition_is_rejected() {
        let err = WizardDefinition::builder("empty", submit()).build().unwrap_err();
        assert!(matches!(err, WizardError::EmptyDefinition(name) if name == "empty"));
    }

    #[test]
    fn steps_are_indexed_from_one_and_collect_required_fields() {
        let definition = WizardDefinition::builder("demo", submit())
            .step(
                StepDefinition::new("First")
                    .field(FieldDescriptor::new("name", "Name", FieldKind::Text))
                    .field(FieldDescriptor::new("notes", "Notes", FieldKind::Text).with_optional()),
            )
            .step(StepDefinition::new("Info"))
            .build()
            .expect("valid definition");

        assert_eq!(definition.total_steps(), 2);
        let first = definition.step(1).expect("step 1");
        assert_eq!(first.index, 1);
        assert_eq!(first.validator().required(), &["name"]);
        assert_eq!(definition.step(2).map(|step| step.index), Some(2));
        assert!(definition.step(0).is_none());
        assert!(definition.step(3).is_none());
    }

    #[test]
    fn derived_rules_must_reference_declared_fields() {
        let err = WizardDefinition::builder("demo", submit())
            .step(
                StepDefinition::new("Bank")
                    .field(FieldDescriptor::new("bank_code", "Bank", FieldKind::Text)),
            )
            .derive(DerivedRule::bank_name("bank_code", "bank_name"))
            .build()
            .unwrap_err();
        assert!(matches!(err, WizardError::UnknownField(key) if key == "bank_name"));
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        let err = WizardDefinition::builder("demo", submit())
            .step(StepDefinition::new("A").field(FieldDescriptor::new("x", "X", FieldKind::Text)))
            .step(StepDefinition::new("B").field(FieldDescriptor::new("x", "X", FieldKind::Text)))
            .build()
            .unwrap_err();
        assert!(matches!(err, WizardError::Config(_)));
    }
}
