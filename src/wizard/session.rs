//! Live wizard instance: step controller, field store and error state.

use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SuggestionQuotas;
use crate::errors::{Result, WizardError};
use crate::wizard::derived::{suggest_password, PasswordStrength};
use crate::wizard::dispatch::{ActionRequest, ApiResponse};
use crate::wizard::step::{FieldDescriptor, StepDefinition, WizardDefinition};
use crate::wizard::validation::{FieldErrors, RuleCategory, StepValidator, ValidationResult};
use crate::wizard::value::{FieldKind, FieldStore, FieldValue};

pub const SUBMIT_LABEL: &str = "Submit";
pub const SUBMITTING_LABEL: &str = "Submitting...";
const UNFILLED: &str = "[unfilled]";
const MASK: &str = "********";

/// Activity within the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WizardStatus {
    Idle,
    Validating,
    Submitting,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WizardState {
    /// 1-based, always within `1..=total_steps`.
    pub current_step: usize,
    pub fields: FieldStore,
    pub field_errors: FieldErrors,
    pub global_error: Option<String>,
    pub status: WizardStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Moved { from: usize, to: usize },
    /// Validation failed; errors are now on the session.
    Blocked(ValidationResult),
    /// The final step validated; it is completed through submission.
    AtLastStep,
    AtFirstStep,
    Busy,
    Inactive,
}

/// Why a submission did not start.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitBlocked {
    Pending,
    NotOnFinalStep,
    Completed,
    Inactive,
    Invalid(ValidationResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitControl {
    pub enabled: bool,
    pub label: &'static str,
}

/// Identifies the verification request a response belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationTicket {
    session_id: Uuid,
    step: usize,
    generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VerificationStart {
    Ready {
        request: ActionRequest,
        ticket: VerificationTicket,
    },
    Blocked(ValidationResult),
}

#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    Merged,
    Rejected(String),
    /// The session moved on, was reset or unmounted; the response was ignored.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLine {
    pub step: usize,
    pub label: &'static str,
    pub value: String,
}

pub struct WizardSession {
    id: Uuid,
    definition: Arc<WizardDefinition>,
    state: WizardState,
    mounted: bool,
    completed: bool,
    verification_generation: u64,
    awaiting: Option<VerificationTicket>,
}

impl WizardSession {
    pub fn new(definition: Arc<WizardDefinition>) -> Self {
        let fields = default_fields(&definition);
        let id = Uuid::new_v4();
        debug!(session = %id, wizard = definition.name, "wizard session created");
        Self {
            id,
            definition,
            state: WizardState {
                current_step: 1,
                fields,
                field_errors: FieldErrors::new(),
                global_error: None,
                status: WizardStatus::Idle,
            },
            mounted: true,
            completed: false,
            verification_generation: 0,
            awaiting: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn definition(&self) -> &WizardDefinition {
        &self.definition
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn current_step(&self) -> usize {
        self.state.current_step
    }

    pub fn total_steps(&self) -> usize {
        self.definition.total_steps()
    }

    pub fn is_last_step(&self) -> bool {
        self.state.current_step == self.total_steps()
    }

    pub fn step(&self) -> &StepDefinition {
        &self.definition.steps()[self.state.current_step - 1]
    }

    pub fn fields(&self) -> &FieldStore {
        &self.state.fields
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.state.field_errors
    }

    pub fn global_error(&self) -> Option<&str> {
        self.state.global_error.as_deref()
    }

    pub fn status(&self) -> WizardStatus {
        self.state.status
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn progress(&self) -> String {
        format!(
            "Step {} of {}: {}",
            self.state.current_step,
            self.total_steps(),
            self.step().title
        )
    }

    pub fn submit_control(&self) -> SubmitControl {
        let submitting = self.state.status == WizardStatus::Submitting;
        SubmitControl {
            enabled: !submitting && self.mounted && !self.completed && self.is_last_step(),
            label: if submitting {
                SUBMITTING_LABEL
            } else {
                SUBMIT_LABEL
            },
        }
    }

    /// Strength meter for a password field, computed from its current value.
    pub fn strength(&self, field: &str) -> PasswordStrength {
        PasswordStrength::of(self.state.fields.text(field))
    }

    /// Runs the current step's validator without changing any state.
    pub fn check_current_step(&self) -> ValidationResult {
        self.step().validator().validate(&self.state.fields)
    }

    pub fn go_to_next(&mut self) -> StepOutcome {
        if let Some(outcome) = self.navigation_guard() {
            return outcome;
        }
        let result = self.validate_current();
        if !result.valid {
            info!(
                session = %self.id,
                step = self.state.current_step,
                errors = result.field_errors.len(),
                "step validation failed"
            );
            self.apply_errors(&result);
            return StepOutcome::Blocked(result);
        }
        self.clear_errors();
        if self.is_last_step() {
            return StepOutcome::AtLastStep;
        }
        let from = self.state.current_step;
        self.state.current_step += 1;
        info!(session = %self.id, from, to = self.state.current_step, "wizard advanced");
        StepOutcome::Moved {
            from,
            to: self.state.current_step,
        }
    }

    pub fn go_to_previous(&mut self) -> StepOutcome {
        if let Some(outcome) = self.navigation_guard() {
            return outcome;
        }
        self.clear_errors();
        if self.state.current_step == 1 {
            return StepOutcome::AtFirstStep;
        }
        let from = self.state.current_step;
        self.state.current_step -= 1;
        info!(session = %self.id, from, to = self.state.current_step, "wizard moved back");
        StepOutcome::Moved {
            from,
            to: self.state.current_step,
        }
    }

    /// Applies a user edit to an editable field.
    pub fn update(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<()> {
        self.ensure_editable_state()?;
        let descriptor = self
            .definition
            .descriptor(name)
            .ok_or_else(|| WizardError::UnknownField(name.to_string()))?;
        if !descriptor.is_editable() {
            return Err(WizardError::ReadOnlyField(name.to_string()));
        }
        let value = descriptor.kind.coerce(name, value.into())?;
        let key = descriptor.key;
        self.write_field(key, value);
        Ok(())
    }

    /// Generates a password suggestion into the current step's suggestion slot.
    pub fn suggest_password<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        quotas: &SuggestionQuotas,
    ) -> Result<String> {
        self.ensure_editable_state()?;
        let slot = self
            .step()
            .suggestion_slot
            .ok_or(WizardError::NoSuggestionSlot {
                step: self.state.current_step,
            })?;
        let candidate = suggest_password(rng, quotas);
        self.write_field(slot, FieldValue::Text(candidate.clone()));
        Ok(candidate)
    }

    /// Clears every field and error and returns to step 1. Refused while a
    /// submission is in flight.
    pub fn reset(&mut self) -> Result<()> {
        if self.state.status == WizardStatus::Submitting {
            return Err(WizardError::SubmissionPending);
        }
        self.state = WizardState {
            current_step: 1,
            fields: default_fields(&self.definition),
            field_errors: FieldErrors::new(),
            global_error: None,
            status: WizardStatus::Idle,
        };
        self.completed = false;
        self.invalidate_verification();
        info!(session = %self.id, "wizard reset");
        Ok(())
    }

    /// Marks the session discarded. Late responses are ignored from now on.
    pub fn unmount(&mut self) {
        if self.mounted {
            self.mounted = false;
            self.invalidate_verification();
            debug!(session = %self.id, "wizard session unmounted");
        }
    }

    /// Prepares the current step's verification request.
    ///
    /// The step's input fields must be present and well-formed first.
    pub fn begin_verification(&mut self) -> Result<VerificationStart> {
        self.ensure_editable_state()?;
        let step = self.step();
        let spec = step
            .verification
            .clone()
            .ok_or(WizardError::NoVerification { step: step.index })?;
        let precheck = StepValidator::new(
            spec.inputs.clone(),
            step.rules
                .iter()
                .filter(|rule| spec.inputs.contains(&rule.field()))
                .filter(|rule| rule.category() == RuleCategory::Format)
                .cloned()
                .collect(),
        );
        let result = precheck.validate(&self.state.fields);
        if !result.valid {
            self.apply_errors(&result);
            return Ok(VerificationStart::Blocked(result));
        }

        self.verification_generation += 1;
        let ticket = VerificationTicket {
            session_id: self.id,
            step: self.state.current_step,
            generation: self.verification_generation,
        };
        self.awaiting = Some(ticket);
        let request = ActionRequest {
            action: spec.action.to_string(),
            session_id: self.id,
            payload: self.state.fields.payload(spec.inputs.iter().copied()),
        };
        info!(session = %self.id, action = spec.action, "verification requested");
        Ok(VerificationStart::Ready { request, ticket })
    }

    /// Merges a verification response if it still belongs to this session,
    /// step and the latest request.
    pub fn apply_verification(
        &mut self,
        ticket: VerificationTicket,
        response: ApiResponse,
    ) -> VerificationOutcome {
        let current = self.mounted && !self.completed && self.awaiting == Some(ticket);
        if !current || ticket.step != self.state.current_step {
            warn!(session = %self.id, step = ticket.step, "discarding stale verification response");
            return VerificationOutcome::Discarded;
        }
        self.awaiting = None;
        let Some(spec) = self.step().verification.clone() else {
            return VerificationOutcome::Discarded;
        };

        match response.into_result() {
            Ok(data) => {
                for (response_key, target) in &spec.autofill {
                    if let Some(value) = data
                        .as_ref()
                        .and_then(|data| data.get(*response_key))
                        .and_then(json_to_field)
                    {
                        self.write_field(*target, value);
                    }
                }
                if let Some(flag) = spec.verified_flag {
                    self.write_field(flag, FieldValue::Bool(true));
                }
                for input in &spec.inputs {
                    self.state.field_errors.clear_field(input);
                }
                self.state.global_error = None;
                info!(session = %self.id, action = spec.action, "verification merged");
                VerificationOutcome::Merged
            }
            Err(message) => {
                info!(session = %self.id, action = spec.action, %message, "verification rejected");
                self.state.global_error = Some(message.clone());
                VerificationOutcome::Rejected(message)
            }
        }
    }

    /// Re-validates the final step and, if it passes, enters `Submitting`.
    pub fn begin_submission(&mut self) -> std::result::Result<ActionRequest, SubmitBlocked> {
        if !self.mounted {
            return Err(SubmitBlocked::Inactive);
        }
        if self.completed {
            return Err(SubmitBlocked::Completed);
        }
        if self.state.status == WizardStatus::Submitting {
            return Err(SubmitBlocked::Pending);
        }
        if !self.is_last_step() {
            return Err(SubmitBlocked::NotOnFinalStep);
        }
        let result = self.validate_current();
        if !result.valid {
            self.apply_errors(&result);
            return Err(SubmitBlocked::Invalid(result));
        }
        self.clear_errors();
        self.state.status = WizardStatus::Submitting;
        let names: Vec<&str> = self
            .definition
            .fields()
            .filter(|field| field.is_visible())
            .map(|field| field.key)
            .collect();
        Ok(ActionRequest {
            action: self.definition.submit().action.to_string(),
            session_id: self.id,
            payload: self.state.fields.payload(names),
        })
    }

    /// True while a submission started by [`Self::begin_submission`] still
    /// owns this session and may apply its result.
    pub fn awaiting_submission(&self) -> bool {
        self.mounted && !self.completed && self.state.status == WizardStatus::Submitting
    }

    pub fn complete_submission(&mut self) {
        if !self.awaiting_submission() {
            warn!(session = %self.id, "ignoring completion without a pending submission");
            return;
        }
        self.state.status = WizardStatus::Idle;
        self.completed = true;
        self.invalidate_verification();
        info!(session = %self.id, wizard = self.definition.name, "wizard submitted");
    }

    pub fn fail_submission(&mut self, message: impl Into<String>) {
        if !self.awaiting_submission() {
            warn!(session = %self.id, "ignoring failure without a pending submission");
            return;
        }
        self.state.status = WizardStatus::Idle;
        self.state.global_error = Some(message.into());
    }

    /// Label/value lines for every displayed field, in step order.
    pub fn summary(&self) -> Vec<SummaryLine> {
        self.definition
            .steps()
            .iter()
            .flat_map(|step| {
                step.fields
                    .iter()
                    .filter(|field| field.is_visible())
                    .map(move |field| SummaryLine {
                        step: step.index,
                        label: field.label,
                        value: self.display_value(field),
                    })
            })
            .collect()
    }

    /// Display text for a field: secrets masked, unset values marked.
    pub fn display_value(&self, field: &FieldDescriptor) -> String {
        let value = self.state.fields.get(field.key);
        match (&field.kind, value) {
            (FieldKind::Checkbox, value) => {
                if value.map(FieldValue::as_bool).unwrap_or(false) {
                    "yes".into()
                } else {
                    "no".into()
                }
            }
            (_, None) => UNFILLED.into(),
            (_, Some(value)) if value.is_blank() => UNFILLED.into(),
            (FieldKind::Secret, Some(_)) => MASK.into(),
            (_, Some(value)) => value.to_string(),
        }
    }

    fn navigation_guard(&self) -> Option<StepOutcome> {
        if !self.mounted || self.completed {
            Some(StepOutcome::Inactive)
        } else if self.state.status == WizardStatus::Submitting {
            Some(StepOutcome::Busy)
        } else {
            None
        }
    }

    fn ensure_editable_state(&self) -> Result<()> {
        if !self.mounted || self.completed {
            return Err(WizardError::Inactive);
        }
        if self.state.status == WizardStatus::Submitting {
            return Err(WizardError::SubmissionPending);
        }
        Ok(())
    }

    fn validate_current(&mut self) -> ValidationResult {
        self.state.status = WizardStatus::Validating;
        let result = self.check_current_step();
        self.state.status = WizardStatus::Idle;
        result
    }

    fn apply_errors(&mut self, result: &ValidationResult) {
        self.state.field_errors = result.field_errors.clone();
        self.state.global_error = result.message.clone();
    }

    fn clear_errors(&mut self) {
        self.state.field_errors.clear();
        self.state.global_error = None;
    }

    fn invalidate_verification(&mut self) {
        self.verification_generation += 1;
        self.awaiting = None;
    }

    /// Stores a value, clears that field's error and the global error, then
    /// runs the derived rules sourced from it. Derived targets do not trigger
    /// further rules.
    fn write_field(&mut self, name: &'static str, value: FieldValue) {
        debug!(session = %self.id, field = name, "field updated");
        self.state.fields.insert(name, value);
        self.state.field_errors.clear_field(name);
        self.state.global_error = None;

        if self.awaits_input(name) {
            debug!(session = %self.id, field = name, "verification input changed");
            self.invalidate_verification();
        }

        let definition = Arc::clone(&self.definition);
        for rule in definition
            .derived_rules()
            .iter()
            .filter(|rule| rule.source == name)
        {
            if let Some(derived) = rule.evaluate(&self.state.fields) {
                self.state.fields.insert(rule.target, derived);
                self.state.field_errors.clear_field(rule.target);
            }
        }
    }

    fn awaits_input(&self, name: &str) -> bool {
        let Some(ticket) = self.awaiting else {
            return false;
        };
        self.definition
            .step(ticket.step)
            .and_then(|step| step.verification.as_ref())
            .map(|spec| spec.inputs.contains(&name))
            .unwrap_or(false)
    }
}

fn default_fields(definition: &WizardDefinition) -> FieldStore {
    let mut fields = FieldStore::new();
    for field in definition.fields() {
        fields.insert(field.key, field.kind.default_value());
    }
    fields
}

fn json_to_field(value: &Value) -> Option<FieldValue> {
    match value {
        Value::String(text) => Some(FieldValue::Text(text.clone())),
        Value::Bool(flag) => Some(FieldValue::Bool(*flag)),
        Value::Number(number) => number.as_f64().map(FieldValue::Number),
        _ => None,
    }
}
