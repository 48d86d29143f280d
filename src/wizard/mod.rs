//! Multi-step form engine.

pub mod derived;
pub mod dispatch;
pub mod gate;
pub mod notify;
pub mod session;
pub mod step;
pub mod timers;
pub mod validation;
pub mod value;

pub use derived::{
    bank_codes, bank_name, password_strength, suggest_password, DerivedRule, PasswordStrength,
    StrengthColor, StrengthLevel,
};
pub use dispatch::{
    ActionDispatcher, ActionRequest, ApiResponse, DispatchError, UNEXPECTED_ERROR_MESSAGE,
};
pub use gate::{share, SharedSession, SubmissionGate, SubmitOutcome, VerifyOutcome};
pub use notify::{Navigator, Notification, NotificationKind, Notifier};
pub use session::{
    StepOutcome, SubmitBlocked, SubmitControl, SummaryLine, VerificationOutcome,
    VerificationStart, VerificationTicket, WizardSession, WizardState, WizardStatus,
};
pub use step::{
    FieldAccess, FieldDescriptor, StepDefinition, SubmitSpec, VerificationSpec,
    WizardDefinition,
};
pub use timers::TimerRegistry;
pub use validation::{FieldErrors, Rule, RuleCategory, StepValidator, ValidationResult};
pub use value::{FieldKind, FieldStore, FieldValue};
