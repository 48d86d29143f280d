//! Drives the asynchronous side of a wizard: verification lookups and the
//! terminal submission, with the notifications and redirect that follow.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::wizard::dispatch::{ActionDispatcher, ApiResponse, UNEXPECTED_ERROR_MESSAGE};
use crate::wizard::notify::{Navigator, Notification, Notifier};
use crate::wizard::session::{
    SubmitBlocked, VerificationOutcome, VerificationStart, WizardSession,
};
use crate::wizard::timers::TimerRegistry;
use crate::wizard::validation::ValidationResult;

/// Session handle shared between the UI loop and in-flight requests.
pub type SharedSession = Arc<Mutex<WizardSession>>;

pub fn share(session: WizardSession) -> SharedSession {
    Arc::new(Mutex::new(session))
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Submitted { data: Option<Value> },
    Invalid(ValidationResult),
    /// A submission is already in flight; nothing was sent.
    AlreadyPending,
    NotOnFinalStep,
    /// The session was completed or unmounted before or during the request.
    Inactive,
    /// The backend refused or the dispatch failed; the message is on the session.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    Verified,
    Invalid(ValidationResult),
    Rejected(String),
    Discarded,
}

pub struct SubmissionGate {
    dispatcher: Arc<dyn ActionDispatcher>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    timers: TimerRegistry,
    redirect_delay: Duration,
}

impl SubmissionGate {
    pub fn new(
        dispatcher: Arc<dyn ActionDispatcher>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        redirect_delay: Duration,
    ) -> Self {
        Self {
            dispatcher,
            notifier,
            navigator,
            timers: TimerRegistry::new(),
            redirect_delay,
        }
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    /// Submits the wizard once. Concurrent calls while a request is in flight
    /// return [`SubmitOutcome::AlreadyPending`] without dispatching.
    pub async fn submit(&self, session: &SharedSession) -> SubmitOutcome {
        let request = {
            let mut guard = session.lock().await;
            match guard.begin_submission() {
                Ok(request) => request,
                Err(SubmitBlocked::Pending) => return SubmitOutcome::AlreadyPending,
                Err(SubmitBlocked::NotOnFinalStep) => return SubmitOutcome::NotOnFinalStep,
                Err(SubmitBlocked::Completed | SubmitBlocked::Inactive) => {
                    return SubmitOutcome::Inactive
                }
                Err(SubmitBlocked::Invalid(result)) => return SubmitOutcome::Invalid(result),
            }
        };
        let action = request.action.clone();
        info!(session = %request.session_id, %action, "submitting wizard");

        let response = self.dispatcher.dispatch(request).await;

        let mut guard = session.lock().await;
        if !guard.awaiting_submission() {
            warn!(session = %guard.id(), %action, "session left submission while request was in flight");
            return SubmitOutcome::Inactive;
        }
        let submit = guard.definition().submit().clone();
        match response.map(ApiResponse::into_result) {
            Ok(Ok(data)) => {
                guard.complete_submission();
                drop(guard);
                self.notifier.notify(Notification::success(
                    submit.success_title,
                    submit.success_description,
                ));
                let navigator = Arc::clone(&self.navigator);
                let destination = submit.redirect_to;
                self.timers.schedule(self.redirect_delay, move || {
                    navigator.navigate(destination);
                });
                SubmitOutcome::Submitted { data }
            }
            Ok(Err(message)) => {
                info!(session = %guard.id(), %action, %message, "submission rejected");
                guard.fail_submission(message.clone());
                drop(guard);
                self.notifier
                    .notify(Notification::error("Submission failed", message.clone()));
                SubmitOutcome::Failed(message)
            }
            Err(err) => {
                error!(session = %guard.id(), %action, error = %err, "submission dispatch failed");
                guard.fail_submission(UNEXPECTED_ERROR_MESSAGE);
                drop(guard);
                self.notifier.notify(Notification::error(
                    "Submission failed",
                    UNEXPECTED_ERROR_MESSAGE,
                ));
                SubmitOutcome::Failed(UNEXPECTED_ERROR_MESSAGE.to_string())
            }
        }
    }

    /// Runs the current step's verification lookup and merges the result if
    /// it is still relevant when it arrives.
    pub async fn verify(&self, session: &SharedSession) -> crate::errors::Result<VerifyOutcome> {
        let (request, ticket) = match session.lock().await.begin_verification()? {
            VerificationStart::Ready { request, ticket } => (request, ticket),
            VerificationStart::Blocked(result) => return Ok(VerifyOutcome::Invalid(result)),
        };
        let action = request.action.clone();

        let response = match self.dispatcher.dispatch(request).await {
            Ok(response) => response,
            Err(err) => {
                error!(%action, error = %err, "verification dispatch failed");
                ApiResponse::failure(UNEXPECTED_ERROR_MESSAGE)
            }
        };

        let outcome = session.lock().await.apply_verification(ticket, response);
        Ok(match outcome {
            VerificationOutcome::Merged => VerifyOutcome::Verified,
            VerificationOutcome::Rejected(message) => {
                self.notifier
                    .notify(Notification::error("Verification failed", message.clone()));
                VerifyOutcome::Rejected(message)
            }
            VerificationOutcome::Discarded => VerifyOutcome::Discarded,
        })
    }

    /// Unmounts the session and cancels any pending redirect.
    pub async fn teardown(&self, session: &SharedSession) {
        session.lock().await.unmount();
        self.timers.cancel_all();
    }
}
