#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;
use wizard_core::{
    config::WizardConfig,
    flows,
    wizard::{
        share, ActionDispatcher, ActionRequest, ApiResponse, DispatchError, Navigator,
        Notification, Notifier, SharedSession, SubmissionGate, WizardSession,
    },
};

pub const REDIRECT_DELAY: Duration = Duration::from_secs(2);

/// Dispatcher that records every request and answers from a per-action
/// script. After [`RecordingDispatcher::hold`], each call parks until
/// [`RecordingDispatcher::release`].
#[derive(Default)]
pub struct RecordingDispatcher {
    requests: Mutex<Vec<ActionRequest>>,
    responses: Mutex<HashMap<String, Result<ApiResponse, String>>>,
    holding: AtomicBool,
    gate: Notify,
    started: Notify,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        let dispatcher = Self::default();
        dispatcher.respond(
            "verify_identity",
            ApiResponse::ok(json!({ "account_name": "ADA OBI" })),
        );
        dispatcher.respond(
            "verify_business",
            ApiResponse::ok(json!({ "business_name": "ACME LIMITED" })),
        );
        dispatcher
    }

    pub fn hold(&self) {
        self.holding.store(true, Ordering::SeqCst);
    }

    pub fn respond(&self, action: &str, response: ApiResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(action.to_string(), Ok(response));
    }

    pub fn fail_transport(&self, action: &str, reason: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(action.to_string(), Err(reason.to_string()));
    }

    pub fn requests(&self) -> Vec<ActionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, action: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.action == action)
            .count()
    }

    /// Resolves once `count` calls in total have reached the dispatcher.
    pub async fn wait_for_requests(&self, count: usize) {
        loop {
            if self.requests.lock().unwrap().len() >= count {
                return;
            }
            self.started.notified().await;
        }
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl ActionDispatcher for RecordingDispatcher {
    async fn dispatch(&self, request: ActionRequest) -> Result<ApiResponse, DispatchError> {
        let action = request.action.clone();
        self.requests.lock().unwrap().push(request);
        self.started.notify_one();
        if self.holding.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
        let scripted = self.responses.lock().unwrap().get(&action).cloned();
        match scripted {
            Some(Ok(response)) => Ok(response),
            Some(Err(reason)) => Err(DispatchError::Transport(reason)),
            None => Ok(ApiResponse::ok(json!({}))),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    destinations: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn destinations(&self) -> Vec<String> {
        self.destinations.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, destination: &str) {
        self.destinations.lock().unwrap().push(destination.to_string());
    }
}

pub struct Harness {
    pub dispatcher: Arc<RecordingDispatcher>,
    pub notifier: Arc<RecordingNotifier>,
    pub navigator: Arc<RecordingNavigator>,
    pub gate: Arc<SubmissionGate>,
    pub session: SharedSession,
}

impl Harness {
    pub fn new(flow: &str, dispatcher: RecordingDispatcher) -> Self {
        let dispatcher = Arc::new(dispatcher);
        let notifier = Arc::new(RecordingNotifier::default());
        let navigator = Arc::new(RecordingNavigator::default());
        let gate = Arc::new(SubmissionGate::new(
            dispatcher.clone(),
            notifier.clone(),
            navigator.clone(),
            REDIRECT_DELAY,
        ));
        Self {
            dispatcher,
            notifier,
            navigator,
            gate,
            session: share(new_session(flow)),
        }
    }
}

pub fn new_session(flow: &str) -> WizardSession {
    let definition = flows::build(flow, &WizardConfig::default()).expect("flow builds");
    WizardSession::new(Arc::new(definition))
}

pub fn fill_bank_details(session: &mut WizardSession) {
    session.update("bank_code", "007").unwrap();
    session.update("account_number", "0123456789").unwrap();
}

pub fn fill_contact_details(session: &mut WizardSession) {
    session.update("contact_email", "ops@example.com").unwrap();
    session.update("contact_phone", "+234 803 123 4567").unwrap();
}

/// Drives the settlement-bank wizard to its consent step with every
/// earlier step valid and the BVN verified.
pub async fn settlement_at_final_step(harness: &Harness) {
    {
        let mut session = harness.session.lock().await;
        fill_bank_details(&mut session);
        session.go_to_next();
        session.update("bvn", "12345678901").unwrap();
    }
    harness.gate.verify(&harness.session).await.expect("verify");
    let mut session = harness.session.lock().await;
    session.go_to_next();
    fill_contact_details(&mut session);
    session.go_to_next();
    session.update("accept_terms", true).unwrap();
    assert_eq!(session.current_step(), 4);
}
