mod common;

use std::time::Duration;

use common::{settlement_at_final_step, Harness, RecordingDispatcher, REDIRECT_DELAY};
use wizard_core::errors::WizardError;
use wizard_core::wizard::{
    ApiResponse, NotificationKind, StepOutcome, SubmitOutcome, VerifyOutcome, WizardStatus,
    UNEXPECTED_ERROR_MESSAGE,
};

const SUBMIT_ACTION: &str = "register_settlement_bank";

#[tokio::test(start_paused = true)]
async fn successful_submission_notifies_then_redirects_after_delay() {
    let harness = Harness::new("settlement-bank", RecordingDispatcher::new());
    settlement_at_final_step(&harness).await;

    let outcome = harness.gate.submit(&harness.session).await;
    assert!(matches!(outcome, SubmitOutcome::Submitted { .. }));

    let notifications = harness.notifier.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Success);
    assert_eq!(notifications[0].title, "Settlement bank added");
    assert!(harness.navigator.destinations().is_empty());

    tokio::time::sleep(REDIRECT_DELAY - Duration::from_millis(1)).await;
    assert!(harness.navigator.destinations().is_empty());

    harness.gate.timers().settle().await;
    assert_eq!(harness.navigator.destinations(), vec!["/settlement-banks"]);

    let session = harness.session.lock().await;
    assert!(session.is_completed());
    assert_eq!(session.status(), WizardStatus::Idle);
}

#[tokio::test]
async fn payload_carries_visible_fields_only() {
    let harness = Harness::new("settlement-bank", RecordingDispatcher::new());
    settlement_at_final_step(&harness).await;
    harness.gate.submit(&harness.session).await;

    let requests = harness.dispatcher.requests();
    let submit = requests
        .iter()
        .find(|request| request.action == SUBMIT_ACTION)
        .expect("submit request");
    assert_eq!(submit.payload["bank_name"], "FCMB");
    assert_eq!(submit.payload["account_name"], "ADA OBI");
    assert_eq!(submit.payload["accept_terms"], true);
    assert!(!submit.payload.contains_key("bvn_verified"));
}

#[tokio::test]
async fn duplicate_submit_while_pending_dispatches_once() {
    let harness = Harness::new("settlement-bank", RecordingDispatcher::new());
    settlement_at_final_step(&harness).await;
    harness.dispatcher.hold();

    let gate = harness.gate.clone();
    let session = harness.session.clone();
    let first = tokio::spawn(async move { gate.submit(&session).await });
    harness.dispatcher.wait_for_requests(2).await;

    {
        let session = harness.session.lock().await;
        assert_eq!(session.status(), WizardStatus::Submitting);
        assert!(!session.submit_control().enabled);
        assert_eq!(session.submit_control().label, "Submitting...");
    }
    let second = harness.gate.submit(&harness.session).await;
    assert_eq!(second, SubmitOutcome::AlreadyPending);

    harness.dispatcher.release();
    let first = first.await.expect("submit task");
    assert!(matches!(first, SubmitOutcome::Submitted { .. }));
    assert_eq!(harness.dispatcher.count(SUBMIT_ACTION), 1);
}

#[tokio::test]
async fn backend_failure_shows_server_message_and_allows_retry() {
    let harness = Harness::new("settlement-bank", RecordingDispatcher::new());
    settlement_at_final_step(&harness).await;
    harness
        .dispatcher
        .respond(SUBMIT_ACTION, ApiResponse::failure("Bank already registered"));

    let outcome = harness.gate.submit(&harness.session).await;
    assert_eq!(outcome, SubmitOutcome::Failed("Bank already registered".into()));

    let notifications = harness.notifier.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Error);
    assert_eq!(notifications[0].description, "Bank already registered");
    {
        let session = harness.session.lock().await;
        assert_eq!(session.status(), WizardStatus::Idle);
        assert_eq!(session.global_error(), Some("Bank already registered"));
        assert_eq!(session.fields().text("account_number"), "0123456789");
        assert!(session.submit_control().enabled);
    }
    assert!(harness.navigator.destinations().is_empty());

    harness
        .dispatcher
        .respond(SUBMIT_ACTION, ApiResponse::ok_empty());
    let retry = harness.gate.submit(&harness.session).await;
    assert!(matches!(retry, SubmitOutcome::Submitted { .. }));
    assert_eq!(harness.dispatcher.count(SUBMIT_ACTION), 2);
}

#[tokio::test]
async fn transport_errors_surface_generic_message() {
    let harness = Harness::new("settlement-bank", RecordingDispatcher::new());
    settlement_at_final_step(&harness).await;
    harness
        .dispatcher
        .fail_transport(SUBMIT_ACTION, "connection reset by peer");

    let outcome = harness.gate.submit(&harness.session).await;
    assert_eq!(outcome, SubmitOutcome::Failed(UNEXPECTED_ERROR_MESSAGE.into()));
    let session = harness.session.lock().await;
    assert_eq!(session.global_error(), Some(UNEXPECTED_ERROR_MESSAGE));
    assert_eq!(session.status(), WizardStatus::Idle);
}

#[tokio::test]
async fn invalid_final_step_blocks_submission_without_dispatch() {
    let harness = Harness::new("settlement-bank", RecordingDispatcher::new());
    settlement_at_final_step(&harness).await;
    harness
        .session
        .lock()
        .await
        .update("accept_terms", false)
        .unwrap();

    let outcome = harness.gate.submit(&harness.session).await;
    assert!(matches!(outcome, SubmitOutcome::Invalid(_)));
    assert_eq!(harness.dispatcher.count(SUBMIT_ACTION), 0);
    assert!(harness
        .session
        .lock()
        .await
        .field_errors()
        .contains("accept_terms"));
}

#[tokio::test]
async fn submit_before_final_step_is_refused() {
    let harness = Harness::new("settlement-bank", RecordingDispatcher::new());
    let outcome = harness.gate.submit(&harness.session).await;
    assert_eq!(outcome, SubmitOutcome::NotOnFinalStep);
    assert!(harness.dispatcher.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn teardown_cancels_pending_redirect() {
    let harness = Harness::new("settlement-bank", RecordingDispatcher::new());
    settlement_at_final_step(&harness).await;
    harness.gate.submit(&harness.session).await;
    assert_eq!(harness.gate.timers().pending(), 1);

    harness.gate.teardown(&harness.session).await;
    tokio::time::sleep(REDIRECT_DELAY * 3).await;

    assert!(harness.navigator.destinations().is_empty());
    assert_eq!(harness.gate.timers().pending(), 0);
}

#[tokio::test]
async fn unmount_during_submission_drops_the_result() {
    let harness = Harness::new("settlement-bank", RecordingDispatcher::new());
    settlement_at_final_step(&harness).await;
    harness.dispatcher.hold();

    let gate = harness.gate.clone();
    let session = harness.session.clone();
    let pending = tokio::spawn(async move { gate.submit(&session).await });
    harness.dispatcher.wait_for_requests(2).await;

    harness.gate.teardown(&harness.session).await;
    harness.dispatcher.release();

    assert_eq!(pending.await.expect("submit task"), SubmitOutcome::Inactive);
    assert!(harness.notifier.notifications().is_empty());
    assert_eq!(harness.gate.timers().pending(), 0);
}

#[tokio::test]
async fn stale_verification_response_is_ignored() {
    let harness = Harness::new("settlement-bank", RecordingDispatcher::new());
    {
        let mut session = harness.session.lock().await;
        common::fill_bank_details(&mut session);
        session.go_to_next();
        session.update("bvn", "12345678901").unwrap();
    }
    harness.dispatcher.hold();

    let gate = harness.gate.clone();
    let session = harness.session.clone();
    let pending = tokio::spawn(async move { gate.verify(&session).await });
    harness.dispatcher.wait_for_requests(1).await;

    harness
        .session
        .lock()
        .await
        .update("bvn", "10987654321")
        .unwrap();
    harness.dispatcher.release();

    let outcome = pending.await.expect("verify task").expect("verify");
    assert_eq!(outcome, VerifyOutcome::Discarded);
    let session = harness.session.lock().await;
    assert_eq!(session.fields().text("account_name"), "");
    assert!(!session.fields().flag("bvn_verified"));
}

#[tokio::test]
async fn rejected_verification_notifies_and_blocks_progress() {
    let harness = Harness::new("settlement-bank", RecordingDispatcher::new());
    harness.dispatcher.respond(
        "verify_identity",
        ApiResponse::failure("We could not verify this BVN"),
    );
    {
        let mut session = harness.session.lock().await;
        common::fill_bank_details(&mut session);
        session.go_to_next();
        session.update("bvn", "12345678901").unwrap();
    }

    let outcome = harness.gate.verify(&harness.session).await.expect("verify");
    assert_eq!(
        outcome,
        VerifyOutcome::Rejected("We could not verify this BVN".into())
    );
    assert_eq!(harness.notifier.notifications()[0].kind, NotificationKind::Error);

    let mut session = harness.session.lock().await;
    session.go_to_next();
    assert_eq!(session.current_step(), 2);
    assert_eq!(session.global_error(), Some("Verify the BVN before continuing"));
}

#[tokio::test]
async fn reset_is_refused_while_submission_is_in_flight() {
    let harness = Harness::new("settlement-bank", RecordingDispatcher::new());
    settlement_at_final_step(&harness).await;
    harness.dispatcher.hold();

    let gate = harness.gate.clone();
    let session = harness.session.clone();
    let pending = tokio::spawn(async move { gate.submit(&session).await });
    harness.dispatcher.wait_for_requests(2).await;

    {
        let mut session = harness.session.lock().await;
        assert!(matches!(
            session.reset(),
            Err(WizardError::SubmissionPending)
        ));
        assert_eq!(session.current_step(), 4);
        assert_eq!(session.status(), WizardStatus::Submitting);
    }
    harness.dispatcher.release();

    let outcome = pending.await.expect("submit task");
    assert!(matches!(outcome, SubmitOutcome::Submitted { .. }));
    assert_eq!(harness.notifier.notifications().len(), 1);
    assert!(harness.session.lock().await.is_completed());
}

#[tokio::test]
async fn reset_after_failed_submission_starts_a_usable_wizard() {
    let harness = Harness::new("settlement-bank", RecordingDispatcher::new());
    settlement_at_final_step(&harness).await;
    harness
        .dispatcher
        .respond(SUBMIT_ACTION, ApiResponse::failure("Bank already registered"));
    harness.gate.submit(&harness.session).await;

    let mut session = harness.session.lock().await;
    session.reset().expect("reset after failure");
    assert_eq!(session.current_step(), 1);
    assert!(!session.is_completed());
    common::fill_bank_details(&mut session);
    assert_eq!(session.go_to_next(), StepOutcome::Moved { from: 1, to: 2 });
}

#[tokio::test]
async fn account_number_edit_during_verification_discards_the_response() {
    let harness = Harness::new("settlement-bank", RecordingDispatcher::new());
    {
        let mut session = harness.session.lock().await;
        common::fill_bank_details(&mut session);
        session.go_to_next();
        session.update("bvn", "12345678901").unwrap();
    }
    harness.dispatcher.hold();

    let gate = harness.gate.clone();
    let session = harness.session.clone();
    let pending = tokio::spawn(async move { gate.verify(&session).await });
    harness.dispatcher.wait_for_requests(1).await;

    harness
        .session
        .lock()
        .await
        .update("account_number", "9999999999")
        .unwrap();
    harness.dispatcher.release();

    let outcome = pending.await.expect("verify task").expect("verify");
    assert_eq!(outcome, VerifyOutcome::Discarded);
    let session = harness.session.lock().await;
    assert!(!session.fields().flag("bvn_verified"));
    assert_eq!(session.fields().text("account_name"), "");
}

#[tokio::test]
async fn bank_change_after_verification_requires_a_new_lookup() {
    let harness = Harness::new("settlement-bank", RecordingDispatcher::new());
    {
        let mut session = harness.session.lock().await;
        common::fill_bank_details(&mut session);
        session.go_to_next();
        session.update("bvn", "12345678901").unwrap();
    }
    let outcome = harness.gate.verify(&harness.session).await.expect("verify");
    assert_eq!(outcome, VerifyOutcome::Verified);

    let mut session = harness.session.lock().await;
    assert!(session.fields().flag("bvn_verified"));
    session.go_to_previous();
    session.update("bank_code", "044").unwrap();
    assert!(!session.fields().flag("bvn_verified"));
    assert_eq!(session.fields().text("account_name"), "");

    assert_eq!(session.go_to_next(), StepOutcome::Moved { from: 1, to: 2 });
    let StepOutcome::Blocked(result) = session.go_to_next() else {
        panic!("stale verification must not carry over");
    };
    assert_eq!(
        result.message.as_deref(),
        Some("Verify the BVN before continuing")
    );
}
