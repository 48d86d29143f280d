mod common;

use common::{Harness, RecordingDispatcher};
use rand::rngs::StdRng;
use rand::SeedableRng;
use wizard_core::config::SuggestionQuotas;
use wizard_core::wizard::{StepOutcome, SubmitOutcome, VerifyOutcome, WizardSession};

fn fill_administrator(session: &mut WizardSession) {
    session.update("first_name", "Ada").unwrap();
    session.update("last_name", "Obi").unwrap();
    session.update("admin_email", "ada@acme.test").unwrap();
    session.update("admin_phone", "08031234567").unwrap();
}

#[tokio::test]
async fn business_lookup_fills_an_editable_name() {
    let harness = Harness::new("tenant-signup", RecordingDispatcher::new());
    harness
        .session
        .lock()
        .await
        .update("rc_number", "1234567")
        .unwrap();

    let outcome = harness.gate.verify(&harness.session).await.expect("verify");
    assert_eq!(outcome, VerifyOutcome::Verified);

    let mut session = harness.session.lock().await;
    assert_eq!(session.fields().text("business_name"), "ACME LIMITED");
    session.update("business_name", "Acme Foods").unwrap();
    assert_eq!(session.fields().text("business_name"), "Acme Foods");
    assert_eq!(session.go_to_next(), StepOutcome::Moved { from: 1, to: 2 });
}

#[tokio::test]
async fn malformed_rc_number_blocks_the_lookup() {
    let harness = Harness::new("tenant-signup", RecordingDispatcher::new());
    harness
        .session
        .lock()
        .await
        .update("rc_number", "12")
        .unwrap();

    let outcome = harness.gate.verify(&harness.session).await.expect("verify");
    let VerifyOutcome::Invalid(result) = outcome else {
        panic!("lookup must not run");
    };
    assert!(result.field_errors.contains("rc_number"));
    assert!(harness.dispatcher.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn full_signup_submits_and_redirects_to_login() {
    let harness = Harness::new("tenant-signup", RecordingDispatcher::new());
    {
        let mut session = harness.session.lock().await;
        session.update("rc_number", "1234567").unwrap();
        session.update("business_name", "Acme Foods").unwrap();
        session.go_to_next();

        fill_administrator(&mut session);
        assert_eq!(session.fields().text("display_name"), "Ada Obi");
        session.go_to_next();

        let mut rng = StdRng::seed_from_u64(42);
        session
            .suggest_password(&mut rng, &SuggestionQuotas::default())
            .unwrap();
        session.update("use_suggestion", "yes").unwrap();
        assert_eq!(session.go_to_next(), StepOutcome::Moved { from: 3, to: 4 });

        session.update("accept_terms", "yes").unwrap();
    }

    let outcome = harness.gate.submit(&harness.session).await;
    assert!(matches!(outcome, SubmitOutcome::Submitted { .. }));
    harness.gate.timers().settle().await;
    assert_eq!(harness.navigator.destinations(), vec!["/login"]);

    let request = harness
        .dispatcher
        .requests()
        .into_iter()
        .find(|request| request.action == "register_tenant")
        .expect("submit request");
    assert_eq!(request.payload["display_name"], "Ada Obi");
    assert_eq!(request.payload["business_name"], "Acme Foods");
}

#[tokio::test]
async fn weak_password_is_rejected_by_strength_rule() {
    let harness = Harness::new("tenant-signup", RecordingDispatcher::new());
    let mut session = harness.session.lock().await;
    session.update("rc_number", "1234567").unwrap();
    session.update("business_name", "Acme Foods").unwrap();
    session.go_to_next();
    fill_administrator(&mut session);
    session.go_to_next();

    session.update("password", "password").unwrap();
    session.update("confirm_password", "password").unwrap();
    let StepOutcome::Blocked(result) = session.go_to_next() else {
        panic!("weak password must block");
    };
    assert_eq!(result.message.as_deref(), Some("Password is too weak"));
    assert!(result.field_errors.contains("password"));
}
