use super::common::*;
use std::sync::Arc;

use crate::workflows::enrollment::navigation::{GateDecision, Identity, Step, StepGate};
use crate::workflows::enrollment::persistence::{keys, MemorySessionStore, SessionStore};

fn gate(identity: FixedIdentity) -> (StepGate<FixedIdentity, MemorySessionStore>, Arc<MemorySessionStore>) {
    let store = Arc::new(MemorySessionStore::new(QUOTA));
    (StepGate::new(Arc::new(identity), Arc::clone(&store)), store)
}

#[test]
fn anonymous_visitors_are_sent_to_sign_in() {
    let (gate, _) = gate(FixedIdentity(None));
    assert_eq!(gate.check(Step::SignIn), GateDecision::Allow);
    for step in [
        Step::ApplicationForm,
        Step::UploadDocuments,
        Step::Review,
        Step::Dashboard,
    ] {
        assert_eq!(gate.check(step), GateDecision::Redirect(Step::SignIn), "{step:?}");
    }
}

#[test]
fn unverified_accounts_are_treated_as_signed_out() {
    let (gate, _) = gate(FixedIdentity(Some(Identity {
        user_id: "learner-1".to_string(),
        email_verified: false,
    })));
    assert_eq!(
        gate.check(Step::ApplicationForm),
        GateDecision::Redirect(Step::SignIn)
    );
}

#[test]
fn later_steps_open_once_the_form_is_completed() {
    let (gate, store) = gate(FixedIdentity::verified("learner-1"));
    assert_eq!(gate.check(Step::ApplicationForm), GateDecision::Allow);
    assert_eq!(
        gate.check(Step::UploadDocuments),
        GateDecision::Redirect(Step::ApplicationForm)
    );
    assert_eq!(
        gate.check(Step::Dashboard),
        GateDecision::Redirect(Step::ApplicationForm)
    );

    store
        .set(keys::FORM_COMPLETED, "true".to_string())
        .expect("room in store");
    assert_eq!(gate.check(Step::UploadDocuments), GateDecision::Allow);
    assert_eq!(gate.check(Step::Review), GateDecision::Allow);
    assert_eq!(gate.check(Step::Dashboard), GateDecision::Redirect(Step::Review));

    store
        .set(keys::SUBMITTED_APPLICATION, "{}".to_string())
        .expect("room in store");
    assert_eq!(gate.check(Step::Dashboard), GateDecision::Allow);
}

#[test]
fn decisions_serialize_with_the_target_step() {
    let encoded = serde_json::to_value(GateDecision::Redirect(Step::Review)).expect("serializes");
    assert_eq!(encoded["decision"], "redirect");
    assert_eq!(encoded["step"], "review");
    assert_eq!(Step::Review.page(), "review.html");
}
