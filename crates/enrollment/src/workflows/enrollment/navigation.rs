use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::persistence::{keys, SessionStore};

/// Pages of the enrollment flow, in the order an applicant visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    SignIn,
    ApplicationForm,
    UploadDocuments,
    Review,
    Dashboard,
}

impl Step {
    pub const fn page(self) -> &'static str {
        match self {
            Step::SignIn => "login.html",
            Step::ApplicationForm => "applicationform.html",
            Step::UploadDocuments => "uploadDocument.html",
            Step::Review => "review.html",
            Step::Dashboard => "studentDashboard.html",
        }
    }
}

/// The signed-in account as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email_verified: bool,
}

/// Third-party authentication, consumed only for who is signed in and whether they verified
/// their e-mail address.
pub trait IdentityProvider: Send + Sync {
    fn current_user(&self) -> Option<Identity>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "step", rename_all = "snake_case")]
pub enum GateDecision {
    Allow,
    Redirect(Step),
}

/// Decides whether a step may be entered given identity and session progress.
pub struct StepGate<I, S> {
    identity: Arc<I>,
    store: Arc<S>,
}

impl<I, S> StepGate<I, S>
where
    I: IdentityProvider,
    S: SessionStore,
{
    pub fn new(identity: Arc<I>, store: Arc<S>) -> Self {
        Self { identity, store }
    }

    fn flag(&self, key: &str) -> bool {
        matches!(self.store.get(key), Ok(Some(value)) if value == "true")
    }

    fn has_submission(&self) -> bool {
        matches!(self.store.get(keys::SUBMITTED_APPLICATION), Ok(Some(_)))
    }

    pub fn check(&self, step: Step) -> GateDecision {
        if step == Step::SignIn {
            return GateDecision::Allow;
        }

        let signed_in = self
            .identity
            .current_user()
            .is_some_and(|user| user.email_verified);
        if !signed_in {
            debug!(step = ?step, "sign-in required");
            return GateDecision::Redirect(Step::SignIn);
        }

        let form_completed = self.flag(keys::FORM_COMPLETED);
        let decision = match step {
            Step::SignIn | Step::ApplicationForm => GateDecision::Allow,
            Step::UploadDocuments | Step::Review if form_completed => GateDecision::Allow,
            Step::UploadDocuments | Step::Review => GateDecision::Redirect(Step::ApplicationForm),
            Step::Dashboard if self.has_submission() => GateDecision::Allow,
            Step::Dashboard if form_completed => GateDecision::Redirect(Step::Review),
            Step::Dashboard => GateDecision::Redirect(Step::ApplicationForm),
        };
        debug!(step = ?step, decision = ?decision, "step gate");
        decision
    }
}
