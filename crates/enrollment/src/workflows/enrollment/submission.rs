use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::dashboard::DashboardView;
use super::documents::{DocumentSlotId, DocumentStatus};
use super::persistence::state_store::{read_json, remove_key, write_json};
use super::persistence::{keys, PersistedFormSnapshot, SessionStore};
use super::review::ReviewProgress;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    PendingReview,
    UnderReview,
    DocumentsPending,
    Approved,
    Rejected,
    Enrolled,
}

impl SubmissionStatus {
    /// Dashboard wording. A fresh submission already reads as under review.
    pub const fn label(self) -> &'static str {
        match self {
            Self::PendingReview | Self::UnderReview => "Under Review",
            Self::DocumentsPending => "Documents Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Enrolled => "Enrolled",
        }
    }
}

/// Terminal record of an application, mirrored to the session and the document database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedApplication {
    pub reference_number: String,
    pub application_data: PersistedFormSnapshot,
    pub document_status: Option<DocumentStatus>,
    pub submitted_at: DateTime<Utc>,
    pub status: SubmissionStatus,
}

/// Remote document database holding submitted applications.
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    async fn insert(
        &self,
        user_id: &str,
        application: SubmittedApplication,
    ) -> Result<(), RepositoryError>;
    async fn latest_for(&self, user_id: &str)
        -> Result<Option<SubmittedApplication>, RepositoryError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("application '{0}' already exists")]
    Conflict(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("the application form has not been completed")]
    FormIncomplete,
    #[error("the terms and conditions have not been accepted")]
    TermsNotAccepted,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

static REFERENCE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_reference_number(year: i32) -> String {
    let sequence = REFERENCE_SEQUENCE.fetch_add(1, Ordering::Relaxed) % 100_000;
    format!("VPES-{year}-{sequence:05}")
}

/// Returned by [`SubmissionService::submit`]. Dropping `remote_write` leaves the database
/// write running in the background.
#[derive(Debug)]
pub struct SubmissionReceipt {
    pub application: SubmittedApplication,
    pub remote_write: JoinHandle<()>,
}

pub struct SubmissionService<R, S> {
    repository: Arc<R>,
    store: Arc<S>,
}

impl<R, S> SubmissionService<R, S>
where
    R: ApplicationRepository + 'static,
    S: SessionStore,
{
    pub fn new(repository: Arc<R>, store: Arc<S>) -> Self {
        Self { repository, store }
    }

    /// Issue a reference number and record the application. Must be called inside a tokio
    /// runtime; the database write is spawned and its failure only logged.
    pub fn submit(
        &self,
        user_id: &str,
        snapshot: PersistedFormSnapshot,
        documents: Option<DocumentStatus>,
        progress: ReviewProgress,
        now: DateTime<Utc>,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        if !progress.form_completed {
            return Err(SubmissionError::FormIncomplete);
        }
        if !progress.terms_accepted {
            return Err(SubmissionError::TermsNotAccepted);
        }

        let application = SubmittedApplication {
            reference_number: next_reference_number(now.year()),
            application_data: snapshot,
            document_status: documents,
            submitted_at: now,
            status: SubmissionStatus::PendingReview,
        };

        let local = write_json(
            self.store.as_ref(),
            keys::SUBMITTED_APPLICATION,
            &application,
        );
        info!(
            reference = %application.reference_number,
            persisted = local.is_persisted(),
            "application submitted"
        );

        let repository = Arc::clone(&self.repository);
        let owner = user_id.to_string();
        let record = application.clone();
        let remote_write = tokio::spawn(async move {
            let reference = record.reference_number.clone();
            if let Err(err) = repository.insert(&owner, record).await {
                warn!(reference = %reference, error = %err, "remote application write failed");
            }
        });

        Ok(SubmissionReceipt {
            application,
            remote_write,
        })
    }

    /// The session copy wins; the document database is the fallback.
    pub async fn load_submission(
        &self,
        user_id: &str,
    ) -> Result<Option<SubmittedApplication>, SubmissionError> {
        if let Some(application) =
            read_json::<_, SubmittedApplication>(self.store.as_ref(), keys::SUBMITTED_APPLICATION)
        {
            return Ok(Some(application));
        }
        Ok(self.repository.latest_for(user_id).await?)
    }

    pub async fn dashboard(
        &self,
        user_id: &str,
    ) -> Result<Option<DashboardView>, SubmissionError> {
        let view = self
            .load_submission(user_id)
            .await?
            .map(|application| DashboardView::project(&application));
        Ok(view)
    }

    /// Remove form progress once the dashboard has the submission.
    pub fn clear_application_data(&self) {
        let store = self.store.as_ref();
        for key in [
            keys::FORM_DATA,
            keys::DOCUMENT_STATUS,
            keys::FORM_COMPLETED,
            keys::DOCUMENTS_UPLOADED,
        ] {
            remove_key(store, key);
        }
        for slot in DocumentSlotId::all() {
            remove_key(store, &keys::document(slot.id()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_numbers_are_year_scoped_and_padded() {
        let reference = next_reference_number(2026);
        assert!(reference.starts_with("VPES-2026-"));
        assert_eq!(reference.len(), "VPES-2026-00001".len());
    }

    #[test]
    fn statuses_use_the_repository_spelling() {
        let status: SubmissionStatus =
            serde_json::from_str("\"DOCUMENTS_PENDING\"").expect("known status");
        assert_eq!(status, SubmissionStatus::DocumentsPending);
        assert_eq!(
            serde_json::to_string(&SubmissionStatus::Approved).expect("encodes"),
            "\"APPROVED\""
        );
        assert_eq!(SubmissionStatus::PendingReview.label(), "Under Review");
        assert_eq!(SubmissionStatus::Rejected.label(), "Rejected");
    }
}
