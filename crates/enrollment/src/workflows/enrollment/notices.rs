use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::documents::DocumentStatus;
use super::persistence::{keys, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    pub fn default_lifetime(self) -> Duration {
        match self {
            NoticeLevel::Warning => Duration::from_secs(12),
            NoticeLevel::Info | NoticeLevel::Success | NoticeLevel::Error => Duration::from_secs(8),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    /// `None` for notices that stay until dismissed.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Bounded FIFO of on-screen notices. Pushing beyond capacity evicts the oldest expiring
/// notice; persistent ones go only when nothing else is left.
#[derive(Debug, Clone)]
pub struct NoticeQueue {
    capacity: usize,
    notices: VecDeque<Notice>,
    next_id: u64,
}

impl NoticeQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            notices: VecDeque::with_capacity(capacity),
            next_id: 0,
        }
    }

    /// Push with the level's default lifetime.
    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>, now: DateTime<Utc>) -> u64 {
        self.push_for(level, message, level.default_lifetime(), now)
    }

    pub fn push_for(
        &mut self,
        level: NoticeLevel,
        message: impl Into<String>,
        lifetime: Duration,
        now: DateTime<Utc>,
    ) -> u64 {
        let expires_at = chrono::Duration::from_std(lifetime)
            .ok()
            .and_then(|lifetime| now.checked_add_signed(lifetime));
        self.enqueue(level, message.into(), expires_at)
    }

    pub fn push_persistent(&mut self, level: NoticeLevel, message: impl Into<String>) -> u64 {
        self.enqueue(level, message.into(), None)
    }

    fn enqueue(
        &mut self,
        level: NoticeLevel,
        message: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        if self.notices.len() == self.capacity {
            let victim = self
                .notices
                .iter()
                .position(|notice| notice.expires_at.is_some())
                .unwrap_or(0);
            if let Some(evicted) = self.notices.remove(victim) {
                debug!(id = evicted.id, "evicting notice");
            }
        }
        self.notices.push_back(Notice {
            id,
            level,
            message,
            expires_at,
        });
        id
    }

    /// Drop notices whose lifetime has elapsed, returning them.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Vec<Notice> {
        let (expired, live): (Vec<Notice>, Vec<Notice>) = self
            .notices
            .drain(..)
            .partition(|notice| notice.expires_at.is_some_and(|at| at <= now));
        self.notices = live.into();
        expired
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.notices.len();
        self.notices.retain(|notice| notice.id != id);
        self.notices.len() != before
    }

    pub fn active(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromptError {
    #[error("please wait {remaining_secs} more second(s) before continuing")]
    StillWaiting { remaining_secs: u64 },
}

/// Confirmation shown when continuing with mandatory documents missing. The proceed action is
/// locked until the mandatory wait has elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDocumentsPrompt {
    pub missing: Vec<String>,
    opened_at: DateTime<Utc>,
    wait: Duration,
}

impl MissingDocumentsPrompt {
    pub fn open(missing: Vec<String>, now: DateTime<Utc>, wait: Duration) -> Self {
        Self {
            missing,
            opened_at: now,
            wait,
        }
    }

    /// Whole seconds left before proceeding is allowed, rounded up.
    pub fn remaining_wait(&self, now: DateTime<Utc>) -> u64 {
        let elapsed = (now - self.opened_at).to_std().unwrap_or_default();
        let remaining = self.wait.saturating_sub(elapsed);
        remaining.as_millis().div_ceil(1000) as u64
    }

    /// Accept the prompt. With `skip_today` the prompt is suppressed for the rest of the day.
    pub fn proceed<S>(
        &self,
        now: DateTime<Utc>,
        skip_today: bool,
        store: &S,
    ) -> Result<(), PromptError>
    where
        S: SessionStore + ?Sized,
    {
        let remaining_secs = self.remaining_wait(now);
        if remaining_secs > 0 {
            return Err(PromptError::StillWaiting { remaining_secs });
        }
        if skip_today {
            let date = now.date_naive().to_string();
            let stored = store
                .set(keys::SKIP_DOCUMENT_WARNING, "true".to_string())
                .and_then(|()| store.set(keys::SKIP_DOCUMENT_WARNING_DATE, date));
            if let Err(err) = stored {
                warn!(error = %err, "could not store document warning preference");
            }
        }
        Ok(())
    }
}

pub fn warning_skipped_on<S>(store: &S, today: NaiveDate) -> bool
where
    S: SessionStore + ?Sized,
{
    let skip = matches!(store.get(keys::SKIP_DOCUMENT_WARNING), Ok(Some(flag)) if flag == "true");
    let date = store
        .get(keys::SKIP_DOCUMENT_WARNING_DATE)
        .ok()
        .flatten()
        .and_then(|raw| raw.parse::<NaiveDate>().ok());
    skip && date == Some(today)
}

/// What happens when the applicant leaves the upload step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContinueDecision {
    /// Nothing missing, or the applicant asked not to be warned again today.
    Proceed { incomplete: bool },
    Confirm(MissingDocumentsPrompt),
}

pub fn plan_continue<S>(
    status: &DocumentStatus,
    store: &S,
    now: DateTime<Utc>,
    wait: Duration,
) -> ContinueDecision
where
    S: SessionStore + ?Sized,
{
    if status.has_all_required {
        return ContinueDecision::Proceed { incomplete: false };
    }
    if warning_skipped_on(store, now.date_naive()) {
        return ContinueDecision::Proceed { incomplete: true };
    }
    ContinueDecision::Confirm(MissingDocumentsPrompt::open(
        status.pending_documents.clone(),
        now,
        wait,
    ))
}
