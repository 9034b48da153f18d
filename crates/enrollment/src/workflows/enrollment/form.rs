//! The application-form controller.
//!
//! [`EnrollmentForm`] owns the [`FormSession`] and is its only writer. Every change runs the
//! same pipeline: write the value (cascading location selects when needed), re-evaluate the
//! conditional groups it controls, then persist immediately or after the free-text quiet
//! period.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::FormConfig;

use super::conditional::{ConditionalFieldController, GroupChange};
use super::domain::{AddressError, AddressKind, FieldKey, FieldValue};
use super::location::{LoadOutcome, LocationHierarchyResolver, LocationLookup};
use super::notices::{NoticeLevel, NoticeQueue};
use super::persistence::{
    FormStateStore, PersistedFormSnapshot, SaveDecision, SaveOutcome, SaveScheduler, SessionStore,
};
use super::registry;
use super::session::{FieldError, FormSession};
use super::validation::{FormReport, FormValidator};

pub const STORAGE_WARNING: &str =
    "Your progress is being kept in this page only and may not persist if you leave the site (browser storage is full)";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error(transparent)]
    Address(#[from] AddressError),
}

/// What a single change did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdate {
    pub groups: Vec<GroupChange>,
    pub loads: Vec<LoadOutcome>,
    /// `Some` when the change was saved right away.
    pub saved: Option<SaveOutcome>,
}

/// Per-chain lookup outcomes and group changes produced by a restore.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: bool,
    pub groups: Vec<GroupChange>,
    pub chains: Vec<(AddressKind, Vec<LoadOutcome>)>,
}

/// Rebuild presentation state from a snapshot without touching the location registry.
pub fn hydrate(
    snapshot: &PersistedFormSnapshot,
    controller: &ConditionalFieldController,
) -> FormSession {
    let mut session = FormSession::new();
    session.replace_values(snapshot.restored_values());
    controller.evaluate_all(&mut session);
    session
}

pub struct EnrollmentForm<L, S> {
    session: FormSession,
    controller: ConditionalFieldController,
    validator: FormValidator,
    resolver: Arc<LocationHierarchyResolver<L>>,
    state_store: FormStateStore<S>,
    scheduler: SaveScheduler,
    notices: NoticeQueue,
    memory_only: bool,
}

impl<L, S> EnrollmentForm<L, S>
where
    L: LocationLookup,
    S: SessionStore,
{
    pub fn new(
        resolver: Arc<LocationHierarchyResolver<L>>,
        store: Arc<S>,
        config: &FormConfig,
    ) -> Self {
        Self {
            session: FormSession::new(),
            controller: ConditionalFieldController::new(),
            validator: FormValidator::new(),
            resolver,
            state_store: FormStateStore::new(store),
            scheduler: SaveScheduler::new(config.text_save_delay),
            notices: NoticeQueue::new(config.notice_capacity),
            memory_only: false,
        }
    }

    /// Render only the given fields; the rest are treated as not applicable.
    pub fn with_layout<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = FieldKey>,
    {
        self.session = FormSession::with_layout(fields);
        self
    }

    pub fn with_controller(mut self, controller: ConditionalFieldController) -> Self {
        self.controller = controller;
        self
    }

    pub fn session(&self) -> &FormSession {
        &self.session
    }

    pub fn notices(&self) -> &NoticeQueue {
        &self.notices
    }

    pub fn notices_mut(&mut self) -> &mut NoticeQueue {
        &mut self.notices
    }

    pub fn state_store(&self) -> &FormStateStore<S> {
        &self.state_store
    }

    pub fn pending_save(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    pub fn snapshot(&self) -> PersistedFormSnapshot {
        PersistedFormSnapshot::capture(&self.session, Utc::now())
    }

    /// Enter the form step: restore a saved snapshot, or load the first level of every chain.
    pub async fn open(&mut self) -> RestoreReport {
        match self.state_store.load() {
            Some(snapshot) => self.restore(&snapshot).await,
            None => {
                let groups = self.controller.evaluate_all(&mut self.session);
                let chains = self.resolve_all_chains().await;
                RestoreReport {
                    restored: false,
                    groups,
                    chains,
                }
            }
        }
    }

    /// Restore in a fixed order: values verbatim, conditional groups, address chains, then the
    /// same-address copy once the current address has settled. Running it twice with the same
    /// snapshot yields the same visible state.
    pub async fn restore(&mut self, snapshot: &PersistedFormSnapshot) -> RestoreReport {
        let mut values = snapshot.restored_values();
        values.remove(&FieldKey::SameAddress);
        self.session.replace_values(values);

        let mut groups = self.controller.evaluate_all(&mut self.session);
        let mut chains = self.resolve_all_chains().await;

        if snapshot.same_address && self.session.is_rendered(FieldKey::SameAddress) {
            self.session
                .write_value(FieldKey::SameAddress, FieldValue::text("true"));
            let changes = self
                .controller
                .evaluate(&mut self.session, FieldKey::SameAddress);
            for change in &changes {
                if change.needs_permanent_resolution() {
                    let outcomes = self.resolve_chain(AddressKind::Permanent).await;
                    chains.push((AddressKind::Permanent, outcomes));
                }
            }
            groups.extend(changes);
        }

        info!(
            fields = self.session.values().len(),
            same_address = snapshot.same_address,
            "form restored"
        );
        RestoreReport {
            restored: true,
            groups,
            chains,
        }
    }

    async fn resolve_all_chains(&mut self) -> Vec<(AddressKind, Vec<LoadOutcome>)> {
        let [birth, current, permanent] =
            AddressKind::all().map(|kind| self.session.plan_chain(kind));
        let resolver = &self.resolver;
        let (birth, current, permanent) = tokio::join!(
            resolver.resolve_chain(birth),
            resolver.resolve_chain(current),
            resolver.resolve_chain(permanent),
        );

        [birth, current, permanent]
            .into_iter()
            .map(|resolution| {
                let kind = resolution.kind;
                (kind, self.session.apply_chain(resolution))
            })
            .collect()
    }

    async fn resolve_chain(&mut self, kind: AddressKind) -> Vec<LoadOutcome> {
        let plan = self.session.plan_chain(kind);
        let resolution = self.resolver.resolve_chain(plan).await;
        self.session.apply_chain(resolution)
    }

    /// Apply one user change.
    pub async fn set_field(
        &mut self,
        key: FieldKey,
        value: FieldValue,
    ) -> Result<FieldUpdate, FormError> {
        let mut loads = Vec::new();

        match AddressKind::locate(key) {
            Some((kind, level)) => {
                let code = value.as_text().ok_or(FieldError::ExpectsText(key))?;
                let ticket = self.session.select_location(kind, level, Some(code))?;
                loads.extend(self.resolver.follow(&mut self.session, ticket).await);
            }
            None => self.session.set_value(key, value)?,
        }

        let groups = self.controller.evaluate(&mut self.session, key);
        for change in &groups {
            if change.needs_permanent_resolution() {
                loads.extend(self.resolve_chain(AddressKind::Permanent).await);
            }
        }

        let policy = registry::spec(key).kind.save_policy();
        let saved = match self.scheduler.record(policy, Instant::now()) {
            SaveDecision::SaveNow => Some(self.persist()),
            SaveDecision::Deferred { deadline } => {
                debug!(field = %key, ?deadline, "save deferred");
                None
            }
        };

        Ok(FieldUpdate {
            groups,
            loads,
            saved,
        })
    }

    /// Save if the free-text quiet period has elapsed by `now`.
    pub fn poll_save(&mut self, now: Instant) -> Option<SaveOutcome> {
        if self.scheduler.take_due(now) {
            Some(self.persist())
        } else {
            None
        }
    }

    /// Wait out a pending quiet period, then save.
    pub async fn settle(&mut self) -> Option<SaveOutcome> {
        let deadline = self.scheduler.deadline()?;
        tokio::time::sleep_until(deadline).await;
        self.poll_save(deadline)
    }

    /// Save now, dropping any pending debounce.
    pub fn flush(&mut self) -> SaveOutcome {
        self.scheduler.cancel();
        self.persist()
    }

    fn persist(&mut self) -> SaveOutcome {
        let snapshot = PersistedFormSnapshot::capture(&self.session, Utc::now());
        let outcome = self.state_store.save(&snapshot);
        match (&outcome, self.memory_only) {
            (SaveOutcome::MemoryOnly(_), false) => {
                self.memory_only = true;
                self.notices
                    .push_persistent(NoticeLevel::Warning, STORAGE_WARNING);
            }
            (SaveOutcome::Persisted, true) => self.memory_only = false,
            _ => {}
        }
        outcome
    }

    pub fn is_memory_only(&self) -> bool {
        self.memory_only
    }

    pub fn validate_field(&self, key: FieldKey) -> Result<(), super::validation::FieldIssue> {
        self.validator.validate_field(&self.session, key)
    }

    pub fn validate(&self) -> FormReport {
        self.validator.validate_form(&self.session)
    }

    /// Leave the form step. On success the completion flag is recorded so later steps open.
    pub fn complete_step(&mut self) -> Result<SaveOutcome, FormReport> {
        let saved = self.flush();
        let report = self.validate();
        if !report.is_valid() {
            let now = Utc::now();
            for message in &report.summary {
                self.notices.push(NoticeLevel::Error, message.clone(), now);
            }
            return Err(report);
        }
        let completion = self.state_store.mark_completed();
        info!(persisted = saved.is_persisted(), "application form completed");
        Ok(completion)
    }
}
