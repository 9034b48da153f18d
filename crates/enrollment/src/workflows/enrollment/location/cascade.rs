//! Cascading address selects.
//!
//! A select is loaded in two halves: [`FormSession::begin_location_load`] issues a ticket
//! carrying a fresh request token, and [`FormSession::apply_location_load`] installs the
//! response only if that token is still the latest one issued for the select. Clearing or
//! re-selecting a parent issues new tokens for every descendant, so late responses for an
//! abandoned parent are discarded instead of overwriting newer state.

use tracing::{debug, warn};

use super::super::domain::{AddressError, AddressKind, AddressSelection, FieldKey, FieldValue};
use super::super::domain::{LocationLevel, LocationNode};
use super::super::session::FormSession;
use super::lookup::{LocationLookup, LookupError};
use super::resolver::LocationHierarchyResolver;

/// A pending load for one select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub kind: AddressKind,
    pub level: LocationLevel,
    pub field: FieldKey,
    pub parent_code: Option<String>,
    pub token: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Options installed; `selected` is the stored code that survived the new listing.
    Applied { selected: Option<String> },
    /// A newer request was issued for the select after this one.
    Superseded,
    Failed(LookupError),
}

/// Tickets for one chain, issued top-down while stored codes allow.
#[derive(Debug, Clone)]
pub struct ChainPlan {
    pub kind: AddressKind,
    pub selection: AddressSelection,
    pub tickets: Vec<LoadTicket>,
}

/// Fetched listings for a [`ChainPlan`], in chain order.
#[derive(Debug, Clone)]
pub struct ChainResolution {
    pub kind: AddressKind,
    pub loads: Vec<(LoadTicket, Result<Vec<LocationNode>, LookupError>)>,
}

fn child_in_chain(kind: AddressKind, level: LocationLevel) -> Option<LocationLevel> {
    level.child().filter(|child| kind.levels().contains(child))
}

fn descendants(kind: AddressKind, level: LocationLevel) -> impl Iterator<Item = FieldKey> {
    kind.levels()
        .iter()
        .copied()
        .filter(move |candidate| *candidate > level)
        .filter_map(move |candidate| kind.field(candidate))
}

impl FormSession {
    fn location_field(
        &self,
        kind: AddressKind,
        level: LocationLevel,
    ) -> Result<FieldKey, AddressError> {
        kind.field(level)
            .filter(|key| self.is_rendered(*key))
            .ok_or(AddressError::LevelNotRendered { kind, level })
    }

    /// Issue a ticket for loading the options of `level` on `kind`. Returns `None` and leaves
    /// the select disabled when the parent level has no selection.
    pub fn begin_location_load(
        &mut self,
        kind: AddressKind,
        level: LocationLevel,
    ) -> Option<LoadTicket> {
        let field = self.location_field(kind, level).ok()?;

        let parent_code = match level.parent() {
            None => None,
            Some(parent) => match kind.field(parent).and_then(|key| self.text(key)) {
                Some(code) => Some(code.to_string()),
                None => {
                    if let Some(select) = self.select_mut(field) {
                        select.reset();
                    }
                    return None;
                }
            },
        };

        let token = self.issue_token();
        let select = self.select_mut(field)?;
        select.latest_token = token;
        select.loading = true;
        select.error = None;

        Some(LoadTicket {
            kind,
            level,
            field,
            parent_code,
            token,
        })
    }

    /// Install a lookup response for `ticket`.
    pub fn apply_location_load(
        &mut self,
        ticket: &LoadTicket,
        result: Result<Vec<LocationNode>, LookupError>,
    ) -> LoadOutcome {
        let Some(select) = self.select_mut(ticket.field) else {
            return LoadOutcome::Superseded;
        };
        if select.latest_token != ticket.token {
            debug!(
                field = %ticket.field,
                token = ticket.token,
                latest = select.latest_token,
                "discarding superseded location response"
            );
            return LoadOutcome::Superseded;
        }

        match result {
            Ok(nodes) => {
                select.options = nodes;
                select.enabled = true;
                select.loading = false;
                select.error = None;

                let stored = self.text(ticket.field).map(str::to_string);
                match stored {
                    Some(code) if self.select(ticket.field).is_some_and(|s| s.contains(&code)) => {
                        LoadOutcome::Applied {
                            selected: Some(code),
                        }
                    }
                    Some(code) => {
                        warn!(field = %ticket.field, code = %code, "stored location code no longer listed");
                        self.clear_value(ticket.field);
                        self.clear_descendants(ticket.kind, ticket.level);
                        LoadOutcome::Applied { selected: None }
                    }
                    None => {
                        self.clear_descendants(ticket.kind, ticket.level);
                        LoadOutcome::Applied { selected: None }
                    }
                }
            }
            Err(err) => {
                warn!(field = %ticket.field, error = %err, "location lookup failed");
                select.reset();
                select.error = Some(err.to_string());
                self.disable_descendants(ticket.kind, ticket.level);
                LoadOutcome::Failed(err)
            }
        }
    }

    /// Select (or clear, with `None`) a code on one level. Descendant values are cleared and
    /// their selects disabled; the returned ticket loads the next level when one exists.
    /// A code is accepted only from a loaded, enabled select that lists it.
    pub fn select_location(
        &mut self,
        kind: AddressKind,
        level: LocationLevel,
        code: Option<&str>,
    ) -> Result<Option<LoadTicket>, AddressError> {
        let field = self.location_field(kind, level)?;
        if !self.is_enabled(field) {
            return Err(AddressError::Disabled(field));
        }

        let code = code.map(str::trim).filter(|code| !code.is_empty());
        if let (Some(_), Some(parent)) = (code, level.parent()) {
            let parent_selected = kind.field(parent).and_then(|key| self.text(key)).is_some();
            if !parent_selected {
                return Err(AddressError::MissingParent { kind, level });
            }
        }
        if let Some(code) = code {
            let select = self.select(field).ok_or(AddressError::Unavailable(field))?;
            if !select.enabled || select.loading {
                return Err(AddressError::Unavailable(field));
            }
            if !select.contains(code) {
                return Err(AddressError::UnknownCode {
                    kind,
                    level,
                    code: code.to_string(),
                });
            }
        }

        self.write_value(field, FieldValue::text(code.unwrap_or_default()));
        self.clear_descendants(kind, level);

        Ok(match (code, child_in_chain(kind, level)) {
            (Some(_), Some(child)) => self.begin_location_load(kind, child),
            _ => None,
        })
    }

    /// Clear values and displays below `level`, invalidating any in-flight loads.
    pub(crate) fn clear_descendants(&mut self, kind: AddressKind, level: LocationLevel) {
        for key in descendants(kind, level).collect::<Vec<_>>() {
            self.clear_value(key);
            self.invalidate_select(key);
        }
    }

    /// Disable displays below `level` without touching stored codes.
    fn disable_descendants(&mut self, kind: AddressKind, level: LocationLevel) {
        for key in descendants(kind, level).collect::<Vec<_>>() {
            self.invalidate_select(key);
        }
    }

    fn invalidate_select(&mut self, key: FieldKey) {
        let token = self.issue_token();
        if let Some(select) = self.select_mut(key) {
            select.reset();
            select.latest_token = token;
        }
    }

    /// Issue tickets for every level of `kind` whose parent holds a stored code.
    pub fn plan_chain(&mut self, kind: AddressKind) -> ChainPlan {
        let selection = self.address_selection(kind);
        let mut tickets = Vec::new();
        for level in kind.levels() {
            match self.begin_location_load(kind, *level) {
                Some(ticket) => tickets.push(ticket),
                None => break,
            }
        }
        ChainPlan {
            kind,
            selection,
            tickets,
        }
    }

    /// Apply a resolved chain level by level.
    pub fn apply_chain(&mut self, resolution: ChainResolution) -> Vec<LoadOutcome> {
        resolution
            .loads
            .into_iter()
            .map(|(ticket, result)| self.apply_location_load(&ticket, result))
            .collect()
    }
}

impl<L> LocationHierarchyResolver<L>
where
    L: LocationLookup,
{
    /// Fetch a planned chain, awaiting each level before the next and stopping at the first
    /// level whose stored code is absent from its listing.
    pub async fn resolve_chain(&self, plan: ChainPlan) -> ChainResolution {
        let mut loads = Vec::with_capacity(plan.tickets.len());
        for ticket in plan.tickets {
            let result = self
                .list(ticket.level, ticket.parent_code.as_deref())
                .await;
            let proceed = match (&result, plan.selection.code(ticket.level)) {
                (Ok(nodes), Some(code)) => nodes.iter().any(|node| node.code == code),
                _ => false,
            };
            loads.push((ticket, result));
            if !proceed {
                break;
            }
        }
        ChainResolution {
            kind: plan.kind,
            loads,
        }
    }

    /// Load a ticket and keep eagerly loading child levels while a stored code is selected.
    pub async fn follow(
        &self,
        session: &mut FormSession,
        ticket: Option<LoadTicket>,
    ) -> Vec<LoadOutcome> {
        let mut outcomes = Vec::new();
        let mut next = ticket;
        while let Some(ticket) = next.take() {
            let result = self
                .list(ticket.level, ticket.parent_code.as_deref())
                .await;
            let outcome = session.apply_location_load(&ticket, result);
            if let LoadOutcome::Applied { selected: Some(_) } = &outcome {
                next = child_in_chain(ticket.kind, ticket.level)
                    .and_then(|child| session.begin_location_load(ticket.kind, child));
            }
            outcomes.push(outcome);
        }
        outcomes
    }
}
