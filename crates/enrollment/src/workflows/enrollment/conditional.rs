use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use super::domain::{AddressKind, FieldKey, FieldValue};
use super::registry;
use super::session::FormSession;

/// Field groups whose enabled/required state depends on another field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupId {
    HasRegistryNumber,
    ReturningLearner,
    SameAsCurrentAddress,
}

/// Current-address fields and the permanent-address fields they mirror.
const ADDRESS_PAIRS: [(FieldKey, FieldKey); 5] = [
    (FieldKey::CurrentHouseNo, FieldKey::PermHouseNo),
    (FieldKey::CurrentProvince, FieldKey::PermProvince),
    (FieldKey::CurrentMunicipality, FieldKey::PermMunicipality),
    (FieldKey::CurrentBarangay, FieldKey::PermBarangay),
    (FieldKey::CurrentZipCode, FieldKey::PermZipCode),
];

impl GroupId {
    pub const fn all() -> [Self; 3] {
        [
            Self::HasRegistryNumber,
            Self::ReturningLearner,
            Self::SameAsCurrentAddress,
        ]
    }

    /// Field whose value decides whether the group is active.
    pub const fn controller(self) -> FieldKey {
        match self {
            Self::HasRegistryNumber => FieldKey::WithLrn,
            Self::ReturningLearner => FieldKey::Returning,
            Self::SameAsCurrentAddress => FieldKey::SameAddress,
        }
    }

    pub fn for_controller(key: FieldKey) -> Option<Self> {
        Self::all().into_iter().find(|group| group.controller() == key)
    }

    pub fn members(self) -> impl Iterator<Item = FieldKey> {
        registry::fields()
            .iter()
            .filter(move |spec| spec.group == Some(self))
            .map(|spec| spec.key)
    }

    fn is_active(self, session: &FormSession) -> bool {
        let value = session.text(self.controller());
        match self {
            Self::SameAsCurrentAddress => value.map(is_checked).unwrap_or(false),
            Self::HasRegistryNumber | Self::ReturningLearner => value == Some("YES"),
        }
    }
}

/// Checkbox values are stored as text; `true` and `on` both mean checked.
pub fn is_checked(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("on")
}

/// What one evaluation did to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupChange {
    pub group: GroupId,
    pub active: bool,
    /// Member values removed because the group went inactive.
    pub cleared: Vec<FieldKey>,
    /// Permanent-address fields rewritten from the current address.
    pub copied: Vec<FieldKey>,
}

impl GroupChange {
    /// The permanent chain must be re-resolved when copied codes reached its selects.
    pub fn needs_permanent_resolution(&self) -> bool {
        self.copied
            .iter()
            .any(|key| matches!(AddressKind::locate(*key), Some((AddressKind::Permanent, _))))
    }
}

/// Applies group predicates and derived values to a [`FormSession`].
#[derive(Debug, Clone, Default)]
pub struct ConditionalFieldController {
    today: Option<NaiveDate>,
}

impl ConditionalFieldController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the date used for age derivation.
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today: Some(today) }
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// React to a change of `trigger`.
    pub fn evaluate(&self, session: &mut FormSession, trigger: FieldKey) -> Vec<GroupChange> {
        if trigger == FieldKey::BirthDate {
            self.derive_age(session);
            return Vec::new();
        }

        if let Some(group) = GroupId::for_controller(trigger) {
            return self.apply(session, group).into_iter().collect();
        }

        let mirrors_current = ADDRESS_PAIRS.iter().any(|(current, _)| *current == trigger);
        if mirrors_current && session.same_address_sync() {
            let copied = copy_current_address(session);
            debug!(trigger = %trigger, copied = copied.len(), "propagated current address");
            return vec![GroupChange {
                group: GroupId::SameAsCurrentAddress,
                active: true,
                cleared: Vec::new(),
                copied,
            }];
        }

        Vec::new()
    }

    /// Re-apply every group against the current values, in declaration order.
    pub fn evaluate_all(&self, session: &mut FormSession) -> Vec<GroupChange> {
        GroupId::all()
            .into_iter()
            .filter_map(|group| self.apply(session, group))
            .collect()
    }

    fn apply(&self, session: &mut FormSession, group: GroupId) -> Option<GroupChange> {
        if !session.is_rendered(group.controller()) {
            debug!(group = ?group, "controlling field not rendered; skipping");
            return None;
        }

        let active = group.is_active(session);
        let members: Vec<FieldKey> = group
            .members()
            .filter(|key| session.is_rendered(*key))
            .collect();
        let mut cleared = Vec::new();
        let mut copied = Vec::new();

        match group {
            GroupId::HasRegistryNumber | GroupId::ReturningLearner => {
                let hide_when_inactive = group == GroupId::ReturningLearner;
                for key in members {
                    if let Some(state) = session.state_mut(key) {
                        state.enabled = active;
                        state.required = active;
                        state.visible = active || !hide_when_inactive;
                        state.mirrored = false;
                    }
                    if !active && session.clear_value(key) {
                        cleared.push(key);
                    }
                }
            }
            GroupId::SameAsCurrentAddress => {
                if active {
                    copied = copy_current_address(session);
                }
                for key in members {
                    if let Some(state) = session.state_mut(key) {
                        state.enabled = !active;
                        state.required = !active && registry::spec(key).required;
                        state.visible = true;
                        state.mirrored = active;
                    }
                }
                session.same_address_sync = active;
            }
        }

        debug!(group = ?group, active, cleared = cleared.len(), "evaluated conditional group");
        Some(GroupChange {
            group,
            active,
            cleared,
            copied,
        })
    }

    fn derive_age(&self, session: &mut FormSession) {
        if !session.is_rendered(FieldKey::Age) {
            return;
        }
        let age = session
            .text(FieldKey::BirthDate)
            .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
            .and_then(|birth| age_on(birth, self.today()));
        let value = age.map(|years| years.to_string()).unwrap_or_default();
        session.write_value(FieldKey::Age, FieldValue::text(value));
    }
}

/// Whole years between `birth` and `today`; `None` for future dates.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    if birth > today {
        return None;
    }
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

/// Copy every current-address value onto its permanent counterpart and report what changed.
fn copy_current_address(session: &mut FormSession) -> Vec<FieldKey> {
    let mut copied = Vec::new();
    for (current, permanent) in ADDRESS_PAIRS {
        if !session.is_rendered(permanent) {
            continue;
        }
        let value = session.value(current).cloned();
        if session.value(permanent) == value.as_ref() {
            continue;
        }
        match value {
            Some(value) => session.write_value(permanent, value),
            None => {
                session.clear_value(permanent);
            }
        }
        copied.push(permanent);
    }
    copied
}
