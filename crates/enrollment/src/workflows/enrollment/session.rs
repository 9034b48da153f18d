use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::domain::{
    AddressKind, AddressSelection, FieldKey, FieldValue, LocationNode, LocationOption,
};
use super::registry::{self, FieldKind};

/// Presentation flags of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldState {
    pub enabled: bool,
    pub required: bool,
    pub visible: bool,
    /// Disabled but holding values copied from another field (same-as-current address).
    pub mirrored: bool,
}

impl FieldState {
    fn initial(key: FieldKey) -> Self {
        let spec = registry::spec(key);
        Self {
            enabled: true,
            required: spec.required,
            visible: true,
            mirrored: false,
        }
    }
}

/// Live state of one cascading location select.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocationSelect {
    pub options: Vec<LocationNode>,
    pub enabled: bool,
    pub loading: bool,
    pub error: Option<String>,
    #[serde(skip)]
    pub(crate) latest_token: u64,
}

impl LocationSelect {
    pub fn contains(&self, code: &str) -> bool {
        self.options.iter().any(|node| node.code == code)
    }

    pub(crate) fn reset(&mut self) {
        self.options.clear();
        self.enabled = false;
        self.loading = false;
        self.error = None;
    }
}

/// Rejections raised when writing a field directly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("{0} is not rendered on this step")]
    NotRendered(FieldKey),
    #[error("{0} is disabled")]
    Disabled(FieldKey),
    #[error("'{value}' is not an option of {key}")]
    UnknownOption { key: FieldKey, value: String },
    #[error("{0} expects a single value")]
    ExpectsText(FieldKey),
    #[error("{0} expects a set of values")]
    ExpectsSet(FieldKey),
}

/// The aggregate holding every piece of live form state for one applicant.
///
/// Sub-components receive it by reference; nothing reads ambient globals.
#[derive(Debug, Clone)]
pub struct FormSession {
    pub(crate) values: BTreeMap<FieldKey, FieldValue>,
    pub(crate) states: BTreeMap<FieldKey, FieldState>,
    pub(crate) rendered: BTreeSet<FieldKey>,
    pub(crate) selects: BTreeMap<FieldKey, LocationSelect>,
    pub(crate) same_address_sync: bool,
    pub(crate) next_token: u64,
}

impl Default for FormSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FormSession {
    /// Session with the full application form rendered.
    pub fn new() -> Self {
        Self::with_layout(registry::keys())
    }

    /// Session for a partially rendered form; absent fields are treated as not applicable.
    pub fn with_layout<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = FieldKey>,
    {
        let rendered: BTreeSet<FieldKey> = fields.into_iter().collect();
        let states = rendered
            .iter()
            .map(|key| (*key, FieldState::initial(*key)))
            .collect();
        let selects = rendered
            .iter()
            .filter(|key| registry::spec(**key).kind == FieldKind::LocationSelect)
            .map(|key| (*key, LocationSelect::default()))
            .collect();

        Self {
            values: BTreeMap::new(),
            states,
            rendered,
            selects,
            same_address_sync: false,
            next_token: 0,
        }
    }

    pub fn is_rendered(&self, key: FieldKey) -> bool {
        self.rendered.contains(&key)
    }

    pub fn value(&self, key: FieldKey) -> Option<&FieldValue> {
        self.values.get(&key)
    }

    /// Trimmed scalar value, `None` when blank or absent.
    pub fn text(&self, key: FieldKey) -> Option<&str> {
        self.values
            .get(&key)
            .and_then(FieldValue::as_text)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn values(&self) -> &BTreeMap<FieldKey, FieldValue> {
        &self.values
    }

    pub fn state(&self, key: FieldKey) -> Option<FieldState> {
        self.states.get(&key).copied()
    }

    pub fn is_enabled(&self, key: FieldKey) -> bool {
        self.states.get(&key).map(|state| state.enabled).unwrap_or(false)
    }

    pub fn select(&self, key: FieldKey) -> Option<&LocationSelect> {
        self.selects.get(&key)
    }

    pub fn same_address_sync(&self) -> bool {
        self.same_address_sync
    }

    /// Write a user-entered value after checking the field is live and the value fits its kind.
    pub fn set_value(&mut self, key: FieldKey, value: FieldValue) -> Result<(), FieldError> {
        if !self.is_rendered(key) {
            return Err(FieldError::NotRendered(key));
        }
        if !self.is_enabled(key) {
            return Err(FieldError::Disabled(key));
        }

        let kind = registry::spec(key).kind;
        match (&value, kind) {
            (FieldValue::Multi(values), FieldKind::CheckboxGroup(options)) => {
                if let Some(unknown) = values.iter().find(|v| !options.contains(&v.as_str())) {
                    return Err(FieldError::UnknownOption {
                        key,
                        value: unknown.clone(),
                    });
                }
            }
            (FieldValue::Multi(_), _) => return Err(FieldError::ExpectsText(key)),
            (FieldValue::Text(_), FieldKind::CheckboxGroup(_)) => {
                return Err(FieldError::ExpectsSet(key))
            }
            (FieldValue::Text(text), FieldKind::Select(options) | FieldKind::Radio(options)) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() && !options.contains(&trimmed) {
                    return Err(FieldError::UnknownOption {
                        key,
                        value: trimmed.to_string(),
                    });
                }
            }
            (FieldValue::Text(_), _) => {}
        }

        self.write_value(key, value);
        Ok(())
    }

    /// Unchecked write used by restore and the conditional controller. Blank values are removed.
    pub(crate) fn write_value(&mut self, key: FieldKey, value: FieldValue) {
        if value.is_blank() {
            self.values.remove(&key);
        } else {
            self.values.insert(key, value);
        }
    }

    pub(crate) fn clear_value(&mut self, key: FieldKey) -> bool {
        self.values.remove(&key).is_some()
    }

    pub(crate) fn state_mut(&mut self, key: FieldKey) -> Option<&mut FieldState> {
        self.states.get_mut(&key)
    }

    pub(crate) fn select_mut(&mut self, key: FieldKey) -> Option<&mut LocationSelect> {
        self.selects.get_mut(&key)
    }

    /// Replace every value verbatim and reset presentation flags to their registry defaults.
    pub(crate) fn replace_values(&mut self, values: BTreeMap<FieldKey, FieldValue>) {
        self.values = values
            .into_iter()
            .filter(|(key, value)| self.rendered.contains(key) && !value.is_blank())
            .collect();
        for (key, state) in self.states.iter_mut() {
            *state = FieldState::initial(*key);
        }
        for select in self.selects.values_mut() {
            select.reset();
        }
        self.same_address_sync = false;
    }

    /// Codes currently held by an address chain, truncated at the first empty level.
    pub fn address_selection(&self, kind: AddressKind) -> AddressSelection {
        let mut selection = AddressSelection::default();
        for level in kind.levels() {
            let Some(code) = kind.field(*level).and_then(|key| self.text(key)) else {
                break;
            };
            let code = Some(code.to_string());
            match level {
                super::domain::LocationLevel::Province => selection.province = code,
                super::domain::LocationLevel::CityMunicipality => selection.city = code,
                super::domain::LocationLevel::Barangay => selection.barangay = code,
            }
        }
        selection
    }

    pub(crate) fn issue_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }

    /// Serializable projection of everything a user can see; used for idempotency checks
    /// and returned by the HTTP facade.
    pub fn view(&self) -> SessionView {
        SessionView {
            values: self.values.clone(),
            states: self.states.clone(),
            selects: self
                .selects
                .iter()
                .map(|(key, select)| {
                    (
                        *key,
                        SelectView {
                            options: select.options.iter().map(LocationOption::from).collect(),
                            selected: self.text(*key).map(str::to_string),
                            enabled: select.enabled,
                            error: select.error.clone(),
                        },
                    )
                })
                .collect(),
            same_address_sync: self.same_address_sync,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectView {
    pub options: Vec<LocationOption>,
    pub selected: Option<String>,
    pub enabled: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub values: BTreeMap<FieldKey, FieldValue>,
    pub states: BTreeMap<FieldKey, FieldState>,
    pub selects: BTreeMap<FieldKey, SelectView>,
    pub same_address_sync: bool,
}
