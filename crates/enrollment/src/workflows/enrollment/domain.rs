use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Every field rendered by the application form, declared in document order.
///
/// The declaration order drives validation ordering and the focus target, so new fields must
/// be inserted where they appear on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKey {
    SchoolYear,
    GradeLevel,
    WithLrn,
    Returning,
    Lrn,
    PsaBirth,
    LastName,
    FirstName,
    MiddleName,
    ExtensionName,
    BirthDate,
    Age,
    Sex,
    BirthProvince,
    BirthCity,
    MotherTongue,
    IndigenousPeople,
    FourPs,
    HasDisability,
    CurrentHouseNo,
    CurrentProvince,
    CurrentMunicipality,
    CurrentBarangay,
    CurrentZipCode,
    SameAddress,
    PermHouseNo,
    PermProvince,
    PermMunicipality,
    PermBarangay,
    PermZipCode,
    FatherLastName,
    FatherFirstName,
    FatherMiddleName,
    FatherContact,
    FatherEmail,
    MotherMaidenLast,
    MotherFirstName,
    MotherMiddleName,
    MotherContact,
    MotherEmail,
    GuardianName,
    GuardianContact,
    LastGradeLevel,
    LastSchoolYear,
    LastSchoolAttended,
    SchoolId,
    LearningModality,
}

impl FieldKey {
    /// Stable identifier used by the persisted snapshot and the HTTP payloads.
    pub fn id(self) -> &'static str {
        super::registry::spec(self).id
    }

    pub fn label(self) -> &'static str {
        super::registry::spec(self).label
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Value held by a field: free text/select/radio values are scalars, checkbox groups are sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Multi(BTreeSet<String>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn multi<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Multi(values.into_iter().map(Into::into).collect())
    }

    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(value) => value.trim().is_empty(),
            FieldValue::Multi(values) => values.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value.as_str()),
            FieldValue::Multi(_) => None,
        }
    }
}

/// Administrative levels of the geographic registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationLevel {
    Province,
    CityMunicipality,
    Barangay,
}

impl LocationLevel {
    pub const fn parent(self) -> Option<Self> {
        match self {
            Self::Province => None,
            Self::CityMunicipality => Some(Self::Province),
            Self::Barangay => Some(Self::CityMunicipality),
        }
    }

    pub const fn child(self) -> Option<Self> {
        match self {
            Self::Province => Some(Self::CityMunicipality),
            Self::CityMunicipality => Some(Self::Barangay),
            Self::Barangay => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Province => "Province",
            Self::CityMunicipality => "City/Municipality",
            Self::Barangay => "Barangay",
        }
    }
}

impl fmt::Display for LocationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A resolved registry entry. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationNode {
    pub code: String,
    pub name: String,
    pub level: LocationLevel,
    pub parent_code: Option<String>,
}

impl LocationNode {
    pub fn display_name(&self) -> String {
        self.name.to_uppercase()
    }
}

/// A registry entry as offered in a select, with its uppercased label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationOption {
    #[serde(flatten)]
    pub node: LocationNode,
    pub label: String,
}

impl From<&LocationNode> for LocationOption {
    fn from(node: &LocationNode) -> Self {
        Self {
            label: node.display_name(),
            node: node.clone(),
        }
    }
}

/// The three independent address chains rendered by the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    Birth,
    Current,
    Permanent,
}

impl AddressKind {
    pub const fn all() -> [Self; 3] {
        [Self::Birth, Self::Current, Self::Permanent]
    }

    /// Levels rendered for this chain; place of birth stops at the city.
    pub const fn levels(self) -> &'static [LocationLevel] {
        match self {
            Self::Birth => &[LocationLevel::Province, LocationLevel::CityMunicipality],
            Self::Current | Self::Permanent => &[
                LocationLevel::Province,
                LocationLevel::CityMunicipality,
                LocationLevel::Barangay,
            ],
        }
    }

    pub const fn field(self, level: LocationLevel) -> Option<FieldKey> {
        match (self, level) {
            (Self::Birth, LocationLevel::Province) => Some(FieldKey::BirthProvince),
            (Self::Birth, LocationLevel::CityMunicipality) => Some(FieldKey::BirthCity),
            (Self::Birth, LocationLevel::Barangay) => None,
            (Self::Current, LocationLevel::Province) => Some(FieldKey::CurrentProvince),
            (Self::Current, LocationLevel::CityMunicipality) => Some(FieldKey::CurrentMunicipality),
            (Self::Current, LocationLevel::Barangay) => Some(FieldKey::CurrentBarangay),
            (Self::Permanent, LocationLevel::Province) => Some(FieldKey::PermProvince),
            (Self::Permanent, LocationLevel::CityMunicipality) => Some(FieldKey::PermMunicipality),
            (Self::Permanent, LocationLevel::Barangay) => Some(FieldKey::PermBarangay),
        }
    }

    /// Reverse lookup from a location field to its chain and level.
    pub fn locate(key: FieldKey) -> Option<(Self, LocationLevel)> {
        Self::all().into_iter().find_map(|kind| {
            kind.levels()
                .iter()
                .copied()
                .find(|level| kind.field(*level) == Some(key))
                .map(|level| (kind, level))
        })
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Birth => "place of birth",
            Self::Current => "current address",
            Self::Permanent => "permanent address",
        }
    }
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Codes selected along one address chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSelection {
    pub province: Option<String>,
    pub city: Option<String>,
    pub barangay: Option<String>,
}

impl AddressSelection {
    /// Build a selection, rejecting a child code whose parent is empty.
    pub fn new(
        kind: AddressKind,
        province: Option<String>,
        city: Option<String>,
        barangay: Option<String>,
    ) -> Result<Self, AddressError> {
        let province = province.filter(|code| !code.trim().is_empty());
        let city = city.filter(|code| !code.trim().is_empty());
        let barangay = barangay.filter(|code| !code.trim().is_empty());

        if city.is_some() && province.is_none() {
            return Err(AddressError::MissingParent {
                kind,
                level: LocationLevel::CityMunicipality,
            });
        }
        if barangay.is_some() && city.is_none() {
            return Err(AddressError::MissingParent {
                kind,
                level: LocationLevel::Barangay,
            });
        }

        Ok(Self {
            province,
            city,
            barangay,
        })
    }

    pub fn code(&self, level: LocationLevel) -> Option<&str> {
        match level {
            LocationLevel::Province => self.province.as_deref(),
            LocationLevel::CityMunicipality => self.city.as_deref(),
            LocationLevel::Barangay => self.barangay.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.province.is_none() && self.city.is_none() && self.barangay.is_none()
    }
}

/// Address-chain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("{level} cannot be set before its parent on the {kind}")]
    MissingParent {
        kind: AddressKind,
        level: LocationLevel,
    },
    #[error("the {kind} does not render a {level} select")]
    LevelNotRendered {
        kind: AddressKind,
        level: LocationLevel,
    },
    #[error("'{code}' is not a {level} option on the {kind}")]
    UnknownCode {
        kind: AddressKind,
        level: LocationLevel,
        code: String,
    },
    #[error("{0} is not a location field")]
    NotALocationField(FieldKey),
    #[error("{0} is disabled")]
    Disabled(FieldKey),
    #[error("{0} has no loaded options to choose from")]
    Unavailable(FieldKey),
}
