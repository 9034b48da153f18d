//! Static field registry.
//!
//! Every field the form renders is described once here: its stable identifier, label, input
//! kind, static requiredness, format rules, and the conditional group it belongs to. The table
//! is indexed by [`FieldKey`] discriminant, so lookups never fail at runtime.

use super::conditional::GroupId;
use super::domain::FieldKey;
use super::domain::FieldKey as K;
use FieldKind::{Checkbox, CheckboxGroup, Date, LocationSelect, Radio, Select, Text};

pub const YES_NO: &[&str] = &["YES", "NO"];
pub const SEX_OPTIONS: &[&str] = &["MALE", "FEMALE"];
pub const GRADE_LEVELS: &[&str] = &[
    "KINDERGARTEN",
    "GRADE_1",
    "GRADE_2",
    "GRADE_3",
    "GRADE_4",
    "GRADE_5",
    "GRADE_6",
];
pub const LEARNING_MODALITIES: &[&str] = &[
    "FACE_TO_FACE",
    "MODULAR_PRINT",
    "MODULAR_DIGITAL",
    "ONLINE",
    "RADIO_BASED",
    "EDUCATIONAL_TV",
    "BLENDED",
    "HOMESCHOOLING",
];

/// Input control rendered for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
    Select(&'static [&'static str]),
    /// Options come from the location registry.
    LocationSelect,
    Radio(&'static [&'static str]),
    Checkbox,
    CheckboxGroup(&'static [&'static str]),
}

impl FieldKind {
    /// Free text is saved after a quiet period; discrete controls save immediately.
    pub fn save_policy(self) -> SavePolicy {
        match self {
            FieldKind::Text => SavePolicy::Debounced,
            FieldKind::Date
            | FieldKind::Select(_)
            | FieldKind::LocationSelect
            | FieldKind::Radio(_)
            | FieldKind::Checkbox
            | FieldKind::CheckboxGroup(_) => SavePolicy::Immediate,
        }
    }

    pub fn options(self) -> Option<&'static [&'static str]> {
        match self {
            FieldKind::Select(options)
            | FieldKind::Radio(options)
            | FieldKind::CheckboxGroup(options) => Some(options),
            FieldKind::Text | FieldKind::Date | FieldKind::LocationSelect | FieldKind::Checkbox => {
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePolicy {
    Immediate,
    Debounced,
}

/// Format checks applied on top of requiredness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatRule {
    Email,
    MobileNumber,
    LearnerReference,
    AgeRange { min: u8, max: u8 },
    SchoolYear,
    Date,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub key: FieldKey,
    pub id: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub rules: &'static [FormatRule],
    pub group: Option<GroupId>,
}

const fn field(key: FieldKey, id: &'static str, label: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        key,
        id,
        label,
        kind,
        required: false,
        rules: &[],
        group: None,
    }
}

impl FieldSpec {
    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn rules(mut self, rules: &'static [FormatRule]) -> Self {
        self.rules = rules;
        self
    }

    const fn group(mut self, group: GroupId) -> Self {
        self.group = Some(group);
        self
    }
}

const AGE_RANGE: &[FormatRule] = &[FormatRule::AgeRange { min: 3, max: 25 }];
const MOBILE: &[FormatRule] = &[FormatRule::MobileNumber];
const EMAIL: &[FormatRule] = &[FormatRule::Email];
const SCHOOL_YEAR: &[FormatRule] = &[FormatRule::SchoolYear];

pub const FIELD_COUNT: usize = 47;

static FIELDS: [FieldSpec; FIELD_COUNT] = [
    field(K::SchoolYear, "schoolYear", "School Year", Text)
        .required()
        .rules(SCHOOL_YEAR),
    field(K::GradeLevel, "gradeLevel", "Grade Level to Enroll", Select(GRADE_LEVELS)).required(),
    field(K::WithLrn, "withLrn", "With LRN?", Radio(YES_NO)).required(),
    field(K::Returning, "returning", "Returning (Balik-Aral)", Radio(YES_NO)).required(),
    field(K::Lrn, "lrn", "Learner Reference No. (LRN)", Text)
        .rules(&[FormatRule::LearnerReference])
        .group(GroupId::HasRegistryNumber),
    field(K::PsaBirth, "psaBirth", "PSA Birth Certificate No.", Text),
    field(K::LastName, "lastName", "Last Name", Text).required(),
    field(K::FirstName, "firstName", "First Name", Text).required(),
    field(K::MiddleName, "middleName", "Middle Name", Text),
    field(K::ExtensionName, "extensionName", "Extension Name", Text),
    field(K::BirthDate, "birthDate", "Birthdate", Date)
        .required()
        .rules(&[FormatRule::Date]),
    field(K::Age, "age", "Age", Text).required().rules(AGE_RANGE),
    field(K::Sex, "sex", "Sex", Radio(SEX_OPTIONS)).required(),
    field(K::BirthProvince, "birthProvince", "Place of Birth (Province)", LocationSelect)
        .required(),
    field(K::BirthCity, "birthCity", "Place of Birth (City/Municipality)", LocationSelect)
        .required(),
    field(K::MotherTongue, "motherTongue", "Mother Tongue", Text),
    field(K::IndigenousPeople, "indigenousPeople", "Indigenous Peoples Community", Radio(YES_NO)),
    field(K::FourPs, "fourPs", "4Ps Beneficiary", Radio(YES_NO)),
    field(K::HasDisability, "hasDisability", "Learner with Disability", Radio(YES_NO)),
    field(K::CurrentHouseNo, "currentHouseNo", "Current House No./Street", Text),
    field(K::CurrentProvince, "currentProvince", "Current Province", LocationSelect).required(),
    field(
        K::CurrentMunicipality,
        "currentMunicipality",
        "Current City/Municipality",
        LocationSelect,
    )
    .required(),
    field(K::CurrentBarangay, "currentBarangay", "Current Barangay", LocationSelect).required(),
    field(K::CurrentZipCode, "currentZipCode", "Current Zip Code", Text),
    field(K::SameAddress, "sameAddress", "Same with Current Address", Checkbox),
    field(K::PermHouseNo, "permHouseNo", "Permanent House No./Street", Text)
        .group(GroupId::SameAsCurrentAddress),
    field(K::PermProvince, "permProvince", "Permanent Province", LocationSelect)
        .required()
        .group(GroupId::SameAsCurrentAddress),
    field(
        K::PermMunicipality,
        "permMunicipality",
        "Permanent City/Municipality",
        LocationSelect,
    )
    .required()
    .group(GroupId::SameAsCurrentAddress),
    field(K::PermBarangay, "permBarangay", "Permanent Barangay", LocationSelect)
        .required()
        .group(GroupId::SameAsCurrentAddress),
    field(K::PermZipCode, "permZipCode", "Permanent Zip Code", Text)
        .group(GroupId::SameAsCurrentAddress),
    field(K::FatherLastName, "fatherLastName", "Father's Last Name", Text),
    field(K::FatherFirstName, "fatherFirstName", "Father's First Name", Text),
    field(K::FatherMiddleName, "fatherMiddleName", "Father's Middle Name", Text),
    field(K::FatherContact, "fatherContact", "Father's Contact Number", Text).rules(MOBILE),
    field(K::FatherEmail, "fatherEmail", "Father's Email", Text).rules(EMAIL),
    field(K::MotherMaidenLast, "motherMaidenLast", "Mother's Maiden Last Name", Text),
    field(K::MotherFirstName, "motherFirstName", "Mother's First Name", Text),
    field(K::MotherMiddleName, "motherMiddleName", "Mother's Middle Name", Text),
    field(K::MotherContact, "motherContact", "Mother's Contact Number", Text).rules(MOBILE),
    field(K::MotherEmail, "motherEmail", "Mother's Email", Text).rules(EMAIL),
    field(K::GuardianName, "guardianName", "Guardian's Name", Text),
    field(K::GuardianContact, "guardianContact", "Guardian's Contact Number", Text).rules(MOBILE),
    field(
        K::LastGradeLevel,
        "lastGradeLevel",
        "Last Grade Level Completed",
        Select(GRADE_LEVELS),
    )
    .group(GroupId::ReturningLearner),
    field(K::LastSchoolYear, "lastSchoolYear", "Last School Year Completed", Text)
        .rules(SCHOOL_YEAR)
        .group(GroupId::ReturningLearner),
    field(K::LastSchoolAttended, "lastSchoolAttended", "Last School Attended", Text)
        .group(GroupId::ReturningLearner),
    field(K::SchoolId, "schoolId", "School ID", Text).group(GroupId::ReturningLearner),
    field(
        K::LearningModality,
        "learningModality",
        "Preferred Learning Modality",
        CheckboxGroup(LEARNING_MODALITIES),
    )
    .required(),
];

pub fn spec(key: FieldKey) -> &'static FieldSpec {
    &FIELDS[key as usize]
}

/// All field specs in document order.
pub fn fields() -> &'static [FieldSpec] {
    &FIELDS
}

pub fn keys() -> impl Iterator<Item = FieldKey> {
    FIELDS.iter().map(|spec| spec.key)
}

pub fn find_by_id(id: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|spec| spec.id == id)
}
