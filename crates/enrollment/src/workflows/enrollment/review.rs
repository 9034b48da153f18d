use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::documents::{DocumentSlotId, DocumentStatus};
use super::domain::{FieldKey, FieldValue, LocationLevel};
use super::location::{LocationHierarchyResolver, LocationLookup};
use super::persistence::PersistedFormSnapshot;

const EMPTY: &str = "-";
const NOT_PROVIDED: &str = "Not Provided";
const NOT_SPECIFIED: &str = "Not Specified";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewEntry {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewSection {
    pub title: &'static str,
    pub entries: Vec<ReviewEntry>,
}

impl ReviewSection {
    fn new(title: &'static str) -> Self {
        Self {
            title,
            entries: Vec::new(),
        }
    }

    fn entry(mut self, label: &'static str, value: impl Into<String>) -> Self {
        self.entries.push(ReviewEntry {
            label,
            value: value.into(),
        });
        self
    }

    pub fn value(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentLine {
    pub slot: DocumentSlotId,
    pub label: &'static str,
    pub uploaded: bool,
}

/// Session flags gating submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ReviewProgress {
    #[serde(default)]
    pub form_completed: bool,
    #[serde(default)]
    pub terms_accepted: bool,
}

impl ReviewProgress {
    pub fn is_ready(self) -> bool {
        self.form_completed && self.terms_accepted
    }
}

/// Read-only summary shown before submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewView {
    pub sections: Vec<ReviewSection>,
    pub documents: Vec<DocumentLine>,
    pub missing_documents: Vec<String>,
    pub ready_to_submit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
}

impl ReviewView {
    pub fn section(&self, title: &str) -> Option<&ReviewSection> {
        self.sections.iter().find(|section| section.title == title)
    }
}

/// `GRADE_1` becomes `Grade 1`; other values pass through.
pub fn format_grade_level(grade: Option<&str>) -> String {
    match grade {
        Some(grade) => grade.replacen('_', " ", 1).replacen("GRADE", "Grade", 1),
        None => EMPTY.to_string(),
    }
}

/// `2015-01-05` becomes `January 5, 2015`; unparseable input is shown as entered.
pub fn format_date(raw: Option<&str>) -> String {
    match raw {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(|date| date.format("%B %-d, %Y").to_string())
            .unwrap_or_else(|_| raw.to_string()),
        None => EMPTY.to_string(),
    }
}

pub fn modality_label(code: &str) -> &str {
    match code {
        "FACE_TO_FACE" => "Face-to-Face",
        "MODULAR_PRINT" => "Modular (Print)",
        "MODULAR_DIGITAL" => "Modular (Digital)",
        "ONLINE" => "Online",
        "RADIO_BASED" => "Radio-Based",
        "EDUCATIONAL_TV" => "Educational TV",
        "BLENDED" => "Blended",
        "HOMESCHOOLING" => "Homeschooling",
        other => other,
    }
}

fn format_modalities(value: Option<&FieldValue>) -> String {
    let labels: Vec<&str> = match value {
        Some(FieldValue::Multi(codes)) => codes.iter().map(|code| modality_label(code)).collect(),
        Some(FieldValue::Text(code)) if !code.trim().is_empty() => vec![modality_label(code.trim())],
        _ => Vec::new(),
    };
    if labels.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        labels.join(", ")
    }
}

fn text_or(snapshot: &PersistedFormSnapshot, key: FieldKey, fallback: &str) -> String {
    snapshot.text(key).unwrap_or(fallback).to_string()
}

fn joined(parts: &[Option<&str>], separator: &str) -> String {
    let parts: Vec<&str> = parts.iter().flatten().copied().collect();
    if parts.is_empty() {
        EMPTY.to_string()
    } else {
        parts.join(separator)
    }
}

/// Projects a persisted snapshot into the review page.
pub struct ReviewAssembler<L> {
    resolver: Arc<LocationHierarchyResolver<L>>,
}

impl<L> ReviewAssembler<L>
where
    L: LocationLookup,
{
    pub fn new(resolver: Arc<LocationHierarchyResolver<L>>) -> Self {
        Self { resolver }
    }

    async fn location_name(
        &self,
        level: LocationLevel,
        code: Option<&str>,
        parent_code: Option<&str>,
    ) -> Option<String> {
        let code = code?;
        let name = self.resolver.resolve_name(level, code, parent_code).await;
        Some(name.to_uppercase())
    }

    async fn birth_place(&self, snapshot: &PersistedFormSnapshot) -> String {
        let province = snapshot.text(FieldKey::BirthProvince);
        let city = self
            .location_name(
                LocationLevel::CityMunicipality,
                snapshot.text(FieldKey::BirthCity),
                province,
            )
            .await;
        let province = self
            .location_name(LocationLevel::Province, province, None)
            .await;
        joined(&[city.as_deref(), province.as_deref()], ", ")
    }

    async fn address(
        &self,
        snapshot: &PersistedFormSnapshot,
        fields: [FieldKey; 5],
    ) -> String {
        let [house, province, municipality, barangay, zip] = fields;
        let province_code = snapshot.text(province);
        let municipality_code = snapshot.text(municipality);

        let barangay = self
            .location_name(
                LocationLevel::Barangay,
                snapshot.text(barangay),
                municipality_code,
            )
            .await;
        let municipality = self
            .location_name(
                LocationLevel::CityMunicipality,
                municipality_code,
                province_code,
            )
            .await;
        let province = self
            .location_name(LocationLevel::Province, province_code, None)
            .await;

        joined(
            &[
                snapshot.text(house),
                barangay.as_deref(),
                municipality.as_deref(),
                province.as_deref(),
                snapshot.text(zip),
            ],
            ", ",
        )
    }

    /// Build the review without touching the snapshot. Unresolvable location codes are shown
    /// as the raw code.
    pub async fn assemble(
        &self,
        snapshot: &PersistedFormSnapshot,
        documents: Option<&DocumentStatus>,
        progress: ReviewProgress,
    ) -> ReviewView {
        let text = |key: FieldKey| snapshot.text(key);
        let or = |key: FieldKey, fallback: &'static str| text_or(snapshot, key, fallback);

        let mut sections = Vec::new();

        sections.push(
            ReviewSection::new("School Information")
                .entry("School Year", or(FieldKey::SchoolYear, EMPTY))
                .entry("Grade Level", format_grade_level(text(FieldKey::GradeLevel)))
                .entry("With LRN", or(FieldKey::WithLrn, EMPTY))
                .entry("Returning (Balik-Aral)", or(FieldKey::Returning, EMPTY)),
        );

        let age = text(FieldKey::Age)
            .map(|age| format!("{age} years old"))
            .unwrap_or_else(|| EMPTY.to_string());
        sections.push(
            ReviewSection::new("Student Information")
                .entry(
                    "Full Name",
                    joined(
                        &[
                            text(FieldKey::LastName),
                            text(FieldKey::FirstName),
                            text(FieldKey::MiddleName),
                            text(FieldKey::ExtensionName),
                        ],
                        ", ",
                    ),
                )
                .entry("LRN", or(FieldKey::Lrn, "Not Applicable"))
                .entry("PSA Birth Certificate No.", or(FieldKey::PsaBirth, NOT_PROVIDED))
                .entry("Birthdate", format_date(text(FieldKey::BirthDate)))
                .entry("Age", age)
                .entry("Sex", or(FieldKey::Sex, EMPTY))
                .entry("Place of Birth", self.birth_place(snapshot).await)
                .entry("Mother Tongue", or(FieldKey::MotherTongue, EMPTY)),
        );

        let current = self
            .address(
                snapshot,
                [
                    FieldKey::CurrentHouseNo,
                    FieldKey::CurrentProvince,
                    FieldKey::CurrentMunicipality,
                    FieldKey::CurrentBarangay,
                    FieldKey::CurrentZipCode,
                ],
            )
            .await;
        let permanent = self
            .address(
                snapshot,
                [
                    FieldKey::PermHouseNo,
                    FieldKey::PermProvince,
                    FieldKey::PermMunicipality,
                    FieldKey::PermBarangay,
                    FieldKey::PermZipCode,
                ],
            )
            .await;
        sections.push(
            ReviewSection::new("Address Information")
                .entry("Current Address", current)
                .entry("Permanent Address", permanent),
        );

        let father = joined(
            &[
                text(FieldKey::FatherFirstName),
                text(FieldKey::FatherMiddleName),
                text(FieldKey::FatherLastName),
            ],
            " ",
        );
        if father != EMPTY {
            sections.push(
                ReviewSection::new("Father's Information")
                    .entry("Name", father)
                    .entry("Contact Number", or(FieldKey::FatherContact, NOT_PROVIDED))
                    .entry("Email", or(FieldKey::FatherEmail, NOT_PROVIDED)),
            );
        }

        let mother = joined(
            &[
                text(FieldKey::MotherFirstName),
                text(FieldKey::MotherMiddleName),
                text(FieldKey::MotherMaidenLast),
            ],
            " ",
        );
        if mother != EMPTY {
            sections.push(
                ReviewSection::new("Mother's Information")
                    .entry("Name", mother)
                    .entry("Contact Number", or(FieldKey::MotherContact, NOT_PROVIDED))
                    .entry("Email", or(FieldKey::MotherEmail, NOT_PROVIDED)),
            );
        }

        if let Some(guardian) = text(FieldKey::GuardianName) {
            sections.push(
                ReviewSection::new("Guardian Information")
                    .entry("Name", guardian)
                    .entry("Contact Number", or(FieldKey::GuardianContact, NOT_PROVIDED)),
            );
        }

        sections.push(
            ReviewSection::new("Additional Information")
                .entry("Learner with Disability", or(FieldKey::HasDisability, NOT_SPECIFIED))
                .entry("Indigenous Peoples Community", or(FieldKey::IndigenousPeople, NOT_SPECIFIED))
                .entry("4Ps Beneficiary", or(FieldKey::FourPs, NOT_SPECIFIED))
                .entry(
                    "Learning Modality",
                    format_modalities(snapshot.value(FieldKey::LearningModality)),
                ),
        );

        if text(FieldKey::Returning) == Some("YES") {
            sections.push(
                ReviewSection::new("Returning Learner Information")
                    .entry(
                        "Last Grade Level Completed",
                        format_grade_level(text(FieldKey::LastGradeLevel)),
                    )
                    .entry("Last School Year Completed", or(FieldKey::LastSchoolYear, EMPTY))
                    .entry("Last School Attended", or(FieldKey::LastSchoolAttended, EMPTY))
                    .entry("School ID", or(FieldKey::SchoolId, EMPTY)),
            );
        }

        let documents_view: Vec<DocumentLine> = DocumentSlotId::all()
            .into_iter()
            .map(|slot| DocumentLine {
                slot,
                label: slot.label(),
                uploaded: documents.is_some_and(|status| status.has(slot)),
            })
            .collect();
        let missing_documents = documents_view
            .iter()
            .filter(|line| line.slot.is_mandatory() && !line.uploaded)
            .map(|line| line.label.to_string())
            .collect();

        let blocked_reason = if !progress.form_completed {
            Some("Please complete the application form first.".to_string())
        } else if !progress.terms_accepted {
            Some("Please accept the terms and conditions to submit.".to_string())
        } else {
            None
        };

        ReviewView {
            sections,
            documents: documents_view,
            missing_documents,
            ready_to_submit: progress.is_ready(),
            blocked_reason,
        }
    }
}
