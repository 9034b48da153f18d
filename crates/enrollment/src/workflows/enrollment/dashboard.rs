//! Learner dashboard: a read-only projection of the submitted application.

use serde::Serialize;

use super::documents::{DocumentSlotId, DocumentStatus};
use super::domain::FieldKey;
use super::persistence::PersistedFormSnapshot;
use super::review::{format_date, format_grade_level};
use super::submission::{SubmissionStatus, SubmittedApplication};

const PENDING_REFERENCE: &str = "PENDING";
const NOT_PROVIDED: &str = "Not Provided";
const NOT_SPECIFIED: &str = "Not Specified";
const NOT_APPLICABLE: &str = "Not Applicable";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentReview {
    Verified,
    NotUploaded,
}

impl DocumentReview {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Verified => "VERIFIED",
            Self::NotUploaded => "NOT UPLOADED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDocument {
    pub slot: DocumentSlotId,
    pub label: &'static str,
    pub review: DocumentReview,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub reference_number: String,
    pub status: SubmissionStatus,
    pub status_label: &'static str,
    pub grade_level: String,
    pub date_applied: String,
    pub student_name: String,
    pub lrn: String,
    pub birth_date: String,
    pub email: String,
    pub contact: String,
    pub documents: Vec<DashboardDocument>,
}

impl DashboardView {
    pub fn project(application: &SubmittedApplication) -> Self {
        let data = &application.application_data;
        let reference_number = match application.reference_number.trim() {
            "" => PENDING_REFERENCE.to_string(),
            reference => reference.to_string(),
        };

        Self {
            reference_number,
            status: application.status,
            status_label: application.status.label(),
            grade_level: data
                .text(FieldKey::GradeLevel)
                .map(|grade| format_grade_level(Some(grade)))
                .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
            date_applied: application
                .submitted_at
                .format("%B %-d, %Y")
                .to_string(),
            student_name: full_name(data),
            lrn: data
                .text(FieldKey::Lrn)
                .unwrap_or(NOT_APPLICABLE)
                .to_string(),
            birth_date: data
                .text(FieldKey::BirthDate)
                .map(|raw| format_date(Some(raw)))
                .unwrap_or_else(|| NOT_PROVIDED.to_string()),
            email: first_of(data, &[FieldKey::MotherEmail, FieldKey::FatherEmail]),
            contact: first_of(
                data,
                &[
                    FieldKey::MotherContact,
                    FieldKey::FatherContact,
                    FieldKey::GuardianContact,
                ],
            ),
            documents: document_lines(application.document_status.as_ref()),
        }
    }
}

fn full_name(data: &PersistedFormSnapshot) -> String {
    let parts: Vec<&str> = [
        FieldKey::FirstName,
        FieldKey::MiddleName,
        FieldKey::LastName,
        FieldKey::ExtensionName,
    ]
    .into_iter()
    .filter_map(|key| data.text(key))
    .collect();
    if parts.is_empty() {
        NOT_PROVIDED.to_string()
    } else {
        parts.join(" ")
    }
}

fn first_of(data: &PersistedFormSnapshot, keys: &[FieldKey]) -> String {
    keys.iter()
        .find_map(|key| data.text(*key))
        .unwrap_or(NOT_PROVIDED)
        .to_string()
}

/// Every slot gets a line; a missing status means nothing was uploaded.
fn document_lines(status: Option<&DocumentStatus>) -> Vec<DashboardDocument> {
    DocumentSlotId::all()
        .into_iter()
        .map(|slot| DashboardDocument {
            slot,
            label: slot.label(),
            review: if status.is_some_and(|status| status.has(slot)) {
                DocumentReview::Verified
            } else {
                DocumentReview::NotUploaded
            },
        })
        .collect()
}
