use super::common::*;

use crate::workflows::enrollment::conditional::ConditionalFieldController;
use crate::workflows::enrollment::domain::{FieldKey, FieldValue};
use crate::workflows::enrollment::form::hydrate;
use crate::workflows::enrollment::session::FormSession;
use crate::workflows::enrollment::validation::{FieldIssue, FormValidator};

fn hydrated(fields: &[(FieldKey, FieldValue)]) -> FormSession {
    hydrate(
        &snapshot_with(fields, false),
        &ConditionalFieldController::with_today(today()),
    )
}

fn without(key: FieldKey) -> Vec<(FieldKey, FieldValue)> {
    complete_fields()
        .into_iter()
        .filter(|(candidate, _)| *candidate != key)
        .collect()
}

#[test]
fn complete_application_passes() {
    let report = FormValidator::new().validate_form(&hydrated(&complete_fields()));
    assert!(report.is_valid(), "unexpected issues: {:?}", report.errors);
    assert_eq!(report.focus, None);
}

#[test]
fn empty_modality_is_always_invalid() {
    let mut session = hydrated(&without(FieldKey::LearningModality));
    if let Some(state) = session.state_mut(FieldKey::LearningModality) {
        state.enabled = false;
        state.required = false;
    }

    let issue = FormValidator::new()
        .validate_field(&session, FieldKey::LearningModality)
        .expect_err("modality required");
    assert_eq!(
        issue,
        FieldIssue {
            field: FieldKey::LearningModality,
            message: "Please select at least one Preferred Learning Modality".to_string(),
        }
    );

    let set = FieldValue::multi(Vec::<String>::new());
    session.write_value(FieldKey::LearningModality, set);
    assert!(FormValidator::new()
        .validate_field(&session, FieldKey::LearningModality)
        .is_err());
}

#[test]
fn disabled_fields_are_skipped() {
    let mut fields = complete_fields();
    fields.push((FieldKey::Lrn, FieldValue::text("not-a-number")));
    let session = hydrated(&fields);
    assert!(!session.is_enabled(FieldKey::Lrn));
    assert!(FormValidator::new().validate_form(&session).is_valid());
}

#[test]
fn active_groups_make_members_required() {
    let mut fields = without(FieldKey::WithLrn);
    fields.push((FieldKey::WithLrn, FieldValue::text("YES")));
    let report = FormValidator::new().validate_form(&hydrated(&fields));
    assert_eq!(report.focus, Some(FieldKey::Lrn));
    assert_eq!(report.summary, vec!["Learner Reference No. (LRN) is required".to_string()]);
}

#[test]
fn mirrored_permanent_address_is_not_required() {
    let fields: Vec<_> = complete_fields()
        .into_iter()
        .filter(|(key, _)| {
            !matches!(
                key,
                FieldKey::PermProvince | FieldKey::PermMunicipality | FieldKey::PermBarangay
            )
        })
        .collect();

    let unchecked = FormValidator::new().validate_form(&hydrated(&fields));
    assert_eq!(unchecked.errors.len(), 3);
    assert_eq!(unchecked.summary[0], "Please select Permanent Province");

    let checked = hydrate(
        &snapshot_with(&fields, true),
        &ConditionalFieldController::with_today(today()),
    );
    assert!(FormValidator::new().validate_form(&checked).is_valid());
}

#[test]
fn summary_lists_at_most_three_messages_in_document_order() {
    let report = FormValidator::new().validate_form(&FormSession::new());
    assert!(report.errors.len() > 3);
    assert_eq!(report.summary.len(), 3);
    assert_eq!(
        report.summary,
        vec![
            "School Year is required".to_string(),
            "Please select Grade Level to Enroll".to_string(),
            "Please select With LRN?".to_string(),
        ]
    );
}

#[test]
fn format_rules_report_the_first_failure() {
    let mut fields = without(FieldKey::MotherContact);
    fields.push((FieldKey::MotherContact, FieldValue::text("12345")));
    fields.push((FieldKey::FatherEmail, FieldValue::text("father@")));
    let report = FormValidator::new().validate_form(&hydrated(&fields));

    let fields_in_error: Vec<FieldKey> = report.errors.iter().map(|issue| issue.field).collect();
    assert_eq!(fields_in_error, vec![FieldKey::FatherEmail, FieldKey::MotherContact]);
    assert_eq!(report.focus, Some(FieldKey::FatherEmail));
}

#[test]
fn age_outside_the_enrollable_range_is_rejected() {
    let mut fields = without(FieldKey::Age);
    fields.push((FieldKey::Age, FieldValue::text("2")));
    let report = FormValidator::new().validate_form(&hydrated(&fields));
    assert_eq!(report.summary, vec!["Age must be between 3 and 25".to_string()]);
}
