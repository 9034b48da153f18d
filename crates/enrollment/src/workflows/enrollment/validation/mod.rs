pub mod rules;

use serde::Serialize;

use super::domain::{FieldKey, FieldValue};
use super::registry::{self, FieldKind};
use super::session::FormSession;

const SUMMARY_LIMIT: usize = 3;

/// One invalid field and the reason shown inline next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: FieldKey,
    pub message: String,
}

/// Result of validating the whole form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormReport {
    /// Issues in document order.
    pub errors: Vec<FieldIssue>,
    /// First invalid field; receives focus.
    pub focus: Option<FieldKey>,
    /// At most three messages for the banner above the form.
    pub summary: Vec<String>,
}

impl FormReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Field-level and whole-form checks over a [`FormSession`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FormValidator;

impl FormValidator {
    pub fn new() -> Self {
        Self
    }

    /// Disabled and unrendered fields are always valid. The learning modality group needs at
    /// least one checked box whatever the rest of the form says.
    pub fn validate_field(&self, session: &FormSession, key: FieldKey) -> Result<(), FieldIssue> {
        let Some(state) = session.state(key) else {
            return Ok(());
        };
        let always_required = key == FieldKey::LearningModality;
        if !state.enabled && !always_required {
            return Ok(());
        }

        let spec = registry::spec(key);
        let required = state.required || always_required;
        let value = session.value(key).filter(|value| !value.is_blank());

        let Some(value) = value else {
            if !required {
                return Ok(());
            }
            let message = match spec.kind {
                FieldKind::CheckboxGroup(_) => {
                    format!("Please select at least one {}", spec.label)
                }
                FieldKind::Radio(_) | FieldKind::Select(_) | FieldKind::LocationSelect => {
                    format!("Please select {}", spec.label)
                }
                FieldKind::Text | FieldKind::Date | FieldKind::Checkbox => {
                    format!("{} is required", spec.label)
                }
            };
            return Err(FieldIssue {
                field: key,
                message,
            });
        };

        let FieldValue::Text(text) = value else {
            return Ok(());
        };
        for rule in spec.rules {
            rules::check(*rule, text).map_err(|message| FieldIssue {
                field: key,
                message,
            })?;
        }
        Ok(())
    }

    pub fn validate_form(&self, session: &FormSession) -> FormReport {
        let errors: Vec<FieldIssue> = registry::keys()
            .filter_map(|key| self.validate_field(session, key).err())
            .collect();
        let focus = errors.first().map(|issue| issue.field);
        let summary = errors
            .iter()
            .take(SUMMARY_LIMIT)
            .map(|issue| issue.message.clone())
            .collect();

        FormReport {
            errors,
            focus,
            summary,
        }
    }
}
