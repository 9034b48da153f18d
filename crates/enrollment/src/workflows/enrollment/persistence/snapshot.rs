use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use super::super::conditional::is_checked;
use super::super::domain::{FieldKey, FieldValue};
use super::super::registry;
use super::super::session::FormSession;

/// The unit written to the session store after every change.
///
/// The same-address checkbox travels as a dedicated flag rather than a field value so restore
/// can re-apply it only after the current address has been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedFormSnapshot {
    #[serde(deserialize_with = "known_fields")]
    pub fields: BTreeMap<FieldKey, FieldValue>,
    #[serde(default)]
    pub same_address: bool,
    pub last_saved: DateTime<Utc>,
}

/// Drop identifiers the registry no longer knows instead of failing the whole snapshot.
fn known_fields<'de, D>(deserializer: D) -> Result<BTreeMap<FieldKey, FieldValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, FieldValue>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(id, value)| match registry::find_by_id(&id) {
            Some(spec) => Some((spec.key, value)),
            None => {
                debug!(field = %id, "ignoring unknown snapshot field");
                None
            }
        })
        .collect())
}

impl PersistedFormSnapshot {
    pub fn capture(session: &FormSession, now: DateTime<Utc>) -> Self {
        let same_address = session
            .text(FieldKey::SameAddress)
            .map(is_checked)
            .unwrap_or(false);
        let fields = session
            .values()
            .iter()
            .filter(|(key, _)| **key != FieldKey::SameAddress)
            .map(|(key, value)| (*key, value.clone()))
            .collect();

        Self {
            fields,
            same_address,
            last_saved: now,
        }
    }

    pub fn value(&self, key: FieldKey) -> Option<&FieldValue> {
        self.fields.get(&key)
    }

    /// Trimmed scalar value, `None` when blank or absent.
    pub fn text(&self, key: FieldKey) -> Option<&str> {
        self.fields
            .get(&key)
            .and_then(FieldValue::as_text)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Values as they should be written back into a session, same-address flag included.
    pub fn restored_values(&self) -> BTreeMap<FieldKey, FieldValue> {
        let mut values = self.fields.clone();
        values.remove(&FieldKey::SameAddress);
        if self.same_address {
            values.insert(FieldKey::SameAddress, FieldValue::text("true"));
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_are_ignored_on_load() {
        let raw = r#"{
            "fields": {"firstName": "Maria", "favouriteColour": "blue"},
            "sameAddress": true,
            "lastSaved": "2026-06-01T08:00:00Z"
        }"#;
        let snapshot: PersistedFormSnapshot = serde_json::from_str(raw).expect("snapshot parses");
        assert_eq!(snapshot.fields.len(), 1);
        assert_eq!(snapshot.text(FieldKey::FirstName), Some("Maria"));
        assert!(snapshot.same_address);
    }

    #[test]
    fn same_address_travels_as_flag() {
        let mut session = FormSession::new();
        session.write_value(FieldKey::SameAddress, FieldValue::text("true"));
        session.write_value(FieldKey::LastName, FieldValue::text("Santos"));
        let snapshot = PersistedFormSnapshot::capture(&session, Utc::now());
        assert!(snapshot.same_address);
        assert!(snapshot.value(FieldKey::SameAddress).is_none());
        assert_eq!(
            snapshot.restored_values().get(&FieldKey::SameAddress),
            Some(&FieldValue::text("true"))
        );
    }
}
