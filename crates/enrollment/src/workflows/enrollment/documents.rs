//! Staging area for supporting documents.
//!
//! Files are kept in memory and mirrored to the session store as data URLs under
//! `document_<slot>`. A store that runs out of room does not reject the upload; the slot stays
//! staged in memory and a persistent warning says the copy may not survive navigation.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use mime::Mime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::FormConfig;

use super::notices::{self, ContinueDecision, NoticeLevel, NoticeQueue};
use super::persistence::state_store::{read_json, remove_key, write_json};
use super::persistence::{keys, SaveOutcome, SessionStore};

pub const MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

pub const UPLOAD_STORAGE_WARNING: &str =
    "Browser storage is full. Uploaded files are kept on this page only and may be lost if you reload or leave it";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DocumentSlotId {
    #[serde(rename = "birth-cert")]
    BirthCertificate,
    #[serde(rename = "report-card")]
    ReportCard,
    #[serde(rename = "id-photo")]
    IdPhoto,
    #[serde(rename = "moral-cert")]
    GoodMoral,
}

impl DocumentSlotId {
    pub const fn all() -> [Self; 4] {
        [
            Self::BirthCertificate,
            Self::ReportCard,
            Self::IdPhoto,
            Self::GoodMoral,
        ]
    }

    pub const fn id(self) -> &'static str {
        match self {
            Self::BirthCertificate => "birth-cert",
            Self::ReportCard => "report-card",
            Self::IdPhoto => "id-photo",
            Self::GoodMoral => "moral-cert",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::all().into_iter().find(|slot| slot.id() == id)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::BirthCertificate => "Birth Certificate",
            Self::ReportCard => "Report Card",
            Self::IdPhoto => "2x2 Photo of the Student",
            Self::GoodMoral => "Good Moral Certificate",
        }
    }

    pub const fn is_mandatory(self) -> bool {
        matches!(self, Self::BirthCertificate | Self::IdPhoto)
    }

    /// The ID photo takes images only; certificates and report cards also take PDF scans.
    pub fn accepts(self, mime: &Mime) -> bool {
        let image = mime.type_() == mime::IMAGE
            && (mime.subtype() == mime::JPEG || mime.subtype() == mime::PNG || mime.subtype() == "jpg");
        let pdf = mime.type_() == mime::APPLICATION && mime.subtype() == mime::PDF;
        match self {
            Self::IdPhoto => image,
            Self::BirthCertificate | Self::ReportCard | Self::GoodMoral => image || pdf,
        }
    }
}

impl fmt::Display for DocumentSlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A file handed over by the upload control.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// A staged document as stored in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSlot {
    pub slot_id: DocumentSlotId,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    /// `data:<mime>;base64,<payload>`
    pub encoded_content: String,
    pub uploaded_at: DateTime<Utc>,
}

impl DocumentSlot {
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        let payload = self
            .encoded_content
            .split_once(";base64,")
            .map(|(_, payload)| payload)
            .unwrap_or(&self.encoded_content);
        STANDARD.decode(payload)
    }
}

fn unsupported_message(slot: &DocumentSlotId) -> &'static str {
    match slot {
        DocumentSlotId::IdPhoto => "Student Photo must be JPG or PNG format only",
        _ => "Only PDF, JPG, and PNG files are allowed",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileRejected {
    #[error("File size must be less than 5MB")]
    TooLarge { size: u64, limit: u64 },
    #[error("{}", unsupported_message(.slot))]
    UnsupportedType { slot: DocumentSlotId, mime_type: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemovalError {
    #[error("no document staged for {0}")]
    NotStaged(DocumentSlotId),
    #[error("no removal awaiting confirmation")]
    NothingPending,
}

/// Result of a successful [`DocumentStaging::accept`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedUpload {
    pub slot: DocumentSlot,
    pub durability: SaveOutcome,
}

/// Persisted summary of what has been staged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStatus {
    pub birth_cert: bool,
    pub report_card: bool,
    pub id_photo: bool,
    pub moral_cert: bool,
    pub timestamp: DateTime<Utc>,
    pub total_uploaded: usize,
    pub pending_documents: Vec<String>,
    pub has_all_required: bool,
}

impl DocumentStatus {
    pub fn has(&self, slot: DocumentSlotId) -> bool {
        match slot {
            DocumentSlotId::BirthCertificate => self.birth_cert,
            DocumentSlotId::ReportCard => self.report_card,
            DocumentSlotId::IdPhoto => self.id_photo,
            DocumentSlotId::GoodMoral => self.moral_cert,
        }
    }

    /// Status with nothing uploaded.
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self::from_presence(|_| false, now)
    }

    fn from_presence(has: impl Fn(DocumentSlotId) -> bool, now: DateTime<Utc>) -> Self {
        let pending_documents: Vec<String> = DocumentSlotId::all()
            .into_iter()
            .filter(|slot| slot.is_mandatory() && !has(*slot))
            .map(|slot| slot.label().to_string())
            .collect();
        let total_uploaded = DocumentSlotId::all()
            .into_iter()
            .filter(|slot| has(*slot))
            .count();

        Self {
            birth_cert: has(DocumentSlotId::BirthCertificate),
            report_card: has(DocumentSlotId::ReportCard),
            id_photo: has(DocumentSlotId::IdPhoto),
            moral_cert: has(DocumentSlotId::GoodMoral),
            timestamp: now,
            total_uploaded,
            has_all_required: pending_documents.is_empty(),
            pending_documents,
        }
    }
}

/// Per-slot upload buffer backed by a session store.
pub struct DocumentStaging<S> {
    store: Arc<S>,
    slots: BTreeMap<DocumentSlotId, DocumentSlot>,
    pending_removal: Option<DocumentSlotId>,
    notices: NoticeQueue,
    memory_only: bool,
    confirm_wait: Duration,
}

impl<S> DocumentStaging<S>
where
    S: SessionStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, &FormConfig::default())
    }

    /// Size the notice queue and the missing-documents wait from the form settings.
    pub fn with_config(store: Arc<S>, config: &FormConfig) -> Self {
        Self {
            store,
            slots: BTreeMap::new(),
            pending_removal: None,
            notices: NoticeQueue::new(config.notice_capacity),
            memory_only: false,
            confirm_wait: config.confirm_wait,
        }
    }

    pub fn notices(&self) -> &NoticeQueue {
        &self.notices
    }

    pub fn notices_mut(&mut self) -> &mut NoticeQueue {
        &mut self.notices
    }

    /// Whether the last upload could not be mirrored to the session store.
    pub fn is_memory_only(&self) -> bool {
        self.memory_only
    }

    /// Validate, encode and stage a file. A re-upload replaces the slot.
    pub fn accept(
        &mut self,
        file: IncomingFile,
        slot: DocumentSlotId,
        now: DateTime<Utc>,
    ) -> Result<StagedUpload, FileRejected> {
        let size = file.bytes.len() as u64;
        if size > MAX_FILE_BYTES {
            return Err(FileRejected::TooLarge {
                size,
                limit: MAX_FILE_BYTES,
            });
        }
        let supported = file
            .mime_type
            .parse::<Mime>()
            .map(|mime| slot.accepts(&mime))
            .unwrap_or(false);
        if !supported {
            return Err(FileRejected::UnsupportedType {
                slot,
                mime_type: file.mime_type,
            });
        }

        let encoded_content = format!(
            "data:{};base64,{}",
            file.mime_type,
            STANDARD.encode(&file.bytes)
        );
        let staged = DocumentSlot {
            slot_id: slot,
            file_name: file.file_name,
            mime_type: file.mime_type,
            size_bytes: size,
            encoded_content,
            uploaded_at: now,
        };

        let durability = write_json(self.store.as_ref(), &keys::document(slot.id()), &staged);
        if durability.is_persisted() {
            self.memory_only = false;
        } else {
            // A stale copy from an earlier upload would resurrect on the next visit.
            remove_key(self.store.as_ref(), &keys::document(slot.id()));
            if !self.memory_only {
                self.memory_only = true;
                self.notices
                    .push_persistent(NoticeLevel::Warning, UPLOAD_STORAGE_WARNING);
            }
        }
        info!(
            slot = %slot,
            bytes = size,
            persisted = durability.is_persisted(),
            "document staged"
        );
        self.slots.insert(slot, staged.clone());
        self.save_status(now);

        Ok(StagedUpload {
            slot: staged,
            durability,
        })
    }

    pub fn slot(&self, slot: DocumentSlotId) -> Option<&DocumentSlot> {
        self.slots.get(&slot)
    }

    fn has(&self, slot: DocumentSlotId) -> bool {
        self.slots.contains_key(&slot)
            || matches!(self.store.get(&keys::document(slot.id())), Ok(Some(_)))
    }

    pub fn status(&self, now: DateTime<Utc>) -> DocumentStatus {
        DocumentStatus::from_presence(|slot| self.has(slot), now)
    }

    /// Write the status summary and the coarse `documentsUploaded` marker.
    pub fn save_status(&self, now: DateTime<Utc>) -> DocumentStatus {
        let status = self.status(now);
        write_json(self.store.as_ref(), keys::DOCUMENT_STATUS, &status);
        let marker = if status.total_uploaded > 0 { "partial" } else { "none" };
        if let Err(err) = self.store.set(keys::DOCUMENTS_UPLOADED, marker.to_string()) {
            warn!(error = %err, "could not record upload marker");
        }
        status
    }

    /// First half of removal; nothing changes until [`confirm_removal`](Self::confirm_removal).
    /// Decide whether leaving the upload step needs the missing-documents confirmation.
    pub fn plan_continue(&self, now: DateTime<Utc>) -> ContinueDecision {
        notices::plan_continue(&self.status(now), self.store.as_ref(), now, self.confirm_wait)
    }

    pub fn request_removal(&mut self, slot: DocumentSlotId) -> Result<(), RemovalError> {
        if !self.has(slot) {
            return Err(RemovalError::NotStaged(slot));
        }
        self.pending_removal = Some(slot);
        Ok(())
    }

    pub fn pending_removal(&self) -> Option<DocumentSlotId> {
        self.pending_removal
    }

    pub fn confirm_removal(&mut self, now: DateTime<Utc>) -> Result<DocumentSlotId, RemovalError> {
        let slot = self
            .pending_removal
            .take()
            .ok_or(RemovalError::NothingPending)?;
        self.slots.remove(&slot);
        remove_key(self.store.as_ref(), &keys::document(slot.id()));
        self.save_status(now);
        info!(slot = %slot, "document removed");
        Ok(slot)
    }

    pub fn cancel_removal(&mut self) {
        self.pending_removal = None;
    }

    /// Reload staged documents from the session store, discarding unreadable entries.
    pub fn restore_from_store(&mut self) -> Vec<DocumentSlotId> {
        let mut restored = Vec::new();
        for slot in DocumentSlotId::all() {
            let key = keys::document(slot.id());
            let Ok(Some(_)) = self.store.get(&key) else {
                continue;
            };
            match read_json::<_, DocumentSlot>(self.store.as_ref(), &key) {
                Some(staged) if staged.slot_id == slot && staged.decode().is_ok() => {
                    self.slots.insert(slot, staged);
                    restored.push(slot);
                }
                _ => {
                    warn!(slot = %slot, "discarding corrupt staged document");
                    remove_key(self.store.as_ref(), &key);
                }
            }
        }
        restored
    }
}

/// Human-readable size with up to two decimals: `0 Bytes`, `512 Bytes`, `1.5 MB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rendered = format!("{value:.2}");
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{rendered} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_drop_trailing_zeros() {
        assert_eq!(format_size(0), "0 Bytes");
        assert_eq!(format_size(512), "512 Bytes");
        assert_eq!(format_size(1536 * 1024), "1.5 MB");
        assert_eq!(format_size(2 * 1024 * 1024), "2 MB");
    }

    #[test]
    fn id_photo_rejects_pdf() {
        let pdf: Mime = "application/pdf".parse().expect("mime parses");
        assert!(!DocumentSlotId::IdPhoto.accepts(&pdf));
        assert!(DocumentSlotId::ReportCard.accepts(&pdf));
        let jpg: Mime = "image/jpg".parse().expect("mime parses");
        assert!(DocumentSlotId::IdPhoto.accepts(&jpg));
    }

    #[test]
    fn slot_ids_round_trip_through_serde_names() {
        for slot in DocumentSlotId::all() {
            let encoded = serde_json::to_value(slot).expect("slot serializes");
            assert_eq!(encoded, serde_json::Value::String(slot.id().to_string()));
        }
    }
}
