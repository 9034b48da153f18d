use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::config::FormConfig;
use crate::workflows::enrollment::conditional::ConditionalFieldController;
use crate::workflows::enrollment::domain::{FieldKey, FieldValue, LocationLevel, LocationNode};
use crate::workflows::enrollment::form::EnrollmentForm;
use crate::workflows::enrollment::location::{
    LocationHierarchyResolver, LocationLookup, LookupError, StaticLocationLookup,
};
use crate::workflows::enrollment::navigation::{Identity, IdentityProvider};
use crate::workflows::enrollment::persistence::{MemorySessionStore, PersistedFormSnapshot};
use crate::workflows::enrollment::submission::{
    ApplicationRepository, RepositoryError, SubmittedApplication,
};

pub(super) const BULACAN: &str = "031400000";
pub(super) const MALOLOS: &str = "031410000";
pub(super) const ATLAG: &str = "031410001";
pub(super) const BAGNA: &str = "031410002";
pub(super) const BALIUAG: &str = "031402000";
pub(super) const PAMPANGA: &str = "035400000";
pub(super) const SAN_FERNANDO: &str = "035416000";
pub(super) const DOLORES: &str = "035416007";

pub(super) const QUOTA: usize = 5 * 1024 * 1024;

fn node(level: LocationLevel, code: &str, name: &str, parent: Option<&str>) -> LocationNode {
    LocationNode {
        code: code.to_string(),
        name: name.to_string(),
        level,
        parent_code: parent.map(str::to_string),
    }
}

pub(super) fn registry_nodes() -> Vec<LocationNode> {
    use LocationLevel::{Barangay, CityMunicipality, Province};
    vec![
        node(Province, PAMPANGA, "Pampanga", None),
        node(Province, BULACAN, "Bulacan", None),
        node(CityMunicipality, MALOLOS, "City of Malolos", Some(BULACAN)),
        node(CityMunicipality, BALIUAG, "Baliuag", Some(BULACAN)),
        node(CityMunicipality, SAN_FERNANDO, "City of San Fernando", Some(PAMPANGA)),
        node(Barangay, BAGNA, "Bagna", Some(MALOLOS)),
        node(Barangay, ATLAG, "Atlag", Some(MALOLOS)),
        node(Barangay, DOLORES, "Dolores", Some(SAN_FERNANDO)),
    ]
}

pub(super) fn registry() -> StaticLocationLookup {
    StaticLocationLookup::new(registry_nodes())
}

/// Registry wrapper counting calls per level.
#[derive(Default)]
pub(super) struct CountingLookup {
    inner: StaticLocationLookup,
    provinces: AtomicUsize,
    cities: AtomicUsize,
    barangays: AtomicUsize,
}

impl CountingLookup {
    pub(super) fn new() -> Self {
        Self {
            inner: registry(),
            ..Self::default()
        }
    }

    pub(super) fn calls(&self, level: LocationLevel) -> usize {
        match level {
            LocationLevel::Province => self.provinces.load(Ordering::SeqCst),
            LocationLevel::CityMunicipality => self.cities.load(Ordering::SeqCst),
            LocationLevel::Barangay => self.barangays.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl LocationLookup for CountingLookup {
    async fn provinces(&self) -> Result<Vec<LocationNode>, LookupError> {
        self.provinces.fetch_add(1, Ordering::SeqCst);
        self.inner.provinces().await
    }

    async fn cities(&self, province_code: &str) -> Result<Vec<LocationNode>, LookupError> {
        self.cities.fetch_add(1, Ordering::SeqCst);
        self.inner.cities(province_code).await
    }

    async fn barangays(&self, city_code: &str) -> Result<Vec<LocationNode>, LookupError> {
        self.barangays.fetch_add(1, Ordering::SeqCst);
        self.inner.barangays(city_code).await
    }
}

/// Registry whose listings below the province level are unreachable.
pub(super) struct UnreachableChildren {
    inner: StaticLocationLookup,
}

impl UnreachableChildren {
    pub(super) fn new() -> Self {
        Self { inner: registry() }
    }
}

#[async_trait]
impl LocationLookup for UnreachableChildren {
    async fn provinces(&self) -> Result<Vec<LocationNode>, LookupError> {
        self.inner.provinces().await
    }

    async fn cities(&self, _province_code: &str) -> Result<Vec<LocationNode>, LookupError> {
        Err(LookupError::Network("connection reset".to_string()))
    }

    async fn barangays(&self, _city_code: &str) -> Result<Vec<LocationNode>, LookupError> {
        Err(LookupError::Network("connection reset".to_string()))
    }
}

pub(super) fn resolver<L: LocationLookup>(lookup: L) -> Arc<LocationHierarchyResolver<L>> {
    Arc::new(LocationHierarchyResolver::new(Arc::new(lookup)))
}

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 15).expect("valid date")
}

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 8, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn build_form(
    store: Arc<MemorySessionStore>,
) -> EnrollmentForm<StaticLocationLookup, MemorySessionStore> {
    EnrollmentForm::new(resolver(registry()), store, &FormConfig::default())
        .with_controller(ConditionalFieldController::with_today(today()))
}

pub(super) fn text(value: &str) -> FieldValue {
    FieldValue::text(value)
}

/// A snapshot of a learner with a fully selected current address in Malolos.
pub(super) fn snapshot_with(fields: &[(FieldKey, FieldValue)], same_address: bool) -> PersistedFormSnapshot {
    PersistedFormSnapshot {
        fields: fields.iter().cloned().collect(),
        same_address,
        last_saved: now(),
    }
}

pub(super) fn complete_fields() -> Vec<(FieldKey, FieldValue)> {
    vec![
        (FieldKey::SchoolYear, text("2026-2027")),
        (FieldKey::GradeLevel, text("GRADE_1")),
        (FieldKey::WithLrn, text("NO")),
        (FieldKey::Returning, text("NO")),
        (FieldKey::LastName, text("Dela Cruz")),
        (FieldKey::FirstName, text("Juan")),
        (FieldKey::MiddleName, text("Santos")),
        (FieldKey::BirthDate, text("2019-03-04")),
        (FieldKey::Age, text("7")),
        (FieldKey::Sex, text("MALE")),
        (FieldKey::BirthProvince, text(BULACAN)),
        (FieldKey::BirthCity, text(MALOLOS)),
        (FieldKey::CurrentHouseNo, text("12 Mabini St.")),
        (FieldKey::CurrentProvince, text(BULACAN)),
        (FieldKey::CurrentMunicipality, text(MALOLOS)),
        (FieldKey::CurrentBarangay, text(ATLAG)),
        (FieldKey::CurrentZipCode, text("3000")),
        (FieldKey::PermHouseNo, text("12 Mabini St.")),
        (FieldKey::PermProvince, text(BULACAN)),
        (FieldKey::PermMunicipality, text(MALOLOS)),
        (FieldKey::PermBarangay, text(ATLAG)),
        (FieldKey::PermZipCode, text("3000")),
        (FieldKey::MotherMaidenLast, text("Santos")),
        (FieldKey::MotherFirstName, text("Maria")),
        (FieldKey::MotherContact, text("0917 123 4567")),
        (
            FieldKey::LearningModality,
            FieldValue::multi(["FACE_TO_FACE", "BLENDED"]),
        ),
    ]
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<String, Vec<SubmittedApplication>>>>,
}

impl MemoryRepository {
    pub(super) fn stored(&self, user_id: &str) -> Vec<SubmittedApplication> {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ApplicationRepository for MemoryRepository {
    async fn insert(
        &self,
        user_id: &str,
        application: SubmittedApplication,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let entries = guard.entry(user_id.to_string()).or_default();
        if entries
            .iter()
            .any(|existing| existing.reference_number == application.reference_number)
        {
            return Err(RepositoryError::Conflict(application.reference_number));
        }
        entries.push(application);
        Ok(())
    }

    async fn latest_for(
        &self,
        user_id: &str,
    ) -> Result<Option<SubmittedApplication>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .get(user_id)
            .and_then(|entries| entries.iter().max_by_key(|app| app.submitted_at))
            .cloned())
    }
}

pub(super) struct UnavailableRepository;

#[async_trait]
impl ApplicationRepository for UnavailableRepository {
    async fn insert(
        &self,
        _user_id: &str,
        _application: SubmittedApplication,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    async fn latest_for(
        &self,
        _user_id: &str,
    ) -> Result<Option<SubmittedApplication>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }
}

pub(super) struct FixedIdentity(pub(super) Option<Identity>);

impl FixedIdentity {
    pub(super) fn verified(user_id: &str) -> Self {
        Self(Some(Identity {
            user_id: user_id.to_string(),
            email_verified: true,
        }))
    }
}

impl IdentityProvider for FixedIdentity {
    fn current_user(&self) -> Option<Identity> {
        self.0.clone()
    }
}
