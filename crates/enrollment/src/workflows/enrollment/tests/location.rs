use super::common::*;
use std::sync::Arc;

use crate::config::FormConfig;
use crate::workflows::enrollment::domain::{
    AddressError, AddressKind, FieldKey, FieldValue, LocationLevel,
};
use crate::workflows::enrollment::form::EnrollmentForm;
use crate::workflows::enrollment::location::{LoadOutcome, LocationLookup, LookupError};
use crate::workflows::enrollment::persistence::MemorySessionStore;
use crate::workflows::enrollment::session::FormSession;

#[test]
fn child_selection_requires_a_parent() {
    let mut session = FormSession::new();
    match session.select_location(AddressKind::Current, LocationLevel::CityMunicipality, Some(MALOLOS)) {
        Err(AddressError::MissingParent { kind, level }) => {
            assert_eq!(kind, AddressKind::Current);
            assert_eq!(level, LocationLevel::CityMunicipality);
        }
        other => panic!("expected missing parent, got {other:?}"),
    }
    assert!(session.value(FieldKey::CurrentMunicipality).is_none());
}

#[test]
fn birth_chain_has_no_barangay() {
    let mut session = FormSession::new();
    let result = session.select_location(AddressKind::Birth, LocationLevel::Barangay, Some(ATLAG));
    assert_eq!(
        result,
        Err(AddressError::LevelNotRendered {
            kind: AddressKind::Birth,
            level: LocationLevel::Barangay,
        })
    );
}

#[tokio::test]
async fn late_response_for_abandoned_parent_is_discarded() {
    let lookup = registry();
    let mut session = FormSession::new();
    let provinces = session
        .begin_location_load(AddressKind::Current, LocationLevel::Province)
        .expect("province load issued");
    session.apply_location_load(&provinces, lookup.provinces().await);

    let first = session
        .select_location(AddressKind::Current, LocationLevel::Province, Some(BULACAN))
        .expect("province accepted")
        .expect("city load issued");
    let second = session
        .select_location(AddressKind::Current, LocationLevel::Province, Some(PAMPANGA))
        .expect("province accepted")
        .expect("city load issued");
    assert!(second.token > first.token);

    let bulacan_cities = lookup.cities(BULACAN).await;
    let pampanga_cities = lookup.cities(PAMPANGA).await;

    assert_eq!(
        session.apply_location_load(&second, pampanga_cities),
        LoadOutcome::Applied { selected: None }
    );
    assert_eq!(
        session.apply_location_load(&first, bulacan_cities),
        LoadOutcome::Superseded
    );

    let select = session
        .select(FieldKey::CurrentMunicipality)
        .expect("select rendered");
    let codes: Vec<&str> = select.options.iter().map(|n| n.code.as_str()).collect();
    assert_eq!(codes, vec![SAN_FERNANDO]);
    assert!(select.enabled);
}

#[tokio::test]
async fn clearing_a_province_clears_and_disables_descendants() {
    let mut form = build_form(Arc::new(MemorySessionStore::new(QUOTA)));
    form.open().await;

    form.set_field(FieldKey::CurrentProvince, text(BULACAN))
        .await
        .expect("province accepted");
    form.set_field(FieldKey::CurrentMunicipality, text(MALOLOS))
        .await
        .expect("city accepted");
    form.set_field(FieldKey::CurrentBarangay, text(ATLAG))
        .await
        .expect("barangay accepted");

    form.set_field(FieldKey::CurrentProvince, text(""))
        .await
        .expect("province cleared");

    let session = form.session();
    assert!(session.value(FieldKey::CurrentProvince).is_none());
    assert!(session.value(FieldKey::CurrentMunicipality).is_none());
    assert!(session.value(FieldKey::CurrentBarangay).is_none());
    for key in [FieldKey::CurrentMunicipality, FieldKey::CurrentBarangay] {
        let select = session.select(key).expect("select rendered");
        assert!(!select.enabled, "{key} should be disabled");
        assert!(select.options.is_empty());
    }
}

#[tokio::test]
async fn selecting_a_province_loads_sorted_cities() {
    let mut form = build_form(Arc::new(MemorySessionStore::new(QUOTA)));
    form.open().await;

    let update = form
        .set_field(FieldKey::CurrentProvince, text(BULACAN))
        .await
        .expect("province accepted");
    assert_eq!(update.loads, vec![LoadOutcome::Applied { selected: None }]);

    let cities = form
        .session()
        .select(FieldKey::CurrentMunicipality)
        .expect("select rendered");
    let names: Vec<&str> = cities.options.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["Baliuag", "City of Malolos"]);

    let view = form.session().view();
    let offered = &view.selects[&FieldKey::CurrentMunicipality];
    let labels: Vec<(&str, &str)> = offered
        .options
        .iter()
        .map(|option| (option.node.code.as_str(), option.label.as_str()))
        .collect();
    assert_eq!(labels, vec![(BALIUAG, "BALIUAG"), (MALOLOS, "CITY OF MALOLOS")]);
    assert!(!form
        .session()
        .select(FieldKey::CurrentBarangay)
        .expect("select rendered")
        .enabled);
}

#[tokio::test]
async fn codes_outside_the_listing_are_rejected() {
    let mut form = build_form(Arc::new(MemorySessionStore::new(QUOTA)));
    form.open().await;
    form.set_field(FieldKey::CurrentProvince, text(BULACAN))
        .await
        .expect("province accepted");

    let err = form
        .set_field(FieldKey::CurrentMunicipality, text(SAN_FERNANDO))
        .await
        .expect_err("city from another province");
    assert!(matches!(
        err,
        crate::workflows::enrollment::form::FormError::Address(AddressError::UnknownCode { .. })
    ));
}

#[tokio::test]
async fn lookup_failure_keeps_stored_codes() {
    let store = Arc::new(MemorySessionStore::new(QUOTA));
    let mut form = EnrollmentForm::new(resolver(UnreachableChildren::new()), store, &FormConfig::default());
    let snapshot = snapshot_with(
        &[
            (FieldKey::CurrentProvince, text(BULACAN)),
            (FieldKey::CurrentMunicipality, text(MALOLOS)),
            (FieldKey::CurrentBarangay, text(ATLAG)),
        ],
        false,
    );

    let report = form.restore(&snapshot).await;
    let current = report
        .chains
        .iter()
        .find(|(kind, _)| *kind == AddressKind::Current)
        .map(|(_, outcomes)| outcomes.clone())
        .expect("current chain resolved");
    assert!(matches!(
        current.as_slice(),
        [LoadOutcome::Applied { selected: Some(_) }, LoadOutcome::Failed(LookupError::Network(_))]
    ));

    let session = form.session();
    let city = session.select(FieldKey::CurrentMunicipality).expect("select rendered");
    assert!(!city.enabled);
    assert!(city.error.is_some());
    assert!(!session.select(FieldKey::CurrentBarangay).expect("select rendered").enabled);
    assert_eq!(session.text(FieldKey::CurrentMunicipality), Some(MALOLOS));
    assert_eq!(session.text(FieldKey::CurrentBarangay), Some(ATLAG));
}

#[tokio::test]
async fn failed_select_rejects_codes() {
    let store = Arc::new(MemorySessionStore::new(QUOTA));
    let mut form = EnrollmentForm::new(resolver(UnreachableChildren::new()), store, &FormConfig::default());
    form.open().await;
    let update = form
        .set_field(FieldKey::CurrentProvince, text(BULACAN))
        .await
        .expect("provinces still load");
    assert!(matches!(
        update.loads.as_slice(),
        [LoadOutcome::Failed(LookupError::Network(_))]
    ));

    let err = form
        .set_field(FieldKey::CurrentMunicipality, text("BOGUS"))
        .await
        .expect_err("city select never loaded");
    assert_eq!(
        err,
        crate::workflows::enrollment::form::FormError::Address(AddressError::Unavailable(
            FieldKey::CurrentMunicipality
        ))
    );
    assert_eq!(form.session().text(FieldKey::CurrentMunicipality), None);
    assert!(form.validate_field(FieldKey::CurrentMunicipality).is_err());
}

#[test]
fn unloaded_select_rejects_codes() {
    let mut session = FormSession::new();
    assert_eq!(
        session.select_location(AddressKind::Current, LocationLevel::Province, Some(BULACAN)),
        Err(AddressError::Unavailable(FieldKey::CurrentProvince))
    );
    assert_eq!(
        session.select_location(AddressKind::Current, LocationLevel::Province, None),
        Ok(None)
    );
}

#[tokio::test]
async fn listings_are_fetched_once_per_parent() {
    let lookup = Arc::new(CountingLookup::new());
    let resolver = crate::workflows::enrollment::location::LocationHierarchyResolver::new(
        Arc::clone(&lookup),
    );

    let first = resolver.list_provinces().await.expect("provinces");
    let second = resolver.list_provinces().await.expect("provinces");
    assert_eq!(first, second);
    assert_eq!(lookup.calls(LocationLevel::Province), 1);
    let names: Vec<&str> = first.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["Bulacan", "Pampanga"]);

    resolver
        .list_children(LocationLevel::CityMunicipality, BULACAN)
        .await
        .expect("cities");
    assert_eq!(
        resolver.resolve_name(LocationLevel::CityMunicipality, MALOLOS, Some(BULACAN)).await,
        "City of Malolos"
    );
    assert_eq!(lookup.calls(LocationLevel::CityMunicipality), 1);
}

#[tokio::test]
async fn unresolvable_names_fall_back_to_the_code() {
    let resolver = resolver(UnreachableChildren::new());
    let name = resolver
        .resolve_name(LocationLevel::Barangay, ATLAG, Some(MALOLOS))
        .await;
    assert_eq!(name, ATLAG);
}

#[tokio::test]
async fn location_fields_reject_sets() {
    let mut form = build_form(Arc::new(MemorySessionStore::new(QUOTA)));
    form.open().await;
    form.set_field(FieldKey::CurrentProvince, text(BULACAN))
        .await
        .expect("province accepted");

    let err = form
        .set_field(FieldKey::CurrentProvince, FieldValue::multi([PAMPANGA]))
        .await
        .expect_err("sets are not codes");
    assert_eq!(
        err,
        crate::workflows::enrollment::form::FormError::Field(
            crate::workflows::enrollment::session::FieldError::ExpectsText(FieldKey::CurrentProvince)
        )
    );
    assert_eq!(form.session().text(FieldKey::CurrentProvince), Some(BULACAN));
}
