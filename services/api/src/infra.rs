use async_trait::async_trait;
use chrono::NaiveDate;
use enrollment::config::LookupConfig;
use enrollment::error::AppError;
use enrollment::workflows::enrollment::{
    ConditionalFieldController, LocationHierarchyResolver, LocationLookup, LocationNode,
    LookupError, PersistedFormSnapshot, PsgcClient, StaticLocationLookup,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Where location lists come from: the public PSGC API, or an offline CSV export.
pub(crate) enum LocationBackend {
    Remote(PsgcClient),
    Offline(StaticLocationLookup),
}

impl LocationBackend {
    pub(crate) fn load(config: &LookupConfig, registry: Option<&Path>) -> Result<Self, AppError> {
        match registry {
            Some(path) => {
                let reader = BufReader::new(File::open(path)?);
                let lookup = StaticLocationLookup::from_csv(reader)?;
                info!(registry = %path.display(), "using offline location registry");
                Ok(Self::Offline(lookup))
            }
            None => {
                info!(base_url = %config.base_url, "using remote location registry");
                Ok(Self::Remote(PsgcClient::new(config)?))
            }
        }
    }

    pub(crate) fn into_resolver(self) -> Arc<LocationHierarchyResolver<Self>> {
        Arc::new(LocationHierarchyResolver::new(Arc::new(self)))
    }
}

#[async_trait]
impl LocationLookup for LocationBackend {
    async fn provinces(&self) -> Result<Vec<LocationNode>, LookupError> {
        match self {
            Self::Remote(client) => client.provinces().await,
            Self::Offline(registry) => registry.provinces().await,
        }
    }

    async fn cities(&self, province_code: &str) -> Result<Vec<LocationNode>, LookupError> {
        match self {
            Self::Remote(client) => client.cities(province_code).await,
            Self::Offline(registry) => registry.cities(province_code).await,
        }
    }

    async fn barangays(&self, city_code: &str) -> Result<Vec<LocationNode>, LookupError> {
        match self {
            Self::Remote(client) => client.barangays(city_code).await,
            Self::Offline(registry) => registry.barangays(city_code).await,
        }
    }
}

pub(crate) fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

pub(crate) fn read_snapshot(path: &Path) -> Result<PersistedFormSnapshot, AppError> {
    read_json_file(path)
}

/// Age derivation follows the evaluation date when one is pinned.
pub(crate) fn controller_for(today: Option<NaiveDate>) -> ConditionalFieldController {
    match today {
        Some(today) => ConditionalFieldController::with_today(today),
        None => ConditionalFieldController::new(),
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
