use std::collections::BTreeMap;
use std::io::Read;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::LookupConfig;

use super::super::domain::{LocationLevel, LocationNode};

/// Read-only administrative-geography registry.
#[async_trait]
pub trait LocationLookup: Send + Sync {
    async fn provinces(&self) -> Result<Vec<LocationNode>, LookupError>;
    async fn cities(&self, province_code: &str) -> Result<Vec<LocationNode>, LookupError>;
    async fn barangays(&self, city_code: &str) -> Result<Vec<LocationNode>, LookupError>;
}

/// Failure fetching one level of the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("unable to reach the location service: {0}")]
    Network(String),
    #[error("no {level} entries found under '{code}'")]
    NotFound { level: LocationLevel, code: String },
    #[error("unexpected response from the location service: {0}")]
    Decode(String),
    #[error("could not configure the location service client: {0}")]
    Client(String),
}

#[derive(Debug, Deserialize)]
struct PsgcEntry {
    code: String,
    name: String,
}

/// HTTP client for the public PSGC registry.
pub struct PsgcClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl PsgcClient {
    pub fn new(config: &LookupConfig) -> Result<Self, LookupError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent("enrollment-form/0.1")
            .build()
            .map_err(|e| LookupError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch(
        &self,
        path: &str,
        level: LocationLevel,
        parent_code: Option<&str>,
    ) -> Result<Vec<LocationNode>, LookupError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(url = %url, level = %level, "fetching locations");

        let response = self
            .http_client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound {
                level,
                code: parent_code.unwrap_or_default().to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(LookupError::Network(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let entries: Vec<PsgcEntry> = response
            .json()
            .await
            .map_err(|e| LookupError::Decode(e.to_string()))?;

        Ok(entries
            .into_iter()
            .map(|entry| LocationNode {
                code: entry.code,
                name: entry.name,
                level,
                parent_code: parent_code.map(str::to_string),
            })
            .collect())
    }
}

#[async_trait]
impl LocationLookup for PsgcClient {
    async fn provinces(&self) -> Result<Vec<LocationNode>, LookupError> {
        self.fetch("provinces/", LocationLevel::Province, None).await
    }

    async fn cities(&self, province_code: &str) -> Result<Vec<LocationNode>, LookupError> {
        let path = format!("provinces/{province_code}/cities-municipalities/");
        self.fetch(&path, LocationLevel::CityMunicipality, Some(province_code))
            .await
    }

    async fn barangays(&self, city_code: &str) -> Result<Vec<LocationNode>, LookupError> {
        let path = format!("cities-municipalities/{city_code}/barangays/");
        self.fetch(&path, LocationLevel::Barangay, Some(city_code))
            .await
    }
}

/// Row of an offline registry export: `level,code,name,parent_code`.
#[derive(Debug, Deserialize)]
struct RegistryRow {
    level: LocationLevel,
    code: String,
    name: String,
    #[serde(default)]
    parent_code: Option<String>,
}

/// In-memory registry used offline and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticLocationLookup {
    provinces: Vec<LocationNode>,
    children: BTreeMap<String, Vec<LocationNode>>,
}

/// Failure reading an offline registry export.
#[derive(Debug, thiserror::Error)]
pub enum RegistryLoadError {
    #[error("malformed registry row: {0}")]
    Csv(#[from] csv::Error),
    #[error("{level} '{code}' has no parent code")]
    MissingParent { level: LocationLevel, code: String },
}

impl StaticLocationLookup {
    pub fn new<I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = LocationNode>,
    {
        let mut lookup = Self::default();
        for node in nodes {
            lookup.insert(node);
        }
        lookup
    }

    fn insert(&mut self, node: LocationNode) {
        match (&node.level, node.parent_code.clone()) {
            (LocationLevel::Province, _) => self.provinces.push(node),
            (_, Some(parent)) => self.children.entry(parent).or_default().push(node),
            (_, None) => {}
        }
    }

    /// Load a CSV export with a `level,code,name,parent_code` header.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self, RegistryLoadError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut lookup = Self::default();
        for row in csv_reader.deserialize::<RegistryRow>() {
            let row = row?;
            let parent_code = row.parent_code.filter(|code| !code.is_empty());
            if row.level != LocationLevel::Province && parent_code.is_none() {
                return Err(RegistryLoadError::MissingParent {
                    level: row.level,
                    code: row.code,
                });
            }
            lookup.insert(LocationNode {
                code: row.code,
                name: row.name,
                level: row.level,
                parent_code,
            });
        }
        Ok(lookup)
    }

    fn children_of(
        &self,
        level: LocationLevel,
        parent_code: &str,
    ) -> Result<Vec<LocationNode>, LookupError> {
        self.children
            .get(parent_code)
            .map(|nodes| {
                nodes
                    .iter()
                    .filter(|node| node.level == level)
                    .cloned()
                    .collect()
            })
            .ok_or_else(|| LookupError::NotFound {
                level,
                code: parent_code.to_string(),
            })
    }
}

#[async_trait]
impl LocationLookup for StaticLocationLookup {
    async fn provinces(&self) -> Result<Vec<LocationNode>, LookupError> {
        Ok(self.provinces.clone())
    }

    async fn cities(&self, province_code: &str) -> Result<Vec<LocationNode>, LookupError> {
        self.children_of(LocationLevel::CityMunicipality, province_code)
    }

    async fn barangays(&self, city_code: &str) -> Result<Vec<LocationNode>, LookupError> {
        self.children_of(LocationLevel::Barangay, city_code)
    }
}
