use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::super::domain::{LocationLevel, LocationNode};
use super::lookup::{LocationLookup, LookupError};

type ListKey = (LocationLevel, Option<String>);

/// Caching front of a [`LocationLookup`].
///
/// Listings and names are cached for the lifetime of the resolver and never evicted; the
/// registry is read-only and small enough that a session never needs to drop entries.
pub struct LocationHierarchyResolver<L> {
    lookup: Arc<L>,
    lists: RwLock<HashMap<ListKey, Vec<LocationNode>>>,
    names: RwLock<HashMap<(LocationLevel, String), LocationNode>>,
}

impl<L> LocationHierarchyResolver<L>
where
    L: LocationLookup,
{
    pub fn new(lookup: Arc<L>) -> Self {
        Self {
            lookup,
            lists: RwLock::new(HashMap::new()),
            names: RwLock::new(HashMap::new()),
        }
    }

    /// Provinces sorted case-insensitively by name.
    pub async fn list_provinces(&self) -> Result<Vec<LocationNode>, LookupError> {
        self.list(LocationLevel::Province, None).await
    }

    /// Cities of a province or barangays of a city, sorted case-insensitively by name.
    pub async fn list_children(
        &self,
        level: LocationLevel,
        parent_code: &str,
    ) -> Result<Vec<LocationNode>, LookupError> {
        self.list(level, Some(parent_code)).await
    }

    pub(crate) async fn list(
        &self,
        level: LocationLevel,
        parent_code: Option<&str>,
    ) -> Result<Vec<LocationNode>, LookupError> {
        let key = (level, parent_code.map(str::to_string));
        if let Some(cached) = self.lists.read().await.get(&key) {
            debug!(level = %level, parent = ?parent_code, "locations served from cache");
            return Ok(cached.clone());
        }

        let mut nodes = match (level, parent_code) {
            (LocationLevel::Province, _) => self.lookup.provinces().await?,
            (LocationLevel::CityMunicipality, Some(parent)) => self.lookup.cities(parent).await?,
            (LocationLevel::Barangay, Some(parent)) => self.lookup.barangays(parent).await?,
            (_, None) => {
                return Err(LookupError::NotFound {
                    level,
                    code: String::new(),
                })
            }
        };
        nodes.sort_by_cached_key(|node| node.name.to_lowercase());

        {
            let mut names = self.names.write().await;
            for node in &nodes {
                names.insert((node.level, node.code.clone()), node.clone());
            }
        }
        self.lists.write().await.insert(key, nodes.clone());
        debug!(level = %level, parent = ?parent_code, count = nodes.len(), "locations cached");

        Ok(nodes)
    }

    pub async fn cached_node(&self, level: LocationLevel, code: &str) -> Option<LocationNode> {
        self.names
            .read()
            .await
            .get(&(level, code.to_string()))
            .cloned()
    }

    /// Name for a code, fetching the parent listing on a cache miss. Falls back to the code
    /// itself when the registry cannot resolve it.
    pub async fn resolve_name(
        &self,
        level: LocationLevel,
        code: &str,
        parent_code: Option<&str>,
    ) -> String {
        if let Some(node) = self.cached_node(level, code).await {
            return node.name;
        }

        if level != LocationLevel::Province && parent_code.is_none() {
            return code.to_string();
        }

        match self.list(level, parent_code).await {
            Ok(nodes) => nodes
                .into_iter()
                .find(|node| node.code == code)
                .map(|node| node.name)
                .unwrap_or_else(|| code.to_string()),
            Err(err) => {
                warn!(level = %level, code = %code, error = %err, "location name unresolved");
                code.to_string()
            }
        }
    }
}
