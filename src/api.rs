//! Formula JSON API client.
//!
//! Queries the public formula metadata API for version, dependency, and bottle
//! information. Every successful response is cached to disk by [`crate::cache`]; this
//! client holds no in-memory cache of its own since a single command invocation rarely
//! looks the same formula up twice.

use crate::error::{KegError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const API_BASE: &str = "https://formulae.brew.sh/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KegOnlyReason {
    pub reason: String,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formula {
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub versions: Versions,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub build_dependencies: Vec<String>,
    #[serde(default)]
    pub bottle: Option<Bottle>,
    #[serde(default)]
    pub keg_only: bool,
    #[serde(default)]
    pub keg_only_reason: Option<KegOnlyReason>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Versions {
    #[serde(default)]
    pub stable: Option<String>,
    #[serde(default)]
    pub head: Option<String>,
    #[serde(default)]
    pub bottle: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BottleFile {
    pub cellar: String,
    pub url: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BottleData {
    pub rebuild: u32,
    #[serde(default)]
    pub root_url: Option<String>,
    pub files: std::collections::HashMap<String, BottleFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bottle {
    #[serde(default)]
    pub stable: Option<BottleData>,
}

/// Formula API client.
#[derive(Clone)]
pub struct Api {
    client: reqwest::Client,
}

impl Api {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(format!("keg/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Fetch the complete formula index, preferring a fresh on-disk cache entry.
    pub async fn fetch_all_formulae(&self, cache: &crate::cache::Cache) -> Result<Vec<Formula>> {
        if let Some(cached) = cache.get_formulae() {
            return Ok(cached);
        }
        let url = format!("{API_BASE}/formula.json");
        let formulae: Vec<Formula> = self.client.get(&url).send().await?.json().await?;
        let _ = cache.store_formulae(&formulae);
        Ok(formulae)
    }

    /// Fetch a single formula's metadata by name.
    pub async fn fetch_formula(&self, name: &str, cache: &crate::cache::Cache) -> Result<Formula> {
        if let Some(formula) = cache.get_formula(name) {
            return Ok(formula);
        }

        let url = format!("{API_BASE}/formula/{name}.json");
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(KegError::UnknownPackage(name.to_string()));
        }
        let formula: Formula = response.json().await?;
        let _ = cache.store_formula(&formula);
        Ok(formula)
    }

    /// Search the formula index by substring match on name or description.
    pub async fn search(&self, query: &str, cache: &crate::cache::Cache) -> Result<Vec<Formula>> {
        let query_lower = query.to_lowercase();
        let formulae = self.fetch_all_formulae(cache).await?;
        let matches = tokio::task::spawn_blocking(move || {
            formulae
                .into_iter()
                .filter(|f| {
                    f.name.to_lowercase().contains(&query_lower)
                        || f.desc
                            .as_ref()
                            .is_some_and(|d| d.to_lowercase().contains(&query_lower))
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| KegError::Other(anyhow::anyhow!(e)))?;
        Ok(matches)
    }
}

impl Default for Api {
    fn default() -> Self {
        Self::new().expect("failed to build HTTP client")
    }
}
