//! On-disk JSON response cache for the formula API, split by category so each can carry
//! its own eviction age from `config.ini`'s `[cleanup]` section: `cache` for formula
//! metadata, `auth` for GHCR bearer tokens. Bottle archives are a separate category
//! (`download`) managed directly by [`crate::cleanup`] since they aren't JSON.

use crate::api::Formula;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Cache,
    Auth,
}

impl Category {
    fn dirname(self) -> &'static str {
        match self {
            Category::Cache => "cache",
            Category::Auth => "auth",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cache {
    root: PathBuf,
    cache_ttl: Duration,
    auth_ttl: Duration,
}

impl Cache {
    pub fn new(root: PathBuf, cache_ttl: Duration, auth_ttl: Duration) -> Self {
        Self {
            root,
            cache_ttl,
            auth_ttl,
        }
    }

    fn ttl_for(&self, category: Category) -> Duration {
        match category {
            Category::Cache => self.cache_ttl,
            Category::Auth => self.auth_ttl,
        }
    }

    fn path(&self, category: Category, file: &str) -> PathBuf {
        self.root.join(category.dirname()).join(file)
    }

    fn is_fresh(&self, path: &Path, category: Category) -> bool {
        let Ok(metadata) = std::fs::metadata(path) else {
            return false;
        };
        let Ok(modified) = metadata.modified() else {
            return false;
        };
        SystemTime::now()
            .duration_since(modified)
            .map(|age| age < self.ttl_for(category))
            .unwrap_or(false)
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, category: Category, file: &str) -> Option<T> {
        let path = self.path(category, file);
        if !self.is_fresh(&path, category) {
            return None;
        }
        let content = std::fs::read_to_string(&path).ok()?;
        serde_json::from_str(&content).ok()
    }

    fn write_json<T: Serialize>(&self, category: Category, file: &str, value: &T) -> std::io::Result<()> {
        let path = self.path(category, file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(value).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    pub fn get_formulae(&self) -> Option<Vec<Formula>> {
        self.read_json(Category::Cache, "formula.json")
    }

    pub fn store_formulae(&self, formulae: &[Formula]) -> std::io::Result<()> {
        self.write_json(Category::Cache, "formula.json", &formulae)
    }

    pub fn get_formula(&self, name: &str) -> Option<Formula> {
        self.read_json(Category::Cache, &format!("formula-{name}.json"))
    }

    pub fn store_formula(&self, formula: &Formula) -> std::io::Result<()> {
        self.write_json(Category::Cache, &format!("formula-{}.json", formula.name), formula)
    }

    pub fn get_ghcr_token(&self, repository: &str) -> Option<String> {
        let path = self.path(Category::Auth, &token_filename(repository));
        if !self.is_fresh(&path, Category::Auth) {
            return None;
        }
        std::fs::read_to_string(&path).ok()
    }

    pub fn store_ghcr_token(&self, repository: &str, token: &str) -> std::io::Result<()> {
        let path = self.path(Category::Auth, &token_filename(repository));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, token)
    }

    /// Remove every cache entry older than its category's TTL. Returns the number of
    /// files removed, used by the `cleanup` verb's report.
    pub fn evict_stale(&self) -> std::io::Result<usize> {
        let mut removed = 0;
        for category in [Category::Cache, Category::Auth] {
            let dir = self.root.join(category.dirname());
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.filter_map(|e| e.ok()) {
                let path = entry.path();
                if path.is_file() && !self.is_fresh(&path, category) {
                    std::fs::remove_file(&path)?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}

fn token_filename(repository: &str) -> String {
    format!("ghcr-{}.token", repository.replace('/', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_get_formula_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().to_path_buf(), Duration::from_secs(3600), Duration::from_secs(3600));

        let formula = Formula {
            name: "wget".to_string(),
            full_name: "wget".to_string(),
            desc: None,
            homepage: None,
            versions: Default::default(),
            dependencies: vec![],
            build_dependencies: vec![],
            bottle: None,
            keg_only: false,
            keg_only_reason: None,
        };
        cache.store_formula(&formula).unwrap();
        let fetched = cache.get_formula("wget").unwrap();
        assert_eq!(fetched.name, "wget");
    }

    #[test]
    fn test_stale_entry_not_returned() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().to_path_buf(), Duration::from_secs(0), Duration::from_secs(0));
        cache.store_ghcr_token("homebrew/core/wget", "tok").unwrap();
        assert!(cache.get_ghcr_token("homebrew/core/wget").is_none());
    }

    #[test]
    fn test_evict_stale_removes_expired_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().to_path_buf(), Duration::from_secs(0), Duration::from_secs(3600));
        cache.store_formulae(&[]).unwrap();
        let removed = cache.evict_stale().unwrap();
        assert_eq!(removed, 1);
    }
}
