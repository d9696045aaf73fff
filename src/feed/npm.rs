use crate::cache::Cache;
use crate::model::{parse_timestamp, ReleasedVersion};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

pub const NPM_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Source of a package's published versions.
#[async_trait]
pub trait ReleaseHistory: Send + Sync {
    async fn versions(&self, package: &str) -> Result<Vec<ReleasedVersion>>;
}

#[derive(Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    time: BTreeMap<String, String>,
}

/// Extracts the published versions from a registry package document.
///
/// The `time` map also carries `created` and `modified`, which are not
/// versions. Versions come back oldest first.
pub fn parse_registry_times(body: &str) -> Result<Vec<ReleasedVersion>> {
    let document: RegistryDocument =
        serde_json::from_str(body).context("Failed to parse registry document")?;

    let mut versions: Vec<ReleasedVersion> = document
        .time
        .into_iter()
        .filter(|(key, _)| key != "created" && key != "modified")
        .map(|(version, published)| {
            let released = ReleasedVersion::new(version);
            match parse_timestamp(&published) {
                Some(date) => released.with_date(date),
                None => released,
            }
        })
        .collect();

    versions.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.version.cmp(&b.version)));
    Ok(versions)
}

/// npm registry client.
pub struct NpmRegistry {
    client: reqwest::Client,
    cache: Cache,
    base_url: String,
}

impl NpmRegistry {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_cache(base_url, Cache::new())
    }

    pub fn with_cache(base_url: impl Into<String>, cache: Cache) -> Self {
        Self {
            client: reqwest::Client::new(),
            cache,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Scoped names keep their `@` but encode the separator.
    fn package_url(&self, package: &str) -> String {
        format!("{}/{}", self.base_url, package.replace('/', "%2f"))
    }
}

impl Default for NpmRegistry {
    fn default() -> Self {
        Self::new(NPM_REGISTRY_URL)
    }
}

#[async_trait]
impl ReleaseHistory for NpmRegistry {
    async fn versions(&self, package: &str) -> Result<Vec<ReleasedVersion>> {
        let cache_key = format!("npm_history_{}", package);

        if let Some(cached) = self.cache.get::<Vec<ReleasedVersion>>(&cache_key) {
            return Ok(cached);
        }

        let url = self.package_url(package);
        debug!(package, url = %url, "Fetching registry history");

        let body = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to query registry for {}", package))?
            .error_for_status()
            .with_context(|| format!("Registry lookup failed for {}", package))?
            .text()
            .await?;

        let versions = parse_registry_times(&body)
            .with_context(|| format!("Unexpected registry response for {}", package))?;

        if let Err(e) = self.cache.set(&cache_key, &versions) {
            debug!(package, "Could not cache registry history: {}", e);
        }

        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_registry_times() {
        let body = r#"{
            "name": "grunt",
            "time": {
                "modified": "2022-04-01T00:00:00.000Z",
                "created": "2011-12-01T00:00:00.000Z",
                "1.0.0": "2016-04-04T18:00:00.000Z",
                "0.4.5": "2014-05-12T18:00:00.000Z",
                "1.0.1": "2016-04-05T18:00:00.000Z"
            }
        }"#;
        let versions = parse_registry_times(body).unwrap();
        let names: Vec<_> = versions.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(names, vec!["0.4.5", "1.0.0", "1.0.1"]);
        assert!(versions.iter().all(|v| v.date.is_some()));
    }

    #[test]
    fn test_parse_registry_without_time() {
        assert!(parse_registry_times(r#"{"name": "x"}"#).unwrap().is_empty());
        assert!(parse_registry_times("not json").is_err());
    }

    #[test]
    fn test_scoped_package_url() {
        let registry = NpmRegistry::with_cache(
            "https://registry.example.org/",
            Cache::with_dir(std::env::temp_dir().join("lagscan-url-test"), Duration::ZERO),
        );
        assert_eq!(
            registry.package_url("@types/node"),
            "https://registry.example.org/@types%2fnode"
        );
        assert_eq!(registry.package_url("grunt"), "https://registry.example.org/grunt");
    }

    #[tokio::test]
    async fn test_versions_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::with_dir(dir.path().to_path_buf(), Duration::from_secs(3600));
        cache
            .set("npm_history_grunt", &vec![ReleasedVersion::new("1.0.0")])
            .unwrap();

        let registry = NpmRegistry::with_cache("https://registry.invalid", cache);
        let versions = registry.versions("grunt").await.unwrap();
        assert_eq!(versions, vec![ReleasedVersion::new("1.0.0")]);
    }
}
