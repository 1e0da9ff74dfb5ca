//! Bundler asset manifest.
//!
//! The front-end bundler writes `data/manifest.json`, mapping logical asset
//! names to content-hashed filenames:
//!
//! ```json
//! { "main.js": "js/bundle.3f9a1c.js", "main.css": "css/styles.3f9a1c.css" }
//! ```
//!
//! The base template looks up `main.css` and `main.js` here so pages always
//! reference the current bundle.

use crate::context::ConfigurationError;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetManifest {
    entries: BTreeMap<String, String>,
    prefix: String,
}

impl AssetManifest {
    pub fn new(entries: BTreeMap<String, String>, prefix: impl Into<String>) -> Self {
        Self {
            entries,
            prefix: prefix.into(),
        }
    }

    /// Read the manifest at `path`. A missing file yields `Ok(None)`.
    pub fn load(path: &Path, prefix: &str) -> Result<Option<Self>, ConfigurationError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigurationError::Manifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let entries: BTreeMap<String, String> =
            serde_json::from_str(&content).map_err(|e| ConfigurationError::Manifest {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(Some(Self::new(entries, prefix)))
    }

    /// Public URL for a logical asset name, if the bundler produced it.
    pub fn url(&self, name: &str) -> Option<String> {
        let file = self.entries.get(name)?;
        if file.starts_with('/') || file.contains("://") {
            return Some(file.clone());
        }
        let prefix = self.prefix.trim_end_matches('/');
        Some(format!("{prefix}/{file}"))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_manifest_is_none() {
        let tmp = TempDir::new().unwrap();
        let loaded = AssetManifest::load(&tmp.path().join("manifest.json"), "/assets/").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn load_and_resolve_urls() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifest.json");
        fs::write(&path, r#"{"main.js": "js/bundle.abc.js", "main.css": "/css/s.abc.css"}"#)
            .unwrap();

        let manifest = AssetManifest::load(&path, "/assets/").unwrap().unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.url("main.js").as_deref(), Some("/assets/js/bundle.abc.js"));
        assert_eq!(manifest.url("main.css").as_deref(), Some("/css/s.abc.css"));
        assert_eq!(manifest.url("other.js"), None);
    }

    #[test]
    fn malformed_manifest_is_configuration_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manifest.json");
        fs::write(&path, r#"["not", "an", "object"]"#).unwrap();
        assert!(matches!(
            AssetManifest::load(&path, "/"),
            Err(ConfigurationError::Manifest { .. })
        ));
    }
}
