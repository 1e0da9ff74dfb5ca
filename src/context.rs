//! Process-wide build resources.
//!
//! Everything that is expensive to build or must be valid before any document
//! is touched lives in [`BuildContext`]: the highlighter, the compiled
//! stylesheets, the component registry, and the bundler manifest. The context
//! is constructed once by [`BuildContext::init`] and then only borrowed, so a
//! failure here is a [`ConfigurationError`] that stops the build before the
//! document loop starts.

use crate::components::Registry;
use crate::config::{ConfigError, SiteConfig};
use crate::highlight::Highlighter;
use crate::manifest::AssetManifest;
use crate::stylesheet::Stylesheets;
use crate::templates::PageAssets;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("unknown highlight theme `{name}` (available: {})", .available.join(", "))]
    UnknownTheme { name: String, available: Vec<String> },
    #[error("cannot generate highlight stylesheet: {0}")]
    HighlightStylesheet(String),
    #[error("stylesheet compilation failed: {0}")]
    Stylesheet(String),
    #[error("asset manifest {path}: {message}")]
    Manifest { path: PathBuf, message: String },
}

#[derive(Debug)]
pub struct BuildContext {
    /// Site root; sources, config, and output are resolved against it.
    pub root: PathBuf,
    pub config: SiteConfig,
    pub highlighter: Highlighter,
    pub stylesheets: Stylesheets,
    pub registry: Registry,
    pub assets: Option<AssetManifest>,
}

impl BuildContext {
    /// Build every shared resource. Uses the built-in component registry.
    pub fn init(root: &Path, config: SiteConfig) -> Result<Self, ConfigurationError> {
        let highlighter = Highlighter::new(&config.highlight.theme)?;
        tracing::debug!(theme = highlighter.theme_name(), "highlighter ready");

        let stylesheets = Stylesheets::compile(&highlighter)?;
        tracing::debug!(
            main_bytes = stylesheets.main.len(),
            code_bytes = stylesheets.code.len(),
            "stylesheets compiled"
        );

        let manifest_path = root.join(&config.asset_manifest);
        let assets = AssetManifest::load(&manifest_path, &config.asset_prefix)?;
        match &assets {
            Some(m) => tracing::debug!(path = %manifest_path.display(), entries = m.len(), "asset manifest loaded"),
            None => tracing::debug!(path = %manifest_path.display(), "no asset manifest"),
        }

        Ok(Self {
            root: root.to_path_buf(),
            config,
            highlighter,
            stylesheets,
            registry: Registry::with_builtins(),
            assets,
        })
    }

    /// Replace the component registry.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn output_root(&self) -> PathBuf {
        self.root.join(&self.config.output_dir)
    }

    /// Everything the page templates inline or link.
    pub fn page_assets(&self) -> PageAssets<'_> {
        PageAssets {
            stylesheets: &self.stylesheets,
            font_stylesheet: &self.config.fonts.stylesheet,
            bundle: self.assets.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn init_with_defaults() {
        let tmp = TempDir::new().unwrap();
        let ctx = BuildContext::init(tmp.path(), SiteConfig::default()).unwrap();
        assert!(ctx.assets.is_none());
        assert!(ctx.registry.contains("Callout"));
        assert_eq!(ctx.output_root(), tmp.path().join("public"));
    }

    #[test]
    fn init_fails_on_unknown_theme() {
        let tmp = TempDir::new().unwrap();
        let mut config = SiteConfig::default();
        config.highlight.theme = "Neon Nights".to_string();
        assert!(matches!(
            BuildContext::init(tmp.path(), config),
            Err(ConfigurationError::UnknownTheme { .. })
        ));
    }

    #[test]
    fn init_loads_asset_manifest() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("data")).unwrap();
        fs::write(
            tmp.path().join("data/manifest.json"),
            r#"{"main.css": "css/styles.1.css"}"#,
        )
        .unwrap();
        let ctx = BuildContext::init(tmp.path(), SiteConfig::default()).unwrap();
        let assets = ctx.assets.as_ref().unwrap();
        assert_eq!(assets.url("main.css").as_deref(), Some("/assets/css/styles.1.css"));
    }

    #[test]
    fn with_registry_replaces_components() {
        let tmp = TempDir::new().unwrap();
        let ctx = BuildContext::init(tmp.path(), SiteConfig::default())
            .unwrap()
            .with_registry(Registry::new());
        assert!(!ctx.registry.contains("Callout"));
    }
}
