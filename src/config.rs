//! Site configuration module.
//!
//! Handles loading, validating, and merging the site's `config.toml`. User
//! values are layered on top of stock defaults, so a config file only needs
//! the keys it wants to change.
//!
//! ## Config File Location
//!
//! ```text
//! site/
//! ├── config.toml              # Optional, overrides stock defaults
//! ├── data/manifest.json       # Optional, written by the asset bundler
//! └── posts/
//!     ├── hello.md
//!     └── 2020/
//!         └── retro.md
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! posts = "posts/*.md"              # Glob for source documents, relative to the site root
//! output_dir = "public"             # Publish directory
//! asset_manifest = "data/manifest.json"
//! asset_prefix = "/assets/"         # URL prefix for hashed bundle files
//! on_error = "abort"                # "abort" or "continue"
//! index = true                      # Write index.html listing published posts
//!
//! [minify]
//! enabled = true
//!
//! [highlight]
//! theme = "Solarized (light)"
//!
//! [fonts]
//! stylesheet = "https://use.typekit.net/irw4wry.css"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// What the driver does when a single document fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failing document.
    #[default]
    Abort,
    /// Keep building the rest; report every failure at the end.
    Continue,
}

/// Site configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Glob pattern for source documents, relative to the site root.
    pub posts: String,
    /// Publish directory, relative to the site root.
    pub output_dir: String,
    /// Bundler manifest mapping logical asset names to hashed filenames.
    pub asset_manifest: String,
    /// URL prefix prepended to hashed asset filenames.
    pub asset_prefix: String,
    /// Per-document failure policy.
    pub on_error: FailurePolicy,
    /// Whether to write an index page of listed posts.
    pub index: bool,
    pub minify: MinifyConfig,
    pub highlight: HighlightConfig,
    pub fonts: FontsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            posts: "posts/*.md".to_string(),
            output_dir: "public".to_string(),
            asset_manifest: "data/manifest.json".to_string(),
            asset_prefix: "/assets/".to_string(),
            on_error: FailurePolicy::Abort,
            index: true,
            minify: MinifyConfig::default(),
            highlight: HighlightConfig::default(),
            fonts: FontsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.posts.trim().is_empty() {
            return Err(ConfigError::Validation("posts must not be empty".into()));
        }
        if let Err(e) = glob::Pattern::new(&self.posts) {
            return Err(ConfigError::Validation(format!(
                "posts is not a valid glob: {e}"
            )));
        }
        if self.output_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "output_dir must not be empty".into(),
            ));
        }
        if Path::new(&self.output_dir).is_absolute() {
            return Err(ConfigError::Validation(
                "output_dir must be relative to the site root".into(),
            ));
        }
        if self.highlight.theme.trim().is_empty() {
            return Err(ConfigError::Validation(
                "highlight.theme must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// HTML minification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MinifyConfig {
    pub enabled: bool,
}

impl Default for MinifyConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Syntax highlighting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HighlightConfig {
    /// Name of a bundled syntect theme.
    pub theme: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: "Solarized (light)".to_string(),
        }
    }
}

/// External font stylesheet linked from every page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontsConfig {
    pub stylesheet: String,
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self {
            stylesheet: "https://use.typekit.net/irw4wry.css".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(config_path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `config.toml` from the site root (or an explicit path).
pub fn load_config(root: &Path, explicit: Option<&Path>) -> Result<SiteConfig, ConfigError> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => root.join("config.toml"),
    };
    if explicit.is_some() && !path.exists() {
        return Err(ConfigError::Validation(format!(
            "config file not found: {}",
            path.display()
        )));
    }
    resolve_config(stock_defaults_value(), load_raw_config(&path)?)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# quire configuration
# ===================
# All settings are optional. Values shown below are the defaults.
# Unknown keys cause an error.

# Glob pattern for source documents, relative to the site root.
posts = "posts/*.md"

# Publish directory. posts/a.md is written to public/posts/a.md.html.
output_dir = "public"

# Manifest written by the front-end bundler (logical name -> hashed file).
# A missing file is fine; a malformed one stops the build.
asset_manifest = "data/manifest.json"

# URL prefix for hashed bundle files referenced from the manifest.
asset_prefix = "/assets/"

# What to do when one document fails:
#   "abort"    - stop at the first failure
#   "continue" - build the rest, report all failures, exit non-zero
on_error = "abort"

# Write index.html listing every post that is not marked unlisted.
index = true

[minify]
enabled = true

[highlight]
# Any theme bundled with syntect, e.g. "InspiredGitHub", "base16-ocean.light".
theme = "Solarized (light)"

[fonts]
# Stylesheet linked from every page for the body typeface.
stylesheet = "https://use.typekit.net/irw4wry.css"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = SiteConfig::default();
        assert_eq!(config.posts, "posts/*.md");
        assert_eq!(config.output_dir, "public");
        assert_eq!(config.on_error, FailurePolicy::Abort);
        assert!(config.minify.enabled);
        assert!(config.index);
        assert_eq!(config.highlight.theme, "Solarized (light)");
    }

    #[test]
    fn parse_partial_config() {
        let config: SiteConfig = toml::from_str(
            r#"
on_error = "continue"

[minify]
enabled = false
"#,
        )
        .unwrap();
        assert_eq!(config.on_error, FailurePolicy::Continue);
        assert!(!config.minify.enabled);
        assert_eq!(config.posts, "posts/*.md");
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path(), None).unwrap();
        assert_eq!(config.output_dir, "public");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            "posts = \"writing/**/*.md\"\n[highlight]\ntheme = \"InspiredGitHub\"\n",
        )
        .unwrap();

        let config = load_config(tmp.path(), None).unwrap();
        assert_eq!(config.posts, "writing/**/*.md");
        assert_eq!(config.highlight.theme, "InspiredGitHub");
        assert!(config.minify.enabled);
    }

    #[test]
    fn load_config_explicit_missing_is_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.toml");
        assert!(matches!(
            load_config(tmp.path(), Some(&missing)),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "posts = [unclosed").unwrap();
        assert!(matches!(
            load_config(tmp.path(), None),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn unknown_key_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("unknown_key = 1");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_nested_key_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[minify]\nlevel = 3");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_failure_policy_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("on_error = \"retry\"");
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_bad_glob() {
        let config = SiteConfig {
            posts: "posts/[*.md".to_string(),
            ..SiteConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_absolute_output_dir() {
        let config = SiteConfig {
            output_dir: "/var/www".to_string(),
            ..SiteConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn merge_toml_table_merge() {
        let base = stock_defaults_value();
        let overlay: toml::Value = toml::from_str("[fonts]\nstylesheet = \"x.css\"").unwrap();
        let merged = merge_toml(base, overlay);
        let config: SiteConfig = merged.try_into().unwrap();
        assert_eq!(config.fonts.stylesheet, "x.css");
        assert_eq!(config.highlight.theme, "Solarized (light)");
    }

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["b"].as_integer(), Some(3));
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = SiteConfig::default();
        assert_eq!(config.posts, defaults.posts);
        assert_eq!(config.asset_prefix, defaults.asset_prefix);
        assert_eq!(config.on_error, defaults.on_error);
        assert_eq!(config.fonts.stylesheet, defaults.fonts.stylesheet);
        config.validate().unwrap();
    }
}
