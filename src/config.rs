//! Site configuration module.
//!
//! Handles loading, validating, and merging `site.toml`. Stock defaults are
//! serialized to a TOML table, the user file is merged on top of them, and the
//! result is deserialized and validated before any language pass starts.
//!
//! ## Config File Location
//!
//! ```text
//! project/
//! ├── site.toml            # Site + i18n configuration (optional)
//! ├── docs/                # Documentation sources (`docs_dir`)
//! │   ├── index.md
//! │   └── index.fr.md
//! └── site/                # Build output (`site_dir`)
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! site_name = "My Docs"
//! site_url = "https://example.com/docs/"
//! docs_dir = "docs"
//! site_dir = "site"
//! use_directory_urls = true
//! markdown_extensions = ["admonition"]
//!
//! [theme]
//! name = "default"
//! custom_dir = ""           # Extra theme files copied on the default build
//!
//! [search]
//! enabled = true
//!
//! [i18n]
//! docs_structure = "suffix" # or "folder"
//! fallback_to_default = true
//!
//! [[i18n.languages]]
//! locale = "en"
//! name = "English"
//! default = true
//!
//! [[i18n.languages]]
//! locale = "fr"
//! name = "Français"
//! site_name = "Ma documentation"   # per-language override
//! nav_translations = { About = "À propos" }
//! ```
//!
//! Unknown keys are rejected everywhere except in per-language tables, where
//! extra keys are collected as config overrides for that language.

use crate::locale::{LanguageConfig, LocaleRegistry};
use crate::structure::StructureKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file looked up in the project root.
pub const CONFIG_FILE: &str = "site.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `site.toml`.
///
/// Every field has a value (no `Option`s at the top level) so that the
/// serialized form always lists every key a per-language override may
/// target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    pub site_name: String,
    /// Canonical URL of the deployed site. Its path part becomes the link base.
    pub site_url: String,
    pub site_description: String,
    pub site_author: String,
    pub copyright: String,
    /// Documentation sources, relative to the project root.
    pub docs_dir: String,
    /// Build output, relative to the project root.
    pub site_dir: String,
    /// `page/index.html` URLs ending in `/` instead of `page.html`.
    pub use_directory_urls: bool,
    pub strict: bool,
    pub markdown_extensions: Vec<String>,
    /// Static navigation. Empty means derive navigation from the file tree.
    pub nav: Vec<NavEntry>,
    pub theme: ThemeConfig,
    /// Free-form values exposed to templates (`extra.alternate` holds the
    /// language switcher).
    pub extra: toml::Table,
    pub search: SearchConfig,
    pub i18n: I18nConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_name: "My Docs".to_string(),
            site_url: String::new(),
            site_description: String::new(),
            site_author: String::new(),
            copyright: String::new(),
            docs_dir: "docs".to_string(),
            site_dir: "site".to_string(),
            use_directory_urls: true,
            strict: false,
            markdown_extensions: Vec::new(),
            nav: Vec::new(),
            theme: ThemeConfig::default(),
            extra: toml::Table::new(),
            search: SearchConfig::default(),
            i18n: I18nConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate values that serde cannot check on its own.
    ///
    /// Language validation builds a throwaway [`LocaleRegistry`] so that
    /// every rule lives in one place.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.docs_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "docs_dir must not be empty".into(),
            ));
        }
        if self.site_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "site_dir must not be empty".into(),
            ));
        }
        if self.docs_dir == self.site_dir {
            return Err(ConfigError::Validation(format!(
                "site_dir must differ from docs_dir ('{}')",
                self.docs_dir
            )));
        }
        LocaleRegistry::from_config(&self.i18n)?;
        Ok(())
    }

    pub fn docs_path(&self, root: &Path) -> PathBuf {
        root.join(&self.docs_dir)
    }

    pub fn site_path(&self, root: &Path) -> PathBuf {
        root.join(&self.site_dir)
    }

    /// Theme override directory, when one is configured.
    pub fn theme_path(&self, root: &Path) -> Option<PathBuf> {
        let dir = self.theme.custom_dir.trim();
        (!dir.is_empty()).then(|| root.join(dir))
    }

    /// Path component of `site_url` without a trailing slash.
    ///
    /// - `""` → `""`
    /// - `"https://example.com/"` → `""`
    /// - `"https://example.com/docs/"` → `"/docs"`
    pub fn base_path(&self) -> String {
        let url = self.site_url.trim();
        let path = match url.split_once("://") {
            Some((_, rest)) => rest.find('/').map(|idx| &rest[idx..]).unwrap_or(""),
            None => url,
        };
        path.trim_end_matches('/').to_string()
    }

    pub fn has_markdown_extension(&self, name: &str) -> bool {
        self.markdown_extensions.iter().any(|ext| ext == name)
    }
}

/// One entry of a static navigation list.
///
/// ```toml
/// [[nav]]
/// title = "Home"
/// page = "index.md"
///
/// [[nav]]
/// title = "Guides"
/// children = [{ title = "Install", page = "guides/install.md" }]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NavEntry {
    /// Empty means: use the page's heading or file name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// Source path of a page, tagged or untagged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    /// External URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavEntry>,
}

impl NavEntry {
    pub fn page(title: &str, page: &str) -> Self {
        Self {
            title: title.to_string(),
            page: Some(page.to_string()),
            ..Self::default()
        }
    }

    pub fn link(title: &str, url: &str) -> Self {
        Self {
            title: title.to_string(),
            link: Some(url.to_string()),
            ..Self::default()
        }
    }
}

/// Theme settings.
///
/// `locale` and `language` are rewritten on every language pass when theme
/// reconfiguration is enabled. Keys not listed here are kept in `options`
/// and can be targeted by per-language `theme` overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub name: String,
    pub locale: String,
    pub language: String,
    /// Directory of extra theme files, relative to the project root.
    pub custom_dir: String,
    pub features: Vec<String>,
    #[serde(flatten)]
    pub options: toml::Table,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            locale: "en".to_string(),
            language: "en".to_string(),
            custom_dir: String::new(),
            features: Vec::new(),
            options: toml::Table::new(),
        }
    }
}

/// Search index settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    pub enabled: bool,
    /// Tokenizer languages written into the search index.
    pub lang: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lang: Vec::new(),
        }
    }
}

/// Multi-language build settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct I18nConfig {
    /// How source files are tagged with their locale.
    pub docs_structure: StructureKind,
    /// Use default-language content when a translation is missing.
    pub fallback_to_default: bool,
    /// Set the theme locale and language switcher for each language.
    #[serde(alias = "reconfigure_material")]
    pub reconfigure_theme: bool,
    /// Add build languages to the search tokenizer languages.
    pub reconfigure_search: bool,
    /// Build a single language, which becomes the default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_only_locale: Option<String>,
    pub languages: Vec<LanguageConfig>,
}

impl Default for I18nConfig {
    fn default() -> Self {
        let mut english = LanguageConfig::new("en", "English");
        english.default = true;
        Self {
            docs_structure: StructureKind::default(),
            fallback_to_default: true,
            reconfigure_theme: true,
            reconfigure_search: true,
            build_only_locale: None,
            languages: vec![english],
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user values are merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so a user
///   `[[i18n.languages]]` list replaces the stock one.
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

/// Load `site.toml` from a project root as a raw TOML value.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
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

/// Load `site.toml` from the project root on top of stock defaults.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `site.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# static-i18n configuration
# =========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys cause an error, except inside [[i18n.languages]] tables where
# extra keys become per-language overrides.

site_name = "My Docs"

# Canonical URL of the published site. Its path ("/docs" in
# "https://example.com/docs/") prefixes every generated link.
site_url = ""
site_description = ""
site_author = ""
copyright = ""

# Source and output directories, relative to this file.
docs_dir = "docs"
site_dir = "site"

# true:  guide.md -> guide/index.html, linked as guide/
# false: guide.md -> guide.html
use_directory_urls = true
strict = false

# Enable "admonition" to render !!! note blocks.
markdown_extensions = []

# Static navigation. Leave empty to derive it from the docs tree.
nav = []

# ---------------------------------------------------------------------------
# Theme
# ---------------------------------------------------------------------------
[theme]
name = "default"
# Rewritten for every language when i18n.reconfigure_theme is on.
locale = "en"
language = "en"
# Directory with extra theme files, copied on the default-language build only.
custom_dir = ""
features = []

# ---------------------------------------------------------------------------
# Extra template values
# ---------------------------------------------------------------------------
[extra]

# ---------------------------------------------------------------------------
# Search
# ---------------------------------------------------------------------------
[search]
enabled = true
# Tokenizer languages; build languages are added automatically when
# i18n.reconfigure_search is on.
lang = []

# ---------------------------------------------------------------------------
# Internationalization
# ---------------------------------------------------------------------------
[i18n]
# "suffix": page.fr.md    "folder": fr/page.md
docs_structure = "suffix"
# Serve default-language pages where a translation is missing.
fallback_to_default = true
reconfigure_theme = true
reconfigure_search = true
# Build a single language only (it becomes the default):
# build_only_locale = "fr"

# One table per language. Exactly one must be default, and it must be built.
#
#   locale                  xx, xx-XX, xx_XX, xx-Xxxx, xx-Xxxx-XX, or "null"
#   name                    display name in the language switcher
#   default                 true for the language served at the site root
#   build                   false to list a language without building it
#   link                    switcher link, "/" or "/<locale>/" by default
#   fixed_link              absolute switcher link (required for "null")
#   nav_translations        { "English title" = "Translated title" }
#   admonition_translations { tip = "Astuce" }
#   any other key           per-language override (site_name, theme, extra, ...)
[[i18n.languages]]
locale = "en"
name = "English"
default = true
"##
}
