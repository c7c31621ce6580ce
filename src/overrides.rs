//! Per-language configuration overrides.
//!
//! All language passes share one [`SiteConfig`]. A language may override
//! top-level keys of it (`site_name`, `theme`, `extra`, ...), so every pass
//! must first undo what the previous pass applied:
//!
//! ```text
//! pass   reset()                       apply()
//! en     nothing to undo               (no overrides)
//! fr     nothing to undo               site_name: "My Docs" → "Ma doc"   snapshot "My Docs"
//! de     site_name → "My Docs"         (no overrides)
//! ```
//!
//! The snapshot of a key is taken the first time any language touches it and
//! is never replaced, so the original survives any number of passes.
//!
//! Values go through `toml::Value`: the config is serialized to a table, the
//! override is merged into it, and the candidate is deserialized back. A
//! candidate that does not deserialize is skipped with a warning.

use crate::config::SiteConfig;
use crate::locale::LanguageDescriptor;
use std::collections::BTreeMap;
use std::mem::discriminant;
use thiserror::Error;
use tracing::{debug, warn};

/// Keys a language may not override: they change the shape of the build
/// rather than its content.
pub const FORBIDDEN_OVERRIDES: &[&str] = &[
    "dev_addr",
    "docs_dir",
    "edit_uri_template",
    "edit_uri",
    "exclude_docs",
    "extra_css",
    "extra_javascript",
    "extra_templates",
    "hooks",
    "i18n",
    "markdown_extensions",
    "mdx_configs",
    "not_in_nav",
    "plugins",
    "remote_branch",
    "remote_name",
    "repo_name",
    "repo_url",
    "site_dir",
    "strict",
    "use_directory_urls",
    "validation",
    "watch",
];

#[derive(Error, Debug)]
pub enum OverrideError {
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to rebuild configuration: {0}")]
    Deserialize(#[from] toml::de::Error),
    #[error("configuration did not serialize to a table")]
    NotATable,
}

/// Snapshot store and the reset/apply pair that uses it.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrideLayer {
    originals: BTreeMap<String, toml::Value>,
}

impl ConfigOverrideLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys that have been overridden at least once.
    pub fn snapshot_keys(&self) -> impl Iterator<Item = &str> {
        self.originals.keys().map(String::as_str)
    }

    /// Restore every overridden key to its original value.
    pub fn reset(&self, config: &mut SiteConfig) -> Result<(), OverrideError> {
        if self.originals.is_empty() {
            return Ok(());
        }
        let mut table = to_table(config)?;
        for (key, original) in &self.originals {
            table.insert(key.clone(), original.clone());
        }
        *config = toml::Value::Table(table).try_into()?;
        debug!(keys = self.originals.len(), "configuration reset to original values");
        Ok(())
    }

    /// Apply `language`'s overrides. Returns the keys that were applied.
    ///
    /// Forbidden keys, unknown keys, type mismatches and values that do not
    /// form a valid configuration are skipped with a warning.
    pub fn apply(
        &mut self,
        config: &mut SiteConfig,
        language: &LanguageDescriptor,
    ) -> Result<Vec<String>, OverrideError> {
        if language.overrides.is_empty() {
            return Ok(Vec::new());
        }
        let mut table = to_table(config)?;
        let mut applied = Vec::new();

        for (key, value) in &language.overrides {
            if FORBIDDEN_OVERRIDES.contains(&key.as_str()) {
                warn!(language = %language.locale, key = %key, "config key cannot be overridden per language, skipping");
                continue;
            }
            let Some(current) = table.get(key) else {
                warn!(language = %language.locale, key = %key, "unknown config key in language overrides, skipping");
                continue;
            };
            if discriminant(current) != discriminant(value) {
                warn!(
                    language = %language.locale,
                    key = %key,
                    expected = current.type_str(),
                    found = value.type_str(),
                    "language override has the wrong type, skipping"
                );
                continue;
            }

            let merged = match key.as_str() {
                "theme" => merge_nested(current.clone(), value.clone()),
                "extra" => merge_shallow(current.clone(), value.clone()),
                _ => value.clone(),
            };

            let mut candidate = table.clone();
            candidate.insert(key.clone(), merged.clone());
            if let Err(err) = toml::Value::Table(candidate).try_into::<SiteConfig>() {
                warn!(language = %language.locale, key = %key, error = %err, "invalid language override, skipping");
                continue;
            }

            self.originals
                .entry(key.clone())
                .or_insert_with(|| current.clone());
            table.insert(key.clone(), merged);
            applied.push(key.clone());
        }

        *config = toml::Value::Table(table).try_into()?;
        if !applied.is_empty() {
            debug!(language = %language.locale, keys = ?applied, "applied language overrides");
        }
        Ok(applied)
    }
}

fn to_table(config: &SiteConfig) -> Result<toml::Table, OverrideError> {
    match toml::Value::try_from(config)? {
        toml::Value::Table(table) => Ok(table),
        _ => Err(OverrideError::NotATable),
    }
}

/// Tables merge key by key, arrays element by element, scalars replace.
fn merge_nested(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => merge_nested(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            toml::Value::Table(base)
        }
        (toml::Value::Array(mut base), toml::Value::Array(overlay)) => {
            for (idx, value) in overlay.into_iter().enumerate() {
                if idx >= base.len() {
                    base.push(value);
                    continue;
                }
                let current = std::mem::replace(&mut base[idx], toml::Value::Boolean(false));
                base[idx] = if current.is_table() && value.is_table() {
                    merge_nested(current, value)
                } else {
                    value
                };
            }
            toml::Value::Array(base)
        }
        (_, overlay) => overlay,
    }
}

/// Top-level keys of `overlay` replace those of `base`.
fn merge_shallow(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base), toml::Value::Table(overlay)) => {
            base.extend(overlay);
            toml::Value::Table(base)
        }
        (_, overlay) => overlay,
    }
}
