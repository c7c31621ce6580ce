//! Theme reconfiguration and the language switcher.
//!
//! On every language pass the theme is told which language it renders
//! (`theme.locale`, `theme.language`) and `extra.alternate` receives the
//! language switcher:
//!
//! ```toml
//! [[extra.alternate]]
//! name = "English"
//! link = "/docs/"
//! lang = "en"
//!
//! [[extra.alternate]]
//! name = "Français"
//! link = "/docs/fr/"
//! lang = "fr"
//! ```
//!
//! A switcher written by the user is validated and kept as is.

use crate::config::{ConfigError, SiteConfig};
use crate::locale::{LanguageDescriptor, LocaleRegistry};
use crate::types::SwitcherEntry;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Key of the switcher in `extra`.
pub const SWITCHER_KEY: &str = "alternate";

/// Theme feature that keeps the page across switches, breaking per-language
/// assets.
const INSTANT_NAVIGATION: &str = "navigation.instant";

pub fn reconfigure_theme(config: &mut SiteConfig, language: &LanguageDescriptor) {
    config.theme.locale = language.locale.clone();
    config.theme.language = language.locale.clone();
}

/// Switcher entries for all languages. Unbuilt languages are left out,
/// except `null` placeholders.
pub fn switcher_entries(registry: &LocaleRegistry, config: &SiteConfig) -> Vec<SwitcherEntry> {
    let base = config.base_path();
    registry
        .iter()
        .filter(|lang| lang.build || lang.is_null())
        .map(|lang| {
            let link = match &lang.fixed_link {
                Some(fixed) => fixed.clone(),
                None if config.use_directory_urls => format!("{base}{}", lang.link),
                None => format!("{base}{}index.html", lang.link),
            };
            SwitcherEntry {
                name: lang.name.clone(),
                link,
                lang: lang.locale.clone(),
            }
        })
        .collect()
}

/// Parse `extra.alternate`. `None` when absent or malformed.
pub fn switcher_from_extra(extra: &toml::Table) -> Option<Vec<SwitcherEntry>> {
    extra.get(SWITCHER_KEY)?.clone().try_into().ok()
}

/// Language switcher state kept across passes.
#[derive(Debug, Clone, Default)]
pub struct LanguageSwitcher {
    entries: Vec<SwitcherEntry>,
    /// Decided on the first pass, before anything is written to `extra`.
    user_defined: Option<bool>,
}

impl LanguageSwitcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[SwitcherEntry] {
        &self.entries
    }

    pub fn is_user_defined(&self) -> bool {
        self.user_defined.unwrap_or(false)
    }

    /// Forget the entries and whether the user defined them.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.user_defined = None;
    }

    /// Write the switcher into `config.extra`, or validate the user's.
    ///
    /// Only acts when more than one language is built or a `null`
    /// placeholder exists.
    pub fn reconfigure(
        &mut self,
        config: &mut SiteConfig,
        registry: &LocaleRegistry,
    ) -> Result<(), ConfigError> {
        if !registry.is_multi_language() && !registry.has_null() {
            return Ok(());
        }
        let user_defined = *self
            .user_defined
            .get_or_insert_with(|| config.extra.contains_key(SWITCHER_KEY));

        if user_defined {
            let Some(entries) = switcher_from_extra(&config.extra) else {
                return Err(ConfigError::Validation(format!(
                    "extra.{SWITCHER_KEY}: every entry needs exactly the keys name, link and lang"
                )));
            };
            self.entries = entries;
        } else {
            self.entries = switcher_entries(registry, config);
            let value = toml::Value::try_from(&self.entries).map_err(|err| {
                ConfigError::Validation(format!("extra.{SWITCHER_KEY}: {err}"))
            })?;
            config.extra.insert(SWITCHER_KEY.to_string(), value);
            debug!(entries = self.entries.len(), "language switcher configured");
        }

        if config.theme.features.iter().any(|f| f == INSTANT_NAVIGATION) {
            warn!(
                "theme feature '{INSTANT_NAVIGATION}' is enabled: language switching may show stale content"
            );
        }
        Ok(())
    }

    /// Switcher for one page: each language links to the page's alternate in
    /// that language. Home pages keep the language root links. A switcher
    /// written by the user is never rewritten.
    pub fn for_page(
        &self,
        alternate_urls: &BTreeMap<String, String>,
        base_path: &str,
        is_homepage: bool,
    ) -> Vec<SwitcherEntry> {
        if is_homepage || self.is_user_defined() {
            return self.entries.clone();
        }
        self.entries
            .iter()
            .map(|entry| match alternate_urls.get(&entry.lang) {
                Some(url) => SwitcherEntry {
                    link: format!("{base_path}/{url}"),
                    ..entry.clone()
                },
                None => entry.clone(),
            })
            .collect()
    }
}
