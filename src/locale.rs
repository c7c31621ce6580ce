//! Locale registry.
//!
//! Turns the `[[i18n.languages]]` tables into validated [`LanguageDescriptor`]s
//! and answers every "which languages?" question the build asks: the default
//! language, the languages to build and their order, and whether a path
//! segment looks like a locale tag.
//!
//! ## Locale Codes
//!
//! ```text
//! fr          two-letter ISO 639-1 code
//! fr-CA       with region
//! fr_CA       with region, underscore form
//! zh-Hant     with script
//! zh-Hant-TW  with script and region
//! null        placeholder entry for the language switcher only
//! ```

use crate::config::{ConfigError, I18nConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

/// Locale token for a switcher-only entry that is never built.
pub const NULL_LOCALE: &str = "null";

static LOCALE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z]{2}(?:-[A-Za-z]{4})?(?:-[A-Z]{2})?|[a-z]{2}_[A-Z]{2})$")
        .expect("locale pattern must compile")
});

/// Whether `candidate` is shaped like a locale code.
pub fn is_locale_code(candidate: &str) -> bool {
    LOCALE_PATTERN.is_match(candidate)
}

/// One `[[i18n.languages]]` table as written by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub locale: String,
    pub name: String,
    #[serde(default = "default_build")]
    pub build: bool,
    #[serde(default)]
    pub default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_link: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub nav_translations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub admonition_translations: BTreeMap<String, String>,
    /// Everything else: site config keys overridden for this language.
    #[serde(flatten)]
    pub overrides: toml::Table,
}

fn default_build() -> bool {
    true
}

impl LanguageConfig {
    pub fn new(locale: &str, name: &str) -> Self {
        Self {
            locale: locale.to_string(),
            name: name.to_string(),
            build: true,
            default: false,
            link: None,
            fixed_link: None,
            nav_translations: BTreeMap::new(),
            admonition_translations: BTreeMap::new(),
            overrides: toml::Table::new(),
        }
    }
}

/// A validated language. Immutable for the duration of a build.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageDescriptor {
    pub locale: String,
    pub name: String,
    pub build: bool,
    pub default: bool,
    /// Switcher link, always starting and ending with `/`.
    pub link: String,
    pub fixed_link: Option<String>,
    pub nav_translations: BTreeMap<String, String>,
    pub admonition_translations: BTreeMap<String, String>,
    pub overrides: toml::Table,
}

impl LanguageDescriptor {
    pub fn is_null(&self) -> bool {
        self.locale == NULL_LOCALE
    }

    /// Output path prefix: empty for the default language, `"<locale>/"` otherwise.
    pub fn path_prefix(&self) -> String {
        if self.default {
            String::new()
        } else {
            format!("{}/", self.locale)
        }
    }
}

/// Ordered, validated set of languages with exactly one built default.
#[derive(Debug, Clone, PartialEq)]
pub struct LocaleRegistry {
    languages: Vec<LanguageDescriptor>,
    default_index: usize,
}

impl LocaleRegistry {
    /// Validate the i18n section and build the registry.
    ///
    /// Errors name the offending field, e.g. `i18n.languages[1].link`.
    pub fn from_config(config: &I18nConfig) -> Result<Self, ConfigError> {
        if config.languages.is_empty() {
            return Err(ConfigError::Validation(
                "i18n.languages: at least one language must be declared".into(),
            ));
        }

        let only = config.build_only_locale.as_deref();
        if let Some(only) = only
            && !config.languages.iter().any(|l| l.locale == only)
        {
            return Err(ConfigError::Validation(format!(
                "i18n.build_only_locale: '{only}' is not one of the declared languages"
            )));
        }

        let mut seen = HashSet::new();
        let mut languages = Vec::with_capacity(config.languages.len());
        for (idx, lang) in config.languages.iter().enumerate() {
            languages.push(validate_language(idx, lang, only, &mut seen)?);
        }

        let defaults: Vec<usize> = languages
            .iter()
            .enumerate()
            .filter(|(_, l)| l.default)
            .map(|(idx, _)| idx)
            .collect();
        let default_index = match defaults.as_slice() {
            [] => {
                return Err(ConfigError::Validation(
                    "i18n.languages: no language is marked as default".into(),
                ));
            }
            [idx] => *idx,
            many => {
                let locales: Vec<&str> = many
                    .iter()
                    .map(|&idx| languages[idx].locale.as_str())
                    .collect();
                return Err(ConfigError::Validation(format!(
                    "i18n.languages: only one language can be default, found {}",
                    locales.join(", ")
                )));
            }
        };
        if !languages[default_index].build {
            return Err(ConfigError::Validation(format!(
                "i18n.languages[{default_index}].build: the default language '{}' must be built",
                languages[default_index].locale
            )));
        }

        Ok(Self {
            languages,
            default_index,
        })
    }

    pub fn default_language(&self) -> &LanguageDescriptor {
        &self.languages[self.default_index]
    }

    pub fn default_locale(&self) -> &str {
        &self.default_language().locale
    }

    pub fn get(&self, locale: &str) -> Option<&LanguageDescriptor> {
        self.languages.iter().find(|l| l.locale == locale)
    }

    /// All declared languages in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &LanguageDescriptor> {
        self.languages.iter()
    }

    /// Locales to build, in configuration order.
    pub fn build_locales(&self) -> Vec<String> {
        self.languages
            .iter()
            .filter(|l| l.build)
            .map(|l| l.locale.clone())
            .collect()
    }

    /// Locales in the order they are built: the default first, then the
    /// others in configuration order.
    pub fn build_order(&self) -> Vec<String> {
        let default = self.default_locale();
        std::iter::once(default.to_string())
            .chain(
                self.languages
                    .iter()
                    .filter(|l| l.build && l.locale != default)
                    .map(|l| l.locale.clone()),
            )
            .collect()
    }

    pub fn is_multi_language(&self) -> bool {
        self.languages.iter().filter(|l| l.build).count() > 1
    }

    pub fn has_null(&self) -> bool {
        self.languages.iter().any(|l| l.is_null())
    }

    /// Declared (non-placeholder) locale.
    pub fn contains(&self, locale: &str) -> bool {
        locale != NULL_LOCALE && self.get(locale).is_some()
    }

    /// Declared locale, or anything shaped like one.
    pub fn is_locale_tag(&self, candidate: &str) -> bool {
        self.contains(candidate) || is_locale_code(candidate)
    }
}

fn validate_language(
    idx: usize,
    lang: &LanguageConfig,
    only: Option<&str>,
    seen: &mut HashSet<String>,
) -> Result<LanguageDescriptor, ConfigError> {
    let field = format!("i18n.languages[{idx}]");
    let is_null = lang.locale == NULL_LOCALE;

    if !is_null && !is_locale_code(&lang.locale) {
        return Err(ConfigError::Validation(format!(
            "{field}.locale: '{}' is not a valid locale code (expected xx, xx-XX, xx_XX, xx-Xxxx or xx-Xxxx-XX)",
            lang.locale
        )));
    }
    if !seen.insert(lang.locale.clone()) {
        return Err(ConfigError::Validation(format!(
            "{field}.locale: '{}' is declared more than once",
            lang.locale
        )));
    }
    if lang.name.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "{field}.name: must not be empty"
        )));
    }

    let (mut build, mut default) = (lang.build, lang.default);
    if let Some(only) = only {
        build = lang.locale == only;
        default = build;
    }
    if is_null {
        if lang.fixed_link.is_none() {
            return Err(ConfigError::Validation(format!(
                "{field}.fixed_link: the '{NULL_LOCALE}' locale requires a fixed_link"
            )));
        }
        build = false;
    }

    let link = match &lang.link {
        Some(link) if !(link.starts_with('/') && link.ends_with('/')) => {
            return Err(ConfigError::Validation(format!(
                "{field}.link: '{link}' must start and end with '/'"
            )));
        }
        Some(link) => link.clone(),
        None if default => "/".to_string(),
        None => format!("/{}/", lang.locale),
    };

    Ok(LanguageDescriptor {
        locale: lang.locale.clone(),
        name: lang.name.clone(),
        build,
        default,
        link,
        fixed_link: lang.fixed_link.clone(),
        nav_translations: lang.nav_translations.clone(),
        admonition_translations: lang.admonition_translations.clone(),
        overrides: lang.overrides.clone(),
    })
}
