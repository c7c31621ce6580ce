//! Search index: the per-pass index, the cross-language merge, and tokenizer
//! languages.
//!
//! Every language pass writes `search/search_index.json` for the pages it
//! rendered, replacing the previous pass's file. The plugin collects each
//! pass's entries in a [`SearchIndexMerger`]; after the last pass the merged
//! entries are written once more. The merge drops a translated entry when it is
//! a byte-identical copy of its default-language entry, which is what a
//! fallback page produces:
//!
//! ```text
//! about/      "About"  "Same text"     kept
//! fr/about/   "About"  "Same text"     dropped (fallback copy)
//! fr/         "Accueil" "Bonjour"      kept
//! ```

use crate::config::SearchConfig;
use crate::locale::LocaleRegistry;
use pulldown_cmark::{Event, Parser, TagEnd};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Languages the client-side search tokenizer ships stemmers for.
pub const SEARCH_LANGUAGES: &[&str] = &[
    "ar", "da", "de", "du", "en", "es", "fi", "fr", "hi", "hu", "hy", "it", "ja", "jp", "kn", "ko",
    "nl", "no", "pt", "ro", "ru", "sa", "sv", "ta", "te", "th", "tr", "vi", "zh",
];

pub const SEARCH_INDEX_PATH: &str = "search/search_index.json";

const SEPARATOR: &str = r"[\s\-]+";

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEntry {
    pub location: String,
    pub title: String,
    pub text: String,
}

/// Entries collected by one build pass.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    entries: Vec<SearchEntry>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&mut self, url: &str, title: &str, markdown: &str) {
        self.entries.push(SearchEntry {
            location: url.to_string(),
            title: title.to_string(),
            text: plain_text(markdown),
        });
    }

    pub fn entries(&self) -> &[SearchEntry] {
        &self.entries
    }
}

/// Text content of a markdown document, blocks separated by single spaces.
pub fn plain_text(markdown: &str) -> String {
    let mut text = String::new();
    for event in Parser::new(markdown) {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock) => {
                text.push(' ')
            }
            _ => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// On-disk layout of `search/search_index.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIndexFile {
    pub config: SearchIndexConfig,
    pub docs: Vec<SearchEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchIndexConfig {
    pub lang: Vec<String>,
    pub separator: String,
}

impl SearchIndexFile {
    pub fn new(lang: &[String], docs: Vec<SearchEntry>) -> Self {
        let lang = if lang.is_empty() {
            vec!["en".to_string()]
        } else {
            lang.to_vec()
        };
        Self {
            config: SearchIndexConfig {
                lang,
                separator: SEPARATOR.to_string(),
            },
            docs,
        }
    }

    pub fn load(site_dir: &Path) -> Result<Self, SearchError> {
        let content = fs::read_to_string(site_dir.join(SEARCH_INDEX_PATH))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write under `site_dir`. Returns the written path.
    pub fn save(&self, site_dir: &Path) -> Result<PathBuf, SearchError> {
        let path = site_dir.join(SEARCH_INDEX_PATH);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_string(self)?)?;
        Ok(path)
    }
}

/// Accumulates search entries across language passes.
#[derive(Debug, Clone, Default)]
pub struct SearchIndexMerger {
    entries: Vec<SearchEntry>,
}

impl SearchIndexMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, entries: &[SearchEntry]) {
        self.entries.extend_from_slice(entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Merged entries with language-prefixed copies of default-language
    /// entries removed. A copy is only removed when its location is the
    /// default entry's location under the language prefix and its title and
    /// text are identical.
    pub fn finalize(&self, build_languages: &[String], default_language: &str) -> Vec<SearchEntry> {
        let prefixes: Vec<&str> = build_languages
            .iter()
            .map(String::as_str)
            .filter(|lang| *lang != default_language)
            .collect();

        let rooted: HashSet<(String, &str, &str)> = self
            .entries
            .iter()
            .filter(|e| language_of(&normalize_location(&e.location), &prefixes).is_none())
            .map(|e| (normalize_location(&e.location), e.title.as_str(), e.text.as_str()))
            .collect();

        let mut removed = 0;
        let merged: Vec<SearchEntry> = self
            .entries
            .iter()
            .filter(|entry| {
                let location = normalize_location(&entry.location);
                let Some(lang) = language_of(&location, &prefixes) else {
                    return true;
                };
                let reparented = location[lang.len()..].trim_start_matches('/').to_string();
                let duplicate =
                    rooted.contains(&(reparented, entry.title.as_str(), entry.text.as_str()));
                if duplicate {
                    removed += 1;
                }
                !duplicate
            })
            .cloned()
            .collect();

        debug!(
            total = self.entries.len(),
            removed, "merged search entries across languages"
        );
        merged
    }
}

/// `fr/about/index.html#x` → `fr/about#x`, `fr/` → `fr`.
fn normalize_location(location: &str) -> String {
    let (path, anchor) = match location.split_once('#') {
        Some((path, anchor)) => (path, Some(anchor)),
        None => (location, None),
    };
    let path = path.strip_suffix("index.html").unwrap_or(path).trim_matches('/');
    match anchor {
        Some(anchor) => format!("{path}#{anchor}"),
        None => path.to_string(),
    }
}

fn language_of<'a>(location: &str, prefixes: &[&'a str]) -> Option<&'a str> {
    prefixes.iter().copied().find(|lang| {
        location
            .strip_prefix(lang)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('#'))
    })
}

/// Add tokenizer support for every build language to `search.lang`.
///
/// Returns build languages the tokenizer does not support; only the current
/// language's lack of support is logged.
pub fn reconfigure_search_languages(
    search: &mut SearchConfig,
    registry: &LocaleRegistry,
    current: &str,
) -> Vec<String> {
    let mut unsupported = Vec::new();
    for locale in registry.build_locales() {
        let code = tokenizer_code(&locale);
        if SEARCH_LANGUAGES.contains(&code) {
            if !search.lang.iter().any(|l| l == code) {
                search.lang.push(code.to_string());
            }
        } else {
            if locale == current {
                warn!(language = %locale, "search does not support this language, falling back to the default tokenizer");
            }
            unsupported.push(locale);
        }
    }
    unsupported
}

/// `zh-Hant-TW` → `zh`, `pt_BR` → `pt`.
fn tokenizer_code(locale: &str) -> &str {
    locale.split(['-', '_']).next().unwrap_or(locale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::registry;
    use tempfile::TempDir;

    fn entry(location: &str, title: &str, text: &str) -> SearchEntry {
        SearchEntry {
            location: location.into(),
            title: title.into(),
            text: text.into(),
        }
    }

    fn langs(locales: &[&str]) -> Vec<String> {
        locales.iter().map(|l| l.to_string()).collect()
    }

    // =========================================================================
    // Merge
    // =========================================================================

    #[test]
    fn identical_prefixed_entry_is_removed() {
        let mut merger = SearchIndexMerger::new();
        merger.extend(&[entry("about/", "About", "Same")]);
        merger.extend(&[entry("fr/about/", "About", "Same")]);
        let merged = merger.finalize(&langs(&["en", "fr"]), "en");
        assert_eq!(merged, vec![entry("about/", "About", "Same")]);
    }

    #[test]
    fn different_text_is_kept() {
        let mut merger = SearchIndexMerger::new();
        merger.extend(&[entry("about/", "About", "Hello")]);
        merger.extend(&[entry("fr/about/", "About", "Bonjour")]);
        assert_eq!(merger.finalize(&langs(&["en", "fr"]), "en").len(), 2);
    }

    #[test]
    fn homepage_and_flat_urls_normalize() {
        let mut merger = SearchIndexMerger::new();
        merger.extend(&[
            entry("", "Home", "Hi"),
            entry("guide/index.html#setup", "Setup", "Steps"),
        ]);
        merger.extend(&[
            entry("fr/", "Home", "Hi"),
            entry("fr/guide/index.html#setup", "Setup", "Steps"),
        ]);
        let merged = merger.finalize(&langs(&["en", "fr"]), "en");
        let locations: Vec<&str> = merged.iter().map(|e| e.location.as_str()).collect();
        assert_eq!(locations, vec!["", "guide/index.html#setup"]);
    }

    #[test]
    fn same_location_under_other_prefix_is_kept() {
        let mut merger = SearchIndexMerger::new();
        merger.extend(&[entry("about/", "About", "Same")]);
        merger.extend(&[entry("fr/other/", "About", "Same")]);
        merger.extend(&[entry("french/about/", "About", "Same")]);
        assert_eq!(merger.finalize(&langs(&["en", "fr"]), "en").len(), 3);
    }

    #[test]
    fn location_normalization() {
        assert_eq!(normalize_location("fr/about/index.html#x"), "fr/about#x");
        assert_eq!(normalize_location("fr/"), "fr");
        assert_eq!(normalize_location("index.html"), "");
        assert_eq!(normalize_location("about.html"), "about.html");
    }

    // =========================================================================
    // Host index
    // =========================================================================

    #[test]
    fn plain_text_strips_markup() {
        let text = plain_text("# Title\n\nSome *emphasis* and `code`.\n\n- one\n- two\n");
        assert_eq!(text, "Title Some emphasis and code. one two");
    }

    #[test]
    fn index_file_roundtrip_on_disk() {
        let tmp = TempDir::new().unwrap();
        let mut index = SearchIndex::new();
        index.add_page("about/", "About", "# About\n\nText");
        let file = SearchIndexFile::new(&[], index.entries().to_vec());
        let path = file.save(tmp.path()).unwrap();
        assert!(path.ends_with("search/search_index.json"));

        let loaded = SearchIndexFile::load(tmp.path()).unwrap();
        assert_eq!(loaded.config.lang, vec!["en"]);
        assert_eq!(loaded.docs[0].text, "About Text");
    }

    // =========================================================================
    // Tokenizer languages
    // =========================================================================

    #[test]
    fn adds_supported_build_languages() {
        let reg = registry(&["en", "fr", "zh-Hant"]);
        let mut search = SearchConfig::default();
        let unsupported = reconfigure_search_languages(&mut search, &reg, "en");
        assert!(unsupported.is_empty());
        assert_eq!(search.lang, vec!["en", "fr", "zh"]);

        reconfigure_search_languages(&mut search, &reg, "fr");
        assert_eq!(search.lang.len(), 3);
    }

    #[test]
    fn reports_unsupported_languages() {
        let reg = registry(&["en", "pl"]);
        let mut search = SearchConfig::default();
        let unsupported = reconfigure_search_languages(&mut search, &reg, "pl");
        assert_eq!(unsupported, vec!["pl"]);
        assert_eq!(search.lang, vec!["en"]);
    }
}
