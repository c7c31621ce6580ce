//! Path classification: which locale a source file belongs to.
//!
//! Two conventions tag source files with a locale. Both are implemented
//! behind the [`DocsStructure`] trait; the plugin picks one from
//! `i18n.docs_structure` at startup and only talks to the trait afterwards.
//!
//! ```text
//! suffix                      folder
//! docs/                       docs/
//! ├── index.md                ├── en/
//! ├── index.fr.md             │   ├── index.md
//! └── guide/                  │   └── guide/setup.md
//!     ├── setup.md            ├── fr/
//!     └── setup.fr.md         │   ├── index.md
//!                             │   └── guide/setup.md
//!                             └── assets/logo.svg
//! ```
//!
//! Either way, `guide/setup.fr.md` and `fr/guide/setup.md` get the normalized
//! key `guide/setup.md`, which is what correlates translations of one
//! document. `README.md` folds to `index.md` in the key.

use crate::locale::LocaleRegistry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Extensions treated as documentation pages.
pub const PAGE_EXTENSIONS: &[&str] = &["md", "markdown"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureKind {
    #[default]
    Suffix,
    Folder,
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureKind::Suffix => f.write_str("suffix"),
            StructureKind::Folder => f.write_str("folder"),
        }
    }
}

/// Result of classifying one source path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// The tagged locale, or the default locale for untagged files.
    pub locale: String,
    /// Locale-free path used to correlate translations.
    pub normalized_key: String,
    /// Whether the path carried an explicit locale tag.
    pub is_localized: bool,
}

pub trait DocsStructure: fmt::Debug {
    fn kind(&self) -> StructureKind;

    /// Split a docs-relative path into its locale tag and the locale-free
    /// remainder. `None` when the path carries no tag.
    fn split_locale(&self, src_uri: &str, registry: &LocaleRegistry) -> Option<(String, String)>;

    /// Never fails: an unrecognized segment just means "not localized".
    fn classify(&self, src_uri: &str, registry: &LocaleRegistry) -> Classification {
        match self.split_locale(src_uri, registry) {
            Some((locale, rest)) => Classification {
                locale,
                normalized_key: fold_readme(&rest),
                is_localized: true,
            },
            None => Classification {
                locale: registry.default_locale().to_string(),
                normalized_key: fold_readme(src_uri),
                is_localized: false,
            },
        }
    }
}

/// `name.<locale>.ext` tagging.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuffixStructure;

impl DocsStructure for SuffixStructure {
    fn kind(&self) -> StructureKind {
        StructureKind::Suffix
    }

    fn split_locale(&self, src_uri: &str, registry: &LocaleRegistry) -> Option<(String, String)> {
        let (dir, file_name) = split_file_name(src_uri);
        let (rest, ext) = file_name.rsplit_once('.')?;
        let (stem, tag) = rest.rsplit_once('.')?;
        if stem.is_empty() || !registry.is_locale_tag(tag) {
            return None;
        }
        Some((tag.to_string(), format!("{dir}{stem}.{ext}")))
    }
}

/// `<locale>/path` tagging.
///
/// Only declared locales count as tags: a top-level `js/` or `de/` folder
/// that is not a configured language stays shared content.
#[derive(Debug, Clone, Copy, Default)]
pub struct FolderStructure;

impl DocsStructure for FolderStructure {
    fn kind(&self) -> StructureKind {
        StructureKind::Folder
    }

    fn split_locale(&self, src_uri: &str, registry: &LocaleRegistry) -> Option<(String, String)> {
        let (first, rest) = src_uri.split_once('/')?;
        if rest.is_empty() || !registry.contains(first) {
            return None;
        }
        Some((first.to_string(), rest.to_string()))
    }
}

pub fn for_kind(kind: StructureKind) -> Box<dyn DocsStructure> {
    match kind {
        StructureKind::Suffix => Box::new(SuffixStructure),
        StructureKind::Folder => Box::new(FolderStructure),
    }
}

/// Split `a/b/c.md` into `("a/b/", "c.md")`.
pub fn split_file_name(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..=idx], &path[idx + 1..]),
        None => ("", path),
    }
}

/// File stem of the last path segment: `a/b/c.fr.md` → `c.fr`.
pub fn file_stem(path: &str) -> &str {
    let (_, name) = split_file_name(path);
    name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name)
}

pub fn is_documentation(path: &str) -> bool {
    let (_, name) = split_file_name(path);
    name.rsplit_once('.')
        .map(|(_, ext)| PAGE_EXTENSIONS.iter().any(|p| ext.eq_ignore_ascii_case(p)))
        .unwrap_or(false)
}

/// `README.md` (any case) → `index.md`; everything else unchanged.
pub fn fold_readme(path: &str) -> String {
    if !is_documentation(path) {
        return path.to_string();
    }
    let (dir, name) = split_file_name(path);
    match name.rsplit_once('.') {
        Some((stem, ext)) if stem.eq_ignore_ascii_case("readme") => format!("{dir}index.{ext}"),
        _ => path.to_string(),
    }
}
