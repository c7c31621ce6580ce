//! Cross-language alternate links.
//!
//! All per-language [`VirtualFileSet`]s live in one arena, [`LanguageFileSets`].
//! Alternates are stored as `(language, normalized_key)` pairs and resolved
//! through the arena on demand, so files never point at each other directly.

use crate::files::{VirtualFile, VirtualFileSet};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Lookup key of a file in another language's set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AlternateRef {
    pub language: String,
    pub normalized_key: String,
}

impl AlternateRef {
    pub fn new(language: &str, normalized_key: &str) -> Self {
        Self {
            language: language.to_string(),
            normalized_key: normalized_key.to_string(),
        }
    }
}

/// Resolved file sets, one per built language.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LanguageFileSets {
    sets: BTreeMap<String, VirtualFileSet>,
}

impl LanguageFileSets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, set: VirtualFileSet) {
        self.sets.insert(set.language().to_string(), set);
    }

    pub fn get(&self, language: &str) -> Option<&VirtualFileSet> {
        self.sets.get(language)
    }

    pub fn resolve(&self, alternate: &AlternateRef) -> Option<&VirtualFile> {
        self.sets
            .get(&alternate.language)
            .and_then(|set| set.get(&alternate.normalized_key))
    }

    /// Alternates of `file`, resolved, in locale order.
    pub fn alternates<'a>(&'a self, file: &'a VirtualFile) -> Vec<(&'a str, &'a VirtualFile)> {
        file.alternates
            .iter()
            .filter_map(|(locale, alt)| self.resolve(alt).map(|f| (locale.as_str(), f)))
            .collect()
    }
}

/// Fill `alternates` on every page of every built language.
///
/// Each language's sibling is looked up under the same normalized key; with
/// fallback on, a missing sibling points at the default language's page.
/// All links are computed against the untouched sets before any is written.
pub fn build_alternates(
    sets: &mut LanguageFileSets,
    build_languages: &[String],
    default_language: &str,
    fallback: bool,
) {
    let mut computed: Vec<(String, String, BTreeMap<String, AlternateRef>)> = Vec::new();

    for language in build_languages {
        let Some(set) = sets.get(language) else {
            continue;
        };
        for file in set.pages() {
            let key = &file.normalized_key;
            let mut alternates = BTreeMap::new();
            for other in build_languages {
                let target = if other == language {
                    Some(AlternateRef::new(language, key))
                } else if sets.get(other).is_some_and(|s| s.contains(key)) {
                    Some(AlternateRef::new(other, key))
                } else if fallback
                    && sets.get(default_language).is_some_and(|s| s.contains(key))
                {
                    Some(AlternateRef::new(default_language, key))
                } else {
                    None
                };
                if let Some(target) = target {
                    alternates.insert(other.clone(), target);
                }
            }
            computed.push((language.clone(), key.clone(), alternates));
        }
    }

    let linked = computed.len();
    for (language, key, alternates) in computed {
        if let Some(file) = sets.sets.get_mut(&language).and_then(|s| s.get_mut(&key)) {
            file.alternates = alternates;
        }
    }
    debug!(pages = linked, "alternate links built");
}

#[derive(Error, Debug)]
pub enum SitemapError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sitemap is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// `sitemap.xml` covering every built language, with hreflang alternates.
pub fn render_sitemap(
    sets: &LanguageFileSets,
    build_languages: &[String],
    site_url: &str,
) -> Result<String, SitemapError> {
    let base = if site_url.is_empty() {
        "/".to_string()
    } else {
        format!("{}/", site_url.trim_end_matches('/'))
    };

    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    w.write_event(Event::Start(
        BytesStart::new("urlset").with_attributes([("xmlns", SITEMAP_NS), ("xmlns:xhtml", XHTML_NS)]),
    ))?;

    for language in build_languages {
        let Some(set) = sets.get(language) else {
            continue;
        };
        for file in set.pages() {
            w.write_event(Event::Start(BytesStart::new("url")))?;
            w.write_event(Event::Start(BytesStart::new("loc")))?;
            w.write_event(Event::Text(BytesText::new(&format!("{base}{}", file.url))))?;
            w.write_event(Event::End(BytesEnd::new("loc")))?;
            for (locale, alt) in sets.alternates(file) {
                let href = format!("{base}{}", alt.url);
                w.write_event(Event::Empty(BytesStart::new("xhtml:link").with_attributes([
                    ("rel", "alternate"),
                    ("hreflang", locale),
                    ("href", href.as_str()),
                ])))?;
            }
            w.write_event(Event::End(BytesEnd::new("url")))?;
        }
    }

    w.write_event(Event::End(BytesEnd::new("urlset")))?;
    let mut xml = String::from_utf8(w.into_inner())?;
    xml.push('\n');
    Ok(xml)
}
