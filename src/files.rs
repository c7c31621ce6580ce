//! File resolution: from one physical source tree to a virtual tree per language.
//!
//! Every discovered file is classified once into a [`SourceFile`]. For each
//! build language, [`resolve`] then groups the sources by normalized key and
//! picks one variant per key:
//!
//! ```text
//! key            sources                       fr set
//! index.md       index.md (en), index.fr.md    index.fr.md     → fr/index.html
//! about.md       about.md (en)                 about.md        → fr/about/index.html  (fallback)
//! image.png      image.png (en)                image.png       → image.png            (shared)
//! topic/a.md     topic/a.de.md                 -               (omitted)
//! ```
//!
//! Pages of non-default languages live under `<locale>/`. Assets taken from
//! the default language are shared: they keep their root destination and are
//! written once, by the default pass.

use crate::alternates::AlternateRef;
use crate::locale::LocaleRegistry;
use crate::scan::File;
use crate::structure::{DocsStructure, file_stem, split_file_name};
use crate::types::{FileKind, Origin};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, PartialEq)]
pub enum ResolveError {
    #[error(
        "conflicting files for language '{locale}' at '{key}': choose either '{first}' or '{second}' but not both"
    )]
    Conflict {
        locale: String,
        key: String,
        first: String,
        second: String,
    },
}

/// A classified source file. Created once per scan, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFile {
    pub src_uri: String,
    pub abs_src_path: PathBuf,
    pub normalized_key: String,
    pub detected_locale: String,
    pub is_localized: bool,
    pub kind: FileKind,
    pub origin: Origin,
}

impl SourceFile {
    /// Theme files are language-agnostic and are not classified.
    pub fn classify(file: &File, structure: &dyn DocsStructure, registry: &LocaleRegistry) -> Self {
        let (detected_locale, normalized_key, is_localized) = match file.origin {
            Origin::Docs => {
                let c = structure.classify(&file.src_uri, registry);
                (c.locale, c.normalized_key, c.is_localized)
            }
            Origin::Theme => (
                registry.default_locale().to_string(),
                file.src_uri.clone(),
                false,
            ),
        };
        Self {
            src_uri: file.src_uri.clone(),
            abs_src_path: file.abs_src_path.clone(),
            normalized_key,
            detected_locale,
            is_localized,
            kind: file.kind,
            origin: file.origin,
        }
    }

    pub fn is_documentation(&self) -> bool {
        self.kind == FileKind::Page
    }
}

/// Output location of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// Relative to `site_dir`.
    pub dest_path: String,
    /// Site-relative, no leading slash.
    pub url: String,
}

/// Destination for a normalized key under a language prefix (`""` or `"fr/"`).
///
/// `dest_path` keeps the file name as is; `url` is percent-encoded per segment.
pub fn destination(key: &str, kind: FileKind, prefix: &str, use_directory_urls: bool) -> Destination {
    let (dest_path, url) = raw_destination(key, kind, prefix, use_directory_urls);
    Destination {
        url: encode_url_path(&url),
        dest_path,
    }
}

fn raw_destination(key: &str, kind: FileKind, prefix: &str, use_directory_urls: bool) -> (String, String) {
    if kind == FileKind::Asset {
        let dest_path = format!("{prefix}{key}");
        return (dest_path.clone(), dest_path);
    }

    let (dir, _) = split_file_name(key);
    let stem = file_stem(key);
    if stem == "index" {
        let dest_path = format!("{prefix}{dir}index.html");
        let url = if use_directory_urls {
            format!("{prefix}{dir}")
        } else {
            dest_path.clone()
        };
        return (dest_path, url);
    }
    if dir.is_empty() && stem == "404" {
        let dest_path = format!("{prefix}404.html");
        return (dest_path.clone(), dest_path);
    }
    if use_directory_urls {
        (
            format!("{prefix}{dir}{stem}/index.html"),
            format!("{prefix}{dir}{stem}/"),
        )
    } else {
        let dest_path = format!("{prefix}{dir}{stem}.html");
        (dest_path.clone(), dest_path)
    }
}

/// `release notes/été.html` → `release%20notes/%C3%A9t%C3%A9.html`
pub fn encode_url_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// One resolved entry of a language's virtual tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VirtualFile {
    pub normalized_key: String,
    /// The language whose set owns this file.
    pub language: String,
    /// Locale of the source actually used.
    pub resolved_locale: String,
    pub src_uri: String,
    pub abs_src_path: PathBuf,
    pub kind: FileKind,
    pub origin: Origin,
    pub dest_path: String,
    pub url: String,
    /// Default-language asset reused at the root by another language.
    pub shared: bool,
    /// Default-language page standing in for a missing translation.
    pub fallback: bool,
    /// Filled by the alternate builder; keyed by locale.
    pub alternates: BTreeMap<String, AlternateRef>,
}

impl VirtualFile {
    pub fn is_page(&self) -> bool {
        self.kind == FileKind::Page
    }
}

/// The virtual tree of one language, keyed by normalized key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualFileSet {
    language: String,
    files: BTreeMap<String, VirtualFile>,
    passthrough: Vec<VirtualFile>,
    variants: BTreeMap<String, Vec<String>>,
    by_src: HashMap<String, String>,
}

impl VirtualFileSet {
    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn get(&self, key: &str) -> Option<&VirtualFile> {
        self.files.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut VirtualFile> {
        self.files.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.files.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Resolved docs files in key order.
    pub fn iter(&self) -> impl Iterator<Item = &VirtualFile> {
        self.files.values()
    }

    pub fn pages(&self) -> impl Iterator<Item = &VirtualFile> {
        self.iter().filter(|f| f.is_page())
    }

    pub fn assets(&self) -> impl Iterator<Item = &VirtualFile> {
        self.iter().filter(|f| !f.is_page())
    }

    /// Theme files carried by this set (default language only).
    pub fn passthrough(&self) -> &[VirtualFile] {
        &self.passthrough
    }

    /// Every source path discovered for `key`, in any locale.
    pub fn variants(&self, key: &str) -> &[String] {
        self.variants.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find_by_src_uri(&self, src_uri: &str) -> Option<&VirtualFile> {
        self.by_src.get(src_uri).and_then(|key| self.files.get(key))
    }

    /// Resolve any spelling of a document path (`guide.md`, `guide.fr.md`,
    /// `fr/guide.md`, `README.md`) to this language's chosen file.
    pub fn lookup(
        &self,
        path: &str,
        structure: &dyn DocsStructure,
        registry: &LocaleRegistry,
    ) -> Option<&VirtualFile> {
        self.files
            .get(path)
            .or_else(|| self.find_by_src_uri(path))
            .or_else(|| {
                let key = structure.classify(path, registry).normalized_key;
                self.files.get(&key)
            })
    }

    pub fn fallback_count(&self) -> usize {
        self.files.values().filter(|f| f.fallback).count()
    }

    pub fn shared_count(&self) -> usize {
        self.files.values().filter(|f| f.shared).count()
    }

    pub fn homepage(&self) -> Option<&VirtualFile> {
        self.files
            .get("index.md")
            .or_else(|| self.files.get("index.markdown"))
    }
}

/// Build-wide inputs to [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    pub default_language: String,
    pub fallback: bool,
    pub use_directory_urls: bool,
    /// More than one language is built. A single-language build lets a
    /// tagged variant win over an untagged one instead of conflicting.
    pub multi_language: bool,
}

impl ResolveOptions {
    pub fn new(registry: &LocaleRegistry, fallback: bool, use_directory_urls: bool) -> Self {
        Self {
            default_language: registry.default_locale().to_string(),
            fallback,
            use_directory_urls,
            multi_language: registry.is_multi_language(),
        }
    }
}

/// Resolve the virtual file set of `target`.
///
/// Fails on the first key with two sources in the same locale.
pub fn resolve(
    sources: &[SourceFile],
    target: &str,
    opts: &ResolveOptions,
) -> Result<VirtualFileSet, ResolveError> {
    let is_default = target == opts.default_language;
    let prefix = if is_default {
        String::new()
    } else {
        format!("{target}/")
    };

    let mut groups: BTreeMap<&str, Vec<&SourceFile>> = BTreeMap::new();
    for source in sources.iter().filter(|s| s.origin == Origin::Docs) {
        groups
            .entry(source.normalized_key.as_str())
            .or_default()
            .push(source);
    }

    let mut set = VirtualFileSet {
        language: target.to_string(),
        ..VirtualFileSet::default()
    };

    for (key, mut variants) in groups {
        variants.sort_by(|a, b| a.src_uri.cmp(&b.src_uri));

        let native = select_variant(&variants, target, key, opts.multi_language)?;
        let (chosen, fallback) = match native {
            Some(source) => (source, false),
            None if is_default => continue,
            None => {
                let Some(source) =
                    select_variant(&variants, &opts.default_language, key, opts.multi_language)?
                else {
                    continue;
                };
                if source.kind == FileKind::Page && !opts.fallback {
                    continue;
                }
                (source, source.kind == FileKind::Page)
            }
        };

        let shared =
            chosen.kind == FileKind::Asset && !is_default && chosen.detected_locale != target;
        let dest_prefix = if shared { "" } else { prefix.as_str() };
        let dest = destination(key, chosen.kind, dest_prefix, opts.use_directory_urls);
        if fallback {
            debug!(language = target, key, source = %chosen.src_uri, "falling back to default content");
        }

        for variant in &variants {
            set.by_src.insert(variant.src_uri.clone(), key.to_string());
        }
        set.variants.insert(
            key.to_string(),
            variants.iter().map(|v| v.src_uri.clone()).collect(),
        );
        set.files.insert(
            key.to_string(),
            VirtualFile {
                normalized_key: key.to_string(),
                language: target.to_string(),
                resolved_locale: chosen.detected_locale.clone(),
                src_uri: chosen.src_uri.clone(),
                abs_src_path: chosen.abs_src_path.clone(),
                kind: chosen.kind,
                origin: chosen.origin,
                dest_path: dest.dest_path,
                url: dest.url,
                shared,
                fallback,
                alternates: BTreeMap::new(),
            },
        );
    }

    if is_default {
        let taken: HashSet<String> =
            set.files.values().map(|f| f.dest_path.clone()).collect();
        for source in sources.iter().filter(|s| s.origin == Origin::Theme) {
            if taken.contains(&source.src_uri) {
                debug!(src = %source.src_uri, "theme file shadowed by docs file");
                continue;
            }
            set.passthrough.push(VirtualFile {
                normalized_key: source.normalized_key.clone(),
                language: target.to_string(),
                resolved_locale: target.to_string(),
                src_uri: source.src_uri.clone(),
                abs_src_path: source.abs_src_path.clone(),
                kind: source.kind,
                origin: Origin::Theme,
                dest_path: source.src_uri.clone(),
                url: source.src_uri.clone(),
                shared: false,
                fallback: false,
                alternates: BTreeMap::new(),
            });
        }
    }

    Ok(set)
}

/// The single variant of `key` in `locale`, if any.
///
/// Two variants in one locale conflict, except in a single-language build
/// where exactly one of them is explicitly tagged.
fn select_variant<'a>(
    variants: &[&'a SourceFile],
    locale: &str,
    key: &str,
    multi_language: bool,
) -> Result<Option<&'a SourceFile>, ResolveError> {
    let matching: Vec<&SourceFile> = variants
        .iter()
        .copied()
        .filter(|v| v.detected_locale == locale)
        .collect();
    match matching.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(only)),
        [first, second, ..] => {
            if !multi_language {
                let tagged: Vec<&SourceFile> =
                    matching.iter().copied().filter(|v| v.is_localized).collect();
                if let [winner] = tagged.as_slice() {
                    return Ok(Some(winner));
                }
            }
            Err(ResolveError::Conflict {
                locale: locale.to_string(),
                key: key.to_string(),
                first: first.src_uri.clone(),
                second: second.src_uri.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{FolderStructure, SuffixStructure};
    use crate::test_helpers::{dest_paths, find_file, registry, sources};

    fn options(reg: &LocaleRegistry, fallback: bool) -> ResolveOptions {
        ResolveOptions::new(reg, fallback, true)
    }

    // =========================================================================
    // Destinations
    // =========================================================================

    #[test]
    fn destination_directory_urls() {
        let d = destination("index.md", FileKind::Page, "", true);
        assert_eq!((d.dest_path.as_str(), d.url.as_str()), ("index.html", ""));
        let d = destination("guide/index.md", FileKind::Page, "fr/", true);
        assert_eq!((d.dest_path.as_str(), d.url.as_str()), ("fr/guide/index.html", "fr/guide/"));
        let d = destination("guide/setup.md", FileKind::Page, "fr/", true);
        assert_eq!(
            (d.dest_path.as_str(), d.url.as_str()),
            ("fr/guide/setup/index.html", "fr/guide/setup/")
        );
    }

    #[test]
    fn destination_flat_urls() {
        let d = destination("index.md", FileKind::Page, "fr/", false);
        assert_eq!((d.dest_path.as_str(), d.url.as_str()), ("fr/index.html", "fr/index.html"));
        let d = destination("guide/setup.md", FileKind::Page, "", false);
        assert_eq!((d.dest_path.as_str(), d.url.as_str()), ("guide/setup.html", "guide/setup.html"));
    }

    #[test]
    fn destination_special_cases() {
        assert_eq!(destination("404.md", FileKind::Page, "", true).dest_path, "404.html");
        assert_eq!(destination("img/a.png", FileKind::Asset, "fr/", true).dest_path, "fr/img/a.png");
    }

    #[test]
    fn urls_are_percent_encoded_but_paths_are_not() {
        let d = destination("release notes.md", FileKind::Page, "fr/", true);
        assert_eq!(d.dest_path, "fr/release notes/index.html");
        assert_eq!(d.url, "fr/release%20notes/");

        let d = destination("guide/été.md", FileKind::Page, "", false);
        assert_eq!(d.dest_path, "guide/été.html");
        assert_eq!(d.url, "guide/%C3%A9t%C3%A9.html");

        let d = destination("img/my logo.png", FileKind::Asset, "", true);
        assert_eq!(d.url, "img/my%20logo.png");
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    #[test]
    fn suffix_index_scenario() {
        let reg = registry(&["en", "fr"]);
        let src = sources(&SuffixStructure, &reg, &["index.md", "index.fr.md"]);
        let opts = options(&reg, true);

        let en = resolve(&src, "en", &opts).unwrap();
        let home = en.get("index.md").unwrap();
        assert_eq!(home.src_uri, "index.md");
        assert_eq!(home.dest_path, "index.html");
        assert_eq!(home.url, "");

        let fr = resolve(&src, "fr", &opts).unwrap();
        let home = fr.get("index.md").unwrap();
        assert_eq!(home.src_uri, "index.fr.md");
        assert_eq!(home.dest_path, "fr/index.html");
        assert_eq!(home.url, "fr/");
        assert!(!home.fallback);
    }

    #[test]
    fn fallback_uses_default_content_under_prefix() {
        let reg = registry(&["en", "fr"]);
        let src = sources(&SuffixStructure, &reg, &["index.md"]);
        let fr = resolve(&src, "fr", &options(&reg, true)).unwrap();
        let home = fr.get("index.md").unwrap();
        assert_eq!(home.src_uri, "index.md");
        assert_eq!(home.resolved_locale, "en");
        assert_eq!(home.dest_path, "fr/index.html");
        assert!(home.fallback);
        assert_eq!(fr.fallback_count(), 1);
    }

    #[test]
    fn without_fallback_missing_pages_are_omitted() {
        let reg = registry(&["en", "fr"]);
        let src = sources(&SuffixStructure, &reg, &["index.md", "index.fr.md", "about.md"]);
        let fr = resolve(&src, "fr", &options(&reg, false)).unwrap();
        assert!(fr.contains("index.md"));
        assert!(!fr.contains("about.md"));
    }

    #[test]
    fn assets_from_default_are_shared_at_root() {
        let reg = registry(&["en", "fr"]);
        let src = sources(
            &SuffixStructure,
            &reg,
            &["image.png", "image.fr.png", "css/site.css"],
        );
        let fr = resolve(&src, "fr", &options(&reg, false)).unwrap();

        let css = fr.get("css/site.css").unwrap();
        assert!(css.shared);
        assert_eq!(css.dest_path, "css/site.css");

        let image = fr.get("image.png").unwrap();
        assert!(!image.shared);
        assert_eq!(image.src_uri, "image.fr.png");
        assert_eq!(image.dest_path, "fr/image.png");
        assert_eq!(fr.shared_count(), 1);
    }

    #[test]
    fn keys_only_in_other_languages_are_omitted() {
        let reg = registry(&["en", "fr", "de"]);
        let src = sources(&SuffixStructure, &reg, &["index.md", "only.fr.md"]);
        let opts = options(&reg, true);
        assert!(!resolve(&src, "en", &opts).unwrap().contains("only.md"));
        assert!(!resolve(&src, "de", &opts).unwrap().contains("only.md"));
        assert!(resolve(&src, "fr", &opts).unwrap().contains("only.md"));
    }

    #[test]
    fn resolution_is_complete() {
        let reg = registry(&["en", "fr", "de"]);
        let src = sources(
            &SuffixStructure,
            &reg,
            &["index.md", "index.fr.md", "a.md", "b.de.md", "c.fr.md", "c.de.md"],
        );
        let opts = options(&reg, true);
        for lang in ["en", "fr", "de"] {
            let set = resolve(&src, lang, &opts).unwrap();
            for key in ["index.md", "a.md", "b.md", "c.md"] {
                let native = src
                    .iter()
                    .any(|s| s.normalized_key == key && s.detected_locale == lang);
                let default = src
                    .iter()
                    .any(|s| s.normalized_key == key && s.detected_locale == "en");
                assert_eq!(set.contains(key), native || default, "{lang} {key}");
            }
        }
    }

    #[test]
    fn fallback_is_idempotent_with_full_translations() {
        let reg = registry(&["en", "fr"]);
        let src = sources(
            &SuffixStructure,
            &reg,
            &["index.md", "index.fr.md", "a.md", "a.fr.md"],
        );
        let with = resolve(&src, "fr", &options(&reg, true)).unwrap();
        let without = resolve(&src, "fr", &options(&reg, false)).unwrap();
        assert_eq!(with, without);
    }

    #[test]
    fn tagged_and_untagged_default_conflict() {
        let reg = registry(&["en", "fr"]);
        let src = sources(&SuffixStructure, &reg, &["foo.md", "foo.en.md"]);
        let err = resolve(&src, "en", &options(&reg, true)).unwrap_err();
        assert_eq!(
            err,
            ResolveError::Conflict {
                locale: "en".into(),
                key: "foo.md".into(),
                first: "foo.en.md".into(),
                second: "foo.md".into(),
            }
        );
        let msg = err.to_string();
        assert!(msg.contains("foo.en.md") && msg.contains("foo.md"));
    }

    #[test]
    fn conflict_also_fails_fallback_languages() {
        let reg = registry(&["en", "fr"]);
        let src = sources(&SuffixStructure, &reg, &["foo.md", "foo.en.md"]);
        assert!(resolve(&src, "fr", &options(&reg, true)).is_err());
    }

    #[test]
    fn single_language_build_prefers_tagged_variant() {
        let reg = registry(&["en"]);
        let src = sources(&SuffixStructure, &reg, &["foo.md", "foo.en.md"]);
        let en = resolve(&src, "en", &options(&reg, true)).unwrap();
        assert_eq!(en.get("foo.md").unwrap().src_uri, "foo.en.md");
    }

    #[test]
    fn folder_structure_resolution() {
        let reg = registry(&["en", "fr"]);
        let src = sources(
            &FolderStructure,
            &reg,
            &["en/index.md", "en/about.md", "fr/index.md", "assets/logo.svg"],
        );
        let opts = options(&reg, true);
        let en = resolve(&src, "en", &opts).unwrap();
        assert_eq!(
            dest_paths(&en),
            vec!["about/index.html", "assets/logo.svg", "index.html"]
        );
        let fr = resolve(&src, "fr", &opts).unwrap();
        assert_eq!(
            dest_paths(&fr),
            vec!["fr/about/index.html", "assets/logo.svg", "fr/index.html"]
        );
        assert_eq!(find_file(&fr, "index.md").src_uri, "fr/index.md");
    }

    // =========================================================================
    // Lookups and theme files
    // =========================================================================

    #[test]
    fn lookup_accepts_any_variant_spelling() {
        let reg = registry(&["en", "fr"]);
        let src = sources(
            &SuffixStructure,
            &reg,
            &["topic/page.en.md", "topic/page.fr.md", "guide/README.md"],
        );
        let fr = resolve(&src, "fr", &options(&reg, true)).unwrap();
        for path in ["topic/page.md", "topic/page.en.md", "topic/page.fr.md"] {
            let hit = fr.lookup(path, &SuffixStructure, &reg).unwrap();
            assert_eq!(hit.src_uri, "topic/page.fr.md", "{path}");
        }
        assert_eq!(
            fr.lookup("guide/README.md", &SuffixStructure, &reg).unwrap().normalized_key,
            "guide/index.md"
        );
        assert_eq!(fr.variants("topic/page.md").len(), 2);
    }

    #[test]
    fn theme_files_pass_through_default_only() {
        let reg = registry(&["en", "fr"]);
        let mut src = sources(&SuffixStructure, &reg, &["index.md", "main.html"]);
        for path in ["main.html", "partials/footer.html"] {
            src.push(SourceFile {
                src_uri: path.into(),
                abs_src_path: PathBuf::from("/theme").join(path),
                normalized_key: path.into(),
                detected_locale: "en".into(),
                is_localized: false,
                kind: FileKind::Asset,
                origin: Origin::Theme,
            });
        }
        let opts = options(&reg, true);
        let en = resolve(&src, "en", &opts).unwrap();
        let theme: Vec<&str> = en.passthrough().iter().map(|f| f.src_uri.as_str()).collect();
        assert_eq!(theme, vec!["partials/footer.html"]);
        assert!(resolve(&src, "fr", &opts).unwrap().passthrough().is_empty());
    }

    #[test]
    fn homepage_detection() {
        let reg = registry(&["en", "fr"]);
        let src = sources(&SuffixStructure, &reg, &["README.md", "about.md"]);
        let en = resolve(&src, "en", &options(&reg, true)).unwrap();
        assert_eq!(en.homepage().unwrap().src_uri, "README.md");
    }
}
