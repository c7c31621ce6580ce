//! The i18n plugin: every component wired into the generator's hook pipeline.
//!
//! The plugin is stateful across passes. The orchestrator sets the current
//! language before each pass; the hooks then do, in order:
//!
//! | Hook               | Work                                                       |
//! |--------------------|------------------------------------------------------------|
//! | `on_config`        | reset overrides, theme + switcher, search languages, apply overrides |
//! | `on_files`         | resolve all languages once, hand out this language's files |
//! | `on_nav`           | translate titles, strip language sections, find homepage   |
//! | `on_page_markdown` | translate admonition titles                                |
//! | `on_page_context`  | hreflang alternates, per-page language switcher            |
//! | `on_post_build`    | collect this pass's search entries                         |

use crate::admonitions::{ADMONITION_EXTENSION, translate_admonitions};
use crate::alternates::{LanguageFileSets, build_alternates};
use crate::config::{ConfigError, SiteConfig};
use crate::files::{ResolveError, ResolveOptions, SourceFile, VirtualFileSet, resolve};
use crate::generate::{PassSummary, Plugin};
use crate::locale::{LanguageDescriptor, LocaleRegistry};
use crate::nav::{LocalizeOptions, homepage_urls, localize};
use crate::overrides::{ConfigOverrideLayer, OverrideError};
use crate::scan::{File, Files};
use crate::search::{SearchIndex, SearchIndexMerger, reconfigure_search_languages};
use crate::structure::{DocsStructure, StructureKind, file_stem, for_kind};
use crate::theme::{LanguageSwitcher, reconfigure_theme};
use crate::types::{HrefLang, Navigation, Page, PageContext};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PluginError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Override(#[from] OverrideError),
    #[error("no current language set for this build pass")]
    NoCurrentLanguage,
    #[error("'{0}' is not a built language")]
    UnknownLanguage(String),
    #[error("build hook out of order: cannot go from {from} to {to}")]
    OutOfOrder { from: String, to: String },
}

/// What happened to one language across its pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LanguageReport {
    pub locale: String,
    pub name: String,
    pub pages: usize,
    pub assets: usize,
    pub fallback_pages: usize,
    pub shared_assets: usize,
    pub nav_translated: usize,
    pub homepage: Option<String>,
    pub overrides_applied: Vec<String>,
    pub admonitions_translated: usize,
    /// Assets this pass actually copied.
    pub assets_copied: usize,
}

#[derive(Debug)]
pub struct I18nPlugin {
    registry: LocaleRegistry,
    structure: Box<dyn DocsStructure>,
    fallback: bool,
    reconfigure_theme: bool,
    reconfigure_search: bool,
    current: Option<String>,
    overrides: ConfigOverrideLayer,
    switcher: LanguageSwitcher,
    file_sets: Option<LanguageFileSets>,
    search: SearchIndexMerger,
    reports: BTreeMap<String, LanguageReport>,
    building: bool,
}

impl I18nPlugin {
    /// Validate the i18n configuration and pick the docs structure.
    pub fn from_config(config: &SiteConfig) -> Result<Self, PluginError> {
        let registry = LocaleRegistry::from_config(&config.i18n)?;
        let i18n = &config.i18n;
        debug!(
            structure = %i18n.docs_structure,
            languages = ?registry.build_order(),
            "i18n plugin configured"
        );
        Ok(Self {
            registry,
            structure: for_kind(i18n.docs_structure),
            fallback: i18n.fallback_to_default,
            reconfigure_theme: i18n.reconfigure_theme,
            reconfigure_search: i18n.reconfigure_search,
            current: None,
            overrides: ConfigOverrideLayer::new(),
            switcher: LanguageSwitcher::new(),
            file_sets: None,
            search: SearchIndexMerger::new(),
            reports: BTreeMap::new(),
            building: false,
        })
    }

    pub fn registry(&self) -> &LocaleRegistry {
        &self.registry
    }

    pub fn structure(&self) -> &dyn DocsStructure {
        self.structure.as_ref()
    }

    pub fn build_order(&self) -> Vec<String> {
        self.registry.build_order()
    }

    pub fn set_current_language(&mut self, locale: &str) -> Result<(), PluginError> {
        match self.registry.get(locale) {
            Some(lang) if lang.build => {
                self.current = Some(locale.to_string());
                Ok(())
            }
            _ => Err(PluginError::UnknownLanguage(locale.to_string())),
        }
    }

    pub fn current_locale(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current_language(&self) -> Result<&LanguageDescriptor, PluginError> {
        self.current
            .as_deref()
            .and_then(|locale| self.registry.get(locale))
            .ok_or(PluginError::NoCurrentLanguage)
    }

    /// Mark the start of a multi-language build. Returns false when one is
    /// already running.
    ///
    /// Everything cached by a previous build is dropped: files are resolved
    /// again from the next scan and the switcher is decided again.
    pub fn begin_build(&mut self) -> bool {
        if self.building {
            return false;
        }
        self.building = true;
        self.file_sets = None;
        self.reports.clear();
        self.search.clear();
        self.switcher.reset();
        self.overrides = ConfigOverrideLayer::new();
        true
    }

    pub fn end_build(&mut self) {
        self.building = false;
        self.current = None;
    }

    pub fn is_building(&self) -> bool {
        self.building
    }

    /// Classify and resolve `files` for every build language, then link
    /// alternates. Runs once per build; later passes reuse the result.
    pub fn resolve_files(&mut self, files: &Files, use_directory_urls: bool) -> Result<(), PluginError> {
        let sources: Vec<SourceFile> = files
            .iter()
            .map(|f| SourceFile::classify(f, self.structure.as_ref(), &self.registry))
            .collect();
        let opts = ResolveOptions::new(&self.registry, self.fallback, use_directory_urls);

        let mut sets = LanguageFileSets::new();
        for locale in self.registry.build_order() {
            let set = resolve(&sources, &locale, &opts)?;
            if set.fallback_count() > 0 {
                info!(
                    language = %locale,
                    count = set.fallback_count(),
                    "pages fall back to default language content"
                );
            }
            let report = self.report_mut(&locale);
            report.pages = set.pages().count();
            report.assets = set.assets().count();
            report.fallback_pages = set.fallback_count();
            report.shared_assets = set.shared_count();
            sets.insert(set);
        }
        build_alternates(
            &mut sets,
            &self.registry.build_locales(),
            self.registry.default_locale(),
            self.fallback,
        );
        self.file_sets = Some(sets);
        Ok(())
    }

    pub fn file_sets(&self) -> Option<&LanguageFileSets> {
        self.file_sets.as_ref()
    }

    fn file_set(&self, locale: &str) -> Result<&VirtualFileSet, PluginError> {
        self.file_sets
            .as_ref()
            .and_then(|sets| sets.get(locale))
            .ok_or_else(|| PluginError::UnknownLanguage(locale.to_string()))
    }

    /// The generator's file list for one language.
    ///
    /// Each file is listed under its normalized key, and every source
    /// spelling of it (`page.fr.md`, `fr/page.md`) is an alias.
    pub fn localized_files(&self, locale: &str) -> Result<Files, PluginError> {
        let set = self.file_set(locale)?;
        let list = set
            .iter()
            .chain(set.passthrough())
            .map(|vf| File {
                src_uri: vf.normalized_key.clone(),
                abs_src_path: vf.abs_src_path.clone(),
                name: file_stem(&vf.normalized_key).to_string(),
                kind: vf.kind,
                origin: vf.origin,
                dest_path: vf.dest_path.clone(),
                url: vf.url.clone(),
                reused: vf.shared,
            })
            .collect();
        let mut files = Files::new(list);
        for vf in set.iter() {
            for variant in set.variants(&vf.normalized_key) {
                files.add_alias(variant, &vf.normalized_key);
            }
        }
        Ok(files)
    }

    pub fn search(&self) -> &SearchIndexMerger {
        &self.search
    }

    /// Per-language reports in build order.
    pub fn reports(&self) -> impl Iterator<Item = &LanguageReport> {
        self.registry
            .build_order()
            .into_iter()
            .filter_map(move |locale| self.reports.get(&locale))
    }

    /// Record what the generator wrote for `locale`.
    pub fn record_pass(&mut self, locale: &str, summary: PassSummary) {
        self.report_mut(locale).assets_copied = summary.assets;
    }

    fn report_mut(&mut self, locale: &str) -> &mut LanguageReport {
        let name = self
            .registry
            .get(locale)
            .map(|l| l.name.clone())
            .unwrap_or_default();
        self.reports
            .entry(locale.to_string())
            .or_insert_with(|| LanguageReport {
                locale: locale.to_string(),
                name,
                ..LanguageReport::default()
            })
    }
}

impl Plugin for I18nPlugin {
    fn on_config(&mut self, mut config: SiteConfig) -> Result<SiteConfig, PluginError> {
        let language = self.current_language()?.clone();
        self.overrides.reset(&mut config)?;

        if self.reconfigure_theme {
            reconfigure_theme(&mut config, &language);
            self.switcher.reconfigure(&mut config, &self.registry)?;
        }
        if self.reconfigure_search && config.search.enabled {
            reconfigure_search_languages(&mut config.search, &self.registry, &language.locale);
        }
        if !language.admonition_translations.is_empty()
            && !config.has_markdown_extension(ADMONITION_EXTENSION)
        {
            warn!(
                language = %language.locale,
                "admonition_translations are set but the '{ADMONITION_EXTENSION}' markdown extension is not enabled"
            );
        }

        let applied = self.overrides.apply(&mut config, &language)?;
        self.report_mut(&language.locale).overrides_applied = applied;
        Ok(config)
    }

    fn on_files(&mut self, files: Files, config: &SiteConfig) -> Result<Files, PluginError> {
        let locale = self.current_language()?.locale.clone();
        if self.file_sets.is_none() {
            self.resolve_files(&files, config.use_directory_urls)?;
        }
        self.localized_files(&locale)
    }

    fn on_nav(
        &mut self,
        nav: Navigation,
        _config: &SiteConfig,
        _files: &Files,
    ) -> Result<Navigation, PluginError> {
        let language = self.current_language()?.clone();
        let set = self.file_set(&language.locale)?;
        let opts = LocalizeOptions {
            homepage_urls: homepage_urls(&language.path_prefix(), language.default),
            strip_language_sections: self.structure.kind() == StructureKind::Folder,
            fallback_homepage: set.homepage().map(|f| f.url.clone()),
        };

        let (nav, report) = localize(nav, &language, self.registry.default_language(), &opts);
        if report.translated > 0 {
            info!(language = %language.locale, count = report.translated, "translated navigation titles");
        }
        let entry = self.report_mut(&language.locale);
        entry.nav_translated = report.translated;
        entry.homepage = report.homepage;
        Ok(nav)
    }

    fn on_page_markdown(
        &mut self,
        markdown: String,
        page: &Page,
        _config: &SiteConfig,
    ) -> Result<String, PluginError> {
        let language = self.current_language()?;
        if language.admonition_translations.is_empty() {
            return Ok(markdown);
        }
        let (markdown, count) = translate_admonitions(&markdown, &language.admonition_translations);
        if count > 0 {
            debug!(page = %page.file.src_uri, count, "translated admonition titles");
            let locale = language.locale.clone();
            self.report_mut(&locale).admonitions_translated += count;
        }
        Ok(markdown)
    }

    fn on_page_context(
        &mut self,
        mut context: PageContext,
        page: &Page,
        _config: &SiteConfig,
        nav: &Navigation,
    ) -> Result<PageContext, PluginError> {
        let locale = self.current_language()?.locale.clone();
        let set = self.file_set(&locale)?;
        let Some(file) = set.get(&page.file.src_uri) else {
            return Ok(context);
        };
        let Some(sets) = self.file_sets.as_ref() else {
            return Ok(context);
        };

        let resolved = sets.alternates(file);
        if self.registry.is_multi_language() {
            context.alternates = resolved
                .iter()
                .map(|(lang, alt)| HrefLang {
                    lang: lang.to_string(),
                    url: context.href(&alt.url),
                })
                .collect();
        }
        if self.reconfigure_theme && !self.switcher.entries().is_empty() {
            let urls: BTreeMap<String, String> = resolved
                .iter()
                .map(|(lang, alt)| (lang.to_string(), alt.url.clone()))
                .collect();
            let is_homepage = nav.homepage.as_deref() == Some(page.file.url.as_str());
            context.language_switcher = self.switcher.for_page(&urls, &context.base_path, is_homepage);
        }
        Ok(context)
    }

    fn on_post_build(&mut self, _config: &SiteConfig, search: &SearchIndex) -> Result<(), PluginError> {
        self.search.extend(search.entries());
        debug!(
            language = ?self.current,
            entries = search.entries().len(),
            total = self.search.len(),
            "collected search entries"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{site_config, source_files};
    use crate::types::{FileKind, Origin};

    fn plugin(config: &SiteConfig, paths: &[&str]) -> (I18nPlugin, Files) {
        let plugin = I18nPlugin::from_config(config).unwrap();
        (plugin, source_files(paths))
    }

    fn page(files: &Files, key: &str) -> Page {
        Page {
            title: String::new(),
            file: files.get(key).unwrap().clone(),
            markdown: String::new(),
        }
    }

    // =========================================================================
    // Languages
    // =========================================================================

    #[test]
    fn hooks_require_current_language() {
        let config = site_config(&["en", "fr"]);
        let (mut plugin, _) = plugin(&config, &[]);
        assert!(matches!(
            plugin.on_config(config.clone()),
            Err(PluginError::NoCurrentLanguage)
        ));
        assert!(matches!(
            plugin.set_current_language("it"),
            Err(PluginError::UnknownLanguage(_))
        ));
    }

    #[test]
    fn build_guard_is_not_reentrant() {
        let (mut plugin, _) = plugin(&site_config(&["en"]), &[]);
        assert!(plugin.begin_build());
        assert!(!plugin.begin_build());
        plugin.end_build();
        assert!(plugin.begin_build());
    }

    #[test]
    fn new_build_drops_cached_resolution() {
        let config = site_config(&["en", "fr"]);
        let (mut plugin, files) = plugin(&config, &["index.md"]);
        plugin.resolve_files(&files, true).unwrap();
        assert!(plugin.file_sets().is_some());
        assert_eq!(plugin.reports().count(), 2);

        assert!(plugin.begin_build());
        assert!(plugin.file_sets().is_none());
        assert_eq!(plugin.reports().count(), 0);
    }

    // =========================================================================
    // Config
    // =========================================================================

    #[test]
    fn config_passes_are_isolated() {
        let mut config = site_config(&["en", "fr", "de"]);
        config.i18n.languages[1]
            .overrides
            .insert("site_name".into(), toml::Value::String("Ma doc".into()));
        let (mut plugin, _) = plugin(&config, &[]);

        let mut names = Vec::new();
        for locale in plugin.build_order() {
            plugin.set_current_language(&locale).unwrap();
            config = plugin.on_config(config).unwrap();
            names.push((config.theme.locale.clone(), config.site_name.clone()));
        }
        assert_eq!(
            names,
            vec![
                ("en".to_string(), "My Docs".to_string()),
                ("fr".to_string(), "Ma doc".to_string()),
                ("de".to_string(), "My Docs".to_string()),
            ]
        );
        assert_eq!(config.search.lang, vec!["en", "fr", "de"]);
        assert!(config.extra.contains_key("alternate"));
    }

    // =========================================================================
    // Files
    // =========================================================================

    #[test]
    fn files_are_resolved_once_and_localized() {
        let config = site_config(&["en", "fr"]);
        let (mut plugin, files) = plugin(
            &config,
            &["index.md", "index.fr.md", "about.md", "logo.png"],
        );

        plugin.set_current_language("en").unwrap();
        let en = plugin.on_files(files.clone(), &config).unwrap();
        assert_eq!(en.get("index.md").unwrap().dest_path, "index.html");
        assert!(!en.get("logo.png").unwrap().reused);

        plugin.set_current_language("fr").unwrap();
        let fr = plugin.on_files(Files::default(), &config).unwrap();
        let index = fr.get("index.md").unwrap();
        assert_eq!(index.dest_path, "fr/index.html");
        assert!(index.abs_src_path.ends_with("index.fr.md"));
        assert_eq!(fr.get("index.fr.md").unwrap().src_uri, "index.md");
        assert_eq!(fr.get("about.md").unwrap().dest_path, "fr/about/index.html");

        let logo = fr.get("logo.png").unwrap();
        assert!(logo.reused);
        assert_eq!(logo.dest_path, "logo.png");
        assert_eq!(logo.kind, FileKind::Asset);
    }

    #[test]
    fn conflicts_fail_the_files_hook() {
        let config = site_config(&["en", "fr"]);
        let (mut plugin, files) = plugin(&config, &["foo.md", "foo.en.md"]);
        plugin.set_current_language("en").unwrap();
        let err = plugin.on_files(files, &config).unwrap_err();
        assert!(matches!(err, PluginError::Resolve(ResolveError::Conflict { .. })));
        assert!(err.to_string().contains("foo.en.md"));
    }

    #[test]
    fn reports_count_fallbacks_and_shared_assets() {
        let config = site_config(&["en", "fr"]);
        let (mut plugin, files) = plugin(&config, &["index.md", "about.md", "about.fr.md", "a.png"]);
        plugin.resolve_files(&files, true).unwrap();
        let fr = plugin.reports().find(|r| r.locale == "fr").unwrap().clone();
        assert_eq!(fr.pages, 2);
        assert_eq!(fr.fallback_pages, 1);
        assert_eq!(fr.shared_assets, 1);
        assert_eq!(fr.name, "Français");
        let order: Vec<String> = plugin.reports().map(|r| r.locale.clone()).collect();
        assert_eq!(order, vec!["en", "fr"]);
    }

    // =========================================================================
    // Nav, markdown and page context
    // =========================================================================

    #[test]
    fn nav_hook_translates_and_records_homepage() {
        let mut config = site_config(&["en", "fr"]);
        config.i18n.languages[1]
            .nav_translations
            .insert("About".into(), "À propos".into());
        let (mut plugin, files) = plugin(&config, &["index.md", "about.md"]);
        plugin.set_current_language("fr").unwrap();
        let fr_files = plugin.on_files(files, &config).unwrap();

        let nav = crate::nav::build_navigation(&fr_files, &config, &Default::default());
        let nav = plugin.on_nav(nav, &config, &fr_files).unwrap();
        assert_eq!(nav.page_title("fr/about/"), Some("À propos"));
        assert_eq!(nav.homepage.as_deref(), Some("fr/"));

        let report = plugin.reports().find(|r| r.locale == "fr").unwrap();
        assert_eq!(report.nav_translated, 1);
        assert_eq!(report.homepage.as_deref(), Some("fr/"));
    }

    #[test]
    fn markdown_hook_translates_admonitions() {
        let mut config = site_config(&["en", "fr"]);
        config.markdown_extensions = vec![ADMONITION_EXTENSION.into()];
        config.i18n.languages[1]
            .admonition_translations
            .insert("tip".into(), "Astuce".into());
        let (mut plugin, files) = plugin(&config, &["index.md"]);
        plugin.set_current_language("fr").unwrap();
        let fr_files = plugin.on_files(files, &config).unwrap();

        let out = plugin
            .on_page_markdown("!!! tip\n    x".into(), &page(&fr_files, "index.md"), &config)
            .unwrap();
        assert_eq!(out, "!!! tip \"Astuce\"\n    x");

        plugin.set_current_language("en").unwrap();
        let out = plugin
            .on_page_markdown("!!! tip\n    x".into(), &page(&fr_files, "index.md"), &config)
            .unwrap();
        assert_eq!(out, "!!! tip\n    x");
    }

    #[test]
    fn page_context_gets_alternates_and_switcher() {
        let mut config = site_config(&["en", "fr"]);
        config.site_url = "https://example.com/docs/".into();
        let (mut plugin, files) = plugin(&config, &["index.md", "index.fr.md", "about.md", "about.fr.md"]);
        plugin.set_current_language("fr").unwrap();
        let config = plugin.on_config(config).unwrap();
        let fr_files = plugin.on_files(files, &config).unwrap();
        let nav = Navigation {
            items: vec![],
            homepage: Some("fr/".into()),
        };

        let about = page(&fr_files, "about.md");
        let ctx = PageContext::new(&config, &about, &nav);
        let ctx = plugin.on_page_context(ctx, &about, &config, &nav).unwrap();
        assert_eq!(
            ctx.alternates,
            vec![
                HrefLang { lang: "en".into(), url: "/docs/about/".into() },
                HrefLang { lang: "fr".into(), url: "/docs/fr/about/".into() },
            ]
        );
        let links: Vec<&str> = ctx.language_switcher.iter().map(|e| e.link.as_str()).collect();
        assert_eq!(links, vec!["/docs/about/", "/docs/fr/about/"]);

        let home = page(&fr_files, "index.md");
        let ctx = PageContext::new(&config, &home, &nav);
        let ctx = plugin.on_page_context(ctx, &home, &config, &nav).unwrap();
        let links: Vec<&str> = ctx.language_switcher.iter().map(|e| e.link.as_str()).collect();
        assert_eq!(links, vec!["/docs/", "/docs/fr/"]);
    }

    #[test]
    fn theme_files_only_in_default_language() {
        let config = site_config(&["en", "fr"]);
        let mut plugin = I18nPlugin::from_config(&config).unwrap();
        let mut list: Vec<File> = source_files(&["index.md"]).iter().cloned().collect();
        list.push(File::new(
            "partials/footer.html",
            "/theme/partials/footer.html".into(),
            Origin::Theme,
            true,
        ));
        plugin.resolve_files(&Files::new(list), true).unwrap();
        assert!(plugin.localized_files("en").unwrap().get("partials/footer.html").is_some());
        assert!(plugin.localized_files("fr").unwrap().get("partials/footer.html").is_none());
    }
}
