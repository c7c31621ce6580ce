//! Multi-language build loop.
//!
//! One generator pass per built language, default language first:
//!
//! ```text
//! Idle → Configuring(en) → ResolvingFiles(en) → BuildingNav(en) → Rendering(en) → PostBuild(en)
//!      → Configuring(fr) → ...                                                  → PostBuild(fr)
//!      → Done
//! ```
//!
//! Any error moves the machine to `Failed`. Only the first pass may clean
//! `site_dir`; the user's setting and the configuration as it was before
//! the first pass are restored whatever the outcome. After the
//! last pass the merged search index and `sitemap.xml` are written.

use crate::alternates::{SitemapError, render_sitemap};
use crate::config::SiteConfig;
use crate::generate::{GenerateError, Generator, PassSummary, Plugin};
use crate::plugin::{I18nPlugin, LanguageReport, PluginError};
use crate::scan::Files;
use crate::search::{SearchError, SearchIndex, SearchIndexFile};
use crate::types::{Navigation, Page, PageContext};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const SITEMAP_PATH: &str = "sitemap.xml";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error("Search index error: {0}")]
    Search(#[from] SearchError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Scan error: {0}")]
    Scan(#[from] crate::scan::ScanError),
    #[error("Sitemap error: {0}")]
    Sitemap(#[from] SitemapError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "language", rename_all = "snake_case")]
pub enum BuildState {
    Idle,
    Configuring(String),
    ResolvingFiles(String),
    BuildingNav(String),
    Rendering(String),
    PostBuild(String),
    Done,
    Failed,
}

impl BuildState {
    /// Language of the pass this state belongs to.
    pub fn language(&self) -> Option<&str> {
        match self {
            Self::Configuring(l)
            | Self::ResolvingFiles(l)
            | Self::BuildingNav(l)
            | Self::Rendering(l)
            | Self::PostBuild(l) => Some(l),
            Self::Idle | Self::Done | Self::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether `next` may follow `self`. A pass may skip rendering when it
    /// has no pages.
    pub fn can_advance_to(&self, next: &BuildState) -> bool {
        use BuildState::*;
        match (self, next) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Idle, Configuring(_)) => true,
            (Configuring(a), ResolvingFiles(b)) => a == b,
            (ResolvingFiles(a), BuildingNav(b)) => a == b,
            (BuildingNav(a), Rendering(b) | PostBuild(b)) => a == b,
            (Rendering(a), Rendering(b) | PostBuild(b)) => a == b,
            (PostBuild(a), Configuring(b)) => a != b,
            (PostBuild(_), Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Configuring(l) => write!(f, "configuring({l})"),
            Self::ResolvingFiles(l) => write!(f, "resolving_files({l})"),
            Self::BuildingNav(l) => write!(f, "building_nav({l})"),
            Self::Rendering(l) => write!(f, "rendering({l})"),
            Self::PostBuild(l) => write!(f, "post_build({l})"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Current state plus every state entered, in order.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: BuildState,
    history: Vec<BuildState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self {
            state: BuildState::Idle,
            history: vec![BuildState::Idle],
        }
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &BuildState {
        &self.state
    }

    pub fn history(&self) -> &[BuildState] {
        &self.history
    }

    /// Move to `next`. Staying in `Rendering` is not recorded again.
    pub fn advance(&mut self, next: BuildState) -> Result<(), PluginError> {
        if !self.state.can_advance_to(&next) {
            return Err(PluginError::OutOfOrder {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        if next != self.state {
            debug!(from = %self.state, to = %next, "build state");
            self.history.push(next.clone());
        }
        self.state = next;
        Ok(())
    }

    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = BuildState::Failed;
            self.history.push(BuildState::Failed);
        }
    }
}

/// Passes hooks through to the plugin while advancing the state machine.
struct Tracked<'a> {
    plugin: &'a mut I18nPlugin,
    machine: &'a mut StateMachine,
    language: String,
}

impl Plugin for Tracked<'_> {
    fn on_config(&mut self, config: SiteConfig) -> Result<SiteConfig, PluginError> {
        self.machine.advance(BuildState::Configuring(self.language.clone()))?;
        self.plugin.on_config(config)
    }

    fn on_files(&mut self, files: Files, config: &SiteConfig) -> Result<Files, PluginError> {
        self.machine.advance(BuildState::ResolvingFiles(self.language.clone()))?;
        self.plugin.on_files(files, config)
    }

    fn on_nav(
        &mut self,
        nav: Navigation,
        config: &SiteConfig,
        files: &Files,
    ) -> Result<Navigation, PluginError> {
        self.machine.advance(BuildState::BuildingNav(self.language.clone()))?;
        self.plugin.on_nav(nav, config, files)
    }

    fn on_page_markdown(
        &mut self,
        markdown: String,
        page: &Page,
        config: &SiteConfig,
    ) -> Result<String, PluginError> {
        self.machine.advance(BuildState::Rendering(self.language.clone()))?;
        self.plugin.on_page_markdown(markdown, page, config)
    }

    fn on_page_context(
        &mut self,
        context: PageContext,
        page: &Page,
        config: &SiteConfig,
        nav: &Navigation,
    ) -> Result<PageContext, PluginError> {
        self.plugin.on_page_context(context, page, config, nav)
    }

    fn on_post_page(&mut self, html: String, page: &Page, config: &SiteConfig) -> Result<String, PluginError> {
        self.plugin.on_post_page(html, page, config)
    }

    fn on_post_build(&mut self, config: &SiteConfig, search: &SearchIndex) -> Result<(), PluginError> {
        self.machine.advance(BuildState::PostBuild(self.language.clone()))?;
        self.plugin.on_post_build(config, search)
    }
}

/// Outcome of [`Orchestrator::run`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub site_dir: PathBuf,
    pub languages: Vec<LanguageReport>,
    /// Entries collected over all passes.
    pub search_entries: usize,
    /// Entries left after removing duplicates.
    pub search_entries_merged: usize,
    pub sitemap: Option<PathBuf>,
    pub states: Vec<BuildState>,
    /// Another build was already running; nothing was done.
    pub skipped: bool,
}

#[derive(Debug, Default)]
pub struct Orchestrator {
    machine: StateMachine,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &BuildState {
        self.machine.state()
    }

    pub fn history(&self) -> &[BuildState] {
        self.machine.history()
    }

    /// Build every language. Runs at most once at a time per plugin.
    pub fn run(&mut self, generator: &mut Generator, plugin: &mut I18nPlugin) -> Result<BuildReport, BuildError> {
        if !plugin.begin_build() {
            warn!("a multi-language build is already running, skipping");
            return Ok(BuildReport {
                site_dir: generator.site_dir(),
                skipped: true,
                ..BuildReport::default()
            });
        }
        self.machine = StateMachine::new();

        let clean = generator.clean_site_dir();
        let original = generator.config().clone();
        let result = self.run_passes(generator, plugin);
        generator.set_clean_site_dir(clean);
        *generator.config_mut() = original;
        plugin.end_build();

        match result {
            Ok(mut report) => {
                report.states = self.machine.history().to_vec();
                Ok(report)
            }
            Err(err) => {
                self.machine.fail();
                Err(err)
            }
        }
    }

    fn run_passes(&mut self, generator: &mut Generator, plugin: &mut I18nPlugin) -> Result<BuildReport, BuildError> {
        let order = plugin.build_order();
        for (idx, locale) in order.iter().enumerate() {
            if idx > 0 {
                generator.set_clean_site_dir(false);
            }
            plugin.set_current_language(locale)?;
            info!(language = %locale, pass = idx + 1, of = order.len(), "building language");

            let summary: PassSummary = {
                let mut tracked = Tracked {
                    plugin: &mut *plugin,
                    machine: &mut self.machine,
                    language: locale.clone(),
                };
                generator.build(&mut tracked)?
            };
            plugin.record_pass(locale, summary);
        }
        self.machine.advance(BuildState::Done)?;

        let site_dir = generator.site_dir();
        let registry = plugin.registry();
        let build_locales = registry.build_locales();
        let config = generator.config();

        let search_entries = plugin.search().len();
        let mut search_entries_merged = 0;
        if config.search.enabled {
            let merged = plugin.search().finalize(&build_locales, registry.default_locale());
            search_entries_merged = merged.len();
            let path = SearchIndexFile::new(&config.search.lang, merged).save(&site_dir)?;
            info!(
                entries = search_entries_merged,
                duplicates = search_entries - search_entries_merged,
                path = %path.display(),
                "merged search index"
            );
        }

        let sitemap = match plugin.file_sets() {
            Some(sets) => {
                let path = site_dir.join(SITEMAP_PATH);
                fs::write(&path, render_sitemap(sets, &build_locales, &config.site_url)?)?;
                debug!(path = %path.display(), "sitemap written");
                Some(path)
            }
            None => None,
        };

        Ok(BuildReport {
            site_dir,
            languages: plugin.reports().cloned().collect(),
            search_entries,
            search_entries_merged,
            sitemap,
            states: Vec::new(),
            skipped: false,
        })
    }
}
