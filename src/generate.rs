//! HTML site generation: one build pass over the shared configuration.
//!
//! A pass runs the hook pipeline of a [`Plugin`] around each stage:
//!
//! ```text
//! on_config ─▶ clean site_dir ─▶ scan ─▶ on_files ─▶ navigation ─▶ on_nav
//!     ─▶ for each page: on_page_markdown ─▶ on_page_context ─▶ render ─▶ on_post_page
//!     ─▶ copy assets ─▶ search/search_index.json ─▶ on_post_build
//! ```
//!
//! Every hook receives a value and returns one of the same shape. The
//! default methods pass values through untouched, so a generator driven by a
//! plugin that overrides nothing builds a plain single-language site.
//!
//! ## Output Structure
//!
//! ```text
//! site/
//! ├── index.html                 # docs/index.md
//! ├── about/index.html           # docs/about.md (directory URLs)
//! ├── img/logo.png               # assets are copied as is
//! └── search/search_index.json
//! ```
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating and
//! pulldown-cmark for markdown. `!!! kind` admonition blocks are rendered when
//! the `admonition` markdown extension is enabled.

use crate::admonitions::{ADMONITION_EXTENSION, Marker, parse_marker};
use crate::config::SiteConfig;
use crate::nav::build_navigation;
use crate::naming::{capitalize, page_title, title_from_markdown};
use crate::plugin::PluginError;
use crate::scan::{Files, ScanError, scan};
use crate::search::{SearchError, SearchIndex, SearchIndexFile};
use crate::structure::file_stem;
use crate::types::{NavItem, Navigation, Page, PageContext};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Parser, html as md_html};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),
    #[error("Search error: {0}")]
    Search(#[from] SearchError),
}

const CSS: &str = include_str!("../static/style.css");

/// Hook points of a build pass.
pub trait Plugin {
    fn on_config(&mut self, config: SiteConfig) -> Result<SiteConfig, PluginError> {
        Ok(config)
    }

    fn on_files(&mut self, files: Files, _config: &SiteConfig) -> Result<Files, PluginError> {
        Ok(files)
    }

    fn on_nav(
        &mut self,
        nav: Navigation,
        _config: &SiteConfig,
        _files: &Files,
    ) -> Result<Navigation, PluginError> {
        Ok(nav)
    }

    fn on_page_markdown(
        &mut self,
        markdown: String,
        _page: &Page,
        _config: &SiteConfig,
    ) -> Result<String, PluginError> {
        Ok(markdown)
    }

    fn on_page_context(
        &mut self,
        context: PageContext,
        _page: &Page,
        _config: &SiteConfig,
        _nav: &Navigation,
    ) -> Result<PageContext, PluginError> {
        Ok(context)
    }

    fn on_post_page(
        &mut self,
        html: String,
        _page: &Page,
        _config: &SiteConfig,
    ) -> Result<String, PluginError> {
        Ok(html)
    }

    fn on_post_build(
        &mut self,
        _config: &SiteConfig,
        _search: &SearchIndex,
    ) -> Result<(), PluginError> {
        Ok(())
    }
}

/// What one pass wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub pages: usize,
    pub assets: usize,
    /// Assets skipped because an earlier pass already wrote them.
    pub reused: usize,
}

/// The generator and the configuration shared by all of its passes.
#[derive(Debug)]
pub struct Generator {
    root: PathBuf,
    config: SiteConfig,
    clean_site_dir: bool,
}

impl Generator {
    pub fn new(root: &Path, config: SiteConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            clean_site_dir: true,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SiteConfig {
        &mut self.config
    }

    pub fn site_dir(&self) -> PathBuf {
        self.config.site_path(&self.root)
    }

    pub fn clean_site_dir(&self) -> bool {
        self.clean_site_dir
    }

    /// Whether a pass empties `site_dir` before writing.
    pub fn set_clean_site_dir(&mut self, clean: bool) {
        self.clean_site_dir = clean;
    }

    /// Run one build pass.
    pub fn build(&mut self, plugin: &mut dyn Plugin) -> Result<PassSummary, GenerateError> {
        self.config = plugin.on_config(self.config.clone())?;
        let config = self.config.clone();
        let site_dir = config.site_path(&self.root);

        if self.clean_site_dir && site_dir.exists() {
            debug!(dir = %site_dir.display(), "cleaning site directory");
            fs::remove_dir_all(&site_dir)?;
        }
        fs::create_dir_all(&site_dir)?;

        let theme_dir = config.theme_path(&self.root);
        let files = scan(
            &config.docs_path(&self.root),
            theme_dir.as_deref(),
            config.use_directory_urls,
        )?;
        let files = plugin.on_files(files, &config)?;

        let mut sources = HashMap::new();
        let mut titles = HashMap::new();
        for file in files.pages() {
            let markdown = fs::read_to_string(&file.abs_src_path)?;
            if let Some(title) = title_from_markdown(&markdown) {
                titles.insert(file.src_uri.clone(), title);
            }
            sources.insert(file.src_uri.clone(), markdown);
        }

        let nav = build_navigation(&files, &config, &titles);
        let nav = plugin.on_nav(nav, &config, &files)?;

        let admonitions = config.has_markdown_extension(ADMONITION_EXTENSION);
        let mut search = SearchIndex::new();
        let mut summary = PassSummary::default();

        for file in files.pages() {
            let markdown = sources.remove(&file.src_uri).unwrap_or_default();
            let title = titles
                .get(&file.src_uri)
                .cloned()
                .or_else(|| nav.page_title(&file.url).map(str::to_string))
                .unwrap_or_else(|| page_title(file_stem(&file.src_uri), None));
            let page = Page {
                title,
                file: file.clone(),
                markdown: markdown.clone(),
            };

            let markdown = plugin.on_page_markdown(markdown, &page, &config)?;
            let page = Page { markdown, ..page };
            let context = PageContext::new(&config, &page, &nav);
            let context = plugin.on_page_context(context, &page, &config, &nav)?;

            let body = render_markdown(&page.markdown, admonitions);
            let html = render_page(&context, &nav, &body).into_string();
            let html = plugin.on_post_page(html, &page, &config)?;

            let dest = site_dir.join(&file.dest_path);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&dest, html)?;
            if config.search.enabled {
                search.add_page(&file.url, &page.title, &page.markdown);
            }
            summary.pages += 1;
        }

        for file in files.assets() {
            if file.reused {
                summary.reused += 1;
                continue;
            }
            let dest = site_dir.join(&file.dest_path);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&file.abs_src_path, &dest)?;
            summary.assets += 1;
        }

        if config.search.enabled {
            SearchIndexFile::new(&config.search.lang, search.entries().to_vec()).save(&site_dir)?;
        }
        plugin.on_post_build(&config, &search)?;

        info!(
            pages = summary.pages,
            assets = summary.assets,
            reused = summary.reused,
            site_dir = %site_dir.display(),
            "build pass complete"
        );
        Ok(summary)
    }
}

// ============================================================================
// Markdown
// ============================================================================

/// Markdown to HTML, with admonition blocks when enabled.
pub fn render_markdown(markdown: &str, admonitions: bool) -> String {
    let mut out = String::new();
    if !admonitions {
        md_html::push_html(&mut out, Parser::new(markdown));
        return out;
    }

    let lines: Vec<&str> = markdown.lines().collect();
    let mut pending: Vec<&str> = Vec::new();
    let mut fence: Option<&str> = None;
    let mut idx = 0;

    while idx < lines.len() {
        let line = lines[idx];
        let trimmed = line.trim_start();
        if let Some(open) = fence {
            if trimmed.starts_with(open) {
                fence = None;
            }
        } else if trimmed.starts_with("```") {
            fence = Some("```");
        } else if trimmed.starts_with("~~~") {
            fence = Some("~~~");
        } else if let Some(marker) = parse_marker(line)
            && marker.indent.is_empty()
        {
            flush_markdown(&mut out, &pending);
            pending.clear();

            let mut body = Vec::new();
            idx += 1;
            while idx < lines.len()
                && (lines[idx].trim().is_empty() || lines[idx].starts_with("    "))
            {
                body.push(lines[idx].strip_prefix("    ").unwrap_or(""));
                idx += 1;
            }
            let inner = render_markdown(&body.join("\n"), true);
            out.push_str(&render_admonition(&marker, &inner).into_string());
            continue;
        }
        pending.push(line);
        idx += 1;
    }
    flush_markdown(&mut out, &pending);
    out
}

fn flush_markdown(out: &mut String, lines: &[&str]) {
    if lines.iter().all(|l| l.trim().is_empty()) {
        return;
    }
    let markdown = lines.join("\n");
    md_html::push_html(out, Parser::new(&markdown));
}

fn render_admonition(marker: &Marker, inner: &str) -> Markup {
    let title = marker
        .title
        .map(str::to_string)
        .unwrap_or_else(|| capitalize(marker.kind));
    html! {
        @if marker.is_collapsible() {
            details class={ "admonition " (marker.kind) } open[marker.is_open()] {
                summary { (title) }
                (PreEscaped(inner))
            }
        } @else {
            div class={ "admonition " (marker.kind) } {
                p.admonition-title { (title) }
                (PreEscaped(inner))
            }
        }
    }
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(ctx: &PageContext, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang=(ctx.locale) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (ctx.page_title) " - " (ctx.site_name) }
                @for alternate in &ctx.alternates {
                    link rel="alternate" hreflang=(alternate.lang) href=(alternate.url);
                }
                style { (PreEscaped(CSS)) }
            }
            body {
                (content)
            }
        }
    }
}

/// Site name linking home, plus the language switcher
fn site_header(ctx: &PageContext) -> Markup {
    html! {
        header.site-header {
            a.site-name href=(ctx.href(&ctx.homepage_url)) { (ctx.site_name) }
            @if !ctx.language_switcher.is_empty() {
                nav.language-switcher {
                    ul {
                        @for entry in &ctx.language_switcher {
                            @let is_current = entry.lang == ctx.locale;
                            li class=[is_current.then_some("current")] {
                                a href=(entry.link) hreflang=(entry.lang) { (entry.name) }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Renders the navigation tree
pub fn render_nav(items: &[NavItem], ctx: &PageContext) -> Markup {
    html! {
        nav.site-nav {
            ul {
                @for item in items {
                    (render_nav_item(item, ctx))
                }
            }
        }
    }
}

fn render_nav_item(item: &NavItem, ctx: &PageContext) -> Markup {
    html! {
        @match item {
            NavItem::Page { title, url, .. } => {
                li class=[(*url == ctx.page_url).then_some("current")] {
                    a href=(ctx.href(url)) { (title) }
                }
            }
            NavItem::Section { title, children } => {
                li {
                    span.nav-group { (title) }
                    ul {
                        @for child in children {
                            (render_nav_item(child, ctx))
                        }
                    }
                }
            }
            NavItem::Link { title, url } => {
                li {
                    a href=(url) target="_blank" rel="noopener" { (title) }
                }
            }
        }
    }
}

/// Renders a documentation page
fn render_page(ctx: &PageContext, nav: &Navigation, body: &str) -> Markup {
    let content = html! {
        (site_header(ctx))
        div.layout {
            (render_nav(&nav.items, ctx))
            main.page {
                article.content {
                    (PreEscaped(body))
                }
            }
        }
        @if !ctx.copyright.is_empty() {
            footer.site-footer { (ctx.copyright) }
        }
    };
    base_document(ctx, content)
}

// ============================================================================
// Tests
// ============================================================================
