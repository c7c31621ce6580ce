//! Types shared between the host generator and the i18n plugin.
//!
//! The generator produces these, passes them through the plugin hooks, and
//! renders what comes back.

use crate::config::SiteConfig;
use crate::scan::File;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Markdown rendered to HTML.
    Page,
    /// Copied verbatim.
    Asset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Under `docs_dir`.
    Docs,
    /// Under `theme.custom_dir`.
    Theme,
}

/// Navigation tree node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NavItem {
    Page {
        title: String,
        url: String,
        src_uri: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_homepage: bool,
    },
    Section {
        title: String,
        children: Vec<NavItem>,
    },
    Link {
        title: String,
        url: String,
    },
}

impl NavItem {
    pub fn title(&self) -> &str {
        match self {
            NavItem::Page { title, .. }
            | NavItem::Section { title, .. }
            | NavItem::Link { title, .. } => title,
        }
    }

    pub fn set_title(&mut self, new_title: String) {
        match self {
            NavItem::Page { title, .. }
            | NavItem::Section { title, .. }
            | NavItem::Link { title, .. } => *title = new_title,
        }
    }
}

/// Navigation for one language pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Navigation {
    pub items: Vec<NavItem>,
    /// URL of the detected homepage.
    pub homepage: Option<String>,
}

impl Navigation {
    /// Title of the first page node with the given URL.
    pub fn page_title(&self, url: &str) -> Option<&str> {
        fn find<'a>(items: &'a [NavItem], url: &str) -> Option<&'a str> {
            items.iter().find_map(|item| match item {
                NavItem::Page { title, url: u, .. } if u == url => Some(title.as_str()),
                NavItem::Section { children, .. } => find(children, url),
                _ => None,
            })
        }
        find(&self.items, url)
    }
}

/// A page about to be rendered.
#[derive(Debug, Clone)]
pub struct Page {
    pub title: String,
    pub file: File,
    pub markdown: String,
}

/// One language switcher entry (`extra.alternate`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwitcherEntry {
    pub name: String,
    pub link: String,
    pub lang: String,
}

/// `<link rel="alternate" hreflang>` target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HrefLang {
    pub lang: String,
    pub url: String,
}

/// Template values for one rendered page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageContext {
    pub site_name: String,
    pub page_title: String,
    pub locale: String,
    /// Path of `site_url`, prefixed to every site-relative URL.
    pub base_path: String,
    pub page_url: String,
    pub homepage_url: String,
    pub copyright: String,
    pub language_switcher: Vec<SwitcherEntry>,
    pub alternates: Vec<HrefLang>,
}

impl PageContext {
    pub fn new(config: &SiteConfig, page: &Page, nav: &Navigation) -> Self {
        Self {
            site_name: config.site_name.clone(),
            page_title: page.title.clone(),
            locale: config.theme.locale.clone(),
            base_path: config.base_path(),
            page_url: page.file.url.clone(),
            homepage_url: nav.homepage.clone().unwrap_or_default(),
            copyright: config.copyright.clone(),
            language_switcher: crate::theme::switcher_from_extra(&config.extra)
                .unwrap_or_default(),
            alternates: Vec::new(),
        }
    }

    /// Absolute link for a site-relative URL.
    pub fn href(&self, url: &str) -> String {
        format!("{}/{}", self.base_path, url)
    }
}
