//! Navigation: the generator's native tree and its per-language localization.
//!
//! [`build_navigation`] produces the tree the generator would render for any
//! file list, from the static `nav` config when present, otherwise from the
//! directory layout:
//!
//! ```text
//! index.md                 Home
//! about.md                 About
//! topic/index.md    →      Topic/
//! topic/page.md              Topic
//!                            Page
//! ```
//!
//! [`localize`] then post-processes that tree for one language: it strips a
//! redundant top-level language section, translates titles, and marks the
//! language's homepage.

use crate::config::{NavEntry, SiteConfig};
use crate::locale::LanguageDescriptor;
use crate::naming::{capitalize, page_title, section_title};
use crate::scan::{File, Files};
use crate::structure::{file_stem, split_file_name};
use crate::types::{NavItem, Navigation, Origin};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Build the generator's navigation. `titles` maps `src_uri` to the page's
/// first heading.
pub fn build_navigation(
    files: &Files,
    config: &SiteConfig,
    titles: &HashMap<String, String>,
) -> Navigation {
    let items = if config.nav.is_empty() {
        auto_navigation(files, titles)
    } else {
        config
            .nav
            .iter()
            .filter_map(|entry| static_entry(entry, files, titles))
            .collect()
    };
    Navigation {
        items,
        homepage: None,
    }
}

fn static_entry(entry: &NavEntry, files: &Files, titles: &HashMap<String, String>) -> Option<NavItem> {
    if !entry.children.is_empty() {
        return Some(NavItem::Section {
            title: entry.title.clone(),
            children: entry
                .children
                .iter()
                .filter_map(|child| static_entry(child, files, titles))
                .collect(),
        });
    }
    if let Some(page) = &entry.page {
        let Some(file) = files.get(page) else {
            warn!(page = %page, title = %entry.title, "nav entry points at a missing page, skipping");
            return None;
        };
        let title = if entry.title.is_empty() {
            title_for(file, titles, None)
        } else {
            entry.title.clone()
        };
        return Some(page_item(file, title));
    }
    if let Some(link) = &entry.link {
        return Some(NavItem::Link {
            title: entry.title.clone(),
            url: link.clone(),
        });
    }
    warn!(title = %entry.title, "nav entry has no page, link or children, skipping");
    None
}

#[derive(Default)]
struct DirNode<'a> {
    pages: Vec<&'a File>,
    dirs: BTreeMap<String, DirNode<'a>>,
}

fn auto_navigation(files: &Files, titles: &HashMap<String, String>) -> Vec<NavItem> {
    let mut root = DirNode::default();
    for file in files.pages().filter(|f| f.origin == Origin::Docs) {
        let (dir, _) = split_file_name(&file.src_uri);
        let mut node = &mut root;
        for segment in dir.split('/').filter(|s| !s.is_empty()) {
            node = node.dirs.entry(segment.to_string()).or_default();
        }
        node.pages.push(file);
    }
    dir_items(&root, titles, None)
}

fn dir_items(node: &DirNode, titles: &HashMap<String, String>, section: Option<&str>) -> Vec<NavItem> {
    let mut pages = node.pages.clone();
    pages.sort_by_key(|f| (!is_index(f), file_stem(&f.src_uri).to_lowercase()));

    let mut items: Vec<NavItem> = pages
        .into_iter()
        .map(|f| page_item(f, title_for(f, titles, section)))
        .collect();
    for (name, child) in &node.dirs {
        let title = section_title(name);
        let children = dir_items(child, titles, Some(&title));
        if !children.is_empty() {
            items.push(NavItem::Section { title, children });
        }
    }
    items
}

fn is_index(file: &File) -> bool {
    crate::naming::is_index_name(file_stem(&file.src_uri))
}

fn title_for(file: &File, titles: &HashMap<String, String>, section: Option<&str>) -> String {
    titles
        .get(&file.src_uri)
        .cloned()
        .unwrap_or_else(|| page_title(file_stem(&file.src_uri), section))
}

fn page_item(file: &File, title: String) -> NavItem {
    NavItem::Page {
        title,
        url: file.url.clone(),
        src_uri: file.src_uri.clone(),
        is_homepage: false,
    }
}

/// Inputs for [`localize`] that depend on the build rather than the language.
#[derive(Debug, Clone, Default)]
pub struct LocalizeOptions {
    /// URL forms the language's homepage may take.
    pub homepage_urls: Vec<String>,
    /// Remove top-level sections named after the current or default language.
    pub strip_language_sections: bool,
    /// Homepage URL to use when the navigation does not contain one.
    pub fallback_homepage: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavReport {
    pub translated: usize,
    pub homepage: Option<String>,
    pub stripped_sections: usize,
}

/// Homepage URL forms for a language whose pages live under `prefix`
/// (`""` for the default language, `"fr/"` otherwise).
pub fn homepage_urls(prefix: &str, is_default: bool) -> Vec<String> {
    let mut urls = vec![
        prefix.to_string(),
        format!("/{prefix}"),
        format!("{prefix}index.html"),
        format!("/{prefix}index.html"),
    ];
    if is_default {
        urls.push("./".to_string());
    }
    urls
}

/// Localize a native navigation tree for `language`.
pub fn localize(
    nav: Navigation,
    language: &LanguageDescriptor,
    default: &LanguageDescriptor,
    opts: &LocalizeOptions,
) -> (Navigation, NavReport) {
    let mut report = NavReport::default();
    let mut items = nav.items;

    if opts.strip_language_sections {
        let names = language_section_names(&[language, default]);
        let mut kept = Vec::with_capacity(items.len());
        for item in items {
            match item {
                NavItem::Section { title, children } if names.contains(&title) => {
                    debug!(section = %title, "stripping language section from navigation");
                    report.stripped_sections += 1;
                    kept.extend(children);
                }
                other => kept.push(other),
            }
        }
        items = kept;
    }

    let mut homepage = None;
    translate_items(
        &mut items,
        language,
        &opts.homepage_urls,
        &mut homepage,
        &mut report.translated,
    );

    if homepage.is_none() {
        match &opts.fallback_homepage {
            Some(url) => {
                debug!(language = %language.locale, url = %url, "homepage not in navigation, using index page");
                homepage = Some(url.clone());
            }
            None => {
                warn!(language = %language.locale, "could not find a homepage for this language");
            }
        }
    }

    if report.translated > 0 {
        debug!(language = %language.locale, count = report.translated, "translated navigation titles");
    }
    report.homepage = homepage.clone();
    (Navigation { items, homepage }, report)
}

fn language_section_names(languages: &[&LanguageDescriptor]) -> Vec<String> {
    let mut names = Vec::new();
    for lang in languages {
        for name in [
            capitalize(&lang.locale),
            section_title(&lang.locale),
            lang.name.clone(),
        ] {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

fn translate_items(
    items: &mut [NavItem],
    language: &LanguageDescriptor,
    homepage_urls: &[String],
    homepage: &mut Option<String>,
    translated: &mut usize,
) {
    for item in items.iter_mut() {
        if let Some(translation) = language.nav_translations.get(item.title()) {
            item.set_title(translation.clone());
            *translated += 1;
        }
        match item {
            NavItem::Page {
                url, is_homepage, ..
            } => {
                if homepage.is_none() && homepage_urls.iter().any(|u| u == url) {
                    *is_homepage = true;
                    *homepage = Some(url.clone());
                }
            }
            NavItem::Section { children, .. } => {
                translate_items(children, language, homepage_urls, homepage, translated);
            }
            NavItem::Link { .. } => {}
        }
    }
}
