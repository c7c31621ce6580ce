//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every language leads with its locale and display name; pages follow as
//! `key → destination` with the source file as an indented context line.
//! Paths are secondary to what the reader wants to know: which file ends up
//! where, in which language, and whether it is a translation or a fallback.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! en (English, default)
//!     001 about.md → about/index.html
//!         Source: about.md
//!     002 index.md → index.html
//!         Source: index.md
//!     Assets: 1
//! fr (Français)
//!     001 about.md → fr/about/index.html (fallback)
//!         Source: about.md
//!     002 index.md → fr/index.html
//!         Source: index.fr.md
//!     Assets: 1 (1 shared)
//! ```
//!
//! ## Build
//!
//! ```text
//! en (English)
//!     2 pages, 1 asset
//!     Homepage: /
//! fr (Français)
//!     2 pages (1 fallback), 1 asset (1 shared)
//!     Homepage: /fr/
//!     Navigation: 2 titles translated
//!     Overrides: site_name
//!
//! Search: 3 entries (1 duplicate removed)
//! Sitemap: site/sitemap.xml
//! Built 2 languages into site
//! ```
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout.

use crate::alternates::LanguageFileSets;
use crate::locale::LocaleRegistry;
use crate::orchestrator::BuildReport;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 page`, `2 pages`.
fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// `2 pages (1 fallback)`; the detail is dropped when zero.
fn count_with(n: usize, noun: &str, detail: usize, label: &str) -> String {
    if detail == 0 {
        count(n, noun)
    } else {
        format!("{} ({detail} {label})", count(n, noun))
    }
}

// ============================================================================
// Check output
// ============================================================================

/// Format the resolved file sets, one block per built language.
pub fn format_resolution(sets: &LanguageFileSets, registry: &LocaleRegistry) -> Vec<String> {
    let mut lines = Vec::new();
    for locale in registry.build_order() {
        let Some(set) = sets.get(&locale) else {
            continue;
        };
        let name = registry.get(&locale).map(|l| l.name.as_str()).unwrap_or_default();
        if locale == registry.default_locale() {
            lines.push(format!("{locale} ({name}, default)"));
        } else {
            lines.push(format!("{locale} ({name})"));
        }

        for (i, page) in set.pages().enumerate() {
            let marker = if page.fallback { " (fallback)" } else { "" };
            lines.push(format!(
                "{}{} {} → {}{}",
                indent(1),
                format_index(i + 1),
                page.normalized_key,
                page.dest_path,
                marker
            ));
            lines.push(format!("{}Source: {}", indent(2), page.src_uri));
        }

        let assets = set.assets().count();
        if assets > 0 {
            let shared = set.assets().filter(|f| f.shared).count();
            if shared > 0 {
                lines.push(format!("{}Assets: {assets} ({shared} shared)", indent(1)));
            } else {
                lines.push(format!("{}Assets: {assets}", indent(1)));
            }
        }
    }
    lines
}

/// Print resolved file sets to stdout.
pub fn print_resolution(sets: &LanguageFileSets, registry: &LocaleRegistry) {
    for line in format_resolution(sets, registry) {
        println!("{}", line);
    }
}

// ============================================================================
// Build output
// ============================================================================

/// Format the outcome of a multi-language build.
pub fn format_build_report(report: &BuildReport) -> Vec<String> {
    if report.skipped {
        return vec!["Build already running, nothing done".to_string()];
    }

    let mut lines = Vec::new();
    for lang in &report.languages {
        lines.push(format!("{} ({})", lang.locale, lang.name));
        lines.push(format!(
            "{}{}, {}",
            indent(1),
            count_with(lang.pages, "page", lang.fallback_pages, "fallback"),
            count_with(lang.assets, "asset", lang.shared_assets, "shared"),
        ));
        if let Some(home) = &lang.homepage {
            lines.push(format!("{}Homepage: /{}", indent(1), home.trim_start_matches('/')));
        }
        if lang.nav_translated > 0 {
            lines.push(format!(
                "{}Navigation: {} translated",
                indent(1),
                count(lang.nav_translated, "title")
            ));
        }
        if lang.admonitions_translated > 0 {
            lines.push(format!(
                "{}Admonitions: {} translated",
                indent(1),
                count(lang.admonitions_translated, "title")
            ));
        }
        if !lang.overrides_applied.is_empty() {
            lines.push(format!("{}Overrides: {}", indent(1), lang.overrides_applied.join(", ")));
        }
    }

    lines.push(String::new());
    if report.search_entries > 0 {
        let removed = report.search_entries - report.search_entries_merged;
        let entries = match report.search_entries_merged {
            1 => "1 entry".to_string(),
            n => format!("{n} entries"),
        };
        if removed > 0 {
            lines.push(format!("Search: {entries} ({} removed)", count(removed, "duplicate")));
        } else {
            lines.push(format!("Search: {entries}"));
        }
    }
    if let Some(sitemap) = &report.sitemap {
        lines.push(format!("Sitemap: {}", sitemap.display()));
    }
    lines.push(format!(
        "Built {} into {}",
        count(report.languages.len(), "language"),
        report.site_dir.display()
    ));
    lines
}

/// Print a build report to stdout.
pub fn print_build_report(report: &BuildReport) {
    for line in format_build_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alternates::build_alternates;
    use crate::files::{ResolveOptions, resolve};
    use crate::plugin::LanguageReport;
    use crate::structure::SuffixStructure;
    use crate::test_helpers::{registry, sources};
    use std::path::PathBuf;

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn counts_pluralize() {
        assert_eq!(count(1, "page"), "1 page");
        assert_eq!(count(0, "page"), "0 pages");
        assert_eq!(count_with(3, "page", 1, "fallback"), "3 pages (1 fallback)");
        assert_eq!(count_with(3, "page", 0, "fallback"), "3 pages");
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    #[test]
    fn resolution_lists_languages_in_build_order() {
        let reg = registry(&["en", "fr"]);
        let src = sources(
            &SuffixStructure,
            &reg,
            &["index.md", "index.fr.md", "about.md", "logo.png"],
        );
        let opts = ResolveOptions::new(&reg, true, true);
        let mut sets = LanguageFileSets::new();
        for lang in ["en", "fr"] {
            sets.insert(resolve(&src, lang, &opts).unwrap());
        }
        build_alternates(&mut sets, &reg.build_locales(), "en", true);

        assert_eq!(
            format_resolution(&sets, &reg),
            vec![
                "en (English, default)",
                "    001 about.md → about/index.html",
                "        Source: about.md",
                "    002 index.md → index.html",
                "        Source: index.md",
                "    Assets: 1",
                "fr (Français)",
                "    001 about.md → fr/about/index.html (fallback)",
                "        Source: about.md",
                "    002 index.md → fr/index.html",
                "        Source: index.fr.md",
                "    Assets: 1 (1 shared)",
            ]
        );
    }

    // =========================================================================
    // Build report
    // =========================================================================

    #[test]
    fn build_report_summarizes_each_language() {
        let report = BuildReport {
            site_dir: PathBuf::from("site"),
            languages: vec![
                LanguageReport {
                    locale: "en".into(),
                    name: "English".into(),
                    pages: 2,
                    assets: 1,
                    homepage: Some("".into()),
                    ..LanguageReport::default()
                },
                LanguageReport {
                    locale: "fr".into(),
                    name: "Français".into(),
                    pages: 2,
                    assets: 1,
                    fallback_pages: 1,
                    shared_assets: 1,
                    nav_translated: 2,
                    homepage: Some("fr/".into()),
                    overrides_applied: vec!["site_name".into()],
                    ..LanguageReport::default()
                },
            ],
            search_entries: 4,
            search_entries_merged: 3,
            sitemap: Some(PathBuf::from("site/sitemap.xml")),
            ..BuildReport::default()
        };
        assert_eq!(
            format_build_report(&report),
            vec![
                "en (English)",
                "    2 pages, 1 asset",
                "    Homepage: /",
                "fr (Français)",
                "    2 pages (1 fallback), 1 asset (1 shared)",
                "    Homepage: /fr/",
                "    Navigation: 2 titles translated",
                "    Overrides: site_name",
                "",
                "Search: 3 entries (1 duplicate removed)",
                "Sitemap: site/sitemap.xml",
                "Built 2 languages into site",
            ]
        );
    }

    #[test]
    fn skipped_build_report() {
        let report = BuildReport {
            skipped: true,
            ..BuildReport::default()
        };
        assert_eq!(format_build_report(&report), vec!["Build already running, nothing done"]);
    }
}
