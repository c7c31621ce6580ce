//! # static-i18n
//!
//! Multi-language builds for static documentation sites. One source tree
//! holds every language; each language is built into its own URL prefix
//! with its own navigation, theme locale and language switcher.
//!
//! # Architecture: One Pass Per Language
//!
//! A small host [`generate::Generator`] renders a single site per pass and
//! exposes hook points through the [`generate::Plugin`] trait. The
//! [`plugin::I18nPlugin`] implements those hooks, and the
//! [`orchestrator::Orchestrator`] runs one pass per built language, default
//! language first:
//!
//! ```text
//! docs/index.md        ─┐                  site/index.html
//! docs/index.fr.md     ─┼─ en pass ─────▶  site/about/index.html
//! docs/about.md        ─┤                  site/logo.png
//! docs/logo.png        ─┘─ fr pass ─────▶  site/fr/index.html
//!                                          site/fr/about/index.html  (fallback)
//!                                          site/sitemap.xml
//!                                          site/search/search_index.json
//! ```
//!
//! All languages' files are resolved once, up front, into per-language
//! [`files::VirtualFileSet`]s. Alternates between languages are looked up
//! by normalized key in a shared arena ([`alternates::LanguageFileSets`]).
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`locale`] | Language validation and the ordered [`locale::LocaleRegistry`] |
//! | [`structure`] | Suffix (`page.fr.md`) and folder (`fr/page.md`) locale tagging |
//! | [`files`] | Per-language resolution: translations, fallbacks, destinations |
//! | [`alternates`] | Cross-language links and `sitemap.xml` |
//! | [`nav`] | Navigation building and per-language localization |
//! | [`overrides`] | Per-language config overrides with exact restore |
//! | [`theme`] | Theme locale and the language switcher |
//! | [`search`] | Search index, tokenizer languages and the cross-language merge |
//! | [`admonitions`] | Translated admonition titles |
//! | [`plugin`] | The hooks wiring it all into a pass |
//! | [`orchestrator`] | The per-language build loop and its state machine |
//! | [`generate`] | The host generator: scan, render with Maud, write |
//! | [`scan`] | Source discovery |
//! | [`config`] | `site.toml` loading, validation and stock defaults |
//! | [`types`] | Types shared between generator and plugin |
//! | [`naming`] | Display titles from file and directory names |
//! | [`output`] | CLI output formatting |

pub mod admonitions;
pub mod alternates;
pub mod config;
pub mod files;
pub mod generate;
pub mod locale;
pub mod naming;
pub mod nav;
pub mod orchestrator;
pub mod output;
pub mod overrides;
pub mod plugin;
pub mod scan;
pub mod search;
pub mod structure;
pub mod theme;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

use config::SiteConfig;
use generate::Generator;
use orchestrator::{BuildError, BuildReport, Orchestrator};
use plugin::I18nPlugin;
use std::path::Path;

/// Build every configured language of the project at `root`.
pub fn build_site(root: &Path, config: SiteConfig) -> Result<BuildReport, BuildError> {
    let mut plugin = I18nPlugin::from_config(&config)?;
    let mut generator = Generator::new(root, config);
    Orchestrator::new().run(&mut generator, &mut plugin)
}

/// Scan and resolve every language without writing anything.
pub fn check_site(root: &Path, config: &SiteConfig) -> Result<I18nPlugin, BuildError> {
    let mut plugin = I18nPlugin::from_config(config)?;
    let theme_dir = config.theme_path(root);
    let files = scan::scan(
        &config.docs_path(root),
        theme_dir.as_deref(),
        config.use_directory_urls,
    )?;
    plugin.resolve_files(&files, config.use_directory_urls)?;
    Ok(plugin)
}
