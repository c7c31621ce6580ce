//! Shared test utilities.
//!
//! Builders for language configs and registries, file trees on disk, and
//! lookups that panic with the available keys on a miss.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let reg = registry(&["en", "fr"]);
//! let src = sources(&SuffixStructure, &reg, &["index.md", "index.fr.md"]);
//! let fr = resolve(&src, "fr", &ResolveOptions::new(&reg, true, true)).unwrap();
//! assert_eq!(find_file(&fr, "index.md").dest_path, "fr/index.html");
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::config::{I18nConfig, SiteConfig};
use crate::files::{SourceFile, VirtualFile, VirtualFileSet};
use crate::locale::{LanguageConfig, LocaleRegistry};
use crate::scan::{File, Files};
use crate::structure::DocsStructure;
use crate::types::{NavItem, Navigation, Origin};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/<name>/` to a temp directory and return it.
pub fn setup_fixtures(name: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(name);
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Write `(relative path, content)` pairs under `root`, creating directories.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
}

// =========================================================================
// Languages
// =========================================================================

fn language_name(locale: &str) -> String {
    match locale {
        "en" => "English".to_string(),
        "fr" => "Français".to_string(),
        "de" => "Deutsch".to_string(),
        other => other.to_uppercase(),
    }
}

/// Languages in the given order, the first one default.
pub fn i18n_config(locales: &[&str]) -> I18nConfig {
    let languages = locales
        .iter()
        .enumerate()
        .map(|(idx, locale)| {
            let mut lang = LanguageConfig::new(locale, &language_name(locale));
            lang.default = idx == 0;
            lang
        })
        .collect();
    I18nConfig {
        languages,
        ..I18nConfig::default()
    }
}

pub fn registry(locales: &[&str]) -> LocaleRegistry {
    LocaleRegistry::from_config(&i18n_config(locales)).unwrap()
}

pub fn site_config(locales: &[&str]) -> SiteConfig {
    SiteConfig {
        i18n: i18n_config(locales),
        ..SiteConfig::default()
    }
}

// =========================================================================
// Files
// =========================================================================

/// Docs files under `/docs`, with directory URLs.
pub fn source_files(paths: &[&str]) -> Files {
    Files::new(
        paths
            .iter()
            .map(|p| File::new(p, PathBuf::from("/docs").join(p), Origin::Docs, true))
            .collect(),
    )
}

/// Classified docs files under `/docs`.
pub fn sources(structure: &dyn DocsStructure, registry: &LocaleRegistry, paths: &[&str]) -> Vec<SourceFile> {
    source_files(paths)
        .iter()
        .map(|f| SourceFile::classify(f, structure, registry))
        .collect()
}

/// Find a file by normalized key. Panics if not found.
pub fn find_file<'a>(set: &'a VirtualFileSet, key: &str) -> &'a VirtualFile {
    set.get(key).unwrap_or_else(|| {
        let keys: Vec<&str> = set.iter().map(|f| f.normalized_key.as_str()).collect();
        panic!("'{key}' not in the {} set. Available: {keys:?}", set.language())
    })
}

/// Destination paths in key order.
pub fn dest_paths(set: &VirtualFileSet) -> Vec<&str> {
    set.iter().map(|f| f.dest_path.as_str()).collect()
}

// =========================================================================
// Navigation
// =========================================================================

/// Flatten a navigation tree to titles, children as `Section/Child`.
pub fn nav_titles(nav: &Navigation) -> Vec<String> {
    fn walk(items: &[NavItem], prefix: &str, out: &mut Vec<String>) {
        for item in items {
            out.push(format!("{prefix}{}", item.title()));
            if let NavItem::Section { title, children } = item {
                walk(children, &format!("{prefix}{title}/"), out);
            }
        }
    }
    let mut out = Vec::new();
    walk(&nav.items, "", &mut out);
    out
}

// =========================================================================
// Logs
// =========================================================================

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` and return everything it logged at warn level or above.
pub fn capture_warnings<F: FnOnce()>(f: F) -> String {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = buffer.0.lock().unwrap().clone();
    String::from_utf8_lossy(&bytes).into_owned()
}
