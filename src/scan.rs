//! Source discovery.
//!
//! Walks `docs_dir` (and `theme.custom_dir` when set) and produces the flat
//! [`Files`] list every build pass starts from. Nothing here knows about
//! languages: `index.fr.md` is just another page whose default destination is
//! `index.fr/index.html`. The i18n plugin rewrites the list in its
//! files hook.
//!
//! ```text
//! docs/                         Files
//! ├── index.md             →    index.md        page   index.html
//! ├── index.fr.md          →    index.fr.md     page   index.fr/index.html
//! ├── img/logo.png         →    img/logo.png    asset  img/logo.png
//! └── .drafts/wip.md            (hidden, skipped)
//! ```

use crate::files::destination;
use crate::structure::{file_stem, fold_readme, is_documentation};
use crate::types::{FileKind, Origin};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Docs directory not found: {0}")]
    MissingDocsDir(PathBuf),
}

/// One file known to the generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct File {
    /// Path relative to its source root, `/`-separated.
    pub src_uri: String,
    pub abs_src_path: PathBuf,
    /// Stem used for display titles (`guide` for `guide.fr.md` once localized).
    pub name: String,
    pub kind: FileKind,
    pub origin: Origin,
    /// Output path relative to `site_dir`.
    pub dest_path: String,
    /// Site-relative URL, no leading slash.
    pub url: String,
    /// Already written by an earlier pass; do not copy again.
    pub reused: bool,
}

impl File {
    /// A file with the generator's default (language-unaware) destination.
    pub fn new(src_uri: &str, abs_src_path: PathBuf, origin: Origin, use_directory_urls: bool) -> Self {
        let kind = if origin == Origin::Docs && is_documentation(src_uri) {
            FileKind::Page
        } else {
            FileKind::Asset
        };
        let dest = destination(&fold_readme(src_uri), kind, "", use_directory_urls);
        Self {
            src_uri: src_uri.to_string(),
            abs_src_path,
            name: file_stem(src_uri).to_string(),
            kind,
            origin,
            dest_path: dest.dest_path,
            url: dest.url,
            reused: false,
        }
    }

    pub fn is_page(&self) -> bool {
        self.kind == FileKind::Page
    }
}

/// Ordered file list with path lookups.
///
/// Besides each file's own `src_uri`, a file can be reachable through
/// aliases, so a link to `guide.md` can land on `guide.fr.md`.
#[derive(Debug, Clone, Default)]
pub struct Files {
    files: Vec<File>,
    by_src: HashMap<String, usize>,
    aliases: HashMap<String, usize>,
}

impl Files {
    pub fn new(files: Vec<File>) -> Self {
        let by_src = files
            .iter()
            .enumerate()
            .map(|(idx, f)| (f.src_uri.clone(), idx))
            .collect();
        Self {
            files,
            by_src,
            aliases: HashMap::new(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &File> {
        self.files.iter()
    }

    pub fn pages(&self) -> impl Iterator<Item = &File> {
        self.files.iter().filter(|f| f.kind == FileKind::Page)
    }

    pub fn assets(&self) -> impl Iterator<Item = &File> {
        self.files.iter().filter(|f| f.kind == FileKind::Asset)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Look up by source path, then by alias.
    pub fn get(&self, path: &str) -> Option<&File> {
        self.by_src
            .get(path)
            .or_else(|| self.aliases.get(path))
            .map(|&idx| &self.files[idx])
    }

    /// Make `alias` resolve to the file with source path `src_uri`.
    /// Returns false when no such file exists.
    pub fn add_alias(&mut self, alias: &str, src_uri: &str) -> bool {
        match self.by_src.get(src_uri) {
            Some(&idx) => {
                if alias != src_uri {
                    self.aliases.insert(alias.to_string(), idx);
                }
                true
            }
            None => false,
        }
    }
}

/// Discover documentation files and, when given, theme files.
pub fn scan(
    docs_dir: &Path,
    theme_dir: Option<&Path>,
    use_directory_urls: bool,
) -> Result<Files, ScanError> {
    if !docs_dir.is_dir() {
        return Err(ScanError::MissingDocsDir(docs_dir.to_path_buf()));
    }
    let mut files = walk(docs_dir, Origin::Docs, use_directory_urls)?;
    if let Some(theme_dir) = theme_dir.filter(|dir| dir.is_dir()) {
        files.extend(walk(theme_dir, Origin::Theme, use_directory_urls)?);
    }
    Ok(Files::new(files))
}

fn walk(root: &Path, origin: Origin, use_directory_urls: bool) -> Result<Vec<File>, ScanError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let src_uri = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push(File::new(
            &src_uri,
            entry.path().to_path_buf(),
            origin,
            use_directory_urls,
        ));
    }
    Ok(files)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}
