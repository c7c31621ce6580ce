//! Display titles derived from file and directory names.
//!
//! Navigation needs a title for every page and section. A page's first `# `
//! heading wins; otherwise the title comes from its name:
//!
//! - `getting-started.md` → "Getting started"
//! - `api_reference.md` → "Api reference"
//! - `FAQ.md` → "FAQ" (mixed or upper case is kept as written)
//! - `guide/index.md` → "Guide" (index pages take their directory's title)
//! - `index.md` → "Home"

/// Title for the root index page when it has no heading.
pub const HOME_TITLE: &str = "Home";

/// `getting-started` → "Getting started". Names with any uppercase letter
/// keep their case; only separators are replaced.
pub fn display_title(name: &str) -> String {
    let spaced = name.replace(['-', '_'], " ");
    if spaced.chars().any(char::is_uppercase) {
        spaced
    } else {
        capitalize_first(&spaced)
    }
}

/// `fr` → "Fr", `FRENCH` → "French".
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Section title for a directory path like `guide/advanced-topics/`.
pub fn section_title(dir: &str) -> String {
    let last = dir.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    display_title(last)
}

pub fn is_index_name(stem: &str) -> bool {
    stem.eq_ignore_ascii_case("index") || stem.eq_ignore_ascii_case("readme")
}

/// Title for a page without a heading. `section` is the title of the
/// enclosing directory, if any.
pub fn page_title(stem: &str, section: Option<&str>) -> String {
    if is_index_name(stem) {
        section.map(str::to_string).unwrap_or_else(|| HOME_TITLE.to_string())
    } else {
        display_title(stem)
    }
}

/// First level-one ATX heading of a markdown document.
pub fn title_from_markdown(markdown: &str) -> Option<String> {
    markdown.lines().find_map(|line| {
        line.trim_start()
            .strip_prefix("# ")
            .map(|title| title.trim().trim_end_matches('#').trim_end().to_string())
            .filter(|title| !title.is_empty())
    })
}
