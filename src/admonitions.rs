//! Admonition title translation.
//!
//! An admonition without an explicit title shows its kind as the title:
//!
//! ```text
//! !!! tip                  →   !!! tip "Astuce"
//! ??? warning              →   ??? warning "Attention"
//! !!! note "Custom"        →   unchanged
//! ```
//!
//! Markers inside fenced code blocks are left alone.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Markdown extension that renders admonitions.
pub const ADMONITION_EXTENSION: &str = "admonition";

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<indent>\s*)(?P<marker>!!!|\?\?\?\+?)\s+(?P<kind>[\w-]+)\s*$")
        .expect("admonition pattern must compile")
});

/// A parsed admonition opening line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker<'a> {
    pub indent: &'a str,
    /// `!!!`, `???` or `???+`.
    pub marker: &'a str,
    pub kind: &'a str,
    pub title: Option<&'a str>,
}

impl Marker<'_> {
    /// Collapsible (`???`) rather than always open.
    pub fn is_collapsible(&self) -> bool {
        self.marker.starts_with("???")
    }

    pub fn is_open(&self) -> bool {
        self.marker == "???+" || self.marker == "!!!"
    }
}

/// Parse an admonition opening line, with or without a quoted title.
pub fn parse_marker(line: &str) -> Option<Marker<'_>> {
    let (head, title) = match line.trim_end().split_once(" \"") {
        Some((head, rest)) => (head, rest.strip_suffix('"')),
        None => (line, None),
    };
    let caps = MARKER.captures(head)?;
    Some(Marker {
        indent: caps.name("indent")?.as_str(),
        marker: caps.name("marker")?.as_str(),
        kind: caps.name("kind")?.as_str(),
        title,
    })
}

/// Add translated titles to untitled admonitions. Returns the new markdown
/// and the number of markers translated.
pub fn translate_admonitions(markdown: &str, translations: &BTreeMap<String, String>) -> (String, usize) {
    if translations.is_empty() {
        return (markdown.to_string(), 0);
    }
    let mut out = Vec::new();
    let mut fence: Option<&str> = None;
    let mut count = 0;

    for line in markdown.lines() {
        let trimmed = line.trim_start();
        if let Some(open) = fence {
            if trimmed.starts_with(open) {
                fence = None;
            }
            out.push(line.to_string());
            continue;
        }
        if trimmed.starts_with("```") {
            fence = Some("```");
        } else if trimmed.starts_with("~~~") {
            fence = Some("~~~");
        } else if let Some(caps) = MARKER.captures(line)
            && let Some(title) = translations.get(&caps["kind"])
        {
            out.push(format!(
                "{}{} {} \"{}\"",
                &caps["indent"], &caps["marker"], &caps["kind"], title
            ));
            count += 1;
            continue;
        }
        out.push(line.to_string());
    }

    let mut translated = out.join("\n");
    if markdown.ends_with('\n') {
        translated.push('\n');
    }
    (translated, count)
}
