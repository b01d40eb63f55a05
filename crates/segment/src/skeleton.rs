//! Document skeleton: the heading/body boundary sequence of a revision.
//!
//! Structural similarity compares skeletons rather than content, so two
//! revisions with identical section layout score 1.0 regardless of wording
//! inside the sections.

use serde::{Deserialize, Serialize};

use crate::segmenter::paragraph_spans;

/// One structural element of a document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "text", rename_all = "lowercase")]
pub enum SkeletonElement {
    /// A detected heading, normalized to lowercase with collapsed whitespace.
    Heading(String),
    /// A run of body text.
    Body,
}

const SECTION_LABELS: &[&str] = &["chapter", "section", "part", "appendix"];

/// Extract the skeleton of `text`, paragraph by paragraph.
///
/// A paragraph whose first line looks like a heading contributes a
/// [`SkeletonElement::Heading`], followed by a [`SkeletonElement::Body`] when
/// further lines follow it. Blank paragraphs contribute nothing.
pub fn skeleton(text: &str) -> Vec<SkeletonElement> {
    let mut elements = Vec::new();

    for (start, end) in paragraph_spans(text) {
        let lines: Vec<&str> = text[start..end]
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let Some(first) = lines.first() else {
            continue;
        };

        let underlined = lines.get(1).is_some_and(|next| is_underline(next));
        if underlined || is_heading_line(first) {
            elements.push(SkeletonElement::Heading(normalize_heading(first)));
            let body_from = if underlined { 2 } else { 1 };
            if lines.len() > body_from {
                elements.push(SkeletonElement::Body);
            }
        } else {
            elements.push(SkeletonElement::Body);
        }
    }

    elements
}

/// Heuristic heading detection for a single trimmed line.
pub fn is_heading_line(line: &str) -> bool {
    is_markdown_heading(line)
        || is_all_caps(line)
        || is_numbered_section(line)
        || is_labeled_section(line)
}

fn is_markdown_heading(line: &str) -> bool {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    (1..=6).contains(&hashes)
        && line[hashes..].starts_with(char::is_whitespace)
        && !line[hashes..].trim().is_empty()
}

fn is_all_caps(line: &str) -> bool {
    let len = line.chars().count();
    (3..100).contains(&len)
        && line.chars().any(char::is_uppercase)
        && !line.chars().any(char::is_lowercase)
}

fn is_numbered_section(line: &str) -> bool {
    let mut chars = line.chars().peekable();
    let mut saw_digit = false;
    while let Some(c) = chars.peek() {
        if c.is_ascii_digit() {
            saw_digit = true;
            chars.next();
        } else if *c == '.' && saw_digit {
            chars.next();
        } else {
            break;
        }
    }
    if !saw_digit {
        return false;
    }
    let mut saw_space = false;
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        saw_space = true;
        chars.next();
    }
    saw_space && chars.next().is_some_and(char::is_uppercase)
}

fn is_labeled_section(line: &str) -> bool {
    let mut parts = line.splitn(2, char::is_whitespace);
    let label = parts.next().unwrap_or_default();
    parts.next().is_some_and(|rest| !rest.trim().is_empty())
        && SECTION_LABELS
            .iter()
            .any(|known| label.eq_ignore_ascii_case(known))
}

fn is_underline(line: &str) -> bool {
    line.chars().count() >= 3 && (line.chars().all(|c| c == '=') || line.chars().all(|c| c == '-'))
}

fn normalize_heading(line: &str) -> String {
    line.trim_start_matches('#')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
