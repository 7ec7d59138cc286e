//! Click-target trimming.
//!
//! Recorded clicks usually land on an icon, a `<span>` or some other
//! presentational node inside the element the user meant to press. Trimming
//! walks up to the nearest ancestor that can actually receive a click so
//! that near-duplicate targets collapse onto one node.

use scraper::ElementRef;

use crate::dom::css::parse_inline_style;
use crate::dom::{tag_name, ElementHandle, PageDocument};

/// Tags that are click targets on their own.
pub const CLICK_TARGET_TAGS: &[&str] = &["a", "button", "input", "select", "textarea", "label"];

/// Longest text kept on an action step.
const MAX_TEXT_LEN: usize = 255;

/// Whether an element is a meaningful click target.
pub fn is_click_target(el: ElementRef<'_>) -> bool {
    let style = el
        .value()
        .attr("style")
        .map(parse_inline_style)
        .unwrap_or_default();
    if style.ignores_pointer() {
        return false;
    }

    let tag = tag_name(el);
    if CLICK_TARGET_TAGS.contains(&tag.as_str()) {
        return true;
    }
    if el.value().attr("role") == Some("button") || el.value().attr("onclick").is_some() {
        return true;
    }
    style.has_pointer_cursor()
}

/// Collapse an element onto its nearest click-target ancestor (itself
/// included). Elements without a parent element are never returned, and
/// `None` means nothing up the chain qualifies.
pub fn trim_element(page: &PageDocument, handle: &ElementHandle) -> Option<ElementHandle> {
    let mut current = handle.clone();
    loop {
        let parent = page.parent_element(&current)?;
        let el = page.element(&current)?;
        if is_click_target(el) {
            return Some(current);
        }
        current = parent;
    }
}

/// Visible text of an element's own text nodes, whitespace-collapsed.
///
/// Values that look like card or social security numbers are withheld.
pub fn safe_text(el: ElementRef<'_>) -> Option<String> {
    let raw: Vec<&str> = el
        .children()
        .filter_map(|child| child.value().as_text().map(|t| &**t))
        .collect();
    let text = raw
        .iter()
        .flat_map(|chunk| chunk.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() || looks_sensitive(&text) {
        return None;
    }
    Some(text.chars().take(MAX_TEXT_LEN).collect())
}

fn looks_sensitive(text: &str) -> bool {
    let compact: String = text.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    if compact.is_empty() || !compact.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    // SSN or card number length
    compact.len() == 9 || (13..=19).contains(&compact.len())
}
