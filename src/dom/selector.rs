//! Unique selector synthesis for live elements.
//!
//! Used to describe a counted element as a trackable action: the shortest
//! child-combinator chain, built from the element upward, that matches
//! exactly one element in its frame.

use scraper::{ElementRef, Selector};

use crate::dom::css::{escape_ident, quote_string};
use crate::dom::{tag_name, ElementHandle, PageDocument};

/// Build a selector that uniquely identifies `handle` within its frame.
///
/// Data attributes win over ids, ids over tag/class/position segments. If no
/// suffix of the ancestor chain is unique, the full chain is returned.
pub fn unique_selector(
    page: &PageDocument,
    handle: &ElementHandle,
    data_attributes: &[String],
) -> Option<String> {
    let mut current = Some(page.element(handle)?);
    let mut segments: Vec<String> = Vec::new();

    while let Some(el) = current {
        segments.insert(0, segment_for(el, data_attributes));
        let candidate = segments.join(" > ");
        if matches_once(page, handle.frame, &candidate) {
            return Some(candidate);
        }
        current = el.parent().and_then(ElementRef::wrap);
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments.join(" > "))
    }
}

fn matches_once(page: &PageDocument, frame: usize, candidate: &str) -> bool {
    match Selector::parse(candidate) {
        Ok(sel) => page.select_in_frame(frame, &sel).len() == 1,
        Err(_) => false,
    }
}

fn segment_for(el: ElementRef<'_>, data_attributes: &[String]) -> String {
    for name in data_attributes {
        if let Some(value) = el.value().attr(name) {
            return format!("[{}={}]", escape_ident(name), quote_string(value));
        }
    }
    if let Some(id) = el.value().id().filter(|id| !id.is_empty()) {
        return format!("#{}", escape_ident(id));
    }

    let tag = tag_name(el);
    let mut segment = escape_ident(&tag);
    for class in el.value().classes() {
        segment.push('.');
        segment.push_str(&escape_ident(class));
    }

    let same_tag = |node: ElementRef<'_>| tag_name(node) == tag;
    let before = el
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|s| same_tag(*s))
        .count();
    let after = el
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|s| same_tag(*s))
        .count();
    if before + after > 0 {
        segment.push_str(&format!(":nth-of-type({})", before + 1));
    }
    segment
}
