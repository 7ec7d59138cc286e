//! Selector resolution: recorded element paths → live elements.
//!
//! Each recorded event carries the clicked element and its ancestors as
//! descriptors. A CSS selector is built for the innermost descriptor and
//! queried across every frame of the page. A unique match is accepted and
//! an ambiguous one abandons the event. When nothing matches, the search
//! widens to the next ancestor (`ancestor > chain`), with `*` standing in
//! for the ancestor that failed.
//!
//! Nothing in here fails loudly. A bad selector or an unmatchable path only
//! means that one event does not show up on the overlay.

use std::collections::HashMap;

use scraper::Selector;

use crate::dom::css::{escape_ident, quote_string};
use crate::dom::{ElementHandle, PageDocument};
use crate::heatmap::model::{ElementDescriptor, EventType, InteractionEvent, DATA_ATTR_KEY};

/// Token identifying one observed state of the page.
///
/// Bumped whenever the observed URL changes. Cached query results are only
/// valid for the generation they were computed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct DocumentGeneration(u64);

impl DocumentGeneration {
    pub fn next(self) -> Self {
        DocumentGeneration(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Memoized selector → matches table for one document generation.
#[derive(Debug, Default)]
pub struct SelectorCache {
    generation: Option<DocumentGeneration>,
    entries: HashMap<String, Vec<ElementHandle>>,
    hits: usize,
}

impl SelectorCache {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookups answered without touching the document since the last reset.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Query `selector` over all frames, reusing the stored answer when the
    /// generation matches. Parse failures are not cached.
    pub fn query(
        &mut self,
        page: &PageDocument,
        generation: DocumentGeneration,
        selector: &str,
    ) -> Result<&[ElementHandle], String> {
        if self.generation != Some(generation) {
            self.entries.clear();
            self.hits = 0;
            self.generation = Some(generation);
        }

        if self.entries.contains_key(selector) {
            self.hits += 1;
        } else {
            let parsed = Selector::parse(selector).map_err(|e| format!("{:?}", e))?;
            let found = page.select_all(&parsed);
            self.entries.insert(selector.to_string(), found);
        }
        Ok(self
            .entries
            .get(selector)
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }
}

/// An event bound to the live element it was recorded on.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedElement {
    pub element: ElementHandle,
    pub count: u64,
    pub event_type: EventType,
    pub hash: Option<String>,
    /// Combined selector that produced the unique match.
    pub selector: String,
}

pub struct SelectorResolver {
    cache: SelectorCache,
    match_links_by_href: bool,
    data_attributes: Vec<String>,
}

impl SelectorResolver {
    pub fn new(data_attributes: Vec<String>) -> Self {
        Self {
            cache: SelectorCache::default(),
            match_links_by_href: true,
            data_attributes,
        }
    }

    pub fn with_match_links_by_href(mut self, enabled: bool) -> Self {
        self.match_links_by_href = enabled;
        self
    }

    pub fn set_match_links_by_href(&mut self, enabled: bool) {
        self.match_links_by_href = enabled;
    }

    pub fn cache(&self) -> &SelectorCache {
        &self.cache
    }

    /// Resolve every event; unresolvable events are left out.
    pub fn resolve(
        &mut self,
        page: &PageDocument,
        generation: DocumentGeneration,
        events: &[InteractionEvent],
    ) -> Vec<ResolvedElement> {
        let resolved: Vec<ResolvedElement> = events
            .iter()
            .filter_map(|event| self.resolve_event(page, generation, event))
            .collect();
        log::debug!(
            "resolved {}/{} events ({} cached selectors, {} hits)",
            resolved.len(),
            events.len(),
            self.cache.len(),
            self.cache.hits()
        );
        resolved
    }

    /// Resolve one event to at most one element.
    pub fn resolve_event(
        &mut self,
        page: &PageDocument,
        generation: DocumentGeneration,
        event: &InteractionEvent,
    ) -> Option<ResolvedElement> {
        let last = event.elements.len().checked_sub(1)?;
        let mut chain: Option<String> = None;

        for (i, desc) in event.elements.iter().enumerate() {
            let selector = descriptor_selector(desc, self.match_links_by_href, &self.data_attributes);
            let combined = match &chain {
                Some(c) => format!("{} > {}", selector, c),
                None => selector,
            };

            let matches = match self.cache.query(page, generation, &combined) {
                Ok(m) => m,
                Err(e) => {
                    log::debug!("dropping event {:?}: bad selector {:?}: {}", event.hash, combined, e);
                    return None;
                }
            };

            match matches.len() {
                1 => {
                    if i == 0 && is_too_generic(desc) {
                        log::debug!("dropping event {:?}: {:?} is too generic", event.hash, combined);
                        return None;
                    }
                    return Some(ResolvedElement {
                        element: matches[0].clone(),
                        count: event.count,
                        event_type: event.event_type.clone(),
                        hash: event.hash.clone(),
                        selector: combined,
                    });
                }
                0 if i == last => return None,
                0 => {
                    chain = Some(match chain.take() {
                        Some(c) => format!("* > {}", c),
                        None => combined,
                    });
                }
                n => {
                    log::debug!("dropping event {:?}: {:?} matches {} elements", event.hash, combined, n);
                    return None;
                }
            }
        }
        None
    }
}

/// CSS selector for a single recorded element.
pub fn descriptor_selector(
    desc: &ElementDescriptor,
    match_links_by_href: bool,
    data_attributes: &[String],
) -> String {
    let mut selector = String::new();
    if !desc.tag_name.is_empty() {
        selector.push_str(&escape_ident(&desc.tag_name));
    }
    if let Some(id) = non_empty(&desc.attr_id) {
        selector.push('#');
        selector.push_str(&escape_ident(id));
        return selector;
    }
    for class in desc.attr_class.iter().filter(|c| !c.is_empty()) {
        selector.push('.');
        selector.push_str(&escape_ident(class));
    }
    if match_links_by_href && desc.tag_name == "a" {
        if let Some(href) = non_empty(&desc.href) {
            selector.push_str(&format!("[href={}]", quote_string(href)));
        }
    }
    for name in data_attributes {
        if let Some(value) = desc.attribute(name) {
            selector.push_str(&format!("[{}={}]", escape_ident(name), quote_string(value)));
        }
    }
    if let Some(n) = desc.nth_child {
        selector.push_str(&format!(":nth-child({})", n));
    }
    if let Some(n) = desc.nth_of_type {
        selector.push_str(&format!(":nth-of-type({})", n));
    }

    if selector.is_empty() {
        selector.push('*');
    }
    selector
}

/// A bare tag that is the first child and first of its type, with nothing
/// else to tell it apart, e.g. the `<svg>` inside any icon button.
pub fn is_too_generic(desc: &ElementDescriptor) -> bool {
    !desc.tag_name.is_empty()
        && desc.attr_class.is_empty()
        && non_empty(&desc.attr_id).is_none()
        && non_empty(&desc.href).is_none()
        && non_empty(&desc.text).is_none()
        && desc.nth_child == Some(1)
        && desc.nth_of_type == Some(1)
        && !desc.attributes.contains_key(DATA_ATTR_KEY)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
