//! Element aggregation: resolved events → ranked, deduplicated elements.

use std::collections::HashMap;

use serde::Serialize;

use crate::dom::selector::unique_selector;
use crate::dom::trim::{safe_text, trim_element};
use crate::dom::{tag_name, ElementHandle, PageDocument};
use crate::heatmap::resolver::ResolvedElement;

/// Description of a counted element usable to define a trackable action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionStep {
    pub event: String,
    pub tag_name: String,
    pub href: Option<String>,
    pub text: Option<String>,
    pub selector: Option<String>,
    pub url: Option<String>,
}

impl ActionStep {
    pub fn for_element(
        page: &PageDocument,
        handle: &ElementHandle,
        data_attributes: &[String],
    ) -> Option<Self> {
        let el = page.element(handle)?;
        Some(Self {
            event: "$autocapture".into(),
            tag_name: tag_name(el),
            href: el.value().attr("href").map(str::to_string),
            text: safe_text(el),
            selector: unique_selector(page, handle, data_attributes),
            url: page_url_without_query(&page.url),
        })
    }
}

/// Scheme, host and path of a page URL.
fn page_url_without_query(raw: &str) -> Option<String> {
    let mut url = url::Url::parse(raw).ok()?;
    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}

/// One element on the page with all the clicks that trimmed onto it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountedElement {
    pub element: ElementHandle,
    pub count: u64,
    pub click_count: u64,
    pub rageclick_count: u64,
    /// 1-based position in descending count order
    pub rank: usize,
    pub action_step: Option<ActionStep>,
}

/// Merge resolved elements by their trimmed click target, then rank.
///
/// With clickmaps disabled the result is empty: nothing is drawn, rather
/// than drawing zero-count entries.
pub fn aggregate(
    page: &PageDocument,
    resolved: &[ResolvedElement],
    clickmaps_enabled: bool,
    data_attributes: &[String],
) -> Vec<CountedElement> {
    if !clickmaps_enabled {
        return Vec::new();
    }

    let mut index: HashMap<ElementHandle, usize> = HashMap::new();
    let mut counted: Vec<CountedElement> = Vec::new();

    for item in resolved {
        let Some(trimmed) = trim_element(page, &item.element) else {
            continue;
        };
        let (clicks, rageclicks) = if item.event_type.is_rageclick() {
            (0, item.count)
        } else {
            (item.count, 0)
        };

        match index.get(&trimmed) {
            Some(&pos) => {
                let entry = &mut counted[pos];
                entry.count += item.count;
                entry.click_count += clicks;
                entry.rageclick_count += rageclicks;
            }
            None => {
                index.insert(trimmed.clone(), counted.len());
                let action_step = ActionStep::for_element(page, &trimmed, data_attributes);
                counted.push(CountedElement {
                    element: trimmed,
                    count: item.count,
                    click_count: clicks,
                    rageclick_count: rageclicks,
                    rank: 0,
                    action_step,
                });
            }
        }
    }

    // stable: ties keep first-seen order
    counted.sort_by(|a, b| b.count.cmp(&a.count));
    for (i, entry) in counted.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    counted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parser::parse_page;
    use crate::heatmap::model::EventType;
    use scraper::Selector;

    const PAGE: &str = r#"
        <html><body>
            <button id="buy" data-attr="buy-now"><span class="label">Buy</span><i class="icon"></i></button>
            <a href="/help" class="help">Help</a>
            <p class="copy">Nothing to press</p>
        </body></html>
    "#;

    fn handle(page: &PageDocument, css: &str) -> ElementHandle {
        page.select_all(&Selector::parse(css).unwrap())[0].clone()
    }

    fn resolved(element: ElementHandle, count: u64, event_type: EventType) -> ResolvedElement {
        ResolvedElement {
            element,
            count,
            event_type,
            hash: None,
            selector: String::new(),
        }
    }

    #[test]
    fn merges_onto_trimmed_target() {
        let page = parse_page(PAGE, "https://example.com/shop?utm=x#top");
        let input = vec![
            resolved(handle(&page, "span.label"), 5, EventType::Click),
            resolved(handle(&page, "i.icon"), 3, EventType::RageClick),
            resolved(handle(&page, "a.help"), 2, EventType::Click),
        ];

        let counted = aggregate(&page, &input, true, &["data-attr".to_string()]);
        assert_eq!(counted.len(), 2);

        let buy = &counted[0];
        assert_eq!(buy.element, handle(&page, "#buy"));
        assert_eq!(buy.count, 8);
        assert_eq!(buy.click_count, 5);
        assert_eq!(buy.rageclick_count, 3);
        for c in &counted {
            assert_eq!(c.count, c.click_count + c.rageclick_count);
        }

        let step = buy.action_step.as_ref().unwrap();
        assert_eq!(step.tag_name, "button");
        assert_eq!(step.selector.as_deref(), Some("[data-attr=\"buy-now\"]"));
        assert_eq!(step.url.as_deref(), Some("https://example.com/shop"));
        assert_eq!(step.event, "$autocapture");
    }

    #[test]
    fn ranks_follow_descending_count() {
        let page = parse_page(PAGE, "https://example.com");
        let input = vec![
            resolved(handle(&page, "a.help"), 2, EventType::Click),
            resolved(handle(&page, "span.label"), 9, EventType::Click),
        ];

        let counted = aggregate(&page, &input, true, &[]);
        let ranks: Vec<(usize, u64)> = counted.iter().map(|c| (c.rank, c.count)).collect();
        assert_eq!(ranks, vec![(1, 9), (2, 2)]);

        let help = counted[1].action_step.as_ref().unwrap();
        assert_eq!(help.href.as_deref(), Some("/help"));
        assert_eq!(help.text.as_deref(), Some("Help"));
    }

    #[test]
    fn ties_keep_insertion_order() {
        let page = parse_page(PAGE, "https://example.com");
        let input = vec![
            resolved(handle(&page, "a.help"), 4, EventType::Click),
            resolved(handle(&page, "span.label"), 4, EventType::Click),
        ];
        let counted = aggregate(&page, &input, true, &[]);
        assert_eq!(counted[0].element, handle(&page, "a.help"));
        assert_eq!(counted[0].rank, 1);
        assert_eq!(counted[1].rank, 2);
    }

    #[test]
    fn untargetable_elements_are_skipped() {
        let page = parse_page(PAGE, "https://example.com");
        let input = vec![resolved(handle(&page, "p.copy"), 7, EventType::Click)];
        assert!(aggregate(&page, &input, true, &[]).is_empty());
    }

    #[test]
    fn disabled_clickmaps_yield_nothing() {
        let page = parse_page(PAGE, "https://example.com");
        let input = vec![resolved(handle(&page, "a.help"), 1, EventType::RageClick)];
        assert!(aggregate(&page, &input, false, &[]).is_empty());
    }
}
