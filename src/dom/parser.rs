use crate::dom::{ElementHandle, PageDocument};
use scraper::{Html, Selector};

/// Embedded documents nested deeper than this are ignored.
const MAX_FRAME_DEPTH: usize = 4;

/// Parse a page and every `<iframe srcdoc>` sub-document reachable from it.
pub fn parse_page(html: &str, url: &str) -> PageDocument {
    let document = Html::parse_document(html);

    // Extract <title>
    let title = Selector::parse("title")
        .ok()
        .and_then(|sel| document.select(&sel).next().map(|el| el.text().collect::<String>()))
        .unwrap_or_default();

    let mut page = PageDocument::new(url, title.trim(), document);
    attach_srcdoc_frames(&mut page, 0, 1);

    log::debug!(
        "parsed {} ({} frames, {} elements)",
        url,
        page.frame_count(),
        page.element_count()
    );
    page
}

fn attach_srcdoc_frames(page: &mut PageDocument, frame: usize, depth: usize) {
    if depth > MAX_FRAME_DEPTH {
        return;
    }
    let Ok(sel) = Selector::parse("iframe[srcdoc]") else {
        return;
    };

    let hosts: Vec<(ElementHandle, String)> = page.frames()[frame]
        .html
        .select(&sel)
        .filter_map(|el| {
            let srcdoc = el.value().attr("srcdoc")?;
            Some((ElementHandle::locate(frame, el), srcdoc.to_string()))
        })
        .collect();

    for (host, srcdoc) in hosts {
        let idx = page.push_frame(Html::parse_document(&srcdoc), host);
        attach_srcdoc_frames(page, idx, depth + 1);
    }
}
