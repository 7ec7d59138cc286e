pub mod parser;
pub mod css;
pub mod selector;
pub mod trim;

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

/// Stable address of an element inside a [`PageDocument`].
///
/// `frame` indexes the document list (0 is the top-level page, higher
/// indices are embedded sub-documents). `path` holds the child index taken
/// at every level, starting from the document node. Handles stay valid for
/// as long as the parsed page is not replaced, and two handles are equal
/// exactly when they address the same node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementHandle {
    pub frame: usize,
    pub path: Vec<usize>,
}

impl ElementHandle {
    /// Compute the handle of an element living in `frame`.
    pub fn locate(frame: usize, el: ElementRef<'_>) -> Self {
        let mut path = Vec::new();
        let mut node = *el;
        while let Some(parent) = node.parent() {
            path.push(node.prev_siblings().count());
            node = parent;
        }
        path.reverse();
        Self { frame, path }
    }

    /// Handle of the parent node (which may be the document itself).
    pub fn parent(&self) -> Option<ElementHandle> {
        let (_, rest) = self.path.split_last()?;
        Some(Self {
            frame: self.frame,
            path: rest.to_vec(),
        })
    }

    /// Whether `self` is a strict ancestor of `other` in the same frame.
    pub fn is_ancestor_of(&self, other: &ElementHandle) -> bool {
        self.frame == other.frame
            && self.path.len() < other.path.len()
            && other.path.starts_with(&self.path)
    }
}

/// One parsed document. Sub-documents remember the `<iframe>` hosting them.
pub struct Frame {
    pub html: Html,
    pub host: Option<ElementHandle>,
}

/// The page the overlay is drawn on: the top-level document plus every
/// embedded sub-document reachable from it.
pub struct PageDocument {
    pub url: String,
    pub title: String,
    frames: Vec<Frame>,
}

impl PageDocument {
    pub fn new(url: impl Into<String>, title: impl Into<String>, html: Html) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            frames: vec![Frame { html, host: None }],
        }
    }

    /// Attach an embedded sub-document, returning its frame index.
    pub fn push_frame(&mut self, html: Html, host: ElementHandle) -> usize {
        self.frames.push(Frame {
            html,
            host: Some(host),
        });
        self.frames.len() - 1
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Resolve a handle back to a live element.
    pub fn element(&self, handle: &ElementHandle) -> Option<ElementRef<'_>> {
        let frame = self.frames.get(handle.frame)?;
        let mut node = frame.html.tree.root();
        for &idx in &handle.path {
            node = node.children().nth(idx)?;
        }
        ElementRef::wrap(node)
    }

    /// Parent *element* of a handle, mirroring `parentElement`: the
    /// document node does not count, and frame boundaries are not crossed.
    pub fn parent_element(&self, handle: &ElementHandle) -> Option<ElementHandle> {
        let parent = handle.parent()?;
        self.element(&parent).map(|_| parent)
    }

    /// Run a selector against every frame, in frame order.
    pub fn select_all(&self, selector: &Selector) -> Vec<ElementHandle> {
        let mut found = Vec::new();
        for (idx, frame) in self.frames.iter().enumerate() {
            found.extend(
                frame
                    .html
                    .select(selector)
                    .map(|el| ElementHandle::locate(idx, el)),
            );
        }
        found
    }

    /// Run a selector against a single frame.
    pub fn select_in_frame(&self, frame: usize, selector: &Selector) -> Vec<ElementHandle> {
        match self.frames.get(frame) {
            Some(f) => f
                .html
                .select(selector)
                .map(|el| ElementHandle::locate(frame, el))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Total number of elements across all frames
    pub fn element_count(&self) -> usize {
        self.frames
            .iter()
            .map(|f| f.html.root_element().descendants().filter(|n| n.value().is_element()).count())
            .sum()
    }
}

/// Lower-cased tag name of an element.
pub fn tag_name(el: ElementRef<'_>) -> String {
    el.value().name().to_ascii_lowercase()
}
