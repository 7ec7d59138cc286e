//! User-adjustable heatmap filters and the values derived from them.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::store::{PreferenceStore, StoreError};

/// Preference key the filter state is persisted under.
pub const FILTER_STATE_KEY: &str = "heatmap.filters";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatmapType {
    Click,
    Rageclick,
    Mousemove,
    Scrolldepth,
}

impl HeatmapType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeatmapType::Click => "click",
            HeatmapType::Rageclick => "rageclick",
            HeatmapType::Mousemove => "mousemove",
            HeatmapType::Scrolldepth => "scrolldepth",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    TotalCount,
    UniqueVisitors,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::TotalCount => "total_count",
            Aggregation::UniqueVisitors => "unique_visitors",
        }
    }
}

/// How samples recorded on fixed-position targets are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixedPositionMode {
    /// Glued to the viewport, like the element they were recorded on
    Fixed,
    /// Scrolled with the page
    Relative,
    /// Not drawn at all
    Hidden,
}

/// Persisted overlay filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub enabled: bool,
    pub heatmap_type: HeatmapType,
    pub viewport_accuracy: f64,
    pub aggregation: Aggregation,
    pub fixed_position_mode: FixedPositionMode,
    pub clickmaps_enabled: bool,
    pub match_links_by_href: bool,
    pub date_from: String,
    pub date_to: Option<String>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            enabled: false,
            heatmap_type: HeatmapType::Click,
            viewport_accuracy: 0.2,
            aggregation: Aggregation::TotalCount,
            fixed_position_mode: FixedPositionMode::Fixed,
            clickmaps_enabled: true,
            match_links_by_href: true,
            date_from: "-7d".into(),
            date_to: None,
        }
    }
}

impl FilterState {
    /// Load persisted filters, falling back to defaults for anything missing
    /// or unreadable.
    pub fn load(store: &dyn PreferenceStore) -> Self {
        let Some(raw) = store.get(FILTER_STATE_KEY) else {
            return Self::default();
        };
        match serde_json::from_str::<FilterState>(&raw) {
            Ok(mut state) => {
                state.viewport_accuracy = clamp_accuracy(state.viewport_accuracy);
                state
            }
            Err(e) => {
                log::warn!("ignoring unreadable heatmap filters: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &mut dyn PreferenceStore) -> Result<(), StoreError> {
        let raw = serde_json::to_string(self).map_err(StoreError::Encode)?;
        store.set(FILTER_STATE_KEY, &raw)
    }
}

pub fn clamp_accuracy(accuracy: f64) -> f64 {
    if accuracy.is_nan() {
        return FilterState::default().viewport_accuracy;
    }
    accuracy.clamp(0.0, 1.0)
}

/// Window widths treated as "the same viewport" as the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportRange {
    pub min: u32,
    pub max: u32,
}

impl ViewportRange {
    pub fn compute(window_width: f64, viewport_accuracy: f64) -> Self {
        let width = window_width.max(0.0);
        let extra = width * (1.0 - clamp_accuracy(viewport_accuracy));
        Self {
            min: (width - extra).round().max(0.0) as u32,
            max: (width + extra).round() as u32,
        }
    }
}

/// The page address data is fetched for: a concrete URL or a `*` pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlFilter {
    Exact(String),
    Pattern(String),
}

impl UrlFilter {
    pub fn from_href(href: &str) -> Self {
        if href.contains('*') {
            UrlFilter::Pattern(href.to_string())
        } else {
            UrlFilter::Exact(href.to_string())
        }
    }

    pub fn href(&self) -> &str {
        match self {
            UrlFilter::Exact(h) | UrlFilter::Pattern(h) => h,
        }
    }

    /// Regular expression equivalent of a wildcard pattern.
    pub fn to_regex(&self) -> String {
        wildcard_to_regex(self.href())
    }
}

/// Escape everything except `*`, which becomes `.*`.
pub fn wildcard_to_regex(pattern: &str) -> String {
    regex::escape(pattern).replace("\\*", ".*")
}

/// Matches concrete URLs against an exact or wildcard href.
#[derive(Debug, Clone)]
pub struct HrefMatcher {
    filter: UrlFilter,
    regex: Option<Regex>,
}

impl HrefMatcher {
    pub fn new(filter: UrlFilter) -> Self {
        let regex = match &filter {
            UrlFilter::Pattern(p) => Regex::new(&format!("^{}$", wildcard_to_regex(p))).ok(),
            UrlFilter::Exact(_) => None,
        };
        Self { filter, regex }
    }

    pub fn filter(&self) -> &UrlFilter {
        &self.filter
    }

    pub fn matches(&self, url: &str) -> bool {
        match (&self.filter, &self.regex) {
            (UrlFilter::Exact(href), _) => href == url,
            (UrlFilter::Pattern(_), Some(re)) => re.is_match(url),
            (UrlFilter::Pattern(_), None) => false,
        }
    }
}
