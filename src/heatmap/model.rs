//! Wire types received from the analytics API.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Attribute key under which the default data attribute is recorded.
pub const DATA_ATTR_KEY: &str = "attr__data-attr";

/// One recorded element, as captured by the instrumentation library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    #[serde(default)]
    pub tag_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attr_class: Vec<String>,
    #[serde(default)]
    pub attr_id: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub nth_child: Option<u32>,
    #[serde(default)]
    pub nth_of_type: Option<u32>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub order: Option<u32>,
}

impl ElementDescriptor {
    /// Recorded value of a custom attribute (`data-attr` → `attr__data-attr`).
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(&format!("attr__{}", name))
            .map(|s| s.as_str())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Kind of recorded interaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "$autocapture")]
    Click,
    #[serde(rename = "$rageclick")]
    RageClick,
    #[serde(untagged)]
    Other(String),
}

impl EventType {
    pub fn is_rageclick(&self) -> bool {
        matches!(self, EventType::RageClick)
    }
}

impl Default for EventType {
    fn default() -> Self {
        EventType::Click
    }
}

/// Aggregated clicks on one recorded element path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    /// Innermost (clicked) element first, then its ancestors outward.
    pub elements: Vec<ElementDescriptor>,
    pub count: u64,
    #[serde(rename = "type", default)]
    pub event_type: EventType,
    #[serde(default)]
    pub hash: Option<String>,
}

/// One page of element statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementStatsPage {
    pub results: Vec<InteractionEvent>,
    pub next: Option<String>,
    pub previous: Option<String>,
}

/// Raw page body; `results` is optional so a missing array can be told
/// apart from an empty one.
#[derive(Debug, Deserialize)]
pub(crate) struct RawElementStatsPage {
    pub results: Option<Vec<InteractionEvent>>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
}

/// A positional heatmap sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeatmapRecord {
    /// Visitors that scrolled at least to `scroll_depth_bucket` pixels.
    ScrollDepth {
        scroll_depth_bucket: f64,
        cumulative_count: u64,
    },
    /// Pointer samples at a page position.
    Pointer {
        count: u64,
        pointer_relative_x: f64,
        pointer_y: f64,
        #[serde(default)]
        pointer_target_fixed: bool,
    },
}

impl HeatmapRecord {
    pub fn is_fixed(&self) -> bool {
        matches!(
            self,
            HeatmapRecord::Pointer {
                pointer_target_fixed: true,
                ..
            }
        )
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawHeatmapResponse {
    pub results: Option<Vec<HeatmapRecord>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_element_stats_event() {
        let body = r#"{
            "count": 12,
            "hash": "abc",
            "type": "$rageclick",
            "elements": [
                {"tag_name": "button", "attr_class": ["btn", "primary"], "nth_child": 2,
                 "nth_of_type": 1, "attributes": {"attr__data-attr": "buy"}, "text": "Buy"},
                {"tag_name": "div", "attr_class": null, "attr_id": "shop"}
            ]
        }"#;
        let event: InteractionEvent = serde_json::from_str(body).unwrap();
        assert_eq!(event.count, 12);
        assert!(event.event_type.is_rageclick());
        assert_eq!(event.elements[0].attribute("data-attr"), Some("buy"));
        assert!(event.elements[1].attr_class.is_empty());
        assert_eq!(event.elements[1].attr_id.as_deref(), Some("shop"));
    }

    #[test]
    fn unknown_event_types_survive() {
        let event: InteractionEvent =
            serde_json::from_str(r#"{"count": 1, "type": "$dead_click", "elements": []}"#).unwrap();
        assert_eq!(event.event_type, EventType::Other("$dead_click".into()));
        assert!(!event.event_type.is_rageclick());
    }

    #[test]
    fn decode_heatmap_records() {
        let body = r#"[
            {"scroll_depth_bucket": 800, "cumulative_count": 40},
            {"count": 3, "pointer_relative_x": 0.25, "pointer_y": 900, "pointer_target_fixed": true}
        ]"#;
        let records: Vec<HeatmapRecord> = serde_json::from_str(body).unwrap();
        assert_eq!(
            records[0],
            HeatmapRecord::ScrollDepth {
                scroll_depth_bucket: 800.0,
                cumulative_count: 40
            }
        );
        assert!(records[1].is_fixed());
        assert!(!records[0].is_fixed());
    }
}
