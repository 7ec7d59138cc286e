//! Query parameters for the two analytics endpoints.

use serde_json::json;

use crate::heatmap::filter::{Aggregation, HeatmapType, UrlFilter, ViewportRange};

/// Per-element click statistics for one page.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementStatsQuery {
    pub url: UrlFilter,
    pub date_from: String,
    pub date_to: Option<String>,
}

impl ElementStatsQuery {
    pub fn params(&self) -> Vec<(String, String)> {
        let (value, operator) = match &self.url {
            UrlFilter::Exact(href) => (href.clone(), "exact"),
            pattern @ UrlFilter::Pattern(_) => (pattern.to_regex(), "regex"),
        };
        let properties = json!([{
            "key": "$current_url",
            "value": value,
            "operator": operator,
            "type": "event",
        }]);

        let mut params = vec![
            ("paginate_response".to_string(), "true".to_string()),
            ("properties".to_string(), properties.to_string()),
            ("date_from".to_string(), self.date_from.clone()),
        ];
        if let Some(to) = &self.date_to {
            params.push(("date_to".to_string(), to.clone()));
        }
        params
    }
}

/// Aggregated positional samples for one page and viewport band.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapQuery {
    pub heatmap_type: HeatmapType,
    pub date_from: String,
    pub date_to: Option<String>,
    pub url: UrlFilter,
    pub viewport: ViewportRange,
    pub aggregation: Aggregation,
}

impl HeatmapQuery {
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("type".to_string(), self.heatmap_type.as_str().to_string()),
            ("date_from".to_string(), self.date_from.clone()),
        ];
        if let Some(to) = &self.date_to {
            params.push(("date_to".to_string(), to.clone()));
        }
        match &self.url {
            UrlFilter::Exact(href) => params.push(("url_exact".to_string(), href.clone())),
            pattern @ UrlFilter::Pattern(_) => {
                params.push(("url_pattern".to_string(), pattern.to_regex()))
            }
        }
        params.push(("viewport_width_min".to_string(), self.viewport.min.to_string()));
        params.push(("viewport_width_max".to_string(), self.viewport.max.to_string()));
        params.push(("aggregation".to_string(), self.aggregation.as_str().to_string()));
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn exact_element_stats_filter() {
        let q = ElementStatsQuery {
            url: UrlFilter::Exact("https://example.com/pricing".into()),
            date_from: "-7d".into(),
            date_to: None,
        };
        let params = q.params();
        assert_eq!(get(&params, "paginate_response"), Some("true"));
        assert_eq!(get(&params, "date_to"), None);

        let props: serde_json::Value = serde_json::from_str(get(&params, "properties").unwrap()).unwrap();
        assert_eq!(props[0]["key"], "$current_url");
        assert_eq!(props[0]["operator"], "exact");
        assert_eq!(props[0]["value"], "https://example.com/pricing");
    }

    #[test]
    fn wildcard_element_stats_filter_becomes_regex() {
        let q = ElementStatsQuery {
            url: UrlFilter::from_href("https://example.com/blog/*"),
            date_from: "-30d".into(),
            date_to: Some("2026-10-01".into()),
        };
        let params = q.params();
        let props: serde_json::Value = serde_json::from_str(get(&params, "properties").unwrap()).unwrap();
        assert_eq!(props[0]["operator"], "regex");
        assert_eq!(props[0]["value"], "https://example\\.com/blog/.*");
        assert_eq!(get(&params, "date_to"), Some("2026-10-01"));
    }

    #[test]
    fn heatmap_params() {
        let q = HeatmapQuery {
            heatmap_type: HeatmapType::Rageclick,
            date_from: "-7d".into(),
            date_to: None,
            url: UrlFilter::Exact("https://example.com/".into()),
            viewport: ViewportRange { min: 900, max: 1100 },
            aggregation: Aggregation::UniqueVisitors,
        };
        let params = q.params();
        assert_eq!(get(&params, "type"), Some("rageclick"));
        assert_eq!(get(&params, "url_exact"), Some("https://example.com/"));
        assert_eq!(get(&params, "url_pattern"), None);
        assert_eq!(get(&params, "viewport_width_min"), Some("900"));
        assert_eq!(get(&params, "viewport_width_max"), Some("1100"));
        assert_eq!(get(&params, "aggregation"), Some("unique_visitors"));
    }
}
