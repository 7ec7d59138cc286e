//! Blocking HTTP client for the element-stats and heatmap endpoints.

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::config::ToolbarConfig;
use crate::heatmap::model::{
    ElementStatsPage, HeatmapRecord, RawElementStatsPage, RawHeatmapResponse,
};
use crate::net::query::{ElementStatsQuery, HeatmapQuery};

const ELEMENT_STATS_PATH: &str = "api/element/stats/";
const HEATMAP_PATH: &str = "api/heatmap/";
const TOKEN_PARAM: &str = "temporary_token";

/// Error during a data load
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LoadError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// A response that arrived in one piece. `Forbidden` is not an error: the
/// caller asks the user to re-authenticate and keeps its state.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Data(T),
    Forbidden,
}

/// Raised whenever the API answers 403.
pub trait AuthSignal: Send + Sync {
    fn authentication_required(&self);
}

/// The two endpoints the overlay reads from.
pub trait HeatmapApi: Send + Sync {
    fn element_stats(&self, query: &ElementStatsQuery) -> Result<Fetched<ElementStatsPage>, LoadError>;

    /// Follow a continuation URL returned as `next` by a previous page.
    fn element_stats_page(&self, next: &str) -> Result<Fetched<ElementStatsPage>, LoadError>;

    fn heatmap(&self, query: &HeatmapQuery) -> Result<Fetched<Vec<HeatmapRecord>>, LoadError>;
}

pub struct HttpHeatmapApi {
    client: reqwest::blocking::Client,
    api_url: Url,
    temporary_token: Option<String>,
}

impl HttpHeatmapApi {
    pub fn new(config: &ToolbarConfig) -> Result<Self, LoadError> {
        let mut api_url =
            Url::parse(&config.api_url).map_err(|e| LoadError::InvalidUrl(e.to_string()))?;
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }

        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("heatmap-overlay/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| LoadError::Request(format!("client error: {}", e)))?;

        Ok(Self {
            client,
            api_url,
            temporary_token: config.temporary_token.clone(),
        })
    }

    fn endpoint(&self, path: &str, params: &[(String, String)]) -> Result<Url, LoadError> {
        let mut url = self
            .api_url
            .join(path)
            .map_err(|e| LoadError::InvalidUrl(e.to_string()))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        self.with_token(url)
    }

    fn with_token(&self, mut url: Url) -> Result<Url, LoadError> {
        if let Some(token) = &self.temporary_token {
            if !url.query_pairs().any(|(k, _)| k == TOKEN_PARAM) {
                url.query_pairs_mut().append_pair(TOKEN_PARAM, token);
            }
        }
        Ok(url)
    }

    /// GET a URL, returning status and body.
    fn get(&self, url: Url) -> Result<(u16, String), LoadError> {
        log::debug!("GET {}", redact(&url));
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| LoadError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| LoadError::Request(format!("failed to read body: {}", e)))?;
        Ok((status, body))
    }

    fn stats_response(&self, url: Url) -> Result<Fetched<ElementStatsPage>, LoadError> {
        let (status, body) = self.get(url)?;
        match status {
            403 => Ok(Fetched::Forbidden),
            200..=299 => parse_element_stats(&body).map(Fetched::Data),
            other => Err(LoadError::Status(other)),
        }
    }
}

impl HeatmapApi for HttpHeatmapApi {
    fn element_stats(&self, query: &ElementStatsQuery) -> Result<Fetched<ElementStatsPage>, LoadError> {
        let url = self.endpoint(ELEMENT_STATS_PATH, &query.params())?;
        self.stats_response(url)
    }

    fn element_stats_page(&self, next: &str) -> Result<Fetched<ElementStatsPage>, LoadError> {
        let url = Url::parse(next)
            .or_else(|_| self.api_url.join(next))
            .map_err(|e| LoadError::InvalidUrl(e.to_string()))?;
        let url = self.with_token(url)?;
        self.stats_response(url)
    }

    fn heatmap(&self, query: &HeatmapQuery) -> Result<Fetched<Vec<HeatmapRecord>>, LoadError> {
        let url = self.endpoint(HEATMAP_PATH, &query.params())?;
        let (status, body) = self.get(url)?;
        match status {
            403 => Ok(Fetched::Forbidden),
            200 => parse_heatmap(&body).map(Fetched::Data),
            other => Err(LoadError::Status(other)),
        }
    }
}

/// Decode an element-stats page. A body without a `results` array is
/// malformed even if it is otherwise valid JSON.
pub fn parse_element_stats(body: &str) -> Result<ElementStatsPage, LoadError> {
    let raw: RawElementStatsPage =
        serde_json::from_str(body).map_err(|e| LoadError::Malformed(e.to_string()))?;
    let results = raw
        .results
        .ok_or_else(|| LoadError::Malformed("missing results array".into()))?;
    Ok(ElementStatsPage {
        results,
        next: raw.next,
        previous: raw.previous,
    })
}

pub fn parse_heatmap(body: &str) -> Result<Vec<HeatmapRecord>, LoadError> {
    let raw: RawHeatmapResponse =
        serde_json::from_str(body).map_err(|e| LoadError::Malformed(e.to_string()))?;
    raw.results
        .ok_or_else(|| LoadError::Malformed("missing results array".into()))
}

/// URL with the temporary token masked, for logs.
fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == TOKEN_PARAM { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    shown.query_pairs_mut().clear().extend_pairs(pairs);
    shown.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heatmap::filter::UrlFilter;

    fn api(token: Option<&str>) -> HttpHeatmapApi {
        let config = ToolbarConfig {
            api_url: "https://analytics.example.com/base".into(),
            temporary_token: token.map(str::to_string),
            ..ToolbarConfig::default()
        };
        HttpHeatmapApi::new(&config).unwrap()
    }

    #[test]
    fn parse_stats_page() {
        let body = r#"{"results": [{"count": 2, "type": "$autocapture", "elements": [{"tag_name": "a"}]}],
                       "next": "https://analytics.example.com/api/element/stats/?offset=100", "previous": null}"#;
        let page = parse_element_stats(body).unwrap();
        assert_eq!(page.results.len(), 1);
        assert!(page.next.is_some());
        assert!(page.previous.is_none());
    }

    #[test]
    fn missing_results_is_malformed() {
        assert_eq!(
            parse_element_stats(r#"{"next": null}"#),
            Err(LoadError::Malformed("missing results array".into()))
        );
        assert!(matches!(parse_heatmap("<html>"), Err(LoadError::Malformed(_))));
        assert_eq!(parse_heatmap(r#"{"results": []}"#), Ok(vec![]));
    }

    #[test]
    fn endpoints_carry_params_and_token() {
        let client = api(Some("tok"));
        let query = ElementStatsQuery {
            url: UrlFilter::Exact("https://shop.example.com/".into()),
            date_from: "-7d".into(),
            date_to: None,
        };
        let url = client.endpoint(ELEMENT_STATS_PATH, &query.params()).unwrap();
        assert_eq!(url.path(), "/base/api/element/stats/");
        assert!(url.query_pairs().any(|(k, v)| k == "temporary_token" && v == "tok"));
        assert!(url.query_pairs().any(|(k, v)| k == "date_from" && v == "-7d"));
        assert!(redact(&url).contains("temporary_token=***"));
    }

    #[test]
    fn token_is_not_duplicated() {
        let client = api(Some("tok"));
        let url = Url::parse("https://analytics.example.com/api/element/stats/?temporary_token=old").unwrap();
        let url = client.with_token(url).unwrap();
        assert_eq!(url.query_pairs().filter(|(k, _)| k == "temporary_token").count(), 1);

        let untouched = api(None)
            .with_token(Url::parse("https://a.example/x").unwrap())
            .unwrap();
        assert_eq!(untouched.query(), None);
    }
}
