//! Toolbar configuration.
//!
//! A [`ToolbarConfig`] comes either from command-line flags or from the
//! launch fragment the toolbar is opened with
//! (`https://site.example/#__posthog=<url-encoded JSON>`).

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

const LAUNCH_KEY: &str = "__posthog";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid launch URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("launch URL has no __posthog fragment")]
    MissingLaunchParams,
    #[error("launch parameters are not valid JSON: {0}")]
    InvalidLaunchParams(#[from] serde_json::Error),
    #[error("launch parameters carry no apiURL")]
    MissingApiUrl,
}

#[derive(Debug, Clone)]
pub struct ToolbarConfig {
    pub api_url: String,
    pub temporary_token: Option<String>,
    /// Attributes the site tags elements with, e.g. `data-attr`.
    pub data_attributes: Vec<String>,
    pub element_stats_debounce: Duration,
    pub heatmap_debounce: Duration,
    pub scroll_poll_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for ToolbarConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            temporary_token: None,
            data_attributes: vec!["data-attr".to_string()],
            element_stats_debounce: Duration::from_millis(100),
            heatmap_debounce: Duration::from_millis(150),
            scroll_poll_interval: Duration::from_millis(100),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Parameters the toolbar is launched with.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LaunchParams {
    pub action: Option<String>,
    #[serde(rename = "apiURL")]
    pub api_url: Option<String>,
    pub temporary_token: Option<String>,
    #[serde(default)]
    pub data_attributes: Vec<String>,
    pub token: Option<String>,
    pub user_intent: Option<String>,
    pub toolbar_version: Option<String>,
    #[serde(rename = "jsURL")]
    pub js_url: Option<String>,
    pub action_id: Option<u64>,
}

impl LaunchParams {
    /// Extract the launch parameters from a page location.
    pub fn from_location(location: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(location)?;
        let fragment = url.fragment().ok_or(ConfigError::MissingLaunchParams)?;
        let raw = url::form_urlencoded::parse(fragment.as_bytes())
            .find(|(k, _)| k == LAUNCH_KEY)
            .map(|(_, v)| v.into_owned())
            .ok_or(ConfigError::MissingLaunchParams)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl ToolbarConfig {
    /// Overlay launch parameters on top of `self`.
    pub fn with_launch_params(mut self, params: &LaunchParams) -> Result<Self, ConfigError> {
        let api_url = params.api_url.as_deref().ok_or(ConfigError::MissingApiUrl)?;
        self.api_url = api_url.trim_end_matches('/').to_string();
        if params.temporary_token.is_some() {
            self.temporary_token = params.temporary_token.clone();
        }
        if !params.data_attributes.is_empty() {
            self.data_attributes = params.data_attributes.clone();
        }
        Ok(self)
    }

    pub fn from_launch_url(location: &str) -> Result<Self, ConfigError> {
        let params = LaunchParams::from_location(location)?;
        log::debug!(
            "launch params: intent={:?} version={:?}",
            params.user_intent,
            params.toolbar_version
        );
        Self::default().with_launch_params(&params)
    }
}
