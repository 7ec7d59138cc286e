//! Compatibility check against the instrumentation library on the host page.
//!
//! Scroll-depth heatmaps need scroll properties on captured events, which
//! older library versions do not send and which can be switched off.

use semver::Version;
use serde::Deserialize;

/// First library release that records scroll depth.
pub const MIN_SCROLL_DEPTH_VERSION: Version = Version::new(1, 99, 0);

/// What the host page reports about its instrumentation library.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostLibraryInfo {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub disable_scroll_properties: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollDepthSupport {
    VersionTooOld { found: String },
    DisabledByConfig,
    Compatible,
}

impl ScrollDepthSupport {
    pub fn is_compatible(&self) -> bool {
        matches!(self, ScrollDepthSupport::Compatible)
    }
}

pub fn check_scroll_depth_support(host: &HostLibraryInfo) -> ScrollDepthSupport {
    let raw = host.version.trim().trim_start_matches('v');
    match Version::parse(raw) {
        Ok(v) if v >= MIN_SCROLL_DEPTH_VERSION => {}
        _ => {
            return ScrollDepthSupport::VersionTooOld {
                found: host.version.clone(),
            }
        }
    }
    if host.disable_scroll_properties {
        return ScrollDepthSupport::DisabledByConfig;
    }
    ScrollDepthSupport::Compatible
}
