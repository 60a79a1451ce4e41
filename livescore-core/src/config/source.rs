//! Upstream source configuration.

use url::Url;

/// One upstream provider, in league priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Stable id, used as the league group id and in cache keys.
    pub id: String,
    /// Human-readable league name.
    pub name: String,
    /// Root URL of the provider's JSON feed. Always ends with `/`.
    pub base_url: Url,
    /// Show the league even when a successful fetch returned no events.
    pub always_show: bool,
}
