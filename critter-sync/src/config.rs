use critter_types::{PageSizeBounds, DEFAULT_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration shared by every sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between background polls.
    pub poll_interval_secs: u64,
    /// Page sizes the API accepts.
    pub page_size_bounds: PageSizeBounds,
    /// Page size of a freshly started engine.
    pub default_page_size: u32,
    /// Most server pages a client-filtered fetch will walk.
    pub client_filter_page_cap: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
            page_size_bounds: PageSizeBounds::default(),
            default_page_size: DEFAULT_PAGE_SIZE,
            client_filter_page_cap: 20,
        }
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}
