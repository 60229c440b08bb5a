use crate::schema::Schema;
use serde::{Deserialize, Serialize};

/// One scraping job: where to go, what to extract, how to get there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    pub url: String,
    pub schema: Schema,
    #[serde(default)]
    pub interactions: Vec<Interaction>,
    #[serde(default)]
    pub options: ScrapeOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeOptions {
    #[serde(default)]
    pub pagination: bool,
    #[serde(default = "default_max_pages", alias = "maxPages")]
    pub max_pages: u32,
}

fn default_max_pages() -> u32 {
    1
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            pagination: false,
            max_pages: default_max_pages(),
        }
    }
}

impl ScrapeOptions {
    /// Number of pages the run may visit. Pagination off always means one.
    pub fn page_limit(&self) -> u32 {
        if self.pagination {
            self.max_pages.max(1)
        } else {
            1
        }
    }
}

/// A pre-extraction action, applied in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Interaction {
    Click {
        selector: String,
    },
    Wait {
        /// Milliseconds.
        #[serde(default = "default_wait_ms", alias = "duration_ms", alias = "durationMs")]
        duration: u64,
    },
    Fill {
        selector: String,
        value: String,
    },
    /// Accepted in job files but never executed.
    Scroll {
        #[serde(default = "default_scroll_direction")]
        direction: String,
    },
}

fn default_wait_ms() -> u64 {
    1000
}

fn default_scroll_direction() -> String {
    "bottom".to_string()
}
