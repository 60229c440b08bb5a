use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeStatus {
    Success,
    PartialSuccess,
    Error,
}

impl ScrapeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrapeStatus::Success => "success",
            ScrapeStatus::PartialSuccess => "partial_success",
            ScrapeStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub total_items: usize,
    pub complete_items: usize,
    pub completion_rate: f64,
    /// Dotted field path to the number of items missing it.
    pub missing_fields: BTreeMap<String, usize>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeData {
    pub items: Vec<Value>,
    /// Present only when the job's schema declares a top-level `metadata`
    /// field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RunMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub extracted_at: DateTime<Utc>,
    pub item_count: usize,
}

/// Envelope returned by every run, whatever happened during it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub status: ScrapeStatus,
    pub data: ScrapeData,
    pub quality_report: QualityReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ScrapeResult {
    /// Result for a run that never reached the target page.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ScrapeStatus::Error,
            data: ScrapeData::default(),
            quality_report: QualityReport::default(),
            error_message: Some(message.into()),
            warnings: Vec::new(),
        }
    }

    pub fn items(&self) -> &[Value] {
        &self.data.items
    }
}
