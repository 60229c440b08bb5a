//! Adaptive extraction agent.
//!
//! [`Scraper`] drives a [`gleaner_drivers::BrowserCapabilities`] session
//! through navigation, pre-extraction [`Interaction`]s, model-assisted page
//! analysis and pagination, and returns a [`ScrapeResult`] with a
//! [`QualityReport`] over everything it gathered.
//!
//! ```no_run
//! use gleaner_agent::{ScrapeConfig, Scraper};
//! use gleaner_drivers::{DriverOptions, WebDriverSession};
//! use std::sync::Arc;
//!
//! # async fn demo(llm: Arc<dyn gleaner_llm::traits::LlmClient + Send + Sync>) -> anyhow::Result<()> {
//! let job: ScrapeConfig = serde_json::from_str(
//!     r#"{"url": "https://example.com", "schema": {"title": "string", "url": "string"}}"#,
//! )?;
//! let session = WebDriverSession::connect(DriverOptions::default()).await?;
//! let result = Scraper::new(llm).scrape(session, &job).await;
//! println!("{}", serde_json::to_string_pretty(&result)?);
//! # Ok(())
//! # }
//! ```
pub mod analyzer;
pub mod error;
pub mod interactions;
pub mod job;
pub mod pagination;
pub mod quality;
pub mod result;
pub mod schema;
pub mod scraper;

pub use analyzer::PageAnalyzer;
pub use error::ExtractionError;
pub use interactions::run_interactions;
pub use job::{Interaction, ScrapeConfig, ScrapeOptions};
pub use pagination::{NextPage, PaginationDetector, NO_PAGINATION};
pub use quality::score;
pub use result::{QualityReport, RunMetadata, ScrapeData, ScrapeResult, ScrapeStatus};
pub use schema::{FieldType, Schema};
pub use scraper::{Scraper, ScraperOptions};
