//! The per-run extraction loop.
//!
//! A run navigates once, applies the job's interactions, then alternates
//! between analysing the current page and asking the model for a next-page
//! control until the page limit, the end marker, or a failure stops it.
//! Items gathered before a failure are always kept.
use crate::analyzer::{PageAnalyzer, DEFAULT_EXTRACTION_MAX_TOKENS, DEFAULT_MARKUP_BUDGET};
use crate::interactions::run_interactions;
use crate::job::ScrapeConfig;
use crate::pagination::{
    NextPage, PaginationDetector, DEFAULT_PAGINATION_MARKUP_BUDGET, DEFAULT_PAGINATION_MAX_TOKENS,
};
use crate::quality::score;
use crate::result::{RunMetadata, ScrapeData, ScrapeResult, ScrapeStatus};
use chrono::Utc;
use gleaner_drivers::BrowserCapabilities;
use gleaner_llm::traits::LlmClient;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

/// Knobs for one [`Scraper`].
#[derive(Debug, Clone)]
pub struct ScraperOptions {
    pub markup_budget_bytes: usize,
    pub pagination_markup_budget_bytes: usize,
    pub extraction_max_tokens: u32,
    pub pagination_max_tokens: u32,
    /// Pause after a next-page click before reading the new markup.
    pub settle: Duration,
}

impl Default for ScraperOptions {
    fn default() -> Self {
        Self {
            markup_budget_bytes: DEFAULT_MARKUP_BUDGET,
            pagination_markup_budget_bytes: DEFAULT_PAGINATION_MARKUP_BUDGET,
            extraction_max_tokens: DEFAULT_EXTRACTION_MAX_TOKENS,
            pagination_max_tokens: DEFAULT_PAGINATION_MAX_TOKENS,
            settle: Duration::from_millis(2000),
        }
    }
}

pub struct Scraper {
    analyzer: PageAnalyzer,
    detector: PaginationDetector,
    settle: Duration,
}

impl Scraper {
    pub fn new(llm: Arc<dyn LlmClient + Send + Sync>) -> Self {
        Self::with_options(llm, ScraperOptions::default())
    }

    pub fn with_options(llm: Arc<dyn LlmClient + Send + Sync>, opts: ScraperOptions) -> Self {
        let analyzer = PageAnalyzer::new(llm.clone())
            .with_markup_budget(opts.markup_budget_bytes)
            .with_max_tokens(opts.extraction_max_tokens);
        let detector = PaginationDetector::new(llm)
            .with_markup_budget(opts.pagination_markup_budget_bytes)
            .with_max_tokens(opts.pagination_max_tokens);
        Self {
            analyzer,
            detector,
            settle: opts.settle,
        }
    }

    /// Run one job against `session`, then close it.
    ///
    /// Never fails: every outcome, including a failed navigation, is
    /// described by the returned [`ScrapeResult`].
    pub async fn scrape<B>(&self, mut session: B, config: &ScrapeConfig) -> ScrapeResult
    where
        B: BrowserCapabilities,
    {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("scrape", %run_id, url = %config.url);

        let result = self.run(&mut session, config).instrument(span.clone()).await;

        if let Err(e) = session.close().instrument(span.clone()).await {
            let _enter = span.enter();
            tracing::warn!(error = %e, "scrape.session.close_failed");
        }
        result
    }

    async fn run<B>(&self, session: &mut B, config: &ScrapeConfig) -> ScrapeResult
    where
        B: BrowserCapabilities,
    {
        let page_limit = config.options.page_limit();
        tracing::info!(
            pagination = config.options.pagination,
            page_limit,
            interactions = config.interactions.len(),
            "scrape.start"
        );

        match session.navigate(&config.url).await {
            Ok(nav) => tracing::info!(
                current_url = %nav.current_url,
                title = ?nav.title,
                "scrape.navigated"
            ),
            Err(e) => {
                tracing::error!(error = %e, "scrape.navigation_failed");
                return ScrapeResult::failed(e.to_string());
            }
        }

        let mut warnings = run_interactions(&config.interactions, session).await;

        let mut items: Vec<Value> = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        let mut previous: Option<blake3::Hash> = None;
        let mut page: u32 = 0;

        loop {
            let markup = match session.rendered_markup().await {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(page = page + 1, error = %e, "scrape.page.markup_failed");
                    errors.push(format!("page {}: could not read markup: {e}", page + 1));
                    break;
                }
            };

            let digest = blake3::hash(markup.as_bytes());
            if previous == Some(digest) {
                tracing::info!(page, "pagination.stalled");
                break;
            }
            previous = Some(digest);
            page += 1;

            match self.analyzer.analyze(&markup, &config.schema).await {
                Ok(found) => {
                    tracing::info!(page, items = found.len(), "scrape.page.analyzed");
                    items.extend(found);
                }
                Err(e) => {
                    tracing::warn!(page, error = %e, "scrape.page.failed");
                    errors.push(format!("page {page}: {e}"));
                    break;
                }
            }

            if page >= page_limit {
                break;
            }

            let selector = match self.detector.detect_next(&markup).await {
                Ok(NextPage::Selector(s)) => s,
                Ok(NextPage::Exhausted) => {
                    tracing::info!(page, "pagination.exhausted");
                    break;
                }
                Err(e) => {
                    tracing::warn!(page, error = %e, "pagination.detect_failed");
                    warnings.push(format!("pagination detection failed after page {page}: {e}"));
                    break;
                }
            };

            tracing::info!(page, %selector, "pagination.selector");
            if let Err(e) = session.click(&selector).await {
                // A missing or disabled next control is how the last page usually looks.
                if e.is_element_failure() {
                    tracing::info!(page, %selector, error = %e, "pagination.last_page");
                } else {
                    tracing::warn!(page, %selector, error = %e, "pagination.click_failed");
                }
                break;
            }
            tokio::time::sleep(self.settle).await;
        }

        let mut report = score(&items);
        report.errors = errors;

        let status = if report.errors.is_empty() {
            ScrapeStatus::Success
        } else if items.is_empty() {
            ScrapeStatus::Error
        } else {
            ScrapeStatus::PartialSuccess
        };
        let error_message = match status {
            ScrapeStatus::Success => None,
            _ => report.errors.last().cloned(),
        };

        tracing::info!(
            status = status.as_str(),
            pages = page,
            items = report.total_items,
            completion_rate = report.completion_rate,
            "scrape.done"
        );

        let metadata = declares_metadata(config).then(|| RunMetadata {
            extracted_at: Utc::now(),
            item_count: items.len(),
        });

        ScrapeResult {
            status,
            data: ScrapeData { items, metadata },
            quality_report: report,
            error_message,
            warnings,
        }
    }
}

fn declares_metadata(config: &ScrapeConfig) -> bool {
    config.schema.fields().iter().any(|(name, _)| name == "metadata")
}
