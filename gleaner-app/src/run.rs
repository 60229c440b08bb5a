use anyhow::{Context, Result};
use gleaner_agent::{ScrapeConfig, ScrapeResult, Scraper, ScraperOptions};
use gleaner_common::LlmConfig;
use gleaner_config::{AgentSettings, BrowserSettings, GleanerSettings};
use gleaner_drivers::{DriverOptions, WebDriverSession};
use gleaner_llm::ensure_llm_ready;
use std::path::Path;
use std::time::Duration;

pub fn read_job(path: &Path) -> Result<ScrapeConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read job file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid job file {}", path.display()))
}

pub fn write_result(path: &Path, result: &ScrapeResult) -> Result<()> {
    let body = serde_json::to_string_pretty(result)?;
    std::fs::write(path, body)
        .with_context(|| format!("failed to write result to {}", path.display()))
}

/// Replace the OpenAI token from the settings file with one given on the
/// command line.
pub fn override_api_key(llm: &mut LlmConfig, key: Option<String>) {
    if let (LlmConfig::Openai { auth_token, .. }, Some(key)) = (llm, key) {
        if !key.trim().is_empty() {
            *auth_token = key;
        }
    }
}

pub fn driver_options(browser: &BrowserSettings) -> DriverOptions {
    DriverOptions {
        webdriver_url: browser.webdriver_url.clone(),
        headless: browser.headless,
        navigation_timeout_ms: browser.navigation_timeout_ms,
        ..DriverOptions::default()
    }
}

pub fn scraper_options(agent: &AgentSettings) -> ScraperOptions {
    ScraperOptions {
        markup_budget_bytes: agent.markup_budget_bytes,
        pagination_markup_budget_bytes: agent.pagination_markup_budget_bytes,
        extraction_max_tokens: agent.extraction_max_tokens,
        pagination_max_tokens: agent.pagination_max_tokens,
        settle: Duration::from_millis(agent.settle_ms),
    }
}

/// Build the model client and a browser session, then run `job` once.
pub async fn run_job(settings: &GleanerSettings, job: &ScrapeConfig) -> Result<ScrapeResult> {
    let llm = ensure_llm_ready(&settings.llm)
        .await
        .context("language model is not ready")?;

    let session = WebDriverSession::connect(driver_options(&settings.browser))
        .await
        .with_context(|| {
            format!(
                "could not open a browser session at {}",
                settings.browser.webdriver_url
            )
        })?;

    let scraper = Scraper::with_options(llm, scraper_options(&settings.agent));
    Ok(scraper.scrape(session, job).await)
}
