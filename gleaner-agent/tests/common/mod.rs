#![allow(dead_code)]

use async_trait::async_trait;
use gleaner_agent::{Scraper, ScraperOptions};
use gleaner_common::observability::{LogConfig, LogFormat};
use gleaner_common::{GleanerError, Result};
use gleaner_drivers::{BrowserCapabilities, ErrorCode, Navigation, ToolError};
use gleaner_llm::traits::{LlmClient, LlmResponse};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let log_dir = tempfile::tempdir()
            .map(|dir| dir.keep())
            .unwrap_or_else(|_| std::env::temp_dir().join("gleaner-agent-tests"));
        let config = LogConfig {
            app_name: "gleaner-agent-tests",
            log_dir: Some(log_dir),
            emit_stderr: false,
            format: LogFormat::Text,
            default_filter: "debug".to_string(),
        };
        gleaner_common::observability::init_logging(config).unwrap_or_default()
    });
}

/// Scraper with no settle delay so tests run fast.
pub fn quick_scraper(llm: Arc<ScriptedLlm>) -> Scraper {
    Scraper::with_options(
        llm,
        ScraperOptions {
            settle: Duration::ZERO,
            ..ScraperOptions::default()
        },
    )
}

/// Model stand-in replaying canned replies.
///
/// Extraction prompts (recognised by their `TARGET SCHEMA` header) and
/// pagination prompts draw from separate queues. An `Err` entry or an empty
/// queue surfaces as `GleanerError::Llm`.
#[derive(Default)]
pub struct ScriptedLlm {
    extraction: Mutex<VecDeque<std::result::Result<String, String>>>,
    pagination: Mutex<VecDeque<std::result::Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extraction_reply(self, text: impl Into<String>) -> Self {
        self.extraction.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub fn extraction_failure(self, msg: impl Into<String>) -> Self {
        self.extraction.lock().unwrap().push_back(Err(msg.into()));
        self
    }

    pub fn pagination_reply(self, text: impl Into<String>) -> Self {
        self.pagination.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub fn pagination_failure(self, msg: impl Into<String>) -> Self {
        self.pagination.lock().unwrap().push_back(Err(msg.into()));
        self
    }

    pub fn extraction_calls(&self) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| is_extraction(p))
            .count()
    }

    pub fn pagination_calls(&self) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| !is_extraction(p))
            .count()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

fn is_extraction(prompt: &str) -> bool {
    prompt.contains("TARGET SCHEMA")
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(
        &self,
        prompt: &str,
        _system_prompt: Option<&str>,
        _max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        assert_eq!(temperature, Some(0.0), "agent prompts run at temperature 0");
        self.prompts.lock().unwrap().push(prompt.to_string());

        let queue = if is_extraction(prompt) {
            &self.extraction
        } else {
            &self.pagination
        };
        let next = queue.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(LlmResponse {
                text,
                model: Some("scripted".into()),
                tokens_used: None,
            }),
            Some(Err(msg)) => Err(GleanerError::Llm(msg)),
            None => Err(GleanerError::Llm("script exhausted".into())),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

#[derive(Default)]
struct BrowserState {
    pages: Vec<String>,
    current: usize,
    next_selector: Option<String>,
    next_advances: bool,
    accepted: HashSet<String>,
    navigation_error: Option<ToolError>,
    markup_error_on_page: Option<usize>,
    calls: Vec<String>,
    closed: bool,
}

/// In-memory browser session over a fixed list of page markups.
///
/// Clicking the configured next selector moves to the following page; any
/// other selector not explicitly accepted fails with `ELEMENT_NOT_FOUND`.
/// Clones share state so a test can inspect a session after moving it into
/// [`Scraper::scrape`].
#[derive(Clone, Default)]
pub struct FakeBrowser {
    state: Arc<Mutex<BrowserState>>,
}

impl FakeBrowser {
    pub fn with_pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let browser = Self::default();
        {
            let mut st = browser.state.lock().unwrap();
            st.pages = pages.into_iter().map(Into::into).collect();
            st.next_advances = true;
        }
        browser
    }

    pub fn next_selector(self, selector: &str) -> Self {
        self.state.lock().unwrap().next_selector = Some(selector.to_string());
        self
    }

    /// The next control accepts clicks but the page never changes.
    pub fn next_does_not_advance(self) -> Self {
        self.state.lock().unwrap().next_advances = false;
        self
    }

    pub fn accepting(self, selector: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .accepted
            .insert(selector.to_string());
        self
    }

    pub fn failing_navigation(self, err: ToolError) -> Self {
        self.state.lock().unwrap().navigation_error = Some(err);
        self
    }

    /// Reading markup fails once the session reaches page `index` (0-based).
    pub fn failing_markup_on_page(self, index: usize) -> Self {
        self.state.lock().unwrap().markup_error_on_page = Some(index);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix("click:").map(str::to_string))
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

#[async_trait]
impl BrowserCapabilities for FakeBrowser {
    async fn navigate(&mut self, url: &str) -> std::result::Result<Navigation, ToolError> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(format!("navigate:{url}"));
        if let Some(err) = st.navigation_error.clone() {
            return Err(err);
        }
        Ok(Navigation {
            current_url: url.to_string(),
            status_code: Some(200),
            title: Some("fixture".into()),
        })
    }

    async fn click(&mut self, selector: &str) -> std::result::Result<(), ToolError> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(format!("click:{selector}"));
        if st.next_selector.as_deref() == Some(selector) {
            if st.current + 1 < st.pages.len() {
                if st.next_advances {
                    st.current += 1;
                }
                return Ok(());
            }
            return Err(ToolError::new(
                ErrorCode::ElementNotVisible,
                format!("'{selector}' is hidden on the last page"),
            ));
        }
        if st.accepted.contains(selector) {
            return Ok(());
        }
        Err(ToolError::new(
            ErrorCode::ElementNotFound,
            format!("No element matches selector '{selector}'."),
        ))
    }

    async fn fill(&mut self, selector: &str, value: &str) -> std::result::Result<(), ToolError> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(format!("fill:{selector}={value}"));
        if st.accepted.contains(selector) {
            Ok(())
        } else {
            Err(ToolError::new(
                ErrorCode::ElementNotFound,
                format!("No element matches selector '{selector}'."),
            ))
        }
    }

    async fn rendered_markup(&mut self) -> std::result::Result<String, ToolError> {
        let mut st = self.state.lock().unwrap();
        st.calls.push("markup".to_string());
        if st.markup_error_on_page == Some(st.current) {
            return Err(ToolError::internal("renderer crashed"));
        }
        st.pages
            .get(st.current)
            .cloned()
            .ok_or_else(|| ToolError::internal("no page loaded"))
    }

    async fn close(&mut self) -> std::result::Result<(), ToolError> {
        let mut st = self.state.lock().unwrap();
        st.calls.push("close".to_string());
        st.closed = true;
        Ok(())
    }
}
