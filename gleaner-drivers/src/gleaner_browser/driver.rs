use crate::gleaner_browser::capability::{BrowserCapabilities, ErrorCode, Navigation, ToolError};
use anyhow::Result;
use async_trait::async_trait;
use fantoccini::{elements::Element, Client, ClientBuilder, Locator};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use url::Url;
use webdriver::capabilities::Capabilities;

const VISIBILITY_POLL: Duration = Duration::from_millis(100);
const SCROLL_INTO_VIEW_JS: &str =
    "arguments[0].scrollIntoView({block: 'center', inline: 'nearest'});";

/// Connection settings for a WebDriver-backed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverOptions {
    /// WebDriver endpoint (Chromedriver defaults to port 9515).
    pub webdriver_url: String,
    pub headless: bool,
    pub navigation_timeout_ms: u64,
    /// How long `click`/`fill` wait for a matched element to become visible.
    pub visibility_timeout_ms: u64,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            navigation_timeout_ms: 30_000,
            visibility_timeout_ms: 5_000,
        }
    }
}

/// One browser session driven through `fantoccini`.
pub struct WebDriverSession {
    client: Client,
    options: DriverOptions,
}

impl WebDriverSession {
    /// Open a new session against a running WebDriver service.
    pub async fn connect(options: DriverOptions) -> Result<Self> {
        let mut args = vec![
            json!("--disable-dev-shm-usage"),
            json!("--no-sandbox"),
            json!("--window-size=1440,900"),
        ];
        if options.headless {
            args.push(json!("--headless=new"));
            args.push(json!("--disable-gpu"));
        }

        let mut chrome_opts = HashMap::new();
        chrome_opts.insert("args".to_string(), json!(args));
        let mut caps = Capabilities::new();
        caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&options.webdriver_url)
            .await?;

        tracing::info!(
            webdriver_url = %options.webdriver_url,
            headless = options.headless,
            "browser.session.open"
        );
        Ok(Self { client, options })
    }

    async fn first_match(&self, selector: &str) -> Result<Element, ToolError> {
        let matches = self
            .client
            .find_all(Locator::Css(selector))
            .await
            .map_err(|e| {
                ToolError::internal(format!("selector lookup for '{selector}' failed: {e}"))
            })?;
        matches.into_iter().next().ok_or_else(|| {
            ToolError::new(
                ErrorCode::ElementNotFound,
                format!("No element matches selector '{selector}'."),
            )
        })
    }

    async fn scroll_into_view(&self, element: &Element) {
        let arg = match serde_json::to_value(element) {
            Ok(v) => v,
            Err(_) => return,
        };
        if let Err(e) = self.client.execute(SCROLL_INTO_VIEW_JS, vec![arg]).await {
            tracing::debug!(error = %e, "browser.scroll_into_view.failed");
        }
    }

    async fn wait_visible(&self, element: &Element, selector: &str) -> Result<(), ToolError> {
        let deadline = Instant::now() + Duration::from_millis(self.options.visibility_timeout_ms);
        loop {
            if element.is_displayed().await.unwrap_or(false) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ToolError::new(
                    ErrorCode::ElementNotVisible,
                    format!("Element '{selector}' never became visible."),
                ));
            }
            sleep(VISIBILITY_POLL).await;
        }
    }

    /// Locate, reveal and wait for the element a click or fill targets.
    async fn prepare(&self, selector: &str) -> Result<Element, ToolError> {
        let element = self.first_match(selector).await?;
        self.scroll_into_view(&element).await;
        self.wait_visible(&element, selector).await?;
        Ok(element)
    }
}

#[async_trait]
impl BrowserCapabilities for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<Navigation, ToolError> {
        let parsed = Url::parse(url)
            .map_err(|e| ToolError::new(ErrorCode::InvalidUrl, format!("'{url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ToolError::new(
                ErrorCode::InvalidUrl,
                format!("Only http(s) URLs are supported (got {}).", parsed.scheme()),
            ));
        }

        let limit = Duration::from_millis(self.options.navigation_timeout_ms);
        match timeout(limit, self.client.goto(parsed.as_str())).await {
            Err(_) => {
                return Err(ToolError::new(
                    ErrorCode::NavigationTimeout,
                    format!("Navigation to {url} timed out."),
                ))
            }
            Ok(Err(e)) => {
                return Err(ToolError::new(
                    ErrorCode::NetworkError,
                    format!("Navigation failed for {url}: {e}"),
                ))
            }
            Ok(Ok(())) => {}
        }

        let current_url = self
            .client
            .current_url()
            .await
            .map(|u| u.to_string())
            .unwrap_or_else(|_| parsed.to_string());
        let title = self.client.title().await.ok();

        tracing::debug!(%current_url, ?title, "browser.navigate");
        Ok(Navigation {
            current_url,
            status_code: None,
            title,
        })
    }

    async fn click(&mut self, selector: &str) -> Result<(), ToolError> {
        let element = self.prepare(selector).await?;

        if !element.is_enabled().await.unwrap_or(true) {
            return Err(ToolError::new(
                ErrorCode::ElementNotClickable,
                format!("Element '{selector}' is disabled."),
            ));
        }

        element.click().await.map_err(|e| {
            ToolError::new(
                ErrorCode::ElementNotClickable,
                format!("Element '{selector}' was not clickable: {e}"),
            )
        })?;
        tracing::debug!(%selector, "browser.click");
        Ok(())
    }

    async fn fill(&mut self, selector: &str, value: &str) -> Result<(), ToolError> {
        let element = self.prepare(selector).await?;

        let disabled = !element.is_enabled().await.unwrap_or(true);
        let readonly = element.attr("readonly").await.ok().flatten().is_some();
        if disabled || readonly {
            return Err(ToolError::new(
                ErrorCode::ElementNotEditable,
                format!("Element '{selector}' is not editable."),
            ));
        }

        element.clear().await.map_err(|e| {
            ToolError::new(
                ErrorCode::ElementNotEditable,
                format!("Clearing '{selector}' failed: {e}"),
            )
        })?;
        element.send_keys(value).await.map_err(|e| {
            ToolError::new(
                ErrorCode::ElementNotEditable,
                format!("Typing into '{selector}' failed: {e}"),
            )
        })?;
        tracing::debug!(%selector, value_len = value.len(), "browser.fill");
        Ok(())
    }

    async fn rendered_markup(&mut self) -> Result<String, ToolError> {
        self.client
            .source()
            .await
            .map_err(|e| ToolError::internal(format!("reading page source failed: {e}")))
    }

    async fn close(&mut self) -> Result<(), ToolError> {
        self.client
            .clone()
            .close()
            .await
            .map_err(|e| ToolError::internal(format!("closing session failed: {e}")))?;
        tracing::info!("browser.session.closed");
        Ok(())
    }
}
