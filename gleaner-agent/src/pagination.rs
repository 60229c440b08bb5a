use crate::analyzer::truncate_utf8;
use gleaner_common::Result;
use gleaner_llm::traits::LlmClient;
use std::sync::Arc;

pub const DEFAULT_PAGINATION_MARKUP_BUDGET: usize = 30_000;
pub const DEFAULT_PAGINATION_MAX_TOKENS: u32 = 256;

/// Literal the model answers with when there is no further page.
pub const NO_PAGINATION: &str = "NO_PAGINATION";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    Selector(String),
    Exhausted,
}

pub struct PaginationDetector {
    llm: Arc<dyn LlmClient + Send + Sync>,
    markup_budget: usize,
    max_tokens: u32,
}

impl PaginationDetector {
    pub fn new(llm: Arc<dyn LlmClient + Send + Sync>) -> Self {
        Self {
            llm,
            markup_budget: DEFAULT_PAGINATION_MARKUP_BUDGET,
            max_tokens: DEFAULT_PAGINATION_MAX_TOKENS,
        }
    }

    pub fn with_markup_budget(mut self, bytes: usize) -> Self {
        self.markup_budget = bytes;
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }

    /// Ask the model for a selector of an enabled "next page" control.
    pub async fn detect_next(&self, markup: &str) -> Result<NextPage> {
        let prompt = build_pagination_prompt(truncate_utf8(markup, self.markup_budget));
        let reply = self.llm.infer(&prompt, None, Some(self.max_tokens)).await?;
        let next = interpret_reply(&reply);
        tracing::debug!(raw = %reply.trim(), ?next, "pagination.reply");
        Ok(next)
    }
}

fn build_pagination_prompt(markup: &str) -> String {
    format!(
        r##"Find the CSS selector of the control that leads to the NEXT page of results in this HTML.

HTML:
{markup}

RULES:
1. Look for the usual pagination patterns: "Next", "Suivant", "Weiter", "→", "»", numbered page links.
2. The control MUST be active. Skip anything that is disabled, for example:
   - classes such as "disabled", "inactive" or "current"
   - attributes disabled or aria-disabled="true"
   - links with no href or with href="#"
   - the link for the page currently shown
3. Prefer a selector that matches ONLY the active next control:
   - good: li.next:not(.disabled) a, a.next-page[href], .pagination-next:not([disabled])
   - bad: .next, a[rel="next"]
4. Answer with the selector alone: no backticks, no markdown, no explanation.
5. If there is no active next control (for example on the last page), answer exactly: {NO_PAGINATION}"##
    )
}

/// Normalise the model's answer into a selector or the end marker.
pub(crate) fn interpret_reply(reply: &str) -> NextPage {
    let selector = clean_selector(reply);
    if selector.is_empty() || selector.eq_ignore_ascii_case(NO_PAGINATION) {
        NextPage::Exhausted
    } else {
        NextPage::Selector(selector.to_string())
    }
}

fn clean_selector(reply: &str) -> &str {
    let mut s = reply.trim();

    if let Some(rest) = s.strip_prefix("```") {
        // Drop an optional language tag on the opening line, or before the
        // selector when the whole fence sits on one line.
        s = match rest.find('\n') {
            Some(nl) => &rest[nl + 1..],
            None => strip_language_tag(rest),
        };
        s = s.trim_end();
        s = s.strip_suffix("```").unwrap_or(s);
        s = s.trim();
    }

    loop {
        let stripped = strip_pair(s, '`')
            .or_else(|| strip_pair(s, '"'))
            .or_else(|| strip_pair(s, '\''));
        match stripped {
            Some(inner) => s = inner.trim(),
            None => return s,
        }
    }
}

fn strip_language_tag(s: &str) -> &str {
    match s.split_once(char::is_whitespace) {
        Some((tag, rest)) if FENCE_TAGS.contains(&tag.to_ascii_lowercase().as_str()) => rest,
        _ => s,
    }
}

const FENCE_TAGS: &[&str] = &["css", "html", "text", "plaintext", "selector"];

fn strip_pair(s: &str, quote: char) -> Option<&str> {
    s.strip_prefix(quote)?.strip_suffix(quote)
}
