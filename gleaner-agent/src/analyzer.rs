//! LLM-backed page analysis: markup + schema in, conformed items out.
use crate::error::ExtractionError;
use crate::schema::Schema;
use gleaner_llm::traits::LlmClient;
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_MARKUP_BUDGET: usize = 50_000;
pub const DEFAULT_EXTRACTION_MAX_TOKENS: u32 = 4096;

const SYSTEM_PROMPT: &str = "You are a web data extraction engine. \
You read HTML and return only JSON that follows the requested schema.";

pub struct PageAnalyzer {
    llm: Arc<dyn LlmClient + Send + Sync>,
    markup_budget: usize,
    max_tokens: u32,
}

impl PageAnalyzer {
    pub fn new(llm: Arc<dyn LlmClient + Send + Sync>) -> Self {
        Self {
            llm,
            markup_budget: DEFAULT_MARKUP_BUDGET,
            max_tokens: DEFAULT_EXTRACTION_MAX_TOKENS,
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

    /// Extract every repeating item in `markup` that matches `schema`.
    pub async fn analyze(
        &self,
        markup: &str,
        schema: &Schema,
    ) -> Result<Vec<Value>, ExtractionError> {
        let snippet = truncate_utf8(markup, self.markup_budget);
        let prompt = build_extraction_prompt(snippet, schema)?;

        tracing::debug!(
            markup_bytes = markup.len(),
            sent_bytes = snippet.len(),
            "analyzer.prompt"
        );

        let reply = self
            .llm
            .infer(&prompt, Some(SYSTEM_PROMPT), Some(self.max_tokens))
            .await?;

        let raw_items = parse_items(&reply)?;
        let item_schema = schema.item_schema();
        let items: Vec<Value> = raw_items.iter().map(|it| item_schema.conform(it)).collect();

        tracing::debug!(items = items.len(), "analyzer.parsed");
        Ok(items)
    }
}

/// Longest prefix of `s` that fits in `max_bytes` without splitting a char.
pub(crate) fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

pub(crate) fn build_extraction_prompt(
    markup: &str,
    schema: &Schema,
) -> Result<String, ExtractionError> {
    let schema_json = serde_json::to_string_pretty(schema.source())
        .map_err(|e| ExtractionError::Malformed(format!("schema not serializable: {e}")))?;

    Ok(format!(
        r#"Extract structured data from the HTML below according to the target schema.

TARGET SCHEMA:
{schema_json}

HTML CONTENT:
{markup}

INSTRUCTIONS:
1. Work out which elements hold each field of the schema.
2. Extract ALL repeating items that match the schema, not just the first one.
3. Convert every value to its declared type:
   - "string": the visible text content
   - "number": a plain number without currency symbols or thousands separators
   - "boolean": true or false, judged from the element's presence or text
   - "datetime": an ISO 8601 timestamp
   - nested objects and lists: extract their fields the same way
4. Use null for any field that cannot be found.

OUTPUT FORMAT:
Respond with a single JSON object of the form {{"items": [item1, item2, ...]}}.
No explanations, no markdown, no text outside the JSON."#
    ))
}

/// Pull the `items` array out of a model reply that may be fenced or
/// surrounded by prose.
pub(crate) fn parse_items(reply: &str) -> Result<Vec<Value>, ExtractionError> {
    let block = json_block(reply)
        .ok_or_else(|| ExtractionError::Malformed("no JSON object found".to_string()))?;

    let doc: Value = serde_json::from_str(block)
        .map_err(|e| ExtractionError::Malformed(format!("invalid JSON: {e}")))?;

    match doc {
        Value::Object(mut obj) => match obj.remove("items") {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(ExtractionError::Malformed(format!(
                "\"items\" is not an array (got {})",
                json_kind(&other)
            ))),
            None => Err(ExtractionError::Malformed(
                "response object has no \"items\" member".to_string(),
            )),
        },
        other => Err(ExtractionError::Malformed(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_block(reply: &str) -> Option<&str> {
    if let Some(inner) = fenced_block(reply) {
        if let (Some(start), Some(end)) = (inner.find('{'), inner.rfind('}')) {
            if start < end {
                return Some(&inner[start..=end]);
            }
        }
    }
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (start < end).then(|| &reply[start..=end])
}

/// Body of the first triple-backtick fence, language tag removed.
fn fenced_block(reply: &str) -> Option<&str> {
    let open = reply.find("```")?;
    let after = &reply[open + 3..];
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    let close = body.find("```")?;
    Some(&body[..close])
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
