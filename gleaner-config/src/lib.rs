//! Settings loader for the `gleaner` binary.
//!
//! Sources are merged in order (files, inline YAML, then `GLEANER__`-prefixed
//! environment variables with `__` as the nesting separator). After merging,
//! every `${VAR}` placeholder in a string value is expanded from the process
//! environment. Each section has defaults, so an empty document is valid.
use config::{Config, ConfigError, Environment, File};
use gleaner_common::LlmConfig;
use gleaner_common::observability::LogFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GleanerSettings {
    pub llm: LlmConfig,
    pub browser: BrowserSettings,
    pub agent: AgentSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub webdriver_url: String,
    pub headless: bool,
    pub navigation_timeout_ms: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".into(),
            headless: true,
            navigation_timeout_ms: 30_000,
        }
    }
}

/// Tuning knobs for the extraction loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Markup bytes sent to the extraction prompt.
    pub markup_budget_bytes: usize,
    /// Markup bytes sent to the pagination prompt.
    pub pagination_markup_budget_bytes: usize,
    pub extraction_max_tokens: u32,
    pub pagination_max_tokens: u32,
    /// Pause after clicking a next-page control.
    pub settle_ms: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            markup_budget_bytes: 50_000,
            pagination_markup_budget_bytes: 30_000,
            extraction_max_tokens: 4096,
            pagination_max_tokens: 256,
            settle_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub format: LogFormat,
    pub dir: Option<String>,
    pub stderr: bool,
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            dir: None,
            stderr: false,
            filter: "info".into(),
        }
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => break,
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder over the `config` crate wiring.
pub struct GleanerSettingsLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for GleanerSettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl GleanerSettingsLoader {
    /// ```
    /// use gleaner_config::GleanerSettingsLoader;
    ///
    /// let settings = GleanerSettingsLoader::new()
    ///     .with_yaml_str("agent:\n  settle_ms: 10")
    ///     .load()
    ///     .expect("valid settings");
    ///
    /// assert_eq!(settings.agent.settle_ms, 10);
    /// assert_eq!(settings.agent.markup_budget_bytes, 50_000);
    /// assert!(settings.browser.headless);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; the format follows the suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Merge the sources, expand `${VAR}` placeholders and deserialize.
    ///
    /// A missing `llm` section falls back to [`LlmConfig::default`] before
    /// expansion, so its `${OPENAI_API_KEY}` token is resolved as well.
    ///
    /// ```
    /// use gleaner_common::LlmConfig;
    /// use gleaner_config::GleanerSettingsLoader;
    ///
    /// unsafe { std::env::set_var("GLEANER_DOC_TOKEN", "injected-from-env"); }
    ///
    /// let settings = GleanerSettingsLoader::new()
    ///     .with_yaml_str(r#"
    /// llm:
    ///   provider: "openai"
    ///   model: "gpt-4o-mini"
    ///   auth_token: "${GLEANER_DOC_TOKEN}"
    /// "#)
    ///     .load()
    ///     .expect("valid settings");
    ///
    /// match settings.llm {
    ///     LlmConfig::Openai { model, auth_token, endpoint } => {
    ///         assert_eq!(model, "gpt-4o-mini");
    ///         assert_eq!(auth_token, "injected-from-env");
    ///         assert_eq!(endpoint, "https://api.openai.com/v1/");
    ///     }
    ///     other => panic!("expected OpenAI configuration, got {other:?}"),
    /// }
    ///
    /// unsafe { std::env::remove_var("GLEANER_DOC_TOKEN"); }
    /// ```
    pub fn load(self) -> Result<GleanerSettings, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("GLEANER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        if v.is_null() {
            v = Value::Object(Default::default());
        }
        if let Value::Object(map) = &mut v {
            if !map.contains_key("llm") {
                let llm = serde_json::to_value(LlmConfig::default())
                    .map_err(|e| ConfigError::Message(e.to_string()))?;
                map.insert("llm".to_string(), llm);
            }
        }
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
