//! Configuration loading, validation, and management for lorebot.
//!
//! Loads configuration from `~/.lorebot/config.toml` (or an explicit path)
//! with environment variable overrides. Everything is validated once at
//! startup so a bad deployment fails before the first message arrives.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding `telegram.access_token`.
pub const ENV_TELEGRAM_TOKEN: &str = "LOREBOT_TELEGRAM_TOKEN";
/// Environment variable overriding `openai.api_key`.
pub const ENV_API_KEY: &str = "LOREBOT_OPENAI_API_KEY";
/// Environment variable overriding `openai.model_name`.
pub const ENV_MODEL: &str = "LOREBOT_MODEL";

/// The root configuration structure.
///
/// Maps directly to `~/.lorebot/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Messaging platform settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Completion service settings
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Locations of the template and knowledge files
    #[serde(default)]
    pub templates: TemplatesConfig,

    /// Bot behavior
    #[serde(default)]
    pub bot: BotConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &str) -> &'static str {
    if s.is_empty() { "None" } else { "[REDACTED]" }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token from @BotFather
    #[serde(default)]
    pub access_token: String,

    /// Allowlist of sender IDs. Empty = deny all. ["*"] = allow all.
    #[serde(default = "default_allowed_users")]
    pub allowed_users: Vec<String>,

    /// Long-polling timeout passed to `getUpdates`
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Bot API base URL
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
}

fn default_allowed_users() -> Vec<String> {
    vec!["*".into()]
}
fn default_poll_timeout() -> u64 {
    30
}
fn default_telegram_api_base() -> String {
    "https://api.telegram.org".into()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            allowed_users: default_allowed_users(),
            poll_timeout_secs: default_poll_timeout(),
            api_base: default_telegram_api_base(),
        }
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("access_token", &redact(&self.access_token))
            .field("allowed_users", &self.allowed_users)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Which wire dialect the completion endpoint speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFlavor {
    /// `POST {base_url}/chat/completions` with a bearer token
    #[default]
    OpenAi,
    /// `POST {base_url}/deployments/{model}/chat/completions?api-version=`
    /// with an `api-key` header
    Azure,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub model_name: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub flavor: ProviderFlavor,

    /// Required when `flavor = "azure"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// HTTP timeout for a single completion call
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_timeout() -> u64 {
    120
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model_name: String::new(),
            base_url: default_base_url(),
            flavor: ProviderFlavor::default(),
            api_version: None,
            temperature: None,
            max_tokens: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &redact(&self.api_key))
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .field("flavor", &self.flavor)
            .field("api_version", &self.api_version)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Instruction text prepended to every knowledge-augmented prompt
    #[serde(default = "default_query_template")]
    pub query: PathBuf,

    /// System prompt used to summarise uploaded documents
    #[serde(default = "default_encapsulate_template")]
    pub encapsulate: PathBuf,

    /// Append-only knowledge log
    #[serde(default = "default_knowledge_file")]
    pub knowledge: PathBuf,
}

fn default_query_template() -> PathBuf {
    PathBuf::from("template/query.txt")
}
fn default_encapsulate_template() -> PathBuf {
    PathBuf::from("template/encapsulate.txt")
}
fn default_knowledge_file() -> PathBuf {
    PathBuf::from("template/knowledge.txt")
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            query: default_query_template(),
            encapsulate: default_encapsulate_template(),
            knowledge: default_knowledge_file(),
        }
    }
}

impl TemplatesConfig {
    /// Resolve relative paths against `base`.
    fn resolve_against(&mut self, base: &Path) {
        for path in [&mut self.query, &mut self.encapsulate, &mut self.knowledge] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// How plain text messages are answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotMode {
    /// Template + knowledge store as system prompt, labelled user question
    #[default]
    Knowledge,
    /// Relay the user text alone
    Direct,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub mode: BotMode,

    /// Prefix placed before the user's text in knowledge mode
    #[serde(default = "default_question_label")]
    pub question_label: String,

    /// Document extensions accepted for ingestion (without the dot)
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Reply to `/start`; a built-in greeting is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greeting: Option<String>,

    /// Reply to `/help`; a built-in text is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

fn default_question_label() -> String {
    "\nHere is the question from the user:\n".into()
}
fn default_allowed_extensions() -> Vec<String> {
    vec!["txt".into(), "md".into()]
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            mode: BotMode::default(),
            question_label: default_question_label(),
            allowed_extensions: default_allowed_extensions(),
            greeting: None,
            help: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, or from `~/.lorebot/config.toml`.
    ///
    /// Environment variables override file values:
    /// - `LOREBOT_TELEGRAM_TOKEN`
    /// - `LOREBOT_OPENAI_API_KEY` (then `OPENAI_API_KEY`)
    /// - `LOREBOT_MODEL`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_path);
        Self::load_with_env(&path, |key| std::env::var(key).ok())
    }

    /// Load from `path` with a custom environment lookup.
    pub fn load_with_env(
        path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_env(env);
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without env overrides or validation.
    ///
    /// A missing file yields defaults; relative template paths are resolved
    /// against the file's directory.
    pub fn read_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.templates.resolve_against(base);
        }

        Ok(config)
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty(ENV_TELEGRAM_TOKEN) {
            self.telegram.access_token = token;
        }
        if let Some(key) = non_empty(ENV_API_KEY) {
            self.openai.api_key = key;
        } else if self.openai.api_key.is_empty() {
            if let Some(key) = non_empty("OPENAI_API_KEY") {
                self.openai.api_key = key;
            }
        }
        if let Some(model) = non_empty(ENV_MODEL) {
            self.openai.model_name = model;
        }
    }

    /// Canonicalise extension spellings: `.TXT` and `txt` are the same.
    fn normalize(&mut self) {
        for ext in &mut self.bot.allowed_extensions {
            *ext = ext.trim().trim_start_matches('.').to_lowercase();
        }
        let mut seen: Vec<String> = Vec::new();
        self.bot.allowed_extensions.retain(|e| {
            if e.is_empty() || seen.contains(e) {
                return false;
            }
            seen.push(e.clone());
            true
        });
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.openai.api_key.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "openai.api_key is required (or set {ENV_API_KEY})"
            )));
        }

        if self.openai.model_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "openai.model_name is required (or set {ENV_MODEL})"
            )));
        }

        if let Some(t) = self.openai.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(
                    "openai.temperature must be between 0.0 and 2.0".into(),
                ));
            }
        }

        if self.openai.flavor == ProviderFlavor::Azure
            && self
                .openai
                .api_version
                .as_deref()
                .is_none_or(|v| v.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(
                "openai.api_version is required when openai.flavor = \"azure\"".into(),
            ));
        }

        if self.openai.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "openai.timeout_secs must be > 0".into(),
            ));
        }

        if self.bot.allowed_extensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "bot.allowed_extensions must list at least one extension".into(),
            ));
        }

        Ok(())
    }

    /// Validate the settings only the Telegram poller needs.
    pub fn validate_telegram(&self) -> Result<(), ConfigError> {
        if self.telegram.access_token.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "telegram.access_token is required (or set {ENV_TELEGRAM_TOKEN})"
            )));
        }
        if self.telegram.allowed_users.is_empty() {
            tracing::warn!("telegram.allowed_users is empty; every sender will be ignored");
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".lorebot")
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Generate a starter config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let mut config = Self::default();
        config.openai.model_name = "gpt-4o-mini".into();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    const MINIMAL: &str = r#"
[telegram]
access_token = "123:abc"

[openai]
api_key = "sk-test"
model_name = "gpt-4o-mini"
"#;

    #[test]
    fn minimal_config_loads_with_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(tmp.path(), MINIMAL);

        let config = AppConfig::load_with_env(&path, no_env).unwrap();
        assert_eq!(config.openai.model_name, "gpt-4o-mini");
        assert_eq!(config.openai.flavor, ProviderFlavor::OpenAi);
        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
        assert_eq!(config.telegram.allowed_users, vec!["*"]);
        assert_eq!(config.bot.mode, BotMode::Knowledge);
        assert_eq!(config.bot.allowed_extensions, vec!["txt", "md"]);
        assert!(config.validate_telegram().is_ok());
    }

    #[test]
    fn relative_template_paths_resolve_against_config_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            &format!("{MINIMAL}\n[templates]\nknowledge = \"kb/log.txt\"\nquery = \"/abs/query.txt\"\n"),
        );

        let config = AppConfig::load_with_env(&path, no_env).unwrap();
        assert_eq!(config.templates.knowledge, tmp.path().join("kb/log.txt"));
        assert_eq!(config.templates.query, PathBuf::from("/abs/query.txt"));
        assert_eq!(
            config.templates.encapsulate,
            tmp.path().join("template/encapsulate.txt")
        );
    }

    #[test]
    fn missing_api_key_fails_fast() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(tmp.path(), "[openai]\nmodel_name = \"gpt-4o\"\n");

        let err = AppConfig::load_with_env(&path, no_env).unwrap_err();
        assert!(err.to_string().contains("openai.api_key"));
    }

    #[test]
    fn missing_model_fails_fast() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(tmp.path(), "[openai]\napi_key = \"sk\"\n");

        let err = AppConfig::load_with_env(&path, no_env).unwrap_err();
        assert!(err.to_string().contains("openai.model_name"));
    }

    #[test]
    fn env_overrides_file_values() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(tmp.path(), MINIMAL);
        let env: HashMap<&str, &str> = [
            (ENV_TELEGRAM_TOKEN, "999:zzz"),
            (ENV_API_KEY, "sk-env"),
            (ENV_MODEL, "gpt-4o"),
        ]
        .into_iter()
        .collect();

        let config =
            AppConfig::load_with_env(&path, |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.telegram.access_token, "999:zzz");
        assert_eq!(config.openai.api_key, "sk-env");
        assert_eq!(config.openai.model_name, "gpt-4o");
    }

    #[test]
    fn generic_openai_key_only_fills_a_gap() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(tmp.path(), MINIMAL);
        let config = AppConfig::load_with_env(&path, |k| {
            (k == "OPENAI_API_KEY").then(|| "sk-generic".to_string())
        })
        .unwrap();
        assert_eq!(config.openai.api_key, "sk-test");

        let path = write_config(tmp.path(), "[openai]\nmodel_name = \"m\"\n");
        let config = AppConfig::load_with_env(&path, |k| {
            (k == "OPENAI_API_KEY").then(|| "sk-generic".to_string())
        })
        .unwrap();
        assert_eq!(config.openai.api_key, "sk-generic");
    }

    #[test]
    fn missing_config_file_uses_defaults_then_env() {
        let config = AppConfig::load_with_env(Path::new("/nonexistent/config.toml"), |k| match k {
            ENV_API_KEY => Some("sk".into()),
            ENV_MODEL => Some("m".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.templates.query, PathBuf::from("template/query.txt"));
        assert!(config.validate_telegram().is_err());
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.openai.api_key = "sk".into();
        config.openai.model_name = "m".into();
        config.openai.temperature = Some(5.0);
        assert!(config.validate().is_err());

        config.openai.temperature = Some(0.3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn azure_requires_api_version() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            "[openai]\napi_key = \"k\"\nmodel_name = \"gpt-35\"\nflavor = \"azure\"\n",
        );
        let err = AppConfig::load_with_env(&path, no_env).unwrap_err();
        assert!(err.to_string().contains("api_version"));

        let path = write_config(
            tmp.path(),
            "[openai]\napi_key = \"k\"\nmodel_name = \"gpt-35\"\nflavor = \"azure\"\napi_version = \"2024-02-01\"\n",
        );
        let config = AppConfig::load_with_env(&path, no_env).unwrap();
        assert_eq!(config.openai.flavor, ProviderFlavor::Azure);
    }

    #[test]
    fn extensions_are_normalized() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            &format!("{MINIMAL}\n[bot]\nallowed_extensions = [\".TXT\", \"md\", \" Rst \"]\n"),
        );
        let config = AppConfig::load_with_env(&path, no_env).unwrap();
        assert_eq!(config.bot.allowed_extensions, vec!["txt", "md", "rst"]);
    }

    #[test]
    fn empty_extension_list_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(
            tmp.path(),
            &format!("{MINIMAL}\n[bot]\nallowed_extensions = [\".\"]\n"),
        );
        assert!(AppConfig::load_with_env(&path, no_env).is_err());
    }

    #[test]
    fn unparseable_file_reports_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_config(tmp.path(), "[openai\napi_key = ");
        let err = AppConfig::load_with_env(&path, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = AppConfig::default();
        config.telegram.access_token = "123:secret-token".into();
        config.openai.api_key = "sk-very-secret".into();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-token"));
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_roundtrips() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4o-mini"));
        assert!(toml_str.contains("api.telegram.org"));
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.bot.allowed_extensions, vec!["txt", "md"]);
    }
}
