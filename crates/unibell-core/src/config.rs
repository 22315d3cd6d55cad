//! Unibell configuration system.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, UnibellError};
use crate::types::NotifyOffset;

/// Environment variable that overrides `telegram.bot_token`.
pub const TELEGRAM_TOKEN_ENV: &str = "UNIBELL_TELEGRAM_TOKEN";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnibellConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

impl UnibellConfig {
    /// Load config from the default path (~/.unibell/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            let mut config = Self::default();
            config.apply_env();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| UnibellError::Config(format!("Failed to read config: {e}")))?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| UnibellError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Unibell home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".unibell")
    }

    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(TELEGRAM_TOKEN_ENV)
            && !token.is_empty()
        {
            self.telegram.bot_token = token;
        }
    }

    /// Fail fast on values that would otherwise blow up at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(UnibellError::Config("api.base_url must not be empty".into()));
        }
        if self.api.timeout_secs == 0 {
            return Err(UnibellError::Config("api.timeout_secs must be positive".into()));
        }
        if self.cache.ttl_secs == 0 {
            return Err(UnibellError::Config("cache.ttl_secs must be positive".into()));
        }
        self.notify.parsed_offsets()?;
        if !self.notify.templates.contains_key(&self.notify.default_language) {
            return Err(UnibellError::Config(format!(
                "notify.default_language '{}' has no templates",
                self.notify.default_language
            )));
        }
        for (lang, templates) in &self.notify.templates {
            templates
                .validate()
                .map_err(|e| UnibellError::Config(format!("notify.templates.{lang}: {e}")))?;
        }
        Ok(())
    }
}

/// Remote timetable API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Applied to every remote call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String { "http://127.0.0.1:8080/api".into() }
fn default_timeout_secs() -> u64 { 10 }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Local persistence and freshness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Maximum age before a cached item is refreshed.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_db_path() -> String { "~/.unibell/cache.db".into() }
fn default_ttl_secs() -> u64 { 3600 }

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn resolved_db_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.db_path).to_string())
    }
}

/// Lesson notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_offsets")]
    pub offsets: Vec<String>,
    /// Fixed UTC offset for wall-clock times. System local time when unset.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
    /// Substring marking placeholder lessons that must not trigger notifications.
    #[serde(default = "default_hidden_marker")]
    pub hidden_lesson_marker: String,
    #[serde(default = "default_language")]
    pub default_language: String,
    #[serde(default = "default_templates")]
    pub templates: BTreeMap<String, LanguageTemplates>,
}

fn bool_true() -> bool { true }
fn default_offsets() -> Vec<String> { vec!["15m".into(), "1m".into()] }
fn default_hidden_marker() -> String { "[hidden]".into() }
fn default_language() -> String { "en".into() }

fn default_templates() -> BTreeMap<String, LanguageTemplates> {
    let mut templates = BTreeMap::new();
    templates.insert("en".to_string(), LanguageTemplates::english());
    templates.insert("ru".to_string(), LanguageTemplates::russian());
    templates
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            offsets: default_offsets(),
            utc_offset_minutes: None,
            hidden_lesson_marker: default_hidden_marker(),
            default_language: default_language(),
            templates: default_templates(),
        }
    }
}

impl NotifyConfig {
    /// Offsets as the closed enum, deduplicated in declaration order.
    pub fn parsed_offsets(&self) -> Result<Vec<NotifyOffset>> {
        let mut parsed: Vec<NotifyOffset> = Vec::new();
        for raw in &self.offsets {
            let offset: NotifyOffset = raw.parse()?;
            if !parsed.contains(&offset) {
                parsed.push(offset);
            }
        }
        if parsed.is_empty() {
            return Err(UnibellError::Config("notify.offsets must not be empty".into()));
        }
        Ok(parsed)
    }

    /// Templates for a language, falling back to the default language.
    pub fn templates_for(&self, language_code: &str) -> Option<&LanguageTemplates> {
        self.templates
            .get(language_code)
            .or_else(|| self.templates.get(&self.default_language))
    }
}

/// Per-language message templates.
///
/// Placeholders: `{minutes}` in `header`; `{number}`, `{start}`, `{end}`,
/// `{discipline}` and `{teachers}` in `lesson_line`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageTemplates {
    pub header: String,
    pub lesson_line: String,
    #[serde(default = "default_teacher_separator")]
    pub teacher_separator: String,
    #[serde(default)]
    pub footer: String,
}

fn default_teacher_separator() -> String { ", ".into() }

impl LanguageTemplates {
    pub fn english() -> Self {
        Self {
            header: "🔔 Class starts in {minutes} min".into(),
            lesson_line: "{number}. {start}–{end} {discipline} ({teachers})".into(),
            teacher_separator: default_teacher_separator(),
            footer: String::new(),
        }
    }

    pub fn russian() -> Self {
        Self {
            header: "🔔 Пара начнётся через {minutes} мин".into(),
            lesson_line: "{number}. {start}–{end} {discipline} ({teachers})".into(),
            teacher_separator: default_teacher_separator(),
            footer: String::new(),
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if !self.header.contains("{minutes}") {
            return Err("header is missing the {minutes} placeholder".into());
        }
        for required in ["{number}", "{discipline}"] {
            if !self.lesson_line.contains(required) {
                return Err(format!("lesson_line is missing the {required} placeholder"));
            }
        }
        Ok(())
    }
}

/// Telegram transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Chat that receives diagnostics about unexpected dispatch failures.
    #[serde(default)]
    pub operator_chat_id: Option<i64>,
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
}

fn default_telegram_api_url() -> String { "https://api.telegram.org".into() }

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            operator_chat_id: None,
            api_url: default_telegram_api_url(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = UnibellConfig::default();
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.cache.ttl_secs, 3600);
        assert!(config.notify.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [api]
            base_url = "https://timetable.example.edu/api"
            timeout_secs = 5

            [cache]
            ttl_secs = 600

            [notify]
            offsets = ["1m"]
            utc_offset_minutes = 180

            [telegram]
            bot_token = "123:abc"
            operator_chat_id = -100500
        "#;

        let config = UnibellConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.api.base_url, "https://timetable.example.edu/api");
        assert_eq!(config.cache.ttl_secs, 600);
        assert_eq!(config.notify.parsed_offsets().unwrap(), vec![NotifyOffset::OneMinute]);
        assert_eq!(config.notify.utc_offset_minutes, Some(180));
        assert_eq!(config.telegram.operator_chat_id, Some(-100500));
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config = UnibellConfig::from_toml("").unwrap();
        assert_eq!(config.telegram.api_url, "https://api.telegram.org");
        assert_eq!(config.notify.parsed_offsets().unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_offset_rejected() {
        let err = UnibellConfig::from_toml("[notify]\noffsets = [\"30m\"]").unwrap_err();
        assert!(err.to_string().contains("30m"));
    }

    #[test]
    fn test_template_without_placeholder_rejected() {
        let toml_str = r#"
            [notify.templates.en]
            header = "Class soon"
            lesson_line = "{number}. {discipline}"
        "#;
        let err = UnibellConfig::from_toml(toml_str).unwrap_err();
        assert!(err.to_string().contains("{minutes}"));
    }

    #[test]
    fn test_templates_fallback_language() {
        let notify = NotifyConfig::default();
        assert_eq!(notify.templates_for("de"), notify.templates.get("en"));
        assert_eq!(notify.templates_for("ru"), Some(&LanguageTemplates::russian()));
    }

    #[test]
    fn test_home_dir() {
        let home = UnibellConfig::home_dir();
        assert!(home.to_string_lossy().contains("unibell"));
    }
}
