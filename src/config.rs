//! Configuration management for comfy-notes.
//!
//! Handles loading, patching, saving, and validating the TOML settings
//! store kept in the platform-specific config directory.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Application name used for config directory.
const APP_NAME: &str = "ComfyNotes";

/// Default config filename.
const CONFIG_FILENAME: &str = "config.toml";

/// Placeholder value for unconfigured API keys.
pub const API_KEY_PLACEHOLDER: &str = "YOUR_OPENROUTER_API_KEY_HERE";

/// Sentinel source language asking for detection from content.
pub const AUTO_LANGUAGE: &str = "auto";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat-completion API used by the AI backend.
    pub api: ApiConfig,

    /// Free web translator endpoint.
    pub google: GoogleConfig,

    /// Source and target languages.
    pub languages: LanguageConfig,

    /// Translation behavior settings.
    pub translation: TranslationConfig,
}

/// API configuration for the OpenAI-compatible endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API key (required for the AI backend).
    pub key: String,

    /// Base URL for the API.
    pub base_url: String,

    /// Model identifier.
    pub model: String,

    /// Optional `HTTP-Referer` header (OpenRouter app attribution).
    pub http_referer: String,

    /// Optional `X-Title` header (OpenRouter app attribution).
    pub x_title: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: API_KEY_PLACEHOLDER.to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "mistralai/mistral-7b-instruct".to_string(),
            http_referer: String::new(),
            x_title: String::new(),
        }
    }
}

impl ApiConfig {
    /// Checks if the API key is configured (not placeholder).
    pub fn is_configured(&self) -> bool {
        let key = self.key.trim();
        !key.is_empty() && key != API_KEY_PLACEHOLDER
    }
}

/// Free web translator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// Base URL of the `translate_a/single` endpoint.
    pub base_url: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://translate.googleapis.com".to_string(),
        }
    }
}

/// Language pair configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Source language code, or `auto`.
    pub source: String,

    /// Target language code.
    pub target: String,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            source: "en".to_string(),
            target: "es".to_string(),
        }
    }
}

impl LanguageConfig {
    /// Returns true if the source language should be detected.
    pub fn is_auto(&self) -> bool {
        self.source.trim().eq_ignore_ascii_case(AUTO_LANGUAGE)
    }

    /// Returns true if source and target are the same explicit language.
    pub fn is_same_language(&self) -> bool {
        !self.is_auto() && same_language(&self.source, &self.target)
    }
}

/// Compares two language codes, ignoring case and surrounding whitespace.
pub fn same_language(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Which translation backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Free Google web translator.
    #[default]
    Google,
    /// OpenAI-compatible chat completion.
    Ai,
}

impl BackendKind {
    /// Tag used in output filenames.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Ai => "ai",
        }
    }

    /// Interprets an interactive menu answer; an empty answer picks `default`.
    ///
    /// Returns `None` for anything that names no backend.
    pub fn from_answer(answer: &str, default: BackendKind) -> Option<BackendKind> {
        if answer.trim().is_empty() {
            return Some(default);
        }
        answer.parse().ok()
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google" | "1" => Ok(Self::Google),
            "ai" | "openrouter" | "2" => Ok(Self::Ai),
            other => Err(format!("unknown backend '{}' (expected google or ai)", other)),
        }
    }
}

/// Translation behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// Default backend when none is chosen on the command line.
    pub backend: BackendKind,

    /// Sampling temperature for the AI backend.
    pub temperature: f64,

    /// AI results shorter than this fraction of the input are rejected.
    pub min_length_ratio: f64,

    /// Inputs at or below this many characters skip the length check.
    pub min_checked_length: usize,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Google,
            temperature: 0.2,
            min_length_ratio: 0.3,
            min_checked_length: 50,
        }
    }
}

/// Adds every key of `defaults` missing from `target`, recursing into tables.
///
/// Existing values are never touched. Returns true if anything was added.
pub fn merge_missing(target: &mut toml::Table, defaults: &toml::Table) -> bool {
    let mut changed = false;

    for (key, default_value) in defaults {
        match target.get_mut(key) {
            None => {
                target.insert(key.clone(), default_value.clone());
                changed = true;
            }
            Some(toml::Value::Table(existing)) => {
                if let toml::Value::Table(default_table) = default_value {
                    changed |= merge_missing(existing, default_table);
                }
            }
            Some(_) => {}
        }
    }

    changed
}

impl Config {
    /// Returns the platform-specific config directory path.
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join(APP_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Returns the full path to the config file.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join(CONFIG_FILENAME))
    }

    /// Loads configuration from the default location.
    pub fn load() -> Result<LoadedConfig, ConfigError> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Loads configuration from a specific path.
    ///
    /// A missing file is created with defaults. An existing file gets any
    /// missing keys added and is rewritten only if something was added.
    pub fn load_from(path: &Path) -> Result<LoadedConfig, ConfigError> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            return Ok(LoadedConfig {
                config,
                status: ConfigStatus::Created,
            });
        }

        let content = std::fs::read_to_string(path)?;
        let mut table: toml::Table =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        let changed = merge_missing(&mut table, &Self::default_table()?);
        if changed {
            let content = toml::to_string_pretty(&table)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            std::fs::write(path, content)?;
        }

        let config: Config = toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError(e.to_string()))?;

        let status = if changed {
            ConfigStatus::Patched
        } else {
            ConfigStatus::Unchanged
        };
        Ok(LoadedConfig { config, status })
    }

    /// Default configuration as a TOML table.
    fn default_table() -> Result<toml::Table, ConfigError> {
        match toml::Value::try_from(Config::default()) {
            Ok(toml::Value::Table(table)) => Ok(table),
            Ok(_) => Err(ConfigError::ParseError(
                "default config did not serialize to a table".to_string(),
            )),
            Err(e) => Err(ConfigError::ParseError(e.to_string())),
        }
    }

    /// Saves configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.languages.target.trim().is_empty() {
            return Err(ConfigError::MissingValue("languages.target".to_string()));
        }

        if self.languages.target.trim().eq_ignore_ascii_case(AUTO_LANGUAGE) {
            return Err(ConfigError::InvalidValue {
                key: "languages.target".to_string(),
                message: "target language cannot be 'auto'".to_string(),
            });
        }

        if self.languages.source.trim().is_empty() {
            return Err(ConfigError::MissingValue(
                "languages.source (use a language code or 'auto')".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.translation.temperature) {
            return Err(ConfigError::InvalidValue {
                key: "translation.temperature".to_string(),
                message: "must be between 0.0 and 2.0".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.translation.min_length_ratio) {
            return Err(ConfigError::InvalidValue {
                key: "translation.min_length_ratio".to_string(),
                message: "must be between 0.0 and 1.0".to_string(),
            });
        }

        Ok(())
    }
}

/// What loading did to the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStatus {
    /// The file did not exist and was written with defaults.
    Created,
    /// Missing keys were added to an existing file.
    Patched,
    /// The file was complete.
    Unchanged,
}

/// A configuration together with its load status.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub status: ConfigStatus,
}
