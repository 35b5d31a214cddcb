//! Configuration loading and validation.
//!
//! The configuration lives in `~/.selector/config.json` unless a path is
//! given explicitly. A missing file means defaults; a malformed file is an
//! error, since falling back would silently drop configured sources.

use fs_err as fs;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cookie::{RememberSettings, DEFAULT_COOKIE_NAME, DEFAULT_MAX_AGE_DAYS};
use crate::render::{ErrorCatalog, ErrorText};
use crate::selection::{Candidate, SelectionStep, SourceRegistry, StaticSource, DEFAULT_FORM_ACTION};
use crate::state::{Stage, DEFAULT_STATE_TTL_SECS};

pub const DEFAULT_STAGE: &str = "selectprofile:select";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Home directory not found")]
    NoHomeDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Stage tag this step resumes states under.
    pub stage: String,
    /// URL the selection form posts to.
    pub form_action: String,
    pub state_ttl_secs: u64,
    /// Overrides `~/.selector/states.json`.
    pub state_file: Option<PathBuf>,
    pub remember: RememberConfig,
    pub sources: Vec<SourceConfig>,
    /// Extra or replacement entries for the error catalog.
    pub error_messages: BTreeMap<String, ErrorText>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        SelectorConfig {
            stage: DEFAULT_STAGE.to_string(),
            form_action: DEFAULT_FORM_ACTION.to_string(),
            state_ttl_secs: DEFAULT_STATE_TTL_SECS,
            state_file: None,
            remember: RememberConfig::default(),
            sources: Vec::new(),
            error_messages: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RememberConfig {
    pub enabled: bool,
    pub cookie_name: String,
    pub max_age_days: u32,
    pub secure: bool,
}

impl Default for RememberConfig {
    fn default() -> Self {
        RememberConfig {
            enabled: false,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            max_age_days: DEFAULT_MAX_AGE_DAYS,
            secure: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    /// Defaults to the top-level `stage`.
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Candidate ids that are shown but may not be selected.
    #[serde(default)]
    pub denied: Vec<String>,
}

impl SelectorConfig {
    pub fn stage(&self) -> Stage {
        Stage::new(self.stage.clone())
    }

    /// Explicit `state_file`, or `~/.selector/states.json`.
    pub fn state_file_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.state_file {
            Some(path) => Ok(path.clone()),
            None => get_selector_dir()
                .map(|d| d.join("states.json"))
                .ok_or(ConfigError::NoHomeDir),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stage.trim().is_empty() {
            return Err(ConfigError::Invalid("stage must not be empty".to_string()));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                return Err(ConfigError::Invalid("source id must not be empty".to_string()));
            }
            if !seen.insert(source.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate source id '{}'",
                    source.id
                )));
            }
            if let Some(stage) = source.stage.as_deref().filter(|s| *s != self.stage) {
                // Re-suspended states would be saved under this stage and
                // fail the gate on resubmission.
                tracing::warn!(
                    source = %source.id,
                    source_stage = %stage,
                    step_stage = %self.stage,
                    "Source stage differs from step stage"
                );
            }
        }

        Ok(())
    }

    pub fn build_registry(&self) -> SourceRegistry {
        let mut registry = SourceRegistry::new();
        for source in &self.sources {
            let stage = Stage::new(source.stage.clone().unwrap_or_else(|| self.stage.clone()));
            registry.register(Box::new(
                StaticSource::new(source.id.clone(), stage, source.candidates.clone())
                    .with_denied(source.denied.iter().cloned()),
            ));
        }
        registry
    }

    pub fn error_catalog(&self) -> ErrorCatalog {
        ErrorCatalog::default().merged(&self.error_messages)
    }

    pub fn remember_settings(&self) -> Option<RememberSettings> {
        self.remember.enabled.then(|| RememberSettings {
            cookie_name: self.remember.cookie_name.clone(),
            max_age_days: self.remember.max_age_days,
            secure: self.remember.secure,
        })
    }

    pub fn build_step(&self) -> SelectionStep {
        let step = SelectionStep::new(self.stage(), self.build_registry())
            .with_form_action(self.form_action.clone())
            .with_catalog(self.error_catalog());
        match self.remember_settings() {
            Some(settings) => step.with_remember(settings),
            None => step,
        }
    }
}

/// Returns the path to the selector data directory (~/.selector).
pub fn get_selector_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".selector"))
}

/// Returns the path to the default configuration file.
pub fn get_config_path() -> Option<PathBuf> {
    get_selector_dir().map(|d| d.join("config.json"))
}

/// Loads and validates the configuration, returning defaults if the file
/// doesn't exist.
pub fn load_config(path: &Path) -> Result<SelectorConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        return Ok(SelectorConfig::default());
    }

    let content = fs::read_to_string(path)?;
    let config: SelectorConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
