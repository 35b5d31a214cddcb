//! Subcommand implementations. Each returns the text to print on stdout.

use std::path::Path;

use selector_core::config::{self, ConfigError};
use selector_core::error::{ResumeError, SelectError};
use selector_core::render::RenderError;
use selector_core::state::StoreError;
use selector_core::{
    CookieJar, FileStateStore, FlowState, Interaction, JsonRenderer, Renderer, SelectionRequest,
    SelectorConfig, Stage, StateStore, Token,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Select(#[from] SelectError),

    #[error("{0}")]
    Resume(#[from] ResumeError),

    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),
}

impl CliError {
    /// 2 for caller mistakes, 1 for everything else.
    pub fn exit_code(&self) -> u8 {
        let caller_error = match self {
            CliError::Select(e) => !e.is_internal(),
            CliError::Resume(ResumeError::Store(_)) => false,
            CliError::Resume(_) | CliError::Argument(_) => true,
            _ => false,
        };
        if caller_error {
            2
        } else {
            1
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<SelectorConfig, CliError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config::get_config_path().ok_or(ConfigError::NoHomeDir)?,
    };
    Ok(config::load_config(&path)?)
}

fn open_store(config: &SelectorConfig) -> Result<FileStateStore, CliError> {
    let path = config.state_file_path()?;
    Ok(FileStateStore::new(&path, config.state_ttl_secs))
}

/// Suspends a new flow as the upstream engine would and returns its token.
pub fn suspend(
    config: &SelectorConfig,
    source_id: &str,
    remembered_id: Option<&str>,
    relying_party: Option<&str>,
) -> Result<String, CliError> {
    if config.build_registry().get(source_id).is_none() {
        return Err(CliError::Argument(format!(
            "source '{}' is not configured",
            source_id
        )));
    }

    let mut state = FlowState::new(source_id);
    if let Some(id) = remembered_id {
        state = state.with_remembered_id(id);
    }
    if let Some(raw) = relying_party {
        state = state.with_relying_party(serde_json::from_str(raw)?);
    }

    let mut store = open_store(config)?;
    let token = store.save(&state, &config.stage())?;
    tracing::info!(token = %token, source = %source_id, "Suspended new flow");
    Ok(token.to_string())
}

/// Runs one selection interaction and describes the result as JSON.
pub fn select(config: &SelectorConfig, request: &SelectionRequest) -> Result<String, CliError> {
    let step = config.build_step();
    let mut store = open_store(config)?;
    let mut jar = CookieJar::new();

    match step.handle(&mut store, &mut jar, request)? {
        Interaction::Resume(completion) => {
            let cookies = jar
                .cookies()
                .iter()
                .map(|c| c.header_value())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| CliError::Argument(format!("unencodable cookie: {}", e)))?;
            let output = json!({
                "outcome": "resume",
                "selected_id": completion.selected_id,
                "auth_state": completion.state.token,
                "state": completion.state.state,
                "set_cookie": cookies,
            });
            Ok(serde_json::to_string_pretty(&output)?)
        }
        Interaction::Show(view) => Ok(JsonRenderer.render(&view)?),
    }
}

/// Loads a stored state without touching it.
pub fn inspect(
    config: &SelectorConfig,
    raw_token: &str,
    stage: Option<&str>,
) -> Result<String, CliError> {
    let store = open_store(config)?;
    if !store.validate(raw_token) {
        return Err(ResumeError::InvalidToken.into());
    }

    let stage = stage.map(Stage::new).unwrap_or_else(|| config.stage());
    let loaded = store
        .load(&Token::from_raw(raw_token), &stage)
        .map_err(ResumeError::from)?;

    let output = json!({
        "auth_state": loaded.token,
        "stage": loaded.stage,
        "state": loaded.state,
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use selector_core::config::SourceConfig;
    use selector_core::Candidate;
    use serde_json::Value;
    use tempfile::{tempdir, TempDir};

    fn config_in(temp: &TempDir) -> SelectorConfig {
        SelectorConfig {
            state_file: Some(temp.path().join("states.json")),
            sources: vec![SourceConfig {
                id: "src1".to_string(),
                stage: None,
                candidates: vec![Candidate::new("1"), Candidate::new("2")],
                denied: Vec::new(),
            }],
            ..SelectorConfig::default()
        }
    }

    #[test]
    fn test_suspend_then_select_resumes() {
        let temp = tempdir().unwrap();
        let config = config_in(&temp);
        let token = suspend(&config, "src1", None, None).unwrap();

        let output = select(&config, &SelectionRequest::new(token.clone()).with_id("1")).unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["outcome"], "resume");
        assert_eq!(parsed["selected_id"], "1");
        assert_eq!(parsed["auth_state"], Value::String(token));
    }

    #[test]
    fn test_select_unknown_id_shows_error_with_new_token() {
        let temp = tempdir().unwrap();
        let config = config_in(&temp);
        let token = suspend(&config, "src1", None, None).unwrap();

        let output = select(&config, &SelectionRequest::new(token.clone()).with_id("9")).unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["error_code"], "NOTFOUND");
        assert_ne!(parsed["auth_state"], Value::String(token));

        let new_token = parsed["auth_state"].as_str().unwrap();
        let inspected: Value =
            serde_json::from_str(&inspect(&config, new_token, None).unwrap()).unwrap();
        assert_eq!(inspected["state"]["error"]["code"], "NOTFOUND");
    }

    #[test]
    fn test_select_writes_cookie_when_remember_enabled() {
        let temp = tempdir().unwrap();
        let mut config = config_in(&temp);
        config.remember.enabled = true;
        let token = suspend(&config, "src1", Some("2"), None).unwrap();

        let output = select(&config, &SelectionRequest::new(token)).unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["selected_id"], "2");
        let cookie = parsed["set_cookie"][0].as_str().unwrap();
        assert!(cookie.starts_with("selector_remember=2;"));
    }

    #[test]
    fn test_suspend_unknown_source_is_argument_error() {
        let temp = tempdir().unwrap();
        let error = suspend(&config_in(&temp), "nope", None, None).unwrap_err();
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_inspect_malformed_token_is_caller_error() {
        let temp = tempdir().unwrap();
        let error = inspect(&config_in(&temp), "bogus", None).unwrap_err();
        assert!(matches!(error, CliError::Resume(ResumeError::InvalidToken)));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_select_caller_error_exit_code() {
        let temp = tempdir().unwrap();
        let error = select(&config_in(&temp), &SelectionRequest::default()).unwrap_err();
        assert_eq!(error.exit_code(), 2);
    }
}
