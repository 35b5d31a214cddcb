use crate::cookie::{CookieWriter, RememberSettings};
use crate::error::SelectError;
use crate::render::{assemble_view, ErrorCatalog, SelectionView};
use crate::state::{Stage, StateStore};

use super::registry::SourceRegistry;
use super::request::{SelectionAttempt, SelectionRequest};
use super::resolver::{commit, resume, Completion, Outcome};

pub const DEFAULT_FORM_ACTION: &str = "/selectprofile/select";

/// Result of one interaction, as seen by the HTTP boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    /// Hand the state back to the parent flow.
    Resume(Completion),
    /// Render the selection page from this view.
    Show(SelectionView),
}

/// The identity-selection step of the authentication flow.
pub struct SelectionStep {
    stage: Stage,
    registry: SourceRegistry,
    form_action: String,
    catalog: ErrorCatalog,
    remember: Option<RememberSettings>,
}

impl SelectionStep {
    pub fn new(stage: Stage, registry: SourceRegistry) -> Self {
        SelectionStep {
            stage,
            registry,
            form_action: DEFAULT_FORM_ACTION.to_string(),
            catalog: ErrorCatalog::default(),
            remember: None,
        }
    }

    pub fn with_form_action(mut self, form_action: impl Into<String>) -> Self {
        self.form_action = form_action.into();
        self
    }

    pub fn with_catalog(mut self, catalog: ErrorCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Enables the remember-my-choice cookie on successful commits.
    pub fn with_remember(mut self, settings: RememberSettings) -> Self {
        self.remember = Some(settings);
        self
    }

    /// Runs resume, lookup, extraction, commit and response assembly for one
    /// request.
    ///
    /// Rejected selections come back as [`Interaction::Show`] with the error
    /// in the view. Errors returned from here end the interaction.
    pub fn handle(
        &self,
        store: &mut dyn StateStore,
        cookies: &mut dyn CookieWriter,
        request: &SelectionRequest,
    ) -> Result<Interaction, SelectError> {
        let resumed = resume(&*store, request, &self.stage)?;

        let source_id = resumed.state.source_id.clone();
        let Some(source) = self.registry.get(&source_id) else {
            tracing::error!(
                source = %source_id,
                token = %resumed.token,
                "Suspended state references an unregistered selection source"
            );
            return Err(SelectError::SourceNotRegistered { source_id });
        };

        let attempt = SelectionAttempt::resolve(
            request.id.as_deref(),
            resumed.state.remembered_id.as_ref(),
        );

        match commit(store, source, resumed, &attempt)? {
            Outcome::Completed(completion) => {
                if let Some(settings) = &self.remember {
                    cookies.set_cookie(settings.cookie_for(&completion.selected_id));
                }
                Ok(Interaction::Resume(completion))
            }
            Outcome::ReSuspended(suspension) => {
                let view = assemble_view(
                    source,
                    &suspension.state,
                    &self.form_action,
                    &self.catalog,
                    Some(&attempt.candidate_id),
                )?;
                Ok(Interaction::Show(view))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookie::CookieJar;
    use crate::selection::{Candidate, StaticSource, ERR_NOT_ALLOWED};
    use crate::state::{CommitError, FlowState, MemoryStateStore};

    fn stage() -> Stage {
        Stage::new("selectprofile:select")
    }

    fn step() -> SelectionStep {
        let mut registry = SourceRegistry::new();
        registry.register(Box::new(
            StaticSource::new(
                "src1",
                stage(),
                vec![Candidate::new("1"), Candidate::new("2")],
            )
            .with_denied(["2"]),
        ));
        SelectionStep::new(stage(), registry)
    }

    #[test]
    fn test_handle_without_id_shows_candidates() {
        let mut store = MemoryStateStore::new();
        let mut jar = CookieJar::new();
        let token = store.save(&FlowState::new("src1"), &stage()).unwrap();

        let interaction = step()
            .handle(&mut store, &mut jar, &SelectionRequest::new(token.as_str()))
            .unwrap();

        let Interaction::Show(view) = interaction else {
            panic!("expected selection page");
        };
        assert_eq!(view.auth_state, token);
        assert_eq!(view.candidates.len(), 2);
        assert!(view.error_code.is_none());
        assert!(view.preselected.is_none());
        assert_eq!(
            view.form_target,
            format!("{}?AuthState={}", DEFAULT_FORM_ACTION, token)
        );
    }

    #[test]
    fn test_handle_shows_existing_error_without_commit() {
        let mut store = MemoryStateStore::new();
        let mut jar = CookieJar::new();
        let state = FlowState::new("src1").with_error(CommitError::new(ERR_NOT_ALLOWED));
        let token = store.save(&state, &stage()).unwrap();

        let interaction = step()
            .handle(&mut store, &mut jar, &SelectionRequest::new(token.as_str()))
            .unwrap();

        let Interaction::Show(view) = interaction else {
            panic!("expected selection page");
        };
        assert_eq!(view.error_code.as_deref(), Some(ERR_NOT_ALLOWED));
        assert_eq!(view.auth_state, token);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_handle_denied_id_renders_new_token() {
        let mut store = MemoryStateStore::new();
        let mut jar = CookieJar::new();
        let token = store.save(&FlowState::new("src1"), &stage()).unwrap();

        let interaction = step()
            .handle(
                &mut store,
                &mut jar,
                &SelectionRequest::new(token.as_str()).with_id("2"),
            )
            .unwrap();

        let Interaction::Show(view) = interaction else {
            panic!("expected selection page");
        };
        assert_ne!(view.auth_state, token);
        assert!(view.form_target.ends_with(view.auth_state.as_str()));
        assert_eq!(view.error_code.as_deref(), Some(ERR_NOT_ALLOWED));
        assert_eq!(view.preselected.as_deref(), Some("2"));
        assert!(jar.is_empty());
    }

    #[test]
    fn test_handle_accepted_id_resumes_without_cookie_by_default() {
        let mut store = MemoryStateStore::new();
        let mut jar = CookieJar::new();
        let token = store.save(&FlowState::new("src1"), &stage()).unwrap();

        let interaction = step()
            .handle(
                &mut store,
                &mut jar,
                &SelectionRequest::new(token.as_str()).with_id("1"),
            )
            .unwrap();

        assert!(matches!(interaction, Interaction::Resume(ref c) if c.selected_id == "1"));
        assert!(jar.is_empty());
    }

    #[test]
    fn test_handle_accepted_id_writes_remember_cookie() {
        let mut store = MemoryStateStore::new();
        let mut jar = CookieJar::new();
        let token = store.save(&FlowState::new("src1"), &stage()).unwrap();

        step()
            .with_remember(RememberSettings::default())
            .handle(
                &mut store,
                &mut jar,
                &SelectionRequest::new(token.as_str()).with_id("1"),
            )
            .unwrap();

        assert_eq!(jar.cookies().len(), 1);
        assert_eq!(jar.cookies()[0].value, "1");
    }

    #[test]
    fn test_handle_unregistered_source_is_internal_error() {
        let mut store = MemoryStateStore::new();
        let mut jar = CookieJar::new();
        let token = store.save(&FlowState::new("retired"), &stage()).unwrap();

        let error = step()
            .handle(&mut store, &mut jar, &SelectionRequest::new(token.as_str()))
            .unwrap_err();

        assert!(matches!(error, SelectError::SourceNotRegistered { ref source_id } if source_id == "retired"));
        assert!(error.is_internal());
    }

    #[test]
    fn test_handle_invalid_token_writes_nothing() {
        let mut store = MemoryStateStore::new();
        let mut jar = CookieJar::new();

        let error = step()
            .handle(
                &mut store,
                &mut jar,
                &SelectionRequest::new("not-a-token").with_id("1"),
            )
            .unwrap_err();

        assert_eq!(error.status_code(), 400);
        assert!(store.is_empty());
    }
}
