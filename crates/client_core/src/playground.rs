//! Playground page: free-form compile of pasted source, an uploaded file or a
//! built-in example, followed by selector runs with optional numeric filters.

use std::sync::Arc;

use shared::{
    domain::{CompiledModel, DisplayMode, ExampleId},
    protocol::{SelectionFilters, SelectionRunRequest},
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    api::{CompileSource, TutorialApi, UploadedFile},
    controller::{user_facing_error, ActionOutcome, PanelStatus, UiErrorContext},
    request_token::{RequestSlot, RequestTokens},
    shell::{ensure_catalog, CatalogStatus},
    store::SessionStore,
    viewport::{Viewport, ViewportFrame},
};

pub const DEFAULT_SELECTION: &str = ".faces(\"Z\")";

const UNSUPPORTED_UPLOAD: &str = "Unsupported file type; upload a .step, .stp or .stl file.";

/// Raw text of the filter inputs, exactly as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterInputs {
    pub min_area: String,
    pub max_area: String,
    pub min_length: String,
    pub max_length: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaygroundForm {
    pub source: String,
    pub upload: Option<UploadedFile>,
    pub selected_example: Option<ExampleId>,
    pub selection: String,
    pub filters: FilterInputs,
}

impl Default for PlaygroundForm {
    fn default() -> Self {
        Self {
            source: String::new(),
            upload: None,
            selected_example: None,
            selection: DEFAULT_SELECTION.to_string(),
            filters: FilterInputs::default(),
        }
    }
}

/// Picks the single compile input: file, then non-blank source, then example.
pub fn compile_source(form: &PlaygroundForm) -> Option<CompileSource> {
    if let Some(file) = &form.upload {
        return Some(CompileSource::Upload(file.clone()));
    }
    if !form.source.trim().is_empty() {
        return Some(CompileSource::Inline(form.source.clone()));
    }
    form.selected_example.clone().map(CompileSource::Example)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterParseError {
    #[error("{field} must be a number, got {value:?}")]
    NotANumber { field: &'static str, value: String },
}

fn parse_bound(field: &'static str, raw: &str) -> Result<Option<f64>, FilterParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(FilterParseError::NotANumber {
            field,
            value: raw.to_string(),
        }),
    }
}

/// Blank inputs are left out; `None` when every input is blank.
pub fn parse_filters(inputs: &FilterInputs) -> Result<Option<SelectionFilters>, FilterParseError> {
    let filters = SelectionFilters {
        min_area: parse_bound("min area", &inputs.min_area)?,
        max_area: parse_bound("max area", &inputs.max_area)?,
        min_length: parse_bound("min length", &inputs.min_length)?,
        max_length: parse_bound("max length", &inputs.max_length)?,
    };
    Ok((!filters.is_empty()).then_some(filters))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaygroundView {
    pub form: PlaygroundForm,
    /// Model compiled on this page; selection runs need one.
    pub model: Option<CompiledModel>,
    pub compile_status: PanelStatus,
    pub selection_status: PanelStatus,
}

pub struct PlaygroundController {
    api: Arc<dyn TutorialApi>,
    store: SessionStore,
    tokens: RequestTokens,
    view: Mutex<PlaygroundView>,
}

impl PlaygroundController {
    pub fn new(api: Arc<dyn TutorialApi>, store: SessionStore) -> Self {
        Self {
            api,
            store,
            tokens: RequestTokens::new(),
            view: Mutex::new(PlaygroundView::default()),
        }
    }

    pub async fn view(&self) -> PlaygroundView {
        self.view.lock().await.clone()
    }

    /// Loads the catalog if needed and preselects the first example.
    pub async fn prepare(&self) -> CatalogStatus {
        let status = ensure_catalog(self.api.as_ref(), &self.store).await;
        let state = self.store.snapshot();
        let mut view = self.view.lock().await;
        if view.form.selected_example.is_none() {
            view.form.selected_example = state.examples.first().map(|example| example.id.clone());
        }
        status
    }

    pub async fn edit_form(&self, edit: impl FnOnce(&mut PlaygroundForm)) {
        edit(&mut self.view.lock().await.form);
    }

    pub async fn compile(&self) -> ActionOutcome {
        let (token, source) = {
            let mut view = self.view.lock().await;
            let Some(source) = compile_source(&view.form) else {
                return ActionOutcome::Skipped;
            };
            if let CompileSource::Upload(file) = &source {
                if !file.has_supported_extension() {
                    warn!("playground: rejected upload filename={}", file.filename);
                    view.compile_status.fail(UNSUPPORTED_UPLOAD);
                    return ActionOutcome::Failed(UNSUPPORTED_UPLOAD.to_string());
                }
            }
            view.compile_status.begin();
            (self.tokens.issue(RequestSlot::Compile), source)
        };

        info!("playground: compiling source={}", source.kind());
        let compiled = self.api.compile_model(source).await;

        let mut view = self.view.lock().await;
        if !self.tokens.is_current(token) {
            debug!("playground: discarded stale compile seq={}", token.seq());
            return ActionOutcome::Stale;
        }
        match compiled {
            Ok(model) => {
                self.tokens.invalidate(RequestSlot::Selection);
                view.model = Some(model.clone());
                view.compile_status.succeed();
                view.selection_status = PanelStatus::default();
                self.store.set_current_model(Some(model));
                self.store.set_selection_result(None);
                ActionOutcome::Applied
            }
            Err(err) => {
                let message = user_facing_error(UiErrorContext::Compile, &err);
                view.compile_status.fail(message.clone());
                ActionOutcome::Failed(message)
            }
        }
    }

    /// No-op until a model has been compiled here.
    pub async fn run_selection(&self) -> ActionOutcome {
        let (token, request) = {
            let mut view = self.view.lock().await;
            let Some(model_id) = view.model.as_ref().map(|model| model.model_id.clone()) else {
                return ActionOutcome::Skipped;
            };
            let expression = view.form.selection.trim().to_string();
            if expression.is_empty() {
                return ActionOutcome::Skipped;
            }
            let filters = match parse_filters(&view.form.filters) {
                Ok(filters) => filters,
                Err(err) => {
                    let message = err.to_string();
                    view.selection_status.fail(message.clone());
                    return ActionOutcome::Failed(message);
                }
            };
            view.selection_status.begin();
            (
                self.tokens.issue(RequestSlot::Selection),
                SelectionRunRequest::new(model_id, expression, filters),
            )
        };

        let result = self.api.run_selection(request).await;

        let mut view = self.view.lock().await;
        if !self.tokens.is_current(token) {
            debug!("playground: discarded stale selection seq={}", token.seq());
            return ActionOutcome::Stale;
        }
        match result {
            Ok(result) => {
                self.store.set_selection_result(Some(result));
                view.selection_status.succeed();
                ActionOutcome::Applied
            }
            Err(err) => {
                let message = user_facing_error(UiErrorContext::Selection, &err);
                view.selection_status.fail(message.clone());
                ActionOutcome::Failed(message)
            }
        }
    }

    /// Empties the current result; history is untouched.
    pub async fn clear_selection(&self) {
        let mut view = self.view.lock().await;
        self.tokens.invalidate(RequestSlot::Selection);
        view.selection_status = PanelStatus::default();
        self.store.set_selection_result(None);
    }

    pub fn toggle_display_mode(&self) -> DisplayMode {
        self.store.toggle_display_mode()
    }

    /// Preview mesh of the current result, offered for download.
    pub fn download_link(&self) -> Option<String> {
        self.store
            .snapshot()
            .selection_result
            .as_ref()
            .and_then(|result| result.preview_mesh_url.clone())
    }

    pub async fn render(&self, viewport: &Viewport) -> ViewportFrame {
        let model = self.view.lock().await.model.clone();
        let state = self.store.snapshot();
        viewport
            .render_session(
                model.as_ref(),
                state.selection_result.as_ref(),
                state.display_mode,
            )
            .await
    }
}

#[cfg(test)]
#[path = "tests/playground_tests.rs"]
mod tests;
