//! Lesson page: previous/next traversal over the fetched lesson order and the
//! controller that loads a lesson, compiles its model and runs selections.

use std::sync::Arc;

use shared::{
    domain::{CompiledModel, DisplayMode, Lesson, LessonId},
    protocol::SelectionRunRequest,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    api::{CompileSource, TutorialApi},
    controller::{user_facing_error, ActionOutcome, PanelStatus, UiErrorContext},
    error::ClientError,
    request_token::{RequestSlot, RequestTokens},
    shell::{ensure_lessons, shortcut_for, KeyPress, Route, Shortcut},
    store::SessionStore,
    viewport::{Viewport, ViewportFrame},
};

pub const DEFAULT_HINT: &str =
    "Think about the face orientation or property described in the goal.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    Previous,
    Next,
}

/// Neighbour of `current` in `order`. `None` past either end or when
/// `current` is not part of the order.
pub fn neighbor(order: &[LessonId], current: &LessonId, direction: NavDirection) -> Option<LessonId> {
    let index = order.iter().position(|id| id == current)?;
    let target = match direction {
        NavDirection::Previous => index.checked_sub(1)?,
        NavDirection::Next => index + 1,
    };
    order.get(target).cloned()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LessonView {
    pub lesson: Option<Lesson>,
    /// Selector text in the editor.
    pub selection: String,
    pub model: Option<CompiledModel>,
    pub show_solution: bool,
    pub status: PanelStatus,
    pub selection_status: PanelStatus,
}

impl LessonView {
    pub fn hints(&self) -> Vec<String> {
        match &self.lesson {
            Some(lesson) if !lesson.hints.is_empty() => lesson.hints.clone(),
            _ => vec![DEFAULT_HINT.to_string()],
        }
    }

    /// Solution text, only while it is toggled visible.
    pub fn visible_solution(&self) -> Option<&str> {
        if !self.show_solution {
            return None;
        }
        self.lesson.as_ref().map(|lesson| lesson.solution.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonLoad {
    pub outcome: ActionOutcome,
    /// Set when the caller should move to another route instead.
    pub redirect: Option<Route>,
}

impl LessonLoad {
    fn outcome(outcome: ActionOutcome) -> Self {
        Self {
            outcome,
            redirect: None,
        }
    }
}

pub struct LessonController {
    api: Arc<dyn TutorialApi>,
    store: SessionStore,
    tokens: RequestTokens,
    view: Mutex<LessonView>,
}

impl LessonController {
    pub fn new(api: Arc<dyn TutorialApi>, store: SessionStore) -> Self {
        Self {
            api,
            store,
            tokens: RequestTokens::new(),
            view: Mutex::new(LessonView::default()),
        }
    }

    pub async fn view(&self) -> LessonView {
        self.view.lock().await.clone()
    }

    /// `/lessons` without an id goes to the first lesson once lessons are
    /// known. Returns the route to redirect to, if any.
    pub async fn resolve_route(&self, requested: Option<&LessonId>) -> Option<Route> {
        if requested.is_some() {
            return None;
        }
        match ensure_lessons(self.api.as_ref(), &self.store).await {
            Ok(state) => state.first_lesson_id().cloned().map(Route::lesson),
            Err(err) => {
                let message = user_facing_error(UiErrorContext::Catalog, &err);
                self.view.lock().await.status.fail(message);
                None
            }
        }
    }

    /// Fetches the lesson, compiles its model and swaps everything in at once.
    /// On failure the previously loaded lesson stays in place.
    pub async fn load_lesson(&self, id: &LessonId) -> LessonLoad {
        let token = {
            let mut view = self.view.lock().await;
            view.status.begin();
            self.tokens.issue(RequestSlot::Lesson)
        };
        info!("lessons: loading lesson_id={id}");

        match self.fetch_lesson(id).await {
            Ok((lesson, model)) => {
                let mut view = self.view.lock().await;
                if !self.tokens.is_current(token) {
                    debug!("lessons: discarded stale load lesson_id={id}");
                    return LessonLoad::outcome(ActionOutcome::Stale);
                }
                // A selection issued against the previous lesson must not land.
                self.tokens.invalidate(RequestSlot::Selection);
                view.selection = lesson.starting_selection.clone();
                view.lesson = Some(lesson);
                view.model = model.clone();
                view.show_solution = false;
                view.status.succeed();
                view.selection_status = PanelStatus::default();
                self.store.set_current_model(model);
                self.store.set_selection_result(None);
                LessonLoad::outcome(ActionOutcome::Applied)
            }
            Err(err) => {
                let redirect = if err.is_not_found() {
                    self.first_lesson_other_than(id).await
                } else {
                    None
                };
                let mut view = self.view.lock().await;
                if !self.tokens.is_current(token) {
                    debug!("lessons: discarded stale load lesson_id={id}");
                    return LessonLoad::outcome(ActionOutcome::Stale);
                }
                let message = user_facing_error(UiErrorContext::LoadLesson, &err);
                view.status.fail(message.clone());
                if let Some(route) = &redirect {
                    warn!("lessons: lesson_id={id} not found, redirecting to {route}");
                }
                LessonLoad {
                    outcome: ActionOutcome::Failed(message),
                    redirect,
                }
            }
        }
    }

    async fn fetch_lesson(
        &self,
        id: &LessonId,
    ) -> Result<(Lesson, Option<CompiledModel>), ClientError> {
        let lesson = self.api.get_lesson(id).await?;
        let model = match &lesson.model {
            Some(asset) => Some(
                self.api
                    .compile_model(CompileSource::Example(asset.clone()))
                    .await?,
            ),
            None => None,
        };
        Ok((lesson, model))
    }

    async fn first_lesson_other_than(&self, missing: &LessonId) -> Option<Route> {
        let state = ensure_lessons(self.api.as_ref(), &self.store).await.ok()?;
        state
            .first_lesson_id()
            .filter(|first| *first != missing)
            .cloned()
            .map(Route::lesson)
    }

    pub async fn set_selection(&self, text: impl Into<String>) {
        self.view.lock().await.selection = text.into();
    }

    pub async fn reset_selection(&self) {
        let mut view = self.view.lock().await;
        if let Some(starting) = view
            .lesson
            .as_ref()
            .map(|lesson| lesson.starting_selection.clone())
        {
            view.selection = starting;
        }
    }

    pub async fn toggle_solution(&self) -> bool {
        let mut view = self.view.lock().await;
        view.show_solution = !view.show_solution;
        view.show_solution
    }

    /// Runs the editor's selector against the lesson model. Blank selectors
    /// and a missing model are no-ops.
    pub async fn run_selection(&self) -> ActionOutcome {
        let (token, model_id, expression) = {
            let mut view = self.view.lock().await;
            let expression = view.selection.trim().to_string();
            let Some(model) = view.model.as_ref() else {
                return ActionOutcome::Skipped;
            };
            if expression.is_empty() {
                return ActionOutcome::Skipped;
            }
            let model_id = model.model_id.clone();
            view.selection_status.begin();
            (self.tokens.issue(RequestSlot::Selection), model_id, expression)
        };

        let result = self
            .api
            .run_selection(SelectionRunRequest::new(model_id, expression, None))
            .await;

        let mut view = self.view.lock().await;
        if !self.tokens.is_current(token) {
            debug!("lessons: discarded stale selection seq={}", token.seq());
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

    /// Route of the neighbouring lesson; `None` means no navigation happens.
    pub async fn navigate(&self, direction: NavDirection) -> Option<Route> {
        let current = self.view.lock().await.lesson.as_ref()?.id.clone();
        let state = self.store.snapshot();
        neighbor(&state.lesson_order, &current, direction).map(Route::lesson)
    }

    pub fn toggle_display_mode(&self) -> DisplayMode {
        self.store.toggle_display_mode()
    }

    /// `None` when the key is not bound on this page.
    pub async fn handle_key(&self, press: KeyPress<'_>) -> Option<ActionOutcome> {
        match shortcut_for(press)? {
            Shortcut::RunSelection => Some(self.run_selection().await),
            Shortcut::ToggleDisplayMode => {
                self.toggle_display_mode();
                Some(ActionOutcome::Applied)
            }
        }
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
#[path = "tests/lessons_tests.rs"]
mod tests;
