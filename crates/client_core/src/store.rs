//! Process-wide session state.
//!
//! State is an immutable [`SessionState`] snapshot. Every change goes through
//! [`reduce`], which builds the next snapshot from the previous one; the
//! [`SessionStore`] swaps snapshots atomically and notifies subscribers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::domain::{CompiledModel, DisplayMode, Example, Lesson, LessonId, SelectionResult};
use tokio::sync::watch;
use tracing::debug;

pub const HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub result: SelectionResult,
}

impl HistoryEntry {
    /// Expression shown for this entry; falls back to `current_editor_text`
    /// when the result was stored without one.
    pub fn expression_or<'a>(&'a self, current_editor_text: &'a str) -> &'a str {
        if self.result.expression.is_empty() {
            current_editor_text
        } else {
            &self.result.expression
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{}  {}",
            self.timestamp.format("%H:%M:%S"),
            self.result.counts.compact()
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Lessons in fetch order.
    pub lessons: Vec<Lesson>,
    /// Ids of `lessons`, rebuilt on every lessons update.
    pub lesson_order: Vec<LessonId>,
    pub examples: Vec<Example>,
    pub current_model: Option<CompiledModel>,
    pub selection_result: Option<SelectionResult>,
    /// Newest first, never longer than [`HISTORY_LIMIT`].
    pub history: Vec<HistoryEntry>,
    pub display_mode: DisplayMode,
}

impl SessionState {
    pub fn lesson_index(&self, id: &LessonId) -> Option<usize> {
        self.lesson_order.iter().position(|candidate| candidate == id)
    }

    pub fn lesson(&self, id: &LessonId) -> Option<&Lesson> {
        self.lessons.iter().find(|lesson| &lesson.id == id)
    }

    pub fn first_lesson_id(&self) -> Option<&LessonId> {
        self.lesson_order.first()
    }

    pub fn highlight_only(&self) -> bool {
        self.display_mode.is_highlight_only()
    }
}

#[derive(Debug, Clone)]
pub enum SessionAction {
    SetLessons(Vec<Lesson>),
    SetExamples(Vec<Example>),
    SetCurrentModel(Option<CompiledModel>),
    SetSelectionResult(Option<SelectionResult>),
    ToggleDisplayMode,
}

impl SessionAction {
    fn name(&self) -> &'static str {
        match self {
            Self::SetLessons(_) => "set_lessons",
            Self::SetExamples(_) => "set_examples",
            Self::SetCurrentModel(_) => "set_current_model",
            Self::SetSelectionResult(_) => "set_selection_result",
            Self::ToggleDisplayMode => "toggle_display_mode",
        }
    }
}

pub fn reduce(state: &SessionState, action: SessionAction, now: DateTime<Utc>) -> SessionState {
    let mut next = state.clone();
    match action {
        SessionAction::SetLessons(lessons) => {
            next.lesson_order = lessons.iter().map(|lesson| lesson.id.clone()).collect();
            next.lessons = lessons;
        }
        SessionAction::SetExamples(examples) => {
            next.examples = examples;
        }
        SessionAction::SetCurrentModel(model) => {
            next.current_model = model;
        }
        SessionAction::SetSelectionResult(Some(result)) => {
            let mut history = Vec::with_capacity(HISTORY_LIMIT);
            history.push(HistoryEntry {
                timestamp: now,
                result: result.clone(),
            });
            history.extend(state.history.iter().take(HISTORY_LIMIT - 1).cloned());
            next.history = history;
            next.selection_result = Some(result);
        }
        SessionAction::SetSelectionResult(None) => {
            next.selection_result = None;
        }
        SessionAction::ToggleDisplayMode => {
            next.display_mode = state.display_mode.toggled();
        }
    }
    next
}

/// Shared handle to the session state. Cheap to clone; all clones see the
/// same snapshots.
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Arc<SessionState>>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_state(SessionState::default())
    }

    pub fn with_state(state: SessionState) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(state));
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> Arc<SessionState> {
        Arc::clone(&self.tx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionState>> {
        self.tx.subscribe()
    }

    pub fn dispatch(&self, action: SessionAction) -> Arc<SessionState> {
        self.dispatch_at(action, Utc::now())
    }

    /// Applies `action` as of `now`. The read of the previous snapshot and the
    /// publish of the next one happen under the channel's write lock.
    pub fn dispatch_at(&self, action: SessionAction, now: DateTime<Utc>) -> Arc<SessionState> {
        let name = action.name();
        let mut published = None;
        self.tx.send_modify(|current| {
            let next = Arc::new(reduce(current, action, now));
            published = Some(Arc::clone(&next));
            *current = next;
        });
        let next = published.unwrap_or_else(|| self.snapshot());
        debug!(
            "store: {name} history_len={} has_result={}",
            next.history.len(),
            next.selection_result.is_some()
        );
        next
    }

    pub fn set_lessons(&self, lessons: Vec<Lesson>) {
        self.dispatch(SessionAction::SetLessons(lessons));
    }

    pub fn set_examples(&self, examples: Vec<Example>) {
        self.dispatch(SessionAction::SetExamples(examples));
    }

    pub fn set_current_model(&self, model: Option<CompiledModel>) {
        self.dispatch(SessionAction::SetCurrentModel(model));
    }

    pub fn set_selection_result(&self, result: Option<SelectionResult>) {
        self.dispatch(SessionAction::SetSelectionResult(result));
    }

    pub fn toggle_display_mode(&self) -> DisplayMode {
        self.dispatch(SessionAction::ToggleDisplayMode).display_mode
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
