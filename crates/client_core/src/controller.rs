//! Plumbing shared by the page controllers: per-panel loading/error status,
//! action outcomes, and conversion of client errors into one user message.

use tracing::error;

use crate::error::ClientError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelStatus {
    pub loading: bool,
    pub error: Option<String>,
}

impl PanelStatus {
    pub fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub fn succeed(&mut self) {
        self.loading = false;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.loading = false;
        self.error = Some(message.into());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Applied,
    /// Preconditions not met; nothing was sent.
    Skipped,
    /// A newer request superseded this one; its response was dropped.
    Stale,
    Failed(String),
}

impl ActionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    LoadLesson,
    Compile,
    Selection,
    Catalog,
}

impl UiErrorContext {
    fn as_str(self) -> &'static str {
        match self {
            Self::LoadLesson => "load_lesson",
            Self::Compile => "compile",
            Self::Selection => "selection",
            Self::Catalog => "catalog",
        }
    }

    fn fallback(self) -> &'static str {
        match self {
            Self::LoadLesson => "Could not load lesson.",
            Self::Compile => "Failed to compile model.",
            Self::Selection => "Failed to run selection.",
            Self::Catalog => "Unable to load tutorial content.",
        }
    }
}

/// Logs `err` and returns the single message shown for it.
pub fn user_facing_error(context: UiErrorContext, err: &ClientError) -> String {
    error!("controller: {} failed error={err}", context.as_str());
    match context {
        // Lesson loading chains several calls; only connectivity is worth
        // distinguishing there.
        UiErrorContext::LoadLesson if !err.is_network() => context.fallback().to_string(),
        _ => err.user_message(context.fallback()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_status_clears_previous_error_on_begin() {
        let mut status = PanelStatus::default();
        status.fail("boom");
        assert_eq!(status.error.as_deref(), Some("boom"));

        status.begin();
        assert!(status.loading);
        assert!(status.error.is_none());

        status.succeed();
        assert_eq!(status, PanelStatus::default());
    }

    #[test]
    fn selection_errors_show_backend_detail() {
        let err = ClientError::Selection {
            detail: Some("Unsupported selection expression".into()),
        };
        assert_eq!(
            user_facing_error(UiErrorContext::Selection, &err),
            "Unsupported selection expression"
        );
    }

    #[test]
    fn lesson_errors_collapse_to_one_message() {
        let err = ClientError::Compile {
            detail: Some("Traceback ...".into()),
        };
        assert_eq!(
            user_facing_error(UiErrorContext::LoadLesson, &err),
            "Could not load lesson."
        );
    }

    #[test]
    fn compile_without_detail_uses_fallback() {
        let err = ClientError::Compile { detail: None };
        assert_eq!(
            user_facing_error(UiErrorContext::Compile, &err),
            "Failed to compile model."
        );
    }

    #[test]
    fn outcome_exposes_failure_message() {
        assert_eq!(ActionOutcome::Failed("x".into()).error(), Some("x"));
        assert!(ActionOutcome::Applied.is_applied());
        assert!(ActionOutcome::Stale.error().is_none());
    }
}
