//! Navigation shell: routes, the side navigation and header, the overview
//! page, lazy catalog loading, and keyboard shortcuts.

use std::{fmt, sync::Arc};

use shared::domain::LessonId;
use tracing::{debug, warn};

use crate::{
    api::TutorialApi,
    controller::{user_facing_error, UiErrorContext},
    error::ClientError,
    store::{SessionState, SessionStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocLink {
    pub label: &'static str,
    pub url: &'static str,
}

pub const DOC_LINKS: &[DocLink] = &[
    DocLink {
        label: "Selection docs",
        url: "https://cadquery.readthedocs.io/en/latest/selectors.html",
    },
    DocLink {
        label: "CadQuery GitHub",
        url: "https://github.com/CadQuery/cadquery",
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Overview,
    Lessons(Option<LessonId>),
    Playground,
}

impl Route {
    pub fn lesson(id: LessonId) -> Self {
        Self::Lessons(Some(id))
    }

    /// Unknown paths fall back to the overview.
    pub fn parse(path: &str) -> Self {
        let path = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_matches('/');
        let mut segments = path.split('/').filter(|segment| !segment.is_empty());

        match (segments.next(), segments.next(), segments.next()) {
            (None, _, _) => Self::Overview,
            (Some("lessons"), None, _) => Self::Lessons(None),
            (Some("lessons"), Some(id), None) => Self::lesson(LessonId::from(id)),
            (Some("playground"), None, _) => Self::Playground,
            _ => Self::Overview,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Overview => "/".to_string(),
            Self::Lessons(None) => "/lessons".to_string(),
            Self::Lessons(Some(id)) => format!("/lessons/{id}"),
            Self::Playground => "/playground".to_string(),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::Lessons(_) => "Lessons",
            Self::Playground => "Playground",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub label: String,
    pub route: Route,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleLine {
    pub name: String,
    pub tags: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationModel {
    pub title: &'static str,
    pub lessons: Vec<NavLink>,
    pub playground: NavLink,
    pub examples: Vec<ExampleLine>,
    pub docs: &'static [DocLink],
}

pub fn navigation(state: &SessionState, current: &Route) -> NavigationModel {
    let lessons = state
        .lessons
        .iter()
        .map(|lesson| {
            let route = Route::lesson(lesson.id.clone());
            NavLink {
                label: lesson.title.clone(),
                active: &route == current,
                route,
            }
        })
        .collect();

    NavigationModel {
        title: current.title(),
        lessons,
        playground: NavLink {
            label: "Try selections".to_string(),
            route: Route::Playground,
            active: *current == Route::Playground,
        },
        examples: state
            .examples
            .iter()
            .map(|example| ExampleLine {
                name: example.name.clone(),
                tags: example.tag_line(),
            })
            .collect(),
        docs: DOC_LINKS,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverviewModel {
    pub heading: &'static str,
    pub intro: &'static str,
    pub building_blocks: &'static [&'static str],
    pub start_lessons: Route,
    pub open_playground: Route,
}

pub fn overview(state: &SessionState) -> OverviewModel {
    OverviewModel {
        heading: "How CadQuery selection works",
        intro: "CadQuery selectors are composable strings and helpers that identify sub-shapes \
                of a model: faces, edges, vertices, wires and more. The lessons go from \
                orientation filters to property-based matching, spatial queries and chaining.",
        building_blocks: &[
            "Orientation filters such as >Z or |Y.",
            "Property filters by area, radius, or planarity.",
            "Chaining selections across faces, edges, and vertices.",
        ],
        start_lessons: Route::Lessons(state.first_lesson_id().cloned()),
        open_playground: Route::Playground,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogStatus {
    pub lessons_error: Option<String>,
    pub examples_error: Option<String>,
}

impl CatalogStatus {
    pub fn is_complete(&self) -> bool {
        self.lessons_error.is_none() && self.examples_error.is_none()
    }
}

/// Fetches lessons if the store has none yet.
pub async fn ensure_lessons(
    api: &dyn TutorialApi,
    store: &SessionStore,
) -> Result<Arc<SessionState>, ClientError> {
    let snapshot = store.snapshot();
    if !snapshot.lessons.is_empty() {
        return Ok(snapshot);
    }
    let lessons = api.list_lessons().await?;
    debug!("shell: lessons loaded count={}", lessons.len());
    store.set_lessons(lessons);
    Ok(store.snapshot())
}

/// Lazily fills lessons and examples. The two fetches fail independently.
pub async fn ensure_catalog(api: &dyn TutorialApi, store: &SessionStore) -> CatalogStatus {
    let mut status = CatalogStatus::default();

    if let Err(err) = ensure_lessons(api, store).await {
        warn!("shell: unable to load lessons");
        status.lessons_error = Some(user_facing_error(UiErrorContext::Catalog, &err));
    }

    if store.snapshot().examples.is_empty() {
        match api.list_examples().await {
            Ok(examples) => {
                debug!("shell: examples loaded count={}", examples.len());
                store.set_examples(examples);
            }
            Err(err) => {
                warn!("shell: unable to load examples");
                status.examples_error = Some(user_facing_error(UiErrorContext::Catalog, &err));
            }
        }
    }

    status
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress<'a> {
    pub key: &'a str,
    pub ctrl: bool,
    pub meta: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    RunSelection,
    ToggleDisplayMode,
}

pub fn shortcut_for(press: KeyPress<'_>) -> Option<Shortcut> {
    let modified = press.ctrl || press.meta;
    if modified && press.key == "Enter" {
        return Some(Shortcut::RunSelection);
    }
    if !modified && press.key.eq_ignore_ascii_case("h") {
        return Some(Shortcut::ToggleDisplayMode);
    }
    None
}

#[cfg(test)]
#[path = "tests/shell_tests.rs"]
mod tests;
