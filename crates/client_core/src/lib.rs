//! Client side of the CadQuery selector tutorial: the backend API client, the
//! shared session store, viewport composition and the page controllers that
//! tie them together.

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod lessons;
pub mod playground;
pub mod request_token;
pub mod shell;
pub mod store;
pub mod viewport;

#[cfg(test)]
#[path = "tests/mock_backend.rs"]
pub(crate) mod mock_backend;

pub use api::{CompileSource, HttpTutorialApi, TutorialApi, UploadedFile};
pub use config::{load_settings, load_settings_from, ClientSettings};
pub use controller::{ActionOutcome, PanelStatus};
pub use error::ClientError;
pub use lessons::{LessonController, NavDirection};
pub use playground::{PlaygroundController, PlaygroundForm};
pub use shell::Route;
pub use store::{SessionAction, SessionState, SessionStore};
pub use viewport::{Viewport, ViewportFrame};
