use serde::{Deserialize, Serialize};

use crate::domain::{Example, ExampleId, Lesson, ModelId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonsResponse {
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamplesResponse {
    pub examples: Vec<Example>,
}

/// JSON body of `POST /model/compile`. Exactly one field is populated; unset
/// fields are left out of the body entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileJsonRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<ExampleId>,
}

impl CompileJsonRequest {
    pub fn source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            asset: None,
        }
    }

    pub fn asset(asset: ExampleId) -> Self {
        Self {
            source: None,
            asset: Some(asset),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<f64>,
}

impl SelectionFilters {
    pub fn is_empty(&self) -> bool {
        self.min_area.is_none()
            && self.max_area.is_none()
            && self.min_length.is_none()
            && self.max_length.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRunRequest {
    pub model_id: ModelId,
    pub selection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<SelectionFilters>,
}

impl SelectionRunRequest {
    /// Empty filter sets are dropped so the backend never sees `{}`.
    pub fn new(
        model_id: ModelId,
        selection: impl Into<String>,
        filters: Option<SelectionFilters>,
    ) -> Self {
        Self {
            model_id,
            selection: selection.into(),
            filters: filters.filter(|filters| !filters.is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}
