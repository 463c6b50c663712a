use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(LessonId);
id_newtype!(ExampleId);
id_newtype!(ModelId);
id_newtype!(ShapeId);

/// A tutorial lesson.
///
/// The lesson index endpoint only carries `id`, `title` and `goal`; every other
/// field defaults to empty until the lesson detail is fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub starting_selection: String,
    #[serde(default)]
    pub solution: String,
    /// Example asset compiled as the lesson's reference model.
    #[serde(default)]
    pub model: Option<ExampleId>,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub hints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    pub id: ExampleId,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Example {
    pub fn tag_line(&self) -> String {
        self.tags.join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    /// `[xmin, ymin, zmin, xmax, ymax, zmax]`
    #[serde(default)]
    pub bbox: Vec<f64>,
    #[serde(default)]
    pub area: f64,
    #[serde(default)]
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledModel {
    pub model_id: ModelId,
    pub mesh_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ModelMeta>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionCounts {
    #[serde(default)]
    pub faces: u32,
    #[serde(default)]
    pub edges: u32,
    #[serde(default)]
    pub vertices: u32,
}

impl SelectionCounts {
    pub fn total(&self) -> u32 {
        self.faces
            .saturating_add(self.edges)
            .saturating_add(self.vertices)
    }

    /// `F:2 E:0 V:0`
    pub fn compact(&self) -> String {
        format!("F:{} E:{} V:{}", self.faces, self.edges, self.vertices)
    }
}

impl fmt::Display for SelectionCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Faces: {} · Edges: {} · Vertices: {}",
            self.faces, self.edges, self.vertices
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Face,
    Edge,
    Vertex,
    Wire,
    Shell,
    Solid,
    Compound,
    #[serde(other)]
    Other,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Face => "face",
            Self::Edge => "edge",
            Self::Vertex => "vertex",
            Self::Wire => "wire",
            Self::Shell => "shell",
            Self::Solid => "solid",
            Self::Compound => "compound",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionItem {
    pub id: ShapeId,
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResult {
    /// Filled in by the client from the expression it submitted.
    #[serde(default)]
    pub expression: String,
    #[serde(default)]
    pub counts: SelectionCounts,
    #[serde(default)]
    pub items: Vec<SelectionItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_mesh_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    #[default]
    ShowBase,
    HighlightOnly,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::ShowBase => Self::HighlightOnly,
            Self::HighlightOnly => Self::ShowBase,
        }
    }

    pub fn is_highlight_only(self) -> bool {
        self == Self::HighlightOnly
    }

    /// Label of the button that switches *away* from this mode.
    pub fn toggle_label(self) -> &'static str {
        match self {
            Self::ShowBase => "Highlight only",
            Self::HighlightOnly => "Show base",
        }
    }
}
