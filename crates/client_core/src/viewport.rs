//! Viewport composition: which meshes to draw, how to tint them, and the
//! asynchronous loading of their binary glTF assets.

use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use futures::future::join_all;
use shared::domain::{CompiledModel, DisplayMode, SelectionResult};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{api::HttpTutorialApi, error::ClientError};

pub const BASE_OPACITY: f32 = 0.25;
pub const PREVIEW_OPACITY: f32 = 0.95;
pub const NEUTRAL_COLOR: Rgb = Rgb::from_hex(0xd4d4d8);
pub const HIGHLIGHT_COLOR: Rgb = Rgb::from_hex(0x4c9aff);
pub const HIGHLIGHT_EMISSIVE_INTENSITY: f32 = 0.6;

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_HEADER_LEN: usize = 12;
const GLB_CHUNK_JSON: u32 = 0x4E4F_534A;
const GLB_CHUNK_BIN: u32 = 0x004E_4942;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::from_hex(0x000000);

    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as u8,
            g: ((hex >> 8) & 0xff) as u8,
            b: (hex & 0xff) as u8,
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshRole {
    Base,
    SelectionPreview,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialStyle {
    pub color: Rgb,
    pub emissive: Rgb,
    pub emissive_intensity: f32,
    pub opacity: f32,
}

impl MaterialStyle {
    pub fn for_role(role: MeshRole) -> Self {
        match role {
            MeshRole::Base => Self {
                color: NEUTRAL_COLOR,
                emissive: Rgb::BLACK,
                emissive_intensity: 0.0,
                opacity: BASE_OPACITY,
            },
            MeshRole::SelectionPreview => Self {
                color: HIGHLIGHT_COLOR,
                emissive: HIGHLIGHT_COLOR,
                emissive_intensity: HIGHLIGHT_EMISSIVE_INTENSITY,
                opacity: PREVIEW_OPACITY,
            },
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshLayer {
    pub role: MeshRole,
    pub url: String,
    pub material: MaterialStyle,
}

impl MeshLayer {
    fn new(role: MeshRole, url: &str) -> Self {
        Self {
            role,
            url: url.to_string(),
            material: MaterialStyle::for_role(role),
        }
    }
}

/// Layers to draw, base first. The base mesh is dropped in highlight-only
/// mode; the preview mesh does not depend on the mode.
pub fn plan_layers(
    base_url: Option<&str>,
    preview_url: Option<&str>,
    mode: DisplayMode,
) -> Vec<MeshLayer> {
    fn present(url: Option<&str>) -> Option<&str> {
        url.map(str::trim).filter(|url| !url.is_empty())
    }

    let mut layers = Vec::with_capacity(2);
    if !mode.is_highlight_only() {
        if let Some(url) = present(base_url) {
            layers.push(MeshLayer::new(MeshRole::Base, url));
        }
    }
    if let Some(url) = present(preview_url) {
        layers.push(MeshLayer::new(MeshRole::SelectionPreview, url));
    }
    layers
}

#[derive(Debug, Error)]
pub enum MeshLoadError {
    #[error("asset request failed: {0}")]
    Fetch(#[from] ClientError),
    #[error("asset is not binary glTF: {0}")]
    Format(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlbChunk {
    Json,
    Binary,
    Unknown(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlbHeader {
    pub version: u32,
    pub declared_len: u32,
    pub first_chunk: Option<GlbChunk>,
}

pub fn parse_glb_header(bytes: &[u8]) -> Result<GlbHeader, MeshLoadError> {
    if bytes.len() < GLB_HEADER_LEN {
        return Err(MeshLoadError::Format(format!(
            "{} bytes is shorter than the glb header",
            bytes.len()
        )));
    }
    if &bytes[..4] != GLB_MAGIC {
        return Err(MeshLoadError::Format("missing glTF magic".to_string()));
    }

    let word = |offset: usize| {
        u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    };
    let version = word(4);
    let declared_len = word(8);

    if version != 2 {
        return Err(MeshLoadError::Format(format!(
            "unsupported glb version {version}"
        )));
    }
    if declared_len as usize > bytes.len() {
        return Err(MeshLoadError::Format(format!(
            "declared length {declared_len} exceeds payload of {} bytes",
            bytes.len()
        )));
    }

    let first_chunk = (bytes.len() >= GLB_HEADER_LEN + 8).then(|| match word(16) {
        GLB_CHUNK_JSON => GlbChunk::Json,
        GLB_CHUNK_BIN => GlbChunk::Binary,
        other => GlbChunk::Unknown(other),
    });

    Ok(GlbHeader {
        version,
        declared_len,
        first_chunk,
    })
}

#[derive(Debug, Clone)]
pub struct LoadedMesh {
    pub url: String,
    pub header: GlbHeader,
    pub bytes: Arc<Vec<u8>>,
}

#[async_trait]
pub trait MeshFetcher: Send + Sync {
    async fn fetch_mesh(&self, url: &str) -> Result<Vec<u8>, ClientError>;
}

#[async_trait]
impl MeshFetcher for HttpTutorialApi {
    async fn fetch_mesh(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        self.fetch_asset(url).await
    }
}

#[derive(Debug, Clone)]
pub enum LayerState {
    Loading,
    Ready(Arc<LoadedMesh>),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct RenderedLayer {
    pub layer: MeshLayer,
    pub state: LayerState,
}

#[derive(Debug, Clone, Default)]
pub struct ViewportFrame {
    pub layers: Vec<RenderedLayer>,
}

impl ViewportFrame {
    /// Frame shown while assets are still in flight.
    pub fn pending(layers: Vec<MeshLayer>) -> Self {
        Self {
            layers: layers
                .into_iter()
                .map(|layer| RenderedLayer {
                    layer,
                    state: LayerState::Loading,
                })
                .collect(),
        }
    }

    pub fn drawn(&self) -> impl Iterator<Item = &RenderedLayer> {
        self.layers
            .iter()
            .filter(|layer| matches!(layer.state, LayerState::Ready(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&MeshLayer, &str)> {
        self.layers.iter().filter_map(|layer| match &layer.state {
            LayerState::Failed(reason) => Some((&layer.layer, reason.as_str())),
            _ => None,
        })
    }

    pub fn is_loading(&self) -> bool {
        self.layers
            .iter()
            .any(|layer| matches!(layer.state, LayerState::Loading))
    }
}

/// Frame shown while the session's meshes are in flight.
pub fn pending_session(
    model: Option<&CompiledModel>,
    result: Option<&SelectionResult>,
    mode: DisplayMode,
) -> ViewportFrame {
    let (base_url, preview_url) = session_urls(model, result);
    ViewportFrame::pending(plan_layers(base_url, preview_url, mode))
}

fn session_urls<'a>(
    model: Option<&'a CompiledModel>,
    result: Option<&'a SelectionResult>,
) -> (Option<&'a str>, Option<&'a str>) {
    (
        model.map(|model| model.mesh_url.as_str()),
        result.and_then(|result| result.preview_mesh_url.as_deref()),
    )
}

/// Loads and caches mesh assets for the viewport. A failed asset only marks
/// its own layer as failed. The cache only holds the meshes of the latest
/// render, base included even while it is hidden.
pub struct Viewport {
    fetcher: Arc<dyn MeshFetcher>,
    cache: Mutex<HashMap<String, Arc<LoadedMesh>>>,
}

impl Viewport {
    pub fn new(fetcher: Arc<dyn MeshFetcher>) -> Self {
        Self {
            fetcher,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn render(
        &self,
        base_url: Option<&str>,
        preview_url: Option<&str>,
        mode: DisplayMode,
    ) -> ViewportFrame {
        let layers = plan_layers(base_url, preview_url, mode);
        self.cache.lock().await.retain(|url, _| {
            [base_url, preview_url]
                .into_iter()
                .flatten()
                .any(|current| current.trim() == url)
        });
        let loads = layers.into_iter().map(|layer| async move {
            let state = match self.load(&layer.url).await {
                Ok(mesh) => LayerState::Ready(mesh),
                Err(err) => {
                    warn!("viewport: layer failed url={} error={err}", layer.url);
                    LayerState::Failed(err.to_string())
                }
            };
            RenderedLayer { layer, state }
        });
        ViewportFrame {
            layers: join_all(loads).await,
        }
    }

    pub async fn render_session(
        &self,
        model: Option<&CompiledModel>,
        result: Option<&SelectionResult>,
        mode: DisplayMode,
    ) -> ViewportFrame {
        let (base_url, preview_url) = session_urls(model, result);
        self.render(base_url, preview_url, mode).await
    }

    async fn load(&self, url: &str) -> Result<Arc<LoadedMesh>, MeshLoadError> {
        if let Some(mesh) = self.cache.lock().await.get(url) {
            debug!("viewport: cache hit url={url}");
            return Ok(Arc::clone(mesh));
        }

        let bytes = self.fetcher.fetch_mesh(url).await?;
        let header = parse_glb_header(&bytes)?;
        let mesh = Arc::new(LoadedMesh {
            url: url.to_string(),
            header,
            bytes: Arc::new(bytes),
        });
        self.cache
            .lock()
            .await
            .insert(url.to_string(), Arc::clone(&mesh));
        debug!(
            "viewport: loaded url={url} bytes={}",
            mesh.header.declared_len
        );
        Ok(mesh)
    }

    pub async fn cached_assets(&self) -> usize {
        self.cache.lock().await.len()
    }
}

#[cfg(test)]
#[path = "tests/viewport_tests.rs"]
mod tests;
