use super::*;
use crate::mock_backend::{glb_bytes, MockBackend};

struct TestMeshFetcher {
    missing: Vec<String>,
    fetched: Arc<Mutex<Vec<String>>>,
}

impl TestMeshFetcher {
    fn ok() -> Self {
        Self {
            missing: Vec::new(),
            fetched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn missing(url: &str) -> Self {
        let mut fetcher = Self::ok();
        fetcher.missing.push(url.to_string());
        fetcher
    }
}

#[async_trait]
impl MeshFetcher for TestMeshFetcher {
    async fn fetch_mesh(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        self.fetched.lock().await.push(url.to_string());
        if self.missing.iter().any(|missing| missing == url) {
            return Err(ClientError::NotFound {
                what: format!("asset {url}"),
                detail: None,
            });
        }
        if url.contains("corrupt") {
            return Ok(b"<html>oops</html>".to_vec());
        }
        Ok(glb_bytes())
    }
}

#[test]
fn base_only_in_show_base_mode_is_one_translucent_layer() {
    let layers = plan_layers(Some("/api/model/m/mesh"), None, DisplayMode::ShowBase);
    assert_eq!(layers.len(), 1);
    assert_eq!(layers[0].role, MeshRole::Base);
    assert_eq!(layers[0].material.opacity, BASE_OPACITY);
    assert!(layers[0].material.is_transparent());
    assert_eq!(layers[0].material.color, NEUTRAL_COLOR);
    assert_eq!(layers[0].material.emissive_intensity, 0.0);
}

#[test]
fn base_only_in_highlight_mode_draws_nothing() {
    let layers = plan_layers(Some("/api/model/m/mesh"), None, DisplayMode::HighlightOnly);
    assert!(layers.is_empty());
}

#[test]
fn preview_only_is_highlighted_in_either_mode() {
    for mode in [DisplayMode::ShowBase, DisplayMode::HighlightOnly] {
        let layers = plan_layers(None, Some("/api/selection/m/preview/p.glb"), mode);
        assert_eq!(layers.len(), 1, "mode {mode:?}");
        assert_eq!(layers[0].role, MeshRole::SelectionPreview);
        assert_eq!(layers[0].material.opacity, PREVIEW_OPACITY);
        assert_eq!(layers[0].material.color, HIGHLIGHT_COLOR);
        assert_eq!(layers[0].material.emissive, HIGHLIGHT_COLOR);
        assert_eq!(
            layers[0].material.emissive_intensity,
            HIGHLIGHT_EMISSIVE_INTENSITY
        );
    }
}

#[test]
fn both_urls_draw_base_under_preview() {
    let layers = plan_layers(Some("base"), Some("preview"), DisplayMode::ShowBase);
    let roles = layers.iter().map(|layer| layer.role).collect::<Vec<_>>();
    assert_eq!(roles, vec![MeshRole::Base, MeshRole::SelectionPreview]);
}

#[test]
fn blank_urls_are_treated_as_absent() {
    assert!(plan_layers(Some(" "), Some(""), DisplayMode::ShowBase).is_empty());
}

#[test]
fn colors_render_as_css_hex() {
    assert_eq!(HIGHLIGHT_COLOR.to_string(), "#4c9aff");
    assert_eq!(NEUTRAL_COLOR.to_string(), "#d4d4d8");
    assert_eq!(Rgb::BLACK.to_string(), "#000000");
}

#[test]
fn parses_valid_glb_header() {
    let bytes = glb_bytes();
    let header = parse_glb_header(&bytes).expect("header");
    assert_eq!(header.version, 2);
    assert_eq!(header.declared_len as usize, bytes.len());
    assert_eq!(header.first_chunk, Some(GlbChunk::Json));
}

#[test]
fn rejects_non_glb_payloads() {
    assert!(matches!(
        parse_glb_header(b"glTF"),
        Err(MeshLoadError::Format(_))
    ));
    assert!(matches!(
        parse_glb_header(b"<html>not a mesh</html>"),
        Err(MeshLoadError::Format(_))
    ));

    let mut wrong_version = glb_bytes();
    wrong_version[4] = 1;
    assert!(parse_glb_header(&wrong_version).is_err());

    let mut truncated = glb_bytes();
    truncated.truncate(16);
    assert!(parse_glb_header(&truncated).is_err());
}

#[tokio::test]
async fn missing_asset_only_fails_its_own_layer() {
    let viewport = Viewport::new(Arc::new(TestMeshFetcher::missing("base.glb")));
    let frame = viewport
        .render(Some("base.glb"), Some("preview.glb"), DisplayMode::ShowBase)
        .await;

    assert_eq!(frame.layers.len(), 2);
    let drawn = frame.drawn().collect::<Vec<_>>();
    assert_eq!(drawn.len(), 1);
    assert_eq!(drawn[0].layer.role, MeshRole::SelectionPreview);

    let failures = frame.failures().collect::<Vec<_>>();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0.role, MeshRole::Base);
    assert!(!frame.is_loading());
}

#[tokio::test]
async fn corrupt_asset_is_reported_as_failed_layer() {
    let viewport = Viewport::new(Arc::new(TestMeshFetcher::ok()));
    let frame = viewport
        .render(None, Some("corrupt.glb"), DisplayMode::HighlightOnly)
        .await;

    assert_eq!(frame.drawn().count(), 0);
    let failures = frame.failures().collect::<Vec<_>>();
    assert!(failures[0].1.contains("not binary glTF"));
}

#[tokio::test]
async fn highlight_only_skips_base_fetch() {
    let fetcher = TestMeshFetcher::ok();
    let fetched = fetcher.fetched.clone();
    let viewport = Viewport::new(Arc::new(fetcher));

    viewport
        .render(Some("base.glb"), None, DisplayMode::HighlightOnly)
        .await;

    assert!(fetched.lock().await.is_empty());
}

#[tokio::test]
async fn loaded_assets_are_cached_per_url() {
    let fetcher = TestMeshFetcher::ok();
    let fetched = fetcher.fetched.clone();
    let viewport = Viewport::new(Arc::new(fetcher));

    viewport
        .render(Some("base.glb"), None, DisplayMode::ShowBase)
        .await;
    viewport
        .render(Some("base.glb"), Some("p.glb"), DisplayMode::ShowBase)
        .await;

    assert_eq!(
        *fetched.lock().await,
        vec!["base.glb".to_string(), "p.glb".to_string()]
    );
    assert_eq!(viewport.cached_assets().await, 2);
}

#[test]
fn pending_frame_marks_every_layer_loading() {
    let frame = ViewportFrame::pending(plan_layers(
        Some("base.glb"),
        Some("p.glb"),
        DisplayMode::ShowBase,
    ));
    assert!(frame.is_loading());
    assert_eq!(frame.drawn().count(), 0);
}

#[tokio::test]
async fn renders_session_meshes_over_http() {
    let backend = MockBackend::spawn().await;
    let api = Arc::new(HttpTutorialApi::new(backend.api_base()).expect("api"));
    let viewport = Viewport::new(api);

    let model = CompiledModel {
        model_id: shared::domain::ModelId::from("model-1"),
        mesh_url: "/api/model/model-1/mesh".to_string(),
        meta: None,
    };
    let result = SelectionResult {
        expression: ".faces()".to_string(),
        counts: Default::default(),
        items: Vec::new(),
        preview_mesh_url: Some("/api/selection/model-1/preview/missing.glb".to_string()),
    };

    let frame = viewport
        .render_session(Some(&model), Some(&result), DisplayMode::ShowBase)
        .await;

    assert_eq!(frame.drawn().count(), 1);
    assert_eq!(frame.failures().count(), 1);
    assert_eq!(
        backend.mesh_requests().await.len(),
        2,
        "both assets requested concurrently"
    );
}

#[tokio::test]
async fn cache_only_keeps_meshes_of_latest_render() {
    let viewport = Viewport::new(Arc::new(TestMeshFetcher::ok()));

    for n in 0..200 {
        let preview = format!("/api/selection/model-1/preview/sel-{n}.glb");
        viewport
            .render(
                Some("/api/model/model-1/mesh"),
                Some(&preview),
                DisplayMode::ShowBase,
            )
            .await;
        assert!(viewport.cached_assets().await <= 2, "render {n}");
    }
}

#[tokio::test]
async fn hidden_base_stays_cached_while_highlight_only() {
    let fetcher = TestMeshFetcher::ok();
    let fetched = fetcher.fetched.clone();
    let viewport = Viewport::new(Arc::new(fetcher));

    viewport
        .render(Some("base.glb"), Some("p.glb"), DisplayMode::ShowBase)
        .await;
    viewport
        .render(Some("base.glb"), Some("p.glb"), DisplayMode::HighlightOnly)
        .await;
    viewport
        .render(Some("base.glb"), Some("p.glb"), DisplayMode::ShowBase)
        .await;

    assert_eq!(fetched.lock().await.len(), 2);
}

#[test]
fn pending_session_frame_follows_layer_policy() {
    let model = CompiledModel {
        model_id: shared::domain::ModelId::from("model-1"),
        mesh_url: "/api/model/model-1/mesh".to_string(),
        meta: None,
    };
    let frame = pending_session(Some(&model), None, DisplayMode::ShowBase);
    assert!(frame.is_loading());
    assert_eq!(frame.layers.len(), 1);

    let frame = pending_session(Some(&model), None, DisplayMode::HighlightOnly);
    assert!(!frame.is_loading());
}
