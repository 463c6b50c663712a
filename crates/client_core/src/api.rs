use std::path::Path;

use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{CompiledModel, Example, ExampleId, Lesson, LessonId, SelectionResult},
    error::BackendRejection,
    protocol::{
        CompileJsonRequest, ExamplesResponse, HealthStatus, LessonsResponse, SelectionRunRequest,
    },
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{config::ClientSettings, error::ClientError};

/// File extensions offered by the upload picker. A hint only; the backend
/// makes the final call.
pub const UPLOAD_EXTENSIONS: &[&str] = &["step", "stp", "stl"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self { filename, bytes })
    }

    pub fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
    }

    pub fn has_supported_extension(&self) -> bool {
        self.extension()
            .is_some_and(|ext| UPLOAD_EXTENSIONS.contains(&ext.as_str()))
    }
}

/// Where a model comes from. Callers pick exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileSource {
    Inline(String),
    Example(ExampleId),
    Upload(UploadedFile),
}

impl CompileSource {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Inline(_) => "inline",
            Self::Example(_) => "example",
            Self::Upload(_) => "upload",
        }
    }

    pub fn into_body(self) -> CompileBody {
        match self {
            Self::Inline(source) => CompileBody::Json(CompileJsonRequest::source(source)),
            Self::Example(asset) => CompileBody::Json(CompileJsonRequest::asset(asset)),
            Self::Upload(file) => CompileBody::Multipart(file),
        }
    }
}

/// Wire shape of a compile request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileBody {
    Json(CompileJsonRequest),
    /// A single `file` part and nothing else.
    Multipart(UploadedFile),
}

#[async_trait]
pub trait TutorialApi: Send + Sync {
    async fn list_lessons(&self) -> Result<Vec<Lesson>, ClientError>;
    async fn list_examples(&self) -> Result<Vec<Example>, ClientError>;
    async fn get_lesson(&self, id: &LessonId) -> Result<Lesson, ClientError>;
    async fn compile_model(&self, source: CompileSource) -> Result<CompiledModel, ClientError>;
    async fn run_selection(
        &self,
        request: SelectionRunRequest,
    ) -> Result<SelectionResult, ClientError>;
    async fn health(&self) -> Result<HealthStatus, ClientError>;
}

pub struct HttpTutorialApi {
    http: Client,
    api_base: String,
    base_url: Url,
}

impl HttpTutorialApi {
    pub fn new(api_base: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_client(Client::new(), api_base)
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|err| ClientError::Network(err.to_string()))?;
        Self::with_client(http, settings.api_base.clone())
    }

    fn with_client(http: Client, api_base: impl Into<String>) -> Result<Self, ClientError> {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        // Trailing slash so relative joins stay under the api prefix.
        let base_url = Url::parse(&format!("{api_base}/")).map_err(|err| {
            ClientError::InvalidUrl {
                url: api_base.clone(),
                message: err.to_string(),
            }
        })?;
        Ok(Self {
            http,
            api_base,
            base_url,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }

    /// Backend asset URLs are usually root-relative (`/api/model/<id>/mesh`).
    pub fn resolve_asset_url(&self, raw: &str) -> Result<Url, ClientError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ClientError::InvalidUrl {
                url: raw.to_string(),
                message: "empty asset url".to_string(),
            });
        }
        self.base_url
            .join(raw)
            .map_err(|err| ClientError::InvalidUrl {
                url: raw.to_string(),
                message: err.to_string(),
            })
    }

    pub async fn fetch_asset(&self, raw_url: &str) -> Result<Vec<u8>, ClientError> {
        let url = self.resolve_asset_url(raw_url)?;
        debug!("api: GET asset url={url}");
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound {
                what: format!("asset {}", url.path()),
                detail: rejection(response).await.detail,
            });
        }
        if !status.is_success() {
            return Err(unexpected(url.path(), rejection(response).await));
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<Response, ClientError> {
        debug!("api: request endpoint={endpoint}");
        request.send().await.map_err(|err| {
            warn!("api: transport failure endpoint={endpoint} error={err}");
            ClientError::from(err)
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ClientError> {
        let response = self
            .send(endpoint, self.http.get(self.endpoint(endpoint)))
            .await?;
        if !response.status().is_success() {
            return Err(unexpected(endpoint, rejection(response).await));
        }
        read_json(response, endpoint).await
    }

    /// `<base>/lessons/<id>` with the id as one percent-encoded segment.
    fn lesson_url(&self, id: &LessonId) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl {
                url: self.api_base.clone(),
                message: "api base cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .push("lessons")
            .push(id.as_str());
        Ok(url)
    }
}

#[async_trait]
impl TutorialApi for HttpTutorialApi {
    async fn list_lessons(&self) -> Result<Vec<Lesson>, ClientError> {
        let body: LessonsResponse = self.get_json("/lessons").await?;
        debug!("api: lessons fetched count={}", body.lessons.len());
        Ok(body.lessons)
    }

    async fn list_examples(&self) -> Result<Vec<Example>, ClientError> {
        let body: ExamplesResponse = self.get_json("/examples").await?;
        debug!("api: examples fetched count={}", body.examples.len());
        Ok(body.examples)
    }

    async fn get_lesson(&self, id: &LessonId) -> Result<Lesson, ClientError> {
        let endpoint = format!("/lessons/{id}");
        let response = self
            .send(&endpoint, self.http.get(self.lesson_url(id)?))
            .await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound {
                what: format!("lesson {id}"),
                detail: rejection(response).await.detail,
            });
        }
        if !status.is_success() {
            return Err(unexpected(&endpoint, rejection(response).await));
        }
        read_json(response, &endpoint).await
    }

    async fn compile_model(&self, source: CompileSource) -> Result<CompiledModel, ClientError> {
        let endpoint = "/model/compile";
        let kind = source.kind();
        let request = match source.into_body() {
            CompileBody::Json(body) => self.http.post(self.endpoint(endpoint)).json(&body),
            CompileBody::Multipart(file) => {
                let part = multipart::Part::bytes(file.bytes).file_name(file.filename);
                let form = multipart::Form::new().part("file", part);
                self.http.post(self.endpoint(endpoint)).multipart(form)
            }
        };

        let response = self.send(endpoint, request).await?;
        let status = response.status();
        if matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY
        ) {
            let rejection = rejection(response).await;
            warn!("api: compile rejected source={kind} {rejection}");
            return Err(ClientError::Compile {
                detail: rejection.detail,
            });
        }
        if !status.is_success() {
            return Err(unexpected(endpoint, rejection(response).await));
        }

        let model: CompiledModel = read_json(response, endpoint).await?;
        info!(
            "api: model compiled source={kind} model_id={}",
            model.model_id
        );
        Ok(model)
    }

    async fn run_selection(
        &self,
        request: SelectionRunRequest,
    ) -> Result<SelectionResult, ClientError> {
        let endpoint = "/selection/run";
        let response = self
            .send(endpoint, self.http.post(self.endpoint(endpoint)).json(&request))
            .await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound {
                what: format!("model {}", request.model_id),
                detail: rejection(response).await.detail,
            });
        }
        if matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY
        ) {
            return Err(ClientError::Selection {
                detail: rejection(response).await.detail,
            });
        }
        if !status.is_success() {
            return Err(unexpected(endpoint, rejection(response).await));
        }

        let mut result: SelectionResult = read_json(response, endpoint).await?;
        result.expression = request.selection;
        debug!(
            "api: selection evaluated model_id={} matched={}",
            request.model_id,
            result.counts.total()
        );
        Ok(result)
    }

    async fn health(&self) -> Result<HealthStatus, ClientError> {
        self.get_json("/health").await
    }
}

async fn rejection(response: Response) -> BackendRejection {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    BackendRejection::from_body(status, &body)
}

fn unexpected(endpoint: &str, rejection: BackendRejection) -> ClientError {
    warn!("api: endpoint={endpoint} {rejection}");
    ClientError::UnexpectedStatus {
        endpoint: endpoint.to_string(),
        status: rejection.status,
        detail: rejection.detail,
    }
}

async fn read_json<T: DeserializeOwned>(
    response: Response,
    endpoint: &str,
) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| ClientError::Decode {
        endpoint: endpoint.to_string(),
        message: err.to_string(),
    })
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
