use std::{
    collections::HashSet,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    handler::Handler,
    http::{HeaderValue, Method, Uri},
    routing::post,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::{Semaphore, SemaphorePermit};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    catalog::{CatalogLabels, FormatCatalog},
    config::{AppConfig, normalize_origin},
    engine::{DEFAULT_SELECTOR, DownloadJob, MediaEngine, OutputPolicy, ProbePurpose, RawMedia},
    error::{ApiError, EngineError},
    info::MediaSummary,
    messages::{Locale, Message},
};

/// URL prefix under which the download directory is served.
pub const DOWNLOADS_PREFIX: &str = "/downloads";

#[derive(Clone)]
pub struct AppState {
    engine: Arc<dyn MediaEngine>,
    locale: Locale,
    download_dir: PathBuf,
    static_dir: PathBuf,
    job_gate: Arc<Semaphore>,
}

impl AppState {
    pub fn new(engine: Arc<dyn MediaEngine>, config: &AppConfig) -> Self {
        Self {
            engine,
            locale: config.locale,
            download_dir: config.download_dir.clone(),
            static_dir: config.static_dir.clone(),
            job_gate: Arc::new(Semaphore::new(config.max_concurrent_jobs)),
        }
    }

    async fn acquire_job(&self) -> Result<SemaphorePermit<'_>, ApiError> {
        self.job_gate
            .acquire()
            .await
            .map_err(|_| ApiError::internal(self.locale.text(Message::Internal)))
    }

    async fn probe(
        &self,
        url: &str,
        purpose: ProbePurpose,
        operation: Message,
    ) -> Result<RawMedia, ApiError> {
        let _permit = self.acquire_job().await?;
        self.engine
            .probe(url, purpose)
            .await
            .map_err(|error| self.engine_failure(operation, url, &error))
    }

    fn engine_failure(&self, operation: Message, url: &str, error: &EngineError) -> ApiError {
        warn!("Engine call failed for URL {:?}: {}", url, error);
        ApiError::from_engine(self.locale, operation, error)
    }
}

#[derive(Debug, Deserialize)]
pub struct MediaRequest {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub url: Option<String>,
    pub format: Option<String>,
    pub is_playlist: Option<bool>,
    pub is_sound_cloud: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub success: bool,
    pub info: MediaSummary,
}

#[derive(Debug, Serialize)]
pub struct FormatsResponse {
    pub success: bool,
    #[serde(flatten)]
    pub catalog: FormatCatalog,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub success: bool,
    pub url: String,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct DirectoryListing {
    pub success: bool,
    pub entries: Vec<DirectoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub url: String,
    pub is_dir: bool,
}

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    let static_files = ServeDir::new(&state.static_dir)
        .call_fallback_on_method_not_allowed(true)
        .fallback(not_found.with_state(state.clone()));
    let downloads = ServeDir::new(&state.download_dir)
        .append_index_html_on_directories(false)
        .fallback(browse_downloads.with_state(state.clone()));

    let app = Router::new()
        .route("/video_info", post(video_info))
        .route("/list_formats", post(list_formats))
        .route("/download", post(download))
        .nest_service(DOWNLOADS_PREFIX, downloads)
        .fallback_service(static_files)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    match cors_layer(allowed_origins) {
        Some(cors) => app.layer(cors),
        None => app,
    }
}

pub async fn video_info(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<InfoResponse>, ApiError> {
    let request: MediaRequest = decode_body(state.locale, &body)?;
    let url = require_url(state.locale, request.url.as_deref())?;

    let media = state
        .probe(&url, ProbePurpose::Metadata, Message::InfoFailed)
        .await?;

    Ok(Json(InfoResponse {
        success: true,
        info: MediaSummary::from_media(&media, state.locale),
    }))
}

pub async fn list_formats(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<FormatsResponse>, ApiError> {
    let request: MediaRequest = decode_body(state.locale, &body)?;
    let url = require_url(state.locale, request.url.as_deref())?;

    let media = state
        .probe(&url, ProbePurpose::Formats, Message::FormatsFailed)
        .await?;
    let catalog = FormatCatalog::for_media(&media, CatalogLabels::for_locale(state.locale));
    debug!(
        "Catalog for {:?}: {} format(s), {} bytes total",
        url,
        catalog.formats.len(),
        catalog.total_size
    );

    Ok(Json(FormatsResponse {
        success: true,
        catalog,
    }))
}

pub async fn download(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DownloadResponse>, ApiError> {
    let request: DownloadRequest = decode_body(state.locale, &body)?;
    let url = require_url(state.locale, request.url.as_deref())?;

    let policy = OutputPolicy::from_flags(
        request.is_playlist.unwrap_or(false),
        request.is_sound_cloud.unwrap_or(false),
    );
    let job = DownloadJob {
        url,
        selector: request
            .format
            .filter(|format| !format.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SELECTOR.to_string()),
        policy,
    };
    let operation = match policy {
        OutputPolicy::Playlist => Message::PlaylistDownloadFailed,
        OutputPolicy::Single => Message::DownloadFailed,
        OutputPolicy::Audio => Message::AudioDownloadFailed,
    };

    info!(
        "Downloading {:?} with selector {:?} as {:?}",
        job.url, job.selector, policy
    );
    let outcome = {
        let _permit = state.acquire_job().await?;
        state
            .engine
            .download(&job)
            .await
            .map_err(|error| state.engine_failure(operation, &job.url, &error))?
    };

    let title = outcome.title.unwrap_or_else(|| {
        let fallback = match policy {
            OutputPolicy::Playlist => Message::DownloadedPlaylistTitle,
            OutputPolicy::Single | OutputPolicy::Audio => Message::Unknown,
        };
        state.locale.text(fallback).to_string()
    });

    Ok(Json(DownloadResponse {
        success: true,
        url: download_url(&outcome.relative_path),
        title,
    }))
}

pub async fn not_found(State(state): State<AppState>) -> ApiError {
    ApiError::not_found(state.locale.text(Message::PageNotFound))
}

/// Lists a directory under the download root, such as a downloaded playlist.
///
/// Reached for every path the file server could not answer, so anything that
/// is not a readable directory gets the not-found envelope.
pub async fn browse_downloads(
    State(state): State<AppState>,
    uri: Uri,
) -> Result<Json<DirectoryListing>, ApiError> {
    let not_found = || ApiError::not_found(state.locale.text(Message::PageNotFound));
    let relative = listing_path(uri.path()).ok_or_else(not_found)?;

    let mut reader = tokio::fs::read_dir(state.download_dir.join(&relative))
        .await
        .map_err(|_| not_found())?;

    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await.map_err(|error| {
        warn!("Could not list {:?}: {error}", relative);
        ApiError::internal(state.locale.text(Message::Internal))
    })? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = entry
            .file_type()
            .await
            .map(|kind| kind.is_dir())
            .unwrap_or(false);
        entries.push(DirectoryEntry {
            url: download_url(&relative.join(&name)),
            name,
            is_dir,
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(Json(DirectoryListing {
        success: true,
        entries,
    }))
}

/// Decoded request path relative to the download root; `None` if it tries to leave it.
fn listing_path(request_path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(request_path).ok()?;
    let mut relative = PathBuf::new();
    for component in Path::new(decoded.as_ref()).components() {
        match component {
            Component::Normal(segment) => relative.push(segment),
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) => return None,
        }
    }
    Some(relative)
}

fn decode_body<T: DeserializeOwned>(locale: Locale, body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|error| {
        debug!("Rejected request body: {error}");
        ApiError::bad_request(locale.text(Message::InvalidBody))
    })
}

/// Trimmed URL, rejected before any engine call when blank or not http(s).
fn require_url(locale: Locale, url: Option<&str>) -> Result<String, ApiError> {
    let url = url
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::bad_request(locale.text(Message::MissingUrl)))?;

    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => {
            Ok(url.to_string())
        }
        _ => Err(ApiError::bad_request(locale.text(Message::InvalidUrl))),
    }
}

/// Browser path of a file or directory relative to the download root.
pub fn download_url(relative_path: &Path) -> String {
    let mut url = DOWNLOADS_PREFIX.to_string();
    for component in relative_path.components() {
        if let Component::Normal(segment) = component {
            url.push('/');
            url.push_str(&urlencoding::encode(&segment.to_string_lossy()));
        }
    }
    url
}

fn cors_layer(allowed_origins: &[String]) -> Option<CorsLayer> {
    if allowed_origins.is_empty() {
        return None;
    }

    let allowed: Arc<HashSet<String>> = Arc::new(allowed_origins.iter().cloned().collect());
    info!(
        "CORS allow-list loaded with {} origin(s): {:?}",
        allowed.len(),
        allowed_origins
    );

    let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let normalized = origin.to_str().ok().and_then(normalize_origin);
        let permitted = normalized
            .as_ref()
            .is_some_and(|value| allowed.contains(value));
        debug!(
            "CORS origin check raw={:?} normalized={:?} allowed={}",
            origin, normalized, permitted
        );
        permitted
    });

    Some(
        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any),
    )
}
