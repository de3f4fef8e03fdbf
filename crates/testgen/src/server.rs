use crate::backend::{GenerationBackend, RigBackend};
use crate::config::{BackendOptions, GithubOptions};
use crate::github::{ContentAggregator, GithubAggregator};
use crate::pipeline::Pipeline;
use crate::prelude::{eprintln, *};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use testgen_core::api::{
    CodeResponse, CodeStateResponse, FileContentsRequest, GenerateCodeRequest,
    GenerateSummariesRequest, RawSummariesResponse, RequestCodeBody, SessionResponse,
    SummariesResponse,
};
use testgen_core::{build_code_prompt, build_summary_prompt, CodeGenerationState, FileRecord};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

#[derive(Debug, clap::Args)]
pub struct ServeOptions {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "5000")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Origin allowed to call the API (repeatable; none means any origin)
    #[arg(
        long = "allowed-origin",
        env = "FRONTEND_URL",
        value_delimiter = ',',
        default_value = "http://localhost:3000"
    )]
    allowed_origins: Vec<String>,

    #[command(flatten)]
    github: GithubOptions,

    #[command(flatten)]
    backend: BackendOptions,
}

#[derive(Clone)]
pub struct AppState {
    /// `None` when the repository is not configured; listing and fetching
    /// then answer 400 while generation keeps working.
    aggregator: Option<Arc<dyn ContentAggregator>>,
    backend: Arc<dyn GenerationBackend>,
    pipeline: Pipeline,
}

impl AppState {
    pub fn new(
        aggregator: Option<Arc<dyn ContentAggregator>>,
        backend: Arc<dyn GenerationBackend>,
        policy: testgen_core::ResolutionPolicy,
    ) -> Self {
        Self {
            aggregator,
            pipeline: Pipeline::new(Arc::clone(&backend), policy),
            backend,
        }
    }

    fn aggregator(&self) -> Result<&Arc<dyn ContentAggregator>, ApiError> {
        self.aggregator.as_ref().ok_or_else(|| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                "Missing owner, repo, or branch",
            )
        })
    }
}

pub fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .map(|o| HeaderValue::from_str(o).map_err(|e| eyre!("Invalid origin '{}': {}", o, e)))
        .collect::<Result<Vec<_>>>()?;

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/files", get(list_files))
        .route("/file-contents", post(file_contents))
        .route("/generate-test-summaries", post(generate_test_summaries))
        .route("/generate-code", post(generate_code))
        .route("/session", get(session).delete(reset_session))
        .route("/session/summaries", post(session_summaries))
        .route(
            "/session/code/{index}",
            get(session_code).post(request_session_code),
        )
        .layer(cors)
        .with_state(state)
}

pub async fn run(options: ServeOptions, global: crate::Global) -> Result<()> {
    let aggregator: Option<Arc<dyn ContentAggregator>> = match options.github.into_config() {
        Ok(config) => Some(Arc::new(GithubAggregator::new(config)?)),
        Err(e) => {
            log::error!("{e}");
            None
        }
    };

    let backend_config = options.backend.into_config()?;
    let backend: Arc<dyn GenerationBackend> = Arc::new(RigBackend::from_config(&backend_config)?);
    let state = AppState::new(aggregator, backend, backend_config.resolution);

    let cors = cors_layer(&options.allowed_origins)?;
    let app_router = router(state, cors);

    let addr = format!("{}:{}", options.host, options.port);

    if global.verbose {
        eprintln!("Provider: {:?}", backend_config.provider);
        eprintln!("Model: {}", backend_config.model);
        eprintln!("Allowed origins: {:?}", options.allowed_origins);
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| eyre!("Failed to bind to {}: {}", addr, e))?;

    log::info!("Backend running on http://{addr}");

    axum::serve(listener, app_router)
        .await
        .map_err(|e| eyre!("Server error: {e}"))?;

    Ok(())
}

async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let files = state.aggregator()?.list_files().await?;
    Ok(Json(files))
}

async fn file_contents(
    State(state): State<AppState>,
    Json(request): Json<FileContentsRequest>,
) -> Result<Json<Vec<FileRecord>>, ApiError> {
    let aggregator = state.aggregator()?;
    let records = aggregator.fetch_contents(&request.files).await?;
    Ok(Json(records))
}

/// Stateless: returns the model's raw text, the client splits it.
async fn generate_test_summaries(
    State(state): State<AppState>,
    Json(request): Json<GenerateSummariesRequest>,
) -> Result<Json<RawSummariesResponse>, ApiError> {
    let prompt = build_summary_prompt(&request.files)?;
    let summaries = state
        .backend
        .complete(&prompt)
        .await
        .map_err(testgen_core::Error::generation)?;
    Ok(Json(RawSummariesResponse { summaries }))
}

async fn generate_code(
    State(state): State<AppState>,
    Json(request): Json<GenerateCodeRequest>,
) -> Result<Json<CodeResponse>, ApiError> {
    let prompt = build_code_prompt(&request.summary)?;
    let code = state.backend.complete(&prompt).await?;
    Ok(Json(CodeResponse { code }))
}

async fn session(State(state): State<AppState>) -> Json<SessionResponse> {
    Json(state.pipeline.snapshot())
}

async fn reset_session(State(state): State<AppState>) -> Json<SessionResponse> {
    state.pipeline.reset();
    Json(state.pipeline.snapshot())
}

async fn session_summaries(
    State(state): State<AppState>,
    Json(request): Json<GenerateSummariesRequest>,
) -> Result<Json<SummariesResponse>, ApiError> {
    let summaries = state.pipeline.generate_summaries(&request.files).await?;
    Ok(Json(SummariesResponse { summaries }))
}

/// Fire-and-forget: answers 202 with the pending state, the result is read
/// back through `GET /session/code/{index}`.
async fn request_session_code(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    body: Bytes,
) -> Result<(StatusCode, Json<CodeStateResponse>), ApiError> {
    let body: RequestCodeBody = if body.is_empty() {
        RequestCodeBody::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid body: {e}")))?
    };

    // The task detaches; `begin_code` already recorded the pending state.
    match body.summary {
        Some(summary) => state.pipeline.request_code(index, &summary)?,
        None => state.pipeline.request_code_at(index)?,
    };

    Ok((
        StatusCode::ACCEPTED,
        Json(CodeStateResponse {
            index,
            state: CodeGenerationState::pending(),
        }),
    ))
}

async fn session_code(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<CodeStateResponse>, ApiError> {
    let code_state = state
        .pipeline
        .code_state(index)
        .ok_or_else(|| ApiError::not_found(format!("No code requested for summary {index}")))?;

    Ok(Json(CodeStateResponse {
        index,
        state: code_state,
    }))
}
