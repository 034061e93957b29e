pub mod config;
pub mod error;

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use jobrec::persist::{load_similarity, read_jobs_file};
use jobrec::{Catalog, JobId, JobInput, JobRecord, ModelStore, Recommendation, UserId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ModelStore>,
    pub catalog: Arc<Catalog>,
    pub config: Arc<ServerConfig>,
}

#[derive(Deserialize)]
pub struct SkillsRequest {
    pub skills: Vec<String>,
    #[serde(default)]
    pub top_n: Option<usize>,
}

#[derive(Deserialize)]
pub struct TopNParams {
    #[serde(default)]
    pub top_n: Option<usize>,
}

#[derive(Serialize)]
pub struct JobScore {
    pub job_id: JobId,
    pub title: String,
    pub score: f32,
}

#[derive(Serialize)]
pub struct UserJobScore {
    pub job_id: JobId,
    pub title: String,
    pub score: f32,
    /// True when the job is random filler rather than a similarity match.
    pub fallback: bool,
}

#[derive(Serialize)]
pub struct UserRecommendations {
    pub user_id: UserId,
    pub recommended_jobs: Vec<UserJobScore>,
}

#[derive(Deserialize)]
pub struct InteractionCreate {
    pub user_id: UserId,
    pub job_id: JobId,
    pub interaction_type: String,
    pub interaction_value: f64,
}

#[derive(Deserialize)]
pub struct JobMetadataCreate {
    pub job_id: JobId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub skills: Vec<String>,
}

#[derive(Serialize)]
pub struct Ack {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_jobs: Option<usize>,
}

impl Ack {
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), num_jobs: None }
    }

    fn with_jobs(message: impl Into<String>, num_jobs: usize) -> Self {
        Self { message: message.into(), num_jobs: Some(num_jobs) }
    }
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub loaded: bool,
    pub num_jobs: usize,
    pub vocab_size: usize,
    pub precomputed_similarity: bool,
}

impl From<Recommendation> for JobScore {
    fn from(r: Recommendation) -> Self {
        Self { job_id: r.job.id(), title: r.job.title().to_string(), score: r.score }
    }
}

impl From<Recommendation> for UserJobScore {
    fn from(r: Recommendation) -> Self {
        let fallback = r.is_fallback();
        Self { job_id: r.job.id(), title: r.job.title().to_string(), score: r.score, fallback }
    }
}

/// Open the catalog, bring up the model store and build the router.
pub fn build_app(config: ServerConfig) -> Result<Router> {
    let catalog = Catalog::open(&config.catalog_dir)
        .with_context(|| format!("opening catalog at {}", config.catalog_dir.display()))?;
    let store = init_store(&config)?;
    if config.admin_token.is_none() {
        if config.insecure_admin {
            tracing::warn!("ADMIN_TOKEN not set and --insecure-admin given; admin routes are unprotected");
        } else {
            tracing::warn!("ADMIN_TOKEN not set; admin routes are disabled");
        }
    }
    let state = AppState { store: Arc::new(store), catalog: Arc::new(catalog), config: Arc::new(config) };
    Ok(router(state))
}

/// Startup order: persisted artifact, else the jobs seed file, else empty.
/// A corrupt artifact is fatal; a bad similarity file only disables the cache.
pub fn init_store(config: &ServerConfig) -> Result<ModelStore> {
    let store = ModelStore::new(config.vectorizer);
    if config.model_path.exists() {
        store.load(&config.model_path)?;
    } else if let Some(jobs_path) = &config.jobs_path {
        let jobs = read_jobs_file(jobs_path).with_context(|| format!("reading {}", jobs_path.display()))?;
        store.fit(jobs)?;
        store.save(&config.model_path)?;
    } else {
        tracing::warn!(model = %config.model_path.display(), "no model artifact or jobs file; starting with an empty corpus");
    }

    if let Some(sim_path) = &config.similarity_path {
        match load_similarity(sim_path).and_then(|m| store.attach_similarity(m)) {
            Ok(()) => {}
            Err(e) => tracing::warn!(error = %e, "precomputed similarity ignored; computing on demand"),
        }
    }
    Ok(store)
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_allow_origin.as_deref());
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/stats", get(stats_handler))
        .route("/recommendations", post(recommend_by_skills))
        .route("/api/recommendations/interactions", post(log_interaction))
        .route("/api/recommendations/job-metadata", post(update_job_metadata))
        .route("/api/recommendations/:user_id", get(recommend_for_user))
        .route("/jobs/:job_id/similar", get(similar_jobs))
        .route("/update_model", post(update_model))
        .route("/admin/refresh", post(refresh_corpus))
        .route("/admin/checkpoint", post(checkpoint))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(allow_origin: Option<&str>) -> CorsLayer {
    let origins: Vec<_> = allow_origin
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
    }
}

pub async fn recommend_by_skills(
    State(state): State<AppState>,
    payload: Result<Json<SkillsRequest>, JsonRejection>,
) -> Result<Json<Vec<JobScore>>, ApiError> {
    let Json(req) = payload?;
    if req.skills.iter().all(|s| s.trim().is_empty()) {
        return Err(ApiError::BadRequest("skills must not be empty".into()));
    }
    let n = state.config.top_n(req.top_n);
    let recs = state.store.recommend_by_skills(req.skills.as_slice(), n)?;
    Ok(Json(recs.into_iter().map(JobScore::from).collect()))
}

pub async fn recommend_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(params): Query<TopNParams>,
) -> Result<Json<UserRecommendations>, ApiError> {
    let n = state.config.top_n(params.top_n);
    let mut rng = StdRng::from_entropy();
    let recs = state.store.recommend_for_user(&*state.catalog, user_id, n, &mut rng)?;
    Ok(Json(UserRecommendations { user_id, recommended_jobs: recs.into_iter().map(UserJobScore::from).collect() }))
}

pub async fn similar_jobs(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
    Query(params): Query<TopNParams>,
) -> Result<Json<Vec<JobScore>>, ApiError> {
    let n = state.config.top_n(params.top_n);
    let recs = state.store.recommend_similar(job_id, n)?;
    Ok(Json(recs.into_iter().map(JobScore::from).collect()))
}

pub async fn log_interaction(
    State(state): State<AppState>,
    payload: Result<Json<InteractionCreate>, JsonRejection>,
) -> Result<Json<Ack>, ApiError> {
    let Json(req) = payload?;
    state.catalog.log_interaction(req.user_id, req.job_id, &req.interaction_type, req.interaction_value)?;
    Ok(Json(Ack::new("Interaction logged successfully")))
}

/// Stores metadata; the live vectors only change here when
/// `refit_on_metadata_update` is set, otherwise on `/admin/refresh`.
pub async fn update_job_metadata(
    State(state): State<AppState>,
    payload: Result<Json<JobMetadataCreate>, JsonRejection>,
) -> Result<Json<Ack>, ApiError> {
    let Json(req) = payload?;
    let meta = state.catalog.upsert_job_metadata(req.job_id, &req.title, &req.description, req.skills)?;
    if !state.config.refit_on_metadata_update {
        tracing::debug!(job_id = meta.job_id, "metadata stored; live model unchanged until refresh");
        return Ok(Json(Ack::new("Job metadata updated successfully")));
    }
    let record = meta.to_job_record()?;
    let store = state.store.clone();
    let model = blocking(move || store.update(vec![record])).await?;
    Ok(Json(Ack::with_jobs("Job metadata updated and model refitted", model.len())))
}

pub async fn update_model(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<Vec<JobInput>>, JsonRejection>,
) -> Result<Json<Ack>, ApiError> {
    authorize(&state, &headers)?;
    let Json(inputs) = payload?;
    if inputs.is_empty() {
        return Err(ApiError::BadRequest("no jobs supplied".into()));
    }
    let jobs = inputs.into_iter().map(JobInput::into_record).collect::<jobrec::Result<Vec<JobRecord>>>()?;
    let store = state.store.clone();
    let model = blocking(move || store.update(jobs)).await?;
    Ok(Json(Ack::with_jobs("Model updated successfully", model.len())))
}

/// Fold every stored metadata record into the corpus and refit.
pub async fn refresh_corpus(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Ack>, ApiError> {
    authorize(&state, &headers)?;
    let records = state
        .catalog
        .all_job_metadata()?
        .iter()
        .map(|m| m.to_job_record())
        .collect::<jobrec::Result<Vec<_>>>()?;
    if records.is_empty() {
        return Err(ApiError::BadRequest("no job metadata stored".into()));
    }
    let store = state.store.clone();
    let model = blocking(move || store.update(records)).await?;
    tracing::info!(num_jobs = model.len(), "recommendation data refreshed");
    Ok(Json(Ack::with_jobs("Recommendation data refreshed", model.len())))
}

pub async fn checkpoint(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Ack>, ApiError> {
    authorize(&state, &headers)?;
    let store = state.store.clone();
    let path = state.config.model_path.clone();
    blocking(move || store.save(&path)).await?;
    Ok(Json(Ack::new("Model checkpoint written")))
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = match state.store.snapshot() {
        Ok(model) => StatsResponse {
            loaded: true,
            num_jobs: model.len(),
            vocab_size: model.vectorizer().vocab_size(),
            precomputed_similarity: model.precomputed().is_some(),
        },
        Err(_) => StatsResponse { loaded: false, num_jobs: 0, vocab_size: 0, precomputed_similarity: false },
    };
    Json(stats)
}

async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> jobrec::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.config.admin_token {
        Some(t) => t,
        None if state.config.insecure_admin => return Ok(()),
        None => return Err(ApiError::Unauthorized("ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid admin token".into()))
    }
}
