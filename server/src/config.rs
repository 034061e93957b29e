use jobrec::VectorizerConfig;
use std::path::PathBuf;

pub const MAX_TOP_N: usize = 100;

/// Everything `build_app` needs, collected from CLI flags and environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Model artifact loaded at startup and written by checkpoints.
    pub model_path: PathBuf,
    /// Jobs file fitted at startup when no artifact exists yet.
    pub jobs_path: Option<PathBuf>,
    /// Optional precomputed job-to-job similarity matrix.
    pub similarity_path: Option<PathBuf>,
    /// sled directory for interactions and job metadata.
    pub catalog_dir: PathBuf,
    pub default_top_n: usize,
    pub vectorizer: VectorizerConfig,
    /// Refit the live model whenever job metadata is updated.
    pub refit_on_metadata_update: bool,
    pub admin_token: Option<String>,
    /// Allow admin routes without a token when `admin_token` is unset.
    pub insecure_admin: bool,
    /// Comma-separated allowed origins; any origin when unset.
    pub cors_allow_origin: Option<String>,
}

impl ServerConfig {
    pub fn new(model_path: impl Into<PathBuf>, catalog_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            jobs_path: None,
            similarity_path: None,
            catalog_dir: catalog_dir.into(),
            default_top_n: 5,
            vectorizer: VectorizerConfig::default(),
            refit_on_metadata_update: false,
            admin_token: None,
            insecure_admin: false,
            cors_allow_origin: None,
        }
    }

    /// Fill `ADMIN_TOKEN` and `CORS_ALLOW_ORIGIN` from the environment.
    pub fn with_env(mut self) -> Self {
        self.admin_token = std::env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty());
        self.cors_allow_origin = std::env::var("CORS_ALLOW_ORIGIN").ok();
        self
    }

    pub fn top_n(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_top_n).clamp(1, MAX_TOP_N)
    }
}
