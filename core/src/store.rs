use crate::catalog::InteractionSource;
use crate::error::{CoreError, Result};
use crate::model::TrainedModel;
use crate::persist;
use crate::ranker::{self, Recommendation};
use crate::similarity::SimilarityMatrix;
use crate::vectorizer::VectorizerConfig;
use crate::{JobId, JobRecord, UserId};
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Process-wide owner of the live model.
///
/// Readers take an `Arc` snapshot and never observe a half-built model.
/// Writers serialize on `writer`, build the replacement off to the side, and
/// publish it with a single pointer swap.
pub struct ModelStore {
    config: VectorizerConfig,
    current: ArcSwapOption<TrainedModel>,
    writer: Mutex<()>,
}

impl ModelStore {
    pub fn new(config: VectorizerConfig) -> Self {
        Self { config, current: ArcSwapOption::empty(), writer: Mutex::new(()) }
    }

    /// Current model, or `EmptyCorpus` when nothing has been fitted/loaded.
    pub fn snapshot(&self) -> Result<Arc<TrainedModel>> {
        self.current.load_full().ok_or(CoreError::EmptyCorpus)
    }

    /// Train from scratch on `jobs`, discarding the previous model.
    pub fn fit(&self, jobs: Vec<JobRecord>) -> Result<Arc<TrainedModel>> {
        let _guard = self.writer.lock();
        let model = Arc::new(TrainedModel::fit(jobs, self.config)?);
        self.current.store(Some(model.clone()));
        Ok(model)
    }

    /// Fold `new_jobs` into the corpus and refit everything. Ids already in
    /// the corpus are replaced in place; unseen ids are appended.
    pub fn update(&self, new_jobs: Vec<JobRecord>) -> Result<Arc<TrainedModel>> {
        let _guard = self.writer.lock();
        let mut seen = HashSet::with_capacity(new_jobs.len());
        for job in &new_jobs {
            if !seen.insert(job.id()) {
                return Err(CoreError::DuplicateJob(job.id()));
            }
        }

        let previous = self.current.load_full();
        let mut combined: Vec<JobRecord> = previous.as_ref().map(|m| m.jobs().to_vec()).unwrap_or_default();
        let (mut replaced, mut appended) = (0usize, 0usize);
        for job in new_jobs {
            match previous.as_ref().and_then(|m| m.position(job.id())) {
                Some(i) => {
                    combined[i] = job;
                    replaced += 1;
                }
                None => {
                    combined.push(job);
                    appended += 1;
                }
            }
        }

        let model = Arc::new(TrainedModel::fit(combined, self.config)?);
        if previous.as_ref().is_some_and(|m| m.precomputed().is_some()) {
            tracing::warn!("dropping precomputed similarity matrix after refit");
        }
        tracing::info!(replaced, appended, num_jobs = model.len(), "corpus updated");
        self.current.store(Some(model.clone()));
        Ok(model)
    }

    /// Attach a precomputed job-to-job matrix to the live model.
    pub fn attach_similarity(&self, matrix: SimilarityMatrix) -> Result<()> {
        let _guard = self.writer.lock();
        let current = self.snapshot()?;
        let model = (*current).clone().with_similarity(matrix)?;
        self.current.store(Some(Arc::new(model)));
        tracing::info!("precomputed similarity matrix attached");
        Ok(())
    }

    /// Checkpoint the live model as one artifact.
    pub fn save(&self, path: &Path) -> Result<()> {
        let model = self.snapshot()?;
        persist::save_model(path, &model)
    }

    /// Replace the live model with the artifact at `path`. On failure the
    /// previous model stays published.
    pub fn load(&self, path: &Path) -> Result<Arc<TrainedModel>> {
        let _guard = self.writer.lock();
        let model = Arc::new(persist::load_model(path)?);
        self.current.store(Some(model.clone()));
        Ok(model)
    }

    pub fn recommend_by_skills<S: AsRef<str>>(&self, skills: &[S], n: usize) -> Result<Vec<Recommendation>> {
        ranker::by_skills(&*self.snapshot()?, skills, n)
    }

    pub fn recommend_similar(&self, job_id: JobId, n: usize) -> Result<Vec<Recommendation>> {
        ranker::similar_to(&*self.snapshot()?, job_id, n)
    }

    /// Recommend from the user's most recent interaction, or a random
    /// fallback sample when the user has none.
    pub fn recommend_for_user<I, R>(&self, source: &I, user_id: UserId, n: usize, rng: &mut R) -> Result<Vec<Recommendation>>
    where
        I: InteractionSource + ?Sized,
        R: Rng + ?Sized,
    {
        let model = self.snapshot()?;
        match source.latest_interaction(user_id)? {
            Some(interaction) => {
                tracing::info!(user_id, job_id = interaction.job_id, "recommending from latest interaction");
                ranker::similar_to(&model, interaction.job_id, n)
            }
            None => {
                tracing::info!(user_id, "no interactions; returning fallback sample");
                ranker::fallback(&model, n, rng)
            }
        }
    }
}
