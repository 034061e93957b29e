use crate::error::{CoreError, Result};
use crate::similarity::{FeatureMatrix, SimilarityMatrix, SimilaritySource};
use crate::vectorizer::{TfidfVectorizer, VectorizerConfig};
use crate::{JobId, JobRecord};
use std::collections::HashMap;
use std::sync::Arc;

/// A fitted vectorizer together with the corpus it was fitted on.
///
/// Row `i` of the feature matrix always belongs to `jobs()[i]`.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    vectorizer: TfidfVectorizer,
    features: FeatureMatrix,
    jobs: Vec<JobRecord>,
    positions: HashMap<JobId, usize>,
    precomputed: Option<Arc<SimilarityMatrix>>,
}

impl TrainedModel {
    /// Fit from scratch. Fails on an empty corpus or duplicate ids.
    pub fn fit(jobs: Vec<JobRecord>, config: VectorizerConfig) -> Result<Self> {
        if jobs.is_empty() {
            return Err(CoreError::EmptyCorpus);
        }
        let positions = index_positions(&jobs)?;
        let documents: Vec<String> = jobs.iter().map(JobRecord::document).collect();
        let mut vectorizer = TfidfVectorizer::new(config);
        let rows = vectorizer.fit_transform(&documents);
        let features = FeatureMatrix::new(vectorizer.vocab_size(), rows);
        tracing::info!(num_jobs = jobs.len(), vocab_size = vectorizer.vocab_size(), "model fitted");
        Ok(Self { vectorizer, features, jobs, positions, precomputed: None })
    }

    /// Reassemble persisted parts, checking every cross-part invariant.
    pub fn from_parts(
        vectorizer: TfidfVectorizer,
        features: FeatureMatrix,
        jobs: Vec<JobRecord>,
    ) -> std::result::Result<Self, String> {
        vectorizer.validate()?;
        if jobs.is_empty() {
            return Err("artifact contains no jobs".into());
        }
        if features.len() != jobs.len() {
            return Err(format!("{} feature rows for {} jobs", features.len(), jobs.len()));
        }
        if features.dim() != vectorizer.vocab_size() {
            return Err(format!("feature dim {} != vocabulary size {}", features.dim(), vectorizer.vocab_size()));
        }
        for row in features.rows() {
            if row.dim() != features.dim() {
                return Err("feature row dimension mismatch".into());
            }
            let sorted = row.entries().windows(2).all(|w| w[0].0 < w[1].0);
            let in_range = row.entries().iter().all(|(t, w)| (*t as usize) < features.dim() && w.is_finite());
            if !sorted || !in_range {
                return Err("malformed feature row".into());
            }
        }
        let positions = index_positions(&jobs).map_err(|e| e.to_string())?;
        Ok(Self { vectorizer, features, jobs, positions, precomputed: None })
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer { &self.vectorizer }
    pub fn features(&self) -> &FeatureMatrix { &self.features }
    pub fn jobs(&self) -> &[JobRecord] { &self.jobs }
    pub fn len(&self) -> usize { self.jobs.len() }
    pub fn is_empty(&self) -> bool { self.jobs.is_empty() }
    pub fn position(&self, id: JobId) -> Option<usize> { self.positions.get(&id).copied() }
    pub fn job_ids(&self) -> Vec<JobId> { self.jobs.iter().map(JobRecord::id).collect() }
    pub fn precomputed(&self) -> Option<&SimilarityMatrix> { self.precomputed.as_deref() }

    /// Attach a precomputed job-to-job matrix; it must cover exactly this
    /// corpus in this order.
    pub fn with_similarity(mut self, matrix: SimilarityMatrix) -> Result<Self> {
        if !matrix.is_well_formed() || matrix.job_ids() != self.job_ids().as_slice() {
            return Err(CoreError::InvalidInput(
                "similarity matrix does not match the live corpus".into(),
            ));
        }
        self.precomputed = Some(Arc::new(matrix));
        Ok(self)
    }

    /// Compute the full job-to-job matrix for this corpus.
    pub fn compute_similarity(&self) -> SimilarityMatrix {
        SimilarityMatrix::compute(self.job_ids(), &self.features)
    }

    /// Scores of corpus row `row` against every row, from the precomputed
    /// matrix when attached.
    pub fn row_scores(&self, row: usize) -> Vec<f32> {
        match &self.precomputed {
            Some(matrix) => matrix.row_scores(row),
            None => self.features.row_scores(row),
        }
    }
}

fn index_positions(jobs: &[JobRecord]) -> Result<HashMap<JobId, usize>> {
    let mut positions = HashMap::with_capacity(jobs.len());
    for (i, job) in jobs.iter().enumerate() {
        if positions.insert(job.id(), i).is_some() {
            return Err(CoreError::DuplicateJob(job.id()));
        }
    }
    Ok(positions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jobs() -> Vec<JobRecord> {
        vec![
            JobRecord::new(1, "Python Developer", ["python", "django"]).unwrap(),
            JobRecord::new(2, "Data Scientist", ["python", "statistics"]).unwrap(),
        ]
    }

    #[test]
    fn fit_is_idempotent() {
        let a = TrainedModel::fit(jobs(), VectorizerConfig::default()).unwrap();
        let b = TrainedModel::fit(jobs(), VectorizerConfig::default()).unwrap();
        assert_eq!(a.features(), b.features());
    }

    #[test]
    fn rejects_empty_and_duplicates() {
        assert!(matches!(TrainedModel::fit(vec![], VectorizerConfig::default()), Err(CoreError::EmptyCorpus)));
        let mut dup = jobs();
        dup.push(JobRecord::new(1, "Other", ["go"]).unwrap());
        assert!(matches!(TrainedModel::fit(dup, VectorizerConfig::default()), Err(CoreError::DuplicateJob(1))));
    }

    #[test]
    fn rejects_mismatched_similarity_matrix() {
        let model = TrainedModel::fit(jobs(), VectorizerConfig::default()).unwrap();
        let mut other = model.clone();
        other.jobs.reverse();
        let stale = other.compute_similarity();
        assert!(model.clone().with_similarity(stale).is_err());
        let fresh = model.compute_similarity();
        assert!(model.with_similarity(fresh).unwrap().precomputed().is_some());
    }

    #[test]
    fn from_parts_checks_row_count() {
        let model = TrainedModel::fit(jobs(), VectorizerConfig::default()).unwrap();
        let mut short = jobs();
        short.pop();
        let err = TrainedModel::from_parts(model.vectorizer().clone(), model.features().clone(), short);
        assert!(err.is_err());
    }
}
