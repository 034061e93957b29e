//! Top-N selection over similarity scores, in two modes (ad-hoc skills and
//! job-to-job) plus the random fallback used when a user has no history.

use crate::error::{CoreError, Result};
use crate::job::skills_document;
use crate::model::TrainedModel;
use crate::similarity::similarity;
use crate::{JobId, JobRecord};
use rand::Rng;
use serde::Serialize;

/// Score assigned to every fallback pick.
pub const FALLBACK_SCORE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Similarity,
    /// Random filler; the score carries no similarity signal.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub job: JobRecord,
    pub score: f32,
    pub kind: RecommendationKind,
}

impl Recommendation {
    pub fn is_fallback(&self) -> bool { self.kind == RecommendationKind::Fallback }
}

/// Indices of the `n` best scores, descending. Equal scores keep corpus
/// order. `exclude` drops one row (the query job itself).
pub fn top_n(scores: &[f32], n: usize, exclude: Option<usize>) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(i, _)| Some(*i) != exclude)
        .collect();
    // stable: ties stay in corpus order
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(n);
    ranked
}

/// User-skills mode: rank every job against an ad-hoc skill list.
pub fn by_skills<S: AsRef<str>>(model: &TrainedModel, skills: &[S], n: usize) -> Result<Vec<Recommendation>> {
    if model.is_empty() {
        return Err(CoreError::EmptyCorpus);
    }
    let query = model.vectorizer().transform_one(&skills_document(skills))?;
    let scores = similarity(&query, model.features());
    Ok(collect(model, top_n(&scores, n, None)))
}

/// Job-to-job mode: rank every other job against an existing one.
pub fn similar_to(model: &TrainedModel, job_id: JobId, n: usize) -> Result<Vec<Recommendation>> {
    if model.is_empty() {
        return Err(CoreError::EmptyCorpus);
    }
    let row = model.position(job_id).ok_or(CoreError::NotFound(job_id))?;
    let scores = model.row_scores(row);
    Ok(collect(model, top_n(&scores, n, Some(row))))
}

/// Uniform random sample of up to `n` distinct jobs, each scored
/// [`FALLBACK_SCORE`] and tagged [`RecommendationKind::Fallback`].
pub fn fallback<R: Rng + ?Sized>(model: &TrainedModel, n: usize, rng: &mut R) -> Result<Vec<Recommendation>> {
    if model.is_empty() {
        return Err(CoreError::EmptyCorpus);
    }
    let amount = n.min(model.len());
    Ok(rand::seq::index::sample(rng, model.len(), amount)
        .into_iter()
        .map(|i| Recommendation {
            job: model.jobs()[i].clone(),
            score: FALLBACK_SCORE,
            kind: RecommendationKind::Fallback,
        })
        .collect())
}

fn collect(model: &TrainedModel, ranked: Vec<(usize, f32)>) -> Vec<Recommendation> {
    ranked
        .into_iter()
        .map(|(i, score)| Recommendation {
            job: model.jobs()[i].clone(),
            score,
            kind: RecommendationKind::Similarity,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::VectorizerConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn model() -> TrainedModel {
        let jobs = vec![
            JobRecord::new(1, "Python Developer", ["python", "django", "flask"]).unwrap(),
            JobRecord::new(2, "Data Scientist", ["python", "machine learning", "statistics"]).unwrap(),
            JobRecord::new(3, "Frontend Developer", ["javascript", "react", "css"]).unwrap(),
        ];
        TrainedModel::fit(jobs, VectorizerConfig::default()).unwrap()
    }

    #[test]
    fn top_n_is_stable_on_ties() {
        let ranked = top_n(&[0.5, 0.9, 0.5, 0.5], 3, None);
        assert_eq!(ranked, vec![(1, 0.9), (0, 0.5), (2, 0.5)]);
    }

    #[test]
    fn top_n_excludes_and_caps() {
        let ranked = top_n(&[1.0, 0.2, 0.3], 10, Some(0));
        assert_eq!(ranked, vec![(2, 0.3), (1, 0.2)]);
        assert!(top_n(&[0.1, 0.2], 0, None).is_empty());
    }

    #[test]
    fn skills_query_ranks_data_scientist_first() {
        let recs = by_skills(&model(), &["python", "machine learning"], 5).unwrap();
        let ids: Vec<JobId> = recs.iter().map(|r| r.job.id()).collect();
        assert_eq!(ids, vec![2, 1, 3]);
        assert!(recs[2].score < 1e-6);
        assert!(recs.iter().all(|r| r.kind == RecommendationKind::Similarity));
    }

    #[test]
    fn job_to_job_never_returns_query() {
        let m = model();
        for id in [1, 2, 3] {
            let recs = similar_to(&m, id, 5).unwrap();
            assert_eq!(recs.len(), 2);
            assert!(recs.iter().all(|r| r.job.id() != id));
        }
        assert_eq!(similar_to(&m, 1, 5).unwrap()[0].job.id(), 2);
    }

    #[test]
    fn job_to_job_unknown_id_is_not_found() {
        assert!(matches!(similar_to(&model(), 99, 5), Err(CoreError::NotFound(99))));
    }

    #[test]
    fn fallback_is_marked_and_distinct() {
        let m = model();
        let mut rng = StdRng::seed_from_u64(7);
        let recs = fallback(&m, 2, &mut rng).unwrap();
        assert_eq!(recs.len(), 2);
        assert!(recs.iter().all(|r| r.is_fallback() && r.score == FALLBACK_SCORE));
        let ids: HashSet<JobId> = recs.iter().map(|r| r.job.id()).collect();
        assert_eq!(ids.len(), 2);

        let all = fallback(&m, 10, &mut rng).unwrap();
        assert_eq!(all.len(), 3);
    }
}
