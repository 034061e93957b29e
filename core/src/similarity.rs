use crate::vectorizer::SparseVector;
use crate::JobId;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Cosine similarity of two non-negative vectors, in [0, 1].
/// Returns 0 when either vector has zero magnitude.
pub fn cosine(a: &SparseVector, b: &SparseVector) -> f32 {
    let denom = a.norm() * b.norm();
    if denom == 0.0 {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(0.0, 1.0)
}

/// Corpus Feature Matrix: row `i` is the vector of job `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    dim: usize,
    rows: Vec<SparseVector>,
}

impl FeatureMatrix {
    pub fn new(dim: usize, rows: Vec<SparseVector>) -> Self {
        Self { dim, rows }
    }

    pub fn dim(&self) -> usize { self.dim }
    pub fn rows(&self) -> &[SparseVector] { &self.rows }
    pub fn row(&self, i: usize) -> Option<&SparseVector> { self.rows.get(i) }
    pub fn len(&self) -> usize { self.rows.len() }
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }
    pub fn nnz(&self) -> usize { self.rows.iter().map(SparseVector::nnz).sum() }

    pub fn density(&self) -> f64 {
        let cells = self.rows.len() * self.dim;
        if cells == 0 { 0.0 } else { self.nnz() as f64 / cells as f64 }
    }
}

/// Score `query` against every row of `matrix`, one score per row.
pub fn similarity(query: &SparseVector, matrix: &FeatureMatrix) -> Vec<f32> {
    matrix.rows.iter().map(|row| cosine(query, row)).collect()
}

/// Full symmetric job-to-job score matrix. Only the upper triangle is
/// computed; the lower one is mirrored so `s[i][j] == s[j][i]` exactly.
pub fn pairwise(matrix: &FeatureMatrix) -> Vec<f32> {
    let n = matrix.len();
    let upper: Vec<Vec<f32>> = (0..n)
        .into_par_iter()
        .map(|i| (i..n).map(|j| cosine(&matrix.rows[i], &matrix.rows[j])).collect())
        .collect();
    let mut scores = vec![0.0f32; n * n];
    for (i, row) in upper.into_iter().enumerate() {
        for (offset, s) in row.into_iter().enumerate() {
            let j = i + offset;
            scores[i * n + j] = s;
            scores[j * n + i] = s;
        }
    }
    scores
}

/// Precomputed job-to-job similarities, tagged with the job order they were
/// computed for so a stale matrix can be detected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    job_ids: Vec<JobId>,
    scores: Vec<f32>,
}

impl SimilarityMatrix {
    pub fn compute(job_ids: Vec<JobId>, matrix: &FeatureMatrix) -> Self {
        debug_assert_eq!(job_ids.len(), matrix.len());
        Self { job_ids, scores: pairwise(matrix) }
    }

    pub fn job_ids(&self) -> &[JobId] { &self.job_ids }
    pub fn len(&self) -> usize { self.job_ids.len() }
    pub fn is_empty(&self) -> bool { self.job_ids.is_empty() }

    pub fn row(&self, i: usize) -> &[f32] {
        let n = self.len();
        &self.scores[i * n..(i + 1) * n]
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        self.scores.len() == self.job_ids.len() * self.job_ids.len()
    }
}

/// Anything that can produce the scores of one corpus row against all rows.
pub trait SimilaritySource {
    fn row_scores(&self, row: usize) -> Vec<f32>;
}

impl SimilaritySource for FeatureMatrix {
    fn row_scores(&self, row: usize) -> Vec<f32> {
        match self.rows.get(row) {
            Some(query) => similarity(query, self),
            None => Vec::new(),
        }
    }
}

impl SimilaritySource for SimilarityMatrix {
    fn row_scores(&self, row: usize) -> Vec<f32> {
        if row < self.len() { self.row(row).to_vec() } else { Vec::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::{TfidfVectorizer, VectorizerConfig};

    fn fitted() -> FeatureMatrix {
        let mut v = TfidfVectorizer::new(VectorizerConfig::default());
        let rows = v.fit_transform(&[
            "Python Developer python django flask",
            "Data Scientist python machine learning statistics",
            "Frontend Developer javascript react css",
            "DevOps Engineer docker kubernetes jenkins",
        ]);
        FeatureMatrix::new(v.vocab_size(), rows)
    }

    #[test]
    fn self_similarity_is_one() {
        let m = fitted();
        for row in m.rows() {
            assert!((cosine(row, row) - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn zero_vector_scores_zero() {
        let m = fitted();
        let zero = SparseVector::new(m.dim(), vec![]);
        assert!(similarity(&zero, &m).iter().all(|&s| s == 0.0));
        assert_eq!(cosine(&zero, &zero), 0.0);
    }

    #[test]
    fn pairwise_is_symmetric_and_bounded() {
        let m = fitted();
        let n = m.len();
        let s = pairwise(&m);
        for i in 0..n {
            for j in 0..n {
                assert_eq!(s[i * n + j], s[j * n + i]);
                assert!((0.0..=1.0).contains(&s[i * n + j]));
            }
        }
    }

    #[test]
    fn precomputed_rows_match_on_demand() {
        let m = fitted();
        let pre = SimilarityMatrix::compute(vec![1, 2, 3, 4], &m);
        for i in 0..m.len() {
            let live = m.row_scores(i);
            let cached = pre.row_scores(i);
            for (a, b) in live.iter().zip(cached.iter()) {
                assert!((a - b).abs() < 1e-6);
            }
        }
    }
}
