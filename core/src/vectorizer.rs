use crate::error::{CoreError, Result};
use crate::tokenizer::tokenize;
use crate::TermId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Weighting options for [`TfidfVectorizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorizerConfig {
    /// Use `1 + ln(tf)` instead of the raw term count.
    pub sublinear_tf: bool,
    /// Use `ln((1 + N) / (1 + df)) + 1` instead of `ln(N / df) + 1`.
    pub smooth_idf: bool,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self { sublinear_tf: true, smooth_idf: true }
    }
}

/// A Feature Vector stored sparsely: `(term_id, weight)` pairs sorted by
/// term id, over a vocabulary of `dim` terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    dim: usize,
    entries: Vec<(TermId, f32)>,
}

impl SparseVector {
    pub fn new(dim: usize, mut entries: Vec<(TermId, f32)>) -> Self {
        entries.retain(|(_, w)| *w != 0.0);
        entries.sort_by_key(|(t, _)| *t);
        Self { dim, entries }
    }

    pub fn dim(&self) -> usize { self.dim }
    pub fn entries(&self) -> &[(TermId, f32)] { &self.entries }
    pub fn nnz(&self) -> usize { self.entries.len() }

    pub fn norm(&self) -> f32 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt()
    }

    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut acc = 0.0f32;
        while i < self.entries.len() && j < other.entries.len() {
            let (ta, wa) = self.entries[i];
            let (tb, wb) = other.entries[j];
            match ta.cmp(&tb) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += wa * wb;
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }

}

/// TF-IDF vectorizer with a vocabulary fixed at fit time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    config: VectorizerConfig,
    vocabulary: HashMap<String, TermId>,
    idf: Vec<f32>,
    num_docs: u32,
    fitted: bool,
}

impl TfidfVectorizer {
    pub fn new(config: VectorizerConfig) -> Self {
        Self { config, ..Default::default() }
    }

    pub fn config(&self) -> VectorizerConfig { self.config }
    pub fn is_fitted(&self) -> bool { self.fitted }
    pub fn vocab_size(&self) -> usize { self.vocabulary.len() }
    pub fn term_id(&self, term: &str) -> Option<TermId> { self.vocabulary.get(term).copied() }
    pub fn idf(&self, term_id: TermId) -> Option<f32> { self.idf.get(term_id as usize).copied() }

    /// Learn vocabulary and document frequencies, replacing any previous fit.
    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d.as_ref())).collect();
        self.fit_tokenized(&tokenized);
    }

    /// Fit and return the vectors of the training documents.
    pub fn fit_transform<S: AsRef<str>>(&mut self, documents: &[S]) -> Vec<SparseVector> {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d.as_ref())).collect();
        self.fit_tokenized(&tokenized);
        tokenized.iter().map(|terms| self.vectorize(terms)).collect()
    }

    /// Vectorize with the learned vocabulary; unknown terms are dropped.
    pub fn transform<S: AsRef<str>>(&self, documents: &[S]) -> Result<Vec<SparseVector>> {
        if !self.fitted {
            return Err(CoreError::NotFitted);
        }
        Ok(documents.iter().map(|d| self.vectorize(&tokenize(d.as_ref()))).collect())
    }

    pub fn transform_one(&self, document: &str) -> Result<SparseVector> {
        if !self.fitted {
            return Err(CoreError::NotFitted);
        }
        Ok(self.vectorize(&tokenize(document)))
    }

    fn fit_tokenized(&mut self, tokenized: &[Vec<String>]) {
        // Sorted term order makes repeated fits on the same corpus byte-identical.
        let terms: BTreeSet<&str> = tokenized.iter().flatten().map(String::as_str).collect();
        let vocabulary: HashMap<String, TermId> =
            terms.into_iter().enumerate().map(|(i, t)| (t.to_string(), i as TermId)).collect();

        let mut df = vec![0u32; vocabulary.len()];
        for terms in tokenized {
            let seen: BTreeSet<TermId> = terms.iter().filter_map(|t| vocabulary.get(t).copied()).collect();
            for tid in seen {
                df[tid as usize] += 1;
            }
        }

        let n = tokenized.len() as f32;
        let smooth = self.config.smooth_idf;
        self.idf = df
            .iter()
            .map(|&df_t| {
                let df_t = df_t as f32;
                if smooth { ((1.0 + n) / (1.0 + df_t)).ln() + 1.0 } else { (n / df_t.max(1.0)).ln() + 1.0 }
            })
            .collect();
        self.vocabulary = vocabulary;
        self.num_docs = tokenized.len() as u32;
        self.fitted = true;
        tracing::debug!(num_docs = self.num_docs, vocab_size = self.vocabulary.len(), "vectorizer fitted");
    }

    fn vectorize(&self, terms: &[String]) -> SparseVector {
        let mut counts: BTreeMap<TermId, u32> = BTreeMap::new();
        for term in terms {
            if let Some(&tid) = self.vocabulary.get(term) {
                *counts.entry(tid).or_insert(0) += 1;
            }
        }
        let mut entries: Vec<(TermId, f32)> = counts
            .into_iter()
            .map(|(tid, count)| {
                let tf = if self.config.sublinear_tf { 1.0 + (count as f32).ln() } else { count as f32 };
                (tid, tf * self.idf[tid as usize])
            })
            .collect();
        let norm = entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, w) in entries.iter_mut() { *w /= norm; }
        }
        SparseVector::new(self.vocabulary.len(), entries)
    }

    /// Consistency check used when loading a persisted artifact.
    pub(crate) fn validate(&self) -> std::result::Result<(), String> {
        if !self.fitted {
            return Err("vectorizer was never fitted".into());
        }
        if self.idf.len() != self.vocabulary.len() {
            return Err(format!("idf length {} != vocabulary size {}", self.idf.len(), self.vocabulary.len()));
        }
        if self.vocabulary.values().any(|&t| t as usize >= self.idf.len()) {
            return Err("vocabulary term id out of range".into());
        }
        Ok(())
    }
}
