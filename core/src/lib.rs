//! Content-similarity job recommendation engine.
//!
//! Job titles and skills are turned into TF-IDF vectors, compared with cosine
//! similarity, and ranked. [`ModelStore`] owns the live model and swaps in
//! refitted state atomically.

pub mod catalog;
pub mod error;
pub mod job;
pub mod model;
pub mod persist;
pub mod ranker;
pub mod similarity;
pub mod store;
pub mod tokenizer;
pub mod vectorizer;

pub use catalog::{Catalog, Interaction, InteractionSource, JobMetadata};
pub use error::{CoreError, Result};
pub use job::{JobId, JobInput, JobRecord, TermId, UserId};
pub use model::TrainedModel;
pub use ranker::{Recommendation, RecommendationKind};
pub use similarity::{FeatureMatrix, SimilarityMatrix, SimilaritySource};
pub use store::ModelStore;
pub use vectorizer::{SparseVector, TfidfVectorizer, VectorizerConfig};
