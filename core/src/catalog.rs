use crate::error::{CoreError, Result};
use crate::{JobId, JobRecord, UserId};
use serde::{Deserialize, Serialize};
use std::path::Path;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: UserId,
    pub job_id: JobId,
    pub interaction_type: String,
    pub interaction_value: f64,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub job_id: JobId,
    pub title: String,
    pub description: String,
    pub skills: Vec<String>,
    pub updated_at: String,
}

impl JobMetadata {
    /// The subset of metadata the recommender vectorizes.
    pub fn to_job_record(&self) -> Result<JobRecord> {
        JobRecord::new(self.job_id, self.title.clone(), self.skills.iter().cloned())
    }
}

/// Supplies the "most recent interaction" fact for a user.
pub trait InteractionSource {
    fn latest_interaction(&self, user_id: UserId) -> Result<Option<Interaction>>;
}

/// Embedded store for user interactions and job metadata.
pub struct Catalog {
    db: sled::Db,
    interactions: sled::Tree,
    metadata: sled::Tree,
}

impl Catalog {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_db(sled::open(path)?)
    }

    /// Throwaway catalog, removed on drop.
    pub fn temporary() -> Result<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        let interactions = db.open_tree("interactions")?;
        let metadata = db.open_tree("job_metadata")?;
        Ok(Self { db, interactions, metadata })
    }

    pub fn log_interaction(&self, user_id: UserId, job_id: JobId, interaction_type: &str, value: f64) -> Result<Interaction> {
        let interaction_type = interaction_type.trim();
        if interaction_type.is_empty() {
            return Err(CoreError::InvalidInput("interaction_type is required".into()));
        }
        if !value.is_finite() {
            return Err(CoreError::InvalidInput("interaction_value must be finite".into()));
        }
        let interaction = Interaction {
            user_id,
            job_id,
            interaction_type: interaction_type.to_string(),
            interaction_value: value,
            timestamp: now_rfc3339(),
        };
        // user id prefix keeps one user's history contiguous; the sled id orders it
        let seq = self.db.generate_id()?;
        let mut key = user_id.to_be_bytes().to_vec();
        key.extend_from_slice(&seq.to_be_bytes());
        self.interactions.insert(key, serde_json::to_vec(&interaction)?)?;
        tracing::debug!(user_id, job_id, kind = interaction_type, "interaction logged");
        Ok(interaction)
    }

    /// Newest first.
    pub fn recent_interactions(&self, user_id: UserId, limit: usize) -> Result<Vec<Interaction>> {
        let mut out = Vec::new();
        for entry in self.interactions.scan_prefix(user_id.to_be_bytes()).rev().take(limit) {
            let (_, value) = entry?;
            out.push(decode(&value)?);
        }
        Ok(out)
    }

    pub fn upsert_job_metadata(&self, job_id: JobId, title: &str, description: &str, skills: Vec<String>) -> Result<JobMetadata> {
        let meta = JobMetadata {
            job_id,
            title: title.to_string(),
            description: description.to_string(),
            skills,
            updated_at: now_rfc3339(),
        };
        // validate the fields the recommender will later consume
        meta.to_job_record()?;
        self.metadata.insert(job_id.to_be_bytes(), serde_json::to_vec(&meta)?)?;
        Ok(meta)
    }

    pub fn job_metadata(&self, job_id: JobId) -> Result<Option<JobMetadata>> {
        match self.metadata.get(job_id.to_be_bytes())? {
            Some(value) => Ok(Some(decode(&value)?)),
            None => Ok(None),
        }
    }

    /// Every metadata record, in job id order.
    pub fn all_job_metadata(&self) -> Result<Vec<JobMetadata>> {
        let mut out = Vec::new();
        for entry in self.metadata.iter() {
            let (_, value) = entry?;
            out.push(decode(&value)?);
        }
        Ok(out)
    }
}

impl InteractionSource for Catalog {
    fn latest_interaction(&self, user_id: UserId) -> Result<Option<Interaction>> {
        Ok(self.recent_interactions(user_id, 1)?.into_iter().next())
    }
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| CoreError::UpstreamData(format!("corrupt catalog record: {e}")))
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}
