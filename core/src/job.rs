use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

pub type JobId = u64;
pub type UserId = u64;
pub type TermId = u32;

/// A job posting as seen by the recommender: id, title and ordered skills.
///
/// Fields are validated on construction and on deserialization, so a
/// `JobRecord` in hand always has a non-blank title and non-blank skills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "JobInput")]
pub struct JobRecord {
    id: JobId,
    title: String,
    skills: Vec<String>,
}

/// Unvalidated wire shape of a job; [`JobInput::into_record`] applies the
/// same checks as [`JobRecord::new`].
#[derive(Debug, Clone, Deserialize)]
pub struct JobInput {
    pub id: JobId,
    pub title: String,
    pub skills: Vec<String>,
}

impl JobInput {
    pub fn into_record(self) -> Result<JobRecord> {
        JobRecord::new(self.id, self.title, self.skills)
    }

    /// Parse one JSON job, reporting shape and content problems alike as
    /// `InvalidJob`.
    pub fn parse_value(value: serde_json::Value) -> Result<JobRecord> {
        serde_json::from_value::<JobInput>(value)
            .map_err(|e| CoreError::InvalidJob(e.to_string()))?
            .into_record()
    }
}

impl TryFrom<JobInput> for JobRecord {
    type Error = CoreError;

    fn try_from(raw: JobInput) -> Result<Self> {
        raw.into_record()
    }
}

impl JobRecord {
    pub fn new<T, S>(id: JobId, title: T, skills: impl IntoIterator<Item = S>) -> Result<Self>
    where
        T: Into<String>,
        S: Into<String>,
    {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(CoreError::InvalidJob(format!("job {id} has an empty title")));
        }
        let mut cleaned = Vec::new();
        for skill in skills {
            let skill = skill.into().trim().to_string();
            if skill.is_empty() {
                return Err(CoreError::InvalidJob(format!("job {id} has an empty skill")));
            }
            cleaned.push(skill);
        }
        Ok(Self { id, title, skills: cleaned })
    }

    pub fn id(&self) -> JobId { self.id }
    pub fn title(&self) -> &str { &self.title }
    pub fn skills(&self) -> &[String] { &self.skills }

    /// Text fed to the vectorizer: the title followed by every skill.
    pub fn document(&self) -> String {
        let mut doc = self.title.clone();
        for skill in &self.skills {
            doc.push(' ');
            doc.push_str(skill);
        }
        doc
    }
}

/// Text for an ad-hoc skill query; mirrors how job documents are rendered.
pub fn skills_document<S: AsRef<str>>(skills: &[S]) -> String {
    skills.iter().map(|s| s.as_ref().trim()).filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ")
}
