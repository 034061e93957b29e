use crate::error::{CoreError, Result};
use crate::model::TrainedModel;
use crate::similarity::{FeatureMatrix, SimilarityMatrix};
use crate::vectorizer::TfidfVectorizer;
use crate::job::JobInput;
use crate::JobRecord;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;

const MODEL_MAGIC: [u8; 4] = *b"JRMD";
const SIMILARITY_MAGIC: [u8; 4] = *b"JRSM";
pub const ARTIFACT_VERSION: u32 = 1;

/// Everything needed to serve recommendations, persisted as one unit.
#[derive(Serialize, Deserialize)]
pub struct ModelArtifact {
    pub magic: [u8; 4],
    pub version: u32,
    pub created_at: String,
    pub vectorizer: TfidfVectorizer,
    pub features: FeatureMatrix,
    pub jobs: Vec<JobRecord>,
}

#[derive(Serialize, Deserialize)]
struct SimilarityArtifact {
    magic: [u8; 4],
    version: u32,
    matrix: SimilarityMatrix,
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

/// Write `bytes` to a sibling temp file, then rename over `path` so readers
/// never see a partially written artifact.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let tmp = tmp_path(path);
    let mut f = File::create(&tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    fs::rename(&tmp, path)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn read_all(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Ok(buf)
}

pub fn save_model(path: &Path, model: &TrainedModel) -> Result<()> {
    let artifact = ModelArtifact {
        magic: MODEL_MAGIC,
        version: ARTIFACT_VERSION,
        created_at: now_rfc3339(),
        vectorizer: model.vectorizer().clone(),
        features: model.features().clone(),
        jobs: model.jobs().to_vec(),
    };
    let save_err = |reason: String| CoreError::ModelSave { path: path.to_path_buf(), reason };
    let bytes = bincode::serialize(&artifact).map_err(|e| save_err(e.to_string()))?;
    write_atomic(path, &bytes).map_err(|e| save_err(e.to_string()))?;
    tracing::info!(path = %path.display(), num_jobs = model.len(), bytes = bytes.len(), "model saved");
    Ok(())
}

pub fn load_model(path: &Path) -> Result<TrainedModel> {
    let load_err = |reason: String| CoreError::ModelLoad { path: path.to_path_buf(), reason };
    let bytes = read_all(path).map_err(|e| load_err(e.to_string()))?;
    let artifact: ModelArtifact = bincode::deserialize(&bytes).map_err(|e| load_err(e.to_string()))?;
    if artifact.magic != MODEL_MAGIC {
        return Err(load_err("not a model artifact".into()));
    }
    if artifact.version != ARTIFACT_VERSION {
        return Err(load_err(format!("unsupported artifact version {}", artifact.version)));
    }
    let model = TrainedModel::from_parts(artifact.vectorizer, artifact.features, artifact.jobs).map_err(load_err)?;
    tracing::info!(path = %path.display(), num_jobs = model.len(), created_at = %artifact.created_at, "model loaded");
    Ok(model)
}

pub fn save_similarity(path: &Path, matrix: &SimilarityMatrix) -> Result<()> {
    let artifact = SimilarityArtifact { magic: SIMILARITY_MAGIC, version: ARTIFACT_VERSION, matrix: matrix.clone() };
    let save_err = |reason: String| CoreError::ModelSave { path: path.to_path_buf(), reason };
    let bytes = bincode::serialize(&artifact).map_err(|e| save_err(e.to_string()))?;
    write_atomic(path, &bytes).map_err(|e| save_err(e.to_string()))?;
    Ok(())
}

pub fn load_similarity(path: &Path) -> Result<SimilarityMatrix> {
    let load_err = |reason: String| CoreError::ModelLoad { path: path.to_path_buf(), reason };
    let bytes = read_all(path).map_err(|e| load_err(e.to_string()))?;
    let artifact: SimilarityArtifact = bincode::deserialize(&bytes).map_err(|e| load_err(e.to_string()))?;
    if artifact.magic != SIMILARITY_MAGIC || artifact.version != ARTIFACT_VERSION {
        return Err(load_err("not a similarity artifact".into()));
    }
    if !artifact.matrix.is_well_formed() {
        return Err(load_err("similarity matrix is not square".into()));
    }
    Ok(artifact.matrix)
}

/// Read job records from a JSON array, a single JSON object, or JSONL.
/// Malformed records fail with `InvalidJob`.
pub fn read_jobs_file(path: &Path) -> Result<Vec<JobRecord>> {
    let is_jsonl = path.extension().and_then(|s| s.to_str()) == Some("jsonl");
    let reader = BufReader::new(File::open(path)?);
    if is_jsonl {
        let mut jobs = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() { continue; }
            jobs.push(JobInput::parse_value(serde_json::from_str(&line)?)?);
        }
        return Ok(jobs);
    }
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => arr.into_iter().map(JobInput::parse_value).collect(),
        obj @ serde_json::Value::Object(_) => Ok(vec![JobInput::parse_value(obj)?]),
        _ => Err(CoreError::InvalidJob(format!("{} holds neither jobs nor a job", path.display()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::VectorizerConfig;
    use tempfile::tempdir;

    fn model() -> TrainedModel {
        let jobs = vec![
            JobRecord::new(1, "Python Developer", ["python", "django"]).unwrap(),
            JobRecord::new(2, "Data Scientist", ["python", "statistics"]).unwrap(),
        ];
        TrainedModel::fit(jobs, VectorizerConfig::default()).unwrap()
    }

    #[test]
    fn saved_model_loads_with_same_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/model.bin");
        let m = model();
        save_model(&path, &m).unwrap();
        assert!(!tmp_path(&path).exists());
        let loaded = load_model(&path).unwrap();
        assert_eq!(loaded.features(), m.features());
        assert_eq!(loaded.jobs(), m.jobs());
    }

    #[test]
    fn corrupt_or_missing_artifact_is_model_load_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.bin");
        assert!(matches!(load_model(&missing), Err(CoreError::ModelLoad { .. })));

        let junk = dir.path().join("junk.bin");
        fs::write(&junk, b"definitely not bincode").unwrap();
        assert!(matches!(load_model(&junk), Err(CoreError::ModelLoad { .. })));
    }

    #[test]
    fn similarity_artifact_is_not_a_model() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sim.bin");
        let m = model();
        save_similarity(&path, &m.compute_similarity()).unwrap();
        assert!(load_model(&path).is_err());
        assert_eq!(load_similarity(&path).unwrap().len(), 2);
    }

    #[test]
    fn reads_json_array_and_jsonl() {
        let dir = tempdir().unwrap();
        let arr = dir.path().join("jobs.json");
        fs::write(&arr, r#"[{"id":1,"title":"A","skills":["x"]},{"id":2,"title":"B","skills":[]}]"#).unwrap();
        assert_eq!(read_jobs_file(&arr).unwrap().len(), 2);

        let lines = dir.path().join("jobs.jsonl");
        fs::write(&lines, "{\"id\":1,\"title\":\"A\",\"skills\":[\"x\"]}\n\n{\"id\":2,\"title\":\"B\",\"skills\":[\"y\"]}\n").unwrap();
        assert_eq!(read_jobs_file(&lines).unwrap().len(), 2);

        let bad = dir.path().join("bad.json");
        fs::write(&bad, r#"[{"id":1,"title":"  ","skills":[]}]"#).unwrap();
        assert!(matches!(read_jobs_file(&bad), Err(CoreError::InvalidJob(_))));

        let bad_line = dir.path().join("bad.jsonl");
        fs::write(&bad_line, "{\"id\":1,\"title\":\"A\",\"skills\":[\" \"]}\n").unwrap();
        assert!(matches!(read_jobs_file(&bad_line), Err(CoreError::InvalidJob(_))));
    }
}
