use jobrec::{CoreError, JobRecord, ModelStore, VectorizerConfig};
use tempfile::tempdir;

fn sample_jobs() -> Vec<JobRecord> {
    vec![
        JobRecord::new(1, "Python Developer", ["python", "django", "flask"]).unwrap(),
        JobRecord::new(2, "Data Scientist", ["python", "machine learning", "statistics"]).unwrap(),
        JobRecord::new(3, "Frontend Developer", ["javascript", "react", "css"]).unwrap(),
    ]
}

fn devops() -> JobRecord {
    JobRecord::new(4, "DevOps Engineer", ["docker", "kubernetes", "jenkins"]).unwrap()
}

#[test]
fn skills_query_ranks_by_shared_terms() {
    let store = ModelStore::new(VectorizerConfig::default());
    store.fit(sample_jobs()).unwrap();

    let recs = store.recommend_by_skills(&["python", "machine learning"], 5).unwrap();
    assert_eq!(recs.len(), 3);
    assert_eq!(recs[0].job.title(), "Data Scientist");
    assert_eq!(recs[1].job.id(), 1);
    assert_eq!(recs[2].job.id(), 3);
    assert!(recs[2].score < 1e-6);
    assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn result_length_is_capped_by_corpus() {
    let store = ModelStore::new(VectorizerConfig::default());
    store.fit(sample_jobs()).unwrap();
    assert_eq!(store.recommend_by_skills(&["python"], 2).unwrap().len(), 2);
    assert_eq!(store.recommend_by_skills(&["python"], 10).unwrap().len(), 3);
    assert_eq!(store.recommend_similar(1, 10).unwrap().len(), 2);
}

#[test]
fn update_adds_job_that_participates_in_queries() {
    let store = ModelStore::new(VectorizerConfig::default());
    store.fit(sample_jobs()).unwrap();
    let model = store.update(vec![devops()]).unwrap();
    assert_eq!(model.len(), 4);
    assert_eq!(model.jobs().last(), Some(&devops()));
    assert!(model.vectorizer().term_id("docker").is_some());

    let recs = store.recommend_by_skills(&["docker", "kubernetes"], 5).unwrap();
    assert_eq!(recs[0].job.id(), 4);
    assert!(recs[1..].iter().all(|r| r.score < 1e-6));
}

#[test]
fn refit_is_idempotent() {
    let store = ModelStore::new(VectorizerConfig::default());
    let first = store.fit(sample_jobs()).unwrap();
    let second = store.fit(sample_jobs()).unwrap();
    assert_eq!(first.features(), second.features());
}

#[test]
fn empty_corpus_is_an_error_not_an_empty_list() {
    let store = ModelStore::new(VectorizerConfig::default());
    assert!(matches!(store.recommend_by_skills(&["python"], 5), Err(CoreError::EmptyCorpus)));
    assert!(matches!(store.fit(vec![]), Err(CoreError::EmptyCorpus)));
}

#[test]
fn readers_keep_their_snapshot_across_updates() {
    let store = ModelStore::new(VectorizerConfig::default());
    store.fit(sample_jobs()).unwrap();
    let before = store.snapshot().unwrap();
    store.update(vec![devops()]).unwrap();
    assert_eq!(before.len(), 3);
    assert_eq!(before.features().len(), 3);
    assert_eq!(store.snapshot().unwrap().len(), 4);
}

#[test]
fn checkpoint_round_trip_and_failed_load_keeps_live_model() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.bin");
    let store = ModelStore::new(VectorizerConfig::default());
    store.fit(sample_jobs()).unwrap();
    store.save(&path).unwrap();

    let restored = ModelStore::new(VectorizerConfig::default());
    restored.load(&path).unwrap();
    let a = store.recommend_by_skills(&["react"], 1).unwrap();
    let b = restored.recommend_by_skills(&["react"], 1).unwrap();
    assert_eq!(a, b);

    std::fs::write(&path, b"garbage").unwrap();
    assert!(matches!(restored.load(&path), Err(CoreError::ModelLoad { .. })));
    assert_eq!(restored.snapshot().unwrap().len(), 3);
}

#[test]
fn concurrent_readers_see_whole_models() {
    let store = std::sync::Arc::new(ModelStore::new(VectorizerConfig::default()));
    store.fit(sample_jobs()).unwrap();
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..200 {
                    let model = store.snapshot().unwrap();
                    assert_eq!(model.features().len(), model.len());
                    assert_eq!(model.features().dim(), model.vectorizer().vocab_size());
                }
            })
        })
        .collect();
    for i in 0..20 {
        let job = JobRecord::new(100 + i, format!("Role {i}"), [format!("skill{i}")]).unwrap();
        store.update(vec![job]).unwrap();
    }
    for r in readers {
        r.join().unwrap();
    }
    assert_eq!(store.snapshot().unwrap().len(), 23);
}
