use jobrec::tokenizer::tokenize;

#[test]
fn it_normalizes_and_stems() {
    let words = tokenize("Running Runners RUN! Café menus.");
    assert!(words.contains(&"run".to_string()));
    // NFKC + lowercase keeps the accent but folds compatibility forms
    assert!(tokenize("ｐｙｔｈｏｎ").contains(&"python".to_string()));
}

#[test]
fn it_filters_stopwords() {
    let words = tokenize("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
}

#[test]
fn job_titles_and_skills_share_terms() {
    let title = tokenize("Python Developer");
    let skills = tokenize("python developers");
    assert_eq!(title, skills);
}
