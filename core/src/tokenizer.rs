use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;

lazy_static! {
    // Letter-led tokens; `+` and `#` are kept so "c++" and "c#" stay distinct skills.
    static ref RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_'+#]*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Tokenize job or skill text into stemmed terms using NFKC normalization,
/// lowercasing and stopword removal. Order and repeats are preserved.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized)
        .map(|m| m.as_str())
        .filter(|token| !is_stopword(token))
        .map(|token| STEMMER.stem(token).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skill_phrases_stem_consistently() {
        assert_eq!(tokenize("Machine Learning"), tokenize("machine learning"));
        assert_eq!(tokenize("Machine Learning"), vec!["machin", "learn"]);
    }

    #[test]
    fn contractions_are_stopwords() {
        assert!(tokenize("don't can't isn't you're").is_empty());
        let t = tokenize("we're hiring rust engineers");
        assert!(t.contains(&"rust".to_string()));
        assert!(t.iter().all(|w| !w.contains('\'')));
    }

    #[test]
    fn keeps_symbol_suffixed_languages() {
        let t = tokenize("C++ and C# developer");
        assert!(t.contains(&"c++".to_string()));
        assert!(t.contains(&"c#".to_string()));
    }
}
