//! Trigram similarity
//!
//! Same model as PostgreSQL's pg_trgm: text is lowercased and split into
//! alphanumeric words, each word is padded with two leading spaces and one
//! trailing space, and the distinct 3-character windows form the trigram set.
//! Similarity is shared trigrams over the size of the union (0.0 to 1.0).

use std::collections::HashSet;

type Trigram = [char; 3];

/// Extract the trigram set of `text`
pub fn trigrams(text: &str) -> HashSet<Trigram> {
    let mut set = HashSet::new();

    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let padded: Vec<char> = [' ', ' ']
            .into_iter()
            .chain(word.chars().flat_map(char::to_lowercase))
            .chain(std::iter::once(' '))
            .collect();

        for window in padded.windows(3) {
            set.insert([window[0], window[1], window[2]]);
        }
    }

    set
}

/// Trigram set of `text` as strings, sorted, for storage in `song_trigrams`
pub fn trigram_keys(text: &str) -> Vec<String> {
    let mut keys: Vec<String> = trigrams(text).iter().map(|g| g.iter().collect()).collect();
    keys.sort();
    keys
}

/// Similarity between two strings
pub fn similarity(a: &str, b: &str) -> f64 {
    TrigramQuery::new(a).similarity(b)
}

/// Precomputed trigram set for scoring one query against many rows
#[derive(Debug, Clone)]
pub struct TrigramQuery {
    grams: HashSet<Trigram>,
}

impl TrigramQuery {
    pub fn new(query: &str) -> Self {
        Self {
            grams: trigrams(query),
        }
    }

    /// Number of distinct query trigrams
    pub fn len(&self) -> usize {
        self.grams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grams.is_empty()
    }

    /// Query trigrams as strings, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.grams.iter().map(|g| g.iter().collect()).collect();
        keys.sort();
        keys
    }

    /// Fewest trigrams a field must share with the query to reach `threshold`
    ///
    /// Similarity is shared / union and the union is at least the query's
    /// trigram count, so a field sharing fewer than `threshold * len` can
    /// never qualify. Never below one.
    pub fn min_shared(&self, threshold: f64) -> usize {
        let bound = (threshold * self.grams.len() as f64 - 1e-9).ceil();
        if bound < 1.0 {
            1
        } else {
            bound as usize
        }
    }

    /// Similarity between the query and `text`
    pub fn similarity(&self, text: &str) -> f64 {
        let other = trigrams(text);
        if self.grams.is_empty() || other.is_empty() {
            return 0.0;
        }

        let shared = self.grams.intersection(&other).count();
        let union = self.grams.len() + other.len() - shared;
        shared as f64 / union as f64
    }

    /// Greatest similarity against either field
    pub fn best_of(&self, title: &str, artist: &str) -> f64 {
        self.similarity(title).max(self.similarity(artist))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_word_trigrams_are_padded() {
        let grams = trigrams("cat");
        assert_eq!(grams.len(), 4);
        assert!(grams.contains(&[' ', ' ', 'c']));
        assert!(grams.contains(&[' ', 'c', 'a']));
        assert!(grams.contains(&['c', 'a', 't']));
        assert!(grams.contains(&['a', 't', ' ']));
    }

    #[test]
    fn test_matches_pg_trgm_reference_value() {
        // pg_trgm documents similarity('word', 'two words') = 0.363636
        assert!(approx(similarity("word", "two words"), 4.0 / 11.0));
    }

    #[test]
    fn test_identity_and_case_folding() {
        assert!(approx(similarity("Bohemian Rhapsody", "bohemian rhapsody"), 1.0));
    }

    #[test]
    fn test_punctuation_is_a_separator() {
        assert!(approx(similarity("AC/DC", "ac dc"), 1.0));
    }

    #[test]
    fn test_empty_input_scores_zero() {
        assert_eq!(similarity("", "anything"), 0.0);
        assert_eq!(similarity("---", "anything"), 0.0);
    }

    #[test]
    fn test_keys_match_trigram_set() {
        assert_eq!(trigram_keys("cat"), vec!["  c", " ca", "at ", "cat"]);
        assert_eq!(TrigramQuery::new("CAT").keys(), trigram_keys("cat"));
        assert!(trigram_keys("кукушка").contains(&"кук".to_string()));
    }

    #[test]
    fn test_min_shared_never_excludes_a_qualifying_field() {
        let query = TrigramQuery::new("bohemian rhapsody");
        assert_eq!(query.len(), 18);
        assert_eq!(query.min_shared(0.3), 6);
        assert_eq!(query.min_shared(0.0), 1);
        assert_eq!(query.min_shared(1.0), 18);

        // Every field at or above the threshold shares at least min_shared trigrams
        let grams = trigrams("bohemian rhapsody");
        for field in ["Bohemian Rhapsody", "Bohemian Rhapsody Live Aid", "Rhapsody", "Bohemian Like You"] {
            let shared = trigrams(field).intersection(&grams).count();
            if query.similarity(field) >= 0.3 {
                assert!(shared >= query.min_shared(0.3), "{} pruned", field);
            }
        }
    }

    #[test]
    fn test_best_of_takes_greatest_field() {
        let query = TrigramQuery::new("queen");
        let score = query.best_of("Bohemian Rhapsody", "Queen");
        assert!(approx(score, 1.0));
        assert!(query.best_of("Bohemian Rhapsody", "Freddie") < 0.2);
    }
}
