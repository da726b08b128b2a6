use crate::HashMap;
use std::cell::OnceCell;
use std::collections::BTreeMap;

/// Replace ASCII punctuation with spaces, collapse whitespace and lowercase.
#[must_use]
pub fn normalize(text: &str) -> String {
    let spaced: String = text.chars().map(|c| if c.is_ascii_punctuation() { ' ' } else { c }).collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// A minimal in-memory BM25 index.
///
/// Document length is measured in characters of the stored text rather than in tokens.
/// Indexing the same document twice counts its terms twice.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    k1: f64,
    b: f64,
    index: HashMap<String, HashMap<String, u32>>,
    documents: HashMap<String, String>,
    avg_doc_len: OnceCell<f64>,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(1.5, 0.75)
    }
}

impl SearchEngine {
    #[must_use]
    pub fn new(k1: f64, b: f64) -> Self {
        Self {
            k1,
            b,
            index: HashMap::default(),
            documents: HashMap::default(),
            avg_doc_len: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Add a document to the index.
    pub fn index(&mut self, url: &str, content: &str) {
        let _ = self.documents.insert(url.to_string(), content.to_string());

        for term in normalize(content).split_whitespace() {
            *self
                .index
                .entry(term.to_string())
                .or_default()
                .entry(url.to_string())
                .or_default() += 1;
        }

        self.avg_doc_len = OnceCell::new();
    }

    pub fn bulk_index<'a, I>(&mut self, documents: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (url, content) in documents {
            self.index(url, content);
        }
    }

    fn avg_doc_len(&self) -> f64 {
        *self.avg_doc_len.get_or_init(|| {
            if self.documents.is_empty() {
                return 0.0;
            }
            let total: usize = self.documents.values().map(|d| d.chars().count()).sum();
            #[expect(clippy::cast_precision_loss, reason = "document sizes are far below 2^52")]
            let (total, count) = (total as f64, self.documents.len() as f64);
            total / count
        })
    }

    fn postings(&self, term: &str) -> Option<&HashMap<String, u32>> {
        self.index.get(&normalize(term))
    }

    /// Inverse document frequency of `term`.
    #[must_use]
    pub fn idf(&self, term: &str) -> f64 {
        #[expect(clippy::cast_precision_loss, reason = "document counts are far below 2^52")]
        let n = self.postings(term).map_or(0, HashMap::len) as f64;
        #[expect(clippy::cast_precision_loss, reason = "document counts are far below 2^52")]
        let total = self.documents.len() as f64;
        ((total - n + 0.5) / (n + 0.5) + 1.0).ln()
    }

    /// BM25 score of `term` for every document containing it.
    #[must_use]
    pub fn bm25(&self, term: &str) -> BTreeMap<String, f64> {
        let Some(postings) = self.postings(term) else {
            return BTreeMap::new();
        };

        let idf = self.idf(term);
        let avg_len = self.avg_doc_len();

        postings
            .iter()
            .map(|(url, &freq)| {
                let freq = f64::from(freq);
                #[expect(clippy::cast_precision_loss, reason = "document sizes are far below 2^52")]
                let doc_len = self.documents.get(url).map_or(0, |d| d.chars().count()) as f64;
                let norm = if avg_len > 0.0 { doc_len / avg_len } else { 0.0 };
                let score = idf * (freq * (self.k1 + 1.0)) / (freq + self.k1 * (1.0 - self.b + self.b * norm));
                (url.clone(), score)
            })
            .collect()
    }

    /// Sum the BM25 scores of every query term per document.
    ///
    /// Only documents matching at least one term appear in the result.
    #[must_use]
    pub fn search(&self, query: &str) -> BTreeMap<String, f64> {
        let mut scores = BTreeMap::new();
        if self.documents.is_empty() {
            return scores;
        }

        for term in normalize(query).split_whitespace() {
            for (url, score) in self.bm25(term) {
                *scores.entry(url).or_insert(0.0) += score;
            }
        }

        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("Solar-PV, inverters!  (Grid)"), "solar pv inverters grid");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("Énergie"), "énergie");
    }

    #[test]
    fn empty_engine_returns_nothing() {
        let engine = SearchEngine::default();
        assert!(engine.search("solar").is_empty());
        assert!(engine.search("").is_empty());
    }

    #[test]
    fn empty_and_unknown_queries_return_nothing() {
        let mut engine = SearchEngine::default();
        engine.index("https://a", "solar inverter control");

        assert!(engine.search("").is_empty());
        assert!(engine.search("!!! ...").is_empty());
        assert!(engine.search("hydrogen").is_empty());
    }

    #[test]
    fn more_occurrences_rank_higher_at_equal_length() {
        let mut engine = SearchEngine::default();
        engine.bulk_index([
            ("https://a", "solar solar solar grid"),
            ("https://b", "solar winds hydro grid"),
            ("https://c", "battery storage tools"),
        ]);

        let scores = engine.search("solar");
        assert_eq!(scores.len(), 2);
        assert!(scores["https://a"] > scores["https://b"]);
    }

    #[test]
    fn multi_term_scores_are_summed() {
        let mut engine = SearchEngine::default();
        engine.bulk_index([("https://a", "solar grid"), ("https://b", "wind farm"), ("https://c", "grid")]);

        let solar = engine.search("solar")["https://a"];
        let grid = engine.search("grid")["https://a"];
        let both = engine.search("Solar, GRID")["https://a"];

        assert!((both - (solar + grid)).abs() < 1e-12);
        assert!(!engine.search("solar grid").contains_key("https://b"));
    }

    #[test]
    fn idf_matches_formula() {
        let mut engine = SearchEngine::default();
        engine.bulk_index([("https://a", "solar"), ("https://b", "wind"), ("https://c", "solar wind")]);

        let expected = ((3.0_f64 - 2.0 + 0.5) / (2.0 + 0.5) + 1.0).ln();
        assert!((engine.idf("solar") - expected).abs() < 1e-12);
        assert!((engine.idf("absent") - (3.5_f64 / 0.5 + 1.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn reindexing_double_counts() {
        let mut once = SearchEngine::default();
        once.bulk_index([("https://a", "solar panel"), ("https://b", "wind turbine")]);

        let mut twice = once.clone();
        twice.index("https://a", "solar panel");

        assert_eq!(twice.document_count(), 2);
        assert_eq!(twice.postings("solar").unwrap()["https://a"], 2);
        assert!(twice.search("solar")["https://a"] > once.search("solar")["https://a"]);
    }

    #[test]
    fn average_length_is_refreshed_after_indexing() {
        let mut engine = SearchEngine::default();
        engine.index("https://a", "abcd");
        assert!((engine.avg_doc_len() - 4.0).abs() < f64::EPSILON);

        engine.index("https://b", "ab");
        assert!((engine.avg_doc_len() - 3.0).abs() < f64::EPSILON);
    }
}
