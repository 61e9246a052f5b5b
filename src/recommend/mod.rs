//! Semantic book recommendation
//!
//! Candidates come from the semantic index in relevance order, are joined
//! back to the catalog by identifier, filtered by category and optionally
//! re-ranked by an emotion score.

use crate::catalog::{BookRecord, Catalog, Emotion};
use crate::config::SearchConfig;
use crate::index::{parse_candidate_id, SemanticIndex};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

/// Label meaning "no filter" for both category and tone selectors
pub const ALL: &str = "All";

/// Category selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryFilter {
    All,
    Exact(String),
}

impl CategoryFilter {
    /// `"All"` disables filtering; anything else must match a label exactly
    pub fn from_label(label: &str) -> Self {
        if label == ALL {
            CategoryFilter::All
        } else {
            CategoryFilter::Exact(label.to_string())
        }
    }

    pub fn matches(&self, book: &BookRecord) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Exact(label) => book.category.as_deref() == Some(label.as_str()),
        }
    }
}

/// Emotional tone used to re-rank results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tone {
    All,
    Happy,
    Surprising,
    Angry,
    Suspenseful,
    Sad,
}

impl Tone {
    /// Selector values in display order
    pub const OPTIONS: [Tone; 6] = [
        Tone::All,
        Tone::Happy,
        Tone::Surprising,
        Tone::Angry,
        Tone::Suspenseful,
        Tone::Sad,
    ];

    /// Unrecognized labels mean no re-ranking
    pub fn from_label(label: &str) -> Self {
        Self::OPTIONS
            .into_iter()
            .find(|tone| tone.label() == label)
            .unwrap_or(Tone::All)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tone::All => ALL,
            Tone::Happy => "Happy",
            Tone::Surprising => "Surprising",
            Tone::Angry => "Angry",
            Tone::Suspenseful => "Suspenseful",
            Tone::Sad => "Sad",
        }
    }

    /// Emotion score column this tone sorts by
    pub fn emotion(&self) -> Option<Emotion> {
        match self {
            Tone::All => None,
            Tone::Happy => Some(Emotion::Joy),
            Tone::Surprising => Some(Emotion::Surprise),
            Tone::Angry => Some(Emotion::Anger),
            Tone::Suspenseful => Some(Emotion::Fear),
            Tone::Sad => Some(Emotion::Sadness),
        }
    }
}

/// A single recommendation request
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub text: String,
    pub category: CategoryFilter,
    pub tone: Tone,
    /// Candidates requested from the index
    pub initial_k: usize,
    /// Maximum results returned
    pub final_k: usize,
}

impl Query {
    pub const DEFAULT_INITIAL_K: usize = 50;
    pub const DEFAULT_FINAL_K: usize = 16;

    pub fn new(text: impl Into<String>, category: &str, tone: &str) -> Self {
        Self {
            text: text.into(),
            category: CategoryFilter::from_label(category),
            tone: Tone::from_label(tone),
            initial_k: Self::DEFAULT_INITIAL_K,
            final_k: Self::DEFAULT_FINAL_K,
        }
    }

    pub fn with_limits(mut self, initial_k: usize, final_k: usize) -> Self {
        self.initial_k = initial_k;
        self.final_k = final_k;
        self
    }

    /// Apply configured limits
    pub fn with_search_config(self, config: &SearchConfig) -> Self {
        self.with_limits(config.initial_k, config.final_k)
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Read-only recommendation context: the catalog and a handle to the index
pub struct Recommender {
    catalog: Arc<Catalog>,
    index: Arc<dyn SemanticIndex>,
}

impl Recommender {
    pub fn new(catalog: Arc<Catalog>, index: Arc<dyn SemanticIndex>) -> Self {
        Self { catalog, index }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn index(&self) -> &dyn SemanticIndex {
        self.index.as_ref()
    }

    /// Recommend books for a query
    ///
    /// # Returns
    /// At most `query.final_k` catalog records. Without a tone they keep the
    /// order in which the index ranked them; with a tone they are sorted by
    /// that emotion's score, descending, with missing scores last.
    pub fn recommend(&self, query: &Query) -> Result<Vec<&BookRecord>> {
        let candidates = self.index.similarity_search(&query.text, query.initial_k)?;
        let candidate_count = candidates.len();

        let mut seen = HashSet::new();
        let mut books: Vec<&BookRecord> = candidates
            .iter()
            .filter_map(|entry| {
                let id = parse_candidate_id(&entry.content);
                if id.is_none() {
                    tracing::trace!(content = %entry.content, "Skipping untagged index entry");
                }
                id
            })
            .filter(|id| seen.insert(*id))
            .filter_map(|id| self.catalog.get(id))
            .filter(|book| query.category.matches(book))
            .collect();

        if let Some(emotion) = query.tone.emotion() {
            // sort_by is stable, so equal scores keep relevance order
            books.sort_by(|a, b| by_score_desc(a.emotion(emotion), b.emotion(emotion)));
        }

        books.truncate(query.final_k);

        tracing::debug!(
            query = %query.text,
            category = ?query.category,
            tone = query.tone.label(),
            candidates = candidate_count,
            results = books.len(),
            "Recommendation complete"
        );

        Ok(books)
    }
}

/// Descending order with missing scores last
fn by_score_desc(a: Option<f32>, b: Option<f32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::EmotionScores;
    use crate::index::IndexEntry;
    use crate::types::BookId;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    /// Index returning a fixed candidate list, counting calls
    pub(crate) struct StaticIndex {
        pub entries: Vec<String>,
        pub calls: AtomicUsize,
    }

    impl StaticIndex {
        pub fn new(entries: &[&str]) -> Self {
            Self {
                entries: entries.iter().map(|e| e.to_string()).collect(),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(AtomicOrdering::SeqCst)
        }
    }

    impl SemanticIndex for StaticIndex {
        fn similarity_search(&self, _text: &str, k: usize) -> Result<Vec<IndexEntry>> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(self
                .entries
                .iter()
                .take(k)
                .enumerate()
                .map(|(rank, content)| IndexEntry {
                    content: content.clone(),
                    score: 1.0 - rank as f32 * 0.01,
                })
                .collect())
        }

        fn len(&self) -> usize {
            self.entries.len()
        }
    }

    pub(crate) struct FailingIndex;

    impl SemanticIndex for FailingIndex {
        fn similarity_search(&self, _text: &str, _k: usize) -> Result<Vec<IndexEntry>> {
            Err(crate::Error::SemanticIndex("index unavailable".into()))
        }

        fn len(&self) -> usize {
            0
        }
    }

    pub(crate) fn book(id: BookId, category: Option<&str>, joy: Option<f32>) -> BookRecord {
        BookRecord {
            id,
            title: format!("Book {}", id),
            authors: vec!["Jane Doe".to_string()],
            description: format!("Description of book {}", id),
            category: category.map(String::from),
            published_year: Some(2001),
            average_rating: Some(4.0),
            num_pages: None,
            emotions: EmotionScores {
                joy,
                sadness: Some(0.1),
                anger: Some(0.1),
                fear: Some(0.1),
                surprise: Some(0.1),
            },
            thumbnail: None,
            large_thumbnail: "/cover-not-found.svg".to_string(),
        }
    }

    /// Twenty books alternating Fiction/Nonfiction, joy rising with id
    pub(crate) fn sample_catalog() -> Catalog {
        Catalog::from_records(
            (1..=20)
                .map(|id| {
                    let category = if id % 2 == 0 { "Fiction" } else { "Nonfiction" };
                    book(id, Some(category), Some(id as f32 / 20.0))
                })
                .collect(),
        )
    }

    /// Candidates in reverse id order, with noise the join must drop
    pub(crate) fn sample_index() -> StaticIndex {
        let mut entries: Vec<String> = (1..=20).rev().map(|id| format!("{} book text", id)).collect();
        entries.insert(3, "not-an-id some text".to_string());
        entries.insert(5, "\"19 quoted duplicate\"".to_string());
        entries.insert(8, "999 unknown to the catalog".to_string());
        StaticIndex::owned(entries)
    }

    impl StaticIndex {
        fn owned(entries: Vec<String>) -> Self {
            Self {
                entries,
                calls: AtomicUsize::new(0),
            }
        }
    }

    fn recommender(index: StaticIndex) -> Recommender {
        Recommender::new(Arc::new(sample_catalog()), Arc::new(index))
    }

    fn ids(books: &[&BookRecord]) -> Vec<BookId> {
        books.iter().map(|b| b.id).collect()
    }

    #[test]
    fn test_result_size_bounded_by_final_k() {
        let rec = recommender(sample_index());

        for final_k in [0, 1, 5, 16, 100] {
            let query = Query::new("anything", ALL, ALL).with_limits(50, final_k);
            let results = rec.recommend(&query).unwrap();
            assert!(results.len() <= final_k);
        }
    }

    #[test]
    fn test_results_are_catalog_records() {
        let rec = recommender(sample_index());
        let results = rec.recommend(&Query::new("anything", ALL, ALL)).unwrap();

        assert!(!results.is_empty());
        for book in results {
            assert!(rec.catalog().contains(book.id));
        }
    }

    #[test]
    fn test_no_tone_preserves_index_order() {
        let rec = recommender(sample_index());
        let results = rec.recommend(&Query::new("anything", ALL, ALL)).unwrap();

        // Malformed, duplicate and unknown entries dropped; rank order kept
        assert_eq!(
            ids(&results),
            vec![20, 19, 18, 17, 16, 15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5]
        );
    }

    #[test]
    fn test_duplicate_candidates_collapse_to_first_rank() {
        let index = StaticIndex::new(&["3 a", "1 b", "3 c", "\"1 d\"", "2 e"]);
        let rec = recommender(index);

        let results = rec.recommend(&Query::new("anything", ALL, ALL)).unwrap();
        assert_eq!(ids(&results), vec![3, 1, 2]);
    }

    #[test]
    fn test_initial_k_limits_candidates() {
        let rec = recommender(sample_index());
        let query = Query::new("anything", ALL, ALL).with_limits(3, 16);

        let results = rec.recommend(&query).unwrap();
        assert_eq!(ids(&results), vec![20, 19, 18]);
    }

    #[test]
    fn test_category_filter_is_exact() {
        let rec = recommender(sample_index());

        let results = rec.recommend(&Query::new("anything", "Fiction", ALL)).unwrap();
        assert!(!results.is_empty());
        assert!(results.iter().all(|b| b.category.as_deref() == Some("Fiction")));

        let results = rec.recommend(&Query::new("anything", "fiction", ALL)).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_tone_sorts_descending() {
        let rec = recommender(StaticIndex::new(&["4 a", "9 b", "2 c", "15 d", "11 e"]));

        let results = rec.recommend(&Query::new("anything", ALL, "Happy")).unwrap();
        assert_eq!(ids(&results), vec![15, 11, 9, 4, 2]);
        for pair in results.windows(2) {
            assert!(pair[0].emotion(Emotion::Joy) >= pair[1].emotion(Emotion::Joy));
        }
    }

    #[test]
    fn test_tone_ties_keep_relevance_order_and_missing_sort_last() {
        let catalog = Catalog::from_records(vec![
            book(1, None, Some(0.5)),
            book(2, None, None),
            book(3, None, Some(0.5)),
            book(4, None, Some(f32::NAN)),
            book(5, None, Some(0.9)),
        ]);
        let index = StaticIndex::new(&["2 x", "4 x", "3 x", "1 x", "5 x"]);
        let rec = Recommender::new(Arc::new(catalog), Arc::new(index));

        let results = rec.recommend(&Query::new("anything", ALL, "Happy")).unwrap();
        assert_eq!(ids(&results), vec![5, 3, 1, 2, 4]);
    }

    #[test]
    fn test_unrecognized_tone_does_not_rerank() {
        let rec = recommender(StaticIndex::new(&["4 a", "9 b", "2 c"]));

        let results = rec.recommend(&Query::new("anything", ALL, "Whimsical")).unwrap();
        assert_eq!(ids(&results), vec![4, 9, 2]);
    }

    #[test]
    fn test_tone_mapping() {
        assert_eq!(Tone::from_label("Happy").emotion(), Some(Emotion::Joy));
        assert_eq!(Tone::from_label("Surprising").emotion(), Some(Emotion::Surprise));
        assert_eq!(Tone::from_label("Angry").emotion(), Some(Emotion::Anger));
        assert_eq!(Tone::from_label("Suspenseful").emotion(), Some(Emotion::Fear));
        assert_eq!(Tone::from_label("Sad").emotion(), Some(Emotion::Sadness));
        assert_eq!(Tone::from_label("All").emotion(), None);
        assert_eq!(Tone::from_label("happy"), Tone::All);
    }

    #[test]
    fn test_recommend_is_idempotent() {
        let rec = recommender(sample_index());
        let query = Query::new("anything", "Nonfiction", "Sad");

        let first = ids(&rec.recommend(&query).unwrap());
        let second = ids(&rec.recommend(&query).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_candidates_is_empty_not_error() {
        let rec = recommender(StaticIndex::new(&[]));
        assert!(rec.recommend(&Query::new("anything", ALL, ALL)).unwrap().is_empty());
    }

    #[test]
    fn test_index_failure_propagates() {
        let rec = Recommender::new(Arc::new(sample_catalog()), Arc::new(FailingIndex));
        let result = rec.recommend(&Query::new("anything", ALL, ALL));
        assert!(matches!(result, Err(crate::Error::SemanticIndex(_))));
    }

    #[test]
    fn test_scenario_all_filters_open() {
        let rec = recommender(sample_index());
        let results = rec
            .recommend(&Query::new("revenge and justice", ALL, ALL))
            .unwrap();

        assert_eq!(results.len(), 16);
        assert!(results.iter().all(|b| rec.catalog().contains(b.id)));
    }

    #[test]
    fn test_scenario_fiction_happy() {
        let rec = recommender(sample_index());
        let results = rec
            .recommend(&Query::new("space adventure", "Fiction", "Happy"))
            .unwrap();

        assert!(!results.is_empty());
        assert!(results.iter().all(|b| b.category.as_deref() == Some("Fiction")));
        for pair in results.windows(2) {
            assert!(pair[0].emotion(Emotion::Joy) >= pair[1].emotion(Emotion::Joy));
        }
    }

    #[test]
    fn test_scenario_nonexistent_category() {
        let rec = recommender(sample_index());
        let results = rec
            .recommend(&Query::new("zzz_no_such_theme_exists", "NonexistentCategory", ALL))
            .unwrap();

        assert!(results.is_empty());
    }
}
