//! Gallery formatting for recommendation results
//!
//! Turns [`BookRecord`]s into display tiles and owns the blank-query guard,
//! so an empty search box never reaches the semantic index.

use crate::catalog::{BookRecord, Emotion};
use crate::config::DisplayConfig;
use crate::recommend::{Query, Recommender};
use crate::types::BookId;
use crate::Result;
use serde::Serialize;

const UNKNOWN_AUTHOR: &str = "Unknown author";
const NO_CATEGORY: &str = "Uncategorized";
const NO_RATING: &str = "N/A";
const NO_YEAR: &str = "Unknown";

/// Canned queries offered as one-click examples, keyed by trigger id
pub const EXAMPLE_QUERIES: &[(&str, &str)] = &[
    ("revenge", "A dark story about revenge and justice"),
    ("space", "An epic space adventure across distant galaxies"),
    ("friendship", "A heartwarming tale of friendship and growing up"),
    ("mystery", "A suspenseful murder mystery in a small town"),
    ("nature", "A book to teach children about nature"),
];

/// Query text behind an example trigger
pub fn example_query(id: &str) -> Result<&'static str> {
    EXAMPLE_QUERIES
        .iter()
        .find(|(key, _)| *key == id)
        .map(|(_, query)| *query)
        .ok_or_else(|| crate::Error::InvalidInput(format!("Unknown example query '{}'", id)))
}

/// One book as shown in the gallery
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tile {
    pub id: BookId,
    pub title: String,
    pub authors: String,
    pub description: String,
    pub caption: String,
    pub thumbnail: String,
    /// Shown when `thumbnail` fails to load
    pub fallback_thumbnail: String,
    pub category: String,
    pub rating: String,
    pub year: String,
    pub emotion: Option<Emotion>,
}

impl Tile {
    pub fn from_record(book: &BookRecord, display: &DisplayConfig) -> Self {
        let title = truncate_title(&book.title, display.title_max_chars);
        let authors = format_authors(&book.authors);
        let description = truncate_description(&book.description, display.description_words);
        let caption = format!("{} by {}: {}", title, authors, description);

        Self {
            id: book.id,
            title,
            authors,
            description,
            caption,
            thumbnail: book.large_thumbnail.clone(),
            fallback_thumbnail: display.cover_placeholder.clone(),
            category: book
                .category
                .clone()
                .unwrap_or_else(|| NO_CATEGORY.to_string()),
            rating: book
                .average_rating
                .map(|r| format!("{:.2}", r))
                .unwrap_or_else(|| NO_RATING.to_string()),
            year: book
                .published_year
                .map(|y| y.to_string())
                .unwrap_or_else(|| NO_YEAR.to_string()),
            emotion: book.dominant_emotion(),
        }
    }
}

/// What the results region shows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "tiles", rename_all = "snake_case")]
pub enum Gallery {
    /// Nothing searched yet (blank query)
    Prompt,
    /// A search ran and nothing matched
    NoResults,
    Results(Vec<Tile>),
}

impl Gallery {
    /// Run a query and render the outcome
    ///
    /// Blank queries short-circuit to [`Gallery::Prompt`] without touching
    /// the index.
    pub fn search(recommender: &Recommender, query: &Query, display: &DisplayConfig) -> Result<Self> {
        if query.is_blank() {
            return Ok(Gallery::Prompt);
        }

        let books = recommender.recommend(query)?;
        Ok(Self::from_books(&books, display))
    }

    pub fn from_books(books: &[&BookRecord], display: &DisplayConfig) -> Self {
        if books.is_empty() {
            return Gallery::NoResults;
        }

        Gallery::Results(
            books
                .iter()
                .map(|book| Tile::from_record(book, display))
                .collect(),
        )
    }

    pub fn tiles(&self) -> &[Tile] {
        match self {
            Gallery::Results(tiles) => tiles,
            Gallery::Prompt | Gallery::NoResults => &[],
        }
    }
}

/// Cap a title at `max_chars` characters, marking the cut with `...`
pub fn truncate_title(title: &str, max_chars: usize) -> String {
    let title = title.trim();
    if title.chars().count() <= max_chars {
        return title.to_string();
    }

    let cut: String = title.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

/// Join author names for display
///
/// One name is returned as-is, two are joined with "and", longer lists use
/// commas with a final ", and".
pub fn format_authors(authors: &[String]) -> String {
    match authors {
        [] => UNKNOWN_AUTHOR.to_string(),
        [single] => single.clone(),
        [first, second] => format!("{} and {}", first, second),
        [rest @ .., last] => format!("{}, and {}", rest.join(", "), last),
    }
}

/// First `words` words of a description followed by `...`
pub fn truncate_description(description: &str, words: usize) -> String {
    let head: Vec<&str> = description.split_whitespace().take(words).collect();
    format!("{}...", head.join(" "))
}
