//! In-memory book catalog loaded once from CSV
//!
//! The catalog is read-only after load; lookups by identifier are O(1).

pub mod record;

pub use record::{BookRecord, Emotion, EmotionScores};

use crate::config::DisplayConfig;
use crate::types::BookId;
use crate::Result;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Raw CSV row; extra columns in the file are ignored
#[derive(Debug, Deserialize)]
struct BookRow {
    isbn13: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    authors: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "category")]
    simple_categories: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    average_rating: Option<f32>,
    #[serde(default)]
    published_year: Option<f64>,
    #[serde(default)]
    num_pages: Option<f64>,
    #[serde(default)]
    joy: Option<f32>,
    #[serde(default)]
    sadness: Option<f32>,
    #[serde(default)]
    anger: Option<f32>,
    #[serde(default)]
    fear: Option<f32>,
    #[serde(default)]
    surprise: Option<f32>,
}

/// Immutable book table keyed by identifier
#[derive(Debug, Default)]
pub struct Catalog {
    books: Vec<BookRecord>,
    by_id: HashMap<BookId, usize>,
}

impl Catalog {
    /// Load the catalog from a CSV file
    ///
    /// # Arguments
    /// * `path` - Path to the books CSV
    /// * `display` - Thumbnail suffix and placeholder used for the derived cover column
    pub fn load<P: AsRef<Path>>(path: P, display: &DisplayConfig) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path).map_err(|e| {
            crate::Error::Catalog(format!("failed to open {}: {}", path.display(), e))
        })?;

        let mut books = Vec::new();
        for (row_idx, row) in reader.deserialize::<BookRow>().enumerate() {
            // Header is line 1
            let line = row_idx + 2;
            let row = row?;
            books.push(row_to_record(row, line, display)?);
        }

        let catalog = Self::from_records(books);
        tracing::info!(
            books = catalog.len(),
            path = %path.display(),
            "Loaded book catalog"
        );
        Ok(catalog)
    }

    /// Build a catalog from records; the first record wins on duplicate ids
    pub fn from_records(records: Vec<BookRecord>) -> Self {
        let mut books = Vec::with_capacity(records.len());
        let mut by_id = HashMap::with_capacity(records.len());

        for record in records {
            if by_id.contains_key(&record.id) {
                tracing::warn!(id = record.id, "Duplicate book identifier, keeping first row");
                continue;
            }
            by_id.insert(record.id, books.len());
            books.push(record);
        }

        Self { books, by_id }
    }

    pub fn get(&self, id: BookId) -> Option<&BookRecord> {
        self.by_id.get(&id).map(|&idx| &self.books[idx])
    }

    pub fn contains(&self, id: BookId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BookRecord> {
        self.books.iter()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// Distinct category labels, sorted
    pub fn categories(&self) -> Vec<String> {
        self.books
            .iter()
            .filter_map(|b| b.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn row_to_record(row: BookRow, line: usize, display: &DisplayConfig) -> Result<BookRecord> {
    let id = parse_book_id(&row.isbn13).ok_or_else(|| {
        crate::Error::Catalog(format!("line {}: invalid isbn13 '{}'", line, row.isbn13))
    })?;

    let thumbnail = non_empty(row.thumbnail);
    let large_thumbnail = record::large_thumbnail(
        thumbnail.as_deref(),
        &display.thumbnail_suffix,
        &display.cover_placeholder,
    );

    Ok(BookRecord {
        id,
        title: row.title.unwrap_or_default().trim().to_string(),
        authors: row
            .authors
            .as_deref()
            .map(record::parse_authors)
            .unwrap_or_default(),
        description: row.description.unwrap_or_default(),
        category: non_empty(row.simple_categories),
        published_year: row
            .published_year
            .filter(|y| y.is_finite() && *y >= 0.0 && *y <= u16::MAX as f64)
            .map(|y| y as u16),
        average_rating: row.average_rating.filter(|r| r.is_finite()),
        num_pages: row
            .num_pages
            .filter(|p| p.is_finite() && *p >= 0.0 && *p <= u32::MAX as f64)
            .map(|p| p as u32),
        emotions: EmotionScores {
            joy: row.joy,
            sadness: row.sadness,
            anger: row.anger,
            fear: row.fear,
            surprise: row.surprise,
        },
        thumbnail,
        large_thumbnail,
    })
}

/// Parse an identifier column, tolerating float formatting such as `9780002005883.0`
fn parse_book_id(raw: &str) -> Option<BookId> {
    let raw = raw.trim();
    let digits = raw.strip_suffix(".0").unwrap_or(raw);
    digits.parse().ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = "isbn13,isbn10,title,authors,categories,thumbnail,description,published_year,average_rating,num_pages,simple_categories,anger,disgust,fear,joy,sadness,surprise,neutral";

    fn write_csv(dir: &TempDir, rows: &[&str]) -> std::path::PathBuf {
        let path = dir.path().join("books.csv");
        let mut body = String::from(HEADER);
        for row in rows {
            body.push('\n');
            body.push_str(row);
        }
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_load_catalog() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_csv(
            &temp_dir,
            &[
                "9780002005883,0002005883,Gilead,Marilynne Robinson,Fiction,http://books.google.com/c?id=1,A NOVEL THAT READERS and critics have been eagerly anticipating,2004.0,3.85,247.0,Fiction,0.06,0.1,0.05,0.9,0.2,0.1,0.5",
                "9780006178736,0006178731,Rage of angels,Sidney Sheldon;Tilly Bagshawe,Fiction,,A memorable tale,1993,3.93,512,Fiction,0.4,0.1,0.7,0.1,0.3,0.2,0.1",
            ],
        );

        let catalog = Catalog::load(&path, &DisplayConfig::default()).unwrap();
        assert_eq!(catalog.len(), 2);

        let gilead = catalog.get(9780002005883).unwrap();
        assert_eq!(gilead.title, "Gilead");
        assert_eq!(gilead.authors, vec!["Marilynne Robinson"]);
        assert_eq!(gilead.category.as_deref(), Some("Fiction"));
        assert_eq!(gilead.published_year, Some(2004));
        assert_eq!(gilead.num_pages, Some(247));
        assert_eq!(gilead.emotion(Emotion::Joy), Some(0.9));
        assert_eq!(
            gilead.large_thumbnail,
            "http://books.google.com/c?id=1&fife=w800"
        );

        let rage = catalog.get(9780006178736).unwrap();
        assert_eq!(rage.authors, vec!["Sidney Sheldon", "Tilly Bagshawe"]);
        assert_eq!(rage.thumbnail, None);
        assert_eq!(rage.large_thumbnail, "/cover-not-found.svg");
        assert_eq!(rage.dominant_emotion(), Some(Emotion::Fear));
    }

    #[test]
    fn test_missing_optional_fields() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_csv(&temp_dir, &["9780000000001,,Untitled,,,,,,,,,,,,,,,"]);

        let catalog = Catalog::load(&path, &DisplayConfig::default()).unwrap();
        let book = catalog.get(9780000000001).unwrap();
        assert!(book.authors.is_empty());
        assert_eq!(book.category, None);
        assert_eq!(book.published_year, None);
        assert_eq!(book.average_rating, None);
        assert_eq!(book.emotions, EmotionScores::default());
        assert!(catalog.categories().is_empty());
    }

    #[test]
    fn test_invalid_identifier_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_csv(&temp_dir, &["not-an-isbn,,Broken,,,,,,,,,,,,,,,"]);

        let result = Catalog::load(&path, &DisplayConfig::default());
        assert!(matches!(result, Err(crate::Error::Catalog(_))));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = Catalog::load("/nonexistent/books.csv", &DisplayConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_identifiers_keep_first() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_csv(
            &temp_dir,
            &[
                "9780000000001,,First,,,,,,,,Fiction,,,,,,,",
                "9780000000001,,Second,,,,,,,,Fiction,,,,,,,",
            ],
        );

        let catalog = Catalog::load(&path, &DisplayConfig::default()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(9780000000001).unwrap().title, "First");
    }

    #[test]
    fn test_categories_sorted_and_distinct() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_csv(
            &temp_dir,
            &[
                "1,,A,,,,,,,,Nonfiction,,,,,,,",
                "2,,B,,,,,,,,Fiction,,,,,,,",
                "3,,C,,,,,,,,Fiction,,,,,,,",
                "4,,D,,,,,,,,,,,,,,,",
            ],
        );

        let catalog = Catalog::load(&path, &DisplayConfig::default()).unwrap();
        assert_eq!(catalog.categories(), vec!["Fiction", "Nonfiction"]);
    }

    #[test]
    fn test_parse_book_id() {
        assert_eq!(parse_book_id("9780002005883"), Some(9780002005883));
        assert_eq!(parse_book_id(" 9780002005883.0 "), Some(9780002005883));
        assert_eq!(parse_book_id("97800abc"), None);
        assert_eq!(parse_book_id(""), None);
    }
}
