//! Book records and their per-emotion scores

use crate::types::BookId;
use serde::{Deserialize, Serialize};

/// Emotion classes scored per book, in tie-breaking order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Joy,
    Sadness,
    Anger,
    Fear,
    Surprise,
}

impl Emotion {
    pub const ALL: [Emotion; 5] = [
        Emotion::Joy,
        Emotion::Sadness,
        Emotion::Anger,
        Emotion::Fear,
        Emotion::Surprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Joy => "joy",
            Emotion::Sadness => "sadness",
            Emotion::Anger => "anger",
            Emotion::Fear => "fear",
            Emotion::Surprise => "surprise",
        }
    }
}

/// Precomputed emotion scores in [0, 1]; `None` when the column was empty
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionScores {
    pub joy: Option<f32>,
    pub sadness: Option<f32>,
    pub anger: Option<f32>,
    pub fear: Option<f32>,
    pub surprise: Option<f32>,
}

impl EmotionScores {
    /// Score for one emotion. NaN is reported as missing.
    pub fn get(&self, emotion: Emotion) -> Option<f32> {
        let score = match emotion {
            Emotion::Joy => self.joy,
            Emotion::Sadness => self.sadness,
            Emotion::Anger => self.anger,
            Emotion::Fear => self.fear,
            Emotion::Surprise => self.surprise,
        };
        score.filter(|s| !s.is_nan())
    }

    /// Emotion with the highest score; the earlier emotion wins ties
    pub fn dominant(&self) -> Option<Emotion> {
        let mut best: Option<(Emotion, f32)> = None;
        for emotion in Emotion::ALL {
            if let Some(score) = self.get(emotion) {
                match best {
                    Some((_, top)) if score <= top => {}
                    _ => best = Some((emotion, score)),
                }
            }
        }
        best.map(|(emotion, _)| emotion)
    }
}

/// A single catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: BookId,
    pub title: String,
    pub authors: Vec<String>,
    pub description: String,
    pub category: Option<String>,
    pub published_year: Option<u16>,
    pub average_rating: Option<f32>,
    pub num_pages: Option<u32>,
    pub emotions: EmotionScores,
    pub thumbnail: Option<String>,
    /// Cover URL used for display, derived from `thumbnail` at load time
    pub large_thumbnail: String,
}

impl BookRecord {
    pub fn dominant_emotion(&self) -> Option<Emotion> {
        self.emotions.dominant()
    }

    pub fn emotion(&self, emotion: Emotion) -> Option<f32> {
        self.emotions.get(emotion)
    }
}

/// Split a `;`-delimited author string into trimmed, non-empty names
pub fn parse_authors(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(String::from)
        .collect()
}

/// Cover URL shown in the gallery
///
/// Real thumbnails get the size suffix appended; books without one fall
/// back to the placeholder as-is.
pub fn large_thumbnail(thumbnail: Option<&str>, suffix: &str, placeholder: &str) -> String {
    match thumbnail.map(str::trim).filter(|t| !t.is_empty()) {
        Some(url) => format!("{}{}", url, suffix),
        None => placeholder.to_string(),
    }
}
