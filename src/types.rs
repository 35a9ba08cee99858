//! Core data types for vocabdeck.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a saved word (SQLite rowid).
pub type WordId = i64;

/// Longest word key accepted on save.
pub const MAX_WORD_LEN: usize = 100;

/// Highest quality rating (perfect recall).
pub const MAX_QUALITY: u8 = 5;

/// A saved word: the learnable unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    /// Unique identifier assigned by the store
    pub id: WordId,

    /// The word itself; unique across the store
    pub word: String,

    /// Lookup payload, stored and returned verbatim
    #[serde(default)]
    pub content: Content,

    /// When the word was saved
    pub created_at: DateTime<Utc>,
}

/// Definitions, synonyms and homonyms supplied by the lookup provider.
///
/// The scheduler never interprets these; order is preserved as given.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub definitions: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub homonyms: Vec<String>,
}

impl Content {
    /// Content with definitions only.
    pub fn with_definitions<I, S>(definitions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            definitions: definitions.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn has_definitions(&self) -> bool {
        !self.definitions.is_empty()
    }
}

/// Review history of a single word. Exactly one exists per [`Item`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewState {
    /// Consecutive successful reviews since the last failure
    pub repetitions: u32,

    /// SM-2 easiness factor, never below 1.3
    pub easiness: f64,

    /// Days until the next review
    pub interval: u32,

    /// Date on which the word becomes due
    pub next_review: NaiveDate,

    /// Last mutation
    pub updated_at: DateTime<Utc>,

    /// Write counter, bumped on every update
    #[serde(default)]
    pub version: u64,
}

/// A word together with its review state, as handed out for review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Card {
    pub item: Item,
    pub review: ReviewState,
}

impl Card {
    pub fn id(&self) -> WordId {
        self.item.id
    }
}

/// A saved word with its next review date, for listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WordEntry {
    pub item: Item,
    pub next_review: NaiveDate,
}

/// Result of saving a word.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SaveOutcome {
    /// The word and its initial review state were created.
    Saved { item: Item },
    /// A word with the same key already exists; nothing was written.
    AlreadyExists { word: String },
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved { .. })
    }
}

/// Outcome of a conditional review update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    Applied,
    /// The row exists but was written by someone else since it was read.
    Stale,
    /// The word no longer exists.
    Missing,
}

/// Progress figures for the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub word_count: u64,
    pub due_count: u64,
}

/// A recall rating in `0..=5`.
///
/// 0 is a total blackout, 5 is perfect recall; anything below 3 is a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
    /// Lowest rating that counts as a successful recall.
    pub const PASSING: u8 = 3;

    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if value > MAX_QUALITY {
            return Err(ValidationError::QualityOutOfRange(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_passing(self) -> bool {
        self.0 >= Self::PASSING
    }
}

impl TryFrom<u8> for Quality {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Quality::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> u8 {
        q.0
    }
}

/// Validation errors for input at the store boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyWord,
    WordTooLong,
    InvalidCharacters,
    QualityOutOfRange(u8),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyWord => write!(f, "word cannot be empty"),
            ValidationError::WordTooLong => write!(f, "word exceeds {} characters", MAX_WORD_LEN),
            ValidationError::InvalidCharacters => write!(f, "word contains control characters"),
            ValidationError::QualityOutOfRange(q) => {
                write!(f, "quality must be 0-{}, got {}", MAX_QUALITY, q)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate and normalize a word key. Surrounding whitespace is dropped.
pub fn normalize_word(word: &str) -> Result<&str, ValidationError> {
    let word = word.trim();
    if word.is_empty() {
        return Err(ValidationError::EmptyWord);
    }
    if word.chars().count() > MAX_WORD_LEN {
        return Err(ValidationError::WordTooLong);
    }
    if word.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidCharacters);
    }
    Ok(word)
}

/// The current calendar date in local time.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_accepts_zero_to_five() {
        for q in 0..=5 {
            assert_eq!(Quality::new(q).unwrap().value(), q);
        }
    }

    #[test]
    fn test_quality_rejects_out_of_range() {
        assert_eq!(Quality::new(6), Err(ValidationError::QualityOutOfRange(6)));
        assert_eq!(Quality::new(255), Err(ValidationError::QualityOutOfRange(255)));
    }

    #[test]
    fn test_quality_passing_threshold() {
        assert!(!Quality::new(2).unwrap().is_passing());
        assert!(Quality::new(3).unwrap().is_passing());
    }

    #[test]
    fn test_quality_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Quality>("4").is_ok());
        assert!(serde_json::from_str::<Quality>("9").is_err());
    }

    #[test]
    fn test_normalize_word_trims() {
        assert_eq!(normalize_word("  maison \n"), Ok("maison"));
    }

    #[test]
    fn test_normalize_word_empty() {
        assert_eq!(normalize_word(""), Err(ValidationError::EmptyWord));
        assert_eq!(normalize_word("   "), Err(ValidationError::EmptyWord));
    }

    #[test]
    fn test_normalize_word_too_long() {
        let long = "é".repeat(MAX_WORD_LEN + 1);
        assert_eq!(normalize_word(&long), Err(ValidationError::WordTooLong));
        let max = "é".repeat(MAX_WORD_LEN);
        assert!(normalize_word(&max).is_ok());
    }

    #[test]
    fn test_normalize_word_control_chars() {
        assert_eq!(normalize_word("mai\x00son"), Err(ValidationError::InvalidCharacters));
    }

    #[test]
    fn test_content_omits_empty_lists() {
        let content = Content::with_definitions(["habitation"]);
        let json = serde_json::to_string(&content).unwrap();
        assert_eq!(json, r#"{"definitions":["habitation"]}"#);
        let back: Content = serde_json::from_str(&json).unwrap();
        assert_eq!(back, content);
    }

    #[test]
    fn test_save_outcome_tagging() {
        let outcome = SaveOutcome::AlreadyExists {
            word: "chat".to_string(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains(r#""outcome":"already_exists""#));
        assert!(!outcome.is_saved());
    }
}
