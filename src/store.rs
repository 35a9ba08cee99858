//! High-level store API for vocabdeck.

use crate::session::{RatingOutcome, ReviewSession, SessionState};
use crate::sm2::{INITIAL_EASINESS, MIN_EASINESS, Schedule};
use crate::storage::Storage;
use crate::types::{
    Card, Content, Item, ReviewState, SaveOutcome, Stats, UpdateOutcome, ValidationError, WordEntry, WordId,
    normalize_word, today,
};
use chrono::{NaiveDate, Utc};
use eyre::{Result, WrapErr};
use std::path::Path;

/// Errors that can occur during store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Word not found.
    ItemNotFound(WordId),
    /// Validation error.
    Validation(ValidationError),
    /// The database failed while performing the named operation.
    Persistence(&'static str),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::ItemNotFound(id) => write!(f, "word not found: {}", id),
            StoreError::Validation(e) => write!(f, "validation error: {}", e),
            StoreError::Persistence(op) => write!(f, "persistence failure during {}", op),
        }
    }
}

impl std::error::Error for StoreError {}

impl StoreError {
    /// True when `err` is, or wraps, a persistence failure.
    pub fn is_persistence(err: &eyre::Report) -> bool {
        matches!(err.downcast_ref::<StoreError>(), Some(StoreError::Persistence(_)))
    }
}

/// Tag storage failures so callers can tell them apart from domain errors.
fn persist<T>(result: Result<T>, op: &'static str) -> Result<T> {
    result.wrap_err(StoreError::Persistence(op))
}

/// The main vocabdeck store.
pub struct Store {
    storage: Storage,
}

impl Store {
    /// Initialize a new store in the given directory.
    pub fn init(root: &Path) -> Result<Self> {
        let storage = Storage::init(root)?;
        log::info!("Initialized store at {}", storage.path().display());
        Ok(Self { storage })
    }

    /// Open an existing store.
    pub fn open(root: &Path) -> Result<Self> {
        let storage = Storage::open(root)?;
        log::debug!("Opened store at {}", storage.path().display());
        Ok(Self { storage })
    }

    /// Save a word with a fresh review state, due today.
    ///
    /// Saving a word that already exists is not an error; it reports
    /// [`SaveOutcome::AlreadyExists`] and writes nothing.
    pub fn save(&mut self, word: &str, content: &Content) -> Result<SaveOutcome> {
        let word = normalize_word(word).map_err(|e| eyre::eyre!(StoreError::Validation(e)))?;

        let now = Utc::now();
        let review = ReviewState {
            repetitions: 0,
            easiness: INITIAL_EASINESS,
            interval: 0,
            next_review: today(),
            updated_at: now,
            version: 0,
        };

        let inserted = persist(self.storage.insert_word(word, content, &review, now), "save")?;
        match inserted {
            Some(item) => {
                log::info!("Saved word {} as {}", item.word, item.id);
                Ok(SaveOutcome::Saved { item })
            }
            None => {
                log::debug!("Word {} already saved", word);
                Ok(SaveOutcome::AlreadyExists { word: word.to_string() })
            }
        }
    }

    /// Get a word by ID.
    pub fn get(&self, id: WordId) -> Result<Option<Item>> {
        persist(self.storage.get_word(id), "get")
    }

    /// Get a word by its key.
    pub fn find(&self, word: &str) -> Result<Option<Item>> {
        persist(self.storage.find_word(word.trim()), "find")
    }

    /// Get a word's review state.
    pub fn review_state(&self, id: WordId) -> Result<Option<ReviewState>> {
        persist(self.storage.get_review(id), "review state")
    }

    /// Get a word together with its review state.
    pub fn card(&self, id: WordId) -> Result<Option<Card>> {
        let Some(item) = self.get(id)? else {
            return Ok(None);
        };
        let review = self
            .review_state(id)?
            .ok_or_else(|| eyre::eyre!(StoreError::ItemNotFound(id)))?;
        Ok(Some(Card { item, review }))
    }

    /// List all words, newest first.
    pub fn list(&self) -> Result<Vec<WordEntry>> {
        persist(self.storage.list_words(), "list")
    }

    /// Delete a word and its review state. Deleting an unknown id is a no-op.
    pub fn delete(&mut self, id: WordId) -> Result<()> {
        if persist(self.storage.delete_word(id), "delete")? {
            log::info!("Deleted word {}", id);
        }
        Ok(())
    }

    /// The card to review next, if any is due today.
    pub fn due_card(&self) -> Result<Option<Card>> {
        persist(self.storage.due_card(today()), "due card")
    }

    /// Number of cards due today.
    pub fn due_count(&self) -> Result<u64> {
        persist(self.storage.due_count(today()), "due count")
    }

    /// Total number of saved words.
    pub fn word_count(&self) -> Result<u64> {
        persist(self.storage.word_count(), "word count")
    }

    pub fn stats(&self) -> Result<Stats> {
        Ok(Stats {
            word_count: self.word_count()?,
            due_count: self.due_count()?,
        })
    }

    /// A random saved word.
    pub fn random_word(&self) -> Result<Option<Item>> {
        persist(self.storage.random_word(), "random word")
    }

    /// Overwrite a word's review state.
    ///
    /// A word deleted in the meantime makes this a no-op. Easiness is held at
    /// the floor before it is written.
    pub fn update_review(&mut self, id: WordId, schedule: &Schedule, next_review: NaiveDate) -> Result<()> {
        let review = review_from(schedule, next_review);
        if !persist(self.storage.update_review(id, &review), "update review")? {
            log::debug!("Review update for missing word {} ignored", id);
        }
        Ok(())
    }

    /// Overwrite a word's review state if nobody else wrote it since
    /// `expected_version` was read.
    pub fn update_review_if(
        &mut self,
        id: WordId,
        expected_version: u64,
        schedule: &Schedule,
        next_review: NaiveDate,
    ) -> Result<UpdateOutcome> {
        let review = review_from(schedule, next_review);
        persist(
            self.storage.update_review_if(id, expected_version, &review),
            "update review",
        )
    }

    /// Start a review session over this store.
    pub fn session(&mut self) -> ReviewSession<'_> {
        ReviewSession::new(self)
    }

    /// Select the card to review next.
    pub fn next_card(&mut self) -> Result<SessionState> {
        let mut session = self.session();
        session.fetch()?;
        Ok(session.into_state())
    }

    /// Rate a card and select the next one.
    pub fn rate(&mut self, id: WordId, quality: u8) -> Result<(RatingOutcome, SessionState)> {
        let mut session = self.session();
        let outcome = session.rate(id, quality)?;
        Ok((outcome, session.into_state()))
    }
}

fn review_from(schedule: &Schedule, next_review: NaiveDate) -> ReviewState {
    ReviewState {
        repetitions: schedule.repetitions,
        easiness: schedule.easiness.max(MIN_EASINESS),
        interval: schedule.interval,
        next_review,
        updated_at: Utc::now(),
        version: 0,
    }
}
