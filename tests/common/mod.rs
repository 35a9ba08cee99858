//! Shared test infrastructure for vocabdeck integration tests.
//!
//! Provides TestEnv helper for consistent test setup/teardown.

#![allow(dead_code)]

use chrono::{Days, NaiveDate};
use vocabdeck::{Content, Item, ReviewState, SaveOutcome, Schedule, SessionState, Store, today};
use tempfile::TempDir;

/// Test environment with automatic cleanup.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub store: Store,
}

impl TestEnv {
    /// Create a new test environment with an initialized store.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Store::init(temp_dir.path()).expect("Failed to init store");
        Self { temp_dir, store }
    }

    /// Save a word with a single definition.
    pub fn save_word(&mut self, word: &str) -> Item {
        let content = Content::with_definitions([format!("definition of {}", word)]);
        match self.store.save(word, &content).expect("Failed to save word") {
            SaveOutcome::Saved { item } => item,
            other => panic!("Expected {} to be saved, got {:?}", word, other),
        }
    }

    /// Current review state of a word.
    pub fn review(&self, item: &Item) -> ReviewState {
        self.store
            .review_state(item.id)
            .expect("Failed to read review state")
            .expect("Review state missing")
    }

    /// Move a word's next review to `date`, keeping the rest of its state.
    pub fn set_next_review(&mut self, item: &Item, date: NaiveDate) {
        let review = self.review(item);
        let schedule = Schedule {
            repetitions: review.repetitions,
            easiness: review.easiness,
            interval: review.interval,
        };
        self.store
            .update_review(item.id, &schedule, date)
            .expect("Failed to update review");
    }

    /// Make a word due `days` days ago.
    pub fn make_overdue(&mut self, item: &Item, days: u64) {
        self.set_next_review(item, today() - Days::new(days));
    }

    /// Push a word `days` days into the future.
    pub fn postpone(&mut self, item: &Item, days: u64) {
        self.set_next_review(item, today() + Days::new(days));
    }

    /// Id of the card the queue presents now, if any.
    pub fn current_card_id(&mut self) -> Option<i64> {
        match self.store.next_card().expect("Failed to fetch next card") {
            SessionState::CardPresented { card, .. } => Some(card.id()),
            _ => None,
        }
    }

    pub fn word_count(&self) -> u64 {
        self.store.word_count().expect("Failed to count words")
    }

    pub fn due_count(&self) -> u64 {
        self.store.due_count().expect("Failed to count due words")
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
