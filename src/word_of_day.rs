//! Word of the day: a single-entry cache keyed by date.
//!
//! The cache starts empty, is filled on the first request of a day, and is
//! replaced as soon as a request arrives for a different date.

use crate::store::Store;
use crate::types::{Content, WordId};
use chrono::NaiveDate;
use eyre::Result;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

/// Starter words offered while nothing has been saved yet.
pub const CURATED_WORDS: [&str; 15] = [
    "bonjour", "merci", "maison", "chat", "livre", "soleil", "fleur", "eau", "pain", "fromage", "amour", "jardin",
    "chanson", "etoile", "voyage",
];

/// Source of definitions for a word, such as an online dictionary.
pub trait Dictionary {
    fn lookup(&self, word: &str) -> Result<Content>;
}

/// A dictionary that knows nothing; every lookup comes back empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineDictionary;

impl Dictionary for OfflineDictionary {
    fn lookup(&self, _word: &str) -> Result<Content> {
        Ok(Content::default())
    }
}

/// The word picked for a given day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyWord {
    pub word: String,
    pub content: Content,
    /// Set when the word comes from the store rather than the curated list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_id: Option<WordId>,
}

/// Process-wide word of the day.
#[derive(Debug, Default)]
pub struct WordOfDay {
    entry: Option<(NaiveDate, Option<DailyWord>)>,
}

impl WordOfDay {
    pub fn new() -> Self {
        Self::default()
    }

    /// The date the cached pick belongs to, if any.
    pub fn cached_date(&self) -> Option<NaiveDate> {
        self.entry.as_ref().map(|(date, _)| *date)
    }

    /// Drop the cached pick unless it belongs to `today`.
    pub fn expire(&mut self, today: NaiveDate) {
        if self.cached_date().is_some_and(|date| date != today) {
            log::info!("Word of the day expired");
            self.entry = None;
        }
    }

    /// Today's word, picking one on the first call of the day.
    ///
    /// A "no word today" result is cached too, so the dictionary is asked at
    /// most once per day.
    pub fn get(&mut self, today: NaiveDate, store: &Store, dictionary: &dyn Dictionary) -> Result<Option<DailyWord>> {
        self.expire(today);
        if let Some((_, pick)) = &self.entry {
            return Ok(pick.clone());
        }

        let pick = pick_word(store, dictionary)?;
        log::info!(
            "Word of the day for {}: {}",
            today,
            pick.as_ref().map(|w| w.word.as_str()).unwrap_or("none")
        );
        self.entry = Some((today, pick.clone()));
        Ok(pick)
    }
}

fn pick_word(store: &Store, dictionary: &dyn Dictionary) -> Result<Option<DailyWord>> {
    if let Some(item) = store.random_word()? {
        return Ok(Some(DailyWord {
            word: item.word,
            content: item.content,
            saved_id: Some(item.id),
        }));
    }

    let Some(word) = CURATED_WORDS[..].choose(&mut rand::rng()) else {
        return Ok(None);
    };

    match dictionary.lookup(word) {
        Ok(content) if content.has_definitions() => Ok(Some(DailyWord {
            word: word.to_string(),
            content,
            saved_id: None,
        })),
        Ok(_) => {
            log::debug!("No definitions for curated word {}", word);
            Ok(None)
        }
        Err(e) => {
            log::warn!("Lookup of curated word {} failed: {}", word, e);
            Ok(None)
        }
    }
}
