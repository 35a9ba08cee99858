//! Storage layer for vocabdeck: a SQLite database holding words and their
//! review state.

use crate::types::{Card, Content, Item, ReviewState, UpdateOutcome, WordEntry, WordId};
use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc};
use eyre::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Storage directory name.
pub(crate) const STORE_DIR: &str = ".vocabdeck";

/// SQLite database file.
const DB_FILE: &str = "vocabdeck.db";


/// How long a writer waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const WORD_COLUMNS: &str = "w.id, w.word, w.definitions, w.synonyms, w.homonyms, w.created_at";

/// Storage handle for reading/writing vocabdeck data.
pub struct Storage {
    path: PathBuf,
    db: Connection,
}

impl Storage {
    /// Initialize storage in the given directory.
    pub fn init(root: &Path) -> Result<Self> {
        let store_dir = root.join(STORE_DIR);
        fs::create_dir_all(&store_dir).context("Failed to create .vocabdeck directory")?;
        Self::connect(store_dir.join(DB_FILE))
    }

    /// Open existing storage.
    pub fn open(root: &Path) -> Result<Self> {
        let store_dir = root.join(STORE_DIR);
        if !store_dir.exists() {
            eyre::bail!("No .vocabdeck directory found. Run 'vd init' first.");
        }
        Self::connect(store_dir.join(DB_FILE))
    }

    fn connect(path: PathBuf) -> Result<Self> {
        let db = Connection::open(&path).context("Failed to open SQLite database")?;

        db.busy_timeout(BUSY_TIMEOUT).context("Failed to set busy timeout")?;
        // journal_mode reports the resulting mode as a row
        let mode: String = db
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .context("Failed to enable WAL journal")?;
        log::debug!("SQLite journal mode: {}", mode);
        db.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;

        let storage = Self { path, db };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Initialize SQLite schema.
    fn init_schema(&self) -> Result<()> {
        self.db
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS words (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    word TEXT NOT NULL UNIQUE,
                    definitions TEXT NOT NULL DEFAULT '[]',
                    synonyms TEXT NOT NULL DEFAULT '[]',
                    homonyms TEXT NOT NULL DEFAULT '[]',
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS reviews (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    word_id INTEGER NOT NULL UNIQUE REFERENCES words(id) ON DELETE CASCADE,
                    repetitions INTEGER NOT NULL DEFAULT 0 CHECK (repetitions >= 0),
                    easiness REAL NOT NULL DEFAULT 2.5 CHECK (easiness >= 1.3),
                    interval INTEGER NOT NULL DEFAULT 0 CHECK (interval >= 0),
                    next_review INTEGER NOT NULL,
                    updated_at TEXT NOT NULL,
                    version INTEGER NOT NULL DEFAULT 0
                );
                CREATE INDEX IF NOT EXISTS idx_reviews_next ON reviews(next_review, word_id);
            "#,
            )
            .context("Failed to initialize schema")?;

        Ok(())
    }

    /// Insert a word and its initial review state in one transaction.
    ///
    /// Returns `None` when the word key already exists.
    pub fn insert_word(
        &mut self,
        word: &str,
        content: &Content,
        review: &ReviewState,
        created_at: DateTime<Utc>,
    ) -> Result<Option<Item>> {
        let created_at_str = format_timestamp(created_at);
        let tx = self
            .db
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("Failed to begin transaction")?;

        let inserted = tx.execute(
            r#"
            INSERT INTO words (word, definitions, synonyms, homonyms, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(word) DO NOTHING
            "#,
            params![
                word,
                serde_json::to_string(&content.definitions)?,
                serde_json::to_string(&content.synonyms)?,
                serde_json::to_string(&content.homonyms)?,
                created_at_str,
            ],
        )?;

        if inserted == 0 {
            // Nothing written; dropping the transaction rolls back
            return Ok(None);
        }

        let id = tx.last_insert_rowid();
        tx.execute(
            r#"
            INSERT INTO reviews (word_id, repetitions, easiness, interval, next_review, updated_at, version)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                id,
                review.repetitions,
                review.easiness,
                review.interval,
                day_number(review.next_review),
                format_timestamp(review.updated_at),
                review.version as i64,
            ],
        )?;

        tx.commit().context("Failed to commit new word")?;

        Ok(Some(Item {
            id,
            word: word.to_string(),
            content: content.clone(),
            created_at: parse_timestamp(&created_at_str),
        }))
    }

    /// Get a word by ID.
    pub fn get_word(&self, id: WordId) -> Result<Option<Item>> {
        let sql = format!("SELECT {} FROM words w WHERE w.id = ?1", WORD_COLUMNS);
        let item = self.db.query_row(&sql, params![id], row_to_item).optional()?;
        Ok(item)
    }

    /// Get a word by its key.
    pub fn find_word(&self, word: &str) -> Result<Option<Item>> {
        let sql = format!("SELECT {} FROM words w WHERE w.word = ?1", WORD_COLUMNS);
        let item = self.db.query_row(&sql, params![word], row_to_item).optional()?;
        Ok(item)
    }

    /// Get the review state of a word.
    pub fn get_review(&self, id: WordId) -> Result<Option<ReviewState>> {
        let review = self
            .db
            .query_row(
                r#"
                SELECT r.repetitions, r.easiness, r.interval, r.next_review, r.updated_at, r.version
                FROM reviews r WHERE r.word_id = ?1
                "#,
                params![id],
                |row| row_to_review(row, 0),
            )
            .optional()?;
        Ok(review)
    }

    /// List all words, newest first.
    pub fn list_words(&self) -> Result<Vec<WordEntry>> {
        let sql = format!(
            r#"
            SELECT {}, r.next_review
            FROM words w JOIN reviews r ON r.word_id = w.id
            ORDER BY w.created_at DESC, w.id DESC
            "#,
            WORD_COLUMNS
        );

        let mut stmt = self.db.prepare(&sql)?;
        let entries = stmt
            .query_map([], |row| {
                Ok(WordEntry {
                    item: row_to_item(row)?,
                    next_review: date_column(row, 6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    /// Delete a word; its review state goes with it. Returns whether a row was removed.
    pub fn delete_word(&mut self, id: WordId) -> Result<bool> {
        let removed = self.db.execute("DELETE FROM words WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    /// The most overdue card on `today`, ties broken by lowest id.
    pub fn due_card(&self, today: NaiveDate) -> Result<Option<Card>> {
        let sql = format!(
            r#"
            SELECT {}, r.repetitions, r.easiness, r.interval, r.next_review, r.updated_at, r.version
            FROM words w JOIN reviews r ON r.word_id = w.id
            WHERE r.next_review <= ?1
            ORDER BY r.next_review ASC, w.id ASC
            LIMIT 1
            "#,
            WORD_COLUMNS
        );

        let card = self
            .db
            .query_row(&sql, params![day_number(today)], |row| {
                Ok(Card {
                    item: row_to_item(row)?,
                    review: row_to_review(row, 6)?,
                })
            })
            .optional()?;

        Ok(card)
    }

    /// Number of cards due on `today`.
    pub fn due_count(&self, today: NaiveDate) -> Result<u64> {
        let count: i64 = self.db.query_row(
            "SELECT COUNT(*) FROM reviews WHERE next_review <= ?1",
            params![day_number(today)],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Total number of saved words.
    pub fn word_count(&self) -> Result<u64> {
        let count: i64 = self.db.query_row("SELECT COUNT(*) FROM words", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// A uniformly random saved word.
    pub fn random_word(&self) -> Result<Option<Item>> {
        let sql = format!("SELECT {} FROM words w ORDER BY RANDOM() LIMIT 1", WORD_COLUMNS);
        let item = self.db.query_row(&sql, [], row_to_item).optional()?;
        Ok(item)
    }

    /// Overwrite a review state. Returns false when the word does not exist.
    pub fn update_review(&mut self, id: WordId, review: &ReviewState) -> Result<bool> {
        let updated = self.db.execute(
            r#"
            UPDATE reviews
            SET repetitions = ?1, easiness = ?2, interval = ?3, next_review = ?4,
                updated_at = ?5, version = version + 1
            WHERE word_id = ?6
            "#,
            params![
                review.repetitions,
                review.easiness,
                review.interval,
                day_number(review.next_review),
                format_timestamp(review.updated_at),
                id,
            ],
        )?;
        Ok(updated > 0)
    }

    /// Overwrite a review state only if it is still at `expected_version`.
    pub fn update_review_if(&mut self, id: WordId, expected_version: u64, review: &ReviewState) -> Result<UpdateOutcome> {
        let updated = self.db.execute(
            r#"
            UPDATE reviews
            SET repetitions = ?1, easiness = ?2, interval = ?3, next_review = ?4,
                updated_at = ?5, version = version + 1
            WHERE word_id = ?6 AND version = ?7
            "#,
            params![
                review.repetitions,
                review.easiness,
                review.interval,
                day_number(review.next_review),
                format_timestamp(review.updated_at),
                id,
                expected_version as i64,
            ],
        )?;

        if updated > 0 {
            return Ok(UpdateOutcome::Applied);
        }

        let exists: bool = self.db.query_row(
            "SELECT EXISTS (SELECT 1 FROM reviews WHERE word_id = ?1)",
            params![id],
            |row| row.get(0),
        )?;

        Ok(if exists { UpdateOutcome::Stale } else { UpdateOutcome::Missing })
    }
}

/// Convert the leading word columns of a row to an Item.
fn row_to_item(row: &Row) -> rusqlite::Result<Item> {
    let created_at_str: String = row.get(5)?;

    Ok(Item {
        id: row.get(0)?,
        word: row.get(1)?,
        content: Content {
            definitions: json_column(row, 2)?,
            synonyms: json_column(row, 3)?,
            homonyms: json_column(row, 4)?,
        },
        created_at: parse_timestamp(&created_at_str),
    })
}

/// Convert review columns starting at `offset` to a ReviewState.
fn row_to_review(row: &Row, offset: usize) -> rusqlite::Result<ReviewState> {
    let updated_at_str: String = row.get(offset + 4)?;
    let version: i64 = row.get(offset + 5)?;

    Ok(ReviewState {
        repetitions: row.get(offset)?,
        easiness: row.get(offset + 1)?,
        interval: row.get(offset + 2)?,
        next_review: date_column(row, offset + 3)?,
        updated_at: parse_timestamp(&updated_at_str),
        version: version as u64,
    })
}

fn json_column(row: &Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Dates are stored as days since 0001-01-01 so due comparisons stay numeric
/// over the whole calendar range, including years past 9999.
fn day_number(date: NaiveDate) -> i32 {
    date.num_days_from_ce()
}

fn date_column(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let days: i32 = row.get(idx)?;
    NaiveDate::from_num_days_from_ce_opt(days).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, i64::from(days)))
}

/// Fixed-width RFC 3339 so stored timestamps sort as text.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Timestamps are audit-only; an unreadable one falls back to now.
fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(e) => {
            log::warn!("Unreadable stored timestamp {:?} ({}), using now", raw, e);
            Utc::now()
        }
    }
}
