//! vocabdeck: SM-2 spaced repetition for saved vocabulary.
//!
//! Words are saved with their dictionary content and a fresh review state.
//! A review session hands out whichever word is most overdue, and each
//! rating reschedules it with the SM-2 algorithm.
//!
//! # Example
//!
//! ```no_run
//! use vocabdeck::{Content, SessionState, Store};
//! use std::path::Path;
//!
//! let mut store = Store::init(Path::new(".")).unwrap();
//!
//! store.save("maison", &Content::with_definitions(["Bâtiment d'habitation"])).unwrap();
//!
//! // Present the most overdue card and rate it
//! if let SessionState::CardPresented { card, remaining } = store.next_card().unwrap() {
//!     println!("{} ({} due)", card.item.word, remaining);
//!     let (outcome, next) = store.rate(card.id(), 4).unwrap();
//!     assert!(outcome.is_applied());
//!     assert_eq!(next, SessionState::NoMoreDue);
//! }
//! ```

mod storage;
mod store;
mod types;

pub mod client;
pub mod daemon;
pub mod protocol;
pub mod session;
pub mod sm2;
pub mod word_of_day;

// Re-export public API
pub use client::Client;
pub use daemon::{Daemon, DaemonConfig, is_daemon_running};
pub use protocol::{Request, Response};
pub use session::{DiscardReason, RatingOutcome, ReviewSession, SessionState};
pub use sm2::{Schedule, compute_next};
pub use store::{Store, StoreError};
pub use types::{
    Card, Content, Item, Quality, ReviewState, SaveOutcome, Stats, UpdateOutcome, ValidationError, WordEntry, WordId,
    today,
};
pub use word_of_day::{DailyWord, Dictionary, OfflineDictionary, WordOfDay};
