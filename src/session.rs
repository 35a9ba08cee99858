//! Review sessions: select the next due card and apply ratings to it.
//!
//! A session holds no memory of which card it showed. Every step re-runs the
//! due-card query, so the persisted `next_review` dates stay the only source
//! of truth and a restarted process or a second session sees the same queue.

use crate::sm2::{self, Schedule};
use crate::store::{Store, StoreError};
use crate::types::{Card, Quality, UpdateOutcome, WordId, today};
use chrono::NaiveDate;
use eyre::Result;
use serde::{Deserialize, Serialize};

/// Where a review session stands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// The next card has not been selected yet.
    AwaitingCard,
    /// A due card is up for review; `remaining` counts it too.
    CardPresented { card: Card, remaining: u64 },
    /// Words exist but none are due today.
    NoMoreDue,
    /// No words have been saved at all.
    Empty,
}

impl SessionState {
    pub fn card(&self) -> Option<&Card> {
        match self {
            SessionState::CardPresented { card, .. } => Some(card),
            _ => None,
        }
    }
}

/// Why a rating was not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// The rated word is not the card currently due.
    NotCurrentCard,
    /// Another rating for the same card landed first.
    Superseded,
    /// The word was deleted while being rated.
    Deleted,
}

/// What happened to a submitted rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RatingOutcome {
    Applied {
        id: WordId,
        schedule: Schedule,
        next_review: NaiveDate,
    },
    Discarded {
        id: WordId,
        reason: DiscardReason,
    },
}

impl RatingOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RatingOutcome::Applied { .. })
    }
}

/// A single pass through the due queue.
pub struct ReviewSession<'a> {
    store: &'a mut Store,
    state: SessionState,
}

impl<'a> ReviewSession<'a> {
    pub fn new(store: &'a mut Store) -> Self {
        Self {
            store,
            state: SessionState::AwaitingCard,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn into_state(self) -> SessionState {
        self.state
    }

    /// Select the next card to present.
    pub fn fetch(&mut self) -> Result<&SessionState> {
        self.state = match self.store.due_card()? {
            Some(card) => SessionState::CardPresented {
                remaining: self.store.due_count()?,
                card,
            },
            None if self.store.word_count()? > 0 => SessionState::NoMoreDue,
            None => SessionState::Empty,
        };
        Ok(&self.state)
    }

    /// Rate a card, then select the next one.
    ///
    /// The rating is applied only if `id` is still the card the queue would
    /// present; anything else (a double submit, a card someone else already
    /// rated) is discarded without touching the store. Quality outside 0-5
    /// is rejected before anything is read.
    pub fn rate(&mut self, id: WordId, quality: u8) -> Result<RatingOutcome> {
        let quality = Quality::new(quality).map_err(|e| eyre::eyre!(StoreError::Validation(e)))?;

        self.state = SessionState::AwaitingCard;
        let outcome = match self.store.due_card()? {
            Some(card) if card.id() == id => self.apply(card, quality)?,
            current => {
                log::warn!(
                    "Discarding rating for {}: current card is {:?}",
                    id,
                    current.as_ref().map(Card::id)
                );
                RatingOutcome::Discarded {
                    id,
                    reason: DiscardReason::NotCurrentCard,
                }
            }
        };

        self.fetch()?;
        Ok(outcome)
    }

    fn apply(&mut self, card: Card, quality: Quality) -> Result<RatingOutcome> {
        let id = card.id();
        let review = &card.review;
        let schedule = sm2::compute_next(quality, review.repetitions, review.easiness, review.interval);
        let next_review = schedule.next_review(today());

        log::debug!(
            "Rating {} q={}: reps {} -> {}, easiness {:.2} -> {:.2}, interval {} -> {}",
            id,
            quality.value(),
            review.repetitions,
            schedule.repetitions,
            review.easiness,
            schedule.easiness,
            review.interval,
            schedule.interval
        );

        let outcome = match self
            .store
            .update_review_if(id, review.version, &schedule, next_review)?
        {
            UpdateOutcome::Applied => RatingOutcome::Applied {
                id,
                schedule,
                next_review,
            },
            UpdateOutcome::Stale => {
                log::warn!("Rating for {} lost a race with a concurrent update", id);
                RatingOutcome::Discarded {
                    id,
                    reason: DiscardReason::Superseded,
                }
            }
            UpdateOutcome::Missing => RatingOutcome::Discarded {
                id,
                reason: DiscardReason::Deleted,
            },
        };

        Ok(outcome)
    }
}
