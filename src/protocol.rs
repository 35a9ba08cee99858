//! IPC protocol types for daemon communication.

use crate::session::{RatingOutcome, SessionState};
use crate::types::{Card, Content, SaveOutcome, Stats, WordEntry, WordId};
use crate::word_of_day::DailyWord;
use serde::{Deserialize, Serialize};

/// Request sent from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Save a word with its lookup content.
    Save { word: String, content: Content },

    /// Get a word and its review state by ID.
    Get { id: WordId },

    /// List all saved words.
    List,

    /// Delete a word.
    Delete { id: WordId },

    /// Fetch the next card to review.
    Next,

    /// Rate a card and fetch the next one.
    Rate { id: WordId, quality: u8 },

    /// Word and due counts.
    Stats,

    /// Today's word.
    WordOfDay,

    /// Shutdown the daemon.
    Shutdown,

    /// Ping to check if daemon is alive.
    Ping,
}

/// Response sent from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Result of a save.
    Saved { outcome: SaveOutcome },

    /// A word with its review state.
    Card { card: Card },

    /// Word listing.
    Words { words: Vec<WordEntry> },

    /// Word not found.
    NotFound { id: WordId },

    /// Review queue position.
    Session { state: SessionState },

    /// Rating result plus the queue position after it.
    Rated { outcome: RatingOutcome, state: SessionState },

    /// Counts.
    Stats { stats: Stats },

    /// Today's word, if there is one.
    WordOfDay { word: Option<DailyWord> },

    /// Operation succeeded.
    Ok,

    /// Pong response to ping.
    Pong,

    /// Error response.
    Error { message: String },
}

impl Response {
    /// Create an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = Request::Save {
            word: "chat".to_string(),
            content: Content::with_definitions(["Petit félin"]),
        };

        let json = serde_json::to_string(&req).unwrap();
        let parsed: Request = serde_json::from_str(&json).unwrap();

        if let Request::Save { word, content } = parsed {
            assert_eq!(word, "chat");
            assert_eq!(content.definitions, vec!["Petit félin"]);
        } else {
            panic!("Wrong request type");
        }
    }

    #[test]
    fn test_rate_request_wire_format() {
        let json = serde_json::to_string(&Request::Rate { id: 7, quality: 4 }).unwrap();
        assert_eq!(json, r#"{"type":"Rate","id":7,"quality":4}"#);
    }

    #[test]
    fn test_session_response_serialization() {
        let resp = Response::Session {
            state: SessionState::NoMoreDue,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""state":"no_more_due""#));

        let parsed: Response = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            parsed,
            Response::Session {
                state: SessionState::NoMoreDue
            }
        ));
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::error("test error");
        let json = serde_json::to_string(&resp).unwrap();

        assert!(json.contains("Error"));
        assert!(json.contains("test error"));
    }
}
