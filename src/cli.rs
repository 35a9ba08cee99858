//! CLI argument parsing for vocabdeck.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "vd",
    about = "Spaced repetition review for saved vocabulary",
    version,
    after_help = "Logs are written to: ~/.local/share/vocabdeck/logs/vocabdeck.log"
)]
pub struct Cli {
    /// Path to the vocabdeck store directory (default: current directory)
    #[arg(short = 'd', long, global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize a new vocabdeck store in the current directory
    Init,

    /// Save a word for review
    Save {
        /// The word
        word: String,

        /// Definition (repeatable)
        #[arg(short = 'D', long = "definition")]
        definitions: Vec<String>,

        /// Synonyms (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        synonyms: Vec<String>,

        /// Homonyms (comma-separated)
        #[arg(short = 'H', long, value_delimiter = ',')]
        homonyms: Vec<String>,
    },

    /// List saved words
    List,

    /// Show a word by ID
    Get {
        /// Word ID
        id: i64,
    },

    /// Delete a word and its review history
    Delete {
        /// Word ID
        id: i64,
    },

    /// Show the next card due for review
    Next,

    /// Rate the current card (0=blackout, 5=perfect)
    Rate {
        /// Word ID of the card being rated
        id: i64,

        /// Recall quality, 0-5
        quality: u8,
    },

    /// Show word and due counts
    Stats,

    /// Show the word of the day
    Today,

    /// Run the daemon in foreground
    Daemon,

    /// Stop the running daemon
    DaemonStop,

    /// Check daemon status
    DaemonStatus,
}
