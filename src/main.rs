//! vocabdeck CLI - spaced repetition review for saved vocabulary.

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use vocabdeck::{
    Card, Client, Content, Daemon, DaemonConfig, DailyWord, DiscardReason, OfflineDictionary, RatingOutcome,
    SaveOutcome, SessionState, Stats, Store, WordEntry, WordId, WordOfDay, is_daemon_running, today,
};

mod cli;

use cli::{Cli, Command};

fn setup_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vocabdeck")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("vocabdeck.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn get_store_dir(cli: &Cli) -> PathBuf {
    cli.dir
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Talks to the daemon when one is running, otherwise opens the store directly.
enum Backend {
    Local(Store),
    Remote(Client),
}

impl Backend {
    fn connect(store_dir: &Path) -> Result<Self> {
        if is_daemon_running(store_dir) {
            let client = Client::connect(store_dir).context("Failed to connect to daemon")?;
            info!("Routing through daemon for {}", client.root().display());
            return Ok(Backend::Remote(client));
        }
        Ok(Backend::Local(Store::open(store_dir).context("Failed to open store")?))
    }

    fn save(&mut self, word: &str, content: &Content) -> Result<SaveOutcome> {
        match self {
            Backend::Local(store) => store.save(word, content),
            Backend::Remote(client) => client.save(word, content),
        }
    }

    fn get(&mut self, id: WordId) -> Result<Option<Card>> {
        match self {
            Backend::Local(store) => store.card(id),
            Backend::Remote(client) => client.get(id),
        }
    }

    fn list(&mut self) -> Result<Vec<WordEntry>> {
        match self {
            Backend::Local(store) => store.list(),
            Backend::Remote(client) => client.list(),
        }
    }

    fn delete(&mut self, id: WordId) -> Result<()> {
        match self {
            Backend::Local(store) => store.delete(id),
            Backend::Remote(client) => client.delete(id),
        }
    }

    fn next_card(&mut self) -> Result<SessionState> {
        match self {
            Backend::Local(store) => store.next_card(),
            Backend::Remote(client) => client.next_card(),
        }
    }

    fn rate(&mut self, id: WordId, quality: u8) -> Result<(RatingOutcome, SessionState)> {
        match self {
            Backend::Local(store) => store.rate(id, quality),
            Backend::Remote(client) => client.rate(id, quality),
        }
    }

    fn stats(&mut self) -> Result<Stats> {
        match self {
            Backend::Local(store) => store.stats(),
            Backend::Remote(client) => client.stats(),
        }
    }

    fn word_of_day(&mut self) -> Result<Option<DailyWord>> {
        match self {
            // A one-shot process has nothing to cache across calls
            Backend::Local(store) => WordOfDay::new().get(today(), store, &OfflineDictionary),
            Backend::Remote(client) => client.word_of_day(),
        }
    }
}

fn print_content(content: &Content) {
    for (i, definition) in content.definitions.iter().enumerate() {
        println!("  {}. {}", i + 1, definition);
    }
    if !content.synonyms.is_empty() {
        println!("  {}: {}", "Synonyms".bold(), content.synonyms.join(", "));
    }
    if !content.homonyms.is_empty() {
        println!("  {}: {}", "Homonyms".bold(), content.homonyms.join(", "));
    }
}

fn print_state(state: &SessionState) {
    match state {
        SessionState::CardPresented { card, remaining } => {
            println!(
                "{} {} {} ({} due)",
                "→".blue(),
                card.id().to_string().cyan(),
                card.item.word.bold(),
                remaining
            );
            println!(
                "  {}",
                format!(
                    "reps {} · easiness {:.2} · interval {}d",
                    card.review.repetitions, card.review.easiness, card.review.interval
                )
                .dimmed()
            );
        }
        SessionState::NoMoreDue => println!("{} Nothing left to review today", "✓".green()),
        SessionState::Empty => println!("{}", "No words saved yet".dimmed()),
        SessionState::AwaitingCard => println!("{}", "Waiting for the next card".dimmed()),
    }
}

fn run(cli: Cli) -> Result<()> {
    let store_dir = get_store_dir(&cli);

    match cli.command {
        Command::Init => {
            Store::init(&store_dir).context("Failed to initialize vocabdeck store")?;
            println!("{} Initialized vocabdeck store in {}", "✓".green(), store_dir.display());
        }

        Command::Save {
            word,
            definitions,
            synonyms,
            homonyms,
        } => {
            let mut backend = Backend::connect(&store_dir)?;
            let content = Content {
                definitions,
                synonyms,
                homonyms,
            };

            match backend.save(&word, &content).context("Failed to save word")? {
                SaveOutcome::Saved { item } => {
                    println!("{} Saved: {} {}", "✓".green(), item.id.to_string().cyan(), item.word)
                }
                SaveOutcome::AlreadyExists { word } => {
                    println!("{} Already saved: {}", "·".dimmed(), word)
                }
            }
        }

        Command::List => {
            let mut backend = Backend::connect(&store_dir)?;
            let words = backend.list().context("Failed to list words")?;

            if words.is_empty() {
                println!("{}", "No words saved".dimmed());
            } else {
                let today = today();
                for entry in words {
                    let due = if entry.next_review <= today {
                        "due".yellow()
                    } else {
                        entry.next_review.to_string().dimmed()
                    };
                    println!("{} {} {}", entry.item.id.to_string().cyan(), entry.item.word, due);
                }
            }
        }

        Command::Get { id } => {
            let mut backend = Backend::connect(&store_dir)?;
            match backend.get(id).context("Failed to get word")? {
                Some(Card { item, review }) => {
                    println!("{}: {}", "ID".bold(), item.id.to_string().cyan());
                    println!("{}: {}", "Word".bold(), item.word);
                    println!("{}: {}", "Saved".bold(), item.created_at);
                    println!(
                        "{}: {} (reps {}, easiness {:.2}, interval {}d)",
                        "Next review".bold(),
                        review.next_review,
                        review.repetitions,
                        review.easiness,
                        review.interval
                    );
                    print_content(&item.content);
                }
                None => {
                    eprintln!("{} Word not found: {}", "✗".red(), id);
                    std::process::exit(1);
                }
            }
        }

        Command::Delete { id } => {
            let mut backend = Backend::connect(&store_dir)?;
            backend.delete(id).context("Failed to delete word")?;
            println!("{} Deleted: {}", "✓".green(), id.to_string().cyan());
        }

        Command::Next => {
            let mut backend = Backend::connect(&store_dir)?;
            let state = backend.next_card().context("Failed to fetch next card")?;
            print_state(&state);
            if let Some(card) = state.card() {
                print_content(&card.item.content);
            }
        }

        Command::Rate { id, quality } => {
            let mut backend = Backend::connect(&store_dir)?;
            let (outcome, state) = backend.rate(id, quality).context("Failed to rate card")?;

            match outcome {
                RatingOutcome::Applied { id, next_review, .. } => {
                    println!("{} Rated {}, next review {}", "✓".green(), id.to_string().cyan(), next_review)
                }
                RatingOutcome::Discarded { id, reason } => {
                    let why = match reason {
                        DiscardReason::NotCurrentCard => "not the current card",
                        DiscardReason::Superseded => "already rated elsewhere",
                        DiscardReason::Deleted => "word was deleted",
                    };
                    println!("{} Rating for {} ignored: {}", "·".dimmed(), id, why)
                }
            }
            print_state(&state);
        }

        Command::Stats => {
            let mut backend = Backend::connect(&store_dir)?;
            let stats = backend.stats().context("Failed to read stats")?;
            println!("{}: {}", "Words".bold(), stats.word_count);
            println!("{}: {}", "Due today".bold(), stats.due_count);
        }

        Command::Today => {
            let mut backend = Backend::connect(&store_dir)?;
            match backend.word_of_day().context("Failed to pick word of the day")? {
                Some(daily) => {
                    println!("{} {}", "★".yellow(), daily.word.bold());
                    print_content(&daily.content);
                }
                None => println!("{}", "No word of the day".dimmed()),
            }
        }

        Command::Daemon => {
            println!("{} Starting daemon for {}", "→".blue(), store_dir.display());

            let config = DaemonConfig::new(&store_dir);
            let mut daemon = Daemon::new(config).context("Failed to create daemon")?;

            let rt = tokio::runtime::Runtime::new().context("Failed to create runtime")?;
            rt.block_on(async { daemon.run().await }).context("Daemon error")?;
        }

        Command::DaemonStop => {
            if !is_daemon_running(&store_dir) {
                println!("{} Daemon is not running", "✗".red());
                std::process::exit(1);
            }

            let mut client = Client::connect(&store_dir).context("Failed to connect to daemon")?;
            client.shutdown().context("Failed to shutdown daemon")?;
            println!("{} Daemon stopped", "✓".green());
        }

        Command::DaemonStatus => {
            if is_daemon_running(&store_dir) {
                println!("{} Daemon is running", "✓".green());

                if let Ok(mut client) = Client::connect(&store_dir)
                    && client.ping().is_ok()
                {
                    println!("  {} Responding to requests", "✓".green());
                }
            } else {
                println!("{} Daemon is not running", "✗".red());
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    info!("Command: {:?}", std::env::args().collect::<Vec<_>>());

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
