//! Client for connecting to the vocabdeck daemon.

use crate::daemon::DaemonConfig;
use crate::protocol::{Request, Response};
use crate::session::{RatingOutcome, SessionState};
use crate::types::{Card, Content, SaveOutcome, Stats, WordEntry, WordId};
use crate::word_of_day::DailyWord;
use eyre::{Context, Result, bail};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How long to wait for the daemon to answer a request.
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for communicating with the vocabdeck daemon.
pub struct Client {
    root: PathBuf,
    reader: BufReader<UnixStream>,
    writer: UnixStream,
}

impl Client {
    /// Connect to a running daemon.
    pub fn connect(root: &Path) -> Result<Self> {
        let socket_path = DaemonConfig::new(root).socket_path();
        let stream = UnixStream::connect(&socket_path)
            .with_context(|| format!("Failed to connect to daemon at {:?}. Is it running?", socket_path))?;
        stream
            .set_read_timeout(Some(READ_TIMEOUT))
            .context("Failed to set read timeout")?;

        let writer = stream.try_clone().context("Failed to clone daemon stream")?;
        Ok(Self {
            root: root.to_path_buf(),
            reader: BufReader::new(stream),
            writer,
        })
    }

    /// Get the store root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Send a request; an error response becomes an `Err`.
    fn call(&mut self, request: Request) -> Result<Response> {
        let mut line = serde_json::to_string(&request)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;

        let mut response_line = String::new();
        if self.reader.read_line(&mut response_line)? == 0 {
            bail!("Daemon closed the connection");
        }

        match serde_json::from_str(&response_line).context("Failed to parse daemon response")? {
            Response::Error { message } => bail!("{}", message),
            response => Ok(response),
        }
    }

    /// Save a word.
    pub fn save(&mut self, word: &str, content: &Content) -> Result<SaveOutcome> {
        let request = Request::Save {
            word: word.to_string(),
            content: content.clone(),
        };
        match self.call(request)? {
            Response::Saved { outcome } => Ok(outcome),
            other => unexpected(other),
        }
    }

    /// Get a word and its review state.
    pub fn get(&mut self, id: WordId) -> Result<Option<Card>> {
        match self.call(Request::Get { id })? {
            Response::Card { card } => Ok(Some(card)),
            Response::NotFound { .. } => Ok(None),
            other => unexpected(other),
        }
    }

    /// List all saved words.
    pub fn list(&mut self) -> Result<Vec<WordEntry>> {
        match self.call(Request::List)? {
            Response::Words { words } => Ok(words),
            other => unexpected(other),
        }
    }

    /// Delete a word.
    pub fn delete(&mut self, id: WordId) -> Result<()> {
        match self.call(Request::Delete { id })? {
            Response::Ok => Ok(()),
            other => unexpected(other),
        }
    }

    pub fn next_card(&mut self) -> Result<SessionState> {
        match self.call(Request::Next)? {
            Response::Session { state } => Ok(state),
            other => unexpected(other),
        }
    }

    /// Rate a card and fetch the next one.
    pub fn rate(&mut self, id: WordId, quality: u8) -> Result<(RatingOutcome, SessionState)> {
        match self.call(Request::Rate { id, quality })? {
            Response::Rated { outcome, state } => Ok((outcome, state)),
            other => unexpected(other),
        }
    }

    pub fn stats(&mut self) -> Result<Stats> {
        match self.call(Request::Stats)? {
            Response::Stats { stats } => Ok(stats),
            other => unexpected(other),
        }
    }

    /// Today's word, cached by the daemon until the date rolls over.
    pub fn word_of_day(&mut self) -> Result<Option<DailyWord>> {
        match self.call(Request::WordOfDay)? {
            Response::WordOfDay { word } => Ok(word),
            other => unexpected(other),
        }
    }

    /// Shutdown the daemon.
    pub fn shutdown(&mut self) -> Result<()> {
        match self.call(Request::Shutdown)? {
            Response::Ok => Ok(()),
            other => unexpected(other),
        }
    }

    /// Ping the daemon.
    pub fn ping(&mut self) -> Result<()> {
        match self.call(Request::Ping)? {
            Response::Pong => Ok(()),
            other => unexpected(other),
        }
    }
}

fn unexpected<T>(response: Response) -> Result<T> {
    bail!("Unexpected response from daemon: {:?}", response)
}
