//! Background daemon for concurrent access to the vocabdeck store.
//!
//! The daemon provides:
//! - A single writer, so ratings from several front ends are applied in order
//! - The process-wide word of the day, cleared when the date rolls over
//!
//! Connections are served on the tokio reactor; an idle client costs a
//! parked task, not a worker thread.

use crate::protocol::{Request, Response};
use crate::storage::STORE_DIR;
use crate::store::Store;
use crate::types::today;
use crate::word_of_day::{Dictionary, OfflineDictionary, WordOfDay};
use eyre::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinSet;
use tokio::time::interval;

/// Socket file name within the .vocabdeck directory.
const SOCKET_FILE: &str = "daemon.sock";

/// PID file name within the .vocabdeck directory.
const PID_FILE: &str = "daemon.pid";

/// Default interval between date rollover checks, in seconds.
const DEFAULT_ROLLOVER_CHECK_SECS: u64 = 60;

/// Requests waiting for the writer before senders are held back.
const REQUEST_QUEUE: usize = 100;

/// A request paired with the slot its response goes to.
type Envelope = (Request, oneshot::Sender<Response>);

/// Configuration for the daemon.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Root directory containing .vocabdeck
    pub root: PathBuf,

    /// How often to check whether the word of the day has gone stale
    pub rollover_check_interval: Duration,
}

impl DaemonConfig {
    /// Create config with default settings.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            rollover_check_interval: Duration::from_secs(DEFAULT_ROLLOVER_CHECK_SECS),
        }
    }

    /// Get the socket path.
    pub fn socket_path(&self) -> PathBuf {
        self.root.join(STORE_DIR).join(SOCKET_FILE)
    }

    /// Get the PID file path.
    pub fn pid_path(&self) -> PathBuf {
        self.root.join(STORE_DIR).join(PID_FILE)
    }
}

/// The vocabdeck daemon.
pub struct Daemon {
    config: DaemonConfig,
    store: Store,
    word_of_day: WordOfDay,
    dictionary: Box<dyn Dictionary + Send>,
    shutdown: Arc<AtomicBool>,
}

impl Daemon {
    /// Create a new daemon instance without a dictionary.
    pub fn new(config: DaemonConfig) -> Result<Self> {
        Self::with_dictionary(config, Box::new(OfflineDictionary))
    }

    /// Create a daemon that falls back to `dictionary` for the word of the day.
    pub fn with_dictionary(config: DaemonConfig, dictionary: Box<dyn Dictionary + Send>) -> Result<Self> {
        let store = Store::open(&config.root).context("Failed to open store")?;

        Ok(Self {
            config,
            store,
            word_of_day: WordOfDay::new(),
            dictionary,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that stops the daemon; checked after every request and rollover tick.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Serve requests until shut down.
    pub async fn run(&mut self) -> Result<()> {
        let socket_path = self.config.socket_path();
        let pid_path = self.config.pid_path();

        // A previous daemon may have died without cleaning up
        if socket_path.exists() {
            fs::remove_file(&socket_path).ok();
        }
        fs::write(&pid_path, std::process::id().to_string()).context("Failed to write PID file")?;

        let listener = UnixListener::bind(&socket_path).context("Failed to bind to Unix socket")?;
        log::info!("Daemon listening on {:?}", socket_path);

        let (tx, mut rx) = mpsc::channel::<Envelope>(REQUEST_QUEUE);
        let (stop_tx, stop_rx) = watch::channel(false);
        let acceptor = tokio::spawn(Self::accept_connections(listener, tx, stop_rx));

        let mut rollover_check = interval(self.config.rollover_check_interval);

        while !self.shutdown.load(Ordering::Relaxed) {
            tokio::select! {
                Some((request, reply)) = rx.recv() => {
                    let response = self.handle_request(request);
                    // The client may have hung up
                    let _ = reply.send(response);
                }

                _ = rollover_check.tick() => {
                    self.word_of_day.expire(today());
                }
            }
        }

        log::info!("Daemon shutting down");
        drop(rx);
        stop_tx.send(true).ok();
        if let Err(e) = acceptor.await {
            log::warn!("Connection acceptor failed: {}", e);
        }

        fs::remove_file(&socket_path).ok();
        fs::remove_file(&pid_path).ok();

        Ok(())
    }

    /// Accept clients until stopped, then wait for open connections to wind down.
    async fn accept_connections(
        listener: UnixListener,
        tx: mpsc::Sender<Envelope>,
        mut stop: watch::Receiver<bool>,
    ) {
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        connections.spawn(Self::handle_connection(stream, tx.clone(), stop.clone()));
                    }
                    Err(e) => log::error!("Accept error: {}", e),
                },

                _ = stop.changed() => break,

                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    log_connection_result(finished);
                }
            }
        }

        while let Some(finished) = connections.join_next().await {
            log_connection_result(finished);
        }
    }

    /// Serve one client: a JSON request per line, a JSON response per line.
    async fn handle_connection(
        stream: UnixStream,
        tx: mpsc::Sender<Envelope>,
        mut stop: watch::Receiver<bool>,
    ) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line.context("Failed to read line")?,
                _ = stop.changed() => break,
            };
            let Some(line) = line else {
                break;
            };
            if line.is_empty() {
                continue;
            }

            let (response, is_shutdown) = match serde_json::from_str::<Request>(&line) {
                Ok(request) => {
                    let is_shutdown = matches!(request, Request::Shutdown);
                    let (reply_tx, reply_rx) = oneshot::channel();
                    if tx.send((request, reply_tx)).await.is_err() {
                        break;
                    }
                    let Ok(response) = reply_rx.await else {
                        break;
                    };
                    (response, is_shutdown)
                }
                Err(e) => (Response::error(format!("malformed request: {}", e)), false),
            };

            let mut response_json = serde_json::to_string(&response)?;
            response_json.push('\n');
            writer.write_all(response_json.as_bytes()).await?;
            writer.flush().await?;

            if is_shutdown {
                break;
            }
        }

        Ok(())
    }

    /// Handle a single request.
    fn handle_request(&mut self, request: Request) -> Response {
        match request {
            Request::Save { word, content } => match self.store.save(&word, &content) {
                Ok(outcome) => Response::Saved { outcome },
                Err(e) => Response::error(e.to_string()),
            },

            Request::Get { id } => match self.store.card(id) {
                Ok(Some(card)) => Response::Card { card },
                Ok(None) => Response::NotFound { id },
                Err(e) => Response::error(e.to_string()),
            },

            Request::List => match self.store.list() {
                Ok(words) => Response::Words { words },
                Err(e) => Response::error(e.to_string()),
            },

            Request::Delete { id } => match self.store.delete(id) {
                Ok(()) => Response::Ok,
                Err(e) => Response::error(e.to_string()),
            },

            Request::Next => match self.store.next_card() {
                Ok(state) => Response::Session { state },
                Err(e) => Response::error(e.to_string()),
            },

            Request::Rate { id, quality } => match self.store.rate(id, quality) {
                Ok((outcome, state)) => Response::Rated { outcome, state },
                Err(e) => Response::error(e.to_string()),
            },

            Request::Stats => match self.store.stats() {
                Ok(stats) => Response::Stats { stats },
                Err(e) => Response::error(e.to_string()),
            },

            Request::WordOfDay => match self.word_of_day.get(today(), &self.store, self.dictionary.as_ref()) {
                Ok(word) => Response::WordOfDay { word },
                Err(e) => Response::error(e.to_string()),
            },

            Request::Shutdown => {
                self.shutdown.store(true, Ordering::Relaxed);
                Response::Ok
            }

            Request::Ping => Response::Pong,
        }
    }
}

fn log_connection_result(finished: std::result::Result<Result<()>, tokio::task::JoinError>) {
    match finished {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("Connection error: {}", e),
        Err(e) => log::warn!("Connection task failed: {}", e),
    }
}

/// Check if a daemon is running for the given store path.
///
/// A socket left behind by a dead daemon is removed along with its PID file.
pub fn is_daemon_running(root: &Path) -> bool {
    let config = DaemonConfig::new(root);
    let socket_path = config.socket_path();
    let pid_path = config.pid_path();

    if !socket_path.exists() {
        return false;
    }

    let alive = fs::read_to_string(&pid_path)
        .ok()
        .and_then(|pid| pid.trim().parse::<libc::pid_t>().ok())
        .is_some_and(process_alive);

    if !alive {
        log::debug!("Removing stale daemon socket {:?}", socket_path);
        fs::remove_file(&socket_path).ok();
        fs::remove_file(&pid_path).ok();
    }
    alive
}

fn process_alive(pid: libc::pid_t) -> bool {
    // Signal 0 only probes for the process
    unsafe { libc::kill(pid, 0) == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;
    use crate::types::{Content, SaveOutcome};
    use tempfile::TempDir;

    fn setup_test_store() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        Store::init(&root).unwrap();
        (temp_dir, root)
    }

    fn setup_daemon() -> (TempDir, Daemon) {
        let (temp_dir, root) = setup_test_store();
        let daemon = Daemon::new(DaemonConfig::new(&root)).unwrap();
        (temp_dir, daemon)
    }

    #[test]
    fn test_daemon_config() {
        let config = DaemonConfig::new("/test/path");
        assert_eq!(config.socket_path(), PathBuf::from("/test/path/.vocabdeck/daemon.sock"));
        assert_eq!(config.pid_path(), PathBuf::from("/test/path/.vocabdeck/daemon.pid"));
        assert_eq!(config.rollover_check_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_daemon_creation_requires_store() {
        let temp_dir = TempDir::new().unwrap();
        assert!(Daemon::new(DaemonConfig::new(temp_dir.path())).is_err());
    }

    #[test]
    fn test_is_daemon_running_false() {
        let (_temp_dir, root) = setup_test_store();
        assert!(!is_daemon_running(&root));
    }

    #[test]
    fn test_handle_save_and_duplicate() {
        let (_temp_dir, mut daemon) = setup_daemon();

        let save = || Request::Save {
            word: "chat".to_string(),
            content: Content::default(),
        };
        assert!(matches!(
            daemon.handle_request(save()),
            Response::Saved {
                outcome: SaveOutcome::Saved { .. }
            }
        ));
        assert!(matches!(
            daemon.handle_request(save()),
            Response::Saved {
                outcome: SaveOutcome::AlreadyExists { .. }
            }
        ));
    }

    #[test]
    fn test_handle_review_cycle() {
        let (_temp_dir, mut daemon) = setup_daemon();

        assert!(matches!(
            daemon.handle_request(Request::Next),
            Response::Session {
                state: SessionState::Empty
            }
        ));

        daemon.handle_request(Request::Save {
            word: "pain".to_string(),
            content: Content::default(),
        });
        let id = match daemon.handle_request(Request::Next) {
            Response::Session {
                state: SessionState::CardPresented { card, remaining },
            } => {
                assert_eq!(remaining, 1);
                card.id()
            }
            other => panic!("expected a card, got {:?}", other),
        };

        match daemon.handle_request(Request::Rate { id, quality: 5 }) {
            Response::Rated { outcome, state } => {
                assert!(outcome.is_applied());
                assert_eq!(state, SessionState::NoMoreDue);
            }
            other => panic!("expected a rating, got {:?}", other),
        }
    }

    #[test]
    fn test_handle_invalid_quality() {
        let (_temp_dir, mut daemon) = setup_daemon();
        let response = daemon.handle_request(Request::Rate { id: 1, quality: 9 });
        match response {
            Response::Error { message } => assert!(message.contains("quality")),
            other => panic!("expected an error, got {:?}", other),
        }
    }

    #[test]
    fn test_handle_get_includes_review_state() {
        let (_temp_dir, mut daemon) = setup_daemon();

        let id = match daemon.handle_request(Request::Save {
            word: "fleur".to_string(),
            content: Content::with_definitions(["Partie d'une plante"]),
        }) {
            Response::Saved {
                outcome: SaveOutcome::Saved { item },
            } => item.id,
            other => panic!("expected saved, got {:?}", other),
        };

        match daemon.handle_request(Request::Get { id }) {
            Response::Card { card } => {
                assert_eq!(card.item.word, "fleur");
                assert_eq!(card.review.repetitions, 0);
                assert_eq!(card.review.next_review, today());
            }
            other => panic!("expected a card, got {:?}", other),
        }
    }

    #[test]
    fn test_handle_get_missing() {
        let (_temp_dir, mut daemon) = setup_daemon();
        assert!(matches!(
            daemon.handle_request(Request::Get { id: 3 }),
            Response::NotFound { id: 3 }
        ));
    }

    #[test]
    fn test_handle_shutdown_sets_flag() {
        let (_temp_dir, mut daemon) = setup_daemon();
        let handle = daemon.shutdown_handle();
        assert!(matches!(daemon.handle_request(Request::Shutdown), Response::Ok));
        assert!(handle.load(Ordering::Relaxed));
    }
}
