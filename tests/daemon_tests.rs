//! Daemon round-trip tests over the Unix socket.

mod common;

use common::TestEnv;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use vocabdeck::{Client, Content, Daemon, DaemonConfig, Response, SaveOutcome, SessionState, Stats, is_daemon_running};

fn spawn_daemon(root: &Path) -> JoinHandle<()> {
    let root = root.to_path_buf();
    thread::spawn(move || {
        let mut daemon = Daemon::new(DaemonConfig::new(&root)).unwrap();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async { daemon.run().await }).unwrap();
    })
}

fn connect(root: &Path) -> Client {
    for _ in 0..100 {
        if let Ok(client) = Client::connect(root) {
            return client;
        }
        thread::sleep(Duration::from_millis(20));
    }
    panic!("daemon did not come up");
}

#[test]
fn test_daemon_round_trip() {
    let env = TestEnv::new();
    let root = env.temp_dir.path();
    let handle = spawn_daemon(root);
    let mut client = connect(root);

    client.ping().unwrap();
    assert!(is_daemon_running(root));

    let item = match client.save("papillon", &Content::with_definitions(["Insecte"])).unwrap() {
        SaveOutcome::Saved { item } => item,
        other => panic!("expected saved, got {:?}", other),
    };
    assert!(!client.save("papillon", &Content::default()).unwrap().is_saved());
    let card = client.get(item.id).unwrap().unwrap();
    assert_eq!(card.item, item);
    assert_eq!(card.review.repetitions, 0);
    assert_eq!(client.list().unwrap().len(), 1);

    match client.next_card().unwrap() {
        SessionState::CardPresented { card, remaining } => {
            assert_eq!(card.item, item);
            assert_eq!(remaining, 1);
        }
        other => panic!("expected a card, got {:?}", other),
    }

    let (outcome, state) = client.rate(item.id, 5).unwrap();
    assert!(outcome.is_applied());
    assert_eq!(state, SessionState::NoMoreDue);

    // A second submit of the same rating is discarded
    let (outcome, _) = client.rate(item.id, 5).unwrap();
    assert!(!outcome.is_applied());

    assert_eq!(
        client.stats().unwrap(),
        Stats {
            word_count: 1,
            due_count: 0
        }
    );

    let daily = client.word_of_day().unwrap().unwrap();
    assert_eq!(daily.word, "papillon");
    assert_eq!(daily.saved_id, Some(item.id));
    // Cached for the rest of the day
    assert_eq!(client.word_of_day().unwrap(), Some(daily));

    client.delete(item.id).unwrap();
    assert_eq!(client.get(item.id).unwrap(), None);

    client.shutdown().unwrap();
    handle.join().unwrap();
    assert!(!is_daemon_running(root));
}

#[test]
fn test_daemon_reports_errors() {
    let env = TestEnv::new();
    let root = env.temp_dir.path();
    let handle = spawn_daemon(root);
    let mut client = connect(root);

    let err = client.rate(1, 6).unwrap_err();
    assert!(err.to_string().contains("quality"));

    let err = client.save("", &Content::default()).unwrap_err();
    assert!(err.to_string().contains("validation"));

    // The connection stays usable after an error
    client.ping().unwrap();

    client.shutdown().unwrap();
    handle.join().unwrap();
}

#[test]
fn test_daemon_serves_multiple_clients() {
    let env = TestEnv::new();
    let root = env.temp_dir.path();
    let handle = spawn_daemon(root);

    let mut writer = connect(root);
    let mut reader = connect(root);

    writer.save("lune", &Content::default()).unwrap();
    assert_eq!(reader.stats().unwrap().word_count, 1);

    let id = reader.next_card().unwrap().card().map(|c| c.id()).unwrap();
    assert!(writer.rate(id, 3).unwrap().0.is_applied());
    assert!(!reader.rate(id, 3).unwrap().0.is_applied());

    // The reader stays connected; shutdown must not wait on it
    writer.shutdown().unwrap();
    handle.join().unwrap();
    assert!(reader.ping().is_err());
}

#[test]
fn test_idle_connections_do_not_block_new_clients() {
    let env = TestEnv::new();
    let root = env.temp_dir.path();
    let handle = spawn_daemon(root);

    // More idle clients than the runtime has workers
    let workers = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    let mut idle: Vec<Client> = (0..workers * 2 + 2).map(|_| connect(root)).collect();

    let mut active = connect(root);
    active.save("ciel", &Content::default()).unwrap();
    assert_eq!(active.stats().unwrap().word_count, 1);

    // Idle clients are still served once they speak
    for client in idle.iter_mut() {
        client.ping().unwrap();
    }

    active.shutdown().unwrap();
    handle.join().unwrap();
}

#[test]
fn test_malformed_request_gets_error_response() {
    let env = TestEnv::new();
    let root = env.temp_dir.path();
    let handle = spawn_daemon(root);
    let mut client = connect(root);

    let mut raw = UnixStream::connect(DaemonConfig::new(root).socket_path()).unwrap();
    raw.write_all(b"{\"type\":\"Bogus\"}\n").unwrap();
    let mut line = String::new();
    BufReader::new(&raw).read_line(&mut line).unwrap();

    match serde_json::from_str::<Response>(&line).unwrap() {
        Response::Error { message } => assert!(message.contains("malformed")),
        other => panic!("expected an error, got {:?}", other),
    }
    client.ping().unwrap();

    client.shutdown().unwrap();
    handle.join().unwrap();
}
