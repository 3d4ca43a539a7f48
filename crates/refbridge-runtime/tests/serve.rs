//! End-to-end runs of the line transport over an in-memory pipe

mod common;

use std::sync::Arc;
use std::time::Duration;

use refbridge_runtime::{serve, BridgeConfig, ServeError, Session};
use refbridge_stdlib::{register_stdlib, ConsoleBuffer, ConsoleTarget, ModuleRegistry};
use serde_json::{json, Value as Json};
use tokio::io::{
    AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf,
};
use tokio::task::JoinHandle;

struct Peer {
    session: Arc<Session>,
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    input: WriteHalf<DuplexStream>,
    server: JoinHandle<Result<(), ServeError>>,
}

impl Peer {
    fn start() -> Self {
        let console = ConsoleTarget::Buffer(ConsoleBuffer::default());
        let config = BridgeConfig::default().with_console_target(console);
        let mut modules = ModuleRegistry::new();
        register_stdlib(&mut modules);
        modules.register("fixtures", common::fixtures);
        let session = Session::with_modules(config, modules);

        let (client, server) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server);
        let (client_read, client_write) = tokio::io::split(client);
        let reader = BufReader::new(server_read);
        let server = tokio::spawn(serve(Arc::clone(&session), reader, server_write));

        Self {
            session,
            lines: BufReader::new(client_read).lines(),
            input: client_write,
            server,
        }
    }

    async fn send_raw(&mut self, line: &str) {
        self.input.write_all(line.as_bytes()).await.unwrap();
        self.input.write_all(b"\n").await.unwrap();
    }

    async fn send(&mut self, message: Json) {
        self.send_raw(&message.to_string()).await;
    }

    async fn recv(&mut self) -> Json {
        let line = tokio::time::timeout(Duration::from_secs(2), self.lines.next_line())
            .await
            .expect("timed out waiting for output")
            .unwrap()
            .expect("output closed");
        serde_json::from_str(&line).unwrap()
    }

    async fn close(mut self) -> Vec<Json> {
        self.input.shutdown().await.unwrap();
        self.server.await.unwrap().unwrap();
        let mut rest = Vec::new();
        while let Some(line) = self.lines.next_line().await.unwrap() {
            rest.push(serde_json::from_str(&line).unwrap());
        }
        rest
    }
}

fn call(r: u64, ffid: u64, key: &str, args: Json) -> Json {
    json!({"r": r, "action": "call", "ffid": ffid, "key": key, "args": args})
}

#[tokio::test]
async fn test_every_message_is_stamped() {
    let mut peer = Peer::start();
    peer.send(json!({"r": 1, "action": "get", "ffid": 0, "key": "console"})).await;
    let reply = peer.recv().await;
    assert_eq!(reply["r"], 1);
    assert_eq!(reply["key"], "obj");
    assert!(reply["ts"].as_i64().is_some_and(|ts| ts > 0));
    assert!(peer.close().await.is_empty());
}

#[tokio::test]
async fn test_slow_requests_do_not_block_fast_ones() {
    let mut peer = Peer::start();
    peer.send(call(1, 0, "require", json!(["timers"]))).await;
    let timers = peer.recv().await["val"].as_u64().unwrap();

    peer.send(call(2, timers, "delay", json!([200, "slow"]))).await;
    peer.send(call(3, timers, "delay", json!([0, "fast"]))).await;

    let first = peer.recv().await;
    let second = peer.recv().await;
    assert_eq!((first["r"].clone(), first["val"].clone()), (json!(3), json!("fast")));
    assert_eq!((second["r"].clone(), second["val"].clone()), (json!(2), json!("slow")));
    peer.close().await;
}

#[tokio::test]
async fn test_malformed_lines_are_skipped() {
    let mut peer = Peer::start();
    peer.send_raw("this is not json").await;
    peer.send_raw("").await;
    peer.send_raw(r#"{"action":"get"}"#).await;
    peer.send(json!({"r": 9, "action": "explode", "ffid": 0})).await;
    peer.send(json!({"r": 10, "action": "get", "ffid": 0, "key": "nothing"})).await;

    let invalid = peer.recv().await;
    assert_eq!(invalid["r"], 9);
    assert_eq!(invalid["error"], "ProtocolError");

    let reply = peer.recv().await;
    assert_eq!(reply["r"], 10);
    assert_eq!(reply["key"], "void");
    peer.close().await;
}

#[tokio::test]
async fn test_end_of_input_waits_for_in_flight_requests() {
    let mut peer = Peer::start();
    peer.send(call(1, 0, "require", json!(["timers"]))).await;
    let timers = peer.recv().await["val"].as_u64().unwrap();

    peer.send(call(2, timers, "delay", json!([50, "done"]))).await;
    let rest = peer.close().await;
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0]["r"], 2);
    assert_eq!(rest[0]["val"], "done");
}

#[tokio::test]
async fn test_notifications_share_the_output() {
    let mut peer = Peer::start();
    peer.send(call(1, 0, "require", json!(["events"]))).await;
    let events = peer.recv().await["val"].as_u64().unwrap();
    peer.send(json!({"r": 2, "action": "init", "ffid": events, "key": "EventEmitter", "args": []}))
        .await;
    let bus = peer.recv().await["val"].as_u64().unwrap();

    peer.send(call(3, 0, "start", json!([bus, "ready", "cb-1"]))).await;
    assert_eq!(peer.recv().await["val"], true);

    peer.send(call(4, bus, "emit", json!(["ready", "payload"]))).await;
    let mut seen = vec![peer.recv().await, peer.recv().await];
    seen.sort_by_key(|m| m.get("cb").is_some());

    let reply = &seen[0];
    assert_eq!(reply["r"], 4);
    assert_eq!(reply["val"], true);

    let note = &seen[1];
    assert_eq!(note["cb"], "cb-1");
    assert!(note["r"].as_i64().is_some_and(|fired| fired > 0));
    assert!(note["ts"].as_i64().is_some());
    let bundle = note["val"].as_u64().unwrap();

    peer.send(json!({"r": 5, "action": "serialize", "ffid": bundle})).await;
    assert_eq!(peer.recv().await["val"], r#"["payload"]"#);
    peer.close().await;
}

#[tokio::test]
async fn test_session_serves_once() {
    let mut peer = Peer::start();
    // One round trip guarantees the first loop owns the output
    peer.send(json!({"r": 1, "action": "get", "ffid": 0, "key": "stop"})).await;
    assert_eq!(peer.recv().await["key"], "fn");

    let (_, idle) = tokio::io::duplex(64);
    let (read, write) = tokio::io::split(idle);
    let second = serve(Arc::clone(&peer.session), BufReader::new(read), write).await;
    assert!(matches!(second, Err(ServeError::AlreadyServing)));
    peer.close().await;
}
