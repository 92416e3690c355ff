//! Integration tests for the stdio transport
//!
//! These spawn the server binary, exchange newline-delimited JSON-RPC over
//! its stdin and stdout, and keep stdin open until each reply has arrived.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use assert_cmd::cargo::CommandCargoExt;
use predicates::prelude::*;
use serde_json::{json, Value};

fn command() -> Command {
    let mut cmd = Command::cargo_bin("tripkit-mcp").expect("binary builds");
    cmd.env("TRIPKIT_GENERATOR", "stub")
        .env_remove("TRIPKIT_API_KEYS")
        .env_remove("GOOGLE_AI_API_KEY")
        .env_remove("TRIPKIT_CLIENT_TOKEN")
        .env("RUST_LOG", "error");
    cmd
}

struct Session {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl Session {
    fn start(mut cmd: Command) -> Self {
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("server starts");
        let stdin = child.stdin.take();
        let stdout = BufReader::new(child.stdout.take().expect("piped stdout"));
        Self {
            child,
            stdin,
            stdout,
        }
    }

    fn send(&mut self, message: Value) {
        let stdin = self.stdin.as_mut().expect("stdin open");
        writeln!(stdin, "{}", message).expect("write message");
        stdin.flush().expect("flush stdin");
    }

    fn recv(&mut self) -> Value {
        let mut line = String::new();
        self.stdout.read_line(&mut line).expect("read reply");
        serde_json::from_str(&line).expect("each stdout line is JSON")
    }

    fn request(&mut self, message: Value) -> Value {
        self.send(message);
        self.recv()
    }

    /// `initialize` followed by the `initialized` notification.
    fn handshake(&mut self) -> Value {
        let reply = self.request(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": { "name": "stdio-test", "version": "0.0.0" }
            }
        }));
        self.send(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}));
        reply
    }

    fn close(mut self) -> std::process::ExitStatus {
        drop(self.stdin.take());
        self.child.wait().expect("server exits")
    }
}

fn generate_trip(id: u64, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": "generate_trip", "arguments": arguments }
    })
}

#[test]
fn test_initialize_protocol() {
    let mut session = Session::start(command());
    let response = session.handshake();

    assert_eq!(response["jsonrpc"], "2.0");
    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["protocolVersion"], "2025-03-26");
    assert_eq!(response["result"]["serverInfo"]["name"], "tripkit");
    assert!(response["result"]["capabilities"]["tools"].is_object());
    assert!(session.close().success());
}

#[test]
fn test_session_flow() {
    let mut session = Session::start(command());
    session.handshake();

    let tools = session.request(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}));
    assert_eq!(tools["result"]["tools"][0]["name"], "generate_trip");

    let response = session.request(generate_trip(
        3,
        json!({
            "destination": "Paris",
            "start_date": "2025-06-01",
            "end_date": "2025-06-03"
        }),
    ));
    let result = &response["result"];
    assert_eq!(response["id"], 3);
    assert_eq!(result["isError"], false);
    assert_eq!(result["structuredContent"]["data"]["title"], "3 Days in Paris");
    assert_eq!(result["content"][1]["resource"]["mimeType"], "text/html");

    assert!(session.close().success());
}

#[test]
fn test_unknown_tool_is_json_rpc_error() {
    let mut session = Session::start(command());
    session.handshake();

    let response = session.request(json!({
        "jsonrpc": "2.0",
        "id": 4,
        "method": "tools/call",
        "params": { "name": "book_flight", "arguments": {} }
    }));
    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(response["error"]["message"], "Unknown tool: book_flight");
    session.close();
}

#[test]
fn test_client_token_is_presented_to_keyed_server() {
    let mut keyed = command();
    keyed.env("TRIPKIT_API_KEYS", "desktop:secret-token");

    let mut session = Session::start(keyed);
    session.handshake();
    let response = session.request(generate_trip(5, json!({})));
    assert_eq!(
        response["result"]["structuredContent"]["error"]["kind"],
        "AuthenticationFailed"
    );
    session.close();

    let mut with_token = command();
    with_token
        .env("TRIPKIT_API_KEYS", "desktop:secret-token")
        .env("TRIPKIT_CLIENT_TOKEN", "secret-token");

    let mut session = Session::start(with_token);
    session.handshake();
    let response = session.request(generate_trip(6, json!({})));
    assert_eq!(
        response["result"]["structuredContent"]["error"]["kind"],
        "ValidationFailed"
    );
    session.close();
}

#[test]
fn test_logs_stay_off_stdout() {
    let mut debug = command();
    debug.env("RUST_LOG", "debug");

    let mut session = Session::start(debug);
    let response = session.handshake();
    assert_eq!(response["result"]["serverInfo"]["name"], "tripkit");
    let tools = session.request(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}));
    assert_eq!(tools["id"], 2);
    assert!(session.close().success());
}

#[test]
fn test_invalid_generator_config_fails_startup() {
    let mut cmd = assert_cmd::Command::cargo_bin("tripkit-mcp").expect("binary builds");
    cmd.env("TRIPKIT_GENERATOR", "carrier-pigeon")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("TRIPKIT_GENERATOR"));
}
