#![cfg(feature = "cli")]

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::process::Command;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};

/// One-connection JSON-RPC server on a background thread.
///
/// Every inbound message is forwarded on the returned receiver; replies
/// come from `respond`, which may return any number of lines.
fn spawn_server<F>(respond: F) -> (String, mpsc::Receiver<Value>)
where
    F: Fn(&Value) -> Vec<Value> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
    let addr = listener.local_addr().expect("local addr").to_string();
    let (seen_tx, seen_rx) = mpsc::channel();

    thread::spawn(move || {
        let Ok((stream, _)) = listener.accept() else {
            return;
        };
        let mut writer = stream.try_clone().expect("clone stream");
        for line in BufReader::new(stream).lines() {
            let Ok(line) = line else {
                break;
            };
            let Ok(message) = serde_json::from_str::<Value>(&line) else {
                continue;
            };
            for reply in respond(&message) {
                if writeln!(writer, "{reply}").is_err() {
                    return;
                }
            }
            let _ = seen_tx.send(message);
        }
    });

    (addr, seen_rx)
}

fn rpc_server() -> (String, mpsc::Receiver<Value>) {
    spawn_server(|message| {
        let id = message["id"].clone();
        match message["method"].as_str() {
            _ if id.is_null() => Vec::new(),
            Some("echo") => vec![json!({"jsonrpc": "2.0", "id": id, "result": message["params"]})],
            Some("fail") => vec![json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32000, "message": "boom"},
            })],
            Some("subscribe") if message["params"] == "forbidden" => vec![json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32001, "message": "not allowed"},
            })],
            Some("subscribe") if message["params"] == "denied" => vec![json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {"status": "denied", "channel": "denied"},
            })],
            Some("subscribe") => {
                let channel = message["params"].clone();
                vec![
                    json!({"jsonrpc": "2.0", "id": id, "result": {"status": "subscribed", "channel": channel}}),
                    json!({"jsonrpc": "2.0", "channel": channel, "payload": {"tick": 1}}),
                    json!({"jsonrpc": "2.0", "channel": channel, "payload": {"tick": 2}}),
                ]
            }
            Some("silent") => Vec::new(),
            _ => vec![json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32601, "message": "Method not found"},
            })],
        }
    })
}

fn rpclink() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_rpclink"));
    command
        .env_remove("RPCLINK_TOKEN")
        .arg("--log-level")
        .arg("error");
    command
}

#[test]
fn call_prints_result_as_json() {
    let (addr, _seen) = rpc_server();

    let output = rpclink()
        .arg("--format")
        .arg("json")
        .arg("call")
        .arg(&addr)
        .arg("echo")
        .arg("--params")
        .arg("{\"a\":1}")
        .output()
        .expect("call should run");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let printed: Value = serde_json::from_str(stdout.trim()).expect("stdout should be json");
    assert_eq!(printed["kind"], "result");
    assert_eq!(printed["method"], "echo");
    assert_eq!(printed["result"], json!({"a": 1}));
}

#[test]
fn call_sends_token_when_given() {
    let (addr, seen) = rpc_server();

    let output = rpclink()
        .arg("--format")
        .arg("raw")
        .arg("--token")
        .arg("s3cret")
        .arg("call")
        .arg(&addr)
        .arg("echo")
        .arg("--params")
        .arg("\"hi\"")
        .output()
        .expect("call should run");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hi");
    let request = seen
        .recv_timeout(Duration::from_secs(5))
        .expect("server should see the request");
    assert_eq!(request["token"], "s3cret");
    assert_eq!(request["jsonrpc"], "2.0");
}

#[test]
fn remote_error_exits_1() {
    let (addr, _seen) = rpc_server();

    let output = rpclink()
        .arg("call")
        .arg(&addr)
        .arg("fail")
        .output()
        .expect("call should run");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("boom"));
}

#[test]
fn refused_connection_exits_3() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        listener.local_addr().expect("local addr").to_string()
    };

    let output = rpclink()
        .arg("call")
        .arg(&addr)
        .arg("echo")
        .output()
        .expect("call should run");

    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn missing_reply_exits_124() {
    let (addr, _seen) = rpc_server();

    let output = rpclink()
        .arg("call")
        .arg(&addr)
        .arg("silent")
        .arg("--timeout")
        .arg("300ms")
        .output()
        .expect("call should run");

    assert_eq!(output.status.code(), Some(124));
}

#[test]
fn invalid_params_exit_64() {
    let output = rpclink()
        .arg("call")
        .arg("127.0.0.1:9")
        .arg("echo")
        .arg("--params")
        .arg("{nope")
        .output()
        .expect("call should run");

    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn invalid_endpoint_exits_64() {
    let output = rpclink()
        .arg("call")
        .arg("no-port")
        .arg("echo")
        .output()
        .expect("call should run");

    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn notify_is_delivered_without_id() {
    let (addr, seen) = rpc_server();

    let output = rpclink()
        .arg("notify")
        .arg(&addr)
        .arg("log")
        .arg("--params")
        .arg("null")
        .output()
        .expect("notify should run");

    assert!(output.status.success());
    let message = seen
        .recv_timeout(Duration::from_secs(5))
        .expect("server should see the notification");
    assert_eq!(message["method"], "log");
    assert!(message.get("id").is_none());
    assert_eq!(message.get("params"), Some(&Value::Null));
}

#[test]
fn subscribe_prints_pushes_until_count() {
    let (addr, _seen) = rpc_server();

    let output = rpclink()
        .arg("--format")
        .arg("json")
        .arg("subscribe")
        .arg(&addr)
        .arg("ticks")
        .arg("--count")
        .arg("2")
        .output()
        .expect("subscribe should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let pushes: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be json"))
        .collect();
    assert_eq!(pushes.len(), 2);
    assert_eq!(pushes[0]["channel"], "ticks");
    assert_eq!(pushes[0]["payload"], json!({"tick": 1}));
    assert_eq!(pushes[1]["payload"], json!({"tick": 2}));
}

#[test]
fn subscribe_error_reply_exits_1() {
    let (addr, _seen) = rpc_server();

    let output = rpclink()
        .arg("subscribe")
        .arg(&addr)
        .arg("forbidden")
        .output()
        .expect("subscribe should run");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("not allowed"));
    assert!(output.stdout.is_empty());
}

#[test]
fn unacknowledged_subscribe_exits_1() {
    let (addr, _seen) = rpc_server();

    let output = rpclink()
        .arg("subscribe")
        .arg(&addr)
        .arg("denied")
        .output()
        .expect("subscribe should run");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("not acknowledged"));
}

#[test]
fn version_reports_name() {
    let output = rpclink()
        .arg("version")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("rpclink "));
}

#[test]
fn extended_version_reports_client_defaults() {
    let output = rpclink()
        .arg("version")
        .arg("--extended")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("reconnect_interval: 5000ms"));
    assert!(stdout.contains("send_retry_interval: 1000ms"));
    assert!(stdout.contains("max_queued: 1024"));
}
