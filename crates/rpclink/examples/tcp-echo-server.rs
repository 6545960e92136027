//! Line-delimited JSON-RPC server for trying the CLI.
//!
//! Answers `echo` with its params, acknowledges `subscribe` and then
//! pushes a tick on that channel every second.
//!
//! Run with:
//!   cargo run --example tcp-echo-server --features async
//!
//! In another terminal:
//!   cargo run --features cli -- call 127.0.0.1:7400 echo --params '{"hello":"world"}'
//!   cargo run --features cli -- subscribe 127.0.0.1:7400 ticks --count 3

use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:7400").await?;
    eprintln!("Listening on {}", listener.local_addr()?);

    loop {
        let (stream, peer) = listener.accept().await?;
        eprintln!("Client connected: {peer}");
        tokio::spawn(async move {
            if let Err(err) = serve(stream).await {
                eprintln!("Client {peer} failed: {err}");
            }
            eprintln!("Client disconnected: {peer}");
        });
    }
}

async fn serve(stream: TcpStream) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Value>();

    let writer_task = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            let line = format!("{message}\n");
            if writer.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        let Ok(message) = serde_json::from_str::<Value>(&line) else {
            eprintln!("Ignoring non-JSON line");
            continue;
        };
        let id = message["id"].clone();
        if id.is_null() {
            eprintln!("Notification: {message}");
            continue;
        }

        let reply = match message["method"].as_str() {
            Some("echo") => json!({"jsonrpc": "2.0", "id": id, "result": message["params"]}),
            Some("subscribe") => {
                let channel = message["params"].as_str().unwrap_or("ticks").to_string();
                spawn_ticker(channel.clone(), out_tx.clone());
                json!({"jsonrpc": "2.0", "id": id, "result": {"status": "subscribed", "channel": channel}})
            }
            _ => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32601, "message": "Method not found"},
            }),
        };
        if out_tx.send(reply).is_err() {
            break;
        }
    }

    drop(out_tx);
    let _ = writer_task.await;
    Ok(())
}

fn spawn_ticker(channel: String, out: mpsc::UnboundedSender<Value>) {
    tokio::spawn(async move {
        let mut tick = 0u64;
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            tick += 1;
            let push = json!({"jsonrpc": "2.0", "channel": channel, "payload": {"tick": tick}});
            if out.send(push).is_err() {
                break;
            }
        }
    });
}
