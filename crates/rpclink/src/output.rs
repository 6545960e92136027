use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ResultOutput<'a> {
    kind: &'static str,
    id: &'a str,
    method: &'a str,
    result: &'a Value,
    timestamp: String,
}

#[derive(Serialize)]
struct PushOutput<'a> {
    kind: &'static str,
    channel: &'a str,
    payload: &'a Value,
    timestamp: String,
}

pub fn print_result(method: &str, id: &str, result: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ResultOutput {
                kind: "result",
                id,
                method,
                result,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["METHOD", "ID", "RESULT"])
                .add_row(vec![method.to_string(), id.to_string(), value_preview(result)]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{method} ({id}) =>");
            println!(
                "{}",
                serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string())
            );
        }
        OutputFormat::Raw => println!("{}", value_preview(result)),
    }
}

pub fn print_push(channel: &str, payload: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = PushOutput {
                kind: "push",
                channel,
                payload,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHANNEL", "PAYLOAD"])
                .add_row(vec![channel.to_string(), value_preview(payload)]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "channel={} payload={}",
                channel,
                serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string())
            );
        }
        OutputFormat::Raw => println!("{}", value_preview(payload)),
    }
}

/// Strings print bare; everything else as compact JSON.
fn value_preview(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
