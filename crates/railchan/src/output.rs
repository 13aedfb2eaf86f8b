use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;

use railchan_session::HandshakeState;

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

/// One decoded PDU or windowing order.
#[derive(Debug, Serialize)]
pub struct DecodedOutput {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_type: Option<u16>,
    pub order_name: &'static str,
    pub length: usize,
    pub body: Value,
}

/// Everything a replay observed.
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub final_state: HandshakeState,
    pub pdus_delivered: usize,
    pub window_orders_delivered: usize,
    pub events: Vec<Value>,
    pub sent: Vec<DecodedOutput>,
    #[serde(skip)]
    pub sent_raw: Vec<Vec<u8>>,
}

pub fn print_decoded(decoded: &DecodedOutput, raw: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(decoded),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "ORDER", "LENGTH", "BODY"])
                .add_row(decoded_row(decoded));
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} {} length={}",
                decoded.kind,
                order_label(decoded),
                decoded.length
            );
            println!(
                "{}",
                serde_json::to_string_pretty(&decoded.body).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Raw => print_raw(raw),
    }
}

pub fn print_report(report: &ReplayReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut events = Table::new();
            events
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "EVENT", "DETAIL"]);
            for (index, event) in report.events.iter().enumerate() {
                let (name, detail) = event_parts(event);
                events.add_row(vec![index.to_string(), name, detail]);
            }
            println!("{events}");

            let mut sent = Table::new();
            sent.load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "ORDER", "LENGTH", "BODY"]);
            for decoded in &report.sent {
                sent.add_row(decoded_row(decoded));
            }
            println!("{sent}");
            println!(
                "state={} pdus={} window_orders={}",
                report.final_state, report.pdus_delivered, report.window_orders_delivered
            );
        }
        OutputFormat::Pretty => {
            for event in &report.events {
                let (name, detail) = event_parts(event);
                if detail.is_empty() {
                    println!("event {name}");
                } else {
                    println!("event {name} {detail}");
                }
            }
            for decoded in &report.sent {
                println!("sent {} length={}", order_label(decoded), decoded.length);
            }
            println!("state {}", report.final_state);
        }
        OutputFormat::Raw => {
            for pdu in &report.sent_raw {
                print_raw(pdu);
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn decoded_row(decoded: &DecodedOutput) -> Vec<String> {
    vec![
        decoded.kind.to_string(),
        order_label(decoded),
        decoded.length.to_string(),
        decoded.body.to_string(),
    ]
}

fn order_label(decoded: &DecodedOutput) -> String {
    match decoded.order_type {
        Some(order_type) => format!("0x{order_type:04X} ({})", decoded.order_name),
        None => decoded.order_name.to_string(),
    }
}

/// Split a serialized event into its tag and a compact rendering of its data.
fn event_parts(event: &Value) -> (String, String) {
    let name = event
        .get("event")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let detail = event
        .get("data")
        .map(Value::to_string)
        .unwrap_or_default();
    (name, detail)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn event_parts_splits_tag_and_data() {
        let (name, detail) = event_parts(&json!({"event": "langbar_info", "data": {"status": 3}}));
        assert_eq!(name, "langbar_info");
        assert_eq!(detail, r#"{"status":3}"#);

        let (name, detail) = event_parts(&json!({"event": "established"}));
        assert_eq!(name, "established");
        assert!(detail.is_empty());
    }

    #[test]
    fn window_orders_have_no_order_type_label() {
        let decoded = DecodedOutput {
            kind: "window_order",
            order_type: None,
            order_name: "desktop",
            length: 6,
            body: Value::Null,
        };
        assert_eq!(order_label(&decoded), "desktop");
        let json = serde_json::to_value(&decoded).unwrap();
        assert!(json.get("order_type").is_none());
    }
}
