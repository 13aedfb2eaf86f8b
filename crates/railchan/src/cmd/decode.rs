use std::fs;

use serde::Serialize;

use railchan_pdu::{decode_client_pdu, decode_server_pdu, decode_window_order, order_name, WindowOrder};

use crate::cmd::{DecodeArgs, Sender};
use crate::exit::{decode_error, io_error, CliError, CliResult, DATA_INVALID, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_decoded, DecodedOutput, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let text = match (&args.hex, &args.file) {
        (Some(hex), None) => hex.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .map_err(|err| io_error(&format!("read {}", path.display()), err))?,
        _ => return Err(CliError::new(USAGE, "provide either HEX or --file")),
    };
    let bytes = parse_hex(&text)?;

    let decoded = if args.window_order {
        describe_window_order(&bytes)?
    } else {
        describe_pdu(&bytes, args.sender)?
    };
    tracing::debug!(
        kind = decoded.kind,
        order = decoded.order_name,
        length = decoded.length,
        "decoded input"
    );

    print_decoded(&decoded, &bytes, format);
    Ok(SUCCESS)
}

/// Parse hex text, ignoring whitespace.
pub fn parse_hex(text: &str) -> CliResult<Vec<u8>> {
    let compact: String = text.split_whitespace().collect();
    if compact.is_empty() {
        return Err(CliError::new(USAGE, "no hex input"));
    }
    hex::decode(&compact).map_err(|err| CliError::new(DATA_INVALID, format!("invalid hex: {err}")))
}

/// Decode one channel PDU sent by `sender`.
pub fn describe_pdu(bytes: &[u8], sender: Sender) -> CliResult<DecodedOutput> {
    let (kind, order_type, body) = match sender {
        Sender::Server => {
            let pdu = decode_server_pdu(bytes).map_err(|err| decode_error("decode server PDU", err))?;
            ("server_pdu", pdu.order_type(), to_body(&pdu)?)
        }
        Sender::Client => {
            let pdu = decode_client_pdu(bytes).map_err(|err| decode_error("decode client PDU", err))?;
            ("client_pdu", pdu.order_type(), to_body(&pdu)?)
        }
    };
    Ok(DecodedOutput {
        kind,
        order_type: Some(order_type),
        order_name: order_name(order_type),
        length: bytes.len(),
        body,
    })
}

/// Decode one windowing order starting at its OrderSize field.
pub fn describe_window_order(bytes: &[u8]) -> CliResult<DecodedOutput> {
    let order = decode_window_order(bytes).map_err(|err| decode_error("decode window order", err))?;
    Ok(DecodedOutput {
        kind: "window_order",
        order_type: None,
        order_name: record_name(&order),
        length: bytes.len(),
        body: to_body(&order)?,
    })
}

fn record_name(order: &WindowOrder) -> &'static str {
    match order {
        WindowOrder::Window(_) => "window",
        WindowOrder::NotifyIcon(_) => "notify_icon",
        WindowOrder::Desktop(_) => "desktop",
    }
}

fn to_body<T: Serialize>(value: &T) -> CliResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|err| CliError::new(INTERNAL, format!("render body: {err}")))
}
