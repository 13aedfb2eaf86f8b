//! Drive a client session against a capture of server traffic.
//!
//! Capture format, one item per line:
//!
//! ```text
//! # server handshake
//! 0500080071170000
//! altsec: 070001000004
//! ```

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;

use railchan_pdu::{
    default_initial_sysparams, exec_result_name, GetAppIdResponsePdu, MinMaxInfoPdu, MoveSizePdu,
    ServerSysParam, WindowOrder,
};
use railchan_session::{EventSink, RailChannel, SessionConfig, SessionError, SysParamPusher, Utf16Codec};
use railchan_transport::{ByteSink, VecSink};

use crate::cmd::decode::{describe_pdu, parse_hex};
use crate::cmd::{ReplayArgs, Sender};
use crate::exit::{
    io_error, session_error, CliError, CliResult, DATA_INVALID, INTERNAL, SUCCESS, TIMEOUT, USAGE,
};
use crate::output::{print_report, OutputFormat, ReplayReport};

const WINDOW_ORDER_PREFIX: &str = "altsec:";

/// One item of a capture file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureItem {
    ChannelPdu(Vec<u8>),
    WindowOrder(Vec<u8>),
}

/// A session event, as reported in the replay output.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ReplayEvent {
    HandshakeSent,
    HandshakeReceived { build_number: u32 },
    InitialSysparams { pushed: usize },
    ExecResult { exec_result: u16, name: &'static str, raw_result: u32 },
    Established,
    ServerSysparam(ServerSysParam),
    MoveSize(MoveSizePdu),
    MinMaxInfo(MinMaxInfoPdu),
    LangbarInfo { status: u32 },
    AppIdResponse(GetAppIdResponsePdu),
    WindowOrder(WindowOrder),
    SendFailed { order_type: u16, error: String },
    Terminated,
}

/// Event sink that keeps every callback for the report.
#[derive(Debug, Default)]
struct ReplayRecorder {
    push_sysparams: bool,
    events: Mutex<Vec<ReplayEvent>>,
}

impl ReplayRecorder {
    fn new(push_sysparams: bool) -> Self {
        Self {
            push_sysparams,
            events: Mutex::default(),
        }
    }

    fn record(&self, event: ReplayEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn take(&self) -> Vec<ReplayEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl EventSink for ReplayRecorder {
    fn on_handshake_sent(&self) {
        self.record(ReplayEvent::HandshakeSent);
    }

    fn on_handshake_received(&self, build_number: u32) {
        self.record(ReplayEvent::HandshakeReceived { build_number });
    }

    fn on_push_initial_sysparams(&self, pusher: &mut SysParamPusher<'_>) {
        if self.push_sysparams {
            for param in default_initial_sysparams() {
                if let Err(err) = pusher.push(param) {
                    tracing::warn!(error = %err, "stopped pushing initial sysparams");
                    break;
                }
            }
        }
        self.record(ReplayEvent::InitialSysparams {
            pushed: pusher.pushed(),
        });
    }

    fn on_exec_result(&self, exec_result: u16, raw_result: u32) {
        self.record(ReplayEvent::ExecResult {
            exec_result,
            name: exec_result_name(exec_result),
            raw_result,
        });
    }

    fn on_established(&self) {
        self.record(ReplayEvent::Established);
    }

    fn on_server_sysparam(&self, param: ServerSysParam) {
        self.record(ReplayEvent::ServerSysparam(param));
    }

    fn on_move_size(&self, pdu: &MoveSizePdu) {
        self.record(ReplayEvent::MoveSize(*pdu));
    }

    fn on_min_max_info(&self, pdu: &MinMaxInfoPdu) {
        self.record(ReplayEvent::MinMaxInfo(*pdu));
    }

    fn on_langbar_info(&self, status: u32) {
        self.record(ReplayEvent::LangbarInfo { status });
    }

    fn on_app_id_response(&self, pdu: &GetAppIdResponsePdu) {
        self.record(ReplayEvent::AppIdResponse(pdu.clone()));
    }

    fn on_window_order(&self, order: &WindowOrder) {
        self.record(ReplayEvent::WindowOrder(order.clone()));
    }

    fn on_send_failed(&self, order_type: u16, error: &SessionError) {
        self.record(ReplayEvent::SendFailed {
            order_type,
            error: error.to_string(),
        });
    }

    fn on_terminated(&self) {
        self.record(ReplayEvent::Terminated);
    }
}

pub fn run(args: ReplayArgs, format: OutputFormat) -> CliResult<i32> {
    let config = load_config(args.config.as_deref())?;
    let timeout = parse_duration(&args.timeout)?;
    if args.chunk_size == Some(0) {
        return Err(CliError::new(USAGE, "--chunk-size must be greater than zero"));
    }

    let text = fs::read_to_string(&args.file)
        .map_err(|err| io_error(&format!("read {}", args.file.display()), err))?;
    let items = parse_capture(&text)?;

    let sink = Arc::new(VecSink::new());
    let byte_sink: Arc<dyn ByteSink> = sink.clone();
    let recorder = Arc::new(ReplayRecorder::new(!args.no_sysparams));
    let mut channel = RailChannel::open(config, &byte_sink, recorder.clone(), Arc::new(Utf16Codec))
        .map_err(|err| session_error("open channel", err))?;

    channel
        .connected()
        .map_err(|err| session_error("connect channel", err))?;

    let mut pdus_delivered = 0;
    let mut window_orders_delivered = 0;
    for item in &items {
        match item {
            CaptureItem::ChannelPdu(pdu) => {
                deliver(&mut channel, pdu, args.chunk_size)?;
                pdus_delivered += 1;
            }
            CaptureItem::WindowOrder(order) => {
                channel
                    .deliver_window_order(order)
                    .map_err(|err| session_error("deliver window order", err))?;
                window_orders_delivered += 1;
            }
        }
    }

    if !channel.wait_idle(timeout) {
        return Err(CliError::new(
            TIMEOUT,
            format!("session did not finish the capture within {}", args.timeout),
        ));
    }
    let final_state = channel.state();
    let outcome = channel.close();
    tracing::debug!(?outcome, %final_state, "replay finished");

    let sent_raw: Vec<Vec<u8>> = sink.take().iter().map(|pdu| pdu.to_vec()).collect();
    let sent = sent_raw
        .iter()
        .map(|pdu| describe_pdu(pdu, Sender::Client))
        .collect::<CliResult<Vec<_>>>()?;
    let events = recorder
        .take()
        .iter()
        .map(|event| {
            serde_json::to_value(event)
                .map_err(|err| CliError::new(INTERNAL, format!("render event: {err}")))
        })
        .collect::<CliResult<Vec<_>>>()?;

    let report = ReplayReport {
        final_state,
        pdus_delivered,
        window_orders_delivered,
        events,
        sent,
        sent_raw,
    };
    print_report(&report, format);
    Ok(SUCCESS)
}

/// Parse a capture file into channel PDUs and windowing orders.
pub fn parse_capture(text: &str) -> CliResult<Vec<CaptureItem>> {
    let mut items = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line_error =
            |err: CliError| CliError::new(DATA_INVALID, format!("line {}: {}", index + 1, err));
        let item = match line.strip_prefix(WINDOW_ORDER_PREFIX) {
            Some(rest) => CaptureItem::WindowOrder(parse_hex(rest).map_err(line_error)?),
            None => CaptureItem::ChannelPdu(parse_hex(line).map_err(line_error)?),
        };
        items.push(item);
    }
    if items.is_empty() {
        return Err(CliError::new(DATA_INVALID, "capture contains no PDUs"));
    }
    Ok(items)
}

fn deliver(channel: &mut RailChannel, pdu: &[u8], chunk_size: Option<usize>) -> CliResult<()> {
    let total = pdu.len();
    let size = chunk_size.unwrap_or(total).max(1);
    let chunks: Vec<&[u8]> = pdu.chunks(size).collect();
    let last = chunks.len().saturating_sub(1);
    for (index, chunk) in chunks.iter().enumerate() {
        channel
            .deliver_chunk(chunk, total, index == 0, index == last)
            .map_err(|err| session_error("deliver PDU", err))?;
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> CliResult<SessionConfig> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };
    let text = fs::read_to_string(path)
        .map_err(|err| io_error(&format!("read {}", path.display()), err))?;
    serde_json::from_str(&text)
        .map_err(|err| CliError::new(USAGE, format!("invalid config {}: {err}", path.display())))
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
