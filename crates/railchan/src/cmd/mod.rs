use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod replay;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode one hex-encoded RAIL PDU or windowing order.
    Decode(DecodeArgs),
    /// Drive a client session from a capture of server traffic.
    Replay(ReplayArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Decode(args) => decode::run(args, format),
        Command::Replay(args) => replay::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Which side sent the PDU being decoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Sender {
    #[default]
    Server,
    Client,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// PDU bytes as hex. Whitespace is ignored.
    #[arg(conflicts_with = "file", required_unless_present = "file")]
    pub hex: Option<String>,
    /// Read hex from a file instead.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
    /// Side that sent the PDU.
    #[arg(long, value_enum, default_value_t = Sender::Server, conflicts_with = "window_order")]
    pub sender: Sender,
    /// Decode as a windowing order starting at its OrderSize field.
    #[arg(long)]
    pub window_order: bool,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Capture file: one hex PDU per line, `altsec:` prefix for windowing
    /// orders, `#` for comments.
    pub file: PathBuf,
    /// Session configuration as a JSON file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Deliver each PDU in chunks of at most this many bytes.
    #[arg(long, value_name = "BYTES")]
    pub chunk_size: Option<usize>,
    /// Do not push the default initial system parameters.
    #[arg(long)]
    pub no_sysparams: bool,
    /// Maximum time to wait for the session to process the capture (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
