use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use glob::glob;
use pktforge_core::protocols::dot11;
use pktforge_core::protocols::dns::DnsPacket;
use pktforge_core::protocols::gtp::GtpV1Packet;
use pktforge_core::protocols::ipv4::IpV4Packet;
use pktforge_core::protocols::radiotap::RadiotapPacket;
use pktforge_core::protocols::ssh;
use pktforge_core::protocols::tcp::TcpPacket;
use pktforge_core::protocols::udp::UdpPacket;
use pktforge_core::{Packet, PacketDecoder, ProtocolRegistry};
use tracing::{Level, debug};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("PKTFORGE_BUILD_COMMIT"),
    " ",
    env!("PKTFORGE_BUILD_DATE"),
    ")"
);

const EXAMPLES: &str = "Examples:\n  pktforge decode --hex 4500001c... --protocol ipv4\n  pktforge decode frame.bin --protocol radiotap --json --pretty\n  pktforge decode 'captures/*.bin' --protocol dot11";

#[derive(Parser, Debug)]
#[command(name = "pktforge")]
#[command(version = VERSION)]
#[command(
    about = "Decode binary network packets and print their layers.",
    long_about = None,
    after_help = EXAMPLES
)]
struct Cli {
    /// Debug-level diagnostics on stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only report errors on stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode one packet from a file of raw bytes or from a hex string.
    #[command(after_help = EXAMPLES)]
    Decode {
        /// File holding the raw packet bytes (a glob must match exactly one file)
        #[arg(required_unless_present = "hex", conflicts_with = "hex")]
        input: Option<PathBuf>,

        /// Packet bytes as hex digits; whitespace and ':' separators are ignored
        #[arg(long)]
        hex: Option<String>,

        /// Outermost layer of the packet
        #[arg(short, long, value_enum, default_value_t = Layer::Ipv4)]
        protocol: Layer,

        /// Print the JSON layer tree instead of the text dump
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output
        #[arg(long, requires = "json")]
        pretty: bool,
    },
}

/// Entry points a capture can start from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Layer {
    Ipv4,
    Tcp,
    Udp,
    Dns,
    GtpU,
    Ssh2,
    Radiotap,
    /// 802.11 frame without FCS
    Dot11,
    /// 802.11 frame ending with a 4-octet FCS
    Dot11Fcs,
}

impl Layer {
    fn decoder(self) -> PacketDecoder {
        match self {
            Layer::Ipv4 => IpV4Packet::decode,
            Layer::Tcp => TcpPacket::decode,
            Layer::Udp => UdpPacket::decode,
            Layer::Dns => DnsPacket::decode,
            Layer::GtpU => GtpV1Packet::decode,
            Layer::Ssh2 => ssh::decode_stream,
            Layer::Radiotap => RadiotapPacket::decode,
            Layer::Dot11 => dot11::decode_frame,
            Layer::Dot11Fcs => dot11::decode_frame_with_fcs,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Decode {
            input,
            hex,
            protocol,
            json,
            pretty,
        } => cmd_decode(input, hex, protocol, json, pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::ERROR
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{:#}", err), None)
    }
}

fn cmd_decode(
    input: Option<PathBuf>,
    hex: Option<String>,
    protocol: Layer,
    json: bool,
    pretty: bool,
) -> Result<(), CliError> {
    let bytes = match (input, hex) {
        (_, Some(hex)) => parse_hex(&hex)?,
        (Some(input), None) => read_input(&input)?,
        (None, None) => {
            return Err(CliError::new(
                "missing packet bytes",
                Some("pass an input file or --hex".to_string()),
            ));
        }
    };
    if bytes.is_empty() {
        return Err(CliError::new(
            "input holds no bytes",
            Some("a packet needs at least its fixed header".to_string()),
        ));
    }
    debug!(len = bytes.len(), ?protocol, "decoding");

    let registry = ProtocolRegistry::global();
    let packet = (protocol.decoder())(registry, &bytes, 0, bytes.len()).map_err(|err| {
        CliError::new(
            format!("decode failed: {}", err),
            Some(format!(
                "check that the bytes start with a {} header (--protocol)",
                protocol_name(protocol)
            )),
        )
    })?;

    if json {
        print!("{}", serialize_packet(packet.as_ref(), pretty)?);
        println!();
    } else {
        print!("{}", packet.render(0));
    }
    Ok(())
}

fn protocol_name(protocol: Layer) -> String {
    protocol
        .to_possible_value()
        .map(|value| value.get_name().to_string())
        .unwrap_or_default()
}

fn serialize_packet(packet: &dyn Packet, pretty: bool) -> Result<String, CliError> {
    let value = packet.to_json();
    if pretty {
        serde_json::to_string_pretty(&value)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(&value)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

fn parse_hex(text: &str) -> Result<Vec<u8>, CliError> {
    let digits: Vec<char> = text
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    if digits.len() % 2 != 0 {
        return Err(CliError::new(
            format!("odd number of hex digits ({})", digits.len()),
            Some("each byte takes two hex digits, e.g. 4500".to_string()),
        ));
    }
    digits
        .chunks(2)
        .map(|pair| {
            let hi = pair[0].to_digit(16);
            let lo = pair[1].to_digit(16);
            match (hi, lo) {
                (Some(hi), Some(lo)) => Ok((hi << 4 | lo) as u8),
                _ => Err(CliError::new(
                    format!("invalid hex byte '{}{}'", pair[0], pair[1]),
                    Some("use the digits 0-9 and a-f".to_string()),
                )),
            }
        })
        .collect()
}

fn read_input(input: &PathBuf) -> Result<Vec<u8>, CliError> {
    let resolved = resolve_input_path(input)?;
    if !resolved.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", resolved.display()),
            Some("pass a file of raw packet bytes, or use --hex".to_string()),
        ));
    }
    let meta = fs::metadata(&resolved)
        .with_context(|| format!("Failed to read input file: {}", resolved.display()))?;
    if !meta.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", resolved.display()),
            Some("pass a file of raw packet bytes, or use --hex".to_string()),
        ));
    }
    let bytes = fs::read(&resolved)
        .with_context(|| format!("Failed to read input file: {}", resolved.display()))?;
    Ok(bytes)
}

fn resolve_input_path(input: &PathBuf) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.clone());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern".to_string()),
        ));
    }
    if matches.len() > 1 {
        let listed = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let more = if matches.len() > 3 { ", ..." } else { "" };
        return Err(CliError::new(
            format!(
                "multiple files match pattern '{}' ({} matches); matches: {}{}",
                pattern,
                matches.len(),
                listed,
                more
            ),
            Some("pass a single packet file, or run once per file".to_string()),
        ));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
