use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};
use rsd::process::ResyncPolicy;

#[derive(Debug, ClapParser)]
#[command(
    name       = env!("CARGO_PKG_NAME"),
    version    = env!("CARGO_PKG_VERSION"),
    about      = "Tools for inspecting and decoding Garmin RSD sonar recordings",
    long_about = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Decode the record stream and print each record.
    Scan(ScanArgs),

    /// Print stream information
    Info(InfoArgs),
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Input RSD recording (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Failure-handling policy.
    #[arg(long, value_enum, default_value_t = Policy::Tolerant)]
    pub policy: Policy,

    /// Byte offset to start scanning from (decimal or 0x-prefixed hex).
    #[arg(long, value_name = "OFFSET", value_parser = parse_offset, default_value = "0")]
    pub start_offset: u64,

    /// Stop after this many records.
    #[arg(long, value_name = "COUNT")]
    pub limit: Option<u64>,

    /// Output format for decoded records.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input RSD recording (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Failure-handling policy.
    #[arg(long, value_enum, default_value_t = Policy::Tolerant)]
    pub policy: Policy,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Policy {
    /// Strict CRC validation; suspect frames are dropped.
    Classic,
    /// Salvage what decodes; CRC failures warn instead of dropping.
    Tolerant,
}

impl Policy {
    pub fn to_resync_policy(self) -> ResyncPolicy {
        match self {
            Policy::Classic => ResyncPolicy::classic(),
            Policy::Tolerant => ResyncPolicy::tolerant(),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// One formatted line per record.
    Text,
    /// YAML document with one entry per record.
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert LogLevel to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}

fn parse_offset(s: &str) -> Result<u64, std::num::ParseIntError> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else {
        s.parse()
    }
}

#[test]
fn offsets_parse_decimal_and_hex() {
    assert_eq!(parse_offset("0").unwrap(), 0);
    assert_eq!(parse_offset("20480").unwrap(), 20480);
    assert_eq!(parse_offset("0x5000").unwrap(), 0x5000);
    assert_eq!(parse_offset("0X10").unwrap(), 16);
    assert!(parse_offset("5k").is_err());
}
