//! Command-line interface

use std::fmt::Display;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

const USAGE_LONG: &str = r#"
Encode SAME/EAS headers into WAV audio, decode WAV recordings, or decode a live raw-PCM stream.

Examples:

    samewav encode --event TOR --location 024031 --duration +0030 \
        --callsign PHILLYWX alert.wav

    samewav decode alert.wav

    sox recording.wav -t raw -r 22.05k -e signed -b 16 -c 1 - \
        | samewav listen --rate 22050

Generated audio is for testing codecs, not for broadcast. Transmitting SAME tones over the air is tightly regulated.
"#;

/// Top-level program arguments
#[derive(Parser, Clone, Debug)]
#[command(version)]
#[command(about, long_about = None)]
#[command(after_long_help = USAGE_LONG)]
#[command(max_term_width = 100)]
pub struct Args {
    /// Verbosity level (-vvv for more)
    #[arg(short, long, global = true, default_value_t = 0, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print nothing but decoded headers
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Build a SAME header from fields and encode it to WAV
    Encode(EncodeArgs),

    /// Encode a preformatted SAME header string to WAV
    EncodeRaw(EncodeRawArgs),

    /// Encode a standalone end-of-message (NNNN) transmission
    Eom(EomArgs),

    /// Decode SAME headers from a WAV recording
    Decode(DecodeArgs),

    /// Decode a live raw-PCM stream from standard input
    Listen(ListenArgs),
}

#[derive(clap::Args, Clone, Debug)]
pub struct EncodeArgs {
    /// Three-letter event code, like TOR or RWT
    #[arg(short, long)]
    pub event: String,

    /// Six-digit PSSCCC location code (repeat for more areas)
    #[arg(short, long = "location", required = true)]
    pub locations: Vec<String>,

    /// Message validity duration, +HHMM
    #[arg(short, long, default_value = "+0030")]
    pub duration: String,

    /// Issue time, JJJHHMM (UTC; defaults to now)
    #[arg(short, long)]
    pub timestamp: Option<String>,

    /// Originator code: PEP, CIV, WXR, or EAS
    ///
    /// If omitted, the originator is inferred from the event code.
    #[arg(short, long)]
    pub originator: Option<String>,

    /// Sending station callsign, 1-8 characters
    #[arg(short, long, default_value = "NOCALL00")]
    pub callsign: String,

    /// Also transmit the NNNN end-of-message bursts
    #[arg(long)]
    pub eom: bool,

    /// Output sampling rate (Hz)
    #[arg(short, long, default_value_t = 43750)]
    pub rate: u32,

    /// Output WAV file
    pub output: PathBuf,
}

#[derive(clap::Args, Clone, Debug)]
pub struct EncodeRawArgs {
    /// Complete header text, ZCZC-...-
    pub header: String,

    /// Also transmit the NNNN end-of-message bursts
    #[arg(long)]
    pub eom: bool,

    /// Output sampling rate (Hz)
    #[arg(short, long, default_value_t = 43750)]
    pub rate: u32,

    /// Output WAV file
    pub output: PathBuf,
}

#[derive(clap::Args, Clone, Debug)]
pub struct EomArgs {
    /// Output sampling rate (Hz)
    #[arg(short, long, default_value_t = 43750)]
    pub rate: u32,

    /// Output WAV file
    pub output: PathBuf,
}

#[derive(clap::Args, Clone, Debug)]
pub struct DecodeArgs {
    /// Input WAV file
    ///
    /// Any common bit depth; channel 0 of multichannel audio is
    /// used. Audio is resampled to the decoder rate if needed.
    pub input: PathBuf,

    /// Decoder sampling rate (Hz)
    #[arg(short, long, default_value_t = 22050)]
    pub rate: u32,
}

#[derive(clap::Args, Clone, Debug)]
pub struct ListenArgs {
    /// Sampling rate (Hz) of the incoming stream
    ///
    /// The input must be one-channel (mono), signed 16-bit
    /// native-endian raw PCM at this rate. No resampling is
    /// performed in listen mode.
    #[arg(short, long, default_value_t = 22050)]
    pub rate: u32,

    /// Samples per processing chunk
    #[arg(long, default_value_t = 4096)]
    pub chunk: usize,
}

/// A program-level error with exit code
#[derive(Debug)]
pub struct CliError {
    error: anyhow::Error,
    exit_code: i32,
}

impl CliError {
    /// Create new error with a custom exit code
    pub fn new(error: anyhow::Error, code: i32) -> CliError {
        CliError {
            error,
            exit_code: code,
        }
    }

    /// Print this error to the terminal and exit
    pub fn exit(&self) -> ! {
        if self.exit_code == 0 {
            // --help and --version land here
            println!("{}", self.error);
        } else if self.exit_code == EXIT_CODE_USAGE {
            // clap errors carry their own formatting
            eprintln!("{}", self.error);
        } else {
            eprintln!("samewav: error: {:#}", self.error);
        }
        std::process::exit(self.exit_code);
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> CliError {
        CliError::new(err, 1)
    }
}

impl From<clap::Error> for CliError {
    fn from(err: clap::Error) -> CliError {
        let code = if err.use_stderr() { EXIT_CODE_USAGE } else { 0 };
        CliError::new(err.into(), code)
    }
}

const EXIT_CODE_USAGE: i32 = 2;
