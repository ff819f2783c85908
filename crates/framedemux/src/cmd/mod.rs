use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};

use crate::exit::{io_error, CliResult};
use crate::output::OutputFormat;

pub mod decode;
pub mod demo;
pub mod encode;
pub mod hexdump;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode typed values into a frame stream.
    Encode(EncodeArgs),
    /// Decode a frame stream fed through the demultiplexer in chunks.
    Decode(DecodeArgs),
    /// Print a hex dump of raw bytes.
    Hexdump(HexdumpArgs),
    /// Run the built-in split-stream scenarios.
    Demo(DemoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args),
        Command::Decode(args) => decode::run(args, format),
        Command::Hexdump(args) => hexdump::run(args),
        Command::Demo(args) => demo::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Values to encode, in order, as TYPE:VALUE (types: i8 i16 i32 i64 u8 u16
    /// u32 u64 f32 f64 bool char text hex).
    #[arg(required = true, value_name = "TYPE:VALUE")]
    pub values: Vec<String>,
    /// Write the stream to a file instead of stdout.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Print a hex dump of the stream instead of the raw bytes.
    #[arg(long)]
    pub dump: bool,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Input file ("-" or omitted for stdin).
    pub input: Option<PathBuf>,
    /// Bytes handed to the demultiplexer per call.
    #[arg(
        long,
        default_value = "8192",
        env = "FRAMEDEMUX_CHUNK_SIZE",
        value_parser = parse_chunk_size
    )]
    pub chunk_size: usize,
    /// Fail once this many undecodable bytes are buffered.
    #[arg(long, value_name = "BYTES", env = "FRAMEDEMUX_MAX_BACKLOG")]
    pub max_backlog: Option<usize>,
    /// Exit non-zero if the input ends inside an incomplete frame.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct HexdumpArgs {
    /// Input file ("-" or omitted for stdin).
    pub input: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct DemoArgs {
    /// Print a hex dump of every scenario stream.
    #[arg(long)]
    pub dump: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_chunk_size(input: &str) -> Result<usize, String> {
    let value: usize = input
        .trim()
        .parse()
        .map_err(|_| format!("invalid chunk size: {input}"))?;
    if value == 0 {
        return Err("chunk size must be greater than zero".to_string());
    }
    Ok(value)
}

/// Open a file, or stdin for `None` / `-`.
pub(crate) fn open_input(path: Option<&Path>) -> CliResult<Box<dyn Read>> {
    match path {
        None => Ok(Box::new(io::stdin().lock())),
        Some(path) if path == Path::new("-") => Ok(Box::new(io::stdin().lock())),
        Some(path) => File::open(path)
            .map(|file| Box::new(file) as Box<dyn Read>)
            .map_err(|err| io_error(&format!("failed opening {}", path.display()), err)),
    }
}

pub(crate) fn read_all(path: Option<&Path>) -> CliResult<Vec<u8>> {
    let mut input = open_input(path)?;
    let mut data = Vec::new();
    input
        .read_to_end(&mut data)
        .map_err(|err| io_error("failed reading input", err))?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_chunk_size_accepts_positive() {
        assert_eq!(parse_chunk_size("1"), Ok(1));
        assert_eq!(parse_chunk_size(" 4096 "), Ok(4096));
    }

    #[test]
    fn parse_chunk_size_rejects_zero_and_garbage() {
        assert!(parse_chunk_size("0").is_err());
        assert!(parse_chunk_size("-3").is_err());
        assert!(parse_chunk_size("lots").is_err());
    }
}
