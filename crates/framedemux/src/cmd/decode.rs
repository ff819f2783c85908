use std::io::{self, ErrorKind, Read};

use framedemux_frame::{Demultiplexer, FrameConfig};
use tracing::{debug, info, warn};

use crate::cmd::{open_input, DecodeArgs};
use crate::exit::{frame_error, io_error, CliError, CliResult, SUCCESS, TRAILING_DATA};
use crate::output::{FramePrinter, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut input = open_input(args.input.as_deref())?;
    let config = FrameConfig {
        max_backlog: args.max_backlog,
        read_chunk_size: args.chunk_size,
        ..FrameConfig::default()
    };
    let mut demux = Demultiplexer::with_config(FramePrinter::new(io::stdout().lock(), format), config);
    let mut chunk = vec![0u8; args.chunk_size];

    loop {
        let read = match input.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(io_error("failed reading input", err)),
        };
        debug!(bytes = read, backlog = demux.backlog_len(), "ingesting chunk");
        demux
            .ingest(&chunk[..read])
            .map_err(|err| frame_error("decode failed", err))?;

        if let Some(err) = demux.sink_mut().take_error() {
            if err.kind() == ErrorKind::BrokenPipe {
                debug!("stdout closed, stopping");
                return Ok(SUCCESS);
            }
            return Err(io_error("failed writing stdout", err));
        }
    }

    let stats = demux.stats();
    info!(
        frames = stats.frames_emitted,
        bytes = stats.bytes_received,
        "stream decoded"
    );

    if demux.has_backlog() {
        let pending = demux.backlog_len();
        warn!(pending, "input ended inside an incomplete frame");
        if args.strict {
            return Err(CliError::new(
                TRAILING_DATA,
                format!("{pending} trailing bytes do not form a complete frame"),
            ));
        }
    }

    Ok(SUCCESS)
}
