use std::io::{self, IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use framedemux_frame::{FrameSink, FrameView};
use serde::Serialize;

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
struct FrameOutput<'a> {
    index: u64,
    kind: &'a str,
    payload_size: usize,
    payload: String,
    payload_hex: String,
}

/// Prints every frame it receives to `out`, numbered from zero.
///
/// Sink callbacks cannot fail, so the first write error is kept and every
/// later frame is dropped. Check [`FramePrinter::take_error`] after each
/// ingest.
pub struct FramePrinter<W> {
    out: W,
    format: OutputFormat,
    next_index: u64,
    error: Option<io::Error>,
}

impl<W: Write> FramePrinter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            next_index: 0,
            error: None,
        }
    }

    /// The write error that stopped printing, if any.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    fn print(&mut self, frame: FrameView<'_>) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = write_frame(&mut self.out, self.next_index, frame, self.format) {
            self.error = Some(err);
            return;
        }
        self.next_index += 1;
    }
}

impl<W: Write> FrameSink for FramePrinter<W> {
    fn on_binary_frame(&mut self, payload: &[u8]) {
        self.print(FrameView::Binary(payload));
    }

    fn on_text_frame(&mut self, payload: &[u8]) {
        self.print(FrameView::Text(payload));
    }
}

pub fn write_frame<W: Write>(
    out: &mut W,
    index: u64,
    frame: FrameView<'_>,
    format: OutputFormat,
) -> io::Result<()> {
    let payload = frame.payload();
    match format {
        OutputFormat::Json => {
            let record = FrameOutput {
                index,
                kind: frame.kind().as_str(),
                payload_size: payload.len(),
                payload: payload_preview(frame),
                payload_hex: hex::encode(payload),
            };
            serde_json::to_writer(&mut *out, &record)?;
            writeln!(out)?;
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "KIND", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    index.to_string(),
                    frame.kind().as_str().to_string(),
                    payload.len().to_string(),
                    payload_preview(frame),
                ]);
            writeln!(out, "{table}")?;
        }
        OutputFormat::Pretty => {
            writeln!(
                out,
                "#{} kind={} size={} payload={}",
                index,
                frame.kind().as_str(),
                payload.len(),
                payload_preview(frame)
            )?;
        }
        OutputFormat::Raw => {
            out.write_all(payload)?;
        }
    }
    out.flush()
}

/// Text frames print as text when valid UTF-8; binary frames always print as hex.
fn payload_preview(frame: FrameView<'_>) -> String {
    match frame {
        FrameView::Text(payload) => match std::str::from_utf8(payload) {
            Ok(text) => text.to_string(),
            Err(_) => format!("<non-utf8 {} bytes>", payload.len()),
        },
        FrameView::Binary(payload) => format!("0x{}", hex::encode_upper(payload)),
    }
}
