//! 16-column hex dump of a byte block.
//!
//! ```text
//! ==== Block byte size 5 bytes ====
//! 00|01|02|03|04|05|06|07|08|09|0A|0B|0C|0D|0E|0F|
//! 24|00|00|00|00|
//! ```

use std::fmt::Write as _;
use std::io;

/// Bytes per dump row.
pub const ROW_WIDTH: usize = 16;

/// Render `data` as a hex dump with a size banner and a column header row.
pub fn render(data: &[u8]) -> String {
    let rows = data.len().div_ceil(ROW_WIDTH);
    let mut out = String::with_capacity(64 + (rows + 1) * (ROW_WIDTH * 3 + 1));

    let _ = writeln!(out, "==== Block byte size {} bytes ====", data.len());
    for column in 0..ROW_WIDTH {
        let _ = write!(out, "{column:02X}|");
    }
    out.push('\n');

    for row in data.chunks(ROW_WIDTH) {
        for byte in row {
            let _ = write!(out, "{byte:02X}|");
        }
        out.push('\n');
    }
    out
}

/// Write the dump produced by [`render`] to `out`.
pub fn write_to<W: io::Write>(mut out: W, data: &[u8]) -> io::Result<()> {
    out.write_all(render(data).as_bytes())?;
    out.flush()
}
