use std::io::{self, Write};

use crate::cmd::VersionArgs;
use crate::exit::{io_error, CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    let mut out = io::stdout().lock();
    write_version(&mut out, args.extended)
        .and_then(|()| out.flush())
        .map_err(|err| io_error("failed writing stdout", err))?;
    Ok(SUCCESS)
}

fn write_version<W: Write>(out: &mut W, extended: bool) -> io::Result<()> {
    if !extended {
        return writeln!(out, "framedemux {}", env!("CARGO_PKG_VERSION"));
    }

    writeln!(out, "name: framedemux")?;
    writeln!(out, "version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(
        out,
        "target: {}",
        option_env!("FRAMEDEMUX_BUILD_TARGET").unwrap_or("unknown")
    )?;
    writeln!(out, "target_os: {}", std::env::consts::OS)?;
    writeln!(out, "target_arch: {}", std::env::consts::ARCH)?;
    writeln!(out, "git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"))?;
    writeln!(out, "features: async={}, cli=true", cfg!(feature = "async"))?;
    writeln!(
        out,
        "wire: marker=0x{:02X} header={}B delimiter={:02X?}",
        framedemux_frame::MARKER,
        framedemux_frame::HEADER_SIZE,
        framedemux_frame::DELIMITER
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_output_lists_wire_constants() {
        let mut out = Vec::new();
        write_version(&mut out, true).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("wire: marker=0x24 header=5B delimiter=[0D, 0A, 0D, 0A]"));
    }
}
