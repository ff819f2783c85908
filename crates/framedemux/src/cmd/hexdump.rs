use framedemux::hexdump;

use crate::cmd::{read_all, HexdumpArgs};
use crate::exit::{io_error, CliResult, SUCCESS};

pub fn run(args: HexdumpArgs) -> CliResult<i32> {
    let data = read_all(args.input.as_deref())?;
    hexdump::write_to(std::io::stdout().lock(), &data)
        .map_err(|err| io_error("failed writing stdout", err))?;
    Ok(SUCCESS)
}
