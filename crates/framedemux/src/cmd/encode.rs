use std::fmt::Display;
use std::io::Write;
use std::str::FromStr;

use framedemux::hexdump;
use framedemux_frame::{codec::validate_text, pack, FixedLayout, Value};
use tracing::info;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, io_error, CliError, CliResult, SUCCESS};

pub fn run(args: EncodeArgs) -> CliResult<i32> {
    let values = args
        .values
        .iter()
        .map(|spec| parse_value(spec))
        .collect::<CliResult<Vec<_>>>()?;
    let wire = pack(&values).map_err(|err| frame_error("encode failed", err))?;
    info!(frames = values.len(), bytes = wire.len(), "stream encoded");

    if args.dump {
        hexdump::write_to(std::io::stdout().lock(), &wire)
            .map_err(|err| io_error("failed writing stdout", err))?;
        return Ok(SUCCESS);
    }

    match &args.output {
        Some(path) => std::fs::write(path, &wire).map_err(|err| {
            io_error(&format!("failed writing {}", path.display()), err)
        })?,
        None => {
            let mut out = std::io::stdout().lock();
            out.write_all(&wire)
                .and_then(|()| out.flush())
                .map_err(|err| io_error("failed writing stdout", err))?;
        }
    }

    Ok(SUCCESS)
}

/// Parse one `TYPE:VALUE` argument.
pub fn parse_value(spec: &str) -> CliResult<Value> {
    let (ty, literal) = spec
        .split_once(':')
        .ok_or_else(|| CliError::usage(format!("expected TYPE:VALUE, got {spec:?}")))?;

    match ty {
        "i8" => fixed::<i8>(ty, literal),
        "i16" => fixed::<i16>(ty, literal),
        "i32" => fixed::<i32>(ty, literal),
        "i64" => fixed::<i64>(ty, literal),
        "u8" => fixed::<u8>(ty, literal),
        "u16" => fixed::<u16>(ty, literal),
        "u32" => fixed::<u32>(ty, literal),
        "u64" => fixed::<u64>(ty, literal),
        "f32" => fixed::<f32>(ty, literal),
        "f64" => fixed::<f64>(ty, literal),
        "bool" => fixed::<bool>(ty, literal),
        "char" => fixed::<char>(ty, literal),
        "text" => {
            validate_text(literal.as_bytes())
                .map_err(|err| CliError::usage(format!("{spec:?}: {err}")))?;
            Ok(Value::text(literal))
        }
        "hex" => {
            let bytes = hex::decode(literal)
                .map_err(|err| CliError::usage(format!("invalid hex payload {literal:?}: {err}")))?;
            if bytes.is_empty() {
                return Err(CliError::usage("hex payload must not be empty"));
            }
            Ok(Value::Binary(bytes.into()))
        }
        other => Err(CliError::usage(format!("unknown value type: {other}"))),
    }
}

fn fixed<T>(ty: &str, literal: &str) -> CliResult<Value>
where
    T: FixedLayout + FromStr,
    T::Err: Display,
{
    literal
        .trim()
        .parse::<T>()
        .map(Value::fixed)
        .map_err(|err| CliError::usage(format!("invalid {ty} value {literal:?}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fixed_values() {
        assert_eq!(parse_value("i64:123456789").unwrap(), Value::fixed(123_456_789i64));
        assert_eq!(parse_value("f32:2.72").unwrap(), Value::fixed(2.72f32));
        assert_eq!(parse_value("char:a").unwrap(), Value::fixed('a'));
        assert_eq!(parse_value("bool:true").unwrap(), Value::fixed(true));
    }

    #[test]
    fn text_keeps_everything_after_first_colon() {
        assert_eq!(parse_value("text:a:b").unwrap(), Value::text("a:b"));
        assert_eq!(parse_value("text:").unwrap(), Value::text(""));
    }

    #[test]
    fn parses_hex_payload() {
        assert_eq!(
            parse_value("hex:0d0a").unwrap(),
            Value::Binary(vec![0x0d, 0x0a].into())
        );
    }

    #[test]
    fn rejects_bad_specs() {
        for spec in ["i64", "u8:256", "x:1", "hex:zz", "hex:", "text:$1", "char:ab"] {
            let err = parse_value(spec).unwrap_err();
            assert_eq!(err.code, crate::exit::USAGE, "{spec}");
        }
    }
}
