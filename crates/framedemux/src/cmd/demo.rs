//! Scenarios that push encoded streams through the demultiplexer split in
//! awkward places and check that every value comes back intact.

use std::io::{self, Write};

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use framedemux::hexdump;
use framedemux_frame::{pack, values, Demultiplexer, Frame, Value};
use serde::Serialize;
use tracing::{debug, error};

use crate::cmd::DemoArgs;
use crate::exit::{frame_error, io_error, CliResult, FAILURE, SUCCESS};
use crate::output::OutputFormat;

/// How a scenario stream is cut before being fed in.
#[derive(Debug, Clone, Copy)]
pub enum Chunking {
    /// The whole stream in one call.
    Whole,
    /// Two calls, the first carrying this share of the stream.
    Fraction(f64),
    /// One run per chunk size from 1 to the stream length.
    EverySize,
}

pub struct Scenario {
    pub name: &'static str,
    pub values: Vec<Value>,
    pub chunking: Chunking,
}

#[derive(Debug, Serialize)]
pub struct ScenarioReport {
    pub name: &'static str,
    pub wire_size: usize,
    pub runs: usize,
    pub frames: usize,
    pub passed: bool,
    pub detail: Option<String>,
}

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "mixed types",
            values: values!["456", 0x0A0B_0C0D_i32, 2.72f32, 3.5f64, 'a', 42u32],
            chunking: Chunking::Whole,
        },
        Scenario {
            name: "text pair",
            values: values!["123456", "789123456123456"],
            chunking: Chunking::Whole,
        },
        Scenario {
            name: "binary pair",
            values: values![b'a', 12345i32],
            chunking: Chunking::Whole,
        },
        Scenario {
            name: "split binary pair",
            values: values![123_456_789i64, 987_654_321i64],
            chunking: Chunking::Fraction(0.75),
        },
        Scenario {
            name: "every chunk size",
            values: values![123_456_789i64],
            chunking: Chunking::EverySize,
        },
        Scenario {
            name: "interleaved every chunk size",
            values: values!["head", -1i16, "", true, "tail"],
            chunking: Chunking::EverySize,
        },
    ]
}

pub fn run(args: DemoArgs, format: OutputFormat) -> CliResult<i32> {
    let mut out = io::stdout().lock();
    let mut reports = Vec::new();
    for scenario in scenarios() {
        let wire = pack(&scenario.values).map_err(|err| frame_error("encode failed", err))?;
        if args.dump {
            write!(out, "{}\n{}", scenario.name, hexdump::render(&wire))
                .map_err(|err| io_error("failed writing stdout", err))?;
        }
        reports.push(run_scenario(&scenario, &wire));
    }

    write_reports(&mut out, &reports, format)
        .and_then(|()| out.flush())
        .map_err(|err| io_error("failed writing stdout", err))?;

    if reports.iter().all(|report| report.passed) {
        Ok(SUCCESS)
    } else {
        Ok(FAILURE)
    }
}

/// Chunk boundaries for each run of a scenario.
fn plans(chunking: Chunking, len: usize) -> Vec<Vec<usize>> {
    match chunking {
        Chunking::Whole => vec![vec![len]],
        Chunking::Fraction(share) => {
            let first = (((len as f64) * share).ceil() as usize).min(len);
            vec![vec![first, len - first]]
        }
        Chunking::EverySize => (1..=len)
            .map(|size| {
                let mut sizes = vec![size; len / size];
                if len % size != 0 {
                    sizes.push(len % size);
                }
                sizes
            })
            .collect(),
    }
}

pub fn run_scenario(scenario: &Scenario, wire: &[u8]) -> ScenarioReport {
    let plans = plans(scenario.chunking, wire.len());
    let mut report = ScenarioReport {
        name: scenario.name,
        wire_size: wire.len(),
        runs: plans.len(),
        frames: 0,
        passed: true,
        detail: None,
    };

    for sizes in plans {
        if let Err(detail) = check_run(scenario, wire, &sizes) {
            error!(scenario = scenario.name, chunks = ?sizes, %detail, "scenario failed");
            report.passed = false;
            report.detail = Some(detail);
            break;
        }
        report.frames = scenario.values.len();
    }
    report
}

fn check_run(scenario: &Scenario, wire: &[u8], sizes: &[usize]) -> Result<(), String> {
    let mut demux = Demultiplexer::new(Vec::<Frame>::new());
    let mut offset = 0usize;
    for &size in sizes {
        demux
            .ingest(&wire[offset..offset + size])
            .map_err(|err| err.to_string())?;
        offset += size;
        debug!(
            scenario = scenario.name,
            offset,
            frames = demux.sink().len(),
            backlog = demux.backlog_len(),
            "chunk ingested"
        );
    }

    if demux.has_backlog() {
        return Err(format!("{} bytes left in backlog", demux.backlog_len()));
    }
    let frames = demux.into_inner();
    if frames.len() != scenario.values.len() {
        return Err(format!(
            "expected {} frames, got {}",
            scenario.values.len(),
            frames.len()
        ));
    }
    for (index, (frame, expected)) in frames.into_iter().zip(&scenario.values).enumerate() {
        if Value::from(frame) != *expected {
            return Err(format!("frame {index} does not match its value"));
        }
    }
    Ok(())
}

fn write_reports<W: Write>(
    out: &mut W,
    reports: &[ScenarioReport],
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, reports)?;
            writeln!(out)?;
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SCENARIO", "BYTES", "RUNS", "FRAMES", "RESULT"]);
            for report in reports {
                table.add_row(vec![
                    report.name.to_string(),
                    report.wire_size.to_string(),
                    report.runs.to_string(),
                    report.frames.to_string(),
                    result_label(report),
                ]);
            }
            writeln!(out, "{table}")?;
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for report in reports {
                writeln!(
                    out,
                    "{:<30} bytes={:<4} runs={:<3} {}",
                    report.name,
                    report.wire_size,
                    report.runs,
                    result_label(report)
                )?;
            }
        }
    }
    Ok(())
}

fn result_label(report: &ScenarioReport) -> String {
    match (&report.detail, report.passed) {
        (_, true) => "ok".to_string(),
        (Some(detail), false) => format!("FAILED: {detail}"),
        (None, false) => "FAILED".to_string(),
    }
}
