use std::collections::BTreeMap;

use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;

use super::command::{Cli, OutputFormat, ScanArgs};
use crate::input::InputReader;
use rsd::process::decode::RecordStream;
use rsd::structs::record::Record;

pub fn cmd_scan(args: &ScanArgs, _cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Scanning RSD recording: {}", args.input.display());

    let mut input = InputReader::new(&args.input)?;
    if input.is_pipe() {
        log::debug!("reading capture from stdin");
    }
    let data = input.read_all()?;

    let pb = match multi {
        Some(multi) => Some(create_progress_bar(multi)?),
        None => None,
    };

    let mut stream = RecordStream::new(data)
        .with_policy(args.policy.to_resync_policy())
        .with_start_offset(args.start_offset);
    if let Some(limit) = args.limit {
        stream = stream.with_record_limit(limit);
    }
    if let Some(pb) = &pb {
        let bar = pb.clone();
        stream = stream.with_progress(move |percent, message| {
            bar.set_position(percent.round() as u64);
            bar.set_message(message.to_string());
        });
    }

    match args.format {
        OutputFormat::Text => {
            for record in stream.by_ref() {
                if let Some(pb) = &pb {
                    pb.suspend(|| print_record(&record));
                } else {
                    print_record(&record);
                }
            }
        }
        OutputFormat::Yaml => {
            let rows: Vec<RecordRow> = stream.by_ref().map(|r| RecordRow::from(&r)).collect();
            if let Some(pb) = &pb {
                pb.finish_and_clear();
            }
            print!("{}", serde_yaml_ng::to_string(&rows)?);
        }
    }

    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }

    log::info!(
        "{} records decoded, {} resync skips",
        stream.records_emitted(),
        stream.resync_skips()
    );

    Ok(())
}

pub fn create_progress_bar(multi: &MultiProgress) -> Result<ProgressBar> {
    let pb = multi.add(ProgressBar::new(100));
    pb.set_style(ProgressStyle::with_template(
        "{bar:40.cyan/blue} {percent}% {msg} | elapsed: {elapsed_precise}",
    )?);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn print_record(record: &Record) {
    println!(
        "{:#010X}  ch {:>2}  seq {:>8}  t {:>10} ms  pos {:>11.6},{:>12.6}  depth {:>7.2} m  {:>5} samples  {:>6} B payload",
        record.offset,
        record.channel_id,
        record.seq,
        record.time_ms,
        record.lat,
        record.lon,
        record.depth_m,
        record.sample_cnt,
        record.sonar_size,
    );
}

/// Serializable view of a [`Record`] for structured output.
#[derive(Serialize)]
struct RecordRow {
    offset: u64,
    channel_id: u32,
    seq: u32,
    time_ms: u32,
    lat: f64,
    lon: f64,
    depth_m: f64,
    has_position: bool,
    has_depth: bool,
    sample_cnt: u32,
    sonar_ofs: u64,
    sonar_size: u64,
    beam_deg: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    color_id: Option<u32>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    extras: BTreeMap<u32, String>,
}

impl From<&Record> for RecordRow {
    fn from(record: &Record) -> Self {
        Self {
            offset: record.offset,
            channel_id: record.channel_id,
            seq: record.seq,
            time_ms: record.time_ms,
            lat: record.lat,
            lon: record.lon,
            depth_m: record.depth_m,
            has_position: record.has_position,
            has_depth: record.has_depth,
            sample_cnt: record.sample_cnt,
            sonar_ofs: record.sonar_ofs,
            sonar_size: record.sonar_size,
            beam_deg: record.beam_deg,
            color_id: record.color_id,
            extras: record
                .extras
                .iter()
                .map(|(tag, bytes)| (*tag, hex_string(bytes)))
                .collect(),
        }
    }
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[test]
fn record_row_carries_extras_as_hex() {
    let mut record = Record {
        offset: 0x5000,
        channel_id: 1,
        ..Record::default()
    };
    record.extras.insert(13, vec![0xDE, 0xAD]);

    let row = RecordRow::from(&record);
    assert_eq!(row.extras.get(&13).map(String::as_str), Some("dead"));
}
