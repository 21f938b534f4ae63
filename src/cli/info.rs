use std::collections::BTreeSet;

use anyhow::Result;
use indicatif::MultiProgress;

use super::command::{Cli, InfoArgs};
use super::scan::create_progress_bar;
use crate::input::InputReader;
use rsd::process::decode::RecordStream;
use rsd::structs::record::Record;

pub fn cmd_info(args: &InfoArgs, _cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Analyzing RSD recording: {}", args.input.display());

    let mut input = InputReader::new(&args.input)?;
    if input.is_pipe() {
        log::debug!("reading capture from stdin");
    }
    let data = input.read_all()?;
    let total_bytes = data.len();

    let pb = match multi {
        Some(multi) => Some(create_progress_bar(multi)?),
        None => None,
    };

    let mut stream = RecordStream::new(data).with_policy(args.policy.to_resync_policy());
    if let Some(pb) = &pb {
        let bar = pb.clone();
        stream = stream.with_progress(move |percent, message| {
            bar.set_position(percent.round() as u64);
            bar.set_message(message.to_string());
        });
    }

    let mut summary = StreamSummary::default();
    for record in stream.by_ref() {
        summary.add(&record);
    }
    summary.resync_skips = stream.resync_skips();

    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }

    if summary.records == 0 {
        println!("No RSD records found in the file.");
        println!("This doesn't appear to be a valid RSD recording.");
        return Ok(());
    }

    summary.display(total_bytes);
    Ok(())
}

#[derive(Default)]
struct StreamSummary {
    records: u64,
    channels: BTreeSet<u32>,
    seq_range: Option<(u32, u32)>,
    time_range: Option<(u32, u32)>,
    offset_range: Option<(u64, u64)>,
    position_fixes: u64,
    lat_range: Option<(f64, f64)>,
    lon_range: Option<(f64, f64)>,
    depth_range: Option<(f64, f64)>,
    payload_bytes: u64,
    resync_skips: u64,
}

fn widen_u32(range: &mut Option<(u32, u32)>, value: u32) {
    *range = Some(match *range {
        Some((lo, hi)) => (lo.min(value), hi.max(value)),
        None => (value, value),
    });
}

fn widen_f64(range: &mut Option<(f64, f64)>, value: f64) {
    *range = Some(match *range {
        Some((lo, hi)) => (lo.min(value), hi.max(value)),
        None => (value, value),
    });
}

impl StreamSummary {
    fn add(&mut self, record: &Record) {
        self.records += 1;
        self.channels.insert(record.channel_id);
        widen_u32(&mut self.seq_range, record.seq);
        widen_u32(&mut self.time_range, record.time_ms);
        self.offset_range = Some(match self.offset_range {
            Some((lo, hi)) => (lo.min(record.offset), hi.max(record.offset)),
            None => (record.offset, record.offset),
        });
        if record.has_position {
            self.position_fixes += 1;
            widen_f64(&mut self.lat_range, record.lat);
            widen_f64(&mut self.lon_range, record.lon);
        }
        if record.has_depth {
            widen_f64(&mut self.depth_range, record.depth_m);
        }
        self.payload_bytes += record.sonar_size;
    }

    fn display(&self, total_bytes: usize) {
        println!();
        println!("RSD Stream Information");
        println!("======================");
        println!();

        let size_mb = total_bytes as f64 / 1_000_000.0;
        println!("  Size                      {size_mb:.2} MB ({total_bytes} bytes)");
        println!("  Records                   {}", self.records);

        let channels = self
            .channels
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!("  Channels                  {channels}");

        if let Some((lo, hi)) = self.seq_range {
            println!("  Sequence range            {lo}..{hi}");
        }
        if let Some((lo, hi)) = self.time_range {
            println!(
                "  Time range                {:.3} s .. {:.3} s",
                lo as f64 / 1000.0,
                hi as f64 / 1000.0
            );
        }
        if let Some((lo, hi)) = self.offset_range {
            println!("  Record span               {lo:#010X} .. {hi:#010X}");
        }

        let fix_pct = self.position_fixes as f64 * 100.0 / self.records as f64;
        println!(
            "  Position fixes            {} ({fix_pct:.1}%)",
            self.position_fixes
        );
        if let Some((lo, hi)) = self.lat_range {
            println!("  Latitude range            {lo:.6} .. {hi:.6}");
        }
        if let Some((lo, hi)) = self.lon_range {
            println!("  Longitude range           {lo:.6} .. {hi:.6}");
        }
        if let Some((lo, hi)) = self.depth_range {
            println!("  Depth range               {lo:.2} m .. {hi:.2} m");
        }

        println!("  Payload bytes             {}", self.payload_bytes);
        println!("  Resync skips              {}", self.resync_skips);
        println!();
    }
}

#[test]
fn summary_accumulates_ranges() {
    let mut summary = StreamSummary::default();

    let mut a = Record {
        channel_id: 0,
        seq: 10,
        time_ms: 1000,
        offset: 0x100,
        sonar_size: 64,
        ..Record::default()
    };
    a.lat = 45.0;
    a.lon = -93.0;
    a.has_position = true;
    a.depth_m = 2.0;
    a.has_depth = true;

    let b = Record {
        channel_id: 1,
        seq: 12,
        time_ms: 3000,
        offset: 0x200,
        sonar_size: 32,
        ..Record::default()
    };

    summary.add(&a);
    summary.add(&b);

    assert_eq!(summary.records, 2);
    assert_eq!(summary.channels.len(), 2);
    assert_eq!(summary.seq_range, Some((10, 12)));
    assert_eq!(summary.time_range, Some((1000, 3000)));
    assert_eq!(summary.offset_range, Some((0x100, 0x200)));
    assert_eq!(summary.position_fixes, 1);
    assert_eq!(summary.lat_range, Some((45.0, 45.0)));
    assert_eq!(summary.depth_range, Some((2.0, 2.0)));
    assert_eq!(summary.payload_bytes, 96);
}
