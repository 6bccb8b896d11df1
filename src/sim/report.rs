//! Plain-text run report (`simlog.txt`).

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::model::Topology;

/// File name of the run report inside the output location.
pub const REPORT_FILE: &str = "simlog.txt";

const RULE: &str = "=============================";
const THIN_RULE: &str = "-----------------------------";

/// Writes the start block: title, start time and component counts per type.
///
/// Truncates any report left by an earlier run in the same location.
pub fn write_start(dir: &Path, started_at: DateTime<Utc>, topology: &Topology) -> io::Result<PathBuf> {
    let path = dir.join(REPORT_FILE);
    let mut out = BufWriter::new(File::create(&path)?);
    writeln!(out, "Simulation Log")?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "Simulation started at: {}", started_at.to_rfc3339())?;
    writeln!(out, "{THIN_RULE}")?;
    writeln!(out, "Component Counts:")?;
    for (kind, count) in topology.component_counts() {
        writeln!(out, "{}: {count}", title_case(kind))?;
    }
    writeln!(out, "{RULE}")?;
    out.flush()?;
    Ok(path)
}

/// Appends the end block: end time and elapsed wall-clock duration.
pub fn write_end(path: &Path, ended_at: DateTime<Utc>, elapsed: Duration) -> io::Result<()> {
    let mut out = BufWriter::new(OpenOptions::new().append(true).open(path)?);
    writeln!(out, "Simulation ended at: {}", ended_at.to_rfc3339())?;
    writeln!(out, "Total duration: {:.6}s", elapsed.as_secs_f64())?;
    writeln!(out, "{RULE}")?;
    out.flush()
}

/// `smart_meter` -> `Smart meter`.
fn title_case(kind: &str) -> String {
    let spaced = kind.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
