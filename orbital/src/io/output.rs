//! Output formatting and logging utilities

use color_eyre::eyre::{Result, WrapErr};
use orbital::{Field, FieldValues};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::time::SystemTime as StdSystemTime;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    fmt::format::Writer, fmt::layer, fmt::time::FormatTime, layer::SubscriberExt, util::SubscriberInitExt, Layer,
    Registry,
};

/// Custom time formatter that shows only seconds
struct SecondPrecisionTimer;

impl FormatTime for SecondPrecisionTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let now = StdSystemTime::now();
        let duration = now.duration_since(std::time::UNIX_EPOCH).unwrap_or_default();

        let total_seconds = duration.as_secs();
        let hours = (total_seconds / 3600) % 24;
        let minutes = (total_seconds / 60) % 60;
        let seconds = total_seconds % 60;

        write!(w, "{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

/// Setup output logging to file or stdout
pub fn setup_output(output_path: Option<&String>, verbose: bool) {
    let level = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    match output_path {
        Some(path) => {
            if let Ok(log) = File::create(path) {
                let file_layer = layer()
                    .with_writer(log)
                    .with_timer(SecondPrecisionTimer)
                    .with_ansi(false)
                    .with_filter(level);
                Registry::default().with(file_layer).init();
                info!("Output will be written to: {}", path);
            } else {
                eprintln!("Could not create output file: {}", path);
            }
        }
        None => {
            let stdout_layer = layer()
                .with_writer(std::io::stdout)
                .with_timer(SecondPrecisionTimer)
                .with_ansi(true)
                .with_filter(level);
            Registry::default().with(stdout_layer).init();
            info!("Output will be printed to stdout");
        }
    }
}

/// Per-entry statistics of a computed field
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub label: String,
    pub counts: [usize; 3],
    pub origin: [f64; 3],
    pub spacing: [f64; 3],
    pub frame: usize,
    /// One `[min, max, integral]` triple per component.
    pub components: Vec<[f64; 3]>,
}

pub fn summarize(field: &Field) -> Vec<EntrySummary> {
    field
        .entries()
        .iter()
        .map(|entry| {
            let dv = entry.grid.volume_element();
            let stats = |v: &nalgebra::DVector<f64>| [v.min(), v.max(), v.sum() * dv];
            let components = match &entry.values {
                FieldValues::Scalar(v) => vec![stats(v)],
                FieldValues::Vector(c) => c.iter().map(stats).collect(),
            };
            EntrySummary {
                label: entry.label.clone(),
                counts: entry.grid.counts,
                origin: entry.grid.origin.into(),
                spacing: entry.grid.spacing.into(),
                frame: entry.grid.frame,
                components,
            }
        })
        .collect()
}

/// Log a table of field statistics
pub fn report_field(summary: &[EntrySummary]) {
    info!("\nComputed {} field entries:", summary.len());
    info!("{:<40} {:>14} {:>14} {:>14}", "Label", "Min", "Max", "Integral");
    for entry in summary {
        for (axis, [min, max, integral]) in entry.components.iter().enumerate() {
            let label = if entry.components.len() == 1 {
                entry.label.clone()
            } else {
                format!("{} [{}]", entry.label, ["x", "y", "z"][axis])
            };
            info!("{:<40} {:>14.6e} {:>14.6e} {:>14.6e}", label, min, max, integral);
        }
    }
}

/// Write the field statistics as JSON
pub fn write_summary<W: Write>(writer: &mut W, summary: &[EntrySummary]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, summary).wrap_err("Failed to serialize field summary")?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{DVector, Vector3};
    use orbital::{make_field, GridSpec};

    #[test]
    fn test_summary_statistics() {
        let grid = GridSpec::new(Vector3::zeros(), Vector3::repeat(0.5), [2, 1, 2], 0).unwrap();
        let field = make_field(
            vec![FieldValues::Scalar(DVector::from_vec(vec![1.0, 3.0, -1.0, 5.0]))],
            vec!["density".into()],
            &[grid],
        )
        .unwrap();
        let summary = summarize(&field);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].components[0], [-1.0, 5.0, 8.0 * 0.125]);

        let mut out = Vec::new();
        write_summary(&mut out, &summary).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json[0]["label"], "density");
        assert_eq!(json[0]["counts"][2], 2);
    }
}
