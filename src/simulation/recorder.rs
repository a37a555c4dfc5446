//! Per-frame readout recording with CSV export.

use crate::experiment::Readout;
use std::io::{self, Write};

/// One recorded frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSample {
    pub time: f64,
    pub values: Vec<f64>,
}

/// Records the readouts of the active experiment, one row per frame.
///
/// Columns are fixed by the first recorded frame; later frames with a
/// different readout set start a new recording.
#[derive(Debug, Clone, Default)]
pub struct DataRecorder {
    experiment: String,
    columns: Vec<(&'static str, &'static str)>,
    samples: Vec<DataSample>,
}

impl DataRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything recorded and start over for `experiment`.
    pub fn begin(&mut self, experiment: &str) {
        self.experiment = experiment.to_string();
        self.columns.clear();
        self.samples.clear();
    }

    pub fn clear(&mut self) {
        self.columns.clear();
        self.samples.clear();
    }

    pub fn record(&mut self, time: f64, readouts: &[Readout]) {
        let same_columns = self.columns.len() == readouts.len()
            && self
                .columns
                .iter()
                .zip(readouts)
                .all(|((name, _), r)| *name == r.name);
        if !same_columns {
            if !self.samples.is_empty() {
                log::warn!(
                    "Readout columns of '{}' changed; discarding {} samples",
                    self.experiment,
                    self.samples.len()
                );
            }
            self.samples.clear();
            self.columns = readouts.iter().map(|r| (r.name, r.unit)).collect();
        }
        self.samples.push(DataSample {
            time,
            values: readouts.iter().map(|r| r.value).collect(),
        });
    }

    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    pub fn samples(&self) -> &[DataSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Header row: `time (s)` followed by `name (unit)` per column.
    pub fn header(&self) -> String {
        std::iter::once("time (s)".to_string())
            .chain(
                self.columns
                    .iter()
                    .map(|(name, unit)| format!("{} ({})", name, unit)),
            )
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn write_csv<W: Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "{}", self.header())?;
        for sample in &self.samples {
            write!(out, "{:.4}", sample.time)?;
            for value in &sample.values {
                write!(out, ",{:.6}", value)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    pub fn to_csv(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_csv(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readouts(x: f64) -> Vec<Readout> {
        vec![Readout::new("x", x, "m"), Readout::new("y", 2.0 * x, "m")]
    }

    #[test]
    fn csv_has_header_and_one_row_per_frame() {
        let mut recorder = DataRecorder::new();
        recorder.begin("projectile");
        recorder.record(0.5, &readouts(1.0));
        recorder.record(1.0, &readouts(2.5));

        let csv = recorder.to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "time (s),x (m),y (m)");
        assert_eq!(lines[1], "0.5000,1.000000,2.000000");
        assert_eq!(lines[2], "1.0000,2.500000,5.000000");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn changed_columns_restart_recording() {
        let mut recorder = DataRecorder::new();
        recorder.begin("projectile");
        recorder.record(0.1, &readouts(1.0));
        recorder.record(0.2, &[Readout::new("angle", 30.0, "°")]);
        assert_eq!(recorder.len(), 1);
        assert_eq!(recorder.header(), "time (s),angle (°)");
    }

    #[test]
    fn begin_clears_previous_experiment() {
        let mut recorder = DataRecorder::new();
        recorder.begin("projectile");
        recorder.record(0.1, &readouts(1.0));
        recorder.begin("circuit");
        assert!(recorder.is_empty());
        assert_eq!(recorder.experiment(), "circuit");
        assert_eq!(recorder.header(), "time (s)");
    }
}
