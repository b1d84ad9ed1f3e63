use std::fmt;

use serde::Serialize;
use ulog_explorer_protocol::TimeRange;

use crate::model::{CurveSelection, Recording};

/// Row of the last sample at or before `t`; `None` before the first sample.
pub fn sample_at(index: &[f64], t: f64) -> Option<usize> {
    index.partition_point(|&x| x <= t).checked_sub(1)
}

/// Value of one selected curve under the marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Readout {
    pub name: String,
    pub value: f64,
    /// Set for `*flags` fields.
    pub binary: Option<String>,
}

impl fmt::Display for Readout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.value)?;
        if let Some(bits) = &self.binary {
            write!(f, " ({bits})")?;
        }
        Ok(())
    }
}

/// Values of every selected curve at `t`. Curves this recording lacks, or
/// that start after `t`, are left out.
pub fn marker_readout(recording: &Recording, selection: &CurveSelection, t: f64) -> Vec<Readout> {
    selection
        .entries()
        .iter()
        .filter_map(|entry| {
            let (index, values) = recording.column(&entry.topic, &entry.field)?;
            let value = values[sample_at(index, t)?];
            let binary = (entry.field.ends_with("flags") && value.is_finite())
                .then(|| format!("{:b}", value as i64));
            Some(Readout {
                name: entry.combined_name(),
                value,
                binary,
            })
        })
        .collect()
}

/// Multi-line marker label: `t = 12.34` and one line per readout.
pub fn marker_label(recording: &Recording, selection: &CurveSelection, t: f64) -> String {
    let mut label = format!("t = {t:.2}");
    for readout in marker_readout(recording, selection, t) {
        label.push('\n');
        label.push_str(&readout.to_string());
    }
    label
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoiStats {
    pub name: String,
    pub mean: f64,
    /// `None` when fewer than two samples span a non-zero interval.
    pub slope: Option<f64>,
}

/// Mean and end-to-end slope of every selected curve over the rows with
/// `range.start < t <= range.end`.
pub fn roi_statistics(recording: &Recording, selection: &CurveSelection, range: TimeRange) -> Vec<RoiStats> {
    selection
        .entries()
        .iter()
        .filter_map(|entry| {
            let (index, values) = recording.column(&entry.topic, &entry.field)?;
            let lo = index.partition_point(|&x| x <= range.start);
            let hi = index.partition_point(|&x| x <= range.end);
            if lo >= hi {
                return None;
            }
            let window = &values[lo..hi];
            let mean = window.iter().sum::<f64>() / window.len() as f64;
            let dt = index[hi - 1] - index[lo];
            let slope = (dt > 0.0).then(|| (values[hi - 1] - values[lo]) / dt);
            Some(RoiStats {
                name: entry.combined_name(),
                mean,
                slope,
            })
        })
        .collect()
}
