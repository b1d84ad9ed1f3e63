//! Plain-text summaries of a loaded recording for console output.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{Recording, SkippedDerivation, TopicSummary, TransitionEvents};

/// `h:mm:ss` from microseconds, truncated to whole seconds.
fn clock(us: u64) -> String {
    let secs = us / 1_000_000;
    format!("{}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DropoutStats {
    pub count: usize,
    pub total_s: f64,
    pub max_ms: u16,
    pub mean_ms: u64,
}

impl DropoutStats {
    pub fn from_recording(recording: &Recording) -> Option<Self> {
        let durations: Vec<u16> = recording.dropouts.iter().map(|d| d.duration_ms).collect();
        let max_ms = *durations.iter().max()?;
        let total: u64 = durations.iter().map(|&d| u64::from(d)).sum();
        Some(Self {
            count: durations.len(),
            total_s: total as f64 / 1000.0,
            max_ms,
            mean_ms: total / durations.len() as u64,
        })
    }
}

/// Everything the info report shows, in a serializable form.
#[derive(Debug, Clone, Serialize)]
pub struct RecordingSummary {
    pub source: String,
    pub title: String,
    pub start_timestamp: u64,
    pub duration_s: f64,
    pub dropouts: Option<DropoutStats>,
    pub info: BTreeMap<String, String>,
    pub info_multiple: BTreeMap<String, usize>,
    pub topics: Vec<TopicSummary>,
    pub transitions: TransitionEvents,
    pub parameter_changes: usize,
    pub logged_messages: usize,
    pub skipped_derivations: Vec<SkippedDerivation>,
}

impl RecordingSummary {
    pub fn new(recording: &Recording) -> Self {
        Self {
            source: recording.source.clone(),
            title: recording.title.clone(),
            start_timestamp: recording.start_timestamp,
            duration_s: recording.duration(),
            dropouts: DropoutStats::from_recording(recording),
            info: recording
                .info
                .iter()
                .map(|(k, v)| (k.clone(), v.to_string()))
                .collect(),
            info_multiple: recording
                .info_multiple
                .iter()
                .map(|(k, groups)| (k.clone(), groups.len()))
                .collect(),
            topics: recording.topics.clone(),
            transitions: recording.transitions.clone(),
            parameter_changes: recording.changed_parameters.len(),
            logged_messages: recording.logged_messages.len(),
            skipped_derivations: recording.skipped.clone(),
        }
    }
}

/// Header, timing, dropouts, info messages and the per-topic size table.
/// `perf_*` info keys and the full info-multiple contents only appear when
/// `verbose`.
pub fn render_info(recording: &Recording, verbose: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!("########### ulog_info: {} ###########\n", recording.source));
    out.push_str(&format!(
        "Logging start time: {}, duration: {}\n",
        clock(recording.start_timestamp),
        clock(recording.last_timestamp.saturating_sub(recording.start_timestamp)),
    ));

    match DropoutStats::from_recording(recording) {
        None => out.push_str("No Dropouts\n"),
        Some(d) => out.push_str(&format!(
            "Dropouts: count: {}, total duration: {:.1} s, max: {} ms, mean: {} ms\n",
            d.count, d.total_s, d.max_ms, d.mean_ms
        )),
    }

    out.push_str("Info Messages:\n");
    for (key, value) in &recording.info {
        if verbose || !key.starts_with("perf_") {
            out.push_str(&format!(" {key}: {value}\n"));
        }
    }

    if !recording.info_multiple.is_empty() {
        if verbose {
            out.push_str("Info Multiple Messages:\n");
            for (key, groups) in &recording.info_multiple {
                let groups: Vec<String> = groups
                    .iter()
                    .map(|g| {
                        let items: Vec<String> = g.iter().map(ToString::to_string).collect();
                        format!("[{}]", items.join(", "))
                    })
                    .collect();
                out.push_str(&format!(" {key}: [{}]\n", groups.join(", ")));
            }
        } else {
            let counts: Vec<String> = recording
                .info_multiple
                .iter()
                .map(|(key, groups)| format!("[{key}: {}]", groups.len()))
                .collect();
            out.push_str(&format!("Info Multiple Messages: {}\n", counts.join(", ")));
        }
    }

    out.push('\n');
    out.push_str(&format!(
        "{:<41} {:7}, {:10}\n",
        "Name (multi id, message size in bytes)", "number of data points", "total bytes"
    ));
    for topic in &recording.topics {
        let name_id = format!("{} ({}, {})", topic.name, topic.multi_id, topic.message_size);
        out.push_str(&format!(
            " {:<40} {:7} {:10}\n",
            name_id,
            topic.samples,
            topic.total_bytes()
        ));
    }
    out
}

/// Every logged text message as `h:mm:ss LEVEL: text`.
pub fn render_messages(recording: &Recording) -> String {
    let mut out = format!("########### ulog_messages: {} ###########\n", recording.source);
    for m in &recording.logged_messages {
        out.push_str(&format!("{} {}: {}\n", clock(m.timestamp), m.level, m.message));
    }
    out
}
