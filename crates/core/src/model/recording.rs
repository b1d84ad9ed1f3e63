use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::raw::{Dropout, InfoValue, LoggedMessage, ParamValue, ParameterChange};
use super::table::TopicTable;

/// Per-dataset statistics kept for the info report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub name: String,
    pub multi_id: u8,
    pub message_size: usize,
    pub samples: usize,
}

impl TopicSummary {
    pub fn total_bytes(&self) -> usize {
        self.message_size * self.samples
    }
}

/// Flight-mode transition instants, in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvents {
    pub forward: Vec<f64>,
    pub backward: Vec<f64>,
}

/// A derivation that could not run on this recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDerivation {
    pub derivation: String,
    pub reason: String,
}

/// One loaded log: topic tables with derived columns plus global metadata.
///
/// Built once by [`crate::dataset::build`] and read-only afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recording {
    pub source: String,
    pub title: String,
    pub tables: BTreeMap<String, TopicTable>,
    pub start_timestamp: u64,
    pub last_timestamp: u64,
    pub initial_parameters: BTreeMap<String, ParamValue>,
    pub changed_parameters: Vec<ParameterChange>,
    pub logged_messages: Vec<LoggedMessage>,
    pub dropouts: Vec<Dropout>,
    pub info: BTreeMap<String, InfoValue>,
    pub info_multiple: BTreeMap<String, Vec<Vec<InfoValue>>>,
    pub topics: Vec<TopicSummary>,
    pub transitions: TransitionEvents,
    pub skipped: Vec<SkippedDerivation>,
}

impl Recording {
    pub fn table(&self, name: &str) -> Option<&TopicTable> {
        self.tables.get(name)
    }

    pub fn column(&self, table: &str, field: &str) -> Option<(&[f64], &[f64])> {
        let t = self.tables.get(table)?;
        Some((t.index(), t.column(field)?))
    }

    /// Logged duration in seconds.
    pub fn duration(&self) -> f64 {
        self.last_timestamp.saturating_sub(self.start_timestamp) as f64 / 1e6
    }

    pub fn aircraft_id(&self) -> Option<i64> {
        self.initial_parameters
            .get("AIRCRAFT_ID")
            .copied()
            .map(ParamValue::as_i64)
    }

    /// Parameter change instants in seconds, in log order.
    pub fn parameter_change_times(&self) -> impl Iterator<Item = f64> + '_ {
        self.changed_parameters
            .iter()
            .map(|c| c.timestamp as f64 / 1e6)
    }

    pub fn was_skipped(&self, derivation: &str) -> bool {
        self.skipped.iter().any(|s| s.derivation == derivation)
    }
}
