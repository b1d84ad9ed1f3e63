//! Raw recording to enriched [`Recording`].

pub mod derivations;
pub mod derive;
pub mod flags;
pub mod geo;
pub mod orientation;
pub mod transitions;

use tracing::info;

use crate::model::{RawRecording, Recording, TopicSummary, TopicTable};
use derive::Tables;

/// Turn parser output into topic tables keyed `"<topic>_<instance>"`, add every
/// derived field whose inputs are present and detect transitions.
///
/// Never fails: derivations missing inputs are listed in
/// [`Recording::skipped`].
pub fn build(raw: RawRecording, source: impl Into<String>) -> Recording {
    let source = source.into();
    let mut datasets = raw.datasets;
    datasets.sort_by_cached_key(|d| format!("{}{}", d.name, d.multi_id));

    let topics = datasets
        .iter()
        .map(|d| TopicSummary {
            name: d.name.clone(),
            multi_id: d.multi_id,
            message_size: d.message_size,
            samples: d.len(),
        })
        .collect();

    let mut tables = Tables::new();
    for dataset in datasets {
        let name = dataset.table_name();
        tables.insert(name, TopicTable::from_raw(dataset));
    }

    let transitions = transitions::detect(tables.get(transitions::STATUS_TABLE));
    let skipped = derive::run_all(&mut tables, &derivations::catalog());

    let title = match raw.initial_parameters.get("AIRCRAFT_ID") {
        Some(id) => format!("{source} ({})", id.as_i64()),
        None => source.clone(),
    };

    info!(
        source = %source,
        tables = tables.len(),
        skipped = skipped.len(),
        "recording built"
    );

    Recording {
        source,
        title,
        tables,
        start_timestamp: raw.start_timestamp,
        last_timestamp: raw.last_timestamp,
        initial_parameters: raw.initial_parameters,
        changed_parameters: raw.changed_parameters,
        logged_messages: raw.logged_messages,
        dropouts: raw.dropouts,
        info: raw.info,
        info_multiple: raw.info_multiple,
        topics,
        transitions,
        skipped,
    }
}
