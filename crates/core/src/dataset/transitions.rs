//! VTOL transition instants from `vehicle_status`.

use crate::model::{TopicTable, TransitionEvents};

pub const STATUS_TABLE: &str = "vehicle_status_0";

/// Rows whose value differs from the previous row. Row 0 has no
/// predecessor and is never an edge.
fn edges(values: &[f64]) -> impl Iterator<Item = usize> + '_ {
    values
        .windows(2)
        .enumerate()
        .filter(|(_, w)| w[0] != w[1])
        .map(|(i, _)| i + 1)
}

/// Forward and back transition timestamps. The first edge of each sequence
/// is dropped. A missing table or one that never enters transition mode
/// yields no events.
pub fn detect(status: Option<&TopicTable>) -> TransitionEvents {
    let Some(status) = status else {
        return TransitionEvents::default();
    };
    let Some(mode) = status.column("in_transition_mode") else {
        return TransitionEvents::default();
    };
    if mode.iter().all(|&v| v == 0.0) {
        return TransitionEvents::default();
    }
    let index = status.index();

    let forward = status
        .column("in_transition_to_fw")
        .map(|to_fw| edges(to_fw).skip(1).map(|i| index[i]).collect())
        .unwrap_or_default();

    let backward = status
        .column("is_rotary_wing")
        .map(|rotary| {
            edges(mode)
                .filter(|&i| rotary[i] != 0.0)
                .skip(1)
                .map(|i| index[i])
                .collect()
        })
        .unwrap_or_default();

    TransitionEvents { forward, backward }
}
