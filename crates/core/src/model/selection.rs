use serde::{Deserialize, Serialize};
use thiserror::Error;
use ulog_explorer_protocol::Rgb;

use super::palette::{ColorKey, PALETTE_SIZE, Palette};

/// Separator between topic and field in a combined curve name.
pub const NAME_SEPARATOR: &str = "->";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("`{topic}->{field}` is already selected")]
    AlreadySelected { topic: String, field: String },
    #[error("all {capacity} curve colors are in use")]
    PaletteExhausted { capacity: usize },
}

/// `topic->field`, the identity shown in curve lists.
pub fn combined_name(topic: &str, field: &str) -> String {
    format!("{topic}{NAME_SEPARATOR}{field}")
}

/// Inverse of [`combined_name`]; splits on the first separator.
pub fn split_combined_name(name: &str) -> Option<(&str, &str)> {
    name.split_once(NAME_SEPARATOR)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveEntry {
    pub topic: String,
    pub field: String,
    pub color_key: ColorKey,
    pub color: Rgb,
}

impl CurveEntry {
    pub fn combined_name(&self) -> String {
        combined_name(&self.topic, &self.field)
    }

    fn is(&self, topic: &str, field: &str) -> bool {
        self.topic == topic && self.field == field
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Added(ColorKey),
    Removed,
}

/// Plotted (topic, field) pairs in insertion order, each owning one palette
/// color. Entries and palette occupancy only change together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurveSelection {
    entries: Vec<CurveEntry>,
    palette: Palette,
}

impl CurveSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, topic: &str, field: &str) -> bool {
        self.entries.iter().any(|e| e.is(topic, field))
    }

    /// Append a curve with the lowest free color.
    pub fn add(&mut self, topic: &str, field: &str) -> Result<ColorKey, SelectionError> {
        if self.contains(topic, field) {
            return Err(SelectionError::AlreadySelected {
                topic: topic.to_string(),
                field: field.to_string(),
            });
        }
        let color_key = self.palette.allocate().ok_or(SelectionError::PaletteExhausted {
            capacity: PALETTE_SIZE,
        })?;
        self.entries.push(CurveEntry {
            topic: topic.to_string(),
            field: field.to_string(),
            color_key,
            color: color_key.rgb(),
        });
        Ok(color_key)
    }

    /// Drop every entry for the pair and free its color. Returns whether
    /// anything was removed.
    pub fn remove(&mut self, topic: &str, field: &str) -> bool {
        let before = self.entries.len();
        let palette = &mut self.palette;
        self.entries.retain(|e| {
            let hit = e.is(topic, field);
            if hit {
                palette.release(e.color_key);
            }
            !hit
        });
        self.entries.len() != before
    }

    pub fn toggle(&mut self, topic: &str, field: &str) -> Result<Toggle, SelectionError> {
        if self.remove(topic, field) {
            Ok(Toggle::Removed)
        } else {
            self.add(topic, field).map(Toggle::Added)
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.palette.release_all();
    }

    pub fn entries(&self) -> &[CurveEntry] {
        &self.entries
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
