use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use ulog_explorer_protocol::TimeRange;

use super::palette::ColorKey;
use super::recording::Recording;
use super::selection::{CurveSelection, SelectionError, Toggle};
use crate::dataset;
use crate::parsers::{self, ParseError};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {name}: {source}")]
    Parse { name: String, source: ParseError },
}

/// Which of the two recording slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    Primary,
    Secondary,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::Primary, Slot::Secondary];
}

/// Cursor line position (seconds) and visibility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerState {
    pub position: f64,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoiState {
    pub range: TimeRange,
    pub visible: bool,
}

/// Display toggles owned by one slot. Frontends rebuild their drawables from
/// this state; the core never holds rendering handles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotDisplay {
    pub marker: MarkerState,
    pub roi: RoiState,
    pub show_legend: bool,
    pub show_title: bool,
    pub show_transitions: bool,
    pub show_parameter_changes: bool,
}

impl SlotDisplay {
    /// Marker at the middle of `span`, ROI on its inner quartiles, all hidden.
    pub fn for_span(span: TimeRange) -> Self {
        Self {
            marker: MarkerState {
                position: span.lerp(0.5),
                visible: false,
            },
            roi: RoiState {
                range: TimeRange::new(span.lerp(0.25), span.lerp(0.75)),
                visible: false,
            },
            show_legend: false,
            show_title: false,
            show_transitions: false,
            show_parameter_changes: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSlot {
    pub recording: Recording,
    pub display: SlotDisplay,
}

/// Plot-wide style shared by both slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotStyle {
    pub symbols: bool,
    pub bold: bool,
    pub rescale: bool,
    pub trajectory: bool,
}

impl PlotStyle {
    pub fn line_width(&self) -> u32 {
        if self.bold { 3 } else { 1 }
    }
}

/// Up to two loaded recordings, the curve selection with its palette, and
/// the display state the presentation layer renders from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    primary: Option<RecordingSlot>,
    secondary: Option<RecordingSlot>,
    selection: CurveSelection,
    style: PlotStyle,
    auto_range: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create a new empty session.
    pub fn new() -> Self {
        Self {
            primary: None,
            secondary: None,
            selection: CurveSelection::new(),
            style: PlotStyle::default(),
            auto_range: true,
        }
    }

    /// Read, parse and build `path` into `slot`.
    ///
    /// On error the slot keeps whatever it held before.
    pub fn load(&mut self, slot: Slot, path: &Path) -> Result<(), LoadError> {
        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_bytes(slot, &bytes, &path.display().to_string())
    }

    /// Parse and build an in-memory log named `name` into `slot`.
    pub fn load_bytes(&mut self, slot: Slot, bytes: &[u8], name: &str) -> Result<(), LoadError> {
        let raw = parsers::parse_auto(bytes).map_err(|source| LoadError::Parse {
            name: name.to_string(),
            source,
        })?;
        self.install(slot, dataset::build(raw, name));
        Ok(())
    }

    /// Swap a fully built recording into `slot`.
    ///
    /// The selection refers to the previous contents, so it is cleared and
    /// every palette color freed; the slot's marker and ROI are reset.
    pub fn install(&mut self, slot: Slot, recording: Recording) {
        info!(?slot, source = %recording.source, "installing recording");
        let display = SlotDisplay::for_span(recording_span(&recording));
        *self.slot_mut(slot) = Some(RecordingSlot { recording, display });
        self.selection.clear();
        self.auto_range = true;
    }

    /// Drop the recording in `slot`, if any.
    pub fn close(&mut self, slot: Slot) {
        if self.slot_mut(slot).take().is_some() {
            debug!(?slot, "closed recording");
        }
    }

    /// The recording and display state in `slot`, if loaded.
    pub fn slot(&self, slot: Slot) -> Option<&RecordingSlot> {
        match slot {
            Slot::Primary => self.primary.as_ref(),
            Slot::Secondary => self.secondary.as_ref(),
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Option<RecordingSlot> {
        match slot {
            Slot::Primary => &mut self.primary,
            Slot::Secondary => &mut self.secondary,
        }
    }

    pub fn recording(&self, slot: Slot) -> Option<&Recording> {
        self.slot(slot).map(|s| &s.recording)
    }

    /// Display toggles of `slot`; `None` while it is empty.
    pub fn display(&self, slot: Slot) -> Option<&SlotDisplay> {
        self.slot(slot).map(|s| &s.display)
    }

    /// Loaded slots in order (primary first).
    pub fn loaded(&self) -> impl Iterator<Item = (Slot, &RecordingSlot)> {
        Slot::ALL
            .into_iter()
            .filter_map(|slot| self.slot(slot).map(|s| (slot, s)))
    }

    fn display_mut(&mut self, slot: Slot) -> Option<&mut SlotDisplay> {
        self.slot_mut(slot).as_mut().map(|s| &mut s.display)
    }

    // -- curve selection --

    pub fn selection(&self) -> &CurveSelection {
        &self.selection
    }

    /// Whether `topic->field` is currently selected.
    pub fn contains(&self, topic: &str, field: &str) -> bool {
        self.selection.contains(topic, field)
    }

    /// Select `topic->field` and return the color it was given.
    ///
    /// The first curve added to an empty selection re-arms auto range. A
    /// duplicate or a full palette leaves the selection untouched.
    pub fn add_selected(&mut self, topic: &str, field: &str) -> Result<ColorKey, SelectionError> {
        let was_empty = self.selection.is_empty();
        let key = self.selection.add(topic, field)?;
        if was_empty {
            self.auto_range = true;
        }
        Ok(key)
    }

    /// Deselect `topic->field`, freeing its color. Unknown pairs are ignored.
    pub fn remove_selected(&mut self, topic: &str, field: &str) {
        self.selection.remove(topic, field);
    }

    /// Remove the pair if selected, add it otherwise.
    pub fn toggle(&mut self, topic: &str, field: &str) -> Result<Toggle, SelectionError> {
        if self.contains(topic, field) {
            self.remove_selected(topic, field);
            Ok(Toggle::Removed)
        } else {
            self.add_selected(topic, field).map(Toggle::Added)
        }
    }

    /// Deselect everything and free every color.
    pub fn clear(&mut self) {
        self.selection.clear();
    }

    /// Whether the frontend should fit its viewport now. True at most once
    /// per arming, and only while something is selected.
    pub fn take_auto_range(&mut self) -> bool {
        if self.selection.is_empty() {
            self.auto_range = true;
            return false;
        }
        std::mem::take(&mut self.auto_range)
    }

    // -- plot style --

    pub fn style(&self) -> PlotStyle {
        self.style
    }

    /// Draw sample symbols on curves.
    pub fn toggle_symbols(&mut self) {
        self.style.symbols = !self.style.symbols;
    }

    /// Switch curves between width 1 and 3.
    pub fn toggle_bold(&mut self) {
        self.style.bold = !self.style.bold;
    }

    /// Normalize every curve to [0, 1]. Either way the next frame refits.
    pub fn toggle_rescale(&mut self) {
        self.style.rescale = !self.style.rescale;
        self.auto_range = true;
    }

    /// Turning the trajectory graph on also reveals the primary marker,
    /// which drives the vehicle arrow.
    pub fn toggle_trajectory(&mut self) {
        self.style.trajectory = !self.style.trajectory;
        if self.style.trajectory
            && let Some(display) = self.display_mut(Slot::Primary)
        {
            display.marker.visible = true;
        }
    }

    // -- per-slot display --
    //
    // All of these are no-ops on an empty slot.

    pub fn toggle_legend(&mut self, slot: Slot) {
        if let Some(d) = self.display_mut(slot) {
            d.show_legend = !d.show_legend;
        }
    }

    pub fn toggle_title(&mut self, slot: Slot) {
        if let Some(d) = self.display_mut(slot) {
            d.show_title = !d.show_title;
        }
    }

    /// VTOL transition lines.
    pub fn toggle_transitions(&mut self, slot: Slot) {
        if let Some(d) = self.display_mut(slot) {
            d.show_transitions = !d.show_transitions;
        }
    }

    /// Labelled lines at each in-flight parameter change.
    pub fn toggle_parameter_changes(&mut self, slot: Slot) {
        if let Some(d) = self.display_mut(slot) {
            d.show_parameter_changes = !d.show_parameter_changes;
        }
    }

    pub fn toggle_marker(&mut self, slot: Slot) {
        if let Some(d) = self.display_mut(slot) {
            d.marker.visible = !d.marker.visible;
        }
    }

    /// Move the marker; hidden markers keep their position too.
    pub fn set_marker(&mut self, slot: Slot, position: f64) {
        if let Some(d) = self.display_mut(slot) {
            d.marker.position = position;
        }
    }

    /// Nudge the marker by `delta` seconds.
    pub fn step_marker(&mut self, slot: Slot, delta: f64) {
        if let Some(d) = self.display_mut(slot) {
            d.marker.position += delta;
        }
    }

    pub fn toggle_roi(&mut self, slot: Slot) {
        if let Some(d) = self.display_mut(slot) {
            d.roi.visible = !d.roi.visible;
        }
    }

    /// Bounds may be given in either order.
    pub fn set_roi(&mut self, slot: Slot, start: f64, end: f64) {
        if let Some(d) = self.display_mut(slot) {
            d.roi.range = TimeRange::new(start, end);
        }
    }
}

/// Logged time span of `recording` in seconds.
pub fn recording_span(recording: &Recording) -> TimeRange {
    TimeRange::new(
        recording.start_timestamp as f64 / 1e6,
        recording.last_timestamp as f64 / 1e6,
    )
}
