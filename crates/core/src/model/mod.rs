pub mod palette;
pub mod raw;
pub mod recording;
pub mod selection;
pub mod session;
pub mod table;

pub use palette::{ColorKey, PALETTE_SIZE, Palette};
pub use raw::{
    Dropout, InfoValue, LogLevel, LoggedMessage, ParamValue, ParameterChange, RawDataset,
    RawRecording,
};
pub use recording::{Recording, SkippedDerivation, TopicSummary, TransitionEvents};
pub use selection::{
    CurveEntry, CurveSelection, SelectionError, Toggle, combined_name, split_combined_name,
};
pub use session::{
    LoadError, MarkerState, PlotStyle, RecordingSlot, RoiState, Session, Slot, SlotDisplay,
};
pub use table::{TableError, TopicTable, is_derived};
