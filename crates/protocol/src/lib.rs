pub mod commands;
pub mod theme;
pub mod types;

pub use commands::{LineStyle, PlotCommand, Symbol};
pub use theme::ThemeToken;
pub use types::{Point, Rgb, TimeRange};
