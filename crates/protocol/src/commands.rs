use serde::{Deserialize, Serialize};

use crate::theme::ThemeToken;
use crate::types::{Point, Rgb, TimeRange};

/// A single, stateless plot instruction.
///
/// The core emits a `Vec<PlotCommand>` per graph. Frontends consume the list
/// in order; list order is z-order and legend order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlotCommand {
    /// A polyline through `points`, labelled for the legend.
    Curve {
        label: String,
        color: Rgb,
        width: u32,
        style: LineStyle,
        symbol: Option<Symbol>,
        points: Vec<Point>,
    },

    /// A themed polyline that is not part of the curve selection
    /// (e.g. a trajectory layer).
    Path {
        label: String,
        color: ThemeToken,
        width: u32,
        symbol: Option<Symbol>,
        points: Vec<Point>,
    },

    /// An infinite vertical line at `x`.
    VerticalLine {
        x: f64,
        color: ThemeToken,
        label: Option<String>,
    },

    /// The draggable cursor line and its multi-line readout.
    MarkerLine { x: f64, label: String },

    /// A shaded x-axis interval.
    Region { range: TimeRange, color: ThemeToken },

    /// An arrow whose tip sits at `tip`, pointing along `heading_deg`
    /// (0 = north/up, clockwise positive).
    Arrow {
        tip: Point,
        heading_deg: f64,
        color: ThemeToken,
    },

    /// Show the legend for the curves emitted so far.
    Legend,

    /// Graph title.
    Title { text: String },

    /// Ask the frontend to fit the viewport to the data.
    AutoRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineStyle {
    Solid,
    Dashed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Symbol {
    Circle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_serialize_round_trip() {
        let cmd = PlotCommand::Curve {
            label: "sensor_combined_0->dt*".into(),
            color: Rgb::new(31, 119, 180),
            width: 1,
            style: LineStyle::Solid,
            symbol: None,
            points: vec![Point::new(0.0, 1.0), Point::new(1.0, 2.0)],
        };
        let json = serde_json::to_string(&cmd).unwrap();
        let back: PlotCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }
}
