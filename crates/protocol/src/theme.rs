use serde::{Deserialize, Serialize};

/// Semantic color tokens for everything that is not a user-selected curve.
///
/// Curves carry their palette color directly; overlays are themed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThemeToken {
    // Vertical event lines
    ForwardTransition,
    BackTransition,
    ParameterChange,

    // Region of interest
    RoiFill,

    // Trajectory graph
    EstimatedTrajectory,
    GpsTrajectory,
    MissionSetpoint,
    VehicleArrow,
}
