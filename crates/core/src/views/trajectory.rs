use ulog_explorer_protocol::{PlotCommand, Point, Symbol, ThemeToken};

use crate::model::{Recording, Session, Slot};

use super::markers::sample_at;

const LOCAL_POSITION: &str = "vehicle_local_position_0";
const GPS_POSITION: &str = "vehicle_gps_position_0";
const SETPOINTS: &str = "position_setpoint_triplet_0";
const ATTITUDE: &str = "vehicle_attitude_0";

/// East/north path through two columns of one table.
fn path(recording: &Recording, table: &str, east: &str, north: &str) -> Option<Vec<Point>> {
    let t = recording.table(table)?;
    let (e, n) = (t.column(east)?, t.column(north)?);
    Some(e.iter().zip(n).map(|(&x, &y)| Point::new(x, y)).collect())
}

/// Vehicle position and heading at `t`.
fn vehicle_arrow(recording: &Recording, t: f64) -> Option<PlotCommand> {
    let local = recording.table(LOCAL_POSITION)?;
    let row = sample_at(local.index(), t)?;
    let tip = Point::new(local.column("y")?[row], local.column("x")?[row]);

    let attitude = recording.table(ATTITUDE)?;
    let heading_deg = attitude.column("yaw321* [deg]")?[sample_at(attitude.index(), t)?];
    Some(PlotCommand::Arrow {
        tip,
        heading_deg,
        color: ThemeToken::VehicleArrow,
    })
}

/// Top-down map of the primary recording: estimated and GPS tracks, mission
/// setpoints, and the vehicle at the marker. Layers whose data is missing are
/// left out; nothing is drawn while the trajectory graph is off.
pub fn render_trajectory(session: &Session) -> Vec<PlotCommand> {
    let style = session.style();
    let Some(primary) = session.slot(Slot::Primary).filter(|_| style.trajectory) else {
        return Vec::new();
    };
    let recording = &primary.recording;
    let width = style.line_width();

    let layers = [
        ("estimated", ThemeToken::EstimatedTrajectory, LOCAL_POSITION, "y", "x", None),
        ("gps", ThemeToken::GpsTrajectory, GPS_POSITION, "lon_m*", "lat_m*", None),
        (
            "mission",
            ThemeToken::MissionSetpoint,
            SETPOINTS,
            "current.lon_m*",
            "current.lat_m*",
            Some(Symbol::Circle),
        ),
    ];

    let mut commands: Vec<PlotCommand> = layers
        .into_iter()
        .filter_map(|(label, color, table, east, north, symbol)| {
            Some(PlotCommand::Path {
                label: label.to_string(),
                color,
                width,
                symbol,
                points: path(recording, table, east, north)?,
            })
        })
        .collect();

    if primary.display.marker.visible {
        commands.extend(vehicle_arrow(recording, primary.display.marker.position));
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TopicTable;

    fn recording() -> Recording {
        let mut local = TopicTable::with_index(vec![1.0, 2.0]);
        local.insert_derived("x", vec![0.0, 10.0]).unwrap();
        local.insert_derived("y", vec![0.0, 5.0]).unwrap();
        let mut att = TopicTable::with_index(vec![0.5, 1.5]);
        att.insert_derived("yaw321* [deg]", vec![0.0, 90.0]).unwrap();
        let mut rec = Recording {
            start_timestamp: 0,
            last_timestamp: 4_000_000,
            ..Recording::default()
        };
        rec.tables.insert(LOCAL_POSITION.into(), local);
        rec.tables.insert(ATTITUDE.into(), att);
        rec
    }

    #[test]
    fn hidden_while_trajectory_off() {
        let mut s = Session::new();
        s.install(Slot::Primary, recording());
        assert!(render_trajectory(&s).is_empty());
    }

    #[test]
    fn missing_layers_are_omitted_and_arrow_follows_marker() {
        let mut s = Session::new();
        s.install(Slot::Primary, recording());
        s.toggle_trajectory();
        s.set_marker(Slot::Primary, 2.0);
        let cmds = render_trajectory(&s);
        assert_eq!(cmds.len(), 2);
        let PlotCommand::Path { label, points, .. } = &cmds[0] else {
            panic!("expected the estimated path");
        };
        assert_eq!(label, "estimated");
        assert_eq!(points[1], Point::new(5.0, 10.0));
        assert_eq!(
            cmds[1],
            PlotCommand::Arrow {
                tip: Point::new(5.0, 10.0),
                heading_deg: 90.0,
                color: ThemeToken::VehicleArrow,
            }
        );
    }
}
