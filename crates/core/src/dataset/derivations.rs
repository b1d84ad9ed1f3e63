//! The fixed catalog of derived fields added to every recording.
//!
//! Derived columns carry a `*` (or a `^0.5` suffix for standard deviations)
//! so they can be told apart from logged fields.

use super::derive::{Derivation, MissingData, Staged, Tables, column, columns, map, norm, table, zip_map};
use super::flags::{CONTROL_MODE_FLAGS, GPS_CHECK_FAIL_FLAGS, expand};
use super::geo::{Anchor, project_series};
use super::orientation::{Euler, decompose, euler_312, euler_321};

pub const FLAGS_TABLE: &str = "estimator_flags*";

const SENSOR_COMBINED: &str = "sensor_combined_0";
const ESTIMATOR_STATUS: &str = "estimator_status_0";
const LOCAL_POSITION: &str = "vehicle_local_position_0";

/// Sources of 312 yaw/roll/pitch: (table, quaternion field).
const EULER_312_SOURCES: [(&str, &str); 5] = [
    ("vehicle_attitude_0", "q"),
    ("vehicle_attitude_groundtruth_0", "q"),
    ("vehicle_attitude_setpoint_0", "q_d"),
    (ESTIMATOR_STATUS, "q"),
    (ESTIMATOR_STATUS, "states"),
];

/// Attitude topics that also get the 321 decomposition.
const EULER_321_SOURCES: [(&str, &str); 3] = [
    ("vehicle_attitude_0", "q"),
    ("vehicle_attitude_groundtruth_0", "q"),
    ("vehicle_attitude_setpoint_0", "q_d"),
];

/// Lat/lon columns to project: (table, lat field, lon field, divisor).
const GEO_SOURCES: [(&str, &str, &str, f64); 4] = [
    ("vehicle_gps_position_0", "lat", "lon", 1e7),
    ("vehicle_gps_position_1", "lat", "lon", 1e7),
    ("vehicle_global_position_0", "lat", "lon", 1.0),
    ("position_setpoint_triplet_0", "current.lat", "current.lon", 1.0),
];

const INNOVATION_VARIANCES: [&str; 8] = [
    "heading_innov_var",
    "mag_innov_var[0]",
    "mag_innov_var[1]",
    "mag_innov_var[2]",
    "beta_innov_var",
    "vel_pos_innov_var[0]",
    "vel_pos_innov_var[1]",
    "vel_pos_innov_var[2]",
];

/// Every derivation, in the order they are applied.
pub fn catalog() -> Vec<Derivation> {
    let mut all = vec![
        vector_norm("magnetometer_ga"),
        vector_norm("accelerometer_m_s2"),
        Derivation::new("wind_estimate", wind),
        speeds("local_position_speed", LOCAL_POSITION, ["vx", "vy", "vz"], "vxy*", "vxyz*"),
        speeds(
            "global_position_speed",
            "vehicle_global_position_0",
            ["vel_n", "vel_e", "vel_d"],
            "vel_ne*",
            "vel_ned*",
        ),
        gps_velocity("vehicle_gps_position_0"),
        gps_velocity("vehicle_gps_position_1"),
        Derivation::new("estimator_states", estimator_states),
        Derivation::new("innovation_std", innovation_std),
    ];
    all.extend(EULER_312_SOURCES.iter().map(|&(t, f)| euler_312_angles(t, f)));
    all.extend(EULER_321_SOURCES.iter().map(|&(t, f)| euler_321_angles(t, f)));
    all.extend(GEO_SOURCES.iter().map(|&(t, lat, lon, div)| local_plane(t, lat, lon, div)));
    all.push(Derivation::new("sample_interval", sample_interval));
    all.push(flag_bits("control_mode_flags", &CONTROL_MODE_FLAGS));
    all.push(flag_bits("gps_check_fail_flags", &GPS_CHECK_FAIL_FLAGS));
    all
}

fn vector_norm(field: &'static str) -> Derivation {
    Derivation::new(format!("{field}_norm"), move |tables: &mut Tables| {
        let axes = [0, 1, 2].map(|i| format!("{field}[{i}]"));
        let [x, y, z] = columns(
            tables,
            SENSOR_COMBINED,
            [axes[0].as_str(), axes[1].as_str(), axes[2].as_str()],
        )?;
        let mut staged = Staged::new();
        staged.push(format!("{field}_norm*"), norm(&[x, y, z]));
        staged.commit(tables, SENSOR_COMBINED)
    })
}

fn wind(tables: &mut Tables) -> Result<(), MissingData> {
    const TABLE: &str = "wind_estimate_0";
    let [north, east, var_north, var_east] = columns(
        tables,
        TABLE,
        ["windspeed_north", "windspeed_east", "variance_north", "variance_east"],
    )?;
    let mut staged = Staged::new();
    staged.push("windspeed_magnitude*", norm(&[north, east]));
    // Direction is taken from the variance fields, not the wind components.
    staged.push_angle("windspeed_direction*", zip_map(var_north, var_east, f64::atan2));
    staged.commit(tables, TABLE)
}

fn speeds(
    name: &'static str,
    source: &'static str,
    fields: [&'static str; 3],
    horizontal: &'static str,
    total: &'static str,
) -> Derivation {
    Derivation::new(name, move |tables: &mut Tables| {
        let [vx, vy, vz] = columns(tables, source, fields)?;
        let mut staged = Staged::new();
        staged.push(horizontal, norm(&[vx, vy]));
        staged.push(total, norm(&[vx, vy, vz]));
        staged.commit(tables, source)
    })
}

fn gps_velocity(source: &'static str) -> Derivation {
    Derivation::new(format!("gps_velocity({source})"), move |tables: &mut Tables| {
        let [vn, ve] = columns(tables, source, ["vel_n_m_s", "vel_e_m_s"])?;
        let mut staged = Staged::new();
        staged.push("vel_ne_m_s*", norm(&[vn, ve]));
        staged.push_angle("gpsCOG*", zip_map(ve, vn, f64::atan2));
        staged.commit(tables, source)
    })
}

fn estimator_states(tables: &mut Tables) -> Result<(), MissingData> {
    let [s4, s5, s16, s17, s18] = columns(
        tables,
        ESTIMATOR_STATUS,
        ["states[4]", "states[5]", "states[16]", "states[17]", "states[18]"],
    )?;
    let strength = norm(&[s16, s17, s18]);
    let floor = f64::from(f32::EPSILON);
    let inclination = zip_map(s18, &strength, |z, m| (z / m.max(floor)).asin());

    let mut staged = Staged::new();
    staged.push_angle("mag_declination_from_states*", zip_map(s17, s16, f64::atan2));
    staged.push("mag_strength_from_states*", strength);
    staged.push_angle("mag_inclination_from_states*", inclination);
    staged.push_angle("ekfGOG*", zip_map(s5, s4, f64::atan2));
    staged.commit(tables, ESTIMATOR_STATUS)
}

fn innovation_std(tables: &mut Tables) -> Result<(), MissingData> {
    const TABLE: &str = "ekf2_innovations_0";
    let mut staged = Staged::new();
    for field in INNOVATION_VARIANCES {
        staged.push(format!("{field}^0.5"), map(column(tables, TABLE, field)?, f64::sqrt));
    }
    let heading = column(tables, TABLE, "heading_innov")?;
    staged.push("heading_innov* [deg]", map(heading, f64::to_degrees));
    staged.commit(tables, TABLE)
}

fn quaternion<'a>(tables: &'a Tables, source: &str, field: &str) -> Result<[&'a [f64]; 4], MissingData> {
    let names = [0, 1, 2, 3].map(|i| format!("{field}[{i}]"));
    columns(
        tables,
        source,
        [
            names[0].as_str(),
            names[1].as_str(),
            names[2].as_str(),
            names[3].as_str(),
        ],
    )
}

fn split(angles: &[Euler]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let yaw = angles.iter().map(|e| e.yaw).collect();
    let roll = angles.iter().map(|e| e.roll).collect();
    let pitch = angles.iter().map(|e| e.pitch).collect();
    (yaw, roll, pitch)
}

fn euler_312_angles(source: &'static str, field: &'static str) -> Derivation {
    Derivation::new(format!("euler_312({source}.{field})"), move |tables: &mut Tables| {
        let angles = decompose(quaternion(tables, source, field)?, euler_312);
        let (yaw, roll, pitch) = split(&angles);
        let mut staged = Staged::new();
        staged.push_angle(&format!("{field}_yaw312*"), yaw);
        staged.push_angle(&format!("{field}_roll312*"), roll);
        staged.push_angle(&format!("{field}_pitch312*"), pitch);
        staged.commit(tables, source)
    })
}

fn euler_321_angles(source: &'static str, field: &'static str) -> Derivation {
    Derivation::new(format!("euler_321({source}.{field})"), move |tables: &mut Tables| {
        let q = quaternion(tables, source, field)?;
        let (yaw, roll, pitch) = split(&decompose(q, euler_321));
        let (yaw312, _, _) = split(&decompose(q, euler_312));
        let mut staged = Staged::new();
        staged.push_angle("roll321*", roll);
        staged.push_angle("pitch321*", pitch);
        staged.push_angle("yaw321*", yaw);
        staged.push_angle("yaw312*", yaw312);
        staged.commit(tables, source)
    })
}

/// First valid reference point of the local position estimate.
pub fn reference_anchor(tables: &Tables) -> Option<Anchor> {
    let local = tables.get(LOCAL_POSITION)?;
    let row = local.column("ref_timestamp")?.iter().position(|&t| t != 0.0)?;
    Some(Anchor::from_degrees(
        local.column("ref_lat")?[row],
        local.column("ref_lon")?[row],
    ))
}

fn local_plane(source: &'static str, lat: &'static str, lon: &'static str, div: f64) -> Derivation {
    Derivation::new(format!("local_plane({source})"), move |tables: &mut Tables| {
        let [lat_deg, lon_deg] = columns(tables, source, [lat, lon])?;
        let (x, y) = project_series(lat_deg, lon_deg, div, reference_anchor(tables))
            .ok_or_else(|| MissingData::Empty(source.to_string()))?;
        let mut staged = Staged::new();
        staged.push(format!("{lat}_m*"), x);
        staged.push(format!("{lon}_m*"), y);
        staged.commit(tables, source)
    })
}

fn sample_interval(tables: &mut Tables) -> Result<(), MissingData> {
    let index = table(tables, SENSOR_COMBINED)?.index();
    let dt: Vec<f64> = std::iter::once(0.0)
        .chain(index.windows(2).map(|w| (w[1] - w[0]) * 1e6))
        .take(index.len())
        .collect();
    let mut staged = Staged::new();
    staged.push("dt*", dt);
    staged.commit(tables, SENSOR_COMBINED)
}

fn flag_bits(field: &'static str, names: &'static [&'static str]) -> Derivation {
    Derivation::new(format!("flags({field})"), move |tables: &mut Tables| {
        let status = table(tables, ESTIMATOR_STATUS)?;
        let values = column(tables, ESTIMATOR_STATUS, field)?;
        let index = status.index().to_vec();
        let mut staged = Staged::new();
        for (name, bits) in expand(values, names) {
            staged.push(name, bits);
        }
        staged.commit_to_new(tables, FLAGS_TABLE, &index)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::derive::run_all;
    use crate::model::TopicTable;

    const TOL: f64 = 1e-9;

    fn topic(columns: &[(&str, Vec<f64>)]) -> TopicTable {
        let rows = columns.first().map_or(0, |(_, v)| v.len());
        let mut t = TopicTable::with_index((0..rows).map(|i| i as f64 * 0.1).collect());
        for (name, values) in columns {
            t.insert_derived(*name, values.clone()).unwrap();
        }
        t
    }

    fn enriched(topics: Vec<(&str, TopicTable)>) -> Tables {
        let mut tables: Tables = topics
            .into_iter()
            .map(|(name, t)| (name.to_string(), t))
            .collect();
        run_all(&mut tables, &catalog());
        tables
    }

    fn value(tables: &Tables, table: &str, column: &str, row: usize) -> f64 {
        tables[table].column(column).unwrap()[row]
    }

    #[test]
    fn wind_direction_comes_from_the_variances() {
        let tables = enriched(vec![(
            "wind_estimate_0",
            topic(&[
                ("windspeed_north", vec![3.0]),
                ("windspeed_east", vec![4.0]),
                ("variance_north", vec![1.0]),
                ("variance_east", vec![0.0]),
            ]),
        )]);
        assert!((value(&tables, "wind_estimate_0", "windspeed_magnitude*", 0) - 5.0).abs() < TOL);
        let direction = value(&tables, "wind_estimate_0", "windspeed_direction* [deg]", 0);
        assert!((direction - 90.0).abs() < TOL);
    }

    #[test]
    fn gps_speed_and_course() {
        let tables = enriched(vec![(
            "vehicle_gps_position_1",
            topic(&[("vel_n_m_s", vec![0.0, 1.0]), ("vel_e_m_s", vec![2.0, 1.0])]),
        )]);
        let gps = "vehicle_gps_position_1";
        assert!((value(&tables, gps, "vel_ne_m_s*", 0) - 2.0).abs() < TOL);
        assert!((value(&tables, gps, "gpsCOG* [deg]", 0) - 90.0).abs() < TOL);
        assert!((value(&tables, gps, "gpsCOG* [deg]", 1) - 45.0).abs() < TOL);
    }

    #[test]
    fn magnetic_states_and_ground_course() {
        let tables = enriched(vec![(
            ESTIMATOR_STATUS,
            topic(&[
                ("states[4]", vec![1.0, 0.0]),
                ("states[5]", vec![1.0, 2.0]),
                ("states[16]", vec![0.0, 3.0]),
                ("states[17]", vec![0.0, 0.0]),
                ("states[18]", vec![0.0, 4.0]),
            ]),
        )]);
        let col = |name: &str, row| value(&tables, ESTIMATOR_STATUS, name, row);

        assert!((col("ekfGOG* [deg]", 0) - 45.0).abs() < TOL);
        assert!((col("ekfGOG* [deg]", 1) - 90.0).abs() < TOL);

        // zero field strength is guarded instead of dividing by zero
        assert_eq!(col("mag_strength_from_states*", 0), 0.0);
        assert_eq!(col("mag_inclination_from_states*", 0), 0.0);

        assert!((col("mag_strength_from_states*", 1) - 5.0).abs() < TOL);
        assert!((col("mag_inclination_from_states*", 1) - 0.8f64.asin()).abs() < TOL);
        assert!(col("mag_declination_from_states* [deg]", 1).abs() < TOL);
    }

    #[test]
    fn innovation_standard_deviations() {
        let mut columns: Vec<(&str, Vec<f64>)> = INNOVATION_VARIANCES.iter().map(|&f| (f, vec![4.0])).collect();
        columns.push(("heading_innov", vec![std::f64::consts::PI]));
        let tables = enriched(vec![("ekf2_innovations_0", topic(&columns))]);

        for field in INNOVATION_VARIANCES {
            let std_dev = value(&tables, "ekf2_innovations_0", &format!("{field}^0.5"), 0);
            assert!((std_dev - 2.0).abs() < TOL, "{field}");
        }
        let heading = value(&tables, "ekf2_innovations_0", "heading_innov* [deg]", 0);
        assert!((heading - 180.0).abs() < TOL);
    }

    #[test]
    fn innovation_columns_need_every_variance() {
        let tables = enriched(vec![(
            "ekf2_innovations_0",
            topic(&[("heading_innov_var", vec![4.0]), ("heading_innov", vec![0.0])]),
        )]);
        assert!(!tables["ekf2_innovations_0"].has_column("heading_innov_var^0.5"));
    }

    #[test]
    fn gps_positions_are_scaled_and_projected() {
        let tables = enriched(vec![(
            "vehicle_gps_position_0",
            topic(&[
                ("lat", vec![473_977_420.0, 473_978_420.0]),
                ("lon", vec![85_455_940.0, 85_455_940.0]),
            ]),
        )]);
        let gps = "vehicle_gps_position_0";
        assert_eq!(value(&tables, gps, "lat_m*", 0), 0.0);
        assert_eq!(value(&tables, gps, "lon_m*", 0), 0.0);
        // 1e-4 degrees of latitude northwards
        assert!((value(&tables, gps, "lat_m*", 1) - 11.119_49).abs() < 1e-3);
        assert!(value(&tables, gps, "lon_m*", 1).abs() < 1e-6);
    }

    #[test]
    fn local_reference_anchors_the_projection() {
        let tables = enriched(vec![
            (
                LOCAL_POSITION,
                topic(&[
                    ("ref_timestamp", vec![0.0, 5.0]),
                    ("ref_lat", vec![0.0, 47.0]),
                    ("ref_lon", vec![0.0, 8.0]),
                ]),
            ),
            (
                "vehicle_global_position_0",
                topic(&[("lat", vec![47.0]), ("lon", vec![8.0])]),
            ),
        ]);
        assert_eq!(reference_anchor(&tables), Some(Anchor::from_degrees(47.0, 8.0)));
        assert_eq!(value(&tables, "vehicle_global_position_0", "lat_m*", 0), 0.0);
    }

    #[test]
    fn state_vector_quaternion_gets_312_angles() {
        let half = 0.25f64;
        let tables = enriched(vec![(
            ESTIMATOR_STATUS,
            topic(&[
                ("states[0]", vec![half.cos()]),
                ("states[1]", vec![0.0]),
                ("states[2]", vec![0.0]),
                ("states[3]", vec![half.sin()]),
            ]),
        )]);
        let yaw = value(&tables, ESTIMATOR_STATUS, "states_yaw312* [deg]", 0);
        assert!((yaw - 0.5f64.to_degrees()).abs() < TOL);
        let roll = value(&tables, ESTIMATOR_STATUS, "states_roll312*", 0);
        assert!(roll.abs() < TOL);
    }

    #[test]
    fn attitude_gets_both_conventions() {
        let half = 0.25f64;
        let tables = enriched(vec![(
            "vehicle_attitude_setpoint_0",
            topic(&[
                ("q_d[0]", vec![half.cos()]),
                ("q_d[1]", vec![0.0]),
                ("q_d[2]", vec![0.0]),
                ("q_d[3]", vec![half.sin()]),
            ]),
        )]);
        let sp = "vehicle_attitude_setpoint_0";
        for column in ["q_d_yaw312*", "yaw321*", "yaw312*"] {
            assert!((value(&tables, sp, column, 0) - 0.5).abs() < TOL, "{column}");
        }
    }
}
