//! Minimal ULog writer for building test logs in memory.

#![allow(dead_code)]

use ulog_explorer_core::parsers::ulog::HEADER_MAGIC;

pub struct UlogWriter {
    bytes: Vec<u8>,
    next_msg_id: u16,
}

impl UlogWriter {
    pub fn new(start_us: u64) -> Self {
        let mut bytes = HEADER_MAGIC.to_vec();
        bytes.push(1);
        bytes.extend_from_slice(&start_us.to_le_bytes());
        Self { bytes, next_msg_id: 0 }
    }

    fn message(&mut self, kind: u8, payload: &[u8]) {
        self.bytes.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        self.bytes.push(kind);
        self.bytes.extend_from_slice(payload);
    }

    fn key_value(key: &str, value: &[u8]) -> Vec<u8> {
        let mut p = vec![key.len() as u8];
        p.extend_from_slice(key.as_bytes());
        p.extend_from_slice(value);
        p
    }

    pub fn info(&mut self, name: &str, value: &str) -> &mut Self {
        let payload = Self::key_value(&format!("char[{}] {name}", value.len()), value.as_bytes());
        self.message(b'I', &payload);
        self
    }

    pub fn param_i32(&mut self, name: &str, value: i32) -> &mut Self {
        let payload = Self::key_value(&format!("int32_t {name}"), &value.to_le_bytes());
        self.message(b'P', &payload);
        self
    }

    pub fn param_f32(&mut self, name: &str, value: f32) -> &mut Self {
        let payload = Self::key_value(&format!("float {name}"), &value.to_le_bytes());
        self.message(b'P', &payload);
        self
    }

    /// Define `name` as `uint64_t timestamp` followed by float `fields`
    /// (e.g. `"float[4] q"` or `"float vx"`) and subscribe to it.
    pub fn topic(&mut self, name: &str, multi_id: u8, fields: &[&str]) -> u16 {
        let mut format = format!("{name}:uint64_t timestamp;");
        for field in fields {
            format.push_str(field);
            format.push(';');
        }
        self.message(b'F', format.as_bytes());

        let msg_id = self.next_msg_id;
        self.next_msg_id += 1;
        let mut payload = vec![multi_id];
        payload.extend_from_slice(&msg_id.to_le_bytes());
        payload.extend_from_slice(name.as_bytes());
        self.message(b'A', &payload);
        msg_id
    }

    pub fn sample(&mut self, msg_id: u16, timestamp_us: u64, values: &[f32]) -> &mut Self {
        let mut payload = msg_id.to_le_bytes().to_vec();
        payload.extend_from_slice(&timestamp_us.to_le_bytes());
        for v in values {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        self.message(b'D', &payload);
        self
    }

    pub fn log(&mut self, level: u8, timestamp_us: u64, text: &str) -> &mut Self {
        let mut payload = vec![level];
        payload.extend_from_slice(&timestamp_us.to_le_bytes());
        payload.extend_from_slice(text.as_bytes());
        self.message(b'L', &payload);
        self
    }

    pub fn dropout(&mut self, duration_ms: u16) -> &mut Self {
        self.message(b'O', &duration_ms.to_le_bytes());
        self
    }

    pub fn finish(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}

/// Seconds to microseconds for sample timestamps.
pub fn us(seconds: f64) -> u64 {
    (seconds * 1e6).round() as u64
}

/// A short flight with IMU, attitude, local and global position, estimator
/// status and VTOL status topics, sampled every 0.5 s for 10 s.
pub fn flight_log() -> Vec<u8> {
    let mut w = UlogWriter::new(1_000_000);
    w.info("sys_name", "PX4");
    w.param_i32("AIRCRAFT_ID", 7);
    w.param_f32("MPC_XY_VEL_MAX", 12.0);

    let imu = w.topic(
        "sensor_combined",
        0,
        &["float[3] accelerometer_m_s2", "float[3] magnetometer_ga"],
    );
    let att = w.topic("vehicle_attitude", 0, &["float[4] q"]);
    let local = w.topic(
        "vehicle_local_position",
        0,
        &[
            "float x",
            "float y",
            "float vx",
            "float vy",
            "float vz",
            "float ref_timestamp",
            "float ref_lat",
            "float ref_lon",
        ],
    );
    let global = w.topic(
        "vehicle_global_position",
        0,
        &["float lat", "float lon", "float vel_n", "float vel_e", "float vel_d"],
    );
    let status = w.topic(
        "estimator_status",
        0,
        &["float control_mode_flags", "float gps_check_fail_flags"],
    );
    let vtol = w.topic(
        "vehicle_status",
        0,
        &["float in_transition_mode", "float in_transition_to_fw", "float is_rotary_wing"],
    );

    let half_yaw = std::f32::consts::FRAC_PI_8;
    for i in 0..20u16 {
        let t = 1.0 + f64::from(i) * 0.5;
        let f = f32::from(i);
        w.sample(imu, us(t), &[f, 2.0, 9.81, 0.2, -0.1 * f, 0.4]);
        w.sample(att, us(t), &[half_yaw.cos(), 0.0, 0.0, half_yaw.sin()]);
        w.sample(
            local,
            us(t),
            &[f, 0.5 * f, 3.0, 4.0, 12.0, 1.0, 47.397_74, 8.545_59],
        );
        w.sample(
            global,
            us(t),
            &[47.397_74, 8.545_59 + 1e-5 * f, 1.0, 1.0, 0.0],
        );
        w.sample(status, us(t), &[(i % 8) as f32, 0.0]);
        // in transition from 3 s to 5 s, then back to hover at 8 s
        let in_transition = if (3.0..5.0).contains(&t) || (8.0..9.0).contains(&t) { 1.0 } else { 0.0 };
        let to_fw = if (3.0..8.0).contains(&t) { 1.0 } else { 0.0 };
        let rotary = if (5.0..8.0).contains(&t) { 0.0 } else { 1.0 };
        w.sample(vtol, us(t), &[in_transition, to_fw, rotary]);
    }
    w.log(b'6', us(2.0), "Takeoff detected");
    w.param_f32("MPC_XY_VEL_MAX", 8.0);
    w.dropout(120);
    w.finish()
}
