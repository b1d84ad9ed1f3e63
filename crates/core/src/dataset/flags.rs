//! Bitmask columns expanded to one 0/1 column per named bit.

pub const CONTROL_MODE_FLAGS: [&str; 24] = [
    "CS_TILT_ALIGN",
    "CS_YAW_ALIGN",
    "CS_GPS",
    "CS_OPT_FLOW",
    "CS_MAG_HDG",
    "CS_MAG_3D",
    "CS_MAG_DEC",
    "CS_IN_AIR",
    "CS_WIND",
    "CS_BARO_HGT",
    "CS_RNG_HGT",
    "CS_GPS_HGT",
    "CS_EV_POS",
    "CS_EV_YAW",
    "CS_EV_HGT",
    "CS_BETA",
    "CS_MAG_FIELD",
    "CS_FIXED_WING",
    "CS_MAG_FAULT",
    "CS_ASPD",
    "CS_GND_EFFECT",
    "CS_RNG_STUCK",
    "CS_GPS_YAW",
    "CS_MAG_ALIGNED",
];

pub const GPS_CHECK_FAIL_FLAGS: [&str; 10] = [
    "GPS_CHECK_FAIL_GPS_FIX",
    "GPS_CHECK_FAIL_MIN_SAT_COUNT",
    "GPS_CHECK_FAIL_MIN_GDOP",
    "GPS_CHECK_FAIL_MAX_HORZ_ERR",
    "GPS_CHECK_FAIL_MAX_VERT_ERR",
    "GPS_CHECK_FAIL_MAX_SPD_ERR",
    "GPS_CHECK_FAIL_MAX_HORZ_DRIFT",
    "GPS_CHECK_FAIL_MAX_VERT_DRIFT",
    "GPS_CHECK_FAIL_MAX_HORZ_SPD_ERR",
    "GPS_CHECK_FAIL_MAX_VERT_SPD_ERR",
];

/// Split `values` into `(name, bits)` pairs, bit `i` named `names[i]`.
/// Values are truncated to integers first; negative or non-finite values
/// read as 0.
pub fn expand<'n>(values: &[f64], names: &[&'n str]) -> Vec<(&'n str, Vec<f64>)> {
    let words: Vec<u64> = values
        .iter()
        .map(|&v| if v.is_finite() && v > 0.0 { v as u64 } else { 0 })
        .collect();
    names
        .iter()
        .enumerate()
        .map(|(bit, &name)| {
            let column = words
                .iter()
                .map(|w| if (w >> bit) & 1 == 1 { 1.0 } else { 0.0 })
                .collect();
            (name, column)
        })
        .collect()
}
