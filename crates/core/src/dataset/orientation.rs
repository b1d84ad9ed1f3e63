//! Quaternion to Euler angle decompositions.
//!
//! Quaternions are `[w, x, y, z]` (`q[0]` is the scalar part).

use nalgebra::{Quaternion, UnitQuaternion};

/// Euler angles in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Euler {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

/// Intrinsic yaw, roll, pitch (Z-X-Y) rotation order.
pub fn euler_312(q: [f64; 4]) -> Euler {
    let [q0, q1, q2, q3] = q;
    Euler {
        yaw: (-2.0 * (q1 * q2 - q0 * q3)).atan2(q0 * q0 - q1 * q1 + q2 * q2 - q3 * q3),
        roll: (2.0 * (q2 * q3 + q0 * q1)).clamp(-1.0, 1.0).asin(),
        pitch: (-2.0 * (q1 * q3 - q0 * q2)).atan2(q0 * q0 - q1 * q1 - q2 * q2 + q3 * q3),
    }
}

/// Yaw, pitch, roll (Z-Y-X) rotation order. The quaternion is normalized
/// first.
pub fn euler_321(q: [f64; 4]) -> Euler {
    let [w, x, y, z] = q;
    let (roll, pitch, yaw) = UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z)).euler_angles();
    Euler { roll, pitch, yaw }
}

/// Apply a decomposition row by row over four quaternion columns.
pub fn decompose(columns: [&[f64]; 4], f: fn([f64; 4]) -> Euler) -> Vec<Euler> {
    let [a, b, c, d] = columns;
    a.iter()
        .zip(b)
        .zip(c)
        .zip(d)
        .map(|(((&q0, &q1), &q2), &q3)| f([q0, q1, q2, q3]))
        .collect()
}
