//! PD (spring-damper) force law along the contact normal.

use glam::Vec3;

use super::depth::Penetration;
use super::shape::PdGains;

/// `kp * d * n - kd * dot(v, n) * n`.
///
/// `velocity` is the probe velocity relative to the shape. Both terms act
/// only along `n`. Returns zero when the penetration is inactive (`d <= 0` or
/// an undefined normal).
#[inline]
pub fn pd_force(penetration: Penetration, velocity: Vec3, gains: PdGains) -> Vec3 {
    if !penetration.is_active() {
        return Vec3::ZERO;
    }
    let n = penetration.normal;
    let spring = gains.kp * penetration.depth;
    let damper = gains.kd * velocity.dot(n);
    (spring - damper) * n
}
