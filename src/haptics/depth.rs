//! Penetration depth and contact normal for sphere–sphere and sphere–box.
//!
//! All normals point from the shape toward the probe, so a positive depth
//! along the normal pushes the probe out of the shape.

use glam::Vec3;

use super::shape::{Axis, Probe, ShapeGeometry};

/// Below this length a direction is treated as undefined.
const DEGENERATE_EPSILON: f32 = 1e-6;

/// Penetration of the probe into a shape along a contact normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    /// Signed depth, positive when penetrating.
    pub depth: f32,
    /// Outward unit normal, or zero when the direction is undefined.
    pub normal: Vec3,
}

impl Penetration {
    pub const NONE: Self = Self {
        depth: 0.0,
        normal: Vec3::ZERO,
    };

    /// True when the penetration can produce a force.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.depth > 0.0 && self.normal != Vec3::ZERO
    }
}

/// `sign` with `sign(0) = 1`, so a probe exactly on a center plane resolves
/// to the positive side.
#[inline]
fn sign(x: f32) -> f32 {
    if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Sphere–sphere depth: `r_probe + r_shape - |probe - center|`.
///
/// Coincident centers yield a zero normal.
#[inline]
pub fn sphere_sphere(
    probe_center: Vec3,
    probe_radius: f32,
    center: Vec3,
    radius: f32,
) -> Penetration {
    let diff = probe_center - center;
    let dist = diff.length();
    let depth = probe_radius + radius - dist;
    let normal = if dist > DEGENERATE_EPSILON {
        diff / dist
    } else {
        Vec3::ZERO
    };
    Penetration { depth, normal }
}

/// Per-axis signed penetration of a probe sphere into an axis-aligned box.
///
/// `depth_i = sign(d_i) * (h_i + r_eff) - d_i` where `d` is the offset of the
/// probe from the box center and `r_eff = min(probe_radius, |d|)`. Clamping
/// the radius keeps the depths bounded when the probe nears the center.
#[inline]
pub fn sphere_box_depths(
    probe_center: Vec3,
    probe_radius: f32,
    box_center: Vec3,
    half_extents: Vec3,
) -> Vec3 {
    let dist_from_center = probe_center - box_center;
    let effective_radius = probe_radius.min(dist_from_center.length());

    let mut depth = Vec3::ZERO;
    for i in 0..3 {
        let d = dist_from_center[i];
        depth[i] = sign(d) * (half_extents[i] + effective_radius) - d;
    }
    depth
}

/// Sphere–AABB overlap: distance from the probe center to the closest point
/// of the box is below the probe radius. A center inside the box overlaps.
#[inline]
pub fn sphere_box_overlap(
    probe_center: Vec3,
    probe_radius: f32,
    box_center: Vec3,
    half_extents: Vec3,
) -> bool {
    let local = probe_center - box_center;
    let closest = local.clamp(-half_extents, half_extents);
    (local - closest).length_squared() < probe_radius * probe_radius
        || local.abs().cmple(half_extents).all()
}

/// Axis of the face closest to the probe: minimum `|depth_i|`, lowest axis
/// on ties.
#[inline]
pub fn select_entry_axis(depths: Vec3) -> Axis {
    let mut best = Axis::X;
    let mut min_depth = depths.x.abs();
    for axis in [Axis::Y, Axis::Z] {
        let d = depths[axis.index()].abs();
        if d < min_depth {
            min_depth = d;
            best = axis;
        }
    }
    best
}

/// Sphere–box penetration restricted to one axis.
///
/// The normal sign follows the side of the center the probe is on this tick;
/// the axis itself is supplied by the caller.
#[inline]
pub fn sphere_box_along_axis(
    probe_center: Vec3,
    probe_radius: f32,
    box_center: Vec3,
    half_extents: Vec3,
    axis: Axis,
) -> Penetration {
    let depths = sphere_box_depths(probe_center, probe_radius, box_center, half_extents);
    let i = axis.index();
    let side = sign(probe_center[i] - box_center[i]);
    Penetration {
        depth: side * depths[i],
        normal: side * axis.unit(),
    }
}

/// Overlap test between the probe and a shape.
pub fn overlaps(geometry: &ShapeGeometry, probe: &Probe) -> bool {
    match geometry {
        ShapeGeometry::Sphere { center, radius } => {
            sphere_sphere(probe.position, probe.radius, *center, *radius).depth > 0.0
        }
        ShapeGeometry::Box {
            center,
            half_extents,
        } => sphere_box_overlap(probe.position, probe.radius, *center, *half_extents),
    }
}

/// Depth and outward normal of the probe against a shape.
///
/// For boxes, `entered_axis` is the frozen entry axis; when `None` the
/// closest face axis is chosen from the current geometry.
pub fn compute_contact(
    geometry: &ShapeGeometry,
    probe: &Probe,
    entered_axis: Option<Axis>,
) -> Penetration {
    match geometry {
        ShapeGeometry::Sphere { center, radius } => {
            sphere_sphere(probe.position, probe.radius, *center, *radius)
        }
        ShapeGeometry::Box {
            center,
            half_extents,
        } => {
            let axis = entered_axis.unwrap_or_else(|| {
                select_entry_axis(sphere_box_depths(
                    probe.position,
                    probe.radius,
                    *center,
                    *half_extents,
                ))
            });
            sphere_box_along_axis(probe.position, probe.radius, *center, *half_extents, axis)
        }
    }
}
