//! Scene builders shared by the benchmarks.

use glam::Vec3;
use rein_haptics::{
    FrameTransform, HapticController, HapticShape, Probe, RecordingLink, SafetyConfig,
    TelemetryConfig,
};

/// `n` shapes on a line along x, alternating spheres and boxes, spaced 3
/// units apart.
pub fn shape_row(n: usize) -> Vec<HapticShape> {
    (0..n)
        .filter_map(|i| {
            let center = Vec3::new(i as f32 * 3.0, 0.0, 0.0);
            if i % 2 == 0 {
                HapticShape::sphere(center, 1.0).ok()
            } else {
                HapticShape::cuboid(center, Vec3::ONE).ok()
            }
        })
        .collect()
}

/// A probe touching the first shape of [`shape_row`].
pub fn touching_probe() -> Probe {
    Probe {
        position: Vec3::new(1.2, 0.1, 0.0),
        velocity: Vec3::new(-0.5, 0.0, 0.0),
        radius: 0.5,
    }
}

/// A probe overlapping every shape of a dense cluster.
pub fn cluster(n: usize) -> (Vec<HapticShape>, Probe) {
    let shapes = (0..n)
        .filter_map(|i| {
            let offset = Vec3::new((i % 3) as f32, ((i / 3) % 3) as f32, (i / 9) as f32) * 0.1;
            HapticShape::cuboid(offset, Vec3::splat(0.5)).ok()
        })
        .collect();
    (shapes, Probe::at(Vec3::splat(0.1), 0.5))
}

/// Controller over a recording link with the probe resting in the first
/// shape.
pub fn controller(shapes: Vec<HapticShape>) -> Option<HapticController<RecordingLink>> {
    let link = RecordingLink::with_telemetry(Vec3::new(1.2, 0.1, 0.0), Vec3::ZERO);
    HapticController::new(
        link,
        shapes,
        FrameTransform::identity(),
        TelemetryConfig::default(),
        SafetyConfig::default(),
    )
    .ok()
}
