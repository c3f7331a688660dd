//! Haptic core benchmarks (criterion - wall-clock time).
//!
//! Run all:    cargo bench --manifest-path benchmarks/Cargo.toml --bench haptics
//! Filter:     cargo bench --manifest-path benchmarks/Cargo.toml --bench haptics -- contacts

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;
use rein_haptics::haptics::depth::{sphere_box_depths, sphere_sphere};
use rein_haptics::{haptic_contact_system, spawn_haptic_scene, ContactTracker, ForceAccumulator};
use rein_haptics_bench::*;

// ---------------------------------------------------------------------------
// Contact depth
// ---------------------------------------------------------------------------

fn bench_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("depth");
    group.bench_function("sphere_sphere", |b| {
        b.iter(|| sphere_sphere(Vec3::new(1.2, 0.1, 0.0), 0.5, Vec3::ZERO, 1.0));
    });
    group.bench_function("sphere_box", |b| {
        b.iter(|| sphere_box_depths(Vec3::new(1.2, 0.1, 0.0), 0.5, Vec3::ZERO, Vec3::ONE));
    });
    group.finish();
}

// ---------------------------------------------------------------------------
// Contact update
// ---------------------------------------------------------------------------

fn bench_contacts(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("contacts/row");
        for &n in &[1, 16, 128, 1024] {
            let shapes = shape_row(n);
            let probe = touching_probe();
            let mut tracker = ContactTracker::new(shapes.len());
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
                b.iter(|| tracker.update_contacts(&probe, &shapes).len());
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("contacts/cluster");
        for &n in &[9, 27, 81] {
            let (shapes, probe) = cluster(n);
            let mut tracker = ContactTracker::new(shapes.len());
            let mut accumulator = ForceAccumulator::new();
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
                b.iter(|| {
                    accumulator.add_contacts(tracker.update_contacts(&probe, &shapes));
                    accumulator.take()
                });
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("contacts/ecs_row");
        for &n in &[16, 128, 1024] {
            let mut world = hecs::World::new();
            spawn_haptic_scene(&mut world, shape_row(n));
            let probe = touching_probe();
            let mut accumulator = ForceAccumulator::new();
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
                b.iter(|| {
                    haptic_contact_system(&mut world, &probe, &mut accumulator);
                    accumulator.take()
                });
            });
        }
        group.finish();
    }
}

// ---------------------------------------------------------------------------
// Controller tick
// ---------------------------------------------------------------------------

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("controller/tick");
    for &n in &[2, 64] {
        let Some(mut controller) = controller(shape_row(n)) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let report = controller.tick(0.004);
                controller.link_mut().sent.clear();
                report
            });
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

criterion_group!(benches, bench_depth, bench_contacts, bench_tick);
criterion_main!(benches);
