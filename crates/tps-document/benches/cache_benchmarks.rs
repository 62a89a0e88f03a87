//! Benchmarks for per-frame cache lookups and history commits.
//!
//! Run with: cargo bench -p tps-document

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use nalgebra::Point3;
use tps_document::actions::{action_add_landmark, action_load_mesh, action_set_blend_factor_without_committing};
use tps_document::{TpsDocumentInputIdentifier, TpsResultCache, UndoableTpsDocument};
use tps_warp::{Mesh, shapes};

/// A document with `count` landmarks nudged outwards from a sphere.
fn document(count: usize, mesh: Mesh) -> UndoableTpsDocument {
    let mut doc = UndoableTpsDocument::default();
    action_load_mesh(&mut doc, TpsDocumentInputIdentifier::Source, mesh).unwrap();
    let golden = std::f64::consts::PI * (3.0 - 5f64.sqrt());
    for i in 0..count {
        let y = 1.0 - 2.0 * (i as f64 + 0.5) / count as f64;
        let r = (1.0 - y * y).sqrt();
        let theta = golden * i as f64;
        let source = Point3::new(r * theta.cos(), y, r * theta.sin());
        action_add_landmark(&mut doc, TpsDocumentInputIdentifier::Source, source);
        action_add_landmark(&mut doc, TpsDocumentInputIdentifier::Destination, source * 1.1);
    }
    doc
}

fn bench_lookup_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup_hit");

    for resolution in [16, 128] {
        let doc = document(32, shapes::uv_sphere(resolution, resolution));
        let mut cache = TpsResultCache::new();
        cache.lookup(doc.scratch());

        group.bench_with_input(BenchmarkId::from_parameter(resolution), &doc, |b, doc| {
            b.iter(|| black_box(cache.lookup(black_box(doc.scratch())).vertex_count()))
        });
    }

    group.finish();
}

fn bench_blend_drag(c: &mut Criterion) {
    let mut group = c.benchmark_group("blend_drag");

    for resolution in [16, 128] {
        let mut doc = document(32, shapes::uv_sphere(resolution, resolution));
        let mut cache = TpsResultCache::new();
        let mut step = 0u32;

        group.bench_function(BenchmarkId::from_parameter(resolution), |b| {
            b.iter(|| {
                step = step.wrapping_add(1);
                action_set_blend_factor_without_committing(&mut doc, f64::from(step % 100) / 100.0);
                black_box(cache.lookup(doc.scratch()).vertex_count())
            })
        });
    }

    group.finish();
}

fn bench_commit(c: &mut Criterion) {
    c.bench_function("commit_landmark", |b| {
        let mut doc = document(64, shapes::uv_sphere(64, 64));
        b.iter(|| action_add_landmark(&mut doc, TpsDocumentInputIdentifier::Source, black_box(Point3::origin())))
    });
}

criterion_group!(benches, bench_lookup_hit, bench_blend_drag, bench_commit);
criterion_main!(benches);
