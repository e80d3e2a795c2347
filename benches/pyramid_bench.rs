//! Pyramid construction and half-float upload conversion on scan-sized
//! volumes.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use volume_lod::VoxelField;
use volume_lod::pyramid::ResolutionPyramid;

/// Synthetic scan with a bright sphere in a noisy background.
fn phantom(dims: (usize, usize, usize)) -> VoxelField {
    let (nx, ny, nz) = dims;
    let center = [nx as f64 / 2.0, ny as f64 / 2.0, nz as f64 / 2.0];
    let radius = nx.min(ny).min(nz) as f64 / 3.0;
    let mut data = Vec::with_capacity(nx * ny * nz);
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                let d = ((x as f64 - center[0]).powi(2)
                    + (y as f64 - center[1]).powi(2)
                    + (z as f64 - center[2]).powi(2))
                .sqrt();
                let noise = ((x * 31 + y * 17 + z * 7) % 50) as u16;
                data.push(if d < radius { 1200 + noise } else { noise });
            }
        }
    }
    VoxelField::from_raw(dims, (1.0, 1.0, 1.0), data).unwrap()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("pyramid_build");
    group.sample_size(10);
    for dims in [(128, 128, 80), (240, 240, 155)] {
        let field = phantom(dims);
        let label = format!("{}x{}x{}", dims.0, dims.1, dims.2);
        group.bench_with_input(BenchmarkId::from_parameter(label), &field, |b, field| {
            b.iter(|| ResolutionPyramid::build(black_box(field.clone())));
        });
    }
    group.finish();
}

fn bench_half_float_upload(c: &mut Criterion) {
    let field = phantom((240, 240, 155));
    let range = field.scalar_range();
    let pyramid = ResolutionPyramid::build(field);

    c.bench_function("half_float_texels (quarter tier)", |b| {
        b.iter(|| black_box(pyramid.quarter.half_float_texels(range)));
    });
    c.bench_function("half_float_texels (full tier)", |b| {
        b.iter(|| black_box(pyramid.full.half_float_texels(range)));
    });
}

criterion_group!(benches, bench_build, bench_half_float_upload);
criterion_main!(benches);
