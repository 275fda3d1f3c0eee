//! Benchmarks for DEM conditioning and mask vectorization

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use floodscope_algorithms::hydrology::{
    condition_dem, fill_sinks, flow_accumulation, flow_direction, priority_flood,
    ConditioningParams, FillSinksParams, PriorityFloodParams,
};
use floodscope_algorithms::vector::{polygonize, PolygonizeParams};
use floodscope_core::{GeoTransform, Mask, Raster};

/// Create a DEM with a basin shape: higher edges sloping toward center outlet
fn create_basin_dem(size: usize) -> Raster<f64> {
    let mut dem = Raster::new(size, size);
    dem.set_transform(GeoTransform::new(0.0, size as f64, 1.0, -1.0));
    let center = size as f64 / 2.0;
    for row in 0..size {
        for col in 0..size {
            let dx = col as f64 - center;
            let dy = row as f64 - center;
            let dist = (dx * dx + dy * dy).sqrt();
            // Bowl shape + small noise to avoid flat areas
            let noise = ((row * 7 + col * 13) % 17) as f64 * 0.01;
            dem.set(row, col, dist + noise).unwrap();
        }
    }
    dem
}

/// Blotchy water mask with many regions and holes
fn create_water_mask(size: usize) -> Mask {
    let mut mask = Mask::new(size, size);
    mask.set_transform(GeoTransform::new(0.0, size as f64, 1.0, -1.0));
    for row in 0..size {
        for col in 0..size {
            let v = ((row / 3) * 31 + (col / 4) * 17) % 7;
            mask.set(row, col, u8::from(v < 3)).unwrap();
        }
    }
    mask
}

fn bench_priority_flood(c: &mut Criterion) {
    let mut group = c.benchmark_group("hydrology/priority_flood");
    for size in [128, 256, 512, 1024] {
        let dem = create_basin_dem(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| priority_flood(black_box(&dem), PriorityFloodParams::default()).unwrap())
        });
    }
    group.finish();
}

fn bench_fill_sinks(c: &mut Criterion) {
    let mut group = c.benchmark_group("hydrology/fill_sinks");
    for size in [128, 256] {
        let dem = create_basin_dem(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                fill_sinks(
                    black_box(&dem),
                    FillSinksParams { min_slope: 0.01, max_iterations: 10_000 },
                )
                .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_flow_direction(c: &mut Criterion) {
    let mut group = c.benchmark_group("hydrology/flow_direction");
    for size in [256, 512, 1024, 2048] {
        let dem = create_basin_dem(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| flow_direction(black_box(&dem)).unwrap())
        });
    }
    group.finish();
}

fn bench_flow_accumulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("hydrology/flow_accumulation");
    for size in [256, 512, 1024, 2048] {
        let dem = create_basin_dem(size);
        let fdir = flow_direction(&dem).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| flow_accumulation(black_box(&fdir)).unwrap())
        });
    }
    group.finish();
}

fn bench_condition_dem(c: &mut Criterion) {
    let mut group = c.benchmark_group("hydrology/condition_dem");
    for size in [256, 512, 1024] {
        let dem = create_basin_dem(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| condition_dem(black_box(&dem), &ConditioningParams::default()).unwrap())
        });
    }
    group.finish();
}

fn bench_polygonize(c: &mut Criterion) {
    let mut group = c.benchmark_group("vector/polygonize");
    for size in [256, 512, 1024] {
        let mask = create_water_mask(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| polygonize(black_box(&mask), &PolygonizeParams { min_pixels: 1 }).unwrap())
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_priority_flood,
    bench_fill_sinks,
    bench_flow_direction,
    bench_flow_accumulation,
    bench_condition_dem,
    bench_polygonize,
);
criterion_main!(benches);
