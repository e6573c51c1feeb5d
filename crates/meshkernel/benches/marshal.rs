//! Marshaling hot-path benchmarks against the in-process stub kernel.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use meshkernel::{GeometryList, MeshKernel, Polygon, Projection, Ring};
use meshkernel_sys::KernelLibrary;

fn circle_ring(n: usize, radius: f64) -> Ring {
    let points: Vec<(f64, f64)> = (0..n)
        .map(|i| {
            let angle = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
            (radius * angle.cos(), radius * angle.sin())
        })
        .collect();
    Ring::from_points(&points)
}

fn bench_polygon_flatten_split(c: &mut Criterion) {
    let kernel = MeshKernel::new(KernelLibrary::stub());
    let polygons: Vec<Polygon> = (0..16)
        .map(|i| Polygon {
            outer: circle_ring(64, 10.0 + i as f64),
            inner: vec![circle_ring(16, 1.0)],
        })
        .collect();

    c.bench_function("polygon_flatten", |b| {
        b.iter(|| GeometryList::from_polygons(black_box(&polygons), kernel.separators()))
    });

    let list = GeometryList::from_polygons(&polygons, kernel.separators());
    c.bench_function("polygon_split", |b| b.iter(|| black_box(&list).polygons()));
}

fn bench_boundary_round_trip(c: &mut Criterion) {
    let kernel = MeshKernel::new(KernelLibrary::stub());
    let state = kernel.scoped_state(Projection::Cartesian).unwrap();
    let separators = kernel.separators();

    let polygon = GeometryList::from_polygons(
        &[Polygon::simple(circle_ring(128, 100.0))],
        separators,
    );
    let points = GeometryList::from_coordinates(
        (0..512).map(|i| i as f64 % 200.0 - 100.0).collect(),
        (0..512).map(|i| (i * 7) as f64 % 200.0 - 100.0).collect(),
        separators,
    )
    .unwrap();

    c.bench_function("points_in_polygon_round_trip", |b| {
        b.iter(|| {
            kernel
                .points_in_polygon(state.handle(), black_box(&polygon), black_box(&points))
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_polygon_flatten_split, bench_boundary_round_trip);
criterion_main!(benches);
