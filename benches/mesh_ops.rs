//! Benchmarks for reconstruction stages.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use nalgebra::Point3;
use unsubdiv::algo::unsubdivide::{classify, select_seed, solve_positions};
use unsubdiv::prelude::*;

/// A quad grid with `n` (even) cells per side, topologically one
/// subdivision of an `n/2` grid.
fn create_grid_mesh(n: usize) -> HalfEdgeMesh {
    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    let mut faces = Vec::with_capacity(n * n);

    for j in 0..=n {
        for i in 0..=n {
            let z = ((i as f64) * 0.3).sin() * ((j as f64) * 0.2).cos();
            vertices.push(Point3::new(i as f64, j as f64, z));
        }
    }

    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            let v10 = v00 + 1;
            let v01 = v00 + (n + 1);
            let v11 = v01 + 1;
            faces.push([v00, v10, v11, v01]);
        }
    }

    build_from_quads(&vertices, &faces).unwrap()
}

fn bench_mesh_construction(c: &mut Criterion) {
    c.bench_function("build_quad_grid_100x100", |b| {
        let mesh = create_grid_mesh(100);
        let (vertices, faces) = to_face_vertex_polygons(&mesh);
        b.iter(|| {
            let mesh: HalfEdgeMesh = build_from_polygons(&vertices, &faces).unwrap();
            mesh
        });
    });
}

fn bench_stages(c: &mut Criterion) {
    let mesh = create_grid_mesh(200);
    let seed = select_seed(&mesh).vertex;

    c.bench_function("classify_200x200", |b| {
        b.iter(|| classify(&mesh, seed, &Progress::none()))
    });

    let classes = classify(&mesh, seed, &Progress::none());
    let parallel = ReconstructOptions::default();
    let sequential = ReconstructOptions::default().sequential();

    c.bench_function("solve_200x200_parallel", |b| {
        b.iter(|| solve_positions(&mesh, &classes, &parallel))
    });
    c.bench_function("solve_200x200_sequential", |b| {
        b.iter(|| solve_positions(&mesh, &classes, &sequential))
    });
}

fn bench_reconstruct(c: &mut Criterion) {
    let mesh = create_grid_mesh(200);
    let options = ReconstructOptions::default();

    c.bench_function("reconstruct_200x200", |b| {
        b.iter_batched(
            || mesh.clone(),
            |mut m| reconstruct(&mut m, &options).unwrap(),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_mesh_construction, bench_stages, bench_reconstruct);
criterion_main!(benches);
