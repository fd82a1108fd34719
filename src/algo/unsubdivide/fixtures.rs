//! Test meshes, including an exact forward Catmull-Clark step.
//!
//! The subdivision keeps valence-2 corners fixed, uses midpoints on boundary
//! edges and `3/4 v + 1/8 (l + r)` on boundary vertices. New vertices are
//! laid out as updated originals, then face points, then edge points, so an
//! original vertex keeps its index.

use std::collections::BTreeMap;

use nalgebra::{Point3, Vector3};

use crate::mesh::{build_from_quads, HalfEdgeMesh};

pub type Quads = (Vec<Point3<f64>>, Vec<[usize; 4]>);

pub fn mesh((vertices, faces): Quads) -> HalfEdgeMesh {
    build_from_quads(&vertices, &faces).unwrap()
}

/// `nx` by `ny` quads with a deterministic height field.
pub fn bumpy_grid(nx: usize, ny: usize) -> Quads {
    grid(nx, ny, |i, j| ((i * 3 + j * 5) % 7) as f64 * 0.1)
}

/// `nx` by `ny` flat unit quads, not subdivided.
pub fn planar_grid(nx: usize, ny: usize) -> HalfEdgeMesh {
    mesh(grid(nx, ny, |_, _| 0.0))
}

pub fn subdivided_grid(nx: usize, ny: usize) -> HalfEdgeMesh {
    mesh(subdivide(bumpy_grid(nx, ny)))
}

pub fn cube() -> Quads {
    let vertices = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(1.0, 1.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(1.0, 0.0, 1.0),
        Point3::new(1.0, 1.0, 1.0),
        Point3::new(0.0, 1.0, 1.0),
    ];
    let faces = vec![
        [0, 3, 2, 1],
        [4, 5, 6, 7],
        [0, 1, 5, 4],
        [2, 3, 7, 6],
        [0, 4, 7, 3],
        [1, 2, 6, 5],
    ];
    (vertices, faces)
}

pub fn subdivided_cube_arrays() -> Quads {
    subdivide(cube())
}

pub fn subdivided_cube() -> HalfEdgeMesh {
    mesh(subdivided_cube_arrays())
}

pub fn subdivided_cube_twice() -> HalfEdgeMesh {
    mesh(subdivide(subdivided_cube_arrays()))
}

/// Closed torus of `nu * nv` quads; every vertex has valence 4.
pub fn torus_mesh(nu: usize, nv: usize) -> HalfEdgeMesh {
    let mut vertices = Vec::with_capacity(nu * nv);
    for j in 0..nv {
        let phi = j as f64 / nv as f64 * std::f64::consts::TAU;
        for i in 0..nu {
            let theta = i as f64 / nu as f64 * std::f64::consts::TAU;
            let ring = 2.0 + phi.cos();
            vertices.push(Point3::new(ring * theta.cos(), ring * theta.sin(), phi.sin()));
        }
    }
    let at = |i: usize, j: usize| (j % nv) * nu + (i % nu);
    let mut faces = Vec::with_capacity(nu * nv);
    for j in 0..nv {
        for i in 0..nu {
            faces.push([at(i, j), at(i + 1, j), at(i + 1, j + 1), at(i, j + 1)]);
        }
    }
    mesh((vertices, faces))
}

fn grid(nx: usize, ny: usize, height: impl Fn(usize, usize) -> f64) -> Quads {
    let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        for i in 0..=nx {
            vertices.push(Point3::new(i as f64, j as f64, height(i, j)));
        }
    }
    let row = nx + 1;
    let mut faces = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let v = j * row + i;
            faces.push([v, v + 1, v + row + 1, v + row]);
        }
    }
    (vertices, faces)
}

/// One step of Catmull-Clark subdivision.
pub fn subdivide((vertices, faces): Quads) -> Quads {
    let n = vertices.len();
    let face_points: Vec<Point3<f64>> = faces
        .iter()
        .map(|f| Point3::from(f.iter().map(|&v| vertices[v].coords).sum::<Vector3<f64>>() / 4.0))
        .collect();

    // (lo, hi) -> (edge point slot, adjacent faces)
    let mut edges: BTreeMap<(usize, usize), (usize, Vec<usize>)> = BTreeMap::new();
    for (fi, face) in faces.iter().enumerate() {
        for k in 0..4 {
            let (a, b) = (face[k], face[(k + 1) % 4]);
            let key = (a.min(b), a.max(b));
            let slot = edges.len();
            edges.entry(key).or_insert_with(|| (slot, Vec::new())).1.push(fi);
        }
    }

    let mut edge_points = vec![Point3::origin(); edges.len()];
    let mut vertex_faces: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut vertex_edges: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut rim: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (&(a, b), (slot, adjacent)) in &edges {
        let mid = (vertices[a].coords + vertices[b].coords) * 0.5;
        edge_points[*slot] = match adjacent[..] {
            [f0, f1] => Point3::from(
                (vertices[a].coords
                    + vertices[b].coords
                    + face_points[f0].coords
                    + face_points[f1].coords)
                    / 4.0,
            ),
            _ => {
                rim[a].push(b);
                rim[b].push(a);
                Point3::from(mid)
            }
        };
        vertex_edges[a].push(b);
        vertex_edges[b].push(a);
    }
    for (fi, face) in faces.iter().enumerate() {
        for &v in face {
            vertex_faces[v].push(fi);
        }
    }

    let updated: Vec<Point3<f64>> = (0..n)
        .map(|v| {
            let s = vertices[v].coords;
            if !rim[v].is_empty() {
                return if vertex_edges[v].len() == 2 {
                    vertices[v]
                } else {
                    let (l, r) = (vertices[rim[v][0]].coords, vertices[rim[v][1]].coords);
                    Point3::from(s * 0.75 + (l + r) * 0.125)
                };
            }
            let valence = vertex_edges[v].len() as f64;
            let q = vertex_faces[v]
                .iter()
                .map(|&f| face_points[f].coords)
                .sum::<Vector3<f64>>()
                / vertex_faces[v].len() as f64;
            let r = vertex_edges[v]
                .iter()
                .map(|&w| (s + vertices[w].coords) * 0.5)
                .sum::<Vector3<f64>>()
                / valence;
            Point3::from((q + r * 2.0 + s * (valence - 3.0)) / valence)
        })
        .collect();

    let fp = |fi: usize| n + fi;
    let ep = |a: usize, b: usize| n + faces.len() + edges[&(a.min(b), a.max(b))].0;

    let mut out_vertices = updated;
    out_vertices.extend(face_points.iter().copied());
    out_vertices.extend(edge_points);

    let mut out_faces = Vec::with_capacity(faces.len() * 4);
    for (fi, f) in faces.iter().enumerate() {
        for k in 0..4 {
            let v = f[k];
            let next = f[(k + 1) % 4];
            let prev = f[(k + 3) % 4];
            out_faces.push([v, ep(v, next), fp(fi), ep(prev, v)]);
        }
    }
    (out_vertices, out_faces)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdivided_counts() {
        let (v, f) = subdivided_cube_arrays();
        assert_eq!((v.len(), f.len()), (26, 24));
        let (v, f) = subdivide(bumpy_grid(3, 3));
        assert_eq!((v.len(), f.len()), (16 + 9 + 24, 36));
    }
}
