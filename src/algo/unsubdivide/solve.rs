//! Inverse-subdivision position solver.
//!
//! Each original vertex gets its coarse position back from the positions of
//! its subdivided neighbourhood. Every stencil reads the current (subdivided)
//! positions; only the valence-3 rule also reads positions solved earlier.

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use super::classify::{Classification, VertexSnapshot};
use super::ReconstructOptions;
use crate::mesh::{HalfEdgeMesh, MeshIndex, VertexId};

/// Output of [`solve_positions`].
#[derive(Debug, Clone, Default)]
pub struct SolvedPositions<I: MeshIndex = u32> {
    /// New positions in ascending vertex order.
    pub updates: Vec<(VertexId<I>, Point3<f64>)>,
    /// Interior valence-3 vertices left at their current position.
    pub unresolved: Vec<VertexId<I>>,
    /// Boundary vertices without exactly two boundary neighbours.
    pub skipped_boundary: Vec<VertexId<I>>,
    /// Two-neighbour boundary corners held fixed.
    pub kept_corners: usize,
}

impl<I: MeshIndex> SolvedPositions<I> {
    /// Number of vertices that received a new position.
    pub fn resolved(&self) -> usize {
        self.updates.len()
    }
}

/// Compute coarse positions for every classified vertex.
///
/// Phases run in a fixed order:
///
/// 1. Boundary vertices: `2p - e0/2 - e1/2` over the two boundary
///    neighbours. With `sharp_corners`, valence-2 corners stay put.
/// 2. Interior vertices of valence `n >= 4`:
///    `A*p + B*sum(E) + C*sum(F)` with `A = n/(n-3)`, `B = -4/(n(n-3))`,
///    `C = 1/(n(n-3))`, summing direct neighbours `E` and diagonal
///    vertices `F`.
/// 3. Interior vertices of valence 3 from an already solved interior
///    neighbour two hops away: `4*e - w' - f0 - f1`. Unresolved vertices are
///    retried for up to `valence3_passes` passes.
///
/// Nothing is written to the mesh.
pub fn solve_positions<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    classes: &Classification<I>,
    options: &ReconstructOptions,
) -> SolvedPositions<I> {
    let mut solved: Vec<Option<Point3<f64>>> = vec![None; mesh.num_vertices()];
    let mut out = SolvedPositions {
        updates: Vec::new(),
        unresolved: Vec::new(),
        skipped_boundary: Vec::new(),
        kept_corners: 0,
    };

    // Phase 1
    for (v, snapshot) in classes.iter().filter(|(v, _)| classes.is_boundary(*v)) {
        if options.sharp_corners && snapshot.valence() == 2 {
            out.kept_corners += 1;
            continue;
        }
        let rim: Vec<_> = snapshot
            .connected_ids()
            .filter(|&w| classes.is_boundary(w))
            .collect();
        let [e0, e1] = rim[..] else {
            log::warn!(
                "boundary vertex {:?} has {} boundary neighbours, leaving it in place",
                v,
                rim.len()
            );
            out.skipped_boundary.push(v);
            continue;
        };
        let p = mesh.position(v).coords;
        let e0 = mesh.position(e0).coords;
        let e1 = mesh.position(e1).coords;
        solved[v.index()] = Some(Point3::from(-(e0 * 0.5) + p * 2.0 - e1 * 0.5));
    }

    // Phase 2
    let regular: Vec<_> = classes
        .iter()
        .filter(|(v, s)| !classes.is_boundary(*v) && s.valence() >= 4)
        .collect();
    let stencil = |(v, snapshot): &(VertexId<I>, &VertexSnapshot<I>)| {
        let n = snapshot.valence() as f64;
        let a = n / (n - 3.0);
        let b = -4.0 / (n * (n - 3.0));
        let c = 1.0 / (n * (n - 3.0));
        let sum_e = snapshot
            .connected_ids()
            .fold(Vector3::<f64>::zeros(), |acc, w| acc + mesh.position(w).coords);
        let sum_f = snapshot
            .diagonal
            .iter()
            .fold(Vector3::<f64>::zeros(), |acc, &f| acc + mesh.position(f).coords);
        (*v, Point3::from(mesh.position(*v).coords * a + sum_e * b + sum_f * c))
    };
    let interior: Vec<(VertexId<I>, Point3<f64>)> = if options.parallel {
        regular.par_iter().map(stencil).collect()
    } else {
        regular.iter().map(stencil).collect()
    };
    for (v, p) in interior {
        solved[v.index()] = Some(p);
    }

    // Phase 3
    let mut queue: Vec<VertexId<I>> = classes
        .iter()
        .filter(|(v, s)| !classes.is_boundary(*v) && s.valence() == 3)
        .map(|(v, _)| v)
        .collect();
    for pass in 0..options.valence3_passes {
        if queue.is_empty() {
            break;
        }
        let before = queue.len();
        let mut deferred = Vec::new();
        for v in queue {
            match solve_valence3(mesh, classes, &solved, v) {
                Some(p) => solved[v.index()] = Some(p),
                None => deferred.push(v),
            }
        }
        log::debug!(
            "valence-3 pass {}: {} resolved, {} deferred",
            pass + 1,
            before - deferred.len(),
            deferred.len()
        );
        queue = deferred;
        if queue.len() == before {
            break;
        }
    }
    for &v in &queue {
        log::debug!("valence-3 vertex {:?} unresolved, keeping its position", v);
    }
    out.unresolved = queue;

    out.updates = solved
        .into_iter()
        .enumerate()
        .filter_map(|(i, p)| p.map(|p| (VertexId::new(i), p)))
        .collect();
    out
}

/// Valence-3 rule for one vertex, or `None` if no neighbour qualifies yet.
///
/// Walks direct neighbours `e` in ascending order. `e` qualifies when its
/// ring, minus the diagonal set and `v`, is exactly one vertex `w` that is
/// interior and already solved, and the ring meets the diagonal set in
/// exactly two face points.
fn solve_valence3<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    classes: &Classification<I>,
    solved: &[Option<Point3<f64>>],
    v: VertexId<I>,
) -> Option<Point3<f64>> {
    let snapshot = classes.snapshot(v)?;
    for (e, ring) in &snapshot.connected {
        let mut across = ring.iter().filter(|&&x| x != v && !snapshot.is_diagonal(x));
        let (Some(&w), None) = (across.next(), across.next()) else {
            continue;
        };
        if classes.is_boundary(w) {
            continue;
        }
        let Some(w_new) = solved.get(w.index()).copied().flatten() else {
            continue;
        };
        let faces: Vec<_> = ring.iter().filter(|&&x| snapshot.is_diagonal(x)).collect();
        let [&f0, &f1] = faces[..] else {
            continue;
        };
        let e = mesh.position(*e).coords;
        let f0 = mesh.position(f0).coords;
        let f1 = mesh.position(f1).coords;
        return Some(Point3::from(e * 4.0 - w_new.coords - f1 - f0));
    }
    None
}
