//! Original-vertex classification.
//!
//! One Catmull-Clark step puts an inserted point between any two original
//! vertices, so originals reach each other only in two hops. The classifier
//! walks the mesh in such two-hop rounds starting at a seed, never stepping
//! onto the face points diagonally across a face.

use std::collections::BTreeSet;

use crate::algo::Progress;
use crate::mesh::{HalfEdgeMesh, MeshIndex, VertexId};

/// Neighbourhood of one original vertex, recorded before any mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexSnapshot<I: MeshIndex = u32> {
    /// Each direct neighbour paired with that neighbour's own direct
    /// neighbours. Both levels sorted ascending.
    pub connected: Vec<(VertexId<I>, Vec<VertexId<I>>)>,
    /// Vertices across an incident face that are not direct neighbours,
    /// sorted ascending.
    pub diagonal: Vec<VertexId<I>>,
}

impl<I: MeshIndex> VertexSnapshot<I> {
    /// Number of direct neighbours.
    pub fn valence(&self) -> usize {
        self.connected.len()
    }

    /// Direct neighbours in ascending order.
    pub fn connected_ids(&self) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.connected.iter().map(|(v, _)| *v)
    }

    /// The recorded neighbours of direct neighbour `v`.
    pub fn ring(&self, v: VertexId<I>) -> Option<&[VertexId<I>]> {
        self.connected
            .binary_search_by_key(&v, |(w, _)| *w)
            .ok()
            .map(|i| self.connected[i].1.as_slice())
    }

    /// Whether `v` is one of the diagonal vertices.
    pub fn is_diagonal(&self, v: VertexId<I>) -> bool {
        self.diagonal.binary_search(&v).is_ok()
    }
}

/// Result of classifying one connected shell.
///
/// Snapshots live in an arena indexed by vertex index. Boundary flags cover
/// every vertex that was inspected: classified vertices and all of their
/// direct neighbours.
#[derive(Debug, Clone)]
pub struct Classification<I: MeshIndex = u32> {
    snapshots: Vec<Option<VertexSnapshot<I>>>,
    boundary: Vec<bool>,
    order: Vec<VertexId<I>>,
}

impl<I: MeshIndex> Classification<I> {
    fn with_vertex_count(n: usize) -> Self {
        Self {
            snapshots: vec![None; n],
            boundary: vec![false; n],
            order: Vec::new(),
        }
    }

    /// Whether `v` was classified as an original vertex.
    pub fn contains(&self, v: VertexId<I>) -> bool {
        self.snapshot(v).is_some()
    }

    /// Snapshot of a classified vertex.
    pub fn snapshot(&self, v: VertexId<I>) -> Option<&VertexSnapshot<I>> {
        self.snapshots.get(v.index()).and_then(Option::as_ref)
    }

    /// Whether `v` was inspected and found on the mesh boundary.
    pub fn is_boundary(&self, v: VertexId<I>) -> bool {
        self.boundary.get(v.index()).copied().unwrap_or(false)
    }

    /// Classified vertices in ascending index order.
    pub fn vertices(&self) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.snapshots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| VertexId::new(i))
    }

    /// Classified vertices with their snapshots, ascending.
    pub fn iter(&self) -> impl Iterator<Item = (VertexId<I>, &VertexSnapshot<I>)> + '_ {
        self.snapshots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (VertexId::new(i), s)))
    }

    /// Classified vertices in the order the traversal reached them.
    pub fn order(&self) -> &[VertexId<I>] {
        &self.order
    }

    /// Number of classified vertices.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing was classified.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Classified vertices lying on the boundary.
    pub fn num_boundary(&self) -> usize {
        self.vertices().filter(|&v| self.is_boundary(v)).count()
    }

    /// Sorted union of all diagonal sets: the inserted face points.
    pub fn diagonal_vertices(&self) -> Vec<VertexId<I>> {
        let set: BTreeSet<VertexId<I>> = self
            .iter()
            .flat_map(|(_, s)| s.diagonal.iter().copied())
            .collect();
        set.into_iter().collect()
    }
}

/// Classify the original vertices reachable from `seed`.
///
/// Covers exactly the connected component containing `seed`. Progress is
/// reported once per classified vertex against an estimate of a quarter of
/// the vertex count.
///
/// # Example
///
/// ```
/// use unsubdiv::algo::Progress;
/// use unsubdiv::algo::unsubdivide::{classify, select_seed};
/// use unsubdiv::mesh::{build_from_quads, HalfEdgeMesh};
/// use nalgebra::Point3;
///
/// // One quad subdivided once: 4 corners, 4 edge points, 1 face point.
/// let p = |x: f64, y: f64| Point3::new(x, y, 0.0);
/// let vertices = vec![
///     p(0.0, 0.0), p(2.0, 0.0), p(2.0, 2.0), p(0.0, 2.0),
///     p(1.0, 1.0),
///     p(1.0, 0.0), p(2.0, 1.0), p(1.0, 2.0), p(0.0, 1.0),
/// ];
/// let faces = vec![[0, 5, 4, 8], [1, 6, 4, 5], [2, 7, 4, 6], [3, 8, 4, 7]];
/// let mesh: HalfEdgeMesh = build_from_quads(&vertices, &faces).unwrap();
///
/// let seed = select_seed(&mesh);
/// let classes = classify(&mesh, seed.vertex, &Progress::none());
/// let originals: Vec<usize> = classes.vertices().map(|v| v.index()).collect();
/// assert_eq!(originals, vec![0, 1, 2, 3]);
/// ```
pub fn classify<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    seed: VertexId<I>,
    progress: &Progress,
) -> Classification<I> {
    classify_in_range(mesh, seed, progress, 0, 1)
}

/// [`classify`] reporting into slice `shell` of `num_shells`.
pub(crate) fn classify_in_range<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    seed: VertexId<I>,
    progress: &Progress,
    shell: usize,
    num_shells: usize,
) -> Classification<I> {
    let n = mesh.num_vertices();
    let mut classes = Classification::with_vertex_count(n);
    if seed.index() >= n {
        return classes;
    }

    let estimate = n / 4;
    let mut frontier = vec![seed];

    while !frontier.is_empty() {
        let mut next = BTreeSet::new();

        for &u in &frontier {
            if classes.contains(u) {
                continue;
            }

            let connected_ids = direct_neighbors(mesh, u);
            let diagonal = diagonal_of(mesh, u, &connected_ids);
            classes.boundary[u.index()] = mesh.is_boundary_vertex(u);

            let mut connected = Vec::with_capacity(connected_ids.len());
            for w in connected_ids {
                let ring = direct_neighbors(mesh, w);
                classes.boundary[w.index()] = mesh.is_boundary_vertex(w);
                next.extend(
                    ring.iter()
                        .copied()
                        .filter(|x| diagonal.binary_search(x).is_err()),
                );
                connected.push((w, ring));
            }

            classes.snapshots[u.index()] = Some(VertexSnapshot {
                connected,
                diagonal,
            });
            classes.order.push(u);

            let count = classes.order.len();
            progress.report_sub(
                count,
                estimate.max(count),
                shell,
                num_shells,
                "Searching vertices",
            );
        }

        frontier = next.into_iter().filter(|&x| !classes.contains(x)).collect();
    }

    classes
}

/// Direct neighbours of `v`, sorted and deduplicated.
pub(crate) fn direct_neighbors<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    v: VertexId<I>,
) -> Vec<VertexId<I>> {
    let mut out: Vec<_> = mesh.vertex_neighbors(v).collect();
    out.sort_unstable();
    out.dedup();
    out
}

/// Vertices of faces around `v` that are neither `v` nor in `connected`.
///
/// `connected` must be sorted.
pub(crate) fn diagonal_of<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    v: VertexId<I>,
    connected: &[VertexId<I>],
) -> Vec<VertexId<I>> {
    let mut out: Vec<_> = mesh
        .vertex_faces(v)
        .flat_map(|f| mesh.face_vertices(f))
        .filter(|&x| x != v && connected.binary_search(&x).is_err())
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::unsubdivide::fixtures;
    use crate::algo::unsubdivide::select_seed;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_grid_classifies_originals() {
        let mesh = fixtures::subdivided_grid(3, 3);
        let classes = classify(&mesh, select_seed(&mesh).vertex, &Progress::none());

        // 4x4 coarse vertices come first in the fixture layout.
        let found: Vec<usize> = classes.vertices().map(|v| v.index()).collect();
        assert_eq!(found, (0..16).collect::<Vec<_>>());
        assert_eq!(classes.num_boundary(), 12);
        // One face point per coarse face.
        assert_eq!(classes.diagonal_vertices().len(), 9);
    }

    #[test]
    fn test_cube_classifies_eight_corners() {
        let mesh = fixtures::subdivided_cube();
        assert_eq!(mesh.num_vertices(), 26);

        let classes = classify(&mesh, select_seed(&mesh).vertex, &Progress::none());
        assert_eq!(classes.len(), 8);
        assert_eq!(classes.num_boundary(), 0);
        for (_, snapshot) in classes.iter() {
            assert_eq!(snapshot.valence(), 3);
            assert_eq!(snapshot.diagonal.len(), 3);
        }
    }

    #[test]
    fn test_classification_is_seed_independent() {
        let mesh = fixtures::subdivided_grid(3, 2);
        let first = classify(&mesh, select_seed(&mesh).vertex, &Progress::none());
        let expected: Vec<_> = first.vertices().collect();

        for v in first.vertices() {
            let again = classify(&mesh, v, &Progress::none());
            assert_eq!(again.vertices().collect::<Vec<_>>(), expected);
        }
    }

    #[test]
    fn test_diagonal_and_connected_are_disjoint() {
        let mesh = fixtures::subdivided_cube_twice();
        let classes = classify(&mesh, select_seed(&mesh).vertex, &Progress::none());
        assert!(!classes.is_empty());

        for (v, snapshot) in classes.iter() {
            assert!(!snapshot.is_diagonal(v));
            assert!(snapshot.ring(v).is_none());
            for w in snapshot.connected_ids() {
                assert!(!snapshot.is_diagonal(w));
            }
        }
    }

    #[test]
    fn test_originals_never_adjacent() {
        let mesh = fixtures::subdivided_grid(2, 2);
        let classes = classify(&mesh, select_seed(&mesh).vertex, &Progress::none());
        for (_, snapshot) in classes.iter() {
            assert!(snapshot.connected_ids().all(|w| !classes.contains(w)));
        }
    }

    #[test]
    fn test_progress_once_per_vertex() {
        let mesh = fixtures::subdivided_cube();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let progress = Progress::new(move |_, _, message| {
            assert_eq!(message, "Searching vertices");
            counter.fetch_add(1, Ordering::Relaxed);
        });

        let classes = classify(&mesh, VertexId::new(0), &progress);
        assert_eq!(calls.load(Ordering::Relaxed), classes.len());
    }

    #[test]
    fn test_out_of_range_seed() {
        let mesh = fixtures::subdivided_cube();
        let classes = classify(&mesh, VertexId::new(1000), &Progress::none());
        assert!(classes.is_empty());
    }
}
