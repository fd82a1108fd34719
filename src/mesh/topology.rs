//! Topology-level operations: shells, merging and edge dissolution.
//!
//! These rebuild the half-edge structure from a face-vertex list rather than
//! editing links in place, the same way the subdivision code regenerates a
//! mesh after changing its connectivity.

use std::collections::{BTreeSet, HashMap, VecDeque};

use super::builder::{build_from_polygons, to_face_vertex_polygons};
use super::halfedge::HalfEdgeMesh;
use super::index::{EdgeId, FaceId, HalfEdgeId, MeshIndex};
use crate::error::{MeshError, Result};

/// Counts describing the outcome of [`HalfEdgeMesh::dissolve_edges`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DissolveStats {
    /// Edges that no longer exist afterwards, including edges removed
    /// together with dissolved two-edge vertices.
    pub edges_removed: usize,
    /// Vertices dropped because they lost all faces or were dissolved.
    pub vertices_removed: usize,
    /// Faces in the rebuilt mesh.
    pub faces: usize,
}

impl<I: MeshIndex> HalfEdgeMesh<I> {
    /// Group faces into edge-connected shells.
    ///
    /// Shells are ordered by their lowest face id and each shell's faces are
    /// sorted ascending.
    pub fn connected_shells(&self) -> Vec<Vec<FaceId<I>>> {
        let mut shell_of = vec![usize::MAX; self.num_faces()];
        let mut shells = Vec::new();

        for seed in self.face_ids() {
            if shell_of[seed.index()] != usize::MAX {
                continue;
            }
            let shell_index = shells.len();
            let mut members = Vec::new();
            let mut queue = VecDeque::from([seed]);
            shell_of[seed.index()] = shell_index;

            while let Some(f) = queue.pop_front() {
                members.push(f);
                for he in self.face_halfedges(f) {
                    let other = self.face_of(self.twin(he));
                    if other.is_valid() && shell_of[other.index()] == usize::MAX {
                        shell_of[other.index()] = shell_index;
                        queue.push_back(other);
                    }
                }
            }

            members.sort_unstable();
            shells.push(members);
        }

        shells
    }

    /// Number of edge-connected shells.
    pub fn num_shells(&self) -> usize {
        self.connected_shells().len()
    }

    /// Separate the mesh into one mesh per shell.
    ///
    /// Vertex order is preserved within each shell. Vertices without faces
    /// are not carried over.
    pub fn split_shells(&self) -> Result<Vec<HalfEdgeMesh<I>>> {
        let shells = self.connected_shells();
        let has_isolated = self
            .vertices
            .iter()
            .any(|v| !v.halfedge.is_valid());

        if shells.len() <= 1 && !has_isolated {
            return Ok(vec![self.clone()]);
        }

        let (positions, faces) = to_face_vertex_polygons(self);
        let mut meshes = Vec::with_capacity(shells.len());

        for shell in shells {
            let used: BTreeSet<usize> = shell
                .iter()
                .flat_map(|f| faces[f.index()].iter().copied())
                .collect();
            let remap: HashMap<usize, usize> =
                used.iter().enumerate().map(|(new, &old)| (old, new)).collect();

            let shell_positions: Vec<_> = used.iter().map(|&old| positions[old]).collect();
            let shell_faces: Vec<Vec<usize>> = shell
                .iter()
                .map(|f| faces[f.index()].iter().map(|v| remap[v]).collect())
                .collect();

            meshes.push(build_from_polygons(&shell_positions, &shell_faces)?);
        }

        Ok(meshes)
    }

    /// Delete edges, merging the faces on either side of each.
    ///
    /// Afterwards:
    /// - faces connected through deleted edges form one polygon, traced
    ///   along the half-edges the group does not share internally;
    /// - vertices left without any face are dropped;
    /// - endpoints of deleted edges that are left with exactly two edges are
    ///   dissolved into the edge joining their neighbours.
    ///
    /// Vertex indices are compacted with their relative order kept, and faces
    /// keep the order of their lowest original face. On error the mesh is
    /// left untouched.
    pub fn dissolve_edges(&mut self, edges: &[EdgeId<I>]) -> Result<DissolveStats> {
        let mut removed = vec![false; self.num_halfedges()];
        let mut endpoint = vec![false; self.num_vertices()];
        let mut groups = UnionFind::new(self.num_faces());

        for &e in edges {
            if self.is_boundary_edge(e) {
                return Err(MeshError::invalid_param(
                    "edges",
                    format!("{:?}", e),
                    "boundary edges cannot be dissolved",
                ));
            }
            let he = e.halfedge();
            let twin = self.twin(he);
            removed[he.index()] = true;
            removed[twin.index()] = true;

            let (a, b) = self.edge_vertices(e);
            endpoint[a.index()] = true;
            endpoint[b.index()] = true;

            groups.union(self.face_of(he).index(), self.face_of(twin).index());
        }

        let mut members: Vec<Vec<FaceId<I>>> = vec![Vec::new(); self.num_faces()];
        for f in self.face_ids() {
            members[groups.find(f.index())].push(f);
        }

        let mut polygons: Vec<Vec<usize>> = Vec::new();
        for group in members.iter().filter(|g| !g.is_empty()) {
            let root = groups.find(group[0].index());
            let outline: Vec<HalfEdgeId<I>> = group
                .iter()
                .flat_map(|&f| self.face_halfedges(f))
                .filter(|&he| !removed[he.index()])
                .filter(|&he| {
                    // Edges with the group on both sides end up inside the
                    // merged polygon and go away with it.
                    let other = self.face_of(self.twin(he));
                    !(other.is_valid() && groups.find(other.index()) == root)
                })
                .collect();

            if outline.is_empty() {
                continue;
            }
            polygons.push(self.trace_outline(&outline)?);
        }

        // Dissolve two-edge endpoints of deleted edges.
        let mut neighbors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); self.num_vertices()];
        let mut polygons_of: Vec<Vec<usize>> = vec![Vec::new(); self.num_vertices()];
        for (pi, poly) in polygons.iter().enumerate() {
            let n = poly.len();
            for i in 0..n {
                let a = poly[i];
                let b = poly[(i + 1) % n];
                neighbors[a].insert(b);
                neighbors[b].insert(a);
                polygons_of[a].push(pi);
            }
        }

        let mut dissolved = vec![false; self.num_vertices()];
        for v in 0..self.num_vertices() {
            if !endpoint[v] || neighbors[v].len() != 2 {
                continue;
            }
            if polygons_of[v].iter().any(|&pi| polygons[pi].len() <= 3) {
                continue;
            }
            let ends: Vec<usize> = neighbors[v].iter().copied().collect();
            let (a, b) = (ends[0], ends[1]);
            neighbors[a].remove(&v);
            neighbors[a].insert(b);
            neighbors[b].remove(&v);
            neighbors[b].insert(a);
            neighbors[v].clear();
            for &pi in &polygons_of[v] {
                polygons[pi].retain(|&x| x != v);
            }
            dissolved[v] = true;
        }

        // Compact vertex indices.
        let mut referenced = vec![false; self.num_vertices()];
        for poly in &polygons {
            for &v in poly {
                referenced[v] = true;
            }
        }
        let keep: Vec<bool> = (0..self.num_vertices())
            .map(|v| referenced[v] || !(endpoint[v] || dissolved[v]))
            .collect();

        let mut remap = vec![usize::MAX; self.num_vertices()];
        let mut positions = Vec::with_capacity(self.num_vertices());
        for (v, vertex) in self.vertices.iter().enumerate() {
            if keep[v] {
                remap[v] = positions.len();
                positions.push(vertex.position);
            }
        }
        for poly in &mut polygons {
            for v in poly.iter_mut() {
                *v = remap[*v];
            }
        }

        let rebuilt = build_from_polygons::<I>(&positions, &polygons)?;
        let stats = DissolveStats {
            edges_removed: self.num_edges().saturating_sub(rebuilt.num_edges()),
            vertices_removed: self.num_vertices() - rebuilt.num_vertices(),
            faces: rebuilt.num_faces(),
        };
        *self = rebuilt;
        Ok(stats)
    }

    /// Chain outline half-edges into a single vertex loop.
    fn trace_outline(&self, outline: &[HalfEdgeId<I>]) -> Result<Vec<usize>> {
        let mut by_origin: HashMap<usize, HalfEdgeId<I>> = HashMap::with_capacity(outline.len());
        for &he in outline {
            let origin = self.origin(he).index();
            if by_origin.insert(origin, he).is_some() {
                return Err(MeshError::NonManifold {
                    details: format!("merged face outline revisits vertex {}", origin),
                });
            }
        }

        let start = outline[0];
        let mut loop_vertices = Vec::with_capacity(outline.len());
        let mut he = start;
        loop {
            loop_vertices.push(self.origin(he).index());
            let dest = self.dest(he).index();
            he = *by_origin.get(&dest).ok_or_else(|| MeshError::NonManifold {
                details: format!("merged face outline is open at vertex {}", dest),
            })?;
            if he == start || loop_vertices.len() > outline.len() {
                break;
            }
        }

        if loop_vertices.len() != outline.len() {
            return Err(MeshError::NonManifold {
                details: "merged face outline splits into several loops".to_string(),
            });
        }
        Ok(loop_vertices)
    }
}

/// Concatenate meshes into one mesh.
///
/// Vertices and faces of later meshes follow those of earlier ones.
pub fn merge_meshes<I: MeshIndex>(meshes: &[HalfEdgeMesh<I>]) -> Result<HalfEdgeMesh<I>> {
    if meshes.len() == 1 {
        return Ok(meshes[0].clone());
    }

    let mut positions = Vec::new();
    let mut faces: Vec<Vec<usize>> = Vec::new();
    for mesh in meshes {
        let offset = positions.len();
        let (p, f) = to_face_vertex_polygons(mesh);
        positions.extend(p);
        faces.extend(
            f.into_iter()
                .map(|face| face.into_iter().map(|v| v + offset).collect()),
        );
    }

    build_from_polygons(&positions, &faces)
}

/// Disjoint-set forest over face indices.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Union keeping the smaller index as root.
    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}
