//! Topology collapse.
//!
//! Deleting every edge at an inserted face point merges the four quads
//! around it back into one face; the edge points left with two edges are
//! then dissolved, restoring the coarse polygon.

use super::classify::Classification;
use crate::error::Result;
use crate::mesh::{DissolveStats, EdgeId, HalfEdgeMesh, MeshIndex};

/// Every interior edge incident to an inserted face point, sorted and
/// deduplicated.
///
/// Boundary edges are left out; they have no second face to merge with and
/// stay on the outline of the collapsed mesh.
///
/// Edge ids refer to `mesh` as classified; moving vertices does not change
/// them, but any topology change does.
pub fn diagonal_edges<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    classes: &Classification<I>,
) -> Vec<EdgeId<I>> {
    let mut edges: Vec<EdgeId<I>> = classes
        .diagonal_vertices()
        .into_iter()
        .flat_map(|f| mesh.vertex_edges(f))
        .filter(|&e| !mesh.is_boundary_edge(e))
        .collect();
    edges.sort_unstable();
    edges.dedup();
    edges
}

/// Delete `edges` and dissolve the inserted edge points they leave behind.
///
/// Must run after positions have been solved, as it rebuilds the mesh and
/// compacts vertex indices.
pub fn collapse<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    edges: &[EdgeId<I>],
) -> Result<DissolveStats> {
    log::info!("Deleting edges");
    let stats = mesh.dissolve_edges(edges)?;
    log::debug!(
        "removed {} edges and {} vertices, {} faces remain",
        stats.edges_removed,
        stats.vertices_removed,
        stats.faces
    );
    Ok(stats)
}
