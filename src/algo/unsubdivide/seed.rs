//! Starting-vertex selection.
//!
//! The classifier needs one vertex that is certainly an original (coarse)
//! vertex. After one Catmull-Clark step every inserted point is regular
//! (valence 4 inside, valence 3 on the boundary), so irregular valences are
//! strong evidence of an original vertex.

use crate::mesh::{HalfEdgeMesh, MeshIndex, VertexId};

/// Why a vertex was chosen as the seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedKind {
    /// Valence 2: a corner of an open mesh.
    Corner,
    /// Valence above 4: an extraordinary vertex.
    Extraordinary,
    /// Interior vertex of valence 3.
    InteriorValence3,
    /// Boundary vertex of valence 3.
    BoundaryValence3,
    /// No distinguishing vertex; vertex 0 is used.
    Fallback,
    /// A diagonal neighbour of the default seed.
    Reversed,
}

/// A seed vertex together with the rule that selected it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seed<I: MeshIndex = u32> {
    /// The starting vertex.
    pub vertex: VertexId<I>,
    /// The selection rule.
    pub kind: SeedKind,
}

/// Pick the vertex most likely to be an original vertex.
///
/// Priority, first match by index within each category: valence 2, valence
/// above 4, interior valence 3, boundary valence 3, then vertex 0.
pub fn select_seed<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> Seed<I> {
    let mut corner = None;
    let mut extraordinary = None;
    let mut interior3 = None;
    let mut boundary3 = None;

    for v in mesh.vertex_ids() {
        let valence = mesh.valence(v);
        match valence {
            2 if corner.is_none() => corner = Some(v),
            n if n > 4 && extraordinary.is_none() => extraordinary = Some(v),
            3 => {
                if mesh.is_boundary_vertex(v) {
                    boundary3.get_or_insert(v);
                } else {
                    interior3.get_or_insert(v);
                }
            }
            _ => {}
        }
        if corner.is_some() {
            break;
        }
    }

    let (vertex, kind) = corner
        .map(|v| (v, SeedKind::Corner))
        .or_else(|| extraordinary.map(|v| (v, SeedKind::Extraordinary)))
        .or_else(|| interior3.map(|v| (v, SeedKind::InteriorValence3)))
        .or_else(|| boundary3.map(|v| (v, SeedKind::BoundaryValence3)))
        .unwrap_or((VertexId::new(0), SeedKind::Fallback));

    log::debug!("seed {:?} chosen as {:?}", vertex, kind);
    Seed { vertex, kind }
}

/// Pick the lowest-index diagonal vertex of the default seed.
///
/// Used when the default seed lands on an inserted point; stepping across one
/// face then lands on an original vertex. Falls back to the default seed when
/// it has no diagonal vertex.
pub fn select_seed_reversed<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> Seed<I> {
    let seed = select_seed(mesh);
    if mesh.num_vertices() == 0 {
        return seed;
    }
    let neighbors = super::classify::direct_neighbors(mesh, seed.vertex);
    match super::classify::diagonal_of(mesh, seed.vertex, &neighbors).first() {
        Some(&vertex) => {
            log::debug!("reversed seed {:?} (from {:?})", vertex, seed.vertex);
            Seed {
                vertex,
                kind: SeedKind::Reversed,
            }
        }
        None => seed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::unsubdivide::fixtures;

    #[test]
    fn test_corner_wins() {
        let mesh = fixtures::subdivided_grid(3, 3);
        let seed = select_seed(&mesh);
        assert_eq!(seed.kind, SeedKind::Corner);
        assert_eq!(mesh.valence(seed.vertex), 2);
    }

    #[test]
    fn test_cube_seed_is_corner_vertex() {
        let mesh = fixtures::subdivided_cube();
        let seed = select_seed(&mesh);
        assert_eq!(seed.kind, SeedKind::InteriorValence3);
        // Original vertices come first in the fixture layout.
        assert_eq!(seed.vertex.index(), 0);
    }

    #[test]
    fn test_reversed_seed_is_diagonal() {
        let mesh = fixtures::subdivided_cube();
        let seed = select_seed_reversed(&mesh);
        assert_eq!(seed.kind, SeedKind::Reversed);
        // Face points follow the 8 cube corners.
        assert!(seed.vertex.index() >= 8 && seed.vertex.index() < 14);
        assert_eq!(mesh.valence(seed.vertex), 4);
    }

    #[test]
    fn test_fallback_on_regular_torus() {
        let mesh = fixtures::torus_mesh(4, 4);
        assert_eq!(select_seed(&mesh).kind, SeedKind::Fallback);
        assert_eq!(select_seed(&mesh).vertex.index(), 0);
    }
}
