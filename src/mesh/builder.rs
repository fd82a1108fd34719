//! Mesh construction utilities.
//!
//! This module builds half-edge meshes from face-vertex lists, the layout
//! used by mesh files, and converts them back.

use std::collections::HashMap;

use nalgebra::Point3;

use super::halfedge::{Face, HalfEdge, HalfEdgeMesh};
use super::index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
use crate::error::{MeshError, Result};

/// Build a half-edge mesh from vertices and polygon faces.
///
/// # Arguments
/// * `vertices` - List of vertex positions
/// * `faces` - List of faces, each a list of at least three vertex indices
///   in counter-clockwise order
///
/// # Returns
/// A half-edge mesh, or an error if the input is invalid.
///
/// # Example
/// ```
/// use unsubdiv::mesh::{build_from_polygons, HalfEdgeMesh};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
///     Point3::new(2.0, 0.5, 0.0),
/// ];
/// let faces = vec![vec![0, 1, 2, 3], vec![1, 4, 2]];
///
/// let mesh: HalfEdgeMesh = build_from_polygons(&vertices, &faces).unwrap();
/// assert_eq!(mesh.num_faces(), 2);
/// assert!(!mesh.is_quad_mesh());
/// ```
pub fn build_from_polygons<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[Vec<usize>],
) -> Result<HalfEdgeMesh<I>> {
    if faces.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    for (fi, face) in faces.iter().enumerate() {
        if let Some(&vi) = face.iter().find(|&&vi| vi >= vertices.len()) {
            return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
        }
        if face.len() < 3 {
            return Err(MeshError::DegenerateFace { face: fi });
        }
        for (i, vi) in face.iter().enumerate() {
            if face[i + 1..].contains(vi) {
                return Err(MeshError::DegenerateFace { face: fi });
            }
        }
    }

    let num_corners: usize = faces.iter().map(Vec::len).sum();
    let mut mesh = HalfEdgeMesh::with_capacity(vertices.len(), num_corners);
    mesh.faces.reserve(faces.len());

    let vertex_ids: Vec<VertexId<I>> = vertices.iter().map(|&pos| mesh.add_vertex(pos)).collect();

    // Directed edge (v0, v1) -> half-edge, plus insertion order for
    // deterministic boundary half-edge numbering.
    let mut edge_map: HashMap<(usize, usize), HalfEdgeId<I>> = HashMap::with_capacity(num_corners);
    let mut directed: Vec<(usize, usize)> = Vec::with_capacity(num_corners);

    for face in faces {
        let n = face.len();
        let first = mesh.num_halfedges();
        let face_id = FaceId::<I>::new(mesh.num_faces());
        mesh.faces.push(Face::new(HalfEdgeId::new(first)));

        for i in 0..n {
            let v0 = face[i];
            let v1 = face[(i + 1) % n];
            let he_id = HalfEdgeId::<I>::new(first + i);

            let mut he = HalfEdge::new();
            he.origin = vertex_ids[v0];
            he.next = HalfEdgeId::new(first + (i + 1) % n);
            he.prev = HalfEdgeId::new(first + (i + n - 1) % n);
            he.face = face_id;
            mesh.halfedges.push(he);

            mesh.vertex_mut(vertex_ids[v0]).halfedge = he_id;

            if edge_map.insert((v0, v1), he_id).is_some() {
                return Err(MeshError::NonManifoldEdge { v0, v1 });
            }
            directed.push((v0, v1));
        }
    }

    // Link twins, creating boundary half-edges where no opposite exists.
    for &(v0, v1) in &directed {
        let he = edge_map[&(v0, v1)];
        if let Some(&twin) = edge_map.get(&(v1, v0)) {
            mesh.halfedge_mut(he).twin = twin;
        } else {
            let boundary_he = HalfEdgeId::<I>::new(mesh.num_halfedges());
            let mut bhe = HalfEdge::new();
            bhe.origin = vertex_ids[v1];
            bhe.twin = he;
            mesh.halfedges.push(bhe);
            mesh.halfedge_mut(he).twin = boundary_he;
        }
    }

    link_boundary_loops(&mut mesh);
    fix_boundary_vertex_halfedges(&mut mesh);

    Ok(mesh)
}

/// Link boundary half-edges into loops.
fn link_boundary_loops<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) {
    let boundary_hes: Vec<HalfEdgeId<I>> = mesh
        .halfedge_ids()
        .filter(|&he| mesh.is_boundary_halfedge(he))
        .collect();

    let outgoing: HashMap<usize, HalfEdgeId<I>> = boundary_hes
        .iter()
        .map(|&he| (mesh.origin(he).index(), he))
        .collect();

    for &he in &boundary_hes {
        // The next boundary half-edge starts where this one ends
        let dest = mesh.dest(he).index();
        if let Some(&next_he) = outgoing.get(&dest) {
            mesh.halfedge_mut(he).next = next_he;
            mesh.halfedge_mut(next_he).prev = he;
        }
    }
}

/// Make boundary vertices point at an outgoing boundary half-edge.
fn fix_boundary_vertex_halfedges<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) {
    let boundary_hes: Vec<HalfEdgeId<I>> = mesh
        .halfedge_ids()
        .filter(|&he| mesh.is_boundary_halfedge(he))
        .collect();

    for he in boundary_hes {
        let origin = mesh.origin(he);
        mesh.vertex_mut(origin).halfedge = he;
    }
}

/// Build a half-edge mesh from vertices and quad faces.
///
/// # Arguments
/// * `vertices` - List of vertex positions
/// * `faces` - List of quad faces, each as [v0, v1, v2, v3] indices (counter-clockwise)
pub fn build_from_quads<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[[usize; 4]],
) -> Result<HalfEdgeMesh<I>> {
    let polygons: Vec<Vec<usize>> = faces.iter().map(|f| f.to_vec()).collect();
    build_from_polygons(vertices, &polygons)
}

/// Build a half-edge mesh from vertices and triangle faces.
pub fn build_from_triangles<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
) -> Result<HalfEdgeMesh<I>> {
    let polygons: Vec<Vec<usize>> = faces.iter().map(|f| f.to_vec()).collect();
    build_from_polygons(vertices, &polygons)
}

/// Convert a half-edge mesh back to a face-vertex representation.
///
/// Returns (vertices, faces); each face lists its vertices in winding order.
pub fn to_face_vertex_polygons<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
) -> (Vec<Point3<f64>>, Vec<Vec<usize>>) {
    let vertices = mesh.positions();
    let faces = mesh
        .face_ids()
        .map(|f| mesh.face_vertices(f).map(VertexId::index).collect())
        .collect();
    (vertices, faces)
}

/// Convert a quad mesh back to a face-vertex representation.
///
/// Only meaningful when [`HalfEdgeMesh::is_quad_mesh`] holds.
pub fn to_face_vertex_quads<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
) -> (Vec<Point3<f64>>, Vec<[usize; 4]>) {
    let vertices = mesh.positions();
    let faces = mesh
        .face_ids()
        .map(|f| mesh.face_quad(f).map(VertexId::index))
        .collect();
    (vertices, faces)
}
