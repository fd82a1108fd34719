//! Core mesh data structures.
//!
//! This module provides the half-edge mesh representation used by the
//! reconstruction algorithms, together with construction helpers and the
//! topology operations they need (shell separation, edge dissolution).
//!
//! # Overview
//!
//! The primary type is [`HalfEdgeMesh`], a polygon mesh stored as a half-edge
//! (doubly-connected edge list) structure. Adjacency queries walk half-edge
//! links and need no auxiliary tables.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe index wrappers:
//! - [`VertexId`] - Identifies a vertex
//! - [`HalfEdgeId`] - Identifies a half-edge
//! - [`FaceId`] - Identifies a face
//! - [`EdgeId`] - Identifies a full edge
//!
//! These indices are generic over the underlying integer type ([`MeshIndex`] trait),
//! allowing you to choose `u16`, `u32`, or `u64` based on mesh size.
//!
//! # Construction
//!
//! ```
//! use unsubdiv::mesh::{HalfEdgeMesh, build_from_quads};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2, 3]];
//!
//! let mesh: HalfEdgeMesh = build_from_quads(&vertices, &faces).unwrap();
//! assert!(mesh.is_quad_mesh());
//! ```

mod builder;
mod halfedge;
mod index;
mod topology;

pub use builder::{
    build_from_polygons, build_from_quads, build_from_triangles, to_face_vertex_polygons,
    to_face_vertex_quads,
};
pub use halfedge::{Face, FaceHalfEdgeIter, HalfEdge, HalfEdgeMesh, Vertex, VertexHalfEdgeIter};
pub use index::{EdgeId, FaceId, HalfEdgeId, MeshIndex, VertexId};
pub use topology::{merge_meshes, DissolveStats};
