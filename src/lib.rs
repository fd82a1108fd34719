//! # unsubdiv
//!
//! Reverse one level of Catmull-Clark subdivision on quad meshes.
//!
//! Given a mesh produced by subdividing a coarse quad mesh once, unsubdiv
//! recovers the coarse mesh: the original vertices are told apart from the
//! inserted edge and face points, moved back to their pre-subdivision
//! positions by inverse stencils, and the inserted connectivity is deleted.
//!
//! ## Features
//!
//! - **Half-edge data structure**: polygon meshes with type-safe indices
//! - **Flexible indexing**: Support for 16-bit, 32-bit, and 64-bit indices
//! - **Shell-aware**: every connected shell is reconstructed on its own
//! - **File formats**: OBJ and PLY, keeping polygon faces intact
//!
//! ## Quick Start
//!
//! ```no_run
//! use unsubdiv::prelude::*;
//!
//! let mut mesh: HalfEdgeMesh = unsubdiv::io::load("subdivided.obj").unwrap();
//! let report = reconstruct(&mut mesh, &ReconstructOptions::default()).unwrap();
//! println!("{} vertices, {} faces", report.vertices, report.faces);
//! unsubdiv::io::save(&mesh, "coarse.obj").unwrap();
//! ```
//!
//! ## Step by Step
//!
//! The pipeline stages are public and can be driven one at a time:
//!
//! ```
//! use unsubdiv::prelude::*;
//! use unsubdiv::algo::unsubdivide::{classify, collapse, diagonal_edges, select_seed, solve_positions};
//! use nalgebra::Point3;
//!
//! // A 2x2 quad patch, read as one quad subdivided once.
//! let mut vertices = Vec::new();
//! for j in 0..3 {
//!     for i in 0..3 {
//!         vertices.push(Point3::new(i as f64, j as f64, 0.0));
//!     }
//! }
//! let faces = vec![[0, 1, 4, 3], [1, 2, 5, 4], [3, 4, 7, 6], [4, 5, 8, 7]];
//! let mut mesh: HalfEdgeMesh = build_from_quads(&vertices, &faces).unwrap();
//!
//! let seed = select_seed(&mesh);
//! let classes = classify(&mesh, seed.vertex, &Progress::none());
//! assert_eq!(classes.len(), 4);
//!
//! let solved = solve_positions(&mesh, &classes, &ReconstructOptions::default());
//! mesh.set_positions(&solved.updates);
//!
//! let edges = diagonal_edges(&mesh, &classes);
//! collapse(&mut mesh, &edges).unwrap();
//! assert_eq!((mesh.num_vertices(), mesh.num_faces()), (4, 1));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod io;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use unsubdiv::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::unsubdivide::{
        reconstruct, reconstruct_selection, reconstruct_with_progress, ReconstructOptions,
        ReconstructReport,
    };
    pub use crate::algo::Progress;
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::{
        build_from_polygons, build_from_quads, to_face_vertex_polygons, EdgeId, FaceId,
        HalfEdgeId, HalfEdgeMesh, MeshIndex, VertexId,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;
