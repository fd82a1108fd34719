//! Inverse Catmull-Clark subdivision.
//!
//! Reverses one level of Catmull-Clark subdivision on an all-quad mesh:
//! finds the original vertices, moves them back to their coarse positions
//! and deletes the connectivity the subdivision step inserted.
//!
//! # Pipeline
//!
//! For each connected shell:
//!
//! 1. [`select_seed`] picks a vertex that is surely original.
//! 2. [`classify()`] walks two-hop rings from the seed, recording each
//!    original vertex's neighbourhood before anything is modified.
//! 3. [`solve_positions`] applies the inverse stencils (boundary, regular
//!    interior, then valence 3 from solved neighbours).
//! 4. [`collapse()`] deletes the edges at every inserted face point.
//!
//! # Example
//!
//! ```
//! use unsubdiv::algo::unsubdivide::{reconstruct, ReconstructOptions};
//! use unsubdiv::mesh::{build_from_quads, HalfEdgeMesh};
//! use nalgebra::Point3;
//!
//! // One unit quad subdivided once.
//! let p = |x: f64, y: f64| Point3::new(x, y, 0.0);
//! let vertices = vec![
//!     p(0.0, 0.0), p(2.0, 0.0), p(2.0, 2.0), p(0.0, 2.0),
//!     p(1.0, 1.0),
//!     p(1.0, 0.0), p(2.0, 1.0), p(1.0, 2.0), p(0.0, 1.0),
//! ];
//! let faces = vec![[0, 5, 4, 8], [1, 6, 4, 5], [2, 7, 4, 6], [3, 8, 4, 7]];
//! let mut mesh: HalfEdgeMesh = build_from_quads(&vertices, &faces).unwrap();
//!
//! let report = reconstruct(&mut mesh, &ReconstructOptions::default()).unwrap();
//! assert_eq!(report.faces, 1);
//! assert_eq!(mesh.num_vertices(), 4);
//! ```

mod classify;
mod collapse;
#[cfg(test)]
mod fixtures;
mod seed;
mod solve;

use std::time::{Duration, Instant};

use nalgebra::Vector3;
use rayon::prelude::*;

use crate::algo::Progress;
use crate::error::{MeshError, Result};
use crate::mesh::{merge_meshes, HalfEdgeMesh, MeshIndex};

pub use classify::{classify, Classification, VertexSnapshot};
pub use collapse::{collapse, diagonal_edges};
pub use seed::{select_seed, select_seed_reversed, Seed, SeedKind};
pub use solve::{solve_positions, SolvedPositions};

/// Options for reconstruction.
#[derive(Debug, Clone)]
pub struct ReconstructOptions {
    /// Start from a diagonal neighbour of the default seed.
    pub reverse_seed: bool,
    /// Leave the input untouched and emit a reconstructed copy.
    pub keep_original: bool,
    /// Solve coarse positions before collapsing. When false only the
    /// topology is collapsed.
    pub reconstruct_positions: bool,
    /// Keep valence-2 boundary corners where they are.
    pub sharp_corners: bool,
    /// Bounded number of passes over unresolved valence-3 vertices.
    pub valence3_passes: usize,
    /// Evaluate independent per-vertex work on the rayon pool.
    pub parallel: bool,
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        Self {
            reverse_seed: false,
            keep_original: true,
            reconstruct_positions: true,
            sharp_corners: true,
            valence3_passes: 2,
            parallel: true,
        }
    }
}

impl ReconstructOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a diagonal neighbour of the default seed.
    pub fn reverse_seed(mut self, reverse: bool) -> Self {
        self.reverse_seed = reverse;
        self
    }

    /// Keep the input and reconstruct a duplicate.
    pub fn keep_original(mut self, keep: bool) -> Self {
        self.keep_original = keep;
        self
    }

    /// Enable or disable position solving.
    pub fn reconstruct_positions(mut self, enabled: bool) -> Self {
        self.reconstruct_positions = enabled;
        self
    }

    /// Hold valence-2 boundary corners fixed.
    pub fn sharp_corners(mut self, sharp: bool) -> Self {
        self.sharp_corners = sharp;
        self
    }

    /// Set the number of valence-3 passes.
    pub fn valence3_passes(mut self, passes: usize) -> Self {
        self.valence3_passes = passes;
        self
    }

    /// Run everything on the calling thread.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

/// Outcome for one connected shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellReport {
    /// Index of the seed vertex within the shell.
    pub seed: usize,
    /// Rule that picked the seed.
    pub seed_kind: SeedKind,
    /// Vertices classified as original.
    pub original_vertices: usize,
    /// Classified vertices on the boundary.
    pub boundary_vertices: usize,
    /// Vertices that received a solved position.
    pub resolved: usize,
    /// Valence-3 vertices left in place.
    pub unresolved_valence3: usize,
    /// Boundary vertices skipped for lacking two boundary neighbours.
    pub skipped_boundary: usize,
    /// Edges removed by the collapse.
    pub edges_removed: usize,
    /// Vertices removed by the collapse.
    pub vertices_removed: usize,
    /// Faces left in the shell.
    pub faces: usize,
}

/// Outcome for one mesh.
#[derive(Debug, Clone)]
pub struct ReconstructReport {
    /// Per-shell outcomes, in shell order.
    pub shells: Vec<ShellReport>,
    /// Vertices in the reconstructed mesh.
    pub vertices: usize,
    /// Faces in the reconstructed mesh.
    pub faces: usize,
    /// Wall time spent.
    pub elapsed: Duration,
}

/// Reconstruct one connected, all-quad shell in place.
///
/// Runs seed selection, classification, position solving (unless disabled)
/// and collapse. The caller is responsible for the quad check and for
/// splitting shells; see [`reconstruct`].
pub fn reconstruct_shell<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    options: &ReconstructOptions,
    progress: &Progress,
) -> Result<ShellReport> {
    run_shell(mesh, options, progress, 0, 1)
}

fn run_shell<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    options: &ReconstructOptions,
    progress: &Progress,
    shell: usize,
    num_shells: usize,
) -> Result<ShellReport> {
    let seed = if options.reverse_seed {
        select_seed_reversed(mesh)
    } else {
        select_seed(mesh)
    };

    log::info!("Searching vertices");
    let classes = classify::classify_in_range(mesh, seed.vertex, progress, shell, num_shells);

    let mut report = ShellReport {
        seed: seed.vertex.index(),
        seed_kind: seed.kind,
        original_vertices: classes.len(),
        boundary_vertices: classes.num_boundary(),
        resolved: 0,
        unresolved_valence3: 0,
        skipped_boundary: 0,
        edges_removed: 0,
        vertices_removed: 0,
        faces: mesh.num_faces(),
    };

    // Edge ids survive position writes, so gather them while the
    // classification still matches the mesh.
    let edges = diagonal_edges(mesh, &classes);

    if options.reconstruct_positions {
        log::info!("Reconstructing positions");
        let solved = solve_positions(mesh, &classes, options);
        mesh.set_positions(&solved.updates);
        report.resolved = solved.resolved();
        report.unresolved_valence3 = solved.unresolved.len();
        report.skipped_boundary = solved.skipped_boundary.len();
    }

    let stats = collapse(mesh, &edges)?;
    report.edges_removed = stats.edges_removed;
    report.vertices_removed = stats.vertices_removed;
    report.faces = stats.faces;
    Ok(report)
}

/// Fail with [`MeshError::NonQuadFaces`] unless every face is a quad.
fn check_quads<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, index: usize, parallel: bool) -> Result<()> {
    let faces: Vec<usize> = if parallel {
        (0..mesh.num_faces())
            .into_par_iter()
            .filter(|&f| mesh.face_vertex_count(f.into()) != 4)
            .collect()
    } else {
        mesh.non_quad_faces().into_iter().map(|f| f.index()).collect()
    };
    if faces.is_empty() {
        Ok(())
    } else {
        Err(MeshError::NonQuadFaces { mesh: index, faces })
    }
}

/// Reconstruct a mesh in place.
///
/// Fails before touching the mesh if any face is not a quad. Each connected
/// shell is reconstructed on its own and the results are merged back, so
/// the mesh is only replaced once every shell has succeeded.
/// [`ReconstructOptions::keep_original`] is honoured by
/// [`reconstruct_selection`]; here the mesh is always replaced.
pub fn reconstruct<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    options: &ReconstructOptions,
) -> Result<ReconstructReport> {
    reconstruct_with_progress(mesh, options, &Progress::none())
}

/// [`reconstruct`] with progress reporting.
pub fn reconstruct_with_progress<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    options: &ReconstructOptions,
    progress: &Progress,
) -> Result<ReconstructReport> {
    check_quads(mesh, 0, options.parallel)?;
    reconstruct_checked(mesh, options, progress)
}

fn reconstruct_checked<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    options: &ReconstructOptions,
    progress: &Progress,
) -> Result<ReconstructReport> {
    let start = Instant::now();
    let mut shells = mesh.split_shells()?;
    let num_shells = shells.len();
    log::info!(
        "Reconstructing {} vertices, {} faces in {} shell(s)",
        mesh.num_vertices(),
        mesh.num_faces(),
        num_shells
    );

    let mut reports = Vec::with_capacity(num_shells);
    for (i, shell) in shells.iter_mut().enumerate() {
        reports.push(run_shell(shell, options, progress, i, num_shells)?);
    }

    *mesh = merge_meshes(&shells)?;
    Ok(ReconstructReport {
        shells: reports,
        vertices: mesh.num_vertices(),
        faces: mesh.num_faces(),
        elapsed: start.elapsed(),
    })
}

/// Reconstruct every mesh of a selection.
///
/// All meshes are checked for non-quad faces before any is modified. With
/// [`ReconstructOptions::keep_original`] the originals stay as they are and
/// the reconstructed copies are appended to `selection`, shifted along +X by
/// 1.1 times the selection's bounding-box width. Otherwise the meshes are
/// replaced in place, and a failure leaves earlier meshes reconstructed.
pub fn reconstruct_selection<I: MeshIndex>(
    selection: &mut Vec<HalfEdgeMesh<I>>,
    options: &ReconstructOptions,
    progress: &Progress,
) -> Result<Vec<ReconstructReport>> {
    if selection.is_empty() {
        return Err(MeshError::EmptySelection);
    }
    for (i, mesh) in selection.iter().enumerate() {
        check_quads(mesh, i, options.parallel)?;
    }

    if !options.keep_original {
        return selection
            .iter_mut()
            .map(|mesh| reconstruct_checked(mesh, options, progress))
            .collect();
    }

    let offset = Vector3::new(selection_width(selection) * 1.1, 0.0, 0.0);
    let mut copies = Vec::with_capacity(selection.len());
    let mut reports = Vec::with_capacity(selection.len());
    for mesh in selection.iter() {
        let mut copy = mesh.clone();
        reports.push(reconstruct_checked(&mut copy, options, progress)?);
        copy.translate(offset);
        copies.push(copy);
    }
    selection.extend(copies);
    Ok(reports)
}

/// X extent of the union of bounding boxes.
fn selection_width<I: MeshIndex>(selection: &[HalfEdgeMesh<I>]) -> f64 {
    let (lo, hi) = selection
        .iter()
        .filter_map(HalfEdgeMesh::bounding_box)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (min, max)| {
            (lo.min(min.x), hi.max(max.x))
        });
    if lo.is_finite() && hi.is_finite() {
        hi - lo
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_polygons, to_face_vertex_quads};
    use nalgebra::Point3;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn valences(mesh: &HalfEdgeMesh) -> Vec<usize> {
        let mut v: Vec<usize> = mesh.vertex_ids().map(|v| mesh.valence(v)).collect();
        v.sort_unstable();
        v
    }

    #[test]
    fn test_grid_round_trip() {
        let (coarse_vertices, coarse_faces) = fixtures::bumpy_grid(3, 3);
        let mut mesh = fixtures::subdivided_grid(3, 3);

        let report = reconstruct(&mut mesh, &ReconstructOptions::default()).unwrap();
        assert_eq!(report.shells.len(), 1);
        assert_eq!(report.shells[0].seed_kind, SeedKind::Corner);
        assert_eq!(report.shells[0].original_vertices, 16);
        assert_eq!(report.shells[0].boundary_vertices, 12);
        assert_eq!((report.vertices, report.faces), (16, 9));

        let (vertices, faces) = to_face_vertex_quads(&mesh);
        assert_eq!(faces, coarse_faces);
        for (a, b) in vertices.iter().zip(&coarse_vertices) {
            assert!((a - b).norm() < 1e-9);
        }
    }

    #[test]
    fn test_cube_end_to_end() {
        let mut mesh = fixtures::subdivided_cube();
        let before = mesh.positions();

        let report = reconstruct(&mut mesh, &ReconstructOptions::default()).unwrap();
        let shell = &report.shells[0];
        assert_eq!(shell.original_vertices, 8);
        assert_eq!(shell.unresolved_valence3, 8);
        assert_eq!(shell.faces, 6);
        assert_eq!(mesh.num_vertices(), 8);
        assert_eq!(valences(&mesh), vec![3; 8]);
        // Nothing to solve from: corners keep their subdivided positions.
        assert_eq!(mesh.positions(), before[..8].to_vec());
    }

    #[test]
    fn test_twice_subdivided_cube_recovers_once_subdivided() {
        let (coarse_vertices, coarse_faces) = fixtures::subdivided_cube_arrays();
        let mut mesh = fixtures::subdivided_cube_twice();

        reconstruct(&mut mesh, &ReconstructOptions::default().sequential()).unwrap();

        let (vertices, faces) = to_face_vertex_quads(&mesh);
        assert_eq!(faces, coarse_faces);
        for (a, b) in vertices.iter().zip(&coarse_vertices) {
            assert!((a - b).norm() < 1e-9);
        }
    }

    #[test]
    fn test_reversed_seed_on_closed_mesh() {
        let mut mesh = fixtures::subdivided_cube();
        let options = ReconstructOptions::default().reverse_seed(true);

        let report = reconstruct(&mut mesh, &options).unwrap();
        let shell = &report.shells[0];
        assert_eq!(shell.seed_kind, SeedKind::Reversed);
        assert_eq!(shell.original_vertices, 6);
        // Face points become vertices, cube corners become triangles.
        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_faces(), 8);
        assert!(mesh.face_ids().all(|f| mesh.face_vertex_count(f) == 3));
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_reversed_seed_on_open_mesh() {
        let mut mesh = fixtures::subdivided_grid(2, 2);
        let options = ReconstructOptions::default().reverse_seed(true);

        let report = reconstruct(&mut mesh, &options).unwrap();
        let shell = &report.shells[0];
        assert_eq!(shell.seed_kind, SeedKind::Reversed);
        assert_eq!(shell.original_vertices, 4);
        assert_eq!(shell.boundary_vertices, 0);
        assert_eq!(mesh.num_vertices(), 16);
        assert_eq!(mesh.num_faces(), 9);
        assert!(mesh.is_quad_mesh());
        assert!(mesh.is_valid());
    }

    #[test]
    fn test_topology_only_keeps_positions() {
        let mut mesh = fixtures::subdivided_grid(2, 2);
        let before = mesh.positions();
        let options = ReconstructOptions::default().reconstruct_positions(false);

        let report = reconstruct(&mut mesh, &options).unwrap();
        assert_eq!(report.shells[0].resolved, 0);
        assert_eq!(mesh.positions(), before[..9].to_vec());
    }

    #[test]
    fn test_non_quad_rejected_before_mutation() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(2.0, 0.5, 0.0),
        ];
        let faces = vec![vec![0, 1, 2, 3], vec![1, 4, 2]];
        let mut mesh: HalfEdgeMesh = build_from_polygons(&vertices, &faces).unwrap();

        for parallel in [true, false] {
            let mut options = ReconstructOptions::default();
            options.parallel = parallel;
            let err = reconstruct(&mut mesh, &options).unwrap_err();
            assert!(matches!(
                err,
                MeshError::NonQuadFaces { mesh: 0, ref faces } if faces == &vec![1]
            ));
        }
        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(mesh.positions(), vertices);
    }

    #[test]
    fn test_two_shells() {
        let mut grid = fixtures::subdivided_grid(2, 1);
        grid.translate(Vector3::new(10.0, 0.0, 0.0));
        let mut mesh = merge_meshes(&[fixtures::subdivided_cube(), grid]).unwrap();

        let report = reconstruct(&mut mesh, &ReconstructOptions::default()).unwrap();
        assert_eq!(report.shells.len(), 2);
        assert_eq!(report.shells[0].faces, 6);
        assert_eq!(report.shells[1].faces, 2);
        assert_eq!(mesh.num_vertices(), 8 + 6);
        assert_eq!(mesh.num_shells(), 2);
    }

    #[test]
    fn test_selection_keeps_originals() {
        let mut selection = vec![fixtures::subdivided_grid(2, 2), fixtures::subdivided_cube()];
        let originals = selection.clone();

        let reports =
            reconstruct_selection(&mut selection, &ReconstructOptions::default(), &Progress::none())
                .unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(selection.len(), 4);
        assert_eq!(selection[0].positions(), originals[0].positions());
        assert_eq!(selection[1].positions(), originals[1].positions());
        assert_eq!(selection[2].num_faces(), 4);
        assert_eq!(selection[3].num_faces(), 6);

        // The grid spans x in [0, 2], so copies move by 2.2 along x.
        assert!((selection_width(&originals) - 2.0).abs() < 1e-9);
        let mut expected = originals[1].clone();
        reconstruct(&mut expected, &ReconstructOptions::default()).unwrap();
        let (expected_min, _) = expected.bounding_box().unwrap();
        let (min, _) = selection[3].bounding_box().unwrap();
        assert!((min.x - (expected_min.x + 2.2)).abs() < 1e-9);
        assert!((min.y - expected_min.y).abs() < 1e-9);
    }

    #[test]
    fn test_selection_in_place() {
        let mut selection = vec![fixtures::subdivided_cube()];
        let options = ReconstructOptions::default().keep_original(false);
        reconstruct_selection(&mut selection, &options, &Progress::none()).unwrap();
        assert_eq!(selection.len(), 1);
        assert_eq!(selection[0].num_faces(), 6);
    }

    #[test]
    fn test_selection_validates_everything_first() {
        let triangle: HalfEdgeMesh = crate::mesh::build_from_triangles(
            &[
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            &[[0, 1, 2]],
        )
        .unwrap();
        let mut selection = vec![fixtures::subdivided_cube(), triangle];
        let options = ReconstructOptions::default().keep_original(false);

        let err = reconstruct_selection(&mut selection, &options, &Progress::none()).unwrap_err();
        assert!(matches!(err, MeshError::NonQuadFaces { mesh: 1, .. }));
        assert_eq!(selection[0].num_faces(), 24);
    }

    #[test]
    fn test_empty_selection() {
        let mut selection: Vec<HalfEdgeMesh> = Vec::new();
        let err = reconstruct_selection(
            &mut selection,
            &ReconstructOptions::default(),
            &Progress::none(),
        )
        .unwrap_err();
        assert!(matches!(err, MeshError::EmptySelection));
        assert!(err.is_precondition());
    }

    #[test]
    fn test_progress_stays_within_bounds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let progress = Progress::new(move |current, total, _| {
            assert!(current <= total);
            counter.fetch_add(1, Ordering::Relaxed);
        });

        let mut mesh = fixtures::subdivided_grid(3, 3);
        reconstruct_with_progress(&mut mesh, &ReconstructOptions::default(), &progress).unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 16);
    }

    #[test]
    fn test_options_builder() {
        let options = ReconstructOptions::new()
            .reverse_seed(true)
            .keep_original(false)
            .sharp_corners(false)
            .valence3_passes(5)
            .sequential();
        assert!(options.reverse_seed);
        assert!(!options.keep_original);
        assert!(options.reconstruct_positions);
        assert!(!options.sharp_corners);
        assert_eq!(options.valence3_passes, 5);
        assert!(!options.parallel);
    }
}
