//! unsubdiv CLI - reverse one level of Catmull-Clark subdivision.
//!
//! Usage: unsubdiv <COMMAND> [OPTIONS] <INPUT> [OUTPUT]
//!
//! Run `unsubdiv --help` for available commands.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use unsubdiv::algo::unsubdivide::{
    reconstruct_with_progress, select_seed, ReconstructOptions,
};
use unsubdiv::algo::Progress;
use unsubdiv::io;
use unsubdiv::mesh::HalfEdgeMesh;

#[derive(Parser)]
#[command(name = "unsubdiv")]
#[command(author, version, about = "Reverse Catmull-Clark subdivision", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh information
    Info {
        /// Input mesh file
        input: PathBuf,
    },

    /// Reconstruct the mesh one subdivision level down
    Reconstruct {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file (default: <input>_recon.<ext>)
        #[arg(conflicts_with = "in_place")]
        output: Option<PathBuf>,

        /// Overwrite the input file
        #[arg(long)]
        in_place: bool,

        /// Start from a diagonal neighbour of the default seed
        #[arg(long)]
        reverse_seed: bool,

        /// Only collapse the topology, keep vertex positions
        #[arg(long)]
        topology_only: bool,

        /// Let valence-2 corners move like other boundary vertices
        #[arg(long)]
        smooth_corners: bool,

        /// Do not draw a progress bar
        #[arg(long)]
        no_progress: bool,

        /// Passes over unresolved valence-3 vertices
        #[arg(long, default_value = "2")]
        valence3_passes: usize,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { input } => {
            cmd_info(&input)?;
        }
        Commands::Reconstruct {
            input,
            output,
            in_place,
            reverse_seed,
            topology_only,
            smooth_corners,
            no_progress,
            valence3_passes,
            sequential,
        } => {
            let output = match (output, in_place) {
                (Some(path), _) => path,
                (None, true) => input.clone(),
                (None, false) => recon_path(&input),
            };
            let mut options = ReconstructOptions::new()
                .reverse_seed(reverse_seed)
                .keep_original(!in_place)
                .reconstruct_positions(!topology_only)
                .sharp_corners(!smooth_corners)
                .valence3_passes(valence3_passes);
            if sequential {
                options = options.sequential();
            }
            cmd_reconstruct(&input, &output, &options, !no_progress)?;
        }
    }
    Ok(())
}

/// `dir/name.ext` becomes `dir/name_recon.ext`.
fn recon_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!("{}_recon", stem);
    if let Some(ext) = input.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    input.with_file_name(name)
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0)); // Track highest percent seen (monotonic)

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }

        // Use rounding instead of truncation for smoother progress
        let raw_percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };

        // The vertex-count estimate can be overtaken; never move backwards.
        let previous = max_percent.fetch_max(raw_percent, Ordering::Relaxed);
        if raw_percent <= previous && raw_percent != 100 {
            return;
        }
        let percent = raw_percent.max(previous);

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        let bar = "=".repeat(filled);
        let space = " ".repeat(bar_width - filled);

        eprint!("\r[{}{}] {:3}% {}", bar, space, percent, message);
        let _ = std::io::stderr().flush();

        if current >= total {
            eprintln!();
        }
    })
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mesh: HalfEdgeMesh = io::load(input)?;

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Edges: {}", mesh.num_edges());
    println!("Faces: {}", mesh.num_faces());

    if let Some((min, max)) = mesh.bounding_box() {
        let diag = max - min;
        println!("Dimensions: {:.3} x {:.3} x {:.3}", diag.x, diag.y, diag.z);
    }

    let non_quads = mesh.non_quad_faces();
    if non_quads.is_empty() {
        println!("Mesh type: Quad mesh");
    } else {
        println!("Mesh type: Mixed polygon mesh ({} non-quad faces)", non_quads.len());
    }

    println!("Shells: {}", mesh.num_shells());

    let boundary = mesh
        .vertex_ids()
        .filter(|&v| mesh.is_boundary_vertex(v))
        .count();
    if boundary == 0 {
        println!("Topology: Closed (no boundary)");
    } else {
        println!("Topology: Open ({} boundary vertices)", boundary);
    }

    let mut histogram: BTreeMap<usize, usize> = BTreeMap::new();
    for v in mesh.vertex_ids() {
        *histogram.entry(mesh.valence(v)).or_default() += 1;
    }
    println!("Valence histogram:");
    for (valence, count) in &histogram {
        println!("  {:>3}: {}", valence, count);
    }

    if mesh.num_vertices() > 0 {
        let seed = select_seed(&mesh);
        println!("Seed: vertex {} ({:?})", seed.vertex.index(), seed.kind);
    }

    Ok(())
}

fn cmd_reconstruct(
    input: &Path,
    output: &Path,
    options: &ReconstructOptions,
    show_progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut mesh: HalfEdgeMesh = io::load(input)?;
    println!("Loaded: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());

    let mode = if options.parallel { "parallel" } else { "sequential" };
    println!("Reconstructing ({})...", mode);

    let progress = if show_progress {
        create_progress()
    } else {
        Progress::none()
    };
    let report = reconstruct_with_progress(&mut mesh, options, &progress)?;

    for (i, shell) in report.shells.iter().enumerate() {
        println!(
            "Shell {}: {} original vertices ({} boundary), {} solved, {} valence-3 unresolved",
            i,
            shell.original_vertices,
            shell.boundary_vertices,
            shell.resolved,
            shell.unresolved_valence3
        );
    }
    println!("Result: {} vertices, {} faces", report.vertices, report.faces);

    io::save(&mesh, output)?;
    println!("Saved: {} ({:.2?})", output.display(), report.elapsed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recon_path() {
        assert_eq!(
            recon_path(Path::new("meshes/cube.obj")),
            PathBuf::from("meshes/cube_recon.obj")
        );
        assert_eq!(recon_path(Path::new("grid")), PathBuf::from("grid_recon"));
    }

    #[test]
    fn test_cli_parses_reconstruct() {
        let cli = Cli::try_parse_from([
            "unsubdiv",
            "reconstruct",
            "in.ply",
            "--topology-only",
            "--valence3-passes",
            "4",
        ])
        .unwrap();
        match cli.command {
            Commands::Reconstruct {
                input,
                output,
                topology_only,
                valence3_passes,
                ..
            } => {
                assert_eq!(input, PathBuf::from("in.ply"));
                assert!(output.is_none());
                assert!(topology_only);
                assert_eq!(valence3_passes, 4);
            }
            _ => panic!("expected reconstruct"),
        }
    }

    #[test]
    fn test_output_conflicts_with_in_place() {
        let result = Cli::try_parse_from(["unsubdiv", "reconstruct", "a.obj", "b.obj", "--in-place"]);
        assert!(result.is_err());
    }
}
