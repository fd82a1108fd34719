//! Wavefront OBJ format support.
//!
//! Only geometry is read: `v` records give positions and `f` records give
//! polygon faces. Face tokens may carry texture and normal references
//! (`7/3/2`, `7//2`), which are ignored, and may use negative indices
//! relative to the most recent vertex. Every other record is skipped.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;

use crate::error::{MeshError, Result};
use crate::mesh::{build_from_polygons, to_face_vertex_polygons, HalfEdgeMesh, MeshIndex};

/// Load a mesh from an OBJ file.
///
/// # Example
///
/// ```no_run
/// use unsubdiv::io::obj;
/// use unsubdiv::mesh::HalfEdgeMesh;
///
/// let mesh: HalfEdgeMesh = obj::load("model.obj").unwrap();
/// ```
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<HalfEdgeMesh<I>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let (vertices, faces) = parse(reader).map_err(|message| MeshError::LoadError {
        path: path.to_path_buf(),
        message,
    })?;
    build_from_polygons(&vertices, &faces)
}

fn parse<R: BufRead>(reader: R) -> std::result::Result<(Vec<Point3<f64>>, Vec<Vec<usize>>), String> {
    let mut vertices = Vec::new();
    let mut faces = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| e.to_string())?;
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let mut coord = || -> std::result::Result<f64, String> {
                    tokens
                        .next()
                        .ok_or_else(|| format!("line {}: vertex needs three coordinates", number + 1))?
                        .parse()
                        .map_err(|e| format!("line {}: {}", number + 1, e))
                };
                vertices.push(Point3::new(coord()?, coord()?, coord()?));
            }
            Some("f") => {
                let face = tokens
                    .map(|t| resolve_index(t, vertices.len()))
                    .collect::<Option<Vec<usize>>>()
                    .ok_or_else(|| format!("line {}: bad face index", number + 1))?;
                faces.push(face);
            }
            _ => {}
        }
    }

    if faces.is_empty() {
        return Err("OBJ file contains no faces".to_string());
    }
    Ok((vertices, faces))
}

/// Zero-based vertex index of a face token such as `5`, `5/1/2` or `-1`.
fn resolve_index(token: &str, num_vertices: usize) -> Option<usize> {
    let raw: i64 = token.split('/').next()?.parse().ok()?;
    match raw {
        0 => None,
        r if r > 0 => Some(r as usize - 1),
        r => num_vertices.checked_sub(r.unsigned_abs() as usize),
    }
}

/// Save a mesh to an OBJ file.
///
/// # Example
///
/// ```no_run
/// use unsubdiv::io::obj;
/// use unsubdiv::mesh::HalfEdgeMesh;
///
/// let mesh: HalfEdgeMesh = HalfEdgeMesh::new();
/// obj::save(&mesh, "output.obj").unwrap();
/// ```
pub fn save<P: AsRef<Path>, I: MeshIndex>(mesh: &HalfEdgeMesh<I>, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    write(mesh, &mut writer)?;
    writer.flush()?;
    Ok(())
}

fn write<W: Write, I: MeshIndex>(mesh: &HalfEdgeMesh<I>, writer: &mut W) -> Result<()> {
    let (vertices, faces) = to_face_vertex_polygons(mesh);

    writeln!(writer, "# Generated by unsubdiv")?;
    for v in &vertices {
        writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
    }
    for f in &faces {
        write!(writer, "f")?;
        for v in f {
            write!(writer, " {}", v + 1)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}
