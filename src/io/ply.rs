//! PLY (Stanford polygon) format support.
//!
//! This module provides loading and saving of meshes in the PLY format,
//! also known as the Polygon File Format or Stanford Triangle Format.
//! Polygon faces are kept as they are; nothing is triangulated.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};

use crate::error::{MeshError, Result};
use crate::mesh::{build_from_polygons, to_face_vertex_polygons, HalfEdgeMesh, MeshIndex};

/// Load a mesh from a PLY file.
///
/// # Example
///
/// ```no_run
/// use unsubdiv::io::ply;
/// use unsubdiv::mesh::HalfEdgeMesh;
///
/// let mesh: HalfEdgeMesh = ply::load("model.ply").unwrap();
/// ```
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<HalfEdgeMesh<I>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let (vertices, faces) = parse(&mut reader).map_err(|message| MeshError::LoadError {
        path: path.to_path_buf(),
        message,
    })?;
    build_from_polygons(&vertices, &faces)
}

/// Read vertex positions and polygon faces.
fn parse<R: BufRead>(reader: &mut R) -> std::result::Result<(Vec<Point3<f64>>, Vec<Vec<usize>>), String> {
    let parser = Parser::<DefaultElement>::new();
    let ply = parser.read_ply(reader).map_err(|e| e.to_string())?;

    let vertex_element = ply
        .payload
        .get("vertex")
        .ok_or("PLY file has no vertex element")?;

    let mut vertices: Vec<Point3<f64>> = Vec::with_capacity(vertex_element.len());
    for vertex in vertex_element {
        let x = get_float_property(vertex, "x").ok_or("vertex missing x coordinate")?;
        let y = get_float_property(vertex, "y").ok_or("vertex missing y coordinate")?;
        let z = get_float_property(vertex, "z").ok_or("vertex missing z coordinate")?;
        vertices.push(Point3::new(x, y, z));
    }

    let face_element = ply
        .payload
        .get("face")
        .ok_or("PLY file has no face element")?;

    let mut faces: Vec<Vec<usize>> = Vec::with_capacity(face_element.len());
    for face in face_element {
        let indices = get_list_property(face, "vertex_indices")
            .or_else(|| get_list_property(face, "vertex_index"))
            .ok_or("face missing vertex_indices property")?;
        faces.push(indices);
    }

    if faces.is_empty() {
        return Err("PLY file contains no faces".to_string());
    }
    Ok((vertices, faces))
}

fn get_float_property(element: &DefaultElement, name: &str) -> Option<f64> {
    match element.get(name)? {
        Property::Float(v) => Some(*v as f64),
        Property::Double(v) => Some(*v),
        Property::Int(v) => Some(*v as f64),
        Property::UInt(v) => Some(*v as f64),
        Property::Short(v) => Some(*v as f64),
        Property::UShort(v) => Some(*v as f64),
        Property::Char(v) => Some(*v as f64),
        Property::UChar(v) => Some(*v as f64),
        _ => None,
    }
}

fn get_list_property(element: &DefaultElement, name: &str) -> Option<Vec<usize>> {
    match element.get(name)? {
        Property::ListInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        _ => None,
    }
}

/// Save a mesh to a PLY file (ASCII format).
///
/// Coordinates are written as doubles so a save/load cycle is lossless.
///
/// # Example
///
/// ```no_run
/// use unsubdiv::io::ply;
/// use unsubdiv::mesh::HalfEdgeMesh;
///
/// let mesh: HalfEdgeMesh = HalfEdgeMesh::new();
/// ply::save(&mesh, "output.ply").unwrap();
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

    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "comment Generated by unsubdiv")?;
    writeln!(writer, "element vertex {}", vertices.len())?;
    writeln!(writer, "property double x")?;
    writeln!(writer, "property double y")?;
    writeln!(writer, "property double z")?;
    writeln!(writer, "element face {}", faces.len())?;
    writeln!(writer, "property list uchar int vertex_indices")?;
    writeln!(writer, "end_header")?;

    for v in &vertices {
        writeln!(writer, "{} {} {}", v.x, v.y, v.z)?;
    }

    for f in &faces {
        write!(writer, "{}", f.len())?;
        for v in f {
            write!(writer, " {}", v)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD_AND_TRIANGLE: &str = "ply
format ascii 1.0
element vertex 5
property float x
property float y
property float z
element face 2
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
1 1 0
0 1 0
2 0.5 0
4 0 1 2 3
3 1 4 2
";

    #[test]
    fn test_parse_keeps_polygons() {
        let (vertices, faces) = parse(&mut QUAD_AND_TRIANGLE.as_bytes()).unwrap();
        assert_eq!(vertices.len(), 5);
        assert_eq!(faces, vec![vec![0, 1, 2, 3], vec![1, 4, 2]]);
    }

    #[test]
    fn test_write_then_parse() {
        let (vertices, faces) = parse(&mut QUAD_AND_TRIANGLE.as_bytes()).unwrap();
        let mesh: HalfEdgeMesh = build_from_polygons(&vertices, &faces).unwrap();

        let mut out = Vec::new();
        write(&mesh, &mut out).unwrap();
        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.contains("\n4 0 1 2 3\n"));

        let (again, faces_again) = parse(&mut out.as_slice()).unwrap();
        assert_eq!(again, vertices);
        assert_eq!(faces_again, faces);
    }

    #[test]
    fn test_missing_faces() {
        let text = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 0 0\n";
        let err = parse(&mut text.as_bytes()).unwrap_err();
        assert_eq!(err, "PLY file has no face element");
    }
}
