//! Mesh file I/O for STL and OBJ formats.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{WarpError, WarpResult};
use crate::tracing_ext::{log_io_operation, log_mesh_stats};
use crate::{Mesh, Vertex};

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Stl,
    Obj,
}

impl MeshFormat {
    /// Detect format from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .and_then(|ext| match ext.as_str() {
                "stl" => Some(MeshFormat::Stl),
                "obj" => Some(MeshFormat::Obj),
                _ => None,
            })
    }

    fn name(&self) -> &'static str {
        match self {
            MeshFormat::Stl => "stl",
            MeshFormat::Obj => "obj",
        }
    }
}

fn detect_format(path: &Path) -> WarpResult<MeshFormat> {
    MeshFormat::from_path(path).ok_or_else(|| {
        WarpError::unsupported_format(path.extension().and_then(|e| e.to_str()).map(String::from))
    })
}

/// Load a mesh from file, auto-detecting format from extension.
///
/// # Errors
///
/// Fails if the extension is unknown, the file can't be read or parsed,
/// the mesh is empty, or it contains out-of-range indices or non-finite
/// coordinates.
pub fn load_mesh(path: &Path) -> WarpResult<Mesh> {
    let format = detect_format(path)?;

    info!("Loading mesh from {:?} (format: {:?})", path, format);

    let result = match format {
        MeshFormat::Stl => load_stl(path),
        MeshFormat::Obj => load_obj(path),
    }
    .and_then(|mesh| {
        validate_mesh_data(&mesh)?;
        Ok(mesh)
    });

    log_io_operation("load", path, Some(format.name()), result.is_ok());
    if let Ok(mesh) = &result {
        log_mesh_stats(mesh, "loaded");
    }
    result
}

/// Check that a mesh is non-empty, indices are in range and coordinates are finite.
pub fn validate_mesh_data(mesh: &Mesh) -> WarpResult<()> {
    if mesh.is_empty() {
        return Err(WarpError::empty_mesh("mesh has no vertices or faces"));
    }

    let vertex_count = mesh.vertex_count();
    for (face_index, face) in mesh.faces.iter().enumerate() {
        if let Some(&vertex_index) = face.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(WarpError::InvalidVertexIndex {
                face_index,
                vertex_index,
                vertex_count,
            });
        }
    }

    for (vertex_index, v) in mesh.vertices.iter().enumerate() {
        for (coordinate, value) in [("x", v.position.x), ("y", v.position.y), ("z", v.position.z)] {
            if !value.is_finite() {
                return Err(WarpError::InvalidCoordinate {
                    vertex_index,
                    coordinate,
                    value,
                });
            }
        }
    }

    Ok(())
}

/// Load mesh from STL file (binary or ASCII).
fn load_stl(path: &Path) -> WarpResult<Mesh> {
    let file = File::open(path).map_err(|e| WarpError::io_read(path, e))?;
    let mut reader = BufReader::new(file);

    let stl = stl_io::read_stl(&mut reader).map_err(|e| WarpError::parse_error(path, e.to_string()))?;

    debug!(
        "STL contains {} vertices, {} triangles",
        stl.vertices.len(),
        stl.faces.len()
    );

    let mut mesh = Mesh::with_capacity(stl.vertices.len(), stl.faces.len());

    for v in &stl.vertices {
        mesh.vertices
            .push(Vertex::from_coords(v.0[0] as f64, v.0[1] as f64, v.0[2] as f64));
    }

    for face in &stl.faces {
        let indices = [
            face.vertices[0] as u32,
            face.vertices[1] as u32,
            face.vertices[2] as u32,
        ];

        // Skip degenerate triangles
        if indices[0] != indices[1] && indices[1] != indices[2] && indices[0] != indices[2] {
            mesh.faces.push(indices);
        }
    }

    Ok(mesh)
}

/// Load mesh from OBJ file, merging all models into one mesh.
fn load_obj(path: &Path) -> WarpResult<Mesh> {
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|e| WarpError::parse_error(path, e.to_string()))?;

    if models.is_empty() {
        return Err(WarpError::empty_mesh("OBJ file contains no models"));
    }

    let mut mesh = Mesh::new();

    for model in &models {
        let obj_mesh = &model.mesh;
        let vertex_offset = mesh.vertices.len() as u32;
        let has_normals = obj_mesh.normals.len() == obj_mesh.positions.len();

        for (i, chunk) in obj_mesh.positions.chunks_exact(3).enumerate() {
            let mut vertex = Vertex::from_coords(chunk[0], chunk[1], chunk[2]);
            if has_normals {
                let n = &obj_mesh.normals[3 * i..3 * i + 3];
                vertex.normal = Some(nalgebra::Vector3::new(n[0], n[1], n[2]));
            }
            mesh.vertices.push(vertex);
        }

        for chunk in obj_mesh.indices.chunks_exact(3) {
            mesh.faces.push([
                chunk[0] + vertex_offset,
                chunk[1] + vertex_offset,
                chunk[2] + vertex_offset,
            ]);
        }

        debug!("OBJ model '{}': {} positions", model.name, obj_mesh.positions.len() / 3);
    }

    Ok(mesh)
}

/// Save a mesh, choosing the format from the file extension.
pub fn save_mesh(mesh: &Mesh, path: &Path) -> WarpResult<()> {
    let format = detect_format(path)?;

    let result = match format {
        MeshFormat::Stl => save_stl(mesh, path),
        MeshFormat::Obj => save_obj(mesh, path),
    };

    log_io_operation("save", path, Some(format.name()), result.is_ok());
    result
}

/// Save mesh to STL file (binary format).
pub fn save_stl(mesh: &Mesh, path: &Path) -> WarpResult<()> {
    let file = File::create(path).map_err(|e| WarpError::io_write(path, e))?;
    let mut writer = BufWriter::new(file);

    let to_stl = |p: &nalgebra::Point3<f64>| stl_io::Vertex::new([p.x as f32, p.y as f32, p.z as f32]);

    let triangles: Vec<stl_io::Triangle> = mesh
        .triangles()
        .map(|tri| {
            let n = tri.normal().unwrap_or_default();
            stl_io::Triangle {
                normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: [to_stl(&tri.v0), to_stl(&tri.v1), to_stl(&tri.v2)],
            }
        })
        .collect();

    stl_io::write_stl(&mut writer, triangles.iter()).map_err(|e| WarpError::io_write(path, e))?;
    writer.flush().map_err(|e| WarpError::io_write(path, e))?;

    debug!("Saved {} triangles to {:?}", mesh.face_count(), path);

    Ok(())
}

/// Save mesh to OBJ file (ASCII format).
///
/// Writes `v` lines, `vn` lines when any vertex has a normal (zero normals
/// stand in for missing ones so indices stay aligned), and 1-based `f` lines.
pub fn save_obj(mesh: &Mesh, path: &Path) -> WarpResult<()> {
    let file = File::create(path).map_err(|e| WarpError::io_write(path, e))?;
    let mut writer = BufWriter::new(file);

    write_obj(mesh, &mut writer)
        .and_then(|()| writer.flush())
        .map_err(|e| WarpError::io_write(path, e))?;

    debug!(
        "Saved {} vertices and {} faces to {:?}",
        mesh.vertices.len(),
        mesh.faces.len(),
        path
    );

    Ok(())
}

fn write_obj(mesh: &Mesh, writer: &mut impl Write) -> std::io::Result<()> {
    writeln!(writer, "# OBJ file exported by tps-warp")?;
    writeln!(writer, "# Vertices: {}", mesh.vertices.len())?;
    writeln!(writer, "# Faces: {}", mesh.faces.len())?;
    writeln!(writer)?;

    for v in &mesh.vertices {
        writeln!(writer, "v {} {} {}", v.position.x, v.position.y, v.position.z)?;
    }

    let has_normals = mesh.has_normals();
    if has_normals {
        writeln!(writer)?;
        for v in &mesh.vertices {
            let n = v.normal.unwrap_or_default();
            writeln!(writer, "vn {} {} {}", n.x, n.y, n.z)?;
        }
    }

    writeln!(writer)?;
    for face in &mesh.faces {
        let [i0, i1, i2] = face.map(|i| i + 1);
        if has_normals {
            writeln!(writer, "f {}//{} {}//{} {}//{}", i0, i0, i1, i1, i2, i2)?;
        } else {
            writeln!(writer, "f {} {} {}", i0, i1, i2)?;
        }
    }

    Ok(())
}
