//! Minimal Wavefront OBJ/MTL loading for the pipeline front end.
//!
//! Supports the subset the voxelizer consumes: vertex positions, texture
//! coordinates, triangulated faces (with fan triangulation of larger
//! polygons), `usemtl`/`mtllib` and diffuse material colors. Texture images
//! are attached programmatically via [`ObjMesh::attach_texture`]; a
//! `map_Kd` without an attached image degrades to the material's diffuse
//! color.

use crate::geometry::{ShadingSource, TexturedTriangle, VisualTriangle};
use crate::pipeline::TriangleStream;
use crate::texture::Texture;
use glam::{Vec2, Vec3};
use log::warn;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}:{line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },
}

#[derive(Clone, Debug, Default)]
struct Material {
    diffuse: Option<Vec3>,
    diffuse_map: Option<String>,
    texture: Option<Arc<Texture>>,
}

#[derive(Copy, Clone, Debug)]
struct Face {
    vertices: [usize; 3],
    uvs: [Option<usize>; 3],
    material: Option<usize>,
}

/// A loaded OBJ model: positions, texture coordinates, triangulated faces
/// and materials.
#[derive(Default, Debug)]
pub struct ObjMesh {
    positions: Vec<f32>,
    uvs: Vec<Vec2>,
    faces: Vec<Face>,
    materials: Vec<Material>,
    material_indices: HashMap<String, usize>,
}

impl ObjMesh {
    /// Loads an OBJ file and any `mtllib` it references (resolved relative
    /// to the OBJ's directory). A missing material library is a warning,
    /// not an error.
    pub fn load(path: &Path) -> Result<Self, MeshError> {
        let text = std::fs::read_to_string(path).map_err(|source| MeshError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mut mesh = ObjMesh::default();
        let mut active_material: Option<usize> = None;

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let mut fields = line.split_whitespace();
            let Some(keyword) = fields.next() else {
                continue;
            };
            let parse_error = |message: String| MeshError::Parse {
                path: path.display().to_string(),
                line: line_no,
                message,
            };

            match keyword {
                "v" => {
                    let [x, y, z] = parse_floats(&mut fields).map_err(parse_error)?;
                    mesh.positions.extend_from_slice(&[x, y, z]);
                }
                "vt" => {
                    let mut parse = || -> Option<f32> { fields.next()?.parse().ok() };
                    let u = parse().ok_or_else(|| {
                        parse_error("texture coordinate needs at least one value".into())
                    })?;
                    let v = parse().unwrap_or(0.0);
                    mesh.uvs.push(Vec2::new(u, v));
                }
                "f" => {
                    mesh.parse_face(fields, active_material)
                        .map_err(parse_error)?;
                }
                "usemtl" => {
                    let name = fields.next().unwrap_or("");
                    active_material = mesh.material_indices.get(name).copied();
                    if active_material.is_none() {
                        warn!("unknown material \"{name}\" used at line {line_no}, faces fall back to the default color");
                    }
                }
                "mtllib" => {
                    for library in fields {
                        let library_path = path
                            .parent()
                            .unwrap_or_else(|| Path::new("."))
                            .join(library);
                        if let Err(e) = mesh.load_mtl(&library_path) {
                            warn!("skipping material library \"{library}\": {e}");
                        }
                    }
                }
                // Normals, groups, smoothing and comments do not affect
                // voxelization.
                _ => {}
            }
        }

        Ok(mesh)
    }

    fn load_mtl(&mut self, path: &Path) -> Result<(), MeshError> {
        let text = std::fs::read_to_string(path).map_err(|source| MeshError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mut current: Option<usize> = None;
        for (index, line) in text.lines().enumerate() {
            let mut fields = line.split_whitespace();
            let Some(keyword) = fields.next() else {
                continue;
            };
            match keyword {
                "newmtl" => {
                    let name = fields.next().unwrap_or("").to_owned();
                    let slot = self.materials.len();
                    self.materials.push(Material::default());
                    self.material_indices.insert(name, slot);
                    current = Some(slot);
                }
                "Kd" => {
                    if let Some(slot) = current {
                        let [r, g, b] =
                            parse_floats(&mut fields).map_err(|message| MeshError::Parse {
                                path: path.display().to_string(),
                                line: index + 1,
                                message,
                            })?;
                        self.materials[slot].diffuse = Some(Vec3::new(r, g, b));
                    }
                }
                "map_Kd" => {
                    if let Some(slot) = current {
                        self.materials[slot].diffuse_map =
                            fields.next_back().map(str::to_owned);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_face<'a>(
        &mut self,
        fields: impl Iterator<Item = &'a str>,
        material: Option<usize>,
    ) -> Result<(), String> {
        let mut vertices = Vec::with_capacity(4);
        for field in fields {
            let mut refs = field.split('/');
            let v = refs
                .next()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| format!("face reference `{field}` has no vertex index"))?;
            let v = resolve_index(v, self.positions.len() / 3)?;
            let uv = match refs.next() {
                Some("") | None => None,
                Some(s) => Some(resolve_index(s, self.uvs.len())?),
            };
            vertices.push((v, uv));
        }
        if vertices.len() < 3 {
            return Err(format!("face has {} vertices, need at least 3", vertices.len()));
        }

        // Fan triangulation of polygons.
        for i in 1..vertices.len() - 1 {
            let corners = [vertices[0], vertices[i], vertices[i + 1]];
            self.faces.push(Face {
                vertices: corners.map(|(v, _)| v),
                uvs: corners.map(|(_, uv)| uv),
                material,
            });
        }
        Ok(())
    }

    /// Attaches a decoded texture image to a named material. Returns false
    /// when the material does not exist.
    pub fn attach_texture(&mut self, material: &str, texture: Arc<Texture>) -> bool {
        match self.material_indices.get(material) {
            Some(&slot) => {
                self.materials[slot].texture = Some(texture);
                true
            }
            None => false,
        }
    }

    /// Names of materials that reference a diffuse texture map, for callers
    /// that want to decode and attach the images.
    pub fn diffuse_map_names(&self) -> impl Iterator<Item = (&str, &str)> {
        self.material_indices.iter().filter_map(|(name, &slot)| {
            self.materials[slot]
                .diffuse_map
                .as_deref()
                .map(|map| (name.as_str(), map))
        })
    }

    pub fn vertex_count(&self) -> u64 {
        (self.positions.len() / 3) as u64
    }

    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    /// Converts the mesh into a stream of visual triangles for the
    /// pipeline.
    pub fn into_stream(self) -> MeshStream {
        let mut unresolved_maps = false;
        let triangles: Vec<VisualTriangle> = self
            .faces
            .iter()
            .map(|face| {
                let v = face.vertices.map(|i| {
                    Vec3::new(
                        self.positions[3 * i],
                        self.positions[3 * i + 1],
                        self.positions[3 * i + 2],
                    )
                });
                let has_uvs = face.uvs.iter().all(Option::is_some);
                let uv = face.uvs.map(|i| i.map_or(Vec2::ZERO, |i| self.uvs[i]));
                let geometry = TexturedTriangle::new(v, uv);

                let shading = match face.material.map(|m| &self.materials[m]) {
                    None => ShadingSource::Default,
                    Some(material) => match &material.texture {
                        Some(texture) if has_uvs => ShadingSource::Textured(Arc::clone(texture)),
                        _ => {
                            if material.diffuse_map.is_some() && material.texture.is_none() {
                                unresolved_maps = true;
                            }
                            match material.diffuse {
                                Some(color) => ShadingSource::Flat(color),
                                None => ShadingSource::Default,
                            }
                        }
                    },
                };
                VisualTriangle::new(geometry, shading)
            })
            .collect();

        if unresolved_maps {
            warn!("some materials name diffuse texture maps that were never attached; using their flat diffuse colors");
        }

        MeshStream {
            positions: self.positions,
            triangles: triangles.into_iter(),
        }
    }
}

/// Resolves a 1-based (or negative, counting from the end) OBJ index.
fn resolve_index(field: &str, len: usize) -> Result<usize, String> {
    let raw: i64 = field
        .parse()
        .map_err(|_| format!("invalid index `{field}`"))?;
    let index = if raw > 0 {
        raw - 1
    } else if raw < 0 {
        len as i64 + raw
    } else {
        return Err("index 0 is not valid in OBJ".into());
    };
    if index < 0 || index as usize >= len {
        return Err(format!("index {raw} is out of range (have {len})"));
    }
    Ok(index as usize)
}

fn parse_floats<'a>(fields: &mut impl Iterator<Item = &'a str>) -> Result<[f32; 3], String> {
    let mut out = [0.0f32; 3];
    for slot in &mut out {
        let field = fields.next().ok_or_else(|| "expected 3 values".to_string())?;
        *slot = field
            .parse()
            .map_err(|_| format!("invalid number `{field}`"))?;
    }
    Ok(out)
}

/// Triangle stream over a loaded OBJ mesh.
pub struct MeshStream {
    positions: Vec<f32>,
    triangles: std::vec::IntoIter<VisualTriangle>,
}

impl TriangleStream for MeshStream {
    fn vertex_count(&self) -> u64 {
        (self.positions.len() / 3) as u64
    }

    fn vertex_positions(&self) -> &[f32] {
        &self.positions
    }

    fn next(&mut self) -> Option<VisualTriangle> {
        self.triangles.next()
    }
}
