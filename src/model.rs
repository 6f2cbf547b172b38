//! Assembled, scene-independent model output.
//!
//! Assembly folds a parse session (plus the optional `.temp.bin` sidecar
//! holding texture payloads) into an owned [`Model`]: one mesh per submesh
//! descriptor, materials with texture-table indices resolved, and textures
//! carrying their compressed payload. Nothing in the result borrows the
//! parse buffers.
//!
//! Conventions are normalized here and nowhere else:
//! - positions and normals are remapped from the source axes to the target
//!   convention by the signed permutation `[[1,0,0],[0,0,1],[0,1,0]]`
//!   (swap Y and Z, no translation);
//! - UVs are V-flipped (`v' = 1 - v`) from the source's top-left origin to
//!   a bottom-left origin;
//! - bone weights are passed through as stored, with zero-weight slots
//!   dropped.

use std::collections::HashMap;

use itertools::Itertools;
use rootcause::Report;
use tracing::warn;

use crate::perm::{PermError, PermFile};
use crate::texture::dds::{DdsHeader, write_dds};
use crate::texture::{RgbaImage, TextureError, TextureFormat, dxt};

/// Apply the source-to-target axis permutation to a position or normal.
pub fn remap_axes(v: [f32; 3]) -> [f32; 3] {
    [v[0], v[2], v[1]]
}

/// Flip a UV's V coordinate between top-left and bottom-left origins.
/// Involutive: applying it twice returns the input exactly.
pub fn flip_v(uv: [f32; 2]) -> [f32; 2] {
    [uv[0], 1.0 - uv[1]]
}

/// One bone's influence on a vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BoneInfluence {
    /// Index into [`Model::bone_names`].
    pub bone: u8,
    pub weight: f32,
}

/// Per-vertex bone influences, zero-weight slots filtered out. Weights are
/// not renormalized; the source's sums are trusted.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VertexInfluences {
    pub influences: Vec<BoneInfluence>,
}

/// An extracted texture with its compressed payload resolved from the
/// sidecar. Both output forms are available without re-parsing: a DDS
/// container around the untouched payload, or decoded RGBA pixels.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Texture {
    pub id: u32,
    pub name: String,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub payload: Vec<u8>,
}

impl Texture {
    /// Wrap the compressed payload in a synthesized DDS container.
    pub fn to_dds(&self) -> Vec<u8> {
        let header = DdsHeader::builder()
            .width(self.width)
            .height(self.height)
            .format(self.format)
            .build();
        write_dds(&header, &self.payload)
    }

    /// Decompress the payload to an RGBA8 raster.
    pub fn decode(&self) -> Result<RgbaImage, Report<TextureError>> {
        dxt::decode(self.format, self.width, self.height, &self.payload)
    }
}

/// A material with texture references resolved to [`Model::textures`]
/// indices. `diffuse` is absent for untextured geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Material {
    pub name: String,
    pub diffuse: Option<usize>,
    pub specular: Option<usize>,
}

/// One assembled mesh in target conventions.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Mesh {
    pub name: String,
    /// Index into [`Model::materials`], if the referenced material exists.
    pub material: Option<usize>,
    pub positions: Vec<[f32; 3]>,
    /// Smooth per-vertex normals derived from triangle geometry (the
    /// container stores no normal attribute).
    pub normals: Vec<[f32; 3]>,
    /// Absent for untextured geometry (buildings, weapons).
    pub uvs: Option<Vec<[f32; 2]>>,
    /// Absent for unskinned geometry.
    pub influences: Option<Vec<VertexInfluences>>,
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    /// Whether texture-binding logic has anything to bind.
    pub fn is_textured(&self) -> bool {
        self.uvs.is_some() && self.material.is_some()
    }
}

/// A record that could not be assembled. The remaining records are
/// unaffected; salvage policy is the caller's.
#[derive(Debug, PartialEq, Eq)]
pub enum AssemblyFailure {
    Submesh {
        /// Index into the session's submesh table.
        index: usize,
        /// Absolute file offset of the descriptor.
        offset: usize,
        error: PermError,
    },
    Texture {
        id: u32,
        error: PermError,
    },
    Material {
        name: String,
        error: PermError,
    },
}

/// The assembled model: the sole artifact handed to export adapters.
#[derive(Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub textures: Vec<Texture>,
    /// Flat bone name list for labeling vertex groups. No hierarchy.
    pub bone_names: Vec<String>,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub failures: Vec<AssemblyFailure>,
}

/// Area-weighted smooth vertex normals. Degenerate vertices (no face, or
/// zero-area fan) get a unit Z normal.
fn smooth_normals(positions: &[[f32; 3]], triangles: &[[u32; 3]]) -> Vec<[f32; 3]> {
    let mut acc = vec![[0f32; 3]; positions.len()];

    for tri in triangles {
        let [a, b, c] = tri.map(|i| i as usize);
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let (pa, pb, pc) = (positions[a], positions[b], positions[c]);
        let e1 = [pb[0] - pa[0], pb[1] - pa[1], pb[2] - pa[2]];
        let e2 = [pc[0] - pa[0], pc[1] - pa[1], pc[2] - pa[2]];
        let n = [
            e1[1] * e2[2] - e1[2] * e2[1],
            e1[2] * e2[0] - e1[0] * e2[2],
            e1[0] * e2[1] - e1[1] * e2[0],
        ];
        for &i in &[a, b, c] {
            acc[i][0] += n[0];
            acc[i][1] += n[1];
            acc[i][2] += n[2];
        }
    }

    acc.into_iter()
        .map(|n| {
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            if len > 1e-12 {
                [n[0] / len, n[1] / len, n[2] / len]
            } else {
                [0.0, 0.0, 1.0]
            }
        })
        .collect()
}

impl PermFile<'_> {
    /// Assemble this session into an owned [`Model`]. See [`assemble`].
    pub fn assemble(&self, sidecar: Option<&[u8]>) -> Model {
        assemble(self, sidecar)
    }
}

/// Assemble a parse session into an owned [`Model`].
///
/// `sidecar` is the `.temp.bin` buffer holding texture payloads; without it
/// every texture is recorded as a failure and the geometry still assembles.
pub fn assemble(perm: &PermFile<'_>, sidecar: Option<&[u8]>) -> Model {
    let mut model = Model {
        bone_names: perm.bone_names.clone(),
        ..Model::default()
    };

    // Textures first; materials resolve against this table.
    let mut texture_index = HashMap::new();
    for record in &perm.textures {
        let payload = match sidecar {
            Some(sidecar) => record.payload(sidecar).map(<[u8]>::to_vec),
            None => Err(PermError::MissingTexturePayload {
                texture_id: record.id,
            }),
        };
        match payload {
            Ok(payload) => {
                texture_index.insert(record.id, model.textures.len());
                model.textures.push(Texture {
                    id: record.id,
                    name: record.name.clone(),
                    format: record.format,
                    width: record.width,
                    height: record.height,
                    payload,
                });
            }
            Err(error) => model.failures.push(AssemblyFailure::Texture {
                id: record.id,
                error,
            }),
        }
    }

    let mut material_index = HashMap::new();
    for record in &perm.materials {
        let resolve = |slot: Option<u32>| -> Result<Option<usize>, PermError> {
            match slot {
                None => Ok(None),
                Some(id) => texture_index
                    .get(&id)
                    .copied()
                    .map(Some)
                    .ok_or(PermError::MissingTexture { texture_id: id }),
            }
        };

        let diffuse = match resolve(record.diffuse_texture) {
            Ok(diffuse) => diffuse,
            Err(error) => {
                // An unresolvable binding downgrades the material to
                // untextured; the record itself survives.
                warn!(material = %record.name, "{error}");
                model.failures.push(AssemblyFailure::Material {
                    name: record.name.clone(),
                    error,
                });
                None
            }
        };
        let specular = resolve(record.specular_texture).unwrap_or(None);

        material_index.insert(record.id, model.materials.len());
        model.materials.push(Material {
            name: record.name.clone(),
            diffuse,
            specular,
        });
    }

    for (index, submesh) in perm.submeshes.iter().enumerate() {
        let result = assemble_mesh(perm, submesh, &material_index, index);
        match result {
            Ok(mesh) => model.meshes.push(mesh),
            Err(error) => model.failures.push(AssemblyFailure::Submesh {
                index,
                offset: submesh.offset,
                error,
            }),
        }
    }

    model
}

fn assemble_mesh(
    perm: &PermFile<'_>,
    submesh: &crate::perm::mesh::SubmeshDesc,
    material_index: &HashMap<u32, usize>,
    index: usize,
) -> Result<Mesh, PermError> {
    let position_stream = perm.stream(submesh.position_stream)?;
    let source_positions = position_stream.positions()?;

    let index_stream = perm.stream(submesh.index_stream)?;
    let all_indices = index_stream.indices()?;

    let first = submesh.first_index as usize;
    let count = submesh.triangle_count as usize * 3;
    if first + count > all_indices.len() {
        return Err(PermError::IndexRangeOutOfBounds {
            stream_id: submesh.index_stream,
            first_index: submesh.first_index,
            index_count: count as u32,
            available: all_indices.len(),
        });
    }
    let triangles: Vec<[u32; 3]> = all_indices[first..first + count]
        .iter()
        .copied()
        .tuples()
        .map(|(a, b, c)| [a, b, c])
        .collect();

    // UV and skin streams are optional: geometry without them is simply
    // untextured / unskinned.
    let uvs = match perm.streams.get(&submesh.uv_stream) {
        Some(stream) => {
            let uvs: Vec<[f32; 2]> = stream.uvs()?.into_iter().map(flip_v).collect();
            if uvs.len() != source_positions.len() {
                warn!(
                    submesh = index,
                    uvs = uvs.len(),
                    vertices = source_positions.len(),
                    "UV count does not match vertex count"
                );
            }
            Some(uvs)
        }
        None => None,
    };

    let influences = match perm.streams.get(&submesh.skin_stream) {
        Some(stream) => Some(
            stream
                .skin()?
                .into_iter()
                .map(|skin| VertexInfluences {
                    influences: skin
                        .bone_indices
                        .iter()
                        .zip(skin.weights.iter())
                        .filter(|&(_, &weight)| weight > 0.0)
                        .map(|(&bone, &weight)| BoneInfluence { bone, weight })
                        .collect(),
                })
                .collect(),
        ),
        None => None,
    };

    let material = material_index.get(&submesh.material_id).copied();
    if material.is_none() {
        warn!(
            submesh = index,
            material_id = submesh.material_id,
            "submesh references an unknown material; leaving untextured"
        );
    }

    let positions: Vec<[f32; 3]> = source_positions.into_iter().map(remap_axes).collect();
    let normals = smooth_normals(&positions, &triangles);

    let base = if position_stream.name.is_empty() {
        "mesh"
    } else {
        position_stream.name.as_str()
    };

    Ok(Mesh {
        name: format!("{base}_{index}"),
        material,
        positions,
        normals,
        uvs,
        influences,
        triangles,
    })
}
