//! Hero model loading.
//!
//! The model is a binary glTF container. Its default scene is flattened into
//! model-space triangle meshes so the renderer only ever deals with one node.
//! Fetching runs on the tokio blocking pool and resolves a oneshot channel
//! that the viewport session polls once per frame.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::{Mat3, Mat4, Vec3};
use log::{debug, info};
use tokio::sync::oneshot;

use crate::error::AssetError;
use crate::lights::model_glow;
use crate::math::{Aabb, Transform};
use crate::scene::{ModelNode, SceneObject};

/// Scene node name the loaded model is inserted under.
pub const MODEL_NODE: &str = "hero_model";

/// One triangle mesh in model space.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// A decoded model ready to be placed in the scene.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub meshes: Vec<MeshData>,
    /// Bounds over every vertex, before any node transform.
    pub bounds: Aabb,
}

impl LoadedModel {
    /// Fails with [`AssetError::Empty`] when no mesh has a triangle.
    pub fn from_meshes(meshes: Vec<MeshData>) -> Result<Self, AssetError> {
        let meshes: Vec<MeshData> = meshes.into_iter().filter(|m| m.triangle_count() > 0).collect();
        let bounds = Aabb::from_points(
            meshes
                .iter()
                .flat_map(|m| m.positions.iter().copied().map(Vec3::from)),
        )
        .ok_or(AssetError::Empty)?;
        Ok(Self { meshes, bounds })
    }
}

/// Decode a `.glb`/`.gltf` byte slice. Only geometry buffers are loaded;
/// images are never decoded, so texture encodings don't matter.
pub fn decode_gltf(bytes: &[u8]) -> Result<LoadedModel, AssetError> {
    let gltf = gltf::Gltf::from_slice(bytes)?;
    let document = gltf.document;
    let buffers = gltf::import_buffers(&document, None, gltf.blob)?;

    let mut meshes = Vec::new();
    match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => {
            for node in scene.nodes() {
                collect_node(&node, Mat4::IDENTITY, &buffers, &mut meshes);
            }
        }
        None => {
            for mesh in document.meshes() {
                collect_mesh(&mesh, Mat4::IDENTITY, &buffers, &mut meshes);
            }
        }
    }

    LoadedModel::from_meshes(meshes)
}

/// Read and decode a model file from disk.
pub fn load_model_file(path: &Path) -> Result<LoadedModel, AssetError> {
    let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let model = decode_gltf(&bytes)?;
    info!(
        "loaded {} ({} meshes, {} triangles)",
        path.display(),
        model.meshes.len(),
        model.meshes.iter().map(MeshData::triangle_count).sum::<usize>()
    );
    Ok(model)
}

fn collect_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<MeshData>,
) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        collect_mesh(&mesh, world, buffers, out);
    }
    for child in node.children() {
        collect_node(&child, world, buffers, out);
    }
}

fn collect_mesh(mesh: &gltf::Mesh, world: Mat4, buffers: &[gltf::buffer::Data], out: &mut Vec<MeshData>) {
    let normal_matrix = Mat3::from_mat4(world).inverse().transpose();

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            continue;
        }
        let reader = primitive.reader(|b| buffers.get(b.index()).map(|data| data.0.as_slice()));
        let Some(positions) = reader.read_positions() else {
            continue;
        };
        let positions: Vec<[f32; 3]> = positions
            .map(|p| world.transform_point3(Vec3::from(p)).to_array())
            .collect();

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };

        let normals = match reader.read_normals() {
            Some(normals) => normals
                .map(|n| (normal_matrix * Vec3::from(n)).normalize_or_zero().to_array())
                .collect(),
            None => face_normals(&positions, &indices),
        };

        let base_color = primitive.material().pbr_metallic_roughness().base_color_factor();
        let colors = vec![base_color; positions.len()];

        out.push(MeshData {
            positions,
            normals,
            colors,
            indices,
        });
    }
}

/// Smooth normals accumulated from the faces touching each vertex.
fn face_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let (pa, pb, pc) = (
            Vec3::from(positions[a]),
            Vec3::from(positions[b]),
            Vec3::from(positions[c]),
        );
        let n = (pb - pa).cross(pc - pa);
        normals[a] += n;
        normals[b] += n;
        normals[c] += n;
    }
    normals.into_iter().map(|n| n.normalize_or_zero().to_array()).collect()
}

/// Scale the model, move its bounding-box centroid to the origin and wrap it
/// in a scene node.
pub fn place_model(model: LoadedModel, scale: f32, attach_glow: bool) -> SceneObject {
    let mut transform = Transform::identity();
    transform.scale = Vec3::splat(scale);
    let center = model.bounds.transformed(&transform.matrix()).center();
    transform.position -= center;

    let attached_lights = if attach_glow { vec![model_glow()] } else { Vec::new() };
    SceneObject::model(
        MODEL_NODE,
        transform,
        ModelNode {
            model: Arc::new(model),
            attached_lights,
        },
    )
}

/// A load that has been started but may not have resolved yet.
#[derive(Debug)]
pub struct PendingModel {
    rx: oneshot::Receiver<Result<LoadedModel, AssetError>>,
}

impl PendingModel {
    pub fn new(rx: oneshot::Receiver<Result<LoadedModel, AssetError>>) -> Self {
        Self { rx }
    }

    /// `None` while in flight. A source that dropped its sender resolves to
    /// [`AssetError::Abandoned`].
    pub fn poll(&mut self) -> Option<Result<LoadedModel, AssetError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(AssetError::Abandoned)),
        }
    }
}

/// Where the viewport fetches its model from.
pub trait ModelSource {
    /// Start fetching `path`. Must not block.
    fn fetch(&self, path: &str) -> PendingModel;
}

/// Reads models from a directory standing in for the deployed site root.
pub struct GltfFileSource {
    site_root: PathBuf,
    runtime: tokio::runtime::Handle,
}

impl GltfFileSource {
    pub fn new(site_root: impl Into<PathBuf>, runtime: tokio::runtime::Handle) -> Self {
        Self {
            site_root: site_root.into(),
            runtime,
        }
    }

    /// Resolve a site-absolute path such as `/models/3d.glb`.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.site_root.join(path.trim_start_matches('/'))
    }
}

impl ModelSource for GltfFileSource {
    fn fetch(&self, path: &str) -> PendingModel {
        let (tx, rx) = oneshot::channel();
        let full_path = self.resolve(path);
        debug!("fetching {}", full_path.display());

        self.runtime.spawn_blocking(move || {
            let result = load_model_file(&full_path);
            if tx.send(result).is_err() {
                debug!("viewport torn down before {} resolved", full_path.display());
            }
        });
        PendingModel::new(rx)
    }
}
