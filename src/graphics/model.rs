//! 3D model data
//!
//! Meshes are either loaded from Wavefront OBJ files or generated. The
//! built-in waypoint marker is a double pyramid (octahedron) with one colour
//! per corner.

use std::path::Path;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use super::resource::ResourceError;

/// Colour used for OBJ files without vertex colours
const DEFAULT_COLOR: [f32; 4] = [0.9, 0.9, 0.9, 1.0];

/// Vertex for model meshes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ModelVertex {
    /// Position in model space
    pub position: [f32; 3],
    /// Normal vector (for lighting)
    pub normal: [f32; 3],
    /// Linear RGBA colour
    pub color: [f32; 4],
}

impl ModelVertex {
    /// Size of vertex in bytes
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// Vertex buffer layout for wgpu
    pub fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::SIZE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // normal
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // color
                wgpu::VertexAttribute {
                    offset: 24,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Indexed triangle mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Waypoint marker: a double pyramid centred on the origin
    ///
    /// Corners: top, front-right, front-left, back-right, back-left, bottom.
    /// Faces are wound counter-clockwise seen from outside.
    pub fn waypoint_marker(width: f32, height: f32) -> Self {
        let w2 = width / 2.0;
        let h2 = height / 2.0;

        let corners = [
            ([0.0, h2, 0.0], [1.0, 0.0, 0.0, 1.0]),
            ([w2, 0.0, w2], [0.0, 1.0, 0.0, 1.0]),
            ([-w2, 0.0, w2], [0.0, 0.0, 1.0, 1.0]),
            ([w2, 0.0, -w2], [0.0, 1.0, 1.0, 1.0]),
            ([-w2, 0.0, -w2], [1.0, 1.0, 0.0, 1.0]),
            ([0.0, -h2, 0.0], [1.0, 1.0, 1.0, 1.0]),
        ];

        let vertices = corners
            .iter()
            .map(|&(position, color)| ModelVertex {
                position,
                normal: Vec3::from(position).normalize_or_zero().to_array(),
                color,
            })
            .collect();

        // Ring order around the equator: front-right, front-left, back-left, back-right
        #[rustfmt::skip]
        let indices = vec![
            0, 1, 3,
            0, 3, 4,
            0, 4, 2,
            0, 2, 1,
            5, 3, 1,
            5, 4, 3,
            5, 2, 4,
            5, 1, 2,
        ];

        Self { vertices, indices }
    }

    /// Load and merge every model in an OBJ file
    pub fn load_obj(path: &Path) -> Result<Self, ResourceError> {
        let options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };

        let (models, _materials) = tobj::load_obj(path, &options).map_err(|e| ResourceError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut mesh = Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        };

        for model in &models {
            let source = &model.mesh;
            let base = mesh.vertices.len() as u32;
            let count = source.positions.len() / 3;

            for i in 0..count {
                let position = [
                    source.positions[i * 3],
                    source.positions[i * 3 + 1],
                    source.positions[i * 3 + 2],
                ];
                let normal = if source.normals.len() >= (i + 1) * 3 {
                    [
                        source.normals[i * 3],
                        source.normals[i * 3 + 1],
                        source.normals[i * 3 + 2],
                    ]
                } else {
                    Vec3::from(position).normalize_or_zero().to_array()
                };
                let color = if source.vertex_color.len() >= (i + 1) * 3 {
                    [
                        source.vertex_color[i * 3],
                        source.vertex_color[i * 3 + 1],
                        source.vertex_color[i * 3 + 2],
                        1.0,
                    ]
                } else {
                    DEFAULT_COLOR
                };

                mesh.vertices.push(ModelVertex {
                    position,
                    normal,
                    color,
                });
            }

            mesh.indices
                .extend(source.indices.iter().map(|index| index + base));
        }

        if mesh.indices.is_empty() {
            return Err(ResourceError::EmptyModel(path.to_path_buf()));
        }

        log::info!(
            "Loaded model {} ({} vertices, {} triangles)",
            path.display(),
            mesh.vertices.len(),
            mesh.indices.len() / 3
        );

        Ok(mesh)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// A mesh placed in the world by a model matrix
#[derive(Debug, Clone)]
pub struct Model {
    mesh: Arc<Mesh>,
    matrix: Mat4,
}

impl Model {
    pub fn new(mesh: Arc<Mesh>) -> Self {
        Self {
            mesh,
            matrix: Mat4::IDENTITY,
        }
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    pub fn set_matrix(&mut self, matrix: Mat4) {
        self.matrix = matrix;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_shape() {
        let mesh = Mesh::waypoint_marker(0.75, 1.5);
        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.triangle_count(), 8);
        assert_eq!(mesh.vertices[0].position, [0.0, 0.75, 0.0]);
        assert_eq!(mesh.vertices[5].position, [0.0, -0.75, 0.0]);
        assert_eq!(mesh.vertices[1].position, [0.375, 0.0, 0.375]);
        assert_eq!(mesh.vertices[0].color, [1.0, 0.0, 0.0, 1.0]);
        assert!(mesh.indices.iter().all(|&i| i < 6));
    }

    #[test]
    fn test_marker_faces_point_outward() {
        let mesh = Mesh::waypoint_marker(0.75, 1.5);
        for tri in mesh.indices.chunks_exact(3) {
            let a = Vec3::from(mesh.vertices[tri[0] as usize].position);
            let b = Vec3::from(mesh.vertices[tri[1] as usize].position);
            let c = Vec3::from(mesh.vertices[tri[2] as usize].position);
            let normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(centroid) > 0.0, "face {:?} points inward", tri);
        }
    }

    #[test]
    fn test_load_obj_merges_models() {
        let dir = std::env::temp_dir().join(format!("hud-model-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tri.obj");
        std::fs::write(
            &path,
            "o a\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\no b\nv 0 0 1\nv 1 0 1\nv 0 1 1\nf 4 5 6\n",
        )
        .unwrap();

        let mesh = Mesh::load_obj(&path).unwrap();
        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.triangle_count(), 2);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
        assert_eq!(mesh.vertices[0].color, DEFAULT_COLOR);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_model_matrix_defaults_to_identity() {
        let model = Model::new(Arc::new(Mesh::waypoint_marker(1.0, 1.0)));
        assert_eq!(model.matrix(), Mat4::IDENTITY);
    }
}
