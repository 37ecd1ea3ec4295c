use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Geometry payload of a StaticMesh export. Only what the ActorX writer needs is modeled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StaticMeshData {
    #[serde(default)]
    pub lods: Vec<MeshLod>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MeshLod {
    pub points: Vec<Vec3>,
    pub wedges: Vec<MeshWedge>,
    pub faces: Vec<MeshFace>,
    /// One per point, if present.
    #[serde(default)]
    pub normals: Option<Vec<Vec3>>,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MeshWedge {
    pub point: u32,
    pub uv: Vec2,
    #[serde(default)]
    pub material: u8,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MeshFace {
    pub wedges: [u32; 3],
    #[serde(default)]
    pub material: u8,
    #[serde(default)]
    pub smoothing_groups: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkHeader {
    pub chunk_id: [u8; 20],
    pub type_flag: i32,
    pub data_size: i32,
    pub data_count: i32,
}

impl ChunkHeader {
    pub const SIZE: usize = 32;
    pub const TYPE_FLAG: i32 = 1999801;

    pub fn new(name: &str, data_size: usize, data_count: usize) -> Self {
        let mut chunk_id = [0u8; 20];
        let bytes = name.as_bytes();
        let len = bytes.len().min(chunk_id.len());
        chunk_id[..len].copy_from_slice(&bytes[..len]);

        ChunkHeader {
            chunk_id,
            type_flag: Self::TYPE_FLAG,
            data_size: data_size as i32,
            data_count: data_count as i32,
        }
    }
}

pub const WEDGE_SIZE: usize = 16;
pub const FACE16_SIZE: usize = 12;
pub const FACE32_SIZE: usize = 18;
pub const MATERIAL_SIZE: usize = 88;
pub const MATERIAL_NAME_LEN: usize = 64;
