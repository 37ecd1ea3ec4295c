use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::PackageError;
use crate::mesh::types::{
    ChunkHeader, FACE16_SIZE, FACE32_SIZE, MATERIAL_NAME_LEN, MATERIAL_SIZE, MeshLod, WEDGE_SIZE,
};

pub struct PskWriter {}

impl PskWriter {
    /// Writes a single LOD as an ActorX static mesh (pskx). `materials` are the slot names in slot order, faces and
    /// wedges refer to them by index.
    pub fn write<W: Write>(wtr: &mut W, lod: &MeshLod, materials: &[String]) -> Result<(), PackageError> {
        PskWriter::validate(lod, materials)?;

        PskWriter::write_header(wtr, &ChunkHeader::new("ACTRHEAD", 0, 0))?;

        PskWriter::write_header(wtr, &ChunkHeader::new("PNTS0000", 12, lod.points.len()))?;
        for point in &lod.points {
            wtr.write_f32::<LittleEndian>(point.x)?;
            wtr.write_f32::<LittleEndian>(point.y)?;
            wtr.write_f32::<LittleEndian>(point.z)?;
        }

        PskWriter::write_header(wtr, &ChunkHeader::new("VTXW0000", WEDGE_SIZE, lod.wedges.len()))?;
        for wedge in &lod.wedges {
            // u16 index + u16 padding in the classic layout, which is byte identical for indices < 65536
            wtr.write_u32::<LittleEndian>(wedge.point)?;
            wtr.write_f32::<LittleEndian>(wedge.uv.x)?;
            wtr.write_f32::<LittleEndian>(wedge.uv.y)?;
            wtr.write_u8(wedge.material)?;
            wtr.write_u8(0)?;
            wtr.write_u16::<LittleEndian>(0)?;
        }

        if lod.wedges.len() > u16::MAX as usize {
            PskWriter::write_header(wtr, &ChunkHeader::new("FACE3200", FACE32_SIZE, lod.faces.len()))?;
            for face in &lod.faces {
                for wedge in face.wedges {
                    wtr.write_u32::<LittleEndian>(wedge)?;
                }
                wtr.write_u8(face.material)?;
                wtr.write_u8(0)?;
                wtr.write_i32::<LittleEndian>(face.smoothing_groups)?;
            }
        } else {
            PskWriter::write_header(wtr, &ChunkHeader::new("FACE0000", FACE16_SIZE, lod.faces.len()))?;
            for face in &lod.faces {
                for wedge in face.wedges {
                    wtr.write_u16::<LittleEndian>(wedge as u16)?;
                }
                wtr.write_u8(face.material)?;
                wtr.write_u8(0)?;
                wtr.write_i32::<LittleEndian>(face.smoothing_groups)?;
            }
        }

        PskWriter::write_header(wtr, &ChunkHeader::new("MATT0000", MATERIAL_SIZE, materials.len()))?;
        for name in materials {
            let mut buf = [0u8; MATERIAL_NAME_LEN];
            let bytes = name.as_bytes();
            // keep a terminating zero
            let len = bytes.len().min(MATERIAL_NAME_LEN - 1);
            buf[..len].copy_from_slice(&bytes[..len]);
            wtr.write_all(&buf)?;

            // texture index, poly flags, aux material, aux flags, lod bias, lod style
            for _ in 0..6 {
                wtr.write_i32::<LittleEndian>(0)?;
            }
        }

        if let Some(normals) = &lod.normals {
            PskWriter::write_header(wtr, &ChunkHeader::new("VTXNORMS", 12, normals.len()))?;
            for normal in normals {
                wtr.write_f32::<LittleEndian>(normal.x)?;
                wtr.write_f32::<LittleEndian>(normal.y)?;
                wtr.write_f32::<LittleEndian>(normal.z)?;
            }
        }

        Ok(())
    }

    fn write_header<W: Write>(wtr: &mut W, header: &ChunkHeader) -> Result<(), PackageError> {
        wtr.write_all(&header.chunk_id)?;
        wtr.write_i32::<LittleEndian>(header.type_flag)?;
        wtr.write_i32::<LittleEndian>(header.data_size)?;
        wtr.write_i32::<LittleEndian>(header.data_count)?;
        Ok(())
    }

    fn validate(lod: &MeshLod, materials: &[String]) -> Result<(), PackageError> {
        if lod.points.is_empty() || lod.faces.is_empty() {
            return Err(PackageError::format("LOD has no geometry"));
        }

        if let Some(wedge) = lod
            .wedges
            .iter()
            .find(|wedge| wedge.point as usize >= lod.points.len())
        {
            return Err(PackageError::format(format!(
                "Wedge references point {} of {}",
                wedge.point,
                lod.points.len()
            )));
        }

        if let Some(face) = lod
            .faces
            .iter()
            .find(|face| face.wedges.iter().any(|&w| w as usize >= lod.wedges.len()))
        {
            return Err(PackageError::format(format!(
                "Face {:?} references a wedge out of {}",
                face.wedges,
                lod.wedges.len()
            )));
        }

        let face_material = lod
            .faces
            .iter()
            .find(|face| face.material as usize >= materials.len());
        if let (false, Some(face)) = (materials.is_empty(), face_material) {
            return Err(PackageError::format(format!(
                "Face references material {} of {}",
                face.material,
                materials.len()
            )));
        }

        if lod
            .normals
            .as_ref()
            .is_some_and(|normals| normals.len() != lod.points.len())
        {
            return Err(PackageError::format("Normal count does not match point count"));
        }

        Ok(())
    }
}
