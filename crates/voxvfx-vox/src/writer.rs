use glam::{IVec3, UVec3};

use crate::axis::Rotation;
use crate::cursor::{ByteWriter, Dict};
use crate::format::*;
use crate::palette::Rgba;

/// A model to serialize, in file axes (Z up).
#[derive(Debug, Clone)]
pub struct WriterModel {
    pub size: UVec3,
    /// (x, y, z, color index) tuples.
    pub voxels: Vec<[u8; 4]>,
}

/// Builds a MagicaVoxel file in memory.
///
/// Records are laid out as the editor writes them: models, scene graph
/// nodes, layers, palette, materials, then any raw records.
#[derive(Debug, Default)]
pub struct SceneWriter {
    models: Vec<WriterModel>,
    nodes: Vec<(Tag, Vec<u8>)>,
    layers: Vec<Vec<u8>>,
    /// Palette in file order. None writes no RGBA record.
    pub palette: Option<[Rgba; 256]>,
    materials: Vec<Vec<u8>>,
    raw: Vec<([u8; 4], Vec<u8>)>,
    pub version: Option<i32>,
}

impl SceneWriter {
    /// Add a model and return its model id.
    pub fn add_model(&mut self, model: WriterModel) -> i32 {
        self.models.push(model);
        self.models.len() as i32 - 1
    }

    /// Add a single-frame transform node. `translation` is in file axes.
    pub fn add_transform(&mut self, id: i32, child_id: i32, rotation: Rotation, translation: IVec3) {
        let mut w = ByteWriter::default();
        w.write_i32(id);
        w.write_dict(&Dict::default());
        w.write_i32(child_id);
        w.write_i32(-1);
        w.write_i32(0);
        w.write_u32(1);
        let mut frame = Dict::default();
        if rotation != Rotation::IDENTITY {
            frame.insert("_r", rotation.0.to_string());
        }
        if translation != IVec3::ZERO {
            frame.insert(
                "_t",
                format!("{} {} {}", translation.x, translation.y, translation.z),
            );
        }
        w.write_dict(&frame);
        self.nodes.push((Tag::Transform, w.bytes));
    }

    pub fn add_group(&mut self, id: i32, children: &[i32]) {
        let mut w = ByteWriter::default();
        w.write_i32(id);
        w.write_dict(&Dict::default());
        w.write_u32(children.len() as u32);
        for child in children {
            w.write_i32(*child);
        }
        self.nodes.push((Tag::Group, w.bytes));
    }

    pub fn add_shape(&mut self, id: i32, model_ids: &[i32]) {
        let mut w = ByteWriter::default();
        w.write_i32(id);
        w.write_dict(&Dict::default());
        w.write_u32(model_ids.len() as u32);
        for model_id in model_ids {
            w.write_i32(*model_id);
            w.write_dict(&Dict::default());
        }
        self.nodes.push((Tag::Shape, w.bytes));
    }

    pub fn add_layer(&mut self, id: i32, name: &str) {
        let mut w = ByteWriter::default();
        w.write_i32(id);
        let mut dict = Dict::default();
        dict.insert("_name", name);
        w.write_dict(&dict);
        w.write_i32(-1);
        self.layers.push(w.bytes);
    }

    pub fn add_material(&mut self, id: i32, properties: Dict) {
        let mut w = ByteWriter::default();
        w.write_i32(id);
        w.write_dict(&properties);
        self.materials.push(w.bytes);
    }

    pub fn add_raw_record(&mut self, tag: [u8; 4], content: Vec<u8>) {
        self.raw.push((tag, content));
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut children = Vec::new();
        for model in &self.models {
            let mut size = ByteWriter::default();
            size.write_i32(model.size.x as i32);
            size.write_i32(model.size.y as i32);
            size.write_i32(model.size.z as i32);
            push_record(&mut children, Tag::Size.to_bytes(), &size.bytes);

            let mut xyzi = ByteWriter::default();
            xyzi.write_u32(model.voxels.len() as u32);
            for v in &model.voxels {
                xyzi.bytes.extend_from_slice(v);
            }
            push_record(&mut children, Tag::Xyzi.to_bytes(), &xyzi.bytes);
        }
        for (tag, content) in &self.nodes {
            push_record(&mut children, tag.to_bytes(), content);
        }
        for layer in &self.layers {
            push_record(&mut children, Tag::Layer.to_bytes(), layer);
        }
        if let Some(palette) = &self.palette {
            let bytes: Vec<u8> = palette.iter().flatten().copied().collect();
            push_record(&mut children, Tag::Rgba.to_bytes(), &bytes);
        }
        for material in &self.materials {
            push_record(&mut children, Tag::Matl.to_bytes(), material);
        }
        for (tag, content) in &self.raw {
            push_record(&mut children, *tag, content);
        }

        let mut out = Vec::with_capacity(HEADER_SIZE + RECORD_HEADER_SIZE + children.len());
        let header = FileHeader {
            magic: MAGIC,
            version: self.version.unwrap_or(FORMAT_VERSION),
        };
        out.extend_from_slice(bytemuck::bytes_of(&header));
        let main = RecordHeader {
            tag: Tag::Main.to_bytes(),
            content_len: 0,
            children_len: children.len() as u32,
        };
        out.extend_from_slice(bytemuck::bytes_of(&main));
        out.extend_from_slice(&children);
        out
    }
}

fn push_record(out: &mut Vec<u8>, tag: [u8; 4], content: &[u8]) {
    let header = RecordHeader {
        tag,
        content_len: content.len() as u32,
        children_len: 0,
    };
    out.extend_from_slice(bytemuck::bytes_of(&header));
    out.extend_from_slice(content);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_layout() {
        let bytes = SceneWriter::default().to_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE + RECORD_HEADER_SIZE);
        assert_eq!(&bytes[0..4], b"VOX ");
        assert_eq!(i32::from_le_bytes(bytes[4..8].try_into().expect("4 bytes")), 150);
        assert_eq!(&bytes[8..12], b"MAIN");
    }

    #[test]
    fn test_model_record_sizes() {
        let mut writer = SceneWriter::default();
        writer.add_model(WriterModel {
            size: UVec3::new(1, 2, 3),
            voxels: vec![[0, 0, 0, 1], [0, 1, 2, 2]],
        });
        let bytes = writer.to_bytes();
        // header + MAIN + SIZE(12 + 12) + XYZI(12 + 4 + 8)
        assert_eq!(bytes.len(), 8 + 12 + 24 + 24);
    }
}
