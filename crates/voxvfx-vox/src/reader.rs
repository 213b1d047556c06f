use glam::{IVec3, UVec3};

use crate::axis::{remap_rotation, remap_size, remap_translation, remap_voxel, Rotation};
use crate::compat;
use crate::cursor::{ByteCursor, Dict};
use crate::error::VoxError;
use crate::format::*;
use crate::material::{MaterialChunk, MaterialKind, MaterialProperties};
use crate::model::{
    GroupNode, Layer, ShapeModel, ShapeNode, TransformFrame, TransformNode, VoxScene, VoxelGrid,
};
use crate::palette::{Palette, Rgba};

/// Largest accepted model side, in voxels. XYZI coordinates are single
/// bytes, so no valid model exceeds this.
pub const MAX_MODEL_DIMENSION: u32 = 256;

/// One item of the read sequence.
#[derive(Debug)]
pub enum ReadStep {
    /// Fraction of the record stream consumed so far, in [0, 1].
    Progress(f32),
    /// Emitted exactly once; None when the stream could not be decoded.
    Finished(Option<VoxScene>),
}

/// Cooperative reader: each call to `next` decodes up to
/// `records_per_step` records, then the sequence ends with one
/// [`ReadStep::Finished`].
pub struct VoxReader {
    bytes: Vec<u8>,
    pos: usize,
    start: usize,
    end: usize,
    records_per_step: usize,
    pending_size: Option<UVec3>,
    scene: Option<VoxScene>,
    done: bool,
}

impl VoxReader {
    /// Validate the header and locate the MAIN record.
    pub fn open(bytes: Vec<u8>) -> Result<Self, VoxError> {
        let min = HEADER_SIZE + RECORD_HEADER_SIZE;
        if bytes.len() < min {
            return Err(VoxError::FileTooSmall(bytes.len(), min));
        }
        let header: FileHeader = bytemuck::pod_read_unaligned(&bytes[..HEADER_SIZE]);
        let warnings = compat::validate_header(&header)?;
        for warning in &warnings {
            log::warn!("{warning}");
        }

        let main: RecordHeader =
            bytemuck::pod_read_unaligned(&bytes[HEADER_SIZE..HEADER_SIZE + RECORD_HEADER_SIZE]);
        if Tag::from_bytes(main.tag) != Tag::Main {
            return Err(VoxError::MissingMain);
        }

        let mut scene = VoxScene::new(header.version);
        scene.warnings = warnings;

        let start = (HEADER_SIZE + RECORD_HEADER_SIZE).saturating_add(main.content_len as usize);
        let declared_end = start.saturating_add(main.children_len as usize);
        let end = declared_end.min(bytes.len());
        if declared_end > bytes.len() {
            let msg = format!(
                "MAIN declares {} bytes of children, only {} present",
                main.children_len,
                end.saturating_sub(start)
            );
            log::warn!("{msg}");
            scene.warnings.push(msg);
        }

        Ok(Self {
            bytes,
            pos: start.min(end),
            start: start.min(end),
            end,
            records_per_step: 1,
            pending_size: None,
            scene: Some(scene),
            done: false,
        })
    }

    /// Decode more records per step (at least one).
    pub fn with_records_per_step(mut self, records: usize) -> Self {
        self.records_per_step = records.max(1);
        self
    }

    pub fn progress(&self) -> f32 {
        let total = self.end - self.start;
        if total == 0 {
            return 1.0;
        }
        ((self.pos - self.start) as f32 / total as f32).clamp(0.0, 1.0)
    }

    fn warn(&mut self, msg: String) {
        log::warn!("{msg}");
        if let Some(scene) = self.scene.as_mut() {
            scene.warnings.push(msg);
        }
    }

    /// Decode one record. Returns false when the stream is exhausted or
    /// cannot be continued.
    fn read_record(&mut self) -> bool {
        if self.pos >= self.end {
            return false;
        }
        if self.end - self.pos < RECORD_HEADER_SIZE {
            self.warn(format!(
                "truncated record header at offset {}, stopping",
                self.pos
            ));
            self.pos = self.end;
            return false;
        }
        let header: RecordHeader =
            bytemuck::pod_read_unaligned(&self.bytes[self.pos..self.pos + RECORD_HEADER_SIZE]);
        let tag = Tag::from_bytes(header.tag);
        let content_start = self.pos + RECORD_HEADER_SIZE;
        let content_end = content_start.saturating_add(header.content_len as usize);
        if content_end > self.end {
            self.warn(format!(
                "truncated {tag} record at offset {} ({} content bytes declared), stopping",
                self.pos, header.content_len
            ));
            self.pos = self.end;
            return false;
        }
        let next = content_end
            .saturating_add(header.children_len as usize)
            .min(self.end);

        let result = {
            let content = &self.bytes[content_start..content_end];
            match self.scene.as_mut() {
                Some(scene) => decode_record(scene, &mut self.pending_size, tag, content),
                None => Ok(()),
            }
        };
        if let Err(err) = result {
            if err.is_fatal() {
                log::error!("{err}; discarding scene");
                self.scene = None;
                self.pos = self.end;
                return false;
            }
            self.warn(format!("{err}; keeping records read so far"));
            self.pos = self.end;
            return false;
        }

        self.pos = next;
        true
    }
}

impl Iterator for VoxReader {
    type Item = ReadStep;

    fn next(&mut self) -> Option<ReadStep> {
        if self.done {
            return None;
        }
        for _ in 0..self.records_per_step {
            if !self.read_record() {
                self.done = true;
                return Some(ReadStep::Finished(self.scene.take()));
            }
        }
        Some(ReadStep::Progress(self.progress()))
    }
}

/// Read a whole file synchronously. Returns None (after logging) when the
/// header is not a recognized container.
pub fn read_scene(bytes: Vec<u8>) -> Option<VoxScene> {
    let reader = match VoxReader::open(bytes) {
        Ok(reader) => reader.with_records_per_step(usize::MAX),
        Err(err) => {
            log::error!("vox read failed: {err}");
            return None;
        }
    };
    for step in reader {
        if let ReadStep::Finished(scene) = step {
            return scene;
        }
    }
    None
}

fn malformed(tag: Tag, reason: impl Into<String>) -> VoxError {
    VoxError::MalformedRecord {
        tag: tag.to_string(),
        reason: reason.into(),
    }
}

fn decode_record(
    scene: &mut VoxScene,
    pending_size: &mut Option<UVec3>,
    tag: Tag,
    content: &[u8],
) -> Result<(), VoxError> {
    let mut c = ByteCursor::new(content);
    match tag {
        Tag::Size => {
            let file = IVec3::new(c.read_i32()?, c.read_i32()?, c.read_i32()?);
            let max = MAX_MODEL_DIMENSION as i32;
            if file.cmple(IVec3::ZERO).any() || file.cmpgt(IVec3::splat(max)).any() {
                return Err(malformed(tag, format!("model size {file} out of range")));
            }
            *pending_size = Some(file.as_uvec3());
        }
        Tag::Xyzi => {
            let file_size = pending_size
                .take()
                .ok_or_else(|| malformed(tag, "voxel list without a preceding SIZE"))?;
            scene.models.push(decode_voxels(&mut c, file_size)?);
        }
        Tag::Rgba => {
            let bytes = c.read_bytes(PALETTE_BYTES)?;
            let mut entries: [Rgba; 256] = [[0; 4]; 256];
            for (entry, chunk) in entries.iter_mut().zip(bytes.chunks_exact(4)) {
                entry.copy_from_slice(chunk);
            }
            scene.palette = Palette::from_file_order(&entries);
        }
        Tag::Matl => {
            let id = c.read_i32()?;
            let dict = c.read_dict()?;
            let kind = MaterialKind::parse(dict.get("_type")).ok_or_else(|| {
                VoxError::UnknownMaterialType {
                    id,
                    kind: dict.get("_type").unwrap_or_default().to_string(),
                }
            })?;
            scene.materials.push(MaterialChunk {
                slot: (id & 0xFF) as u8,
                kind,
                properties: MaterialProperties::from_dict(&dict),
            });
        }
        Tag::Transform => scene.transforms.push(decode_transform(&mut c)?),
        Tag::Group => {
            let id = c.read_i32()?;
            let attributes = c.read_dict()?;
            let count = c.read_u32()? as usize;
            if count.saturating_mul(4) > c.remaining() {
                return Err(malformed(tag, format!("{count} children declared")));
            }
            let children = (0..count)
                .map(|_| c.read_i32())
                .collect::<Result<Vec<_>, _>>()?;
            scene.groups.insert(
                id,
                GroupNode {
                    id,
                    attributes,
                    children,
                },
            );
        }
        Tag::Shape => {
            let id = c.read_i32()?;
            let attributes = c.read_dict()?;
            let count = c.read_u32()? as usize;
            let mut models = Vec::with_capacity(count.min(c.remaining() / 8));
            for _ in 0..count {
                let model_id = c.read_i32()?;
                let attributes = c.read_dict()?;
                models.push(ShapeModel {
                    model_id,
                    attributes,
                });
            }
            scene.shapes.insert(
                id,
                ShapeNode {
                    id,
                    attributes,
                    models,
                },
            );
        }
        Tag::Layer => {
            let id = c.read_i32()?;
            let attributes = c.read_dict()?;
            let _reserved = c.read_i32()?;
            scene.layers.push(Layer { id, attributes });
        }
        Tag::RenderObject => scene.render_settings.push(c.read_dict()?),
        Tag::IndexMap => scene.index_map = Some(c.read_array::<INDEX_MAP_BYTES>()?),
        Tag::Matt | Tag::Pack | Tag::RenderCamera | Tag::Note | Tag::Main => {
            log::debug!("skipping {tag} record ({} bytes)", content.len());
        }
        Tag::Unknown(_) => {
            log::debug!("unknown record tag {tag} ({} bytes), skipped", content.len());
        }
    }
    Ok(())
}

/// Decode an XYZI body into a world-axis grid. Color index 0 and
/// coordinates outside the declared size are dropped.
fn decode_voxels(c: &mut ByteCursor<'_>, file_size: UVec3) -> Result<VoxelGrid, VoxError> {
    let size = remap_size(file_size);
    // SIZE gives counts; the grid is allocated from zero-based extents.
    let mut grid = VoxelGrid::with_extent(size - UVec3::ONE).ok_or_else(|| {
        malformed(Tag::Xyzi, format!("model size {file_size} is not addressable"))
    })?;

    let count = c.read_u32()? as usize;
    let body = c.read_bytes(count.saturating_mul(4))?;
    let mut out_of_range = 0usize;
    for v in body.chunks_exact(4) {
        let color = v[3];
        if color == 0 {
            continue;
        }
        let file = UVec3::new(v[0] as u32, v[1] as u32, v[2] as u32);
        if !file.cmplt(file_size).all() {
            out_of_range += 1;
            continue;
        }
        grid.set(remap_voxel(file, size), color);
    }
    if out_of_range > 0 {
        log::warn!("{out_of_range} voxels outside their model bounds were dropped");
    }
    Ok(grid)
}

fn decode_transform(c: &mut ByteCursor<'_>) -> Result<TransformNode, VoxError> {
    let id = c.read_i32()?;
    let attributes = c.read_dict()?;
    let child_id = c.read_i32()?;
    let _reserved = c.read_i32()?;
    let layer_id = c.read_i32()?;
    let frame_count = c.read_u32()? as usize;
    let mut frames = Vec::with_capacity(frame_count.min(c.remaining() / 4));
    for _ in 0..frame_count {
        frames.push(decode_frame(id, &c.read_dict()?));
    }
    Ok(TransformNode {
        id,
        attributes,
        child_id,
        layer_id,
        frames,
    })
}

fn decode_frame(node_id: i32, dict: &Dict) -> TransformFrame {
    let packed_rotation = dict
        .get_parsed::<u8>("_r")
        .unwrap_or(Rotation::IDENTITY.0);
    let rotation = match Rotation(packed_rotation).matrix() {
        Some(m) => remap_rotation(m),
        None => {
            log::warn!("transform {node_id} has invalid rotation {packed_rotation}, using identity");
            glam::Mat3::IDENTITY
        }
    };

    let parts: Vec<i32> = dict
        .get("_t")
        .map(|t| t.split_whitespace().filter_map(|s| s.parse().ok()).collect())
        .unwrap_or_default();
    let file_translation = if parts.len() == 3 {
        IVec3::new(parts[0], parts[1], parts[2])
    } else {
        IVec3::ZERO
    };

    TransformFrame {
        packed_rotation,
        rotation,
        translation: remap_translation(file_translation).as_vec3(),
        frame_index: dict.get_parsed("_f").unwrap_or(0),
    }
}
