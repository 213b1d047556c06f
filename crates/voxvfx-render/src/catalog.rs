use std::collections::HashMap;

use voxvfx_core::constants::CATALOG_SLOT_COUNT;
use voxvfx_core::types::{ChunkRecord, VoxelRecord};

use crate::error::BackendError;

/// Dense per-slot chunk metadata for the whole world plus the packed voxel
/// payload of every computed slot.
///
/// Slot `chunk * 3 + lod offset` holds one LOD of one chunk. Unfilled slots
/// stay zeroed and never activate.
#[derive(Debug, Clone)]
pub struct ChunkCatalog {
    records: Vec<ChunkRecord>,
    payloads: HashMap<u32, Vec<VoxelRecord>>,
}

impl Default for ChunkCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkCatalog {
    pub fn new() -> Self {
        Self {
            records: vec![ChunkRecord::default(); CATALOG_SLOT_COUNT as usize],
            payloads: HashMap::new(),
        }
    }

    /// Build from an externally produced record array. The array must cover
    /// every slot.
    pub fn from_records(records: Vec<ChunkRecord>) -> Result<Self, BackendError> {
        if records.len() != CATALOG_SLOT_COUNT as usize {
            return Err(BackendError::CatalogSize(
                records.len(),
                CATALOG_SLOT_COUNT as usize,
            ));
        }
        Ok(Self {
            records,
            payloads: HashMap::new(),
        })
    }

    /// Replace every slot record, keeping registered payloads.
    pub fn set_records(&mut self, records: Vec<ChunkRecord>) -> Result<(), BackendError> {
        if records.len() != CATALOG_SLOT_COUNT as usize {
            return Err(BackendError::CatalogSize(
                records.len(),
                CATALOG_SLOT_COUNT as usize,
            ));
        }
        self.records = records;
        Ok(())
    }

    pub fn set_record(&mut self, slot: u32, record: ChunkRecord) -> Result<(), BackendError> {
        let entry = self
            .records
            .get_mut(slot as usize)
            .ok_or(BackendError::SlotOutOfRange(slot))?;
        *entry = record;
        Ok(())
    }

    pub fn set_payload(
        &mut self,
        slot: u32,
        payload: Vec<VoxelRecord>,
    ) -> Result<(), BackendError> {
        if slot >= CATALOG_SLOT_COUNT {
            return Err(BackendError::SlotOutOfRange(slot));
        }
        self.payloads.insert(slot, payload);
        Ok(())
    }

    pub fn record(&self, slot: u32) -> Option<&ChunkRecord> {
        self.records.get(slot as usize)
    }

    pub fn records(&self) -> &[ChunkRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [ChunkRecord] {
        &mut self.records
    }

    /// Packed voxels of a slot; empty when nothing was registered.
    pub fn payload(&self, slot: u32) -> &[VoxelRecord] {
        self.payloads.get(&slot).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of slots with a non-empty payload.
    pub fn loaded_slots(&self) -> usize {
        self.payloads.values().filter(|p| !p.is_empty()).count()
    }

    pub fn total_voxels(&self) -> usize {
        self.payloads.values().map(Vec::len).sum()
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.records)
    }
}
