use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("buffer {binding}: {len} bytes is not a multiple of stride {stride}")]
    InvalidStride {
        binding: &'static str,
        len: usize,
        stride: usize,
    },

    #[error("catalog has {0} records, expected {1}")]
    CatalogSize(usize, usize),

    #[error("catalog slot {0} out of range")]
    SlotOutOfRange(u32),

    #[error("acceleration structure rejected {count} instances for material {material}: {reason}")]
    InstanceRejected {
        material: u8,
        count: usize,
        reason: String,
    },

    #[error("gpu: {0}")]
    Gpu(String),
}
