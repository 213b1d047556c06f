/// Errors that can occur while decoding a MagicaVoxel file.
#[derive(Debug, thiserror::Error)]
pub enum VoxError {
    #[error("not a recognized container (magic {0:?}, expected \"VOX \")")]
    InvalidMagic([u8; 4]),

    #[error("file too small ({0} bytes, minimum {1})")]
    FileTooSmall(usize, usize),

    #[error("missing MAIN record")]
    MissingMain,

    #[error("truncated data at offset {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("malformed {tag} record: {reason}")]
    MalformedRecord { tag: String, reason: String },

    #[error("material {id} has unknown type {kind:?}")]
    UnknownMaterialType { id: i32, kind: String },
}

impl VoxError {
    /// Errors that void the whole scene instead of truncating it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, VoxError::UnknownMaterialType { .. })
    }
}
