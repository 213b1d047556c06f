use crate::error::VoxError;
use crate::format::{FileHeader, MAGIC, SUPPORTED_VERSIONS};

/// Validate a file header and return any compatibility warnings.
///
/// Returns Ok(warnings) on success, Err on fatal errors.
/// An unknown version produces a warning, not an error.
pub fn validate_header(header: &FileHeader) -> Result<Vec<String>, VoxError> {
    if header.magic != MAGIC {
        return Err(VoxError::InvalidMagic(header.magic));
    }

    let mut warnings = Vec::new();

    if !SUPPORTED_VERSIONS.contains(&header.version) {
        warnings.push(format!(
            "Unsupported vox version {} (known: {:?}). \
             Decoding continues; unknown records will be skipped.",
            header.version, SUPPORTED_VERSIONS
        ));
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::FORMAT_VERSION;

    #[test]
    fn test_valid_header_no_warnings() {
        let header = FileHeader {
            magic: MAGIC,
            version: FORMAT_VERSION,
        };
        let warnings = validate_header(&header).expect("should succeed");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_version_200_accepted() {
        let header = FileHeader {
            magic: MAGIC,
            version: 200,
        };
        assert!(validate_header(&header).expect("ok").is_empty());
    }

    #[test]
    fn test_version_mismatch_warns() {
        let header = FileHeader {
            magic: MAGIC,
            version: 999,
        };
        let warnings = validate_header(&header).expect("should succeed with warnings");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Unsupported vox version 999"));
    }

    #[test]
    fn test_invalid_magic_rejected() {
        let header = FileHeader {
            magic: *b"NOPE",
            version: FORMAT_VERSION,
        };
        let result = validate_header(&header);
        assert!(matches!(result, Err(VoxError::InvalidMagic(m)) if &m == b"NOPE"));
    }
}
