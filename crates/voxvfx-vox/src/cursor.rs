use std::str::FromStr;

use crate::error::VoxError;

/// String key/value dictionary as stored in scene and material records.
///
/// Keeps file order; a repeated key resolves to its last occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dict(pub Vec<(String, String)>);

impl Dict {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Parse a value, yielding None when absent or unparseable.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key) == Some("1")
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Bounds-checked little-endian reader over a byte slice.
pub struct ByteCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], VoxError> {
        if count > self.remaining() {
            return Err(VoxError::Truncated {
                offset: self.pos,
                needed: count,
                available: self.remaining(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], VoxError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, VoxError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, VoxError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, VoxError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// Length-prefixed string (u32 byte count, then bytes).
    pub fn read_string(&mut self) -> Result<String, VoxError> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// u32 pair count followed by (key, value) strings.
    pub fn read_dict(&mut self) -> Result<Dict, VoxError> {
        let count = self.read_u32()? as usize;
        // Each pair needs at least two length prefixes.
        if count.saturating_mul(8) > self.remaining() {
            return Err(VoxError::Truncated {
                offset: self.pos,
                needed: count.saturating_mul(8),
                available: self.remaining(),
            });
        }
        let mut pairs = Vec::with_capacity(count);
        for _ in 0..count {
            let key = self.read_string()?;
            let value = self.read_string()?;
            pairs.push((key, value));
        }
        Ok(Dict(pairs))
    }
}

/// Little-endian writer mirroring [`ByteCursor`].
#[derive(Default)]
pub struct ByteWriter {
    pub bytes: Vec<u8>,
}

impl ByteWriter {
    pub fn write_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_u32(value.len() as u32);
        self.bytes.extend_from_slice(value.as_bytes());
    }

    pub fn write_dict(&mut self, dict: &Dict) {
        self.write_u32(dict.0.len() as u32);
        for (key, value) in &dict.0 {
            self.write_string(key);
            self.write_string(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dict_roundtrip() {
        let mut dict = Dict::default();
        dict.insert("_t", "1 -2 3");
        dict.insert("_hidden", "1");
        let mut writer = ByteWriter::default();
        writer.write_dict(&dict);

        let mut cursor = ByteCursor::new(&writer.bytes);
        let back = cursor.read_dict().expect("dict");
        assert_eq!(back, dict);
        assert!(back.get_bool("_hidden"));
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_dict_last_key_wins() {
        let dict = Dict(vec![
            ("_d".into(), "0.1".into()),
            ("_d".into(), "0.4".into()),
        ]);
        assert_eq!(dict.get_parsed::<f32>("_d"), Some(0.4));
    }

    #[test]
    fn test_unparseable_value_is_none() {
        let dict = Dict(vec![("_d".into(), "dense".into())]);
        assert_eq!(dict.get_parsed::<f32>("_d"), None);
        assert_eq!(dict.get_parsed::<f32>("_missing"), None);
    }

    #[test]
    fn test_truncated_read_errors() {
        let mut cursor = ByteCursor::new(&[1, 2, 3]);
        let result = cursor.read_u32();
        assert!(matches!(
            result,
            Err(VoxError::Truncated {
                offset: 0,
                needed: 4,
                available: 3
            })
        ));
    }

    #[test]
    fn test_oversized_dict_count_rejected() {
        let mut writer = ByteWriter::default();
        writer.write_u32(u32::MAX);
        let mut cursor = ByteCursor::new(&writer.bytes);
        assert!(matches!(cursor.read_dict(), Err(VoxError::Truncated { .. })));
    }
}
