/// Magic bytes identifying a MagicaVoxel file.
pub const MAGIC: [u8; 4] = *b"VOX ";

/// Version written by this crate's writer.
pub const FORMAT_VERSION: i32 = 150;

/// Versions known to decode without caveats.
pub const SUPPORTED_VERSIONS: [i32; 2] = [150, 200];

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 8;

/// Size of a record header (tag + content length + children length).
pub const RECORD_HEADER_SIZE: usize = 12;

/// Size of an RGBA palette record body.
pub const PALETTE_BYTES: usize = 256 * 4;

/// Size of an IMAP record body.
pub const INDEX_MAP_BYTES: usize = 256;

/// File header. 8 bytes, repr(C) for byte-level parsing.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FileHeader {
    pub magic: [u8; 4],
    pub version: i32,
}

/// Record header preceding every tagged record.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct RecordHeader {
    pub tag: [u8; 4],
    pub content_len: u32,
    pub children_len: u32,
}

/// Record tags the reader dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Main,
    Pack,
    Size,
    Xyzi,
    Rgba,
    Matl,
    /// Legacy material record, superseded by MATL.
    Matt,
    Transform,
    Group,
    Shape,
    Layer,
    RenderObject,
    RenderCamera,
    IndexMap,
    Note,
    Unknown([u8; 4]),
}

impl Tag {
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        match &bytes {
            b"MAIN" => Tag::Main,
            b"PACK" => Tag::Pack,
            b"SIZE" => Tag::Size,
            b"XYZI" => Tag::Xyzi,
            b"RGBA" => Tag::Rgba,
            b"MATL" => Tag::Matl,
            b"MATT" => Tag::Matt,
            b"nTRN" => Tag::Transform,
            b"nGRP" => Tag::Group,
            b"nSHP" => Tag::Shape,
            b"LAYR" => Tag::Layer,
            b"rOBJ" => Tag::RenderObject,
            b"rCAM" => Tag::RenderCamera,
            b"IMAP" => Tag::IndexMap,
            b"NOTE" => Tag::Note,
            _ => Tag::Unknown(bytes),
        }
    }

    pub fn to_bytes(self) -> [u8; 4] {
        match self {
            Tag::Main => *b"MAIN",
            Tag::Pack => *b"PACK",
            Tag::Size => *b"SIZE",
            Tag::Xyzi => *b"XYZI",
            Tag::Rgba => *b"RGBA",
            Tag::Matl => *b"MATL",
            Tag::Matt => *b"MATT",
            Tag::Transform => *b"nTRN",
            Tag::Group => *b"nGRP",
            Tag::Shape => *b"nSHP",
            Tag::Layer => *b"LAYR",
            Tag::RenderObject => *b"rOBJ",
            Tag::RenderCamera => *b"rCAM",
            Tag::IndexMap => *b"IMAP",
            Tag::Note => *b"NOTE",
            Tag::Unknown(bytes) => bytes,
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.to_bytes()))
    }
}
