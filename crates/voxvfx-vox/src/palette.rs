use voxvfx_core::constants::MATERIAL_SLOTS;

/// RGBA color, 8 bits per channel.
pub type Rgba = [u8; 4];

/// 256-entry palette addressed by voxel color index.
///
/// A file stores entries in "file order", where entry `k` colors index `k + 1`.
/// Slot 0 receives the last file entry with alpha cleared, since color index 0
/// never appears on a voxel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette(pub [Rgba; MATERIAL_SLOTS]);

impl Palette {
    /// Build a palette from entries in file order.
    pub fn from_file_order(entries: &[Rgba; MATERIAL_SLOTS]) -> Self {
        let mut colors = [[0u8; 4]; MATERIAL_SLOTS];
        colors[1..].copy_from_slice(&entries[..MATERIAL_SLOTS - 1]);
        colors[0] = entries[MATERIAL_SLOTS - 1];
        colors[0][3] = 0;
        Self(colors)
    }

    /// Entries back in file order (inverse of [`Palette::from_file_order`]
    /// except for slot 0's alpha).
    pub fn to_file_order(&self) -> [Rgba; MATERIAL_SLOTS] {
        let mut entries = [[0u8; 4]; MATERIAL_SLOTS];
        entries[..MATERIAL_SLOTS - 1].copy_from_slice(&self.0[1..]);
        entries[MATERIAL_SLOTS - 1] = self.0[0];
        entries
    }

    pub fn color(&self, index: u8) -> Rgba {
        self.0[index as usize]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::from_file_order(&default_file_palette())
    }
}

/// MagicaVoxel's built-in palette in file order.
///
/// A 6×6×6 color cube stepping by 0x33 from white (blue fastest, black
/// excluded), then ten-step red, green, blue and grey ramps, then black.
pub fn default_file_palette() -> [Rgba; MATERIAL_SLOTS] {
    const CUBE: [u8; 6] = [0xff, 0xcc, 0x99, 0x66, 0x33, 0x00];
    const RAMP: [u8; 10] = [0xee, 0xdd, 0xbb, 0xaa, 0x88, 0x77, 0x55, 0x44, 0x22, 0x11];

    let mut entries = Vec::with_capacity(MATERIAL_SLOTS);
    for r in CUBE {
        for g in CUBE {
            for b in CUBE {
                if (r, g, b) != (0, 0, 0) {
                    entries.push([r, g, b, 0xff]);
                }
            }
        }
    }
    for channel in 0..3 {
        for v in RAMP {
            let mut c = [0u8, 0, 0, 0xff];
            c[channel] = v;
            entries.push(c);
        }
    }
    for v in RAMP {
        entries.push([v, v, v, 0xff]);
    }
    entries.push([0, 0, 0, 0xff]);

    let mut out = [[0u8; 4]; MATERIAL_SLOTS];
    out.copy_from_slice(&entries);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_file_palette_landmarks() {
        let p = default_file_palette();
        assert_eq!(p[0], [0xff, 0xff, 0xff, 0xff]);
        assert_eq!(p[1], [0xff, 0xff, 0xcc, 0xff]);
        // Last cube entry, then the start of the red ramp.
        assert_eq!(p[214], [0x00, 0x00, 0x33, 0xff]);
        assert_eq!(p[215], [0xee, 0x00, 0x00, 0xff]);
        assert_eq!(p[225], [0x00, 0xee, 0x00, 0xff]);
        assert_eq!(p[245], [0xee, 0xee, 0xee, 0xff]);
        assert_eq!(p[255], [0x00, 0x00, 0x00, 0xff]);
    }

    #[test]
    fn test_color_index_one_is_first_file_entry() {
        let palette = Palette::default();
        assert_eq!(palette.color(1), [0xff, 0xff, 0xff, 0xff]);
        assert_eq!(palette.color(0)[3], 0);
    }

    #[test]
    fn test_file_order_roundtrip() {
        let mut entries = [[0u8; 4]; MATERIAL_SLOTS];
        for (i, e) in entries.iter_mut().enumerate() {
            *e = [i as u8, 0, 0, 0xff];
        }
        let palette = Palette::from_file_order(&entries);
        assert_eq!(palette.color(5), [4, 0, 0, 0xff]);
        let back = palette.to_file_order();
        assert_eq!(&back[..255], &entries[..255]);
    }
}
