use voxvfx_core::material::{default_material_table, MaterialRecord, MaterialTable};

use crate::cursor::Dict;
use crate::palette::Palette;

/// Closed set of MATL surface types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    Diffuse,
    Metal,
    Glass,
    Emit,
    Media,
    Blend,
}

impl MaterialKind {
    /// Parse a `_type` value. A missing type means diffuse.
    pub fn parse(value: Option<&str>) -> Option<MaterialKind> {
        match value {
            None | Some("_diffuse") => Some(MaterialKind::Diffuse),
            Some("_metal") => Some(MaterialKind::Metal),
            Some("_glass") => Some(MaterialKind::Glass),
            Some("_emit") => Some(MaterialKind::Emit),
            Some("_media") => Some(MaterialKind::Media),
            Some("_blend") => Some(MaterialKind::Blend),
            Some(_) => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MaterialKind::Diffuse => "_diffuse",
            MaterialKind::Metal => "_metal",
            MaterialKind::Glass => "_glass",
            MaterialKind::Emit => "_emit",
            MaterialKind::Media => "_media",
            MaterialKind::Blend => "_blend",
        }
    }
}

/// Numeric MATL properties. Missing or unparseable values read as 0.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialProperties {
    pub metallic: f32,
    /// 1 - `_rough`.
    pub smoothness: f32,
    /// `_alpha`, falling back to `_trans`.
    pub alpha: f32,
    pub ior: f32,
    pub emit: f32,
    pub flux: f32,
    /// Raw dictionary, kept for string-valued and late-parsed keys.
    pub raw: Dict,
}

impl MaterialProperties {
    pub fn from_dict(dict: &Dict) -> Self {
        let f = |key: &str| dict.get_parsed::<f32>(key).unwrap_or(0.0);
        Self {
            metallic: f("_metal"),
            smoothness: dict
                .get_parsed::<f32>("_rough")
                .map(|rough| 1.0 - rough)
                .unwrap_or(0.0),
            alpha: dict
                .get_parsed::<f32>("_alpha")
                .or_else(|| dict.get_parsed("_trans"))
                .unwrap_or(0.0),
            ior: f("_ior"),
            emit: f("_emit"),
            flux: f("_flux"),
            raw: dict.clone(),
        }
    }

    /// Media density from `_d`; 0 when absent or unparseable.
    pub fn density(&self) -> f32 {
        self.raw.get_parsed::<f32>("_d").unwrap_or(0.0)
    }

    pub fn media_type(&self) -> Option<&str> {
        self.raw.get("_media_type")
    }
}

impl Default for MaterialProperties {
    fn default() -> Self {
        Self::from_dict(&Dict::default())
    }
}

/// One decoded MATL record.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialChunk {
    /// Color index this material applies to.
    pub slot: u8,
    pub kind: MaterialKind,
    pub properties: MaterialProperties,
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

fn grey(t: f32) -> [f32; 3] {
    let v = lerp(0.0, 1.0, t);
    [v, v, v]
}

fn apply(record: &mut MaterialRecord, kind: MaterialKind, p: &MaterialProperties) {
    match kind {
        MaterialKind::Diffuse => {}
        MaterialKind::Metal => {
            record.metallic = p.metallic;
            record.smoothness = p.smoothness;
        }
        MaterialKind::Glass => {
            record.alpha = 1.0 - p.alpha;
            record.smoothness = p.smoothness;
            record.ior = p.ior;
        }
        MaterialKind::Emit => {
            record.emission = grey(p.emit);
            record.emission_power = lerp(2.0, 12.0, p.flux / 4.0);
            record.ior = p.ior;
        }
        MaterialKind::Media => {
            record.ior = p.ior;
            record.alpha = (1.0 - p.alpha) * p.density() * 10.0;
        }
        MaterialKind::Blend => {
            record.metallic = p.metallic;
            record.smoothness = p.smoothness;
            record.ior = p.ior;
            if p.media_type() == Some("_emit") {
                record.emission = grey(p.emit);
                record.emission_power = p.density() * 10.0;
            }
        }
    }
}

/// Resolve the palette and MATL records into the 256-slot material table.
///
/// Records are applied in order; a later record for the same slot replaces
/// the earlier one's overrides.
pub fn resolve_materials(palette: &Palette, chunks: &[MaterialChunk]) -> MaterialTable {
    let mut table = default_material_table();
    for (slot, record) in table.iter_mut().enumerate() {
        let [r, g, b, _] = palette.0[slot];
        record.color = [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0];
    }
    for chunk in chunks {
        let record = &mut table[chunk.slot as usize];
        let color = record.color;
        *record = MaterialRecord {
            color,
            ..MaterialRecord::default()
        };
        apply(record, chunk.kind, &chunk.properties);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> MaterialProperties {
        let mut dict = Dict::default();
        for (k, v) in pairs {
            dict.insert(*k, *v);
        }
        MaterialProperties::from_dict(&dict)
    }

    fn resolve_one(kind: MaterialKind, properties: MaterialProperties) -> MaterialRecord {
        let chunk = MaterialChunk {
            slot: 10,
            kind,
            properties,
        };
        resolve_materials(&Palette::default(), &[chunk])[10]
    }

    #[test]
    fn test_glass_scenario() {
        let p = MaterialProperties {
            alpha: 0.3,
            smoothness: 0.8,
            ior: 1.2,
            ..MaterialProperties::default()
        };
        let m = resolve_one(MaterialKind::Glass, p);
        assert!((m.alpha - 0.7).abs() < 1e-6);
        assert_eq!(m.smoothness, 0.8);
        assert_eq!(m.ior, 1.2);
        assert!(!m.is_opaque());
    }

    #[test]
    fn test_default_slots_opaque_with_palette_color() {
        let table = resolve_materials(&Palette::default(), &[]);
        assert_eq!(table.len(), 256);
        assert!(table.iter().all(|m| m.alpha == 1.0));
        assert_eq!(table[1].color, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_diffuse_has_no_overrides() {
        let m = resolve_one(MaterialKind::Diffuse, props(&[("_metal", "0.9")]));
        assert_eq!(m.metallic, 0.0);
        assert_eq!(m.alpha, 1.0);
    }

    #[test]
    fn test_metal() {
        let m = resolve_one(
            MaterialKind::Metal,
            props(&[("_metal", "0.6"), ("_rough", "0.25")]),
        );
        assert_eq!(m.metallic, 0.6);
        assert_eq!(m.smoothness, 0.75);
        assert_eq!(m.alpha, 1.0);
    }

    #[test]
    fn test_emit_lerps() {
        let m = resolve_one(
            MaterialKind::Emit,
            props(&[("_emit", "0.5"), ("_flux", "2"), ("_ior", "0.3")]),
        );
        assert_eq!(m.emission, [0.5, 0.5, 0.5]);
        assert_eq!(m.emission_power, 7.0);
        assert_eq!(m.ior, 0.3);
    }

    #[test]
    fn test_emit_power_clamps() {
        let m = resolve_one(MaterialKind::Emit, props(&[("_flux", "40")]));
        assert_eq!(m.emission_power, 12.0);
    }

    #[test]
    fn test_media_density() {
        let m = resolve_one(
            MaterialKind::Media,
            props(&[("_alpha", "0.5"), ("_d", "0.04"), ("_ior", "0.2")]),
        );
        assert!((m.alpha - 0.2).abs() < 1e-6);
        assert_eq!(m.ior, 0.2);
    }

    #[test]
    fn test_media_unparseable_density_is_zero() {
        let m = resolve_one(MaterialKind::Media, props(&[("_d", "thick")]));
        assert_eq!(m.alpha, 0.0);
    }

    #[test]
    fn test_blend_with_emissive_media() {
        let m = resolve_one(
            MaterialKind::Blend,
            props(&[
                ("_metal", "0.1"),
                ("_media_type", "_emit"),
                ("_emit", "0.25"),
                ("_d", "0.3"),
            ]),
        );
        assert_eq!(m.metallic, 0.1);
        assert_eq!(m.emission, [0.25, 0.25, 0.25]);
        assert!((m.emission_power - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_blend_without_emissive_media() {
        let m = resolve_one(
            MaterialKind::Blend,
            props(&[("_media_type", "_absorb"), ("_emit", "0.25"), ("_d", "0.3")]),
        );
        assert_eq!(m.emission, [0.0; 3]);
        assert_eq!(m.emission_power, 0.0);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let chunks = vec![
            MaterialChunk {
                slot: 3,
                kind: MaterialKind::Glass,
                properties: props(&[("_alpha", "0.4"), ("_rough", "0.1")]),
            },
            MaterialChunk {
                slot: 200,
                kind: MaterialKind::Emit,
                properties: props(&[("_emit", "1"), ("_flux", "3")]),
            },
        ];
        let a = resolve_materials(&Palette::default(), &chunks);
        let b = resolve_materials(&Palette::default(), &chunks);
        assert_eq!(
            bytemuck::cast_slice::<MaterialRecord, u8>(&a[..]),
            bytemuck::cast_slice::<MaterialRecord, u8>(&b[..])
        );
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(MaterialKind::parse(None), Some(MaterialKind::Diffuse));
        for kind in [
            MaterialKind::Diffuse,
            MaterialKind::Metal,
            MaterialKind::Glass,
            MaterialKind::Emit,
            MaterialKind::Media,
            MaterialKind::Blend,
        ] {
            assert_eq!(MaterialKind::parse(Some(kind.as_str())), Some(kind));
        }
        assert_eq!(MaterialKind::parse(Some("_plastic")), None);
    }
}
