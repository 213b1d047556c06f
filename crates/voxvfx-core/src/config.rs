use serde::{Deserialize, Serialize};

use crate::constants::{CHUNK_SIZE, MIN_LOD_MARGIN};
use crate::error::ConfigError;
use crate::types::LodLevel;

/// Runtime settings for chunk selection and rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Chunks closer than this render at full detail.
    pub lod0_distance: f32,
    /// Chunks between lod0 and this distance render at half detail.
    pub lod1_distance: f32,
    /// Chunks beyond this radius are never active.
    pub render_distance: f32,
    pub path_tracing: bool,
    /// Tint chunks by LOD level.
    pub debug_lod: bool,
    pub exposure_weight: f32,
    /// Camera rotation (degrees) that can trigger a re-selection.
    pub min_rotation_degrees: f32,
    /// Minimum seconds between rotation-triggered re-selections.
    pub refresh_debounce_secs: f32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            lod0_distance: 300.0,
            lod1_distance: 600.0,
            render_distance: 2000.0,
            path_tracing: false,
            debug_lod: false,
            exposure_weight: -15.0,
            min_rotation_degrees: 1.0,
            refresh_debounce_secs: 0.1,
        }
    }
}

impl RuntimeConfig {
    /// LOD band for a chunk at `distance` from the observer.
    pub fn band_for_distance(&self, distance: f32) -> LodLevel {
        if distance < self.lod0_distance {
            LodLevel::Full
        } else if distance < self.lod1_distance {
            LodLevel::Half
        } else {
            LodLevel::Quarter
        }
    }

    /// Check every distance and clamp the LOD thresholds into a usable order.
    ///
    /// Returns Ok(warnings) describing each adjustment, Err on values that
    /// cannot be repaired.
    pub fn validate(&mut self) -> Result<Vec<String>, ConfigError> {
        for (field, value) in [
            ("lod0_distance", self.lod0_distance),
            ("lod1_distance", self.lod1_distance),
            ("render_distance", self.render_distance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidValue { field, value });
            }
        }
        if !self.min_rotation_degrees.is_finite() || self.min_rotation_degrees < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "min_rotation_degrees",
                value: self.min_rotation_degrees,
            });
        }
        if !self.refresh_debounce_secs.is_finite() || self.refresh_debounce_secs < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "refresh_debounce_secs",
                value: self.refresh_debounce_secs,
            });
        }

        let mut warnings = Vec::new();
        let (lod0, lod1) = clamp_lod_distances(self.lod0_distance, self.lod1_distance);
        if lod0 != self.lod0_distance {
            warnings.push(format!(
                "lod0_distance {} raised to {} (must exceed one chunk)",
                self.lod0_distance, lod0
            ));
        }
        if lod1 != self.lod1_distance {
            warnings.push(format!(
                "lod1_distance {} raised to {} (must be at least {} beyond lod0)",
                self.lod1_distance, lod1, MIN_LOD_MARGIN
            ));
        }
        self.lod0_distance = lod0;
        self.lod1_distance = lod1;
        Ok(warnings)
    }
}

/// Clamp a pair of LOD thresholds: lod0 must exceed one chunk and lod1 must
/// sit at least [`MIN_LOD_MARGIN`] beyond lod0.
pub fn clamp_lod_distances(lod0: f32, lod1: f32) -> (f32, f32) {
    let lod0 = lod0.max(CHUNK_SIZE as f32 + 1.0);
    let lod1 = lod1.max(lod0 + MIN_LOD_MARGIN);
    (lod0, lod1)
}

/// Parse a RON config string. Missing fields take their defaults.
pub fn load_config_from_str(ron_str: &str) -> Result<(RuntimeConfig, Vec<String>), ConfigError> {
    let options = ron::Options::default();
    let mut config: RuntimeConfig = options
        .from_str(ron_str)
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;
    let warnings = config.validate()?;
    for warning in &warnings {
        log::warn!("{warning}");
    }
    Ok((config, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bands() {
        let config = RuntimeConfig::default();
        assert_eq!(config.band_for_distance(0.0), LodLevel::Full);
        assert_eq!(config.band_for_distance(299.9), LodLevel::Full);
        assert_eq!(config.band_for_distance(300.0), LodLevel::Half);
        assert_eq!(config.band_for_distance(599.0), LodLevel::Half);
        assert_eq!(config.band_for_distance(600.0), LodLevel::Quarter);
    }

    #[test]
    fn test_load_partial_ron_uses_defaults() {
        let (config, warnings) =
            load_config_from_str("(lod0_distance: 200.0, path_tracing: true)").expect("parses");
        assert_eq!(config.lod0_distance, 200.0);
        assert_eq!(config.lod1_distance, 600.0);
        assert!(config.path_tracing);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_lod_margin_is_enforced() {
        let (config, warnings) =
            load_config_from_str("(lod0_distance: 400.0, lod1_distance: 420.0)").expect("parses");
        assert_eq!(config.lod1_distance, 450.0);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("lod1_distance"));
    }

    #[test]
    fn test_lod0_must_exceed_chunk() {
        let (lod0, lod1) = clamp_lod_distances(20.0, 60.0);
        assert_eq!(lod0, 101.0);
        assert_eq!(lod1, 151.0);
    }

    #[test]
    fn test_invalid_ron_rejected() {
        let result = load_config_from_str("(lod0_distance: \"near\")");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_negative_render_distance_rejected() {
        let result = load_config_from_str("(render_distance: -5.0)");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                field: "render_distance",
                ..
            })
        ));
    }
}
