//! Vegetation flammability
//!
//! A vertex's fire properties come from the ground textures painted on it.
//! Each texture maps to a [`Flammability`] through the grass configuration
//! table; overlapping textures are blended by coverage.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::WildfireError;
use crate::settings::FireSettings;

/// Fire properties of one texture or one blended vertex
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Flammability {
    pub can_burn: bool,
    /// Fuel available when the vertex is created
    pub fuel: f32,
    /// Heat needed for ignition
    pub min_burn_heat: f32,
}

impl Flammability {
    /// Properties of a vertex with nothing to burn.
    #[must_use]
    pub fn inert(settings: &FireSettings) -> Self {
        Self {
            can_burn: false,
            fuel: 0.0,
            min_burn_heat: settings.default_min_heat_to_burn,
        }
    }

    /// Default fuel and ignition threshold from the settings.
    #[must_use]
    pub fn from_defaults(settings: &FireSettings, can_burn: bool) -> Self {
        Self {
            can_burn,
            fuel: settings.default_initial_fuel_amount,
            min_burn_heat: settings.default_min_heat_to_burn,
        }
    }
}

/// One texture painted on a vertex
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextureLayer {
    /// Share of the vertex covered, in percent
    pub coverage_percent: f32,
    /// `None` when the texture has no flammability entry
    pub flammability: Option<Flammability>,
}

/// Everything painted on a vertex
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VertexTextures {
    pub layers: Vec<TextureLayer>,
    /// Base texture showing through wherever explicit coverage is below 100%
    pub default_texture: Option<Flammability>,
}

impl VertexTextures {
    /// A vertex fully covered by a single texture.
    #[must_use]
    pub fn single(flammability: Flammability) -> Self {
        Self {
            layers: vec![TextureLayer {
                coverage_percent: 100.0,
                flammability: Some(flammability),
            }],
            default_texture: None,
        }
    }

    /// A vertex showing only its base texture.
    #[must_use]
    pub fn bare(default_texture: Option<Flammability>) -> Self {
        Self {
            layers: Vec::new(),
            default_texture,
        }
    }
}

struct Blend {
    value: Flammability,
    weight: f32,
}

impl Blend {
    fn add(blend: &mut Option<Blend>, entry: Flammability, coverage: f32) {
        match blend {
            None => {
                *blend = Some(Blend {
                    value: entry,
                    weight: coverage,
                });
            }
            Some(acc) => {
                let total = acc.weight + coverage;
                if total > 0.0 {
                    acc.value.fuel = (acc.value.fuel * acc.weight + entry.fuel * coverage) / total;
                    acc.value.min_burn_heat = (acc.value.min_burn_heat * acc.weight
                        + entry.min_burn_heat * coverage)
                        / total;
                }
                acc.value.can_burn |= entry.can_burn;
                acc.weight = total;
            }
        }
    }
}

/// Blend the textures of one vertex into its fire properties.
///
/// The first texture with a flammability entry seeds the result; later ones
/// OR in their burnability and fold their fuel and ignition threshold into a
/// coverage-weighted running average. If explicit coverage sums to less than
/// 100% the default texture fills the remainder. A vertex with nothing to
/// blend is inert.
#[must_use]
pub fn blend_vertex_flammability(textures: &VertexTextures, settings: &FireSettings) -> Flammability {
    let mut blend: Option<Blend> = None;
    let mut explicit_coverage = 0.0;

    for layer in &textures.layers {
        if layer.coverage_percent <= 0.0 {
            continue;
        }
        explicit_coverage += layer.coverage_percent;
        if let Some(entry) = layer.flammability {
            Blend::add(&mut blend, entry, layer.coverage_percent);
        }
    }

    if explicit_coverage < 100.0 {
        if let Some(default_texture) = textures.default_texture {
            Blend::add(&mut blend, default_texture, 100.0 - explicit_coverage);
        }
    }

    let mut result = blend.map_or_else(|| Flammability::inert(settings), |b| b.value);
    if result.min_burn_heat <= 0.0 {
        result.min_burn_heat = settings.default_min_heat_to_burn;
    }
    result.fuel = result.fuel.max(0.0);
    result
}

/// One grass entry of the flammability configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrassFireConfig {
    pub name: String,
    pub can_burn: bool,
    pub fuel: u8,
    pub min_burn_heat: u8,
}

impl GrassFireConfig {
    fn check(&self) -> Result<Flammability, WildfireError> {
        let malformed = |reason: &str| WildfireError::MalformedConfigEntry {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(malformed("empty name"));
        }
        if self.can_burn && self.min_burn_heat == 0 {
            return Err(malformed("burnable grass needs a non-zero minBurnHeat"));
        }
        if self.can_burn && self.fuel == 0 {
            return Err(malformed("burnable grass needs fuel"));
        }
        Ok(Flammability {
            can_burn: self.can_burn,
            fuel: f32::from(self.fuel),
            min_burn_heat: f32::from(self.min_burn_heat),
        })
    }
}

/// Case-insensitive lookup from grass or texture name to flammability
#[derive(Debug, Clone, Default)]
pub struct FlammabilityTable {
    entries: FxHashMap<String, Flammability>,
}

impl FlammabilityTable {
    /// Build the table, skipping entries that cannot be used.
    ///
    /// A malformed entry is logged and left out; duplicate names keep the
    /// first entry. Returns the table and the number of skipped entries.
    pub fn from_configs<I>(configs: I) -> (Self, usize)
    where
        I: IntoIterator<Item = GrassFireConfig>,
    {
        let mut entries = FxHashMap::default();
        let mut skipped = 0;

        for config in configs {
            match config.check() {
                Ok(flammability) => {
                    let key = config.name.trim().to_lowercase();
                    if entries.contains_key(&key) {
                        warn!("Duplicate grass config '{}', keeping the first entry", config.name);
                        skipped += 1;
                        continue;
                    }
                    entries.insert(key, flammability);
                }
                Err(err) => {
                    warn!("Skipping grass config: {err}");
                    skipped += 1;
                }
            }
        }

        (Self { entries }, skipped)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Flammability> {
        self.entries.get(&name.trim().to_lowercase()).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve `(texture name, coverage percent)` pairs into a vertex description.
    #[must_use]
    pub fn resolve<'a, I>(&self, layers: I, default_texture: Option<&str>) -> VertexTextures
    where
        I: IntoIterator<Item = (&'a str, f32)>,
    {
        VertexTextures {
            layers: layers
                .into_iter()
                .map(|(name, coverage_percent)| TextureLayer {
                    coverage_percent,
                    flammability: self.get(name),
                })
                .collect(),
            default_texture: default_texture.and_then(|name| self.get(name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grass(fuel: f32, min_burn_heat: f32) -> Flammability {
        Flammability {
            can_burn: true,
            fuel,
            min_burn_heat,
        }
    }

    fn layer(coverage_percent: f32, flammability: Option<Flammability>) -> TextureLayer {
        TextureLayer {
            coverage_percent,
            flammability,
        }
    }

    #[test]
    fn test_single_texture_passes_through() {
        let settings = FireSettings::default();
        let result = blend_vertex_flammability(&VertexTextures::single(grass(40.0, 20.0)), &settings);
        assert_eq!(result, grass(40.0, 20.0));
    }

    #[test]
    fn test_coverage_weighted_average() {
        let settings = FireSettings::default();
        let rock = Flammability {
            can_burn: false,
            fuel: 0.0,
            min_burn_heat: 100.0,
        };
        let textures = VertexTextures {
            layers: vec![layer(25.0, Some(grass(80.0, 20.0))), layer(75.0, Some(rock))],
            default_texture: None,
        };
        let result = blend_vertex_flammability(&textures, &settings);
        assert!(result.can_burn, "burnability is OR-ed across textures");
        assert_relative_eq!(result.fuel, 20.0);
        assert_relative_eq!(result.min_burn_heat, 80.0);
    }

    #[test]
    fn test_default_texture_fills_missing_coverage() {
        let settings = FireSettings::default();
        let textures = VertexTextures {
            layers: vec![layer(40.0, Some(grass(100.0, 10.0)))],
            default_texture: Some(grass(0.0, 10.0)),
        };
        let result = blend_vertex_flammability(&textures, &settings);
        assert_relative_eq!(result.fuel, 40.0);

        // Full explicit coverage hides the default texture
        let textures = VertexTextures {
            layers: vec![layer(100.0, Some(grass(100.0, 10.0)))],
            default_texture: Some(grass(0.0, 10.0)),
        };
        assert_relative_eq!(blend_vertex_flammability(&textures, &settings).fuel, 100.0);
    }

    #[test]
    fn test_unknown_textures_count_as_coverage() {
        let settings = FireSettings::default();
        let textures = VertexTextures {
            layers: vec![layer(100.0, None)],
            default_texture: Some(grass(50.0, 10.0)),
        };
        let result = blend_vertex_flammability(&textures, &settings);
        assert!(!result.can_burn);
        assert_eq!(result.fuel, 0.0);
        assert_eq!(result.min_burn_heat, settings.default_min_heat_to_burn);
    }

    #[test]
    fn test_table_skips_malformed_entries() {
        let configs = vec![
            GrassFireConfig {
                name: "FieldGrass01".into(),
                can_burn: true,
                fuel: 60,
                min_burn_heat: 20,
            },
            GrassFireConfig {
                name: "  ".into(),
                can_burn: true,
                fuel: 60,
                min_burn_heat: 20,
            },
            GrassFireConfig {
                name: "BrokenGrass".into(),
                can_burn: true,
                fuel: 10,
                min_burn_heat: 0,
            },
            GrassFireConfig {
                name: "fieldgrass01".into(),
                can_burn: false,
                fuel: 0,
                min_burn_heat: 0,
            },
            GrassFireConfig {
                name: "Snow".into(),
                can_burn: false,
                fuel: 0,
                min_burn_heat: 0,
            },
        ];
        let (table, skipped) = FlammabilityTable::from_configs(configs);
        assert_eq!(skipped, 3);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("FIELDGRASS01"), Some(grass(60.0, 20.0)));
        assert_eq!(table.get("snow").map(|f| f.can_burn), Some(false));
        assert!(table.get("BrokenGrass").is_none());
    }

    #[test]
    fn test_resolve_layers() {
        let (table, _) = FlammabilityTable::from_configs(vec![GrassFireConfig {
            name: "Tundra".into(),
            can_burn: true,
            fuel: 30,
            min_burn_heat: 15,
        }]);
        let textures = table.resolve([("tundra", 60.0), ("Rock", 40.0)], Some("Dirt"));
        assert_eq!(textures.layers.len(), 2);
        assert_eq!(textures.layers[0].flammability, Some(grass(30.0, 15.0)));
        assert!(textures.layers[1].flammability.is_none());
        assert!(textures.default_texture.is_none());
    }
}
