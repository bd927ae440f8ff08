//! Biome classification from climate noise (component C3).

use crate::noise::{Noise, NoiseParams};
use mapgen_core::registry::ContentId;
use serde::{Deserialize, Serialize};

/// The sentinel returned when no registered biome matches a column's
/// climate coordinates and altitude. Maps to default stone everywhere.
pub const BIOME_NONE: u8 = 0;

/// Surface materials and layer depths for one biome, looked up externally
/// once and cached by the owning `BiomeGen`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomeDescriptor {
    pub id: u8,
    pub top: ContentId,
    pub filler: ContentId,
    pub stone: ContentId,
    pub water_top: ContentId,
    pub water: ContentId,
    pub river_water: ContentId,
    pub riverbed: ContentId,
    pub dust: ContentId,
    pub depth_top: u16,
    pub depth_filler: u16,
    pub depth_water_top: u16,
    pub depth_riverbed: u16,
    pub y_min: i16,
    pub y_max: i16,
    pub heat_point: f32,
    pub humidity_point: f32,
}

impl BiomeDescriptor {
    /// A degraded-aesthetic default used when no biome is registered at all.
    pub fn none(stone: ContentId) -> Self {
        Self {
            id: BIOME_NONE,
            top: stone,
            filler: stone,
            stone,
            water_top: stone,
            water: stone,
            river_water: stone,
            riverbed: stone,
            dust: mapgen_core::registry::CONTENT_IGNORE,
            depth_top: 0,
            depth_filler: 0,
            depth_water_top: 0,
            depth_riverbed: 0,
            y_min: i16::MIN,
            y_max: i16::MAX,
            heat_point: 0.0,
            humidity_point: 0.0,
        }
    }
}

/// Evaluates heat/humidity noise fields and classifies columns into
/// registered biomes.
pub struct BiomeGen {
    biomes: Vec<BiomeDescriptor>,
    np_heat: NoiseParams,
    np_heat_blend: NoiseParams,
    np_humidity: NoiseParams,
    np_humidity_blend: NoiseParams,
    seed: i64,
    fallback: BiomeDescriptor,
}

impl BiomeGen {
    pub fn new(
        seed: i64,
        biomes: Vec<BiomeDescriptor>,
        np_heat: NoiseParams,
        np_heat_blend: NoiseParams,
        np_humidity: NoiseParams,
        np_humidity_blend: NoiseParams,
        fallback_stone: ContentId,
    ) -> Self {
        Self {
            biomes,
            np_heat,
            np_heat_blend,
            np_humidity,
            np_humidity_blend,
            seed,
            fallback: BiomeDescriptor::none(fallback_stone),
        }
    }

    /// Point-query heat and humidity at a column, including their blend
    /// fields (added to the primary fields).
    pub fn climate_at(&self, x: f64, z: f64) -> (f32, f32) {
        let heat = crate::noise::noise2d_perlin(x, z, self.seed + 35, &self.np_heat)
            + crate::noise::noise2d_perlin(x, z, self.seed + 13, &self.np_heat_blend);
        let humidity = crate::noise::noise2d_perlin(x, z, self.seed + 12, &self.np_humidity)
            + crate::noise::noise2d_perlin(x, z, self.seed + 59, &self.np_humidity_blend);
        (heat as f32, humidity as f32)
    }

    /// Returns the registered biome minimising squared climate distance,
    /// subject to the altitude band, or the `BIOME_NONE` sentinel if none
    /// of the candidates' bands contain `y`.
    pub fn get_biome(&self, heat: f32, humidity: f32, y: i16) -> &BiomeDescriptor {
        self.biomes
            .iter()
            .filter(|b| y >= b.y_min && y <= b.y_max)
            .min_by(|a, b| {
                let da = climate_distance(a, heat, humidity);
                let db = climate_distance(b, heat, humidity);
                da.partial_cmp(&db).unwrap()
            })
            .unwrap_or(&self.fallback)
    }

    /// Vectorised column-wise classification over a rectangular map.
    pub fn calc_biomes(&self, sx: usize, sz: usize, min_x: f64, min_z: f64, heightmap: &[i16]) -> Vec<u8> {
        let mut out = vec![BIOME_NONE; sx * sz];
        for zi in 0..sz {
            for xi in 0..sx {
                let x = min_x + xi as f64;
                let z = min_z + zi as f64;
                let (heat, humidity) = self.climate_at(x, z);
                let y = heightmap[zi * sx + xi];
                out[zi * sx + xi] = self.get_biome(heat, humidity, y).id;
            }
        }
        out
    }

    pub fn biome_by_id(&self, id: u8) -> &BiomeDescriptor {
        self.biomes.iter().find(|b| b.id == id).unwrap_or(&self.fallback)
    }
}

fn climate_distance(b: &BiomeDescriptor, heat: f32, humidity: f32) -> f32 {
    let dh = heat - b.heat_point;
    let dq = humidity - b.humidity_point;
    dh * dh + dq * dq
}
