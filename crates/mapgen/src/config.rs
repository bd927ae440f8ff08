//! Per-variant configuration (§6.5): chunk geometry, pass flags, tunable
//! floats, and the noise parameter set a terrain variant draws on.

use crate::noise::NoiseParams;
use bitflags::bitflags;
use mapgen_core::registry::ContentId;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Absence of a flag disables its pass entirely; the pass is otherwise
    /// always run.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct MapgenFlags: u32 {
        const CAVES            = 1 << 0;
        const DUNGEONS         = 1 << 1;
        const DECORATIONS      = 1 << 2;
        const LIGHT            = 1 << 3;
        const MOUNTAINS        = 1 << 4;
        const RIDGES           = 1 << 5;
        const VALLEYS_CLIFFS   = 1 << 6;
        const VALLEYS_RUGGED   = 1 << 7;
    }
}

impl Default for MapgenFlags {
    fn default() -> Self {
        MapgenFlags::CAVES | MapgenFlags::DUNGEONS | MapgenFlags::DECORATIONS | MapgenFlags::LIGHT
    }
}

/// Cached node ids used by every pass, resolved once at construction from
/// the external node registry (with degraded-aesthetic fallbacks already
/// applied by the caller).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIds {
    pub air: ContentId,
    pub ignore: ContentId,
    pub stone: ContentId,
    pub water_source: ContentId,
    pub lava_source: ContentId,
    pub desert_stone: ContentId,
    pub sandstone: ContentId,
    pub ice: ContentId,
    pub cobble: ContentId,
    pub mossy_cobble: ContentId,
    pub stair_cobble: ContentId,
    pub dirt: ContentId,
    pub dirt_with_grass: ContentId,
    pub sand: ContentId,
}

/// The noise fields shared by the biome classifier plus every variant's
/// geometry fields. Not every field is read by every variant; unused ones
/// for a given variant are simply never sampled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseParamSet {
    pub np_heat: NoiseParams,
    pub np_heat_blend: NoiseParams,
    pub np_humidity: NoiseParams,
    pub np_humidity_blend: NoiseParams,
    pub np_terrain_base: NoiseParams,
    pub np_terrain_alt: NoiseParams,
    pub np_terrain_persist: NoiseParams,
    pub np_height_select: NoiseParams,
    pub np_mountain: NoiseParams,
    pub np_ridge: NoiseParams,
    pub np_ridge_uwater: NoiseParams,
    pub np_filler_depth: NoiseParams,
    pub np_cave1: NoiseParams,
    pub np_cave2: NoiseParams,
    pub np_cave_liquids: NoiseParams,
    pub np_dungeon_rarity: NoiseParams,
    pub np_dungeon_wetness: NoiseParams,
    pub np_dungeon_density: NoiseParams,
    pub np_valley_river: NoiseParams,
    pub np_valley_depth: NoiseParams,
    pub np_valley_profile: NoiseParams,
    pub np_watershed_ridge: NoiseParams,
    pub np_watershed_valley: NoiseParams,
    pub np_watershed_plateau: NoiseParams,
}

/// Configuration tunables for one mapgen variant invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapgenParams {
    pub flags: MapgenFlags,
    pub water_level: i16,
    pub chunksize: i16,
    pub cave_width: f64,
    pub river_size: f64,
    pub altitude_chill: f64,
    pub cave_water_height: i16,
    pub lava_max_height: i16,
    pub nodes: NoiseParamSet,
}

impl MapgenParams {
    pub fn flag(&self, f: MapgenFlags) -> bool {
        self.flags.contains(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags_enable_caves_and_dungeons() {
        let flags = MapgenFlags::default();
        assert!(flags.contains(MapgenFlags::CAVES));
        assert!(flags.contains(MapgenFlags::DUNGEONS));
    }

    #[test]
    fn flags_can_be_cleared_individually() {
        let mut flags = MapgenFlags::default();
        flags.remove(MapgenFlags::CAVES);
        assert!(!flags.contains(MapgenFlags::CAVES));
        assert!(flags.contains(MapgenFlags::DUNGEONS));
    }
}
