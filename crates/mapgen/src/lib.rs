//! Deterministic procedural terrain, cave, and dungeon generation.
//!
//! One [`Mapgen`] is constructed once per world (seed + variant + cached
//! node ids) and called once per mapchunk via [`Mapgen::generate`]. Per-call
//! state never persists between calls; only the cached parameters and seed
//! live on the generator object, matching the lifecycle contract: no
//! wall-clock, thread id, or allocation address may influence output (I4).

pub mod biome;
pub mod caves;
pub mod config;
pub mod dungeon;
pub mod error;
pub mod liquid;
pub mod noise;
pub mod prng;
pub mod schematic;
pub mod terrain;
pub mod voxel;

pub use biome::{BiomeDescriptor, BiomeGen};
pub use config::{MapgenFlags, MapgenParams, NodeIds};
pub use error::ContractViolation;
pub use liquid::LiquidQueue;
pub use mapgen_core::pos::Pos3;
pub use terrain::{Heightmap, Variant};
pub use voxel::{Voxel, VoxelArea, VoxelFlags, VoxelManipulator};

use tracing::instrument;

/// Per-column biome ids produced alongside the heightmap.
#[derive(Debug, Clone)]
pub struct Biomemap {
    pub sx: usize,
    pub sz: usize,
    pub ids: Vec<u8>,
}

impl Biomemap {
    pub fn get(&self, xi: usize, zi: usize) -> u8 {
        self.ids[zi * self.sx + xi]
    }
}

/// Immutable inputs for one mapchunk generation call (§3).
pub struct MapchunkRequest<'vm> {
    pub seed: u64,
    pub blockpos_min: Pos3,
    pub blockpos_max: Pos3,
    pub vm: &'vm mut VoxelManipulator,
}

/// The output of a `generate` call: heightmap and biomemap are borrowed
/// from the generator and remain valid until the next call.
pub struct MapchunkResult<'g> {
    pub heightmap: &'g Heightmap,
    pub biomemap: &'g Biomemap,
}

/// One node's worth of 16 voxels; block coordinates convert to node
/// coordinates by this factor.
pub const NODES_PER_BLOCK: i16 = 16;

/// The world-generation core: terrain variant, cached node ids, noise
/// parameters, and the biome table, constructed once per world.
pub struct Mapgen {
    pub seed: u64,
    pub variant: Variant,
    pub nodes: NodeIds,
    pub params: MapgenParams,
    pub biomes: BiomeGen,
    heightmap: Heightmap,
    biomemap: Biomemap,
}

impl Mapgen {
    pub fn new(seed: u64, variant: Variant, nodes: NodeIds, params: MapgenParams, biomes: BiomeGen) -> Self {
        Self {
            seed,
            variant,
            nodes,
            params,
            biomes,
            heightmap: Heightmap::new(0, 0),
            biomemap: Biomemap { sx: 0, sz: 0, ids: Vec::new() },
        }
    }

    /// Runs the full per-mapchunk pipeline: terrain fill, surface
    /// layering, noise caves, random-walk caves, dungeon placement, and
    /// dust-topping. Panics on a caller-contract violation (§7 class 1);
    /// never otherwise errors.
    #[instrument(skip(self, request), fields(seed = self.seed, variant = ?self.variant))]
    pub fn generate(&mut self, request: MapchunkRequest<'_>, liquid: &mut LiquidQueue) -> MapchunkResult<'_> {
        let node_min = request.blockpos_min * NODES_PER_BLOCK;
        let node_max = request.blockpos_max * NODES_PER_BLOCK + Pos3::new(NODES_PER_BLOCK - 1, NODES_PER_BLOCK - 1, NODES_PER_BLOCK - 1);
        let full_node_min = Pos3::new(node_min.x - NODES_PER_BLOCK, node_min.y - NODES_PER_BLOCK, node_min.z - NODES_PER_BLOCK);
        let full_node_max = Pos3::new(node_max.x + NODES_PER_BLOCK, node_max.y + NODES_PER_BLOCK, node_max.z + NODES_PER_BLOCK);

        assert!(
            request.vm.area.contains(Pos3::new(node_min.x - 1, node_min.y - 1, node_min.z - 1))
                && request.vm.area.contains(Pos3::new(node_max.x + 1, node_max.y + 1, node_max.z + 1)),
            "{}",
            ContractViolation::AreaTooSmall
        );

        let terrain = terrain::TerrainGen {
            seed: self.seed,
            nodes: self.nodes,
            params: &self.params,
            variant: self.variant,
            biomes: &self.biomes,
        };
        let heightmap = terrain.generate_chunk(request.vm, node_min, node_max, liquid);
        terrain.surface_layering_pass(request.vm, node_min, node_max, full_node_max);

        let max_stone_y = heightmap.values.iter().copied().max().unwrap_or(terrain::HEIGHT_SENTINEL_MIN);

        let noise_cave_variants = [Variant::V5, Variant::V7, Variant::Fractal, Variant::Valleys, Variant::Watershed];
        if self.params.flag(MapgenFlags::CAVES) && noise_cave_variants.contains(&self.variant) {
            let noise_caves = caves::NoiseCaveGen {
                seed: self.seed,
                nodes: self.nodes,
                params: &self.params,
                variant: self.variant,
            };
            noise_caves.run(request.vm, node_min, node_max, max_stone_y, &self.biomes, &heightmap);
        }

        if self.params.flag(MapgenFlags::CAVES) && self.variant == Variant::V6 {
            let random_walk = caves::RandomWalkCaveGen {
                seed: self.seed,
                nodes: self.nodes,
                params: &self.params,
                ridge_heightmap: None,
            };
            random_walk.run(request.vm, full_node_min, node_min, node_max, max_stone_y);
        }

        if self.params.flag(MapgenFlags::DUNGEONS) {
            let dungeons = dungeon::DungeonGen {
                seed: self.seed,
                nodes: self.nodes,
                params: &self.params,
            };
            if dungeons.should_run(node_min, node_max, max_stone_y) {
                dungeons.generate(request.vm, node_min, node_max);
            }
        }

        terrain.dust_topping_pass(request.vm, node_min, node_max, full_node_max);

        let sx = heightmap.sx;
        let sz = heightmap.sz;
        let biomemap_ids = self.biomes.calc_biomes(sx, sz, node_min.x as f64, node_min.z as f64, &heightmap.values);
        self.heightmap = heightmap;
        self.biomemap = Biomemap { sx, sz, ids: biomemap_ids };

        MapchunkResult {
            heightmap: &self.heightmap,
            biomemap: &self.biomemap,
        }
    }
}
