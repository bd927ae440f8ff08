//! Variant-dispatched terrain shaping (component C4).
//!
//! Every variant shares the same outer column/height scaffold and differs
//! only in its ground-density function `D(x,y,z)` and a handful of
//! optional post-steps (ridges, rivers). Rather than modelling variants
//! through inheritance, each variant is a case of [`Variant`] plus a
//! `density` method; the scaffold in [`TerrainGen::generate_chunk`] is a
//! single plain function that takes the variant by reference.

use crate::biome::BiomeGen;
use crate::config::{MapgenFlags, MapgenParams, NodeIds};
use crate::liquid::LiquidQueue;
use crate::noise::noise2d_perlin;
use crate::voxel::{VoxelArea, VoxelManipulator};
use mapgen_core::pos::Pos3;

/// Sentinel heightmap value meaning "no stone placed in this column".
pub const HEIGHT_SENTINEL_MIN: i16 = i16::MIN;

/// Per-column maximum-stone-y, produced as a by-product of the terrain pass.
#[derive(Debug, Clone)]
pub struct Heightmap {
    pub sx: usize,
    pub sz: usize,
    pub values: Vec<i16>,
}

impl Heightmap {
    pub fn new(sx: usize, sz: usize) -> Self {
        Self {
            sx,
            sz,
            values: vec![HEIGHT_SENTINEL_MIN; sx * sz],
        }
    }

    pub fn get(&self, xi: usize, zi: usize) -> i16 {
        self.values[zi * self.sx + xi]
    }

    fn set_max(&mut self, xi: usize, zi: usize, y: i16) {
        let v = &mut self.values[zi * self.sx + xi];
        if y > *v {
            *v = y;
        }
    }
}

/// Which terrain shape function a mapgen invocation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    V5,
    V6,
    V7,
    Fractal,
    Valleys,
    Watershed,
    Flat,
}

/// Per-column 2-D fields that feed a variant's density function. Computed
/// once per column before the vertical scan; fields unused by the active
/// variant are left at their default and never read.
#[derive(Debug, Clone, Copy, Default)]
struct ColumnFields {
    base: f64,
    alt: f64,
    persist: f64,
    mountain_amp: f64,
    river: f64,
    valley_depth: f64,
    valley_profile: f64,
    watershed_ridge: f64,
    watershed_valley: f64,
    watershed_plateau: f64,
}

/// Fills one mapchunk's voxel buffer with stone/water/air for the active
/// variant, producing the heightmap as a by-product.
pub struct TerrainGen<'a> {
    pub seed: u64,
    pub nodes: NodeIds,
    pub params: &'a MapgenParams,
    pub variant: Variant,
    pub biomes: &'a BiomeGen,
}

impl<'a> TerrainGen<'a> {
    fn column_fields(&self, x: f64, z: f64) -> ColumnFields {
        let np = &self.params.nodes;
        let seed = self.seed as i64;
        match self.variant {
            Variant::V6 => ColumnFields {
                base: noise2d_perlin(x, z, seed, &np.np_terrain_base),
                alt: noise2d_perlin(x, z, seed + 1, &np.np_terrain_alt),
                ..Default::default()
            },
            Variant::V7 => ColumnFields {
                base: noise2d_perlin(x, z, seed, &np.np_terrain_base),
                alt: noise2d_perlin(x, z, seed + 1, &np.np_terrain_alt),
                persist: noise2d_perlin(x, z, seed + 2, &np.np_terrain_persist).clamp(0.2, 0.9),
                mountain_amp: noise2d_perlin(x, z, seed + 3, &np.np_mountain),
                ..Default::default()
            },
            Variant::Valleys => ColumnFields {
                river: noise2d_perlin(x, z, seed + 4, &np.np_valley_river),
                valley_depth: noise2d_perlin(x, z, seed + 5, &np.np_valley_depth),
                valley_profile: noise2d_perlin(x, z, seed + 6, &np.np_valley_profile),
                ..Default::default()
            },
            Variant::Watershed => ColumnFields {
                watershed_ridge: noise2d_perlin(x, z, seed + 7, &np.np_watershed_ridge),
                watershed_valley: noise2d_perlin(x, z, seed + 8, &np.np_watershed_valley),
                watershed_plateau: noise2d_perlin(x, z, seed + 9, &np.np_watershed_plateau),
                ..Default::default()
            },
            Variant::V5 | Variant::Fractal | Variant::Flat => ColumnFields::default(),
        }
    }

    /// The variant's ground-density function `D(x,y,z)`; `density > 0`
    /// (or `y <= seabed`) means stone.
    fn density(&self, x: f64, y: f64, z: f64, col: ColumnFields) -> f64 {
        let np = &self.params.nodes;
        let seed = self.seed as i64;
        match self.variant {
            Variant::V5 => {
                let ground = crate::noise::noise3d_perlin(x, y, z, seed, &np.np_terrain_base);
                let height = noise2d_perlin(x, z, seed, &np.np_terrain_alt);
                let mut factor = noise2d_perlin(x, z, seed + 1, &np.np_height_select).max(0.01);
                if factor >= 1.0 {
                    factor *= 1.6;
                }
                ground * factor - (y - height)
            }
            Variant::V6 => {
                let steepness = noise2d_perlin(x, z, seed + 2, &np.np_height_select).clamp(0.5, 1000.0);
                let b = steepness.powi(7);
                let a = (b / (b + 1.0)).clamp(0.0, 1.0);
                let height = col.base * (1.0 - a) + col.alt * a;
                height - y
            }
            Variant::V7 => {
                let steepness = noise2d_perlin(x, z, seed + 2, &np.np_height_select).clamp(0.5, 1000.0);
                let b = steepness.powi(7);
                let a = (b / (b + 1.0)).clamp(0.0, 1.0);
                let base_height = col.base * (1.0 - a) + col.alt * a;
                let mountain = if self.params.flag(MapgenFlags::MOUNTAINS) {
                    crate::noise::noise3d_perlin(x, y, z, seed + 3, &np.np_mountain) * col.mountain_amp
                } else {
                    0.0
                };
                (base_height - y) + mountain
            }
            Variant::Fractal => {
                let seabed_height = noise2d_perlin(x, z, seed, &np.np_terrain_base);
                if y as i16 <= self.params.water_level - 8 {
                    return seabed_height - y;
                }
                mandelbrot_escape(x, y, z, seed) - 0.5
            }
            Variant::Valleys => {
                let terrain_height = 0.0; // baseline sea-level referenced surface
                let river = col.river;
                let valley_depth = col.valley_depth.max(0.0);
                let slope = col.valley_profile;
                let rugged = if self.params.flag(MapgenFlags::VALLEYS_RUGGED) {
                    crate::noise::noise3d_perlin(x, y, z, seed + 10, &np.np_mountain) * 0.2
                } else {
                    0.0
                };
                let cliff = if self.params.flag(MapgenFlags::VALLEYS_CLIFFS) {
                    slope.abs() * 4.0
                } else {
                    slope * 2.0
                };
                let mut h = terrain_height + valley_depth * 20.0 + cliff + rugged;
                if river.abs() < self.params.river_size {
                    h -= 4.0 * (self.params.river_size - river.abs());
                }
                h - y
            }
            Variant::Watershed => {
                let ridge = col.watershed_ridge;
                let valley = col.watershed_valley.max(-1.0);
                let plateau = col.watershed_plateau;
                let mountain_amp = (ridge * 0.5 + 0.5).clamp(0.0, 1.0);
                let mut valley_pow = valley;
                if valley_pow > 0.0 {
                    valley_pow = valley_pow.powf(3.0); // lake basins
                }
                let mut h = ridge * 30.0 * mountain_amp + plateau * 10.0 + valley_pow * 15.0;
                if valley <= 0.0 {
                    h -= 6.0; // river channel carve, sand riverbed placed by caller
                }
                h - y
            }
            Variant::Flat => {
                // handled directly in generate_chunk; density not used.
                0.0
            }
        }
    }

    /// Fills `vm` for the mapchunk covering `node_min..=node_max` (inclusive),
    /// returning the produced heightmap. `vm`'s area must cover at least
    /// `node_min - 1 ..= node_max + 1`.
    pub fn generate_chunk(
        &self,
        vm: &mut VoxelManipulator,
        node_min: Pos3,
        node_max: Pos3,
        liquid: &mut LiquidQueue,
    ) -> Heightmap {
        assert!(
            vm.area.contains(Pos3::new(node_min.x - 1, node_min.y - 1, node_min.z - 1))
                && vm.area.contains(Pos3::new(node_max.x + 1, node_max.y + 1, node_max.z + 1)),
            "voxel manipulator area does not cover the requested chunk plus margin"
        );

        let sx = (node_max.x - node_min.x + 1) as usize;
        let sz = (node_max.z - node_min.z + 1) as usize;
        let mut heightmap = Heightmap::new(sx, sz);
        let water_level = self.params.water_level;

        for zi in 0..sz {
            for xi in 0..sx {
                let x = node_min.x as f64 + xi as f64;
                let z = node_min.z as f64 + zi as f64;
                let col = self.column_fields(x, z);

                for y in (node_min.y - 1)..=(node_max.y + 1) {
                    let p = Pos3::new(node_min.x + xi as i16, y, node_min.z + zi as i16);
                    if !vm.get(p).is_ignore() {
                        continue;
                    }
                    if self.variant == Variant::Flat {
                        let v = if y <= -3 {
                            self.nodes.stone
                        } else if y <= -1 {
                            self.nodes.dirt
                        } else if y == 0 {
                            self.nodes.dirt_with_grass
                        } else {
                            self.nodes.air
                        };
                        vm.set(p, crate::voxel::Voxel::new(v));
                        if v == self.nodes.stone {
                            heightmap.set_max(xi, zi, y);
                        }
                        continue;
                    }

                    let density = self.density(x, y as f64, z, col);
                    if density > 0.0 {
                        vm.set(p, crate::voxel::Voxel::new(self.nodes.stone));
                        heightmap.set_max(xi, zi, y);
                    } else if y <= water_level {
                        vm.set(p, crate::voxel::Voxel::new(self.nodes.water_source));
                        if y == water_level {
                            liquid.push(p);
                        }
                    } else {
                        vm.set(p, crate::voxel::Voxel::new(self.nodes.air));
                    }
                }
            }
        }

        if self.variant == Variant::V7 && self.params.flag(MapgenFlags::RIDGES) {
            self.ridge_river_pass(vm, node_min, node_max, &mut heightmap, liquid);
        }

        heightmap
    }

    /// Walks each column top-down, overwriting the top stone/water voxels
    /// with the classified biome's surface materials.
    pub fn surface_layering_pass(
        &self,
        vm: &mut VoxelManipulator,
        node_min: Pos3,
        node_max: Pos3,
        full_node_max: Pos3,
    ) {
        let np = &self.params.nodes;
        let seed = self.seed as i64;
        let sx = (node_max.x - node_min.x + 1) as i16;
        let sz = (node_max.z - node_min.z + 1) as i16;

        for zi in 0..sz {
            for xi in 0..sx {
                let x = (node_min.x + xi) as f64;
                let z = (node_min.z + zi) as f64;
                let mut biome: Option<&crate::biome::BiomeDescriptor> = None;
                let mut top_left = 0u32;
                let mut filler_left = 0u32;

                for y in (node_min.y..=full_node_max.y).rev() {
                    let p = Pos3::new(node_min.x + xi, y, node_min.z + zi);
                    if !vm.area.contains(p) {
                        continue;
                    }
                    let v = vm.get(p);
                    if v.content_id == self.nodes.air {
                        top_left = 0;
                        filler_left = 0;
                        biome = None;
                        continue;
                    }
                    let is_stone = v.content_id == self.nodes.stone;
                    let is_water = v.content_id == self.nodes.water_source;
                    if !is_stone && !is_water {
                        continue;
                    }
                    if biome.is_none() {
                        let (heat, humidity) = self.biomes.climate_at(x, z);
                        biome = Some(self.biomes.get_biome(heat, humidity, y));
                        let filler_noise =
                            noise2d_perlin(x, z, seed + 77, &np.np_filler_depth).max(0.0) as u32;
                        if let Some(b) = biome {
                            top_left = b.depth_top as u32;
                            filler_left = b.depth_filler as u32 + filler_noise;
                        }
                    }
                    let Some(b) = biome else { continue };
                    if is_water {
                        vm.set(p, crate::voxel::Voxel::new(b.water_top));
                        continue;
                    }
                    let below = Pos3::new(p.x, p.y - 1, p.z);
                    let unsupported = vm.area.contains(below)
                        && (vm.get(below).content_id == self.nodes.air
                            || vm.get(below).content_id == self.nodes.water_source);
                    if unsupported {
                        top_left = 0;
                        filler_left = 0;
                    }
                    if top_left > 0 {
                        vm.set(p, crate::voxel::Voxel::new(b.top));
                        top_left -= 1;
                    } else if filler_left > 0 {
                        vm.set(p, crate::voxel::Voxel::new(b.filler));
                        filler_left -= 1;
                    } else {
                        vm.set(p, crate::voxel::Voxel::new(b.stone));
                    }
                }
            }
        }
    }

    /// Places one voxel of dust directly above the highest non-air voxel
    /// of each column, for biomes whose `dust` id is registered.
    pub fn dust_topping_pass(&self, vm: &mut VoxelManipulator, node_min: Pos3, node_max: Pos3, full_node_max: Pos3) {
        let sx = (node_max.x - node_min.x + 1) as i16;
        let sz = (node_max.z - node_min.z + 1) as i16;
        for zi in 0..sz {
            for xi in 0..sx {
                let x = (node_min.x + xi) as f64;
                let z = (node_min.z + zi) as f64;
                let (heat, humidity) = self.biomes.climate_at(x, z);
                for y in (node_min.y - 1..=full_node_max.y).rev() {
                    let p = Pos3::new(node_min.x + xi, y, node_min.z + zi);
                    if !vm.area.contains(p) {
                        continue;
                    }
                    let v = vm.get(p);
                    if v.content_id == self.nodes.air {
                        continue;
                    }
                    let biome = self.biomes.get_biome(heat, humidity, y);
                    if biome.dust == mapgen_core::registry::CONTENT_IGNORE {
                        break;
                    }
                    if v.content_id == biome.dust {
                        break;
                    }
                    let above = Pos3::new(p.x, p.y + 1, p.z);
                    if vm.area.contains(above) {
                        vm.set(above, crate::voxel::Voxel::new(biome.dust));
                    }
                    break;
                }
            }
        }
    }

    /// Ridge/river carving pass, v7-only: replaces terrain above and below
    /// the water band with air/water where the combined ridge/uwater
    /// fields fall inside the river channel threshold.
    fn ridge_river_pass(
        &self,
        vm: &mut VoxelManipulator,
        node_min: Pos3,
        node_max: Pos3,
        heightmap: &mut Heightmap,
        liquid: &mut LiquidQueue,
    ) {
        let np = &self.params.nodes;
        let seed = self.seed as i64;
        let width = 0.2;
        let sx = heightmap.sx;
        let water_level = self.params.water_level;

        for zi in 0..heightmap.sz {
            for xi in 0..sx {
                if heightmap.get(xi, zi) < water_level - 16 {
                    continue;
                }
                let x = node_min.x as f64 + xi as f64;
                let z = node_min.z as f64 + zi as f64;
                let uwater = 2.0 * noise2d_perlin(x, z, seed + 11, &np.np_ridge_uwater);
                if uwater.abs() > width {
                    continue;
                }
                let mut lowest: i16 = heightmap.get(xi, zi);
                for y in (node_min.y)..=(node_max.y) {
                    let altitude = (y - water_level).max(0) as f64;
                    let nridge = crate::noise::noise3d_perlin(x, y as f64, z, seed + 12, &np.np_ridge)
                        * altitude
                        / 7.0;
                    let carve = nridge + (width - uwater.abs()) * (altitude + 17.0) / 2.5;
                    if carve < 0.6 {
                        let p = Pos3::new(node_min.x + xi as i16, y, node_min.z + zi as i16);
                        if y > water_level {
                            vm.set(p, crate::voxel::Voxel::new(self.nodes.air));
                        } else {
                            vm.set(p, crate::voxel::Voxel::new(self.nodes.water_source));
                            liquid.push(p);
                        }
                        if y < lowest {
                            lowest = y;
                        }
                    }
                }
                heightmap.values[zi * sx + xi] = lowest;
            }
        }
    }
}

/// Mandelbrot-set escape-time sampled at a fixed iteration depth, used by
/// the `fractal` variant's density function. Returns a value in `[0,1]`
/// where interior points (never escaping) approach `1.0`.
fn mandelbrot_escape(x: f64, y: f64, z: f64, seed: i64) -> f64 {
    const ITER: u32 = 12;
    // 4-D formula selectable in principle; this crate implements the
    // 3-D-projected Mandelbrot formula used by the default fractal preset.
    let cr = x * 0.01;
    let ci = z * 0.01;
    let cj = y * 0.01 + (seed % 97) as f64 * 1e-6;
    let (mut zr, mut zi, mut zj) = (0.0f64, 0.0f64, 0.0f64);
    for i in 0..ITER {
        let nzr = zr * zr - zi * zi - zj * zj + cr;
        let nzi = 2.0 * zr * zi + ci;
        let nzj = 2.0 * zr * zj + cj;
        zr = nzr;
        zi = nzi;
        zj = nzj;
        if zr * zr + zi * zi + zj * zj > 4.0 {
            return i as f64 / ITER as f64;
        }
    }
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::BiomeGen;
    use crate::config::{MapgenFlags, MapgenParams, NodeIds, NoiseParamSet};
    use crate::noise::NoiseParams;

    fn ids() -> NodeIds {
        NodeIds {
            air: 0,
            ignore: u16::MAX,
            stone: 1,
            water_source: 2,
            lava_source: 3,
            desert_stone: 4,
            sandstone: 5,
            ice: 6,
            cobble: 7,
            mossy_cobble: 8,
            stair_cobble: 9,
            dirt: 10,
            dirt_with_grass: 11,
            sand: 12,
        }
    }

    fn np(offset: f32) -> NoiseParams {
        NoiseParams::new(offset, 1.0, [80.0, 80.0, 80.0], 0, 3, 0.6)
    }

    fn params() -> MapgenParams {
        MapgenParams {
            flags: MapgenFlags::default(),
            water_level: 1,
            chunksize: 5,
            cave_width: 0.09,
            river_size: 0.2,
            altitude_chill: 0.0,
            cave_water_height: 0,
            lava_max_height: -256,
            nodes: NoiseParamSet {
                np_heat: np(0.0),
                np_heat_blend: np(0.0),
                np_humidity: np(0.0),
                np_humidity_blend: np(0.0),
                np_terrain_base: np(0.0),
                np_terrain_alt: np(0.0),
                np_terrain_persist: np(0.5),
                np_height_select: np(0.6),
                np_mountain: np(0.0),
                np_ridge: np(0.0),
                np_ridge_uwater: np(0.0),
                np_filler_depth: np(0.0),
                np_cave1: np(0.0),
                np_cave2: np(0.0),
                np_cave_liquids: np(0.0),
                np_dungeon_rarity: np(1.0),
                np_dungeon_wetness: np(0.0),
                np_dungeon_density: np(0.0),
                np_valley_river: np(0.0),
                np_valley_depth: np(0.0),
                np_valley_profile: np(0.0),
                np_watershed_ridge: np(0.0),
                np_watershed_valley: np(0.0),
                np_watershed_plateau: np(0.0),
            },
        }
    }

    fn biomes(stone: mapgen_core::registry::ContentId) -> BiomeGen {
        BiomeGen::new(1, vec![], np(0.0), np(0.0), np(0.0), np(0.0), stone)
    }

    /// S1: flat variant produces the exact documented layering.
    #[test]
    fn flat_variant_layers_match_spec() {
        let p = params();
        let biomes = biomes(1);
        let gen = TerrainGen {
            seed: 1,
            nodes: ids(),
            params: &p,
            variant: Variant::Flat,
            biomes: &biomes,
        };
        let area = VoxelArea::new(Pos3::new(-2, -5, -2), Pos3::new(2, 5, 2));
        let mut vm = VoxelManipulator::new(area);
        let mut liquid = LiquidQueue::new();
        let node_min = Pos3::new(0, 0, 0);
        let node_max = Pos3::new(0, 0, 0);
        let hm = gen.generate_chunk(&mut vm, node_min, node_max, &mut liquid);

        for y in -5..=-3 {
            assert_eq!(vm.get(Pos3::new(0, y, 0)).content_id, ids().stone, "y={y}");
        }
        for y in -2..=-1 {
            assert_eq!(vm.get(Pos3::new(0, y, 0)).content_id, ids().dirt, "y={y}");
        }
        assert_eq!(vm.get(Pos3::new(0, 0, 0)).content_id, ids().dirt_with_grass);
        for y in 1..=5 {
            assert_eq!(vm.get(Pos3::new(0, y, 0)).content_id, ids().air, "y={y}");
        }
        assert_eq!(hm.get(0, 0), 0);
    }

    #[test]
    fn terrain_pass_never_overwrites_non_ignore_voxels() {
        let p = params();
        let biomes = biomes(1);
        let gen = TerrainGen {
            seed: 1,
            nodes: ids(),
            params: &p,
            variant: Variant::V5,
            biomes: &biomes,
        };
        let area = VoxelArea::new(Pos3::new(-2, -5, -2), Pos3::new(2, 5, 2));
        let mut vm = VoxelManipulator::new(area);
        let pre_existing = Pos3::new(0, 0, 0);
        vm.set(pre_existing, crate::voxel::Voxel::new(99));
        let mut liquid = LiquidQueue::new();
        gen.generate_chunk(&mut vm, Pos3::new(0, 0, 0), Pos3::new(0, 0, 0), &mut liquid);
        assert_eq!(vm.get(pre_existing).content_id, 99);
    }

    #[test]
    fn determinism_two_independent_calls_agree() {
        let p = params();
        let biomes = biomes(1);
        let gen = TerrainGen {
            seed: 7,
            nodes: ids(),
            params: &p,
            variant: Variant::V6,
            biomes: &biomes,
        };
        let area = VoxelArea::new(Pos3::new(-2, -10, -2), Pos3::new(2, 10, 2));
        let mut vm1 = VoxelManipulator::new(area);
        let mut vm2 = VoxelManipulator::new(area);
        let mut l1 = LiquidQueue::new();
        let mut l2 = LiquidQueue::new();
        let hm1 = gen.generate_chunk(&mut vm1, Pos3::new(0, -8, 0), Pos3::new(0, 8, 0), &mut l1);
        let hm2 = gen.generate_chunk(&mut vm2, Pos3::new(0, -8, 0), Pos3::new(0, 8, 0), &mut l2);
        for y in -8..=8 {
            assert_eq!(
                vm1.get(Pos3::new(0, y, 0)).content_id,
                vm2.get(Pos3::new(0, y, 0)).content_id
            );
        }
        assert_eq!(hm1.values, hm2.values);
    }

    #[test]
    fn heightmap_matches_highest_stone_in_column() {
        let p = params();
        let biomes = biomes(1);
        let gen = TerrainGen {
            seed: 3,
            nodes: ids(),
            params: &p,
            variant: Variant::V6,
            biomes: &biomes,
        };
        let area = VoxelArea::new(Pos3::new(-2, -10, -2), Pos3::new(2, 10, 2));
        let mut vm = VoxelManipulator::new(area);
        let mut liquid = LiquidQueue::new();
        let node_min = Pos3::new(0, -8, 0);
        let node_max = Pos3::new(0, 8, 0);
        let hm = gen.generate_chunk(&mut vm, node_min, node_max, &mut liquid);
        let recorded = hm.get(0, 0);
        if recorded != HEIGHT_SENTINEL_MIN {
            assert_eq!(vm.get(Pos3::new(0, recorded, 0)).content_id, ids().stone);
            if recorded < node_max.y {
                assert_ne!(vm.get(Pos3::new(0, recorded + 1, 0)).content_id, ids().stone);
            }
        }
    }

    #[test]
    fn surface_layering_replaces_top_stone_with_biome_top() {
        let p = params();
        let biome_list = vec![crate::biome::BiomeDescriptor {
            id: 1,
            top: 50,
            filler: 51,
            stone: 1,
            water_top: 60,
            water: 2,
            river_water: 2,
            riverbed: 61,
            dust: mapgen_core::registry::CONTENT_IGNORE,
            depth_top: 1,
            depth_filler: 2,
            depth_water_top: 1,
            depth_riverbed: 1,
            y_min: i16::MIN,
            y_max: i16::MAX,
            heat_point: 0.0,
            humidity_point: 0.0,
        }];
        let biomes = BiomeGen::new(1, biome_list, np(0.0), np(0.0), np(0.0), np(0.0), 1);
        let gen = TerrainGen {
            seed: 1,
            nodes: ids(),
            params: &p,
            variant: Variant::Flat,
            biomes: &biomes,
        };
        let area = VoxelArea::new(Pos3::new(-2, -10, -2), Pos3::new(2, 10, 2));
        let mut vm = VoxelManipulator::new(area);
        let mut liquid = LiquidQueue::new();
        let node_min = Pos3::new(0, -5, 0);
        let node_max = Pos3::new(0, 5, 0);
        gen.generate_chunk(&mut vm, node_min, node_max, &mut liquid);
        gen.surface_layering_pass(&mut vm, node_min, node_max, Pos3::new(0, 10, 0));
        // y=-5 is the highest stone voxel (flat: y<=-3 is stone); the
        // layering pass walks down from the top so the first stone
        // encountered is y=-3.
        assert_eq!(vm.get(Pos3::new(0, -3, 0)).content_id, 50);
        assert_eq!(vm.get(Pos3::new(0, -4, 0)).content_id, 51);
    }

    #[test]
    fn mandelbrot_escape_is_bounded() {
        let v = mandelbrot_escape(1.0, 2.0, 3.0, 42);
        assert!((0.0..=1.0).contains(&v));
    }
}
