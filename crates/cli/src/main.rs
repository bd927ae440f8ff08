use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mapgen::{
    BiomeDescriptor, BiomeGen, LiquidQueue, MapchunkRequest, MapgenFlags, MapgenParams, NodeIds,
    Pos3, Variant, VoxelArea, VoxelManipulator, NODES_PER_BLOCK,
};
use mapgen::config::NoiseParamSet;
use mapgen::noise::NoiseParams;
use tracing::Level;
use tracing_subscriber::fmt;

/// Generates a single mapchunk and prints its heightmap/biomemap summary.
#[derive(Parser, Debug)]
#[command(author, version, about = "Generate and inspect a deterministic mapchunk", long_about = None)]
struct Args {
    /// World seed.
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Terrain variant to generate.
    #[arg(long, default_value = "v7")]
    variant: String,
    /// Block x of the chunk to generate.
    #[arg(long, default_value_t = 0)]
    block_x: i16,
    /// Block y of the chunk to generate.
    #[arg(long, default_value_t = 0)]
    block_y: i16,
    /// Block z of the chunk to generate.
    #[arg(long, default_value_t = 0)]
    block_z: i16,
    /// Write the resulting heightmap to this file as JSON, instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn parse_variant(s: &str) -> Result<Variant> {
    match s {
        "v5" => Ok(Variant::V5),
        "v6" => Ok(Variant::V6),
        "v7" => Ok(Variant::V7),
        "fractal" => Ok(Variant::Fractal),
        "valleys" => Ok(Variant::Valleys),
        "watershed" => Ok(Variant::Watershed),
        "flat" => Ok(Variant::Flat),
        other => anyhow::bail!("unknown variant `{other}`; expected one of v5/v6/v7/fractal/valleys/watershed/flat"),
    }
}

fn main() -> Result<()> {
    let _ = fmt().with_max_level(Level::INFO).try_init();
    let args = Args::parse();
    let variant = parse_variant(&args.variant)?;

    tracing::info!(seed = args.seed, ?variant, "generating mapchunk");

    let nodes = default_node_ids();
    let params = default_params();
    let biomes = BiomeGen::new(
        args.seed as i64,
        default_biomes(),
        params.nodes.np_heat.clone(),
        params.nodes.np_heat_blend.clone(),
        params.nodes.np_humidity.clone(),
        params.nodes.np_humidity_blend.clone(),
        nodes.stone,
    );

    let blockpos_min = Pos3::new(args.block_x, args.block_y, args.block_z);
    let blockpos_max = blockpos_min;
    let node_min = blockpos_min * NODES_PER_BLOCK;
    let node_max = blockpos_max * NODES_PER_BLOCK + Pos3::new(NODES_PER_BLOCK - 1, NODES_PER_BLOCK - 1, NODES_PER_BLOCK - 1);
    let margin = Pos3::new(NODES_PER_BLOCK, NODES_PER_BLOCK, NODES_PER_BLOCK);
    let area = VoxelArea::new(node_min - margin, node_max + margin);

    let mut vm = VoxelManipulator::new(area);
    let mut liquid = LiquidQueue::new();
    let mut mapgen = mapgen::Mapgen::new(args.seed, variant, nodes, params, biomes);

    let request = MapchunkRequest {
        seed: args.seed,
        blockpos_min,
        blockpos_max,
        vm: &mut vm,
    };
    let result = mapgen.generate(request, &mut liquid);

    let summary = serde_json::json!({
        "seed": args.seed,
        "variant": args.variant,
        "blockpos": [args.block_x, args.block_y, args.block_z],
        "heightmap_sx": result.heightmap.sx,
        "heightmap_sz": result.heightmap.sz,
        "heightmap": result.heightmap.values,
        "biomemap": result.biomemap.ids,
        "liquid_positions": liquid.len(),
    });

    match args.out {
        Some(path) => {
            std::fs::write(&path, serde_json::to_vec_pretty(&summary)?)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote mapchunk summary");
        }
        None => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    Ok(())
}

fn default_node_ids() -> NodeIds {
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

fn np(offset: f32, scale: f32, spread: f32, seed_offset: i32, octaves: u16, persistence: f32) -> NoiseParams {
    NoiseParams::new(offset, scale, [spread, spread, spread], seed_offset, octaves, persistence)
}

fn default_params() -> MapgenParams {
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
            np_heat: np(0.0, 1.0, 500.0, 35, 4, 0.5),
            np_heat_blend: np(0.0, 1.0, 8.0, 13, 2, 1.0),
            np_humidity: np(50.0, 50.0, 500.0, 12, 4, 0.5),
            np_humidity_blend: np(0.0, 1.0, 8.0, 59, 2, 1.0),
            np_terrain_base: np(4.0, 70.0, 600.0, 0, 5, 0.6),
            np_terrain_alt: np(4.0, 25.0, 600.0, 1, 5, 0.6),
            np_terrain_persist: np(0.6, 0.1, 2000.0, 2, 3, 0.6),
            np_height_select: np(1.0, 1.5, 250.0, 2, 6, 0.7),
            np_mountain: np(-0.6, 1.0, 250.0, 3, 5, 0.63),
            np_ridge: np(0.0, 1.0, 100.0, 12, 4, 0.7),
            np_ridge_uwater: np(0.0, 1.0, 1000.0, 11, 1, 0.5),
            np_filler_depth: np(0.0, 1.2, 150.0, 261, 3, 0.7),
            np_cave1: np(0.0, 12.0, 50.0, 52534, 4, 0.5),
            np_cave2: np(0.0, 12.0, 50.0, 10325, 4, 0.5),
            np_cave_liquids: np(0.0, 1.0, 150.0, 776, 3, 0.5),
            np_dungeon_rarity: np(0.0, 1.0, 500.0, 30, 2, 0.5),
            np_dungeon_wetness: np(0.0, 1.0, 40.0, 31, 2, 0.5),
            np_dungeon_density: np(0.0, 1.0, 40.0, 32, 2, 0.5),
            np_valley_river: np(0.0, 1.0, 350.0, 4, 5, 0.6),
            np_valley_depth: np(0.0, 1.0, 512.0, 5, 1, 0.5),
            np_valley_profile: np(0.0, 1.0, 512.0, 6, 1, 0.5),
            np_watershed_ridge: np(0.0, 1.0, 512.0, 7, 4, 0.5),
            np_watershed_valley: np(0.0, 1.0, 512.0, 8, 4, 0.5),
            np_watershed_plateau: np(0.0, 1.0, 512.0, 9, 2, 0.5),
        },
    }
}

fn default_biomes() -> Vec<BiomeDescriptor> {
    let ids = default_node_ids();
    vec![
        BiomeDescriptor {
            id: 1,
            top: ids.dirt_with_grass,
            filler: ids.dirt,
            stone: ids.stone,
            water_top: ids.water_source,
            water: ids.water_source,
            river_water: ids.water_source,
            riverbed: ids.sand,
            dust: mapgen_core::CONTENT_IGNORE,
            depth_top: 1,
            depth_filler: 3,
            depth_water_top: 1,
            depth_riverbed: 1,
            y_min: i16::MIN,
            y_max: i16::MAX,
            heat_point: 50.0,
            humidity_point: 50.0,
        },
        BiomeDescriptor {
            id: 2,
            top: ids.sand,
            filler: ids.sand,
            stone: ids.desert_stone,
            water_top: ids.water_source,
            water: ids.water_source,
            river_water: ids.water_source,
            riverbed: ids.sand,
            dust: mapgen_core::CONTENT_IGNORE,
            depth_top: 1,
            depth_filler: 2,
            depth_water_top: 1,
            depth_riverbed: 1,
            y_min: i16::MIN,
            y_max: i16::MAX,
            heat_point: 90.0,
            humidity_point: 10.0,
        },
        BiomeDescriptor {
            id: 3,
            top: ids.ice,
            filler: ids.dirt,
            stone: ids.stone,
            water_top: ids.ice,
            water: ids.water_source,
            river_water: ids.water_source,
            riverbed: ids.dirt,
            dust: ids.ice,
            depth_top: 1,
            depth_filler: 1,
            depth_water_top: 1,
            depth_riverbed: 1,
            y_min: i16::MIN,
            y_max: i16::MAX,
            heat_point: 5.0,
            humidity_point: 40.0,
        },
    ]
}
