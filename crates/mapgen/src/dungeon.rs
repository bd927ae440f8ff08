//! Dungeon placement: rooms joined by corridors (component C5c, §4.5.3).
//!
//! A single `PseudoRandom(blockseed+2)` stream drives the whole state
//! machine: room placement, door finding, corridor walking, and stairs.
//! Geometry dead ends (no valid door, no room that fits) abandon the
//! dungeon for this chunk silently — this is a common, unlogged outcome,
//! not an error.

use crate::config::{MapgenParams, NodeIds};
use crate::noise::noise2d_perlin;
use crate::prng::{blockseed, PseudoRandom};
use crate::voxel::{Voxel, VoxelFlags, VoxelManipulator};
use mapgen_core::pos::Pos3;

const START_PADDING: i16 = 16;

/// The six axis-aligned unit directions a dungeon walker can face.
const ORTHO_DIRS: [Pos3; 6] = [
    Pos3::new(1, 0, 0),
    Pos3::new(-1, 0, 0),
    Pos3::new(0, 1, 0),
    Pos3::new(0, -1, 0),
    Pos3::new(0, 0, 1),
    Pos3::new(0, 0, -1),
];

fn rand_ortho_dir(ps: &mut PseudoRandom) -> Pos3 {
    ORTHO_DIRS[ps.range(0, 5) as usize]
}

/// Rotate a horizontal direction by a quarter-turn count (can be negative).
fn turn_xz(dir: Pos3, turns: i32) -> Pos3 {
    let mut t = turns.rem_euclid(4);
    let mut d = dir;
    while t > 0 {
        d = Pos3::new(-d.z, d.y, d.x);
        t -= 1;
    }
    d
}

fn random_turn(ps: &mut PseudoRandom, dir: Pos3) -> Pos3 {
    turn_xz(dir, ps.range(-1, 1))
}

/// Runs the dungeon room/corridor state machine for one chunk.
pub struct DungeonGen<'a> {
    pub seed: u64,
    pub nodes: NodeIds,
    pub params: &'a MapgenParams,
}

impl<'a> DungeonGen<'a> {
    /// True if the 3-D `dungeon_rarity` noise at `node_min` exceeds the
    /// placement threshold and the chunk midpoint is below groundlevel.
    pub fn should_run(&self, node_min: Pos3, node_max: Pos3, max_stone_y: i16) -> bool {
        let np = &self.params.nodes.np_dungeon_rarity;
        let rarity = noise2d_perlin(node_min.x as f64, node_min.z as f64, self.seed as i64 + 30, np);
        let midpoint = (node_min.y + node_max.y) / 2;
        rarity > 0.2 && midpoint < max_stone_y
    }

    /// Pre-pass: marks every AIR/water voxel in the overgenerated area as
    /// `DUNGEON_PRESERVE` so corridors and rooms cannot collide with caves
    /// or the atmosphere.
    pub fn mark_preserve(&self, vm: &mut VoxelManipulator) {
        let area = vm.area;
        for z in area.min.z..=area.max.z {
            for y in area.min.y..=area.max.y {
                for x in area.min.x..=area.max.x {
                    let p = Pos3::new(x, y, z);
                    let v = vm.get(p);
                    if v.is_air() || v.content_id == self.nodes.water_source {
                        vm.add_flags(p, VoxelFlags::DUNGEON_PRESERVE);
                    }
                }
            }
        }
    }

    /// Runs the full state machine. Returns `false` (without reverting any
    /// already-placed rooms) if a geometry dead end is hit; that is the
    /// documented, silent abandonment outcome — other passes still run.
    pub fn generate(&self, vm: &mut VoxelManipulator, node_min: Pos3, node_max: Pos3) -> bool {
        self.mark_preserve(vm);

        let bs = blockseed(self.seed, node_min);
        let mut ps = PseudoRandom::new(bs.wrapping_add(2));

        let Some(mut room) = self.place_first_room(vm, &mut ps, node_min, node_max) else {
            return false;
        };

        let room_count = ps.range(2, 16);
        let mut last_room_center = room.center();

        for i in 0..room_count {
            self.make_room(vm, room);
            if i == room_count - 1 {
                break;
            }

            let start = if ps.range(0, 2) < 2 { last_room_center } else { room.center() };
            last_room_center = room.center();

            let Some((door_place, door_dir)) = self.find_place_for_door(vm, &mut ps, start, node_min, node_max) else {
                return false;
            };

            let cut_door = ps.range(0, 1) == 1;
            let corridor_start = if cut_door {
                vm.set(door_place, Voxel::AIR);
                vm.add_flags(door_place, VoxelFlags::DUNGEON_INSIDE);
                let above = Pos3::new(door_place.x, door_place.y + 1, door_place.z);
                if vm.area.contains(above) {
                    vm.set(above, Voxel::AIR);
                    vm.add_flags(above, VoxelFlags::DUNGEON_INSIDE);
                }
                door_place + door_dir
            } else {
                door_place
            };

            let corridor_end = self.make_corridor(vm, &mut ps, corridor_start, door_dir, node_min, node_max);

            let Some(next_room) = self.find_place_for_room_door(vm, &mut ps, corridor_end, node_min, node_max) else {
                return false;
            };
            room = next_room;
        }

        self.age_cobble(vm);
        true
    }

    fn place_first_room(
        &self,
        vm: &VoxelManipulator,
        ps: &mut PseudoRandom,
        node_min: Pos3,
        node_max: Pos3,
    ) -> Option<Room> {
        for _ in 0..100 {
            let size = self.roll_room_size(ps);
            let lo = node_min + Pos3::new(START_PADDING, START_PADDING, START_PADDING);
            let hi = node_max - Pos3::new(START_PADDING, START_PADDING, START_PADDING) - size;
            if hi.x < lo.x || hi.y < lo.y || hi.z < lo.z {
                continue;
            }
            let place = Pos3::new(
                lo.x + ps.range(0, (hi.x - lo.x) as i32) as i16,
                lo.y + ps.range(0, (hi.y - lo.y) as i32) as i16,
                lo.z + ps.range(0, (hi.z - lo.z) as i32) as i16,
            );
            let room = Room { place, size };
            if self.room_fits(vm, room) {
                return Some(room);
            }
        }
        None
    }

    fn roll_room_size(&self, ps: &mut PseudoRandom) -> Pos3 {
        if ps.range(0, 1) == 0 {
            Pos3::new(ps.range(4, 8) as i16, ps.range(4, 6) as i16, ps.range(4, 8) as i16)
        } else {
            let n = ps.range(8, 16) as i16;
            Pos3::new(n, n, n)
        }
    }

    fn room_fits(&self, vm: &VoxelManipulator, room: Room) -> bool {
        for z in room.place.z..room.place.z + room.size.z {
            for y in room.place.y..room.place.y + room.size.y {
                for x in room.place.x..room.place.x + room.size.x {
                    let p = Pos3::new(x, y, z);
                    if !vm.area.contains(p) {
                        return false;
                    }
                    let v = vm.get(p);
                    if v.is_ignore() || vm.flags(p).contains(VoxelFlags::DUNGEON_INSIDE) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Places cobble walls and sets `DUNGEON_UNTOUCHABLE` on the filled
    /// interior air; walls never overwrite `UNTOUCHABLE`.
    fn make_room(&self, vm: &mut VoxelManipulator, room: Room) {
        for z in room.place.z..room.place.z + room.size.z {
            for y in room.place.y..room.place.y + room.size.y {
                for x in room.place.x..room.place.x + room.size.x {
                    let p = Pos3::new(x, y, z);
                    if !vm.area.contains(p) {
                        continue;
                    }
                    if vm.flags(p).contains(VoxelFlags::DUNGEON_UNTOUCHABLE) {
                        continue;
                    }
                    let is_wall = x == room.place.x
                        || x == room.place.x + room.size.x - 1
                        || y == room.place.y
                        || y == room.place.y + room.size.y - 1
                        || z == room.place.z
                        || z == room.place.z + room.size.z - 1;
                    if is_wall {
                        vm.set(p, Voxel::new(self.nodes.cobble));
                    } else {
                        vm.set(p, Voxel::AIR);
                        vm.add_flags(p, VoxelFlags::DUNGEON_UNTOUCHABLE);
                    }
                }
            }
        }
    }

    /// Walks up to 100 random steps from `start` looking for a two-high
    /// cobble wall to punch a door through.
    fn find_place_for_door(
        &self,
        vm: &VoxelManipulator,
        ps: &mut PseudoRandom,
        start: Pos3,
        node_min: Pos3,
        node_max: Pos3,
    ) -> Option<(Pos3, Pos3)> {
        let mut pos = start;
        let mut dir = rand_ortho_dir(ps);
        for _ in 0..100 {
            let next = pos + dir;
            if !vm.area.contains(next) || next.x < node_min.x || next.x > node_max.x || next.z < node_min.z || next.z > node_max.z {
                dir = random_turn(ps, dir);
                continue;
            }
            let above = Pos3::new(next.x, next.y + 1, next.z);
            let is_wall = vm.area.contains(above)
                && vm.get(next).content_id == self.nodes.cobble
                && vm.get(above).content_id == self.nodes.cobble;
            if is_wall {
                return Some((next, dir));
            }
            pos = next;
            if ps.range(0, 3) == 0 {
                dir = random_turn(ps, dir);
            }
        }
        None
    }

    /// Corridor walk: `length = range(1,13)` parts, each `partlength =
    /// range(1,13)` steps of cobble tube with an interior air hole,
    /// optionally rising/falling via stairs.
    fn make_corridor(
        &self,
        vm: &mut VoxelManipulator,
        ps: &mut PseudoRandom,
        start: Pos3,
        dir: Pos3,
        node_min: Pos3,
        node_max: Pos3,
    ) -> Pos3 {
        let length = ps.range(1, 13);
        let mut pos = start;
        let mut dir = dir;
        let mut partlength = ps.range(1, 13);
        let mut partcount = 0;
        let stairs = ps.range(0, 1) == 0 && partlength >= 3;

        for _ in 0..length {
            if partcount >= partlength {
                dir = turn_xz(dir, 1);
                partlength = ps.range(1, 13);
                partcount = 0;
            }
            let next = pos + dir;
            if !vm.area.contains(next)
                || next.x < node_min.x
                || next.x > node_max.x
                || next.z < node_min.z
                || next.z > node_max.z
                || next.y < node_min.y
                || next.y > node_max.y
            {
                dir = turn_xz(dir, 1);
                partcount = 0;
                continue;
            }

            let rise = if stairs && partlength >= 3 { ps.range(-1, 1) } else { 0 };
            let floor_y = next.y + rise.min(0) as i16;
            let height = if rise != 0 { 5 } else { 4 };

            for dy in 0..height {
                for dz in -1..=1i16 {
                    for dx in -1..=1i16 {
                        let p = Pos3::new(next.x + dx, floor_y + dy as i16, next.z + dz);
                        if !vm.area.contains(p) || vm.flags(p).contains(VoxelFlags::DUNGEON_UNTOUCHABLE) {
                            continue;
                        }
                        let is_hole = dx == 0 && dz == 0 && dy < 2;
                        if is_hole {
                            vm.set(p, Voxel::AIR);
                            vm.add_flags(p, VoxelFlags::DUNGEON_INSIDE);
                        } else {
                            vm.set(p, Voxel::new(self.nodes.cobble));
                        }
                    }
                }
            }

            if rise != 0 {
                let stair_pos = Pos3::new(next.x, floor_y, next.z);
                if vm.area.contains(stair_pos) {
                    vm.set(stair_pos, Voxel::new(self.nodes.stair_cobble));
                }
            }

            pos = Pos3::new(next.x, floor_y, next.z);
            partcount += 1;
        }
        pos
    }

    /// Up to 30 random walker steps looking for a wall to place the next
    /// room's door against, without overlapping `DUNGEON_INSIDE`.
    fn find_place_for_room_door(
        &self,
        vm: &VoxelManipulator,
        ps: &mut PseudoRandom,
        start: Pos3,
        node_min: Pos3,
        node_max: Pos3,
    ) -> Option<Room> {
        let mut pos = start;
        let mut dir = rand_ortho_dir(ps);
        for _ in 0..30 {
            let next = pos + dir;
            if !vm.area.contains(next) {
                dir = random_turn(ps, dir);
                continue;
            }
            let size = self.roll_room_size(ps);
            let along = ps.range(-(size.x as i32) + 2, -2) as i16;
            let place = Pos3::new(next.x + along, next.y, next.z);
            let room = Room { place, size };
            if room.place.x >= node_min.x - START_PADDING
                && room.place.z >= node_min.z - START_PADDING
                && room.place.x + room.size.x <= node_max.x + START_PADDING
                && room.place.z + room.size.z <= node_max.z + START_PADDING
                && self.room_fits(vm, room)
            {
                return Some(room);
            }
            pos = next;
        }
        None
    }

    /// Final ageing pass: every cobble voxel becomes mossy cobble where
    /// the local density noise falls below a third of the wetness noise.
    fn age_cobble(&self, vm: &mut VoxelManipulator) {
        let area = vm.area;
        let seed = self.seed as i64;
        let np = &self.params.nodes;
        for z in area.min.z..=area.max.z {
            for y in area.min.y..=area.max.y {
                for x in area.min.x..=area.max.x {
                    let p = Pos3::new(x, y, z);
                    if vm.get(p).content_id != self.nodes.cobble {
                        continue;
                    }
                    let wetness = noise2d_perlin(x as f64, z as f64, seed + 31, &np.np_dungeon_wetness);
                    let density = noise2d_perlin(x as f64, z as f64, seed + 32, &np.np_dungeon_density);
                    if density < wetness / 3.0 {
                        vm.set(p, Voxel::new(self.nodes.mossy_cobble));
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Room {
    place: Pos3,
    size: Pos3,
}

impl Room {
    fn center(&self) -> Pos3 {
        Pos3::new(
            self.place.x + self.size.x / 2,
            self.place.y + self.size.y / 2,
            self.place.z + self.size.z / 2,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MapgenFlags, MapgenParams, NoiseParamSet};
    use crate::noise::NoiseParams;
    use crate::voxel::VoxelArea;

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
        NoiseParams::new(offset, 1.0, [30.0, 30.0, 30.0], 0, 3, 0.6)
    }

    fn params() -> MapgenParams {
        MapgenParams {
            flags: MapgenFlags::default(),
            water_level: 1,
            chunksize: 80,
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

    fn solid_chunk(node_min: Pos3, node_max: Pos3, stone: mapgen_core::registry::ContentId) -> (VoxelManipulator, Pos3, Pos3) {
        let area = VoxelArea::new(
            node_min - Pos3::new(16, 16, 16),
            node_max + Pos3::new(16, 16, 16),
        );
        let mut vm = VoxelManipulator::new(area);
        for z in area.min.z..=area.max.z {
            for y in area.min.y..=area.max.y {
                for x in area.min.x..=area.max.x {
                    vm.set(Pos3::new(x, y, z), Voxel::new(stone));
                }
            }
        }
        (vm, node_min, node_max)
    }

    /// S5: the preserve pass sets DUNGEON_PRESERVE exactly on the chunk's
    /// natural AIR/water voxels.
    #[test]
    fn preserve_pass_marks_only_air_and_water() {
        let p = params();
        let (mut vm, node_min, node_max) = solid_chunk(Pos3::new(0, 0, 0), Pos3::new(79, 79, 79), ids().stone);
        let bubble = Pos3::new(8, 8, 8);
        vm.set(bubble, Voxel::AIR);
        let gen = DungeonGen { seed: 1, nodes: ids(), params: &p };
        gen.mark_preserve(&mut vm);
        assert!(vm.flags(bubble).contains(VoxelFlags::DUNGEON_PRESERVE));
        let other = Pos3::new(9, 8, 8);
        assert!(!vm.flags(other).contains(VoxelFlags::DUNGEON_PRESERVE));
    }

    #[test]
    fn room_roll_sizes_are_within_documented_bounds() {
        let p = params();
        let gen = DungeonGen { seed: 1, nodes: ids(), params: &p };
        let mut ps = PseudoRandom::new(123);
        for _ in 0..100 {
            let size = gen.roll_room_size(&mut ps);
            let small = (4..=8).contains(&size.x) && (4..=6).contains(&size.y) && (4..=8).contains(&size.z);
            let large = (8..=16).contains(&size.x) && size.x == size.y && size.y == size.z;
            assert!(small || large, "size {:?} out of documented bounds", size);
        }
    }

    #[test]
    fn dungeon_generation_does_not_overwrite_untouchable() {
        let p = params();
        let (mut vm, node_min, node_max) = solid_chunk(Pos3::new(0, 0, 0), Pos3::new(79, 79, 79), ids().stone);
        // Seed an existing dungeon-preserve bubble away from the room search area.
        let preserved = Pos3::new(70, 70, 70);
        vm.set(preserved, Voxel::AIR);
        let gen = DungeonGen { seed: 55, nodes: ids(), params: &p };
        gen.mark_preserve(&mut vm);
        assert!(vm.flags(preserved).contains(VoxelFlags::DUNGEON_PRESERVE));
        gen.generate(&mut vm, node_min, node_max);
        // T8: a preserved AIR voxel is never overwritten by the dungeon pass.
        assert!(vm.get(preserved).is_air());
    }

    #[test]
    fn turn_xz_four_turns_is_identity() {
        let dir = Pos3::new(1, 0, 0);
        assert_eq!(turn_xz(dir, 4), dir);
    }
}
