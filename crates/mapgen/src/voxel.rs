//! The mutable voxel buffer shared between every generation pass.
//!
//! A [`VoxelManipulator`] is a flat array of [`Voxel`] plus a parallel array
//! of scratch flag bytes, both addressed through a single [`VoxelArea`]
//! linear-indexing scheme. Every pass in this crate (terrain, caves,
//! dungeons) borrows the same buffer and area; none of them own a copy.

use bitflags::bitflags;
use mapgen_core::pos::Pos3;
use mapgen_core::registry::{ContentId, CONTENT_AIR, CONTENT_IGNORE};
use serde::{Deserialize, Serialize};

/// A single voxel: a node id plus its two packed parameter bytes.
///
/// `param1`/`param2` carry node-specific state (light level, facedir,
/// liquid level, ...); the core never interprets them beyond preserving
/// whatever the terrain/cave/dungeon pass assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Voxel {
    pub content_id: ContentId,
    pub param1: u8,
    pub param2: u8,
}

impl Voxel {
    pub const IGNORE: Voxel = Voxel {
        content_id: CONTENT_IGNORE,
        param1: 0,
        param2: 0,
    };

    pub const AIR: Voxel = Voxel {
        content_id: CONTENT_AIR,
        param1: 0,
        param2: 0,
    };

    pub fn new(content_id: ContentId) -> Self {
        Self {
            content_id,
            param1: 0,
            param2: 0,
        }
    }

    pub fn is_ignore(&self) -> bool {
        self.content_id == CONTENT_IGNORE
    }

    pub fn is_air(&self) -> bool {
        self.content_id == CONTENT_AIR
    }
}

bitflags! {
    /// Scratch flag bits carried alongside every voxel. All of these are
    /// core-internal working state; nothing outside a `generate` call
    /// reads them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct VoxelFlags: u8 {
        /// Set where a cave pass wrote air.
        const CHECKED_CAVE        = 0b0000_0001;
        /// Air inside a dungeon room or corridor.
        const DUNGEON_INSIDE      = 0b0000_0010;
        /// Air or water pre-existing where dungeons must not grow.
        const DUNGEON_PRESERVE    = 0b0000_0100;
    }
}

impl VoxelFlags {
    /// `DUNGEON_INSIDE | DUNGEON_PRESERVE` — neither carving nor
    /// overwriting is permitted here.
    pub const DUNGEON_UNTOUCHABLE: VoxelFlags =
        VoxelFlags::from_bits_truncate(Self::DUNGEON_INSIDE.bits() | Self::DUNGEON_PRESERVE.bits());
}

/// An axis-aligned, inclusive-both-ends integer box with a fixed linear
/// indexing scheme shared by every 3-D buffer in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoxelArea {
    pub min: Pos3,
    pub max: Pos3,
}

impl VoxelArea {
    pub fn new(min: Pos3, max: Pos3) -> Self {
        debug_assert!(min.x <= max.x && min.y <= max.y && min.z <= max.z);
        Self { min, max }
    }

    pub fn stride_y(&self) -> i32 {
        self.max.x as i32 - self.min.x as i32 + 1
    }

    pub fn stride_z(&self) -> i32 {
        self.stride_y() * (self.max.y as i32 - self.min.y as i32 + 1)
    }

    pub fn volume(&self) -> usize {
        (self.stride_y() as i64 * (self.max.z as i64 - self.min.z as i64 + 1)) as usize
    }

    pub fn contains(&self, p: Pos3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// `i = (x - min.x) + (y - min.y)*stride_y + (z - min.z)*stride_z`
    pub fn index(&self, p: Pos3) -> usize {
        debug_assert!(self.contains(p), "position {:?} outside area {:?}", p, self);
        let x = (p.x as i32 - self.min.x as i32) as i64;
        let y = (p.y as i32 - self.min.y as i32) as i64 * self.stride_y() as i64;
        let z = (p.z as i32 - self.min.z as i32) as i64 * self.stride_z() as i64;
        (x + y + z) as usize
    }
}

/// The mutable buffer every pass carves into: a flat voxel array, a
/// parallel flag array, and the area that addresses both.
#[derive(Debug, Clone)]
pub struct VoxelManipulator {
    pub area: VoxelArea,
    data: Vec<Voxel>,
    flags: Vec<VoxelFlags>,
}

impl VoxelManipulator {
    /// Allocate a buffer covering `area`, every voxel initialised to
    /// `IGNORE` and every flag cleared.
    pub fn new(area: VoxelArea) -> Self {
        let volume = area.volume();
        Self {
            area,
            data: vec![Voxel::IGNORE; volume],
            flags: vec![VoxelFlags::empty(); volume],
        }
    }

    pub fn get(&self, p: Pos3) -> Voxel {
        self.data[self.area.index(p)]
    }

    pub fn set(&mut self, p: Pos3, v: Voxel) {
        let i = self.area.index(p);
        self.data[i] = v;
    }

    pub fn flags(&self, p: Pos3) -> VoxelFlags {
        self.flags[self.area.index(p)]
    }

    pub fn set_flags(&mut self, p: Pos3, f: VoxelFlags) {
        let i = self.area.index(p);
        self.flags[i] = f;
    }

    pub fn add_flags(&mut self, p: Pos3, f: VoxelFlags) {
        let i = self.area.index(p);
        self.flags[i] |= f;
    }

    /// True if the voxel at `p` is neither a recognised air/liquid/ice nor
    /// `IGNORE` — i.e. caves are permitted to carve through it. Callers
    /// supply the set of "liquid-or-gas" ids since that set is externally
    /// owned (water, lava, ice, air).
    pub fn is_ground_content(&self, p: Pos3, non_ground: &[ContentId]) -> bool {
        let v = self.get(p);
        !v.is_ignore() && !non_ground.contains(&v.content_id)
    }
}
