//! Node-definition registry lookup with degraded-aesthetic fallbacks.
//!
//! The mapgen core never defines node content itself; it resolves a handful
//! of well-known node names against an externally owned registry once at
//! construction and caches the resulting ids. Names that are missing fall
//! back to a close substitute rather than failing generation (see the
//! "missing node registrations" error class).

use thiserror::Error;

/// Opaque content id, looked up by name from the external node registry.
pub type ContentId = u16;

/// Reserved content id for an empty voxel.
pub const CONTENT_AIR: ContentId = 0;

/// Reserved content id for an as-yet-ungenerated voxel.
pub const CONTENT_IGNORE: ContentId = u16::MAX;

/// Errors raised while resolving node names against the registry.
///
/// These never abort generation; [`NodeRegistry::resolve_or_fallback`]
/// absorbs them into a substitute id.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("node name `{0}` is not registered")]
    Unknown(String),
}

/// Read-only view over the externally owned node-definition table.
///
/// Implementors back this with whatever registry the embedding engine
/// already maintains; the mapgen core only ever looks names up by string
/// once, at construction time, and caches the resulting ids.
pub trait NodeRegistry {
    /// Look up a node id by its registered name.
    fn lookup(&self, name: &str) -> Result<ContentId, RegistryError>;

    /// Resolve `name`, falling back to `fallback` if it is unregistered.
    ///
    /// This implements the degraded-aesthetic fallback rules: a missing
    /// `ice` becomes air, missing `mossycobble`/`stair_*` variants fall
    /// back to plain cobble, and missing `sandstonebrick` falls back to
    /// sandstone. Callers pick the right `fallback` id for the name in
    /// question; this helper just centralizes the "don't error" policy.
    fn resolve_or_fallback(&self, name: &str, fallback: ContentId) -> ContentId {
        self.lookup(name).unwrap_or(fallback)
    }
}

/// A simple in-memory registry, useful for tests and for embeddings that
/// don't need a more elaborate backing store.
#[derive(Debug, Default, Clone)]
pub struct StaticRegistry {
    names: Vec<(String, ContentId)>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, id: ContentId) -> &mut Self {
        self.names.push((name.into(), id));
        self
    }
}

impl NodeRegistry for StaticRegistry {
    fn lookup(&self, name: &str) -> Result<ContentId, RegistryError> {
        self.names
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
            .ok_or_else(|| RegistryError::Unknown(name.to_string()))
    }
}
