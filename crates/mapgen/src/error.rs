//! Error classification for the mapgen core.
//!
//! Per the contract, only one of three things ever happens: a programmer
//! contract violation aborts the process (an assertion, not a recoverable
//! `Result`), a missing node registration degrades silently to a fallback
//! id, or a dungeon-placement dead end abandons that one pass silently.
//! [`GenerationError`] exists only for the first class, surfaced to
//! callers that want to turn an `assert!` into a typed panic payload for
//! testing.

use thiserror::Error;

/// Programmer-contract violations detected at the start of a `generate`
/// call. These are assertions, not recoverable errors; `generate` panics
/// with one of these as the payload rather than returning a `Result`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("voxel manipulator area does not cover the requested chunk plus margin")]
    AreaTooSmall,
    #[error("requested y range exceeds the supported map generation limit")]
    YRangeOutOfBounds,
}
