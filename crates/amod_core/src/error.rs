//! Error taxonomy for the dispatch engine.
//!
//! Three classes, matching the propagation policy of the design: programmer
//! errors abort via `assert!`/`panic!` at the point of detection and never
//! reach this type; `SimError` only carries the two classes that are meant
//! to be caught and handled by a caller (solver failures, user/config
//! failures), plus `Io` for the external-loader seam.

use std::fmt;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SimError>;

/// Errors that a caller is expected to recover from.
///
/// Invariant violations (bad node id, schedule/load mismatch, negative
/// duration after truncation) are not represented here: they abort via
/// `assert!`/`unreachable!` at the point they're detected, since they
/// indicate a bug in the scheduler rather than a condition the platform
/// can meaningfully recover from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// The assignment solver failed to produce a selection. The epoch
    /// proceeds with vehicles unchanged; this is never fatal.
    Solver(String),
    /// Bad configuration or malformed input tables, detected at startup.
    User(String),
    /// The external data-loading seam (out of scope for this crate) failed.
    Io(String),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Solver(msg) => write!(f, "solver error: {msg}"),
            SimError::User(msg) => write!(f, "configuration error: {msg}"),
            SimError::Io(msg) => write!(f, "io error: {msg}"),
        }
    }
}

impl std::error::Error for SimError {}
