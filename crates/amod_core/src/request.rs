//! Immutable ride requests, as read from the (out-of-scope) trace reader.

use crate::types::TimeMs;
use serde::{Deserialize, Serialize};

/// One row of the request trace. Immutable once created; the Platform turns
/// due requests into `Order`s, it never mutates a `Request`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub origin_node_id: usize,
    pub destination_node_id: usize,
    /// Milliseconds from day-start, before simulation-start rebasing.
    pub request_time_ms: TimeMs,
    /// Wall-clock date the request trace recorded this request under, kept
    /// only for reporting; dispatch never reads it.
    pub request_time_date: String,
}
