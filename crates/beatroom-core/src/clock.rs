//! Wall-clock abstraction and server-anchor translation.
//!
//! The authoritative server timestamps its broadcasts with its own
//! wall-clock. Translation into the local clock domain assumes negligible
//! one-way latency variance; the approximation is re-applied on every
//! broadcast and bounded by the reconciler's drift threshold.

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of local wall-clock time in epoch milliseconds.
pub trait WallClock {
    fn now_ms(&self) -> f64;
}

/// System wall-clock (epoch milliseconds via `SystemTime`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now_ms(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }
}

/// Authoritative time anchor carried by a state broadcast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServerAnchor {
    /// Server wall-clock time at which beat 0 of the session began.
    pub start_epoch_ms: f64,
    /// Server wall-clock time at which the state was sent.
    pub server_epoch_ms: f64,
}

/// A server anchor translated into the local wall-clock domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranslatedAnchor {
    /// `local_now - server_epoch_ms` at receipt.
    pub offset_ms: f64,
    /// Local wall-clock time of beat 0.
    pub local_start_ms: f64,
}

impl ServerAnchor {
    /// Translate into the local clock domain given the local wall-clock
    /// time at receipt.
    pub fn translate(&self, local_now_ms: f64) -> TranslatedAnchor {
        let offset_ms = local_now_ms - self.server_epoch_ms;
        TranslatedAnchor {
            offset_ms,
            local_start_ms: self.start_epoch_ms + offset_ms,
        }
    }
}
