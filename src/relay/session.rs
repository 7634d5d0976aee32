//! Relay Session Statistics

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

/// Direction of a single copy pump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToTarget,
    TargetToClient,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ClientToTarget => f.write_str("client->target"),
            Direction::TargetToClient => f.write_str("target->client"),
        }
    }
}

/// Byte counters shared by the two pumps of one relay
#[derive(Debug)]
pub struct RelayCounters {
    start_time: Instant,
    bytes_up: AtomicU64,
    bytes_down: AtomicU64,
}

impl RelayCounters {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            bytes_up: AtomicU64::new(0),
            bytes_down: AtomicU64::new(0),
        }
    }

    pub fn add(&self, direction: Direction, bytes: u64) {
        let counter = match direction {
            Direction::ClientToTarget => &self.bytes_up,
            Direction::TargetToClient => &self.bytes_down,
        };
        counter.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn bytes_up(&self) -> u64 {
        self.bytes_up.load(Ordering::Relaxed)
    }

    pub fn bytes_down(&self) -> u64 {
        self.bytes_down.load(Ordering::Relaxed)
    }

    pub fn duration(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for RelayCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of a finished relay
#[derive(Debug)]
pub struct RelayReport {
    /// The direction whose completion ended the relay
    pub finished: Direction,
    /// `Ok` on EOF, the I/O error otherwise
    pub result: std::io::Result<()>,
    pub bytes_up: u64,
    pub bytes_down: u64,
    pub duration: Duration,
}

impl RelayReport {
    pub fn total_bytes(&self) -> u64 {
        self.bytes_up + self.bytes_down
    }

    pub fn log_stats(&self) {
        info!(
            finished = %self.finished,
            duration_ms = self.duration.as_millis() as u64,
            bytes_up = self.bytes_up,
            bytes_down = self.bytes_down,
            total_bytes = self.total_bytes(),
            clean = self.result.is_ok(),
            "Relay session completed"
        );
    }
}
