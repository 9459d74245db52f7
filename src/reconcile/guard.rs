// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Non-blocking single-flight guard for mutating cycles.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Held for the duration of a cycle; dropping it frees the slot.
#[derive(Debug)]
pub struct FlightGuard {
    _permit: OwnedSemaphorePermit,
}

/// Admits one cycle at a time. A second trigger is rejected and counted,
/// never queued.
#[derive(Debug)]
pub struct SingleFlight {
    slot: Arc<Semaphore>,
    skipped: AtomicU64,
}

impl Default for SingleFlight {
    fn default() -> Self {
        Self::new()
    }
}

impl SingleFlight {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Semaphore::new(1)),
            skipped: AtomicU64::new(0),
        }
    }

    pub fn try_begin(&self) -> Option<FlightGuard> {
        match Arc::clone(&self.slot).try_acquire_owned() {
            Ok(permit) => Some(FlightGuard { _permit: permit }),
            Err(_) => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        self.slot.available_permits() == 0
    }

    /// Triggers rejected so far.
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}
