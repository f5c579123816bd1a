use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use guild_types::Timepoint;

/// Source of the current [`Timepoint`] for checkpoints and lookups.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timepoint;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Timepoint {
        (**self).now()
    }
}

/// Wall-clock seconds that never go backwards.
///
/// If the system clock steps back, the last returned value is repeated
/// until wall time catches up.
#[derive(Debug, Default)]
pub struct SystemClock {
    high_water: Mutex<u64>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timepoint {
        let wall = Timepoint::now().as_secs();
        let mut high_water = self
            .high_water
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *high_water = wall.max(*high_water);
        Timepoint(*high_water)
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    secs: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timepoint) -> Self {
        Self {
            secs: AtomicU64::new(start.as_secs()),
        }
    }

    pub fn set(&self, timepoint: Timepoint) {
        self.secs.store(timepoint.as_secs(), Ordering::SeqCst);
    }

    /// Move forward by `secs`, returning the new time.
    pub fn advance(&self, secs: u64) -> Timepoint {
        Timepoint(self.secs.fetch_add(secs, Ordering::SeqCst) + secs)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timepoint {
        Timepoint(self.secs.load(Ordering::SeqCst))
    }
}
