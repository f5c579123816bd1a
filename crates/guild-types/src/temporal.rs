use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A point in time for vote checkpoints, in seconds since the UNIX epoch.
///
/// Checkpoint series are ordered by `Timepoint`; two weight changes at the
/// same timepoint collapse into one checkpoint.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timepoint(pub u64);

impl Timepoint {
    pub const ZERO: Self = Self(0);

    /// Clock-mode descriptor reported alongside timepoints.
    pub const CLOCK_MODE: &'static str = "mode=timestamp";

    /// Current wall-clock time.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn saturating_add(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }
}

impl From<u64> for Timepoint {
    fn from(secs: u64) -> Self {
        Self(secs)
    }
}

impl fmt::Debug for Timepoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timepoint({}s)", self.0)
    }
}

impl fmt::Display for Timepoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
