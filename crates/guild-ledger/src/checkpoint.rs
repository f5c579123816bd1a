use guild_types::Timepoint;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// A `(timepoint, value)` record in a [`Trace`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub timepoint: Timepoint,
    pub value: u64,
}

/// Append-only checkpoint history ordered by timepoint.
///
/// Timepoints are strictly increasing. Pushing at the latest timepoint
/// overwrites that checkpoint's value instead of appending a duplicate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trace {
    checkpoints: Vec<Checkpoint>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` at `timepoint`, returning `(previous, value)`.
    pub fn push(&mut self, timepoint: Timepoint, value: u64) -> Result<(u64, u64), LedgerError> {
        let previous = self.latest();
        if let Some(last) = self.checkpoints.last_mut() {
            if last.timepoint > timepoint {
                return Err(LedgerError::UnorderedCheckpoint {
                    last: last.timepoint,
                    attempted: timepoint,
                });
            }
            if last.timepoint == timepoint {
                last.value = value;
                return Ok((previous, value));
            }
        }
        self.checkpoints.push(Checkpoint { timepoint, value });
        Ok((previous, value))
    }

    /// Value of the most recent checkpoint, or 0.
    pub fn latest(&self) -> u64 {
        self.checkpoints.last().map(|c| c.value).unwrap_or(0)
    }

    pub fn last_timepoint(&self) -> Option<Timepoint> {
        self.checkpoints.last().map(|c| c.timepoint)
    }

    /// Whether timepoints strictly increase along the series.
    pub fn is_ordered(&self) -> bool {
        self.checkpoints
            .windows(2)
            .all(|pair| pair[0].timepoint < pair[1].timepoint)
    }

    /// Value of the latest checkpoint at or before `timepoint`, or 0.
    pub fn upper_lookup(&self, timepoint: Timepoint) -> u64 {
        let after = self
            .checkpoints
            .partition_point(|c| c.timepoint <= timepoint);
        if after == 0 {
            0
        } else {
            self.checkpoints[after - 1].value
        }
    }

    pub fn get(&self, position: usize) -> Option<Checkpoint> {
        self.checkpoints.get(position).copied()
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}
