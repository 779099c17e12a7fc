use crate::Error;
use std::num::NonZeroUsize;

/// BatchPolicy is the number of records grouped into each flush.
///
/// A policy of one degenerates to row-by-row submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct BatchPolicy {
    batch_size: NonZeroUsize,
}

impl BatchPolicy {
    pub const DEFAULT_BATCH_SIZE: usize = 100;

    pub fn new(batch_size: usize) -> Result<Self, Error> {
        match NonZeroUsize::new(batch_size) {
            Some(batch_size) => Ok(Self { batch_size }),
            None => Err(Error::InvalidBatchSize(batch_size)),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.get()
    }

    /// Returns true if a flush is due after the record at 1-based `position`.
    /// Flushes fall after the Nth, 2Nth, ... record.
    pub fn is_boundary(&self, position: usize) -> bool {
        position != 0 && position % self.batch_size() == 0
    }

    /// Number of store round trips needed to flush `records` under this policy,
    /// counting the trailing partial group.
    pub fn round_trips(&self, records: usize) -> usize {
        let batch_size = self.batch_size();
        records / batch_size + usize::from(records % batch_size != 0)
    }
}

impl Default for BatchPolicy {
    fn default() -> Self {
        const DEFAULT: NonZeroUsize = match NonZeroUsize::new(BatchPolicy::DEFAULT_BATCH_SIZE) {
            Some(batch_size) => batch_size,
            None => panic!("default batch size is zero"),
        };
        Self { batch_size: DEFAULT }
    }
}

impl TryFrom<usize> for BatchPolicy {
    type Error = Error;

    fn try_from(batch_size: usize) -> Result<Self, Self::Error> {
        Self::new(batch_size)
    }
}

impl From<BatchPolicy> for usize {
    fn from(policy: BatchPolicy) -> Self {
        policy.batch_size()
    }
}

impl std::str::FromStr for BatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let batch_size: usize = s.parse().map_err(|err| format!("{err}"))?;
        Self::new(batch_size).map_err(|err| err.to_string())
    }
}
