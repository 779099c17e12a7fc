pub mod multi_row;
pub mod prepared;
pub mod row_by_row;
pub mod staged;

pub use prepared::Grouping;

use crate::{BatchPolicy, Error, Record, Session, Target};

/// StrategyId selects how records are turned into store operations.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    clap::ValueEnum,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyId {
    /// Stage records in a unit of work, flushing and clearing it after each
    /// full batch and once more at the end.
    Staged,
    /// Bind records to one prepared insert and submit the pending batch
    /// after each full batch and once more at the end.
    PreparedBatch,
    /// Bind every record to one prepared insert and submit them all as a
    /// single batch. The batch policy is ignored.
    StoreBatch,
    /// Insert all records with one statement of repeated value tuples.
    /// The batch policy is ignored.
    MultiRow,
    /// Execute one insert per record, without batching.
    RowByRow,
}

impl StrategyId {
    pub const ALL: [StrategyId; 5] = [
        StrategyId::Staged,
        StrategyId::PreparedBatch,
        StrategyId::StoreBatch,
        StrategyId::MultiRow,
        StrategyId::RowByRow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyId::Staged => "staged",
            StrategyId::PreparedBatch => "prepared-batch",
            StrategyId::StoreBatch => "store-batch",
            StrategyId::MultiRow => "multi-row",
            StrategyId::RowByRow => "row-by-row",
        }
    }

    /// Returns true if this strategy's round trips depend on the batch policy.
    pub fn uses_batch_policy(&self) -> bool {
        matches!(self, StrategyId::Staged | StrategyId::PreparedBatch)
    }

    /// Submit `records` to `target` through `session` using this strategy.
    ///
    /// This doesn't demarcate a transaction: callers wrap it in a Boundary,
    /// as `crate::insert` does.
    pub fn insert<S: Session>(
        &self,
        session: &S,
        target: &Target,
        records: &[Record],
        policy: BatchPolicy,
    ) -> Result<(), Error> {
        match self {
            StrategyId::Staged => staged::insert(session, target, records, policy),
            StrategyId::PreparedBatch => {
                prepared::insert(session, target, records, Grouping::Policy(policy))
            }
            StrategyId::StoreBatch => prepared::insert(session, target, records, Grouping::Whole),
            StrategyId::MultiRow => multi_row::insert(session, target, records),
            StrategyId::RowByRow => row_by_row::insert(session, target, records),
        }
    }
}

impl std::fmt::Display for StrategyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
