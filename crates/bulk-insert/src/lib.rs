//! Batch insertion engine for loading ordered collections of uniform
//! records into a relational store.
//!
//! Records are submitted by one of several strategies (see [`StrategyId`]),
//! each of which trades memory footprint, round-trip count, and statement
//! size against one another. Every load runs inside exactly one
//! [`Boundary`], so a failed load leaves the store unchanged.

/// Cause is an underlying store error carried as the source of an [`Error`].
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to open store connection {uri}")]
    Connection {
        uri: String,
        #[source]
        err: Cause,
    },
    #[error("statement was rejected by the store: {query}")]
    Statement {
        query: String,
        #[source]
        err: Cause,
    },
    #[error("statement expects {expected} bound parameters, but {actual} were bound")]
    ParameterCount { expected: usize, actual: usize },
    #[error(
        "multi-row statement for {records} records binds {params} parameters, exceeding the store limit of {limit}"
    )]
    ParameterLimit {
        records: usize,
        params: usize,
        limit: usize,
    },
    #[error("batch of {size} rows was rejected at row {index}")]
    BatchExecution {
        size: usize,
        index: usize,
        #[source]
        err: Cause,
    },
    #[error("failed to begin transaction")]
    Begin(#[source] Cause),
    #[error("failed to commit transaction")]
    Commit(#[source] Cause),
    #[error("failed to roll back transaction")]
    Rollback(#[source] Cause),
    #[error("batch size must be at least one (got {0})")]
    InvalidBatchSize(usize),
}

mod boundary;
mod instrument;
mod policy;
mod record;
mod sqlite;
mod store;
mod strategy;
mod target;
mod unit_of_work;

pub use boundary::{run_in_open_transaction, run_in_transaction, Boundary, BoundaryState};
pub use instrument::{Instrumented, InstrumentedStatement, RoundTrips};
pub use policy::BatchPolicy;
pub use record::Record;
pub use sqlite::{SqliteSession, SqliteStatement};
pub use store::{Session, Statement, Value};
pub use strategy::{multi_row, prepared, row_by_row, staged, Grouping, StrategyId};
pub use target::Target;
pub use unit_of_work::{StagingBuffer, UnitOfWork};

/// Load `records` into `target` using the given `strategy`, within a single
/// new transaction on `session`.
///
/// The transaction commits only if every record was submitted. On any failure
/// it's rolled back and the originating error is returned. It's an error if
/// `session` already has an open transaction: use [`insert_joined`] to load
/// within a transaction the caller owns.
pub fn insert<S: Session>(
    strategy: StrategyId,
    session: &mut S,
    target: &Target,
    records: &[Record],
    policy: BatchPolicy,
) -> Result<(), Error> {
    let () = run_in_transaction(session, |session| {
        strategy.insert(session, target, records, policy)
    })?;

    log_completed(strategy, target, records, policy, false);
    Ok(())
}

/// Load `records` as [`insert`] does, but within the transaction which the
/// caller already opened on `session`. The caller decides whether the load
/// is committed or rolled back.
pub fn insert_joined<S: Session>(
    strategy: StrategyId,
    session: &mut S,
    target: &Target,
    records: &[Record],
    policy: BatchPolicy,
) -> Result<(), Error> {
    let () = run_in_open_transaction(session, |session| {
        strategy.insert(session, target, records, policy)
    })?;

    log_completed(strategy, target, records, policy, true);
    Ok(())
}

fn log_completed(
    strategy: StrategyId,
    target: &Target,
    records: &[Record],
    policy: BatchPolicy,
    joined: bool,
) {
    tracing::info!(
        %strategy,
        records = records.len(),
        batch_size = policy.batch_size(),
        table = %target.table(),
        joined,
        "bulk load completed"
    );
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn error_messages() {
        insta::assert_snapshot!(
            Error::ParameterCount { expected: 3, actual: 2 },
            @"statement expects 3 bound parameters, but 2 were bound");
        insta::assert_snapshot!(
            Error::ParameterLimit { records: 20000, params: 60000, limit: 32766 },
            @"multi-row statement for 20000 records binds 60000 parameters, exceeding the store limit of 32766");
        insta::assert_snapshot!(
            Error::InvalidBatchSize(0),
            @"batch size must be at least one (got 0)");
    }

    #[test]
    fn insert_commits_every_record() {
        let target = Target::default();
        let mut session = SqliteSession::open_in_memory().unwrap();
        session.create_table(&target).unwrap();

        let records = Record::generate_with_ids(7);
        insert(
            StrategyId::PreparedBatch,
            &mut session,
            &target,
            &records,
            BatchPolicy::new(3).unwrap(),
        )
        .unwrap();

        assert!(!session.in_transaction());
        assert_eq!(session.load_all(&target).unwrap(), records);
    }
}
