use crate::config::Config;
use anyhow::Context;
use bulk_insert::{BatchPolicy, Instrumented, Record, SqliteSession, StrategyId, Target};
use std::time::Instant;

/// Harness measures loads of generated records into a single store table.
/// Loads run one after another, never concurrently.
pub struct Harness {
    session: Instrumented<SqliteSession>,
    target: Target,
    records: usize,
}

/// Measurement is the outcome of one load.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub strategy: StrategyId,
    /// Batch size of the load, if the strategy uses one.
    pub batch_size: Option<usize>,
    pub records: usize,
    pub elapsed_ms: f64,
    /// KiB allocated by the load, including memory it has since freed.
    /// On Linux this includes SQLite's own allocations, which jemalloc
    /// serves in place of the C allocator.
    pub allocated_kb: u64,
    /// KiB allocated by the load and still held when it completed.
    pub retained_kb: i64,
    /// Calls made to the Rust global allocator by the load.
    pub allocations: u64,
    pub round_trips: usize,
    /// Rows found in the table after the load.
    pub rows: usize,
}

impl Harness {
    pub fn open(config: &Config) -> anyhow::Result<Harness> {
        let session = SqliteSession::open(&config.database)?;
        let target = Target::new(config.table.as_str());

        session
            .create_table(&target)
            .with_context(|| format!("failed to create table {}", target.table()))?;

        Ok(Harness {
            session: Instrumented::new(session),
            target,
            records: config.records,
        })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Load freshly generated records with `strategy` into an emptied table,
    /// measuring time, memory, and round trips of the load alone.
    pub fn measure(
        &mut self,
        strategy: StrategyId,
        policy: BatchPolicy,
    ) -> anyhow::Result<Measurement> {
        // Staged loads leave id assignment to the store.
        let records = match strategy {
            StrategyId::Staged => Record::generate(self.records),
            _ => Record::generate_with_ids(self.records),
        };

        // Settle the store and allocator before the window opens.
        let deleted = self.session.inner().truncate(&self.target)?;
        let _ = self.session.reset();
        tracing::debug!(%strategy, deleted, "emptied table before measurement");

        let window = allocator::Window::open();
        let started = Instant::now();

        bulk_insert::insert(strategy, &mut self.session, &self.target, &records, policy)
            .with_context(|| format!("{strategy} load of {} records failed", records.len()))?;

        let elapsed = started.elapsed();
        let usage = window.close();
        let round_trips = self.session.reset();

        let rows = self.session.inner().count(&self.target)?;

        let measurement = Measurement {
            strategy,
            batch_size: strategy.uses_batch_policy().then(|| policy.batch_size()),
            records: records.len(),
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
            allocated_kb: usage.allocated / 1024,
            retained_kb: usage.retained / 1024,
            allocations: usage.counts.alloc_ops,
            round_trips: round_trips.round_trips,
            rows,
        };
        tracing::info!(
            ?measurement,
            resident_kb = allocator::global_stats().resident / 1024,
            "measured load"
        );

        Ok(measurement)
    }

    /// Measure each of `strategies` in turn under `policy`.
    pub fn compare(
        &mut self,
        strategies: &[StrategyId],
        policy: BatchPolicy,
    ) -> anyhow::Result<Vec<Measurement>> {
        strategies
            .iter()
            .map(|strategy| self.measure(*strategy, policy))
            .collect()
    }

    /// Measure the staged strategy under each of `policies` in turn.
    pub fn sweep(&mut self, policies: &[BatchPolicy]) -> anyhow::Result<Vec<Measurement>> {
        policies
            .iter()
            .map(|policy| self.measure(StrategyId::Staged, *policy))
            .collect()
    }
}
