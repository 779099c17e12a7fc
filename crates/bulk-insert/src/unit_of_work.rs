use crate::{Error, Record, Statement};

/// UnitOfWork is an in-memory staging area of pending writes.
pub trait UnitOfWork {
    /// Stage `record` as a pending write.
    fn stage(&mut self, record: &Record);
    /// Send all pending writes to the store in one round trip,
    /// returning the number of rows sent. Flushing with nothing pending
    /// is a no-op.
    fn flush(&mut self) -> Result<usize, Error>;
    /// Release all staged records from memory. Records already flushed
    /// remain written; pending records are discarded unsent.
    fn clear(&mut self);
    /// Number of records currently held, flushed or not.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// StagingBuffer is a UnitOfWork which flushes through a prepared insert
/// Statement, submitting its pending records as one batch.
///
/// Flushed records stay held until `clear()`, so memory grows with the
/// number of records staged between clears.
pub struct StagingBuffer<St> {
    statement: St,
    pending: Vec<Record>,
    flushed: Vec<Record>,
    high_water: usize,
}

impl<St: Statement> StagingBuffer<St> {
    pub fn new(statement: St) -> Self {
        Self {
            statement,
            pending: Vec::new(),
            flushed: Vec::new(),
            high_water: 0,
        }
    }

    /// Largest number of records held at once since this buffer was created.
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Number of staged records not yet flushed.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl<St: Statement> UnitOfWork for StagingBuffer<St> {
    fn stage(&mut self, record: &Record) {
        self.pending.push(record.clone());
        self.high_water = self.high_water.max(self.len());
    }

    fn flush(&mut self) -> Result<usize, Error> {
        if self.pending.is_empty() {
            return Ok(0);
        }

        for record in &self.pending {
            self.statement.bind(&record.params())?;
            self.statement.add_to_batch()?;
        }
        let counts = self.statement.execute_batch()?;

        let rows = self.pending.len();
        self.flushed.append(&mut self.pending);

        tracing::debug!(rows, updated = counts.iter().sum::<usize>(), "flushed staged records");
        Ok(rows)
    }

    fn clear(&mut self) {
        self.pending.clear();
        self.flushed.clear();
    }

    fn len(&self) -> usize {
        self.pending.len() + self.flushed.len()
    }
}
