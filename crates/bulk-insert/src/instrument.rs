use crate::{Error, Session, Statement, Value};
use std::cell::Cell;

/// RoundTrips is a snapshot of the store calls observed by an Instrumented Session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct RoundTrips {
    /// Calls which submitted work to the store: non-empty batch submissions
    /// and single executions.
    pub round_trips: usize,
    /// Parameter sets submitted across all round trips.
    pub rows: usize,
    /// Statements prepared.
    pub statements: usize,
}

#[derive(Default)]
struct Counters {
    round_trips: Cell<usize>,
    rows: Cell<usize>,
    statements: Cell<usize>,
}

impl Counters {
    fn add(cell: &Cell<usize>, n: usize) {
        cell.set(cell.get() + n);
    }
}

/// Instrumented wraps a Session and counts the round trips made through it.
///
/// Counters are plain Cells: a Session is driven by exactly one load at a time.
pub struct Instrumented<S> {
    inner: S,
    counters: Counters,
}

impl<S: Session> Instrumented<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            counters: Counters::default(),
        }
    }

    pub fn snapshot(&self) -> RoundTrips {
        RoundTrips {
            round_trips: self.counters.round_trips.get(),
            rows: self.counters.rows.get(),
            statements: self.counters.statements.get(),
        }
    }

    /// Reset all counters to zero, returning their prior values.
    pub fn reset(&self) -> RoundTrips {
        let snapshot = self.snapshot();
        self.counters.round_trips.set(0);
        self.counters.rows.set(0);
        self.counters.statements.set(0);
        snapshot
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn wrap<'s>(&'s self, inner: S::Statement<'s>) -> InstrumentedStatement<'s, S::Statement<'s>>
    where
        S: 's,
    {
        Counters::add(&self.counters.statements, 1);
        InstrumentedStatement {
            inner,
            counters: &self.counters,
        }
    }
}

impl<S: Session> Session for Instrumented<S> {
    type Statement<'s> = InstrumentedStatement<'s, S::Statement<'s>>
    where
        Self: 's;

    fn begin(&mut self) -> Result<(), Error> {
        self.inner.begin()
    }

    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }

    fn prepare(&self, sql: &str) -> Result<Self::Statement<'_>, Error> {
        let inner = self.inner.prepare(sql)?;
        Ok(self.wrap(inner))
    }

    fn prepare_once(&self, sql: &str) -> Result<Self::Statement<'_>, Error> {
        let inner = self.inner.prepare_once(sql)?;
        Ok(self.wrap(inner))
    }

    fn commit(&mut self) -> Result<(), Error> {
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<(), Error> {
        self.inner.rollback()
    }

    fn max_parameters(&self) -> Option<usize> {
        self.inner.max_parameters()
    }

    fn close(self) -> Result<(), Error> {
        self.inner.close()
    }
}

/// InstrumentedStatement counts the submissions of a wrapped Statement.
pub struct InstrumentedStatement<'s, St> {
    inner: St,
    counters: &'s Counters,
}

impl<St: Statement> Statement for InstrumentedStatement<'_, St> {
    fn parameter_count(&self) -> usize {
        self.inner.parameter_count()
    }

    fn bind(&mut self, params: &[Value<'_>]) -> Result<(), Error> {
        self.inner.bind(params)
    }

    fn add_to_batch(&mut self) -> Result<(), Error> {
        self.inner.add_to_batch()
    }

    fn pending(&self) -> usize {
        self.inner.pending()
    }

    fn execute_batch(&mut self) -> Result<Vec<usize>, Error> {
        let rows = self.inner.pending();
        if rows != 0 {
            Counters::add(&self.counters.round_trips, 1);
            Counters::add(&self.counters.rows, rows);
        }
        self.inner.execute_batch()
    }

    fn execute(&mut self) -> Result<usize, Error> {
        Counters::add(&self.counters.round_trips, 1);
        Counters::add(&self.counters.rows, 1);
        self.inner.execute()
    }
}
