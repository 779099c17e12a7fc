use crate::Error;

/// Value is a positional statement parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value<'a> {
    Null,
    Integer(i64),
    Text(&'a str),
}

/// Session is an open connection to a relational store, through which
/// statements are prepared and transactions are demarcated.
///
/// A Session is used by a single load at a time and is never shared
/// across concurrent loads.
pub trait Session {
    type Statement<'s>: Statement
    where
        Self: 's;

    /// Begin a transaction, disabling per-statement auto-commit until it
    /// is committed or rolled back.
    fn begin(&mut self) -> Result<(), Error>;
    /// Returns true if a transaction is currently open.
    fn in_transaction(&self) -> bool;
    /// Prepare a reusable parameterized statement. The store may keep it
    /// compiled for later prepares of the same `sql`.
    fn prepare(&self, sql: &str) -> Result<Self::Statement<'_>, Error>;
    /// Prepare a statement which is executed once and then discarded,
    /// such as a multi-row insert sized to its input.
    fn prepare_once(&self, sql: &str) -> Result<Self::Statement<'_>, Error> {
        self.prepare(sql)
    }
    fn commit(&mut self) -> Result<(), Error>;
    fn rollback(&mut self) -> Result<(), Error>;
    /// Largest number of parameters which may be bound to one statement,
    /// if the store imposes a limit.
    fn max_parameters(&self) -> Option<usize>;
    /// Close the Session, releasing its connection. An open transaction
    /// is rolled back by the store.
    fn close(self) -> Result<(), Error>
    where
        Self: Sized;
}

/// Statement is a prepared statement which accumulates bound parameter
/// sets into a pending batch.
pub trait Statement {
    /// Number of positional parameters expected by each bind.
    fn parameter_count(&self) -> usize;
    /// Bind `params` as the current parameter set, replacing any prior binding.
    /// It's an error if `params` doesn't match `parameter_count()`.
    fn bind(&mut self, params: &[Value<'_>]) -> Result<(), Error>;
    /// Move the current parameter set into the pending batch.
    fn add_to_batch(&mut self) -> Result<(), Error>;
    /// Number of parameter sets in the pending batch.
    fn pending(&self) -> usize;
    /// Submit the pending batch in one call, returning per-row update counts.
    /// The batch is cleared whether or not submission succeeds.
    /// Submitting an empty batch is a no-op which doesn't reach the store.
    fn execute_batch(&mut self) -> Result<Vec<usize>, Error>;
    /// Execute once with the current parameter set, returning the update count.
    fn execute(&mut self) -> Result<usize, Error>;
}
