use crate::{Cause, Error, Session};

/// BoundaryState is the lifecycle of a transaction Boundary.
/// Committed and RolledBack are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryState {
    NotStarted,
    Active,
    Committed,
    RolledBack,
}

/// Boundary is the scope of one atomic bulk load.
///
/// It holds its Session exclusively from `begin()` until it's committed or
/// rolled back. A Boundary which is dropped while still Active is rolled back,
/// so every exit path releases the transaction.
///
/// A Boundary may instead `join()` a transaction which its caller already
/// opened. Commit and rollback are then left to that caller, and the Boundary
/// only tracks its own state. Joining is never inferred: `begin()` on a
/// Session with an open transaction fails, as that transaction has no owner
/// this Boundary knows of (for example, one whose rollback failed).
pub struct Boundary<'s, S: Session> {
    session: &'s mut S,
    state: BoundaryState,
    joined: bool,
}

impl<'s, S: Session> Boundary<'s, S> {
    pub fn new(session: &'s mut S) -> Self {
        Self {
            session,
            state: BoundaryState::NotStarted,
            joined: false,
        }
    }

    /// Begin a new transaction. It's an error if the Session already has
    /// an open transaction.
    pub fn begin(&mut self) -> Result<(), Error> {
        self.expect_not_started()?;

        if self.session.in_transaction() {
            return Err(Error::Begin(
                "session already has an open transaction".into(),
            ));
        }
        self.session.begin()?;

        tracing::debug!("began transaction");
        self.state = BoundaryState::Active;
        Ok(())
    }

    /// Join the transaction already opened on the Session by the caller.
    /// It's an error if no transaction is open.
    pub fn join(&mut self) -> Result<(), Error> {
        self.expect_not_started()?;

        if !self.session.in_transaction() {
            return Err(Error::Begin("session has no open transaction to join".into()));
        }

        tracing::debug!("joined open transaction");
        self.joined = true;
        self.state = BoundaryState::Active;
        Ok(())
    }

    pub fn state(&self) -> BoundaryState {
        self.state
    }

    /// Returns true if this Boundary joined an already-open transaction.
    pub fn joined(&self) -> bool {
        self.joined
    }

    pub fn session(&self) -> &S {
        &*self.session
    }

    /// Commit the transaction. If the commit fails, the transaction is
    /// rolled back and the commit error is returned.
    pub fn commit(mut self) -> Result<(), Error> {
        self.expect_active("commit", Error::Commit)?;

        if self.joined {
            self.state = BoundaryState::Committed;
            return Ok(());
        }

        match self.session.commit() {
            Ok(()) => {
                self.state = BoundaryState::Committed;
                tracing::debug!("committed transaction");
                Ok(())
            }
            Err(err) => {
                self.release();
                Err(err)
            }
        }
    }

    /// Roll back the transaction.
    pub fn rollback(mut self) -> Result<(), Error> {
        self.expect_active("rollback", Error::Rollback)?;
        self.state = BoundaryState::RolledBack;

        if self.joined || !self.session.in_transaction() {
            return Ok(());
        }
        self.session.rollback()?;

        tracing::debug!("rolled back transaction");
        Ok(())
    }

    fn expect_not_started(&self) -> Result<(), Error> {
        if self.state == BoundaryState::NotStarted {
            return Ok(());
        }
        Err(Error::Begin(
            format!("transaction boundary is already {:?}", self.state).into(),
        ))
    }

    fn expect_active(&self, op: &str, wrap: fn(Cause) -> Error) -> Result<(), Error> {
        if self.state == BoundaryState::Active {
            return Ok(());
        }
        Err(wrap(
            format!("cannot {op} a transaction boundary which is {:?}", self.state).into(),
        ))
    }

    // Roll back an Active boundary, logging rather than returning a failure.
    fn release(&mut self) {
        if self.state != BoundaryState::Active {
            return;
        }
        self.state = BoundaryState::RolledBack;

        if self.joined || !self.session.in_transaction() {
            return;
        }
        if let Err(err) = self.session.rollback() {
            tracing::warn!(error = ?err, "failed to roll back transaction");
        }
    }
}

impl<S: Session> Drop for Boundary<'_, S> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Run `work` within a new transaction over `session`.
///
/// The transaction commits if `work` returns Ok, and otherwise rolls back.
/// A failed rollback is logged and the error returned by `work` is returned.
/// The Session then remains in its failed transaction, and later calls
/// fail to begin until it's resolved or the Session is closed.
pub fn run_in_transaction<S, T, F>(session: &mut S, work: F) -> Result<T, Error>
where
    S: Session,
    F: FnOnce(&S) -> Result<T, Error>,
{
    let mut boundary = Boundary::new(session);
    boundary.begin()?;
    run(boundary, work)
}

/// Run `work` within the transaction which the caller already opened on
/// `session`. Whether it commits or rolls back is up to the caller.
pub fn run_in_open_transaction<S, T, F>(session: &mut S, work: F) -> Result<T, Error>
where
    S: Session,
    F: FnOnce(&S) -> Result<T, Error>,
{
    let mut boundary = Boundary::new(session);
    boundary.join()?;
    run(boundary, work)
}

fn run<S, T, F>(boundary: Boundary<'_, S>, work: F) -> Result<T, Error>
where
    S: Session,
    F: FnOnce(&S) -> Result<T, Error>,
{
    match work(boundary.session()) {
        Ok(out) => {
            boundary.commit()?;
            Ok(out)
        }
        Err(err) => {
            if let Err(rollback_err) = boundary.rollback() {
                tracing::warn!(error = ?rollback_err, cause = %err, "failed to roll back failed load");
            }
            Err(err)
        }
    }
}
