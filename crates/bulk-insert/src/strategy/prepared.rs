//! Prepared-statement batch strategy.
//!
//! Every record is bound to one reusable parameterized insert and added to
//! the statement's pending batch. Pending batches are submitted in a single
//! call, so round trips are about `ceil(n / batch_size)` rather than `n`.
//!
//! If the store rejects a batch, which of its rows were applied is up to the
//! store. The load treats the whole batch as failed and the enclosing
//! transaction is rolled back.

use crate::{BatchPolicy, Error, Record, Session, Statement, Target};

/// Grouping determines when pending batches are submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// Submit after every full batch of the policy, and once more at the end.
    Policy(BatchPolicy),
    /// Submit all records as one batch.
    Whole,
}

#[tracing::instrument(skip_all, fields(records = records.len(), grouping = ?grouping))]
pub fn insert<S: Session>(
    session: &S,
    target: &Target,
    records: &[Record],
    grouping: Grouping,
) -> Result<(), Error> {
    let mut stmt = session.prepare(&target.insert_sql())?;
    insert_with(&mut stmt, records, grouping)
}

/// Bind `records` to `stmt`, submitting its pending batch as `grouping` requires.
pub fn insert_with<St: Statement>(
    stmt: &mut St,
    records: &[Record],
    grouping: Grouping,
) -> Result<(), Error> {
    for (index, record) in records.iter().enumerate() {
        stmt.bind(&record.params())?;
        stmt.add_to_batch()?;

        match grouping {
            Grouping::Policy(policy) if policy.is_boundary(index + 1) => {
                submit(stmt, index + 1)?;
            }
            _ => (),
        }
    }

    // Submit the last partial group (or, for Grouping::Whole, everything).
    submit(stmt, records.len())?;
    Ok(())
}

fn submit<St: Statement>(stmt: &mut St, position: usize) -> Result<usize, Error> {
    let counts = stmt.execute_batch()?;

    if !counts.is_empty() {
        tracing::debug!(
            position,
            rows = counts.len(),
            updated = counts.iter().sum::<usize>(),
            "submitted batch"
        );
    }
    Ok(counts.len())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Value;

    // A Statement which records the size of each submitted batch.
    #[derive(Default)]
    struct Recorder {
        bound: bool,
        pending: usize,
        submitted: Vec<usize>,
    }

    impl Statement for Recorder {
        fn parameter_count(&self) -> usize {
            Record::FIELDS
        }
        fn bind(&mut self, params: &[Value<'_>]) -> Result<(), Error> {
            assert_eq!(params.len(), Record::FIELDS);
            self.bound = true;
            Ok(())
        }
        fn add_to_batch(&mut self) -> Result<(), Error> {
            assert!(std::mem::take(&mut self.bound));
            self.pending += 1;
            Ok(())
        }
        fn pending(&self) -> usize {
            self.pending
        }
        fn execute_batch(&mut self) -> Result<Vec<usize>, Error> {
            let rows = std::mem::take(&mut self.pending);
            if rows != 0 {
                self.submitted.push(rows);
            }
            Ok(vec![1; rows])
        }
        fn execute(&mut self) -> Result<usize, Error> {
            unreachable!("batches are never executed singly")
        }
    }

    fn submitted(n: usize, grouping: Grouping) -> Vec<usize> {
        let mut stmt = Recorder::default();
        insert_with(&mut stmt, &Record::generate_with_ids(n), grouping).unwrap();
        assert_eq!(stmt.pending, 0);
        stmt.submitted
    }

    #[test]
    fn batches_follow_the_policy() {
        let ten = Grouping::Policy(BatchPolicy::new(10).unwrap());

        assert_eq!(submitted(25, ten), vec![10, 10, 5]);
        assert_eq!(submitted(20, ten), vec![10, 10]);
        assert_eq!(submitted(7, ten), vec![7]);
        assert_eq!(submitted(0, ten), Vec::<usize>::new());
        assert_eq!(
            submitted(3, Grouping::Policy(BatchPolicy::new(1).unwrap())),
            vec![1, 1, 1]
        );
    }

    #[test]
    fn whole_input_is_one_batch() {
        assert_eq!(submitted(25, Grouping::Whole), vec![25]);
        assert_eq!(submitted(0, Grouping::Whole), Vec::<usize>::new());
    }
}
