//! Staged unit-of-work strategy.
//!
//! Records are staged in memory and flushed to the store after every full
//! batch, after which the unit of work is cleared. Only about one batch of
//! records is held at a time, rather than the whole input.

use crate::{BatchPolicy, Error, Record, Session, StagingBuffer, Target, UnitOfWork};

/// Insert `records` by staging them into a StagingBuffer over `session`.
#[tracing::instrument(skip_all, fields(records = records.len(), batch_size = policy.batch_size()))]
pub fn insert<S: Session>(
    session: &S,
    target: &Target,
    records: &[Record],
    policy: BatchPolicy,
) -> Result<(), Error> {
    let mut work = StagingBuffer::new(session.prepare(&target.insert_sql())?);
    let () = insert_with(&mut work, records, policy)?;

    tracing::debug!(high_water = work.high_water(), "staged records flushed");
    Ok(())
}

/// Stage `records` into `work`, flushing and clearing it after each full
/// batch of `policy`. A final flush always follows the loop, sending any
/// trailing partial batch.
pub fn insert_with<U: UnitOfWork>(
    work: &mut U,
    records: &[Record],
    policy: BatchPolicy,
) -> Result<(), Error> {
    for (index, record) in records.iter().enumerate() {
        work.stage(record);

        if policy.is_boundary(index + 1) {
            let rows = work.flush()?;
            work.clear();
            tracing::debug!(position = index + 1, rows, "periodic flush");
        }
    }

    // The periodic test above misses a trailing remainder. This flush is a
    // no-op if nothing is pending.
    let rows = work.flush()?;
    work.clear();
    tracing::debug!(rows, "final flush");

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Event {
        Flush(usize),
        Clear,
    }

    // Records flushes and clears of a unit of work, without a store.
    #[derive(Default)]
    struct Recorder {
        held: Vec<Record>,
        pending: usize,
        events: Vec<Event>,
        high_water: usize,
        fail_on_flush: Option<usize>,
    }

    impl UnitOfWork for Recorder {
        fn stage(&mut self, record: &Record) {
            self.held.push(record.clone());
            self.pending += 1;
            self.high_water = self.high_water.max(self.held.len());
        }
        fn flush(&mut self) -> Result<usize, Error> {
            let flushes = self
                .events
                .iter()
                .filter(|e| matches!(e, Event::Flush(_)))
                .count();
            if self.fail_on_flush == Some(flushes) {
                return Err(Error::BatchExecution {
                    size: self.pending,
                    index: 0,
                    err: "injected".into(),
                });
            }
            let rows = std::mem::take(&mut self.pending);
            self.events.push(Event::Flush(rows));
            Ok(rows)
        }
        fn clear(&mut self) {
            self.held.clear();
            self.pending = 0;
            self.events.push(Event::Clear);
        }
        fn len(&self) -> usize {
            self.held.len()
        }
    }

    fn flushes(events: &[Event]) -> Vec<usize> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Flush(rows) => Some(*rows),
                Event::Clear => None,
            })
            .collect()
    }

    #[test]
    fn twenty_five_records_in_batches_of_ten() {
        let mut work = Recorder::default();
        insert_with(
            &mut work,
            &Record::generate(25),
            BatchPolicy::new(10).unwrap(),
        )
        .unwrap();

        assert_eq!(
            work.events,
            vec![
                Event::Flush(10),
                Event::Clear,
                Event::Flush(10),
                Event::Clear,
                Event::Flush(5),
                Event::Clear,
            ]
        );
        assert_eq!(work.high_water, 10);
    }

    #[test]
    fn final_flush_always_runs() {
        let policy = BatchPolicy::new(10).unwrap();

        // An exact multiple ends with an empty final flush.
        let mut work = Recorder::default();
        insert_with(&mut work, &Record::generate(20), policy).unwrap();
        assert_eq!(flushes(&work.events), vec![10, 10, 0]);

        // Fewer records than a batch are sent only by the final flush.
        let mut work = Recorder::default();
        insert_with(&mut work, &Record::generate(3), policy).unwrap();
        assert_eq!(flushes(&work.events), vec![3]);

        // No records: the final flush sends nothing.
        let mut work = Recorder::default();
        insert_with(&mut work, &[], policy).unwrap();
        assert_eq!(flushes(&work.events), vec![0]);

        // Batches of one flush after every record.
        let mut work = Recorder::default();
        insert_with(&mut work, &Record::generate(3), BatchPolicy::new(1).unwrap()).unwrap();
        assert_eq!(flushes(&work.events), vec![1, 1, 1, 0]);
        assert_eq!(work.high_water, 1);
    }

    #[test]
    fn flush_failure_stops_the_load() {
        let mut work = Recorder {
            fail_on_flush: Some(1),
            ..Default::default()
        };
        let err = insert_with(
            &mut work,
            &Record::generate(25),
            BatchPolicy::new(10).unwrap(),
        )
        .unwrap_err();

        assert!(matches!(err, Error::BatchExecution { size: 10, .. }));
        assert_eq!(flushes(&work.events), vec![10]);
        // Records after the failed flush were never staged.
        assert_eq!(work.held.len(), 10);
    }

    #[tracing_test::traced_test]
    #[test]
    fn logs_flushes() {
        let mut work = Recorder::default();
        insert_with(&mut work, &Record::generate(4), BatchPolicy::new(2).unwrap()).unwrap();

        assert!(logs_contain("periodic flush"));
        assert!(logs_contain("final flush"));
    }
}
