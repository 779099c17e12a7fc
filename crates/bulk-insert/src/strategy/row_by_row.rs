//! Row-by-row strategy: one insert execution, and one round trip, per record.
//! This is the unbatched baseline against which other strategies are compared.

use crate::{Error, Record, Session, Statement, Target};

#[tracing::instrument(skip_all, fields(records = records.len()))]
pub fn insert<S: Session>(
    session: &S,
    target: &Target,
    records: &[Record],
) -> Result<(), Error> {
    let mut stmt = session.prepare(&target.insert_sql())?;

    for record in records {
        stmt.bind(&record.params())?;
        stmt.execute()?;
    }
    Ok(())
}
