//! Multi-row statement strategy.
//!
//! All records are embedded as repeated value tuples of one statement, which
//! is executed in exactly one round trip and succeeds or fails as a whole.
//!
//! Statement text and bound parameters grow linearly with the number of
//! records, and stores cap both. This strategy is unsuitable beyond
//! `max_parameters / Record::FIELDS` records: larger inputs are rejected with
//! `Error::ParameterLimit` before anything is sent, rather than being split.

use crate::{Error, Record, Session, Statement, Target, Value};

/// Returns the largest number of records which a single statement may carry
/// under the store's parameter limit, if it has one.
pub fn max_records<S: Session>(session: &S) -> Option<usize> {
    session.max_parameters().map(|limit| limit / Record::FIELDS)
}

#[tracing::instrument(skip_all, fields(records = records.len()))]
pub fn insert<S: Session>(
    session: &S,
    target: &Target,
    records: &[Record],
) -> Result<(), Error> {
    if records.is_empty() {
        tracing::debug!("no records to insert");
        return Ok(());
    }

    let params = records.len() * Record::FIELDS;
    if let Some(limit) = session.max_parameters() {
        if params > limit {
            return Err(Error::ParameterLimit {
                records: records.len(),
                params,
                limit,
            });
        }
    }

    let sql = target.multi_row_sql(records.len());
    let values: Vec<Value<'_>> = records.iter().flat_map(Record::params).collect();

    let mut stmt = session.prepare_once(&sql)?;
    stmt.bind(&values)?;
    let rows = stmt.execute()?;

    tracing::debug!(rows, params, statement_len = sql.len(), "executed multi-row insert");
    Ok(())
}
