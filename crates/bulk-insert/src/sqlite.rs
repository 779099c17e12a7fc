use crate::{Error, Record, Session, Statement, Target, Value};
use rusqlite::limits::Limit;
use rusqlite::types::Value as SqlValue;
use rusqlite::{CachedStatement, Connection};
use std::ops::{Deref, DerefMut};

/// SqliteSession is a Session over a rusqlite Connection.
pub struct SqliteSession {
    conn: Connection,
    uri: String,
}

impl SqliteSession {
    /// Open (or create) the SQLite database at `uri`.
    pub fn open(uri: &str) -> Result<Self, Error> {
        let conn = Connection::open(uri).map_err(|err| Error::Connection {
            uri: uri.to_string(),
            err: err.into(),
        })?;

        tracing::debug!(%uri, "opened SQLite store");

        Ok(Self {
            conn,
            uri: uri.to_string(),
        })
    }

    pub fn open_in_memory() -> Result<Self, Error> {
        Self::open(":memory:")
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create the table of `target`, if it doesn't already exist.
    pub fn create_table(&self, target: &Target) -> Result<(), Error> {
        let sql = target.create_table_sql();
        self.conn.execute_batch(&sql).map_err(rejected(&sql))
    }

    /// Delete all rows of `target`, returning the number deleted.
    pub fn truncate(&self, target: &Target) -> Result<usize, Error> {
        let sql = target.delete_sql();
        self.conn.execute(&sql, []).map_err(rejected(&sql))
    }

    /// Count the rows of `target`.
    pub fn count(&self, target: &Target) -> Result<usize, Error> {
        let sql = target.count_sql();
        let count: i64 = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(rejected(&sql))?;
        Ok(count as usize)
    }

    /// Read back all rows of `target`, ordered by id.
    pub fn load_all(&self, target: &Target) -> Result<Vec<Record>, Error> {
        let sql = target.select_sql();
        let mut stmt = self.conn.prepare(&sql).map_err(rejected(&sql))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(Record {
                    name: row.get(0)?,
                    email: row.get(1)?,
                    id: row.get(2)?,
                })
            })
            .map_err(rejected(&sql))?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(rejected(&sql))
    }
}

impl Session for SqliteSession {
    type Statement<'s> = SqliteStatement<'s>;

    fn begin(&mut self) -> Result<(), Error> {
        self.conn
            .execute_batch("BEGIN IMMEDIATE;")
            .map_err(|err| Error::Begin(err.into()))
    }

    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn prepare(&self, sql: &str) -> Result<SqliteStatement<'_>, Error> {
        let stmt = self.conn.prepare_cached(sql).map_err(rejected(sql))?;
        Ok(SqliteStatement::new(Prepared::Cached(stmt), sql))
    }

    // Bypasses the connection's statement cache, so that statements sized
    // to one input don't evict reusable ones.
    fn prepare_once(&self, sql: &str) -> Result<SqliteStatement<'_>, Error> {
        let stmt = self.conn.prepare(sql).map_err(rejected(sql))?;
        Ok(SqliteStatement::new(Prepared::Once(stmt), sql))
    }

    fn commit(&mut self) -> Result<(), Error> {
        self.conn
            .execute_batch("COMMIT;")
            .map_err(|err| Error::Commit(err.into()))
    }

    fn rollback(&mut self) -> Result<(), Error> {
        self.conn
            .execute_batch("ROLLBACK;")
            .map_err(|err| Error::Rollback(err.into()))
    }

    fn max_parameters(&self) -> Option<usize> {
        Some(self.conn.limit(Limit::SQLITE_LIMIT_VARIABLE_NUMBER) as usize)
    }

    fn close(self) -> Result<(), Error> {
        let Self { conn, uri } = self;

        conn.close().map_err(|(_conn, err)| Error::Connection {
            uri,
            err: err.into(),
        })
    }
}

/// SqliteStatement is a rusqlite statement with a pending batch.
///
/// SQLite has no wire-level batching, so a batch is submitted by stepping
/// the prepared statement once for each pending parameter set within a single
/// `execute_batch` call.
pub struct SqliteStatement<'c> {
    stmt: Prepared<'c>,
    query: String,
    bound: Option<Vec<SqlValue>>,
    batch: Vec<Vec<SqlValue>>,
}

enum Prepared<'c> {
    Cached(CachedStatement<'c>),
    Once(rusqlite::Statement<'c>),
}

impl<'c> Deref for Prepared<'c> {
    type Target = rusqlite::Statement<'c>;

    fn deref(&self) -> &Self::Target {
        match self {
            Prepared::Cached(stmt) => &**stmt,
            Prepared::Once(stmt) => stmt,
        }
    }
}

impl DerefMut for Prepared<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            Prepared::Cached(stmt) => &mut **stmt,
            Prepared::Once(stmt) => stmt,
        }
    }
}

impl<'c> SqliteStatement<'c> {
    fn new(stmt: Prepared<'c>, query: &str) -> Self {
        Self {
            stmt,
            query: query.to_string(),
            bound: None,
            batch: Vec::new(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    // Take the current parameter set, which may be empty only if the
    // statement has no parameters.
    fn take_bound(&mut self) -> Result<Vec<SqlValue>, Error> {
        match self.bound.take() {
            Some(params) => Ok(params),
            None if self.parameter_count() == 0 => Ok(Vec::new()),
            None => Err(Error::ParameterCount {
                expected: self.parameter_count(),
                actual: 0,
            }),
        }
    }
}

impl Statement for SqliteStatement<'_> {
    fn parameter_count(&self) -> usize {
        self.stmt.parameter_count()
    }

    fn bind(&mut self, params: &[Value<'_>]) -> Result<(), Error> {
        let expected = self.parameter_count();
        if params.len() != expected {
            return Err(Error::ParameterCount {
                expected,
                actual: params.len(),
            });
        }
        self.bound = Some(params.iter().map(to_sql_value).collect());
        Ok(())
    }

    fn add_to_batch(&mut self) -> Result<(), Error> {
        let params = self.take_bound()?;
        self.batch.push(params);
        Ok(())
    }

    fn pending(&self) -> usize {
        self.batch.len()
    }

    fn execute_batch(&mut self) -> Result<Vec<usize>, Error> {
        let size = self.batch.len();
        let mut counts = Vec::with_capacity(size);

        for (index, params) in self.batch.drain(..).enumerate() {
            let count = self
                .stmt
                .execute(rusqlite::params_from_iter(params.iter()))
                .map_err(|err| Error::BatchExecution {
                    size,
                    index,
                    err: err.into(),
                })?;
            counts.push(count);
        }
        Ok(counts)
    }

    fn execute(&mut self) -> Result<usize, Error> {
        let params = self.take_bound()?;

        self.stmt
            .execute(rusqlite::params_from_iter(params.iter()))
            .map_err(rejected(&self.query))
    }
}

fn to_sql_value(value: &Value<'_>) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Text(s) => SqlValue::Text(s.to_string()),
    }
}

fn rejected(query: &str) -> impl FnOnce(rusqlite::Error) -> Error + '_ {
    move |err| Error::Statement {
        query: query.to_string(),
        err: err.into(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn fixture() -> (SqliteSession, Target) {
        let target = Target::default();
        let session = SqliteSession::open_in_memory().unwrap();
        session.create_table(&target).unwrap();
        (session, target)
    }

    #[test]
    fn batch_accumulates_and_clears() {
        let (session, target) = fixture();
        let mut stmt = session.prepare(&target.insert_sql()).unwrap();
        assert_eq!(stmt.parameter_count(), Record::FIELDS);

        // An empty batch is a no-op.
        assert!(stmt.execute_batch().unwrap().is_empty());

        for record in Record::generate_with_ids(4) {
            stmt.bind(&record.params()).unwrap();
            stmt.add_to_batch().unwrap();
        }
        assert_eq!(stmt.pending(), 4);
        assert_eq!(stmt.execute_batch().unwrap(), vec![1, 1, 1, 1]);
        assert_eq!(stmt.pending(), 0);

        std::mem::drop(stmt);
        assert_eq!(session.count(&target).unwrap(), 4);
    }

    #[test]
    fn parameter_count_mismatch() {
        let (session, target) = fixture();
        let mut stmt = session.prepare(&target.insert_sql()).unwrap();

        insta::assert_snapshot!(
            stmt.bind(&[Value::Text("only-a-name")]).unwrap_err(),
            @"statement expects 3 bound parameters, but 1 were bound");
        insta::assert_snapshot!(
            stmt.add_to_batch().unwrap_err(),
            @"statement expects 3 bound parameters, but 0 were bound");
        assert!(matches!(
            stmt.execute(),
            Err(Error::ParameterCount { expected: 3, actual: 0 })
        ));
    }

    #[test]
    fn batch_failure_reports_row_index() {
        let (session, target) = fixture();
        let mut stmt = session.prepare(&target.insert_sql()).unwrap();

        let mut records = Record::generate_with_ids(3);
        records[2].id = Some(1);

        for record in &records {
            stmt.bind(&record.params()).unwrap();
            stmt.add_to_batch().unwrap();
        }
        let err = stmt.execute_batch().unwrap_err();
        insta::assert_snapshot!(err, @"batch of 3 rows was rejected at row 2");
        assert!(std::error::Error::source(&err)
            .unwrap()
            .to_string()
            .contains("UNIQUE constraint failed"));

        // The failed batch was cleared.
        assert_eq!(stmt.pending(), 0);
    }

    #[test]
    fn rejected_statement() {
        let (session, _target) = fixture();

        let err = session
            .prepare("INSERT INTO missing (name) VALUES (?)")
            .err()
            .unwrap();
        insta::assert_snapshot!(err, @"statement was rejected by the store: INSERT INTO missing (name) VALUES (?)");
    }

    #[test]
    fn transaction_lifecycle() {
        let (mut session, target) = fixture();
        assert!(!session.in_transaction());

        session.begin().unwrap();
        assert!(session.in_transaction());
        {
            let mut stmt = session.prepare(&target.insert_sql()).unwrap();
            stmt.bind(&Record::new("Ann", "ann@example.com").params())
                .unwrap();
            assert_eq!(stmt.execute().unwrap(), 1);
        }
        session.rollback().unwrap();
        assert!(!session.in_transaction());
        assert_eq!(session.count(&target).unwrap(), 0);

        // Committing without an open transaction is a CommitError.
        assert!(matches!(session.commit(), Err(Error::Commit(_))));
    }

    #[test]
    fn read_back_and_truncate() {
        let (session, target) = fixture();
        let mut stmt = session.prepare(&target.insert_sql()).unwrap();

        // Ids are assigned by the store when absent.
        for record in Record::generate(2) {
            stmt.bind(&record.params()).unwrap();
            stmt.execute().unwrap();
        }
        std::mem::drop(stmt);

        let loaded = session.load_all(&target).unwrap();
        insta::assert_debug_snapshot!(loaded, @r###"
        [
            Record {
                name: "User1",
                email: "user1@example.com",
                id: Some(
                    1,
                ),
            },
            Record {
                name: "User2",
                email: "user2@example.com",
                id: Some(
                    2,
                ),
            },
        ]
        "###);

        assert_eq!(session.truncate(&target).unwrap(), 2);
        assert_eq!(session.count(&target).unwrap(), 0);
        session.close().unwrap();
    }

    #[test]
    fn one_shot_statements_bypass_the_cache() {
        let (session, target) = fixture();
        let sql = target.insert_sql();

        // Returns how many times each successive statement had already run.
        let prior_runs = |once: bool| -> Vec<i32> {
            (0..2)
                .map(|_| {
                    let mut stmt = if once {
                        session.prepare_once(&sql).unwrap()
                    } else {
                        session.prepare(&sql).unwrap()
                    };
                    let runs = stmt.stmt.get_status(rusqlite::StatementStatus::Run);

                    stmt.bind(&Record::new("Ann", "ann@example.com").params())
                        .unwrap();
                    stmt.execute().unwrap();
                    runs
                })
                .collect()
        };

        assert_eq!(prior_runs(false), vec![0, 1]);
        assert_eq!(prior_runs(true), vec![0, 0]);
        assert_eq!(session.count(&target).unwrap(), 4);
    }

    #[test]
    fn reports_parameter_limit() {
        let (session, _target) = fixture();
        assert!(session.max_parameters().unwrap() >= 999);
    }

    #[test]
    fn opens_file_database() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let uri = tmp.path().to_str().unwrap();

        let session = SqliteSession::open(uri).unwrap();
        assert_eq!(session.uri(), uri);
        session.create_table(&Target::default()).unwrap();
        session.close().unwrap();

        let err = SqliteSession::open("/this/path/does/not/exist/db.sqlite")
            .err()
            .unwrap();
        insta::assert_snapshot!(err, @"failed to open store connection /this/path/does/not/exist/db.sqlite");
    }
}
