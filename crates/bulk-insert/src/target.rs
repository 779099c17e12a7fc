use crate::Record;

/// Target is the table into which records are loaded.
/// Its columns are always `(name, email, id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    table: String,
}

impl Target {
    pub const COLUMNS: [&'static str; Record::FIELDS] = ["name", "email", "id"];

    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// SQL for inserting a single record.
    pub fn insert_sql(&self) -> String {
        self.multi_row_sql(1)
    }

    /// SQL for inserting `count` records as repeated value tuples.
    pub fn multi_row_sql(&self, count: usize) -> String {
        let tuple = format!("({})", vec!["?"; Record::FIELDS].join(", "));

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ",
            quote_identifier(&self.table),
            Self::COLUMNS.join(", ")
        );
        sql.reserve(count * (tuple.len() + 2));

        for index in 0..count {
            if index != 0 {
                sql.push_str(", ");
            }
            sql.push_str(&tuple);
        }
        sql
    }

    /// SQL for querying all records, ordered by id.
    pub fn select_sql(&self) -> String {
        format!(
            "SELECT {} FROM {} ORDER BY id",
            Self::COLUMNS.join(", "),
            quote_identifier(&self.table)
        )
    }

    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {}", quote_identifier(&self.table))
    }

    pub fn delete_sql(&self) -> String {
        format!("DELETE FROM {}", quote_identifier(&self.table))
    }

    /// SQL for creating this Target's table if it doesn't already exist.
    pub fn create_table_sql(&self) -> String {
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                name  TEXT NOT NULL,
                email TEXT NOT NULL,
                id    INTEGER PRIMARY KEY
            );
            "#,
            quote_identifier(&self.table)
        )
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::new("users")
    }
}

// Quote an SQL identifier, escaping embedded double-quotes.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
