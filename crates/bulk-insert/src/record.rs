use crate::Value;

/// Record is the unit of data inserted by the engine.
///
/// `id` may be omitted, in which case NULL is bound and the store assigns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Record {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl Record {
    /// Number of positional parameters bound for each Record.
    pub const FIELDS: usize = 3;

    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Positional parameters of this Record, in `(name, email, id)` column order.
    pub fn params(&self) -> [Value<'_>; Self::FIELDS] {
        [
            Value::Text(&self.name),
            Value::Text(&self.email),
            match self.id {
                Some(id) => Value::Integer(id),
                None => Value::Null,
            },
        ]
    }

    /// Generate `count` records named `User{i}` for i in 1..=count,
    /// leaving ids to be assigned by the store.
    pub fn generate(count: usize) -> Vec<Self> {
        (1..=count)
            .map(|i| Self::new(format!("User{i}"), format!("user{i}@example.com")))
            .collect()
    }

    /// Generate `count` records like `generate`, but with `id = i`.
    pub fn generate_with_ids(count: usize) -> Vec<Self> {
        Self::generate(count)
            .into_iter()
            .zip(1..)
            .map(|(record, id)| record.with_id(id))
            .collect()
    }
}
