use bulk_insert::{BatchPolicy, StrategyId};
use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path, path::PathBuf};

/// Config of a benchmark run. Every field may be omitted, taking its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Config {
    /// SQLite database to load into. `:memory:` uses a private in-memory database.
    pub database: String,
    /// Table which receives records. It's created if it doesn't exist.
    pub table: String,
    /// Number of records generated for each measurement.
    pub records: usize,
    /// Batch size used by `compare` and `run`.
    pub batch_size: BatchPolicy,
    /// Strategies measured by `compare`, in order.
    pub strategies: Vec<StrategyId>,
    /// Batch sizes swept by `batch-sizes`, in order.
    pub batch_sizes: Vec<BatchPolicy>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: ":memory:".to_string(),
            table: "users".to_string(),
            records: 1000,
            batch_size: BatchPolicy::default(),
            strategies: StrategyId::ALL.to_vec(),
            batch_sizes: [10, 50, 100, 200, 500]
                .into_iter()
                .filter_map(|size| BatchPolicy::new(size).ok())
                .collect(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("`{0}` must not be empty")]
    Empty(&'static str),
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let file = fs::File::open(path)?;
        let conf = serde_json::from_reader(io::BufReader::new(file))?;
        Ok(conf)
    }

    fn validate(self) -> Result<Config, ConfigError> {
        if self.strategies.is_empty() {
            return Err(ConfigError::Empty("strategies"));
        }
        if self.batch_sizes.is_empty() {
            return Err(ConfigError::Empty("batchSizes"));
        }
        Ok(self)
    }
}

/// Arguments which locate a config file and override its values.
#[derive(Debug, Default, clap::Args)]
pub struct ConfigArgs {
    /// Path to a JSON config file. Its values are overridden by any other
    /// arguments given.
    #[clap(long = "config-file", env = "BULKLOAD_CONFIG_FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// SQLite database to load into [default: :memory:]
    #[clap(long, env = "BULKLOAD_DATABASE", global = true)]
    pub database: Option<String>,

    /// Table which receives records [default: users]
    #[clap(long, env = "BULKLOAD_TABLE", global = true)]
    pub table: Option<String>,

    /// Number of records generated for each measurement [default: 1000]
    #[clap(long, env = "BULKLOAD_RECORDS", global = true)]
    pub records: Option<usize>,

    /// Records per flush of batched strategies [default: 100]
    #[clap(long, env = "BULKLOAD_BATCH_SIZE", global = true)]
    pub batch_size: Option<BatchPolicy>,

    /// Comma-separated strategies measured by `compare` [default: all]
    #[clap(
        long,
        value_enum,
        value_delimiter = ',',
        env = "BULKLOAD_STRATEGIES",
        global = true
    )]
    pub strategies: Option<Vec<StrategyId>>,

    /// Comma-separated batch sizes swept by `batch-sizes` [default: 10,50,100,200,500]
    #[clap(
        long,
        value_delimiter = ',',
        env = "BULKLOAD_BATCH_SIZES",
        global = true
    )]
    pub batch_sizes: Option<Vec<BatchPolicy>>,
}

impl ConfigArgs {
    /// Load the config file, if any, and apply overrides.
    pub fn resolve(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config_file {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Some(table) = &self.table {
            config.table = table.clone();
        }
        if let Some(records) = self.records {
            config.records = records;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(strategies) = &self.strategies {
            config.strategies = strategies.clone();
        }
        if let Some(batch_sizes) = &self.batch_sizes {
            config.batch_sizes = batch_sizes.clone();
        }

        config.validate()
    }
}
