use clap::Parser;

fn main() -> Result<(), anyhow::Error> {
    let cli = bulkload::Cli::parse();
    bulkload::logging::init_logging(&cli.log_args);

    let result = bulkload::run(cli);

    if let Err(err) = result.as_ref() {
        tracing::error!(error = ?err, "bulkload failed");
    }
    result
}
