use crate::harness::Measurement;
use std::io::Write;

#[derive(clap::Args, Debug, Clone)]
pub struct Output {
    /// How to format the report written to stdout
    #[clap(global = true, short, long, value_enum, default_value = "table")]
    pub output: OutputType,
}

#[derive(clap::ValueEnum, Debug, Copy, Clone, PartialEq)]
pub enum OutputType {
    /// Format output as compact JSON with measurements separated by newlines
    Json,
    /// Format the output as a pretty-printed table
    Table,
}

const HEADERS: [&str; 9] = [
    "Strategy",
    "Batch Size",
    "Records",
    "Elapsed (ms)",
    "Allocated (KiB)",
    "Retained (KiB)",
    "Allocations",
    "Round Trips",
    "Rows",
];

pub fn write_report<W: Write>(
    w: &mut W,
    output: OutputType,
    measurements: &[Measurement],
) -> anyhow::Result<()> {
    match output {
        OutputType::Json => {
            for measurement in measurements {
                serde_json::to_writer(&mut *w, measurement)?;
                w.write_all(b"\n")?;
            }
        }
        OutputType::Table => {
            let mut table = new_table(HEADERS.to_vec());
            for m in measurements {
                table.add_row(table_row(m));
            }
            for line in table.lines() {
                w.write_all(line.as_bytes())?;
                w.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

fn table_row(m: &Measurement) -> Vec<String> {
    vec![
        m.strategy.to_string(),
        m.batch_size
            .map(|size| size.to_string())
            .unwrap_or_else(|| "-".to_string()),
        m.records.to_string(),
        format!("{:.2}", m.elapsed_ms),
        m.allocated_kb.to_string(),
        m.retained_kb.to_string(),
        m.allocations.to_string(),
        m.round_trips.to_string(),
        m.rows.to_string(),
    ]
}

fn new_table(headers: Vec<&str>) -> comfy_table::Table {
    let mut table = comfy_table::Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
        .apply_modifier(comfy_table::modifiers::UTF8_SOLID_INNER_BORDERS);
    table.set_header(headers);
    table
}
