//! Report SimPoint regions of a global signature file
use anyhow::Context;
use clap::Parser;
use cli_table::{Cell, Table, print_stdout};
use std::{fs::File, io::BufWriter, path::PathBuf};
use xpu_point::{XPU_GLOBAL_FILE, init_logger, load_simpoint_result};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// SimPoint output directory
    #[arg(short, long)]
    data_dir: PathBuf,

    /// The global signature file used for clustering, relative to the data directory
    #[arg(short, long, default_value = XPU_GLOBAL_FILE)]
    global_bbv: PathBuf,

    /// Save the report as JSON
    #[arg(short, long)]
    json: Option<PathBuf>,
}

fn format_weight(weight: Option<f64>) -> String {
    match weight {
        Some(weight) => format!("{:.2} %", weight * 100.0),
        None => "-".to_string(),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logger(false);

    let signature_path = args.data_dir.join(&args.global_bbv);
    let result = load_simpoint_result(&args.data_dir, &signature_path)?;
    println!(
        "Loaded {} slices with {} instructions from {}",
        result.num_slices,
        result.total_instructions,
        signature_path.display()
    );

    let mut table = vec![];
    for phase in &result.phases {
        let (kernel, count) = match &phase.slice_key {
            Some(key) => (key.label.clone(), key.count.to_string()),
            None => ("-".to_string(), "-".to_string()),
        };
        table.push(vec![
            phase.region.cell(),
            phase.slice.cell(),
            kernel.cell(),
            count.cell(),
            phase.slices.cell(),
            format_weight(phase.simpoint_weight).cell(),
            format_weight(phase.instruction_weight).cell(),
        ]);
    }
    let table = table.table().title(vec![
        "Region".cell(),
        "Slice".cell(),
        "Kernel".cell(),
        "Call".cell(),
        "# Slices".cell(),
        "SimPoint weight".cell(),
        "Instruction weight".cell(),
    ]);
    print_stdout(table)?;

    let instruction_sum: f64 = result
        .phases
        .iter()
        .filter_map(|phase| phase.instruction_weight)
        .sum();
    println!("Sum of instruction weights: {:.4}", instruction_sum);

    if let Some(path) = &args.json {
        let file =
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &result)?;
        println!("Report saved to {}", path.display());
    }
    Ok(())
}
