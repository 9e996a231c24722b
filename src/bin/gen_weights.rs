//! Generate instruction-count weights for SimPoint clusters
use clap::Parser;
use std::path::PathBuf;
use xpu_point::{XPU_GLOBAL_FILE, gen_weights, init_logger};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// SimPoint output directory holding t.simpoints and t.labels
    #[arg(short, long)]
    data_dir: PathBuf,

    /// The global signature file used for clustering, relative to the data directory
    #[arg(short, long, default_value = XPU_GLOBAL_FILE)]
    global_bbv: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logger(args.verbose);

    let signature_path = args.data_dir.join(&args.global_bbv);
    let summary = gen_weights(&args.data_dir, &signature_path)?;
    for weight in &summary.weights {
        println!("{} {}", weight.weight, weight.region);
    }
    println!(
        "Wrote {} weights (sum {}) to {}",
        summary.weights.len(),
        summary.weight_sum,
        summary.output.display()
    );
    Ok(())
}
