//! Heterogeneous CPU/GPU SimPoint pre-processing
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::{fs::File, io::BufWriter, path::PathBuf};
use xpu_point::{PipelineConfig, XPU_GLOBAL_FILE, gen_weights, init_logger, preprocess};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split, concatenate and weigh the profiles described by a config
    Run {
        /// Pipeline config in JSON
        #[arg(short, long)]
        config: PathBuf,

        /// Save the pipeline summary as JSON
        #[arg(short, long)]
        summary: Option<PathBuf>,
    },
    /// Generate instruction weights after running SimPoint
    Weights {
        /// SimPoint output directory
        #[arg(short, long)]
        data_dir: PathBuf,

        /// The global signature file used for clustering, relative to the data directory
        #[arg(short, long, default_value = XPU_GLOBAL_FILE)]
        global_bbv: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logger(args.verbose);

    match args.command {
        Commands::Run { config, summary } => {
            let config = PipelineConfig::load(&config)?;
            let result = preprocess(&config)?;

            println!(
                "Split {} GPU threads, {} GPU slices",
                result.split.threads, result.gpu.slices
            );
            if let Some(xpu) = &result.xpu {
                println!(
                    "Merged {} CPU threads and the GPU stream into {} slices",
                    config.cpu_threads, xpu.slices
                );
            }
            println!("Signature file: {}", result.signature_path.display());
            match &result.weights {
                Some(weights) => println!(
                    "Instruction weights: {} (sum {})",
                    weights.output.display(),
                    weights.weight_sum
                ),
                None => println!(
                    "Run SimPoint on the signature file, then `xpupoint weights -d {}`",
                    config.out_dir().display()
                ),
            }

            if let Some(path) = summary {
                let file = File::create(&path)
                    .with_context(|| format!("cannot create {}", path.display()))?;
                serde_json::to_writer_pretty(BufWriter::new(file), &result)?;
                println!("Summary saved to {}", path.display());
            }
        }
        Commands::Weights {
            data_dir,
            global_bbv,
        } => {
            let summary = gen_weights(&data_dir, data_dir.join(&global_bbv))?;
            println!(
                "Wrote {} weights (sum {}) to {}",
                summary.weights.len(),
                summary.weight_sum,
                summary.output.display()
            );
        }
    }
    Ok(())
}
