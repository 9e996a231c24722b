//! Split the interleaved GPU thread trace into per-thread basic block vectors
use clap::Parser;
use std::path::PathBuf;
use xpu_point::{count_threads, get_thread_trace_path, init_logger, split_threads};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Number of threads, inferred from the trace if absent
    #[arg(short = 'n', long)]
    nthreads: Option<usize>,

    /// GPU profile directory holding thread.bbv
    #[arg(short, long, default_value = ".")]
    gpu_dir: PathBuf,

    /// Output directory, relative paths are created inside the GPU profile directory
    #[arg(short, long, default_value = "gpu-perthread")]
    out_dir: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logger(args.verbose);

    let trace_path = get_thread_trace_path(&args.gpu_dir);
    let num_threads = match args.nthreads {
        Some(num_threads) => num_threads,
        None => count_threads(&trace_path)?,
    };
    let out_dir = args.gpu_dir.join(&args.out_dir);
    let summary = split_threads(&trace_path, num_threads, &out_dir)?;

    println!(
        "Split {} lines into {} threads under {}",
        summary.lines,
        summary.threads,
        out_dir.display()
    );
    if summary.dropped_lines > 0 {
        println!("Dropped {} lines of unexpected threads", summary.dropped_lines);
    }
    Ok(())
}
