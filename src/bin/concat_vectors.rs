//! Concatenate per-thread basic block vectors into one global signature file
use anyhow::bail;
use clap::Parser;
use std::path::PathBuf;
use xpu_point::{ConcatConfig, Mode, concat_vectors, init_logger};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Number of CPU threads
    #[arg(short = 'n', long, default_value_t = 8)]
    cpu_threads: usize,

    /// Number of GPU threads
    #[arg(short = 'w', long, default_value_t = 32)]
    gpu_threads: usize,

    /// CPU profile directory
    #[arg(short, long)]
    cpu_dir: Option<PathBuf>,

    /// GPU profile directory
    #[arg(short, long)]
    gpu_dir: Option<PathBuf>,

    /// Output directory, defaults to the CPU profile directory, then the GPU one
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logger(args.verbose);

    // the mode follows from which profile directories are given
    let (mode, num_threads, default_out_dir) = match (&args.cpu_dir, &args.gpu_dir) {
        (Some(cpu_dir), Some(_)) => (Mode::Xpu, args.cpu_threads + 1, cpu_dir),
        (Some(cpu_dir), None) => (Mode::Cpu, args.cpu_threads, cpu_dir),
        (None, Some(gpu_dir)) => (Mode::Gpu, args.gpu_threads, gpu_dir),
        (None, None) => bail!("Require either CPU or GPU profile directories to continue"),
    };
    let out_dir = args
        .out_dir
        .clone()
        .unwrap_or_else(|| default_out_dir.clone());

    let summary = concat_vectors(&ConcatConfig {
        mode,
        num_threads,
        cpu_dir: args.cpu_dir,
        gpu_dir: args.gpu_dir,
        out_dir,
    })?;

    println!(
        "Wrote {} slices ({} instructions) from {} streams to {}",
        summary.slices,
        summary.total_instructions,
        summary.streams,
        summary.output.display()
    );
    if !summary.empty_slices.is_empty() {
        println!(
            "{} slices without instructions, see {}",
            summary.empty_slices.len(),
            summary.side_log.display()
        );
    }
    Ok(())
}
