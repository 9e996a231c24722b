//! End-to-end pre-processing of a CPU/GPU profile pair
use crate::{
    ConcatConfig, ConcatSummary, LABELS_FILE, Mode, PipelineConfig, Result, SIMPOINTS_FILE,
    SplitSummary, WeightSummary, concat_vectors, count_threads, gen_weights,
    get_gpu_per_thread_dir, get_thread_trace_path, split_threads,
};
use log::info;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub split: SplitSummary,
    pub gpu: ConcatSummary,
    /// absent with `gpu_only`
    pub xpu: Option<ConcatSummary>,
    /// the file to run SimPoint on
    pub signature_path: PathBuf,
    /// absent until SimPoint outputs exist in the output directory
    pub weights: Option<WeightSummary>,
}

/// Split the GPU trace, merge GPU threads, merge with CPU threads, and derive
/// instruction weights when clustering results are already present
pub fn preprocess(config: &PipelineConfig) -> Result<PipelineSummary> {
    config.validate()?;
    let trace_path = get_thread_trace_path(&config.gpu_dir);
    let gpu_threads = match config.gpu_threads {
        Some(threads) => threads,
        None => count_threads(&trace_path)?,
    };

    let per_thread_dir = get_gpu_per_thread_dir(&config.gpu_dir);
    let split = split_threads(&trace_path, gpu_threads, &per_thread_dir)?;

    let gpu = concat_vectors(&ConcatConfig {
        mode: Mode::Gpu,
        num_threads: gpu_threads,
        cpu_dir: None,
        gpu_dir: Some(per_thread_dir.clone()),
        out_dir: per_thread_dir.clone(),
    })?;

    let out_dir = config.out_dir();
    let xpu = if config.gpu_only {
        None
    } else {
        Some(concat_vectors(&ConcatConfig {
            mode: Mode::Xpu,
            num_threads: config.cpu_threads + 1,
            cpu_dir: config.cpu_dir.clone(),
            gpu_dir: Some(per_thread_dir),
            out_dir: out_dir.clone(),
        })?)
    };
    let signature_path = match &xpu {
        Some(summary) => summary.output.clone(),
        None => gpu.output.clone(),
    };

    let weights = if out_dir.join(SIMPOINTS_FILE).is_file() && out_dir.join(LABELS_FILE).is_file()
    {
        Some(gen_weights(&out_dir, &signature_path)?)
    } else {
        info!(
            "Run SimPoint on {} with outputs in {}, then generate weights",
            signature_path.display(),
            out_dir.display()
        );
        None
    };

    Ok(PipelineSummary {
        split,
        gpu,
        xpu,
        signature_path,
        weights,
    })
}
