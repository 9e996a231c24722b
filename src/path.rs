// profile folder structure:
// {cpu_dir}/
//  \- T.{thread}.bb                    per-thread CPU signature streams
// {gpu_dir}/
//  |- thread.bbv                       interleaved per-thread GPU trace
//  \- gpu-perthread/
//     |- T.{thread}.bb                 demultiplexed GPU streams
//     |- global.bbv                    merged GPU signatures (gpu mode)
//     \- concat-vectors.log
// {out_dir}/
//  |- T.global.hv                      merged CPU+GPU signatures (xpu mode)
//  |- T.global.cv                      merged CPU signatures (cpu mode)
//  |- concat-vectors.log
//  |- t.simpoints, t.labels, t.weights written by SimPoint
//  \- t.iweights                       instruction weights

use std::path::{Path, PathBuf};

pub const THREAD_TRACE_FILE: &str = "thread.bbv";
pub const GPU_PER_THREAD_DIR: &str = "gpu-perthread";
pub const GPU_GLOBAL_FILE: &str = "global.bbv";
pub const CPU_GLOBAL_FILE: &str = "T.global.cv";
pub const XPU_GLOBAL_FILE: &str = "T.global.hv";
pub const CONCAT_LOG_FILE: &str = "concat-vectors.log";
pub const SIMPOINTS_FILE: &str = "t.simpoints";
pub const LABELS_FILE: &str = "t.labels";
pub const WEIGHTS_FILE: &str = "t.weights";
pub const INSTRUCTION_WEIGHTS_FILE: &str = "t.iweights";

pub fn get_per_thread_path<P: AsRef<Path>>(dir: P, thread: usize) -> PathBuf {
    dir.as_ref().join(format!("T.{}.bb", thread))
}

pub fn get_thread_trace_path<P: AsRef<Path>>(gpu_dir: P) -> PathBuf {
    gpu_dir.as_ref().join(THREAD_TRACE_FILE)
}

pub fn get_gpu_per_thread_dir<P: AsRef<Path>>(gpu_dir: P) -> PathBuf {
    gpu_dir.as_ref().join(GPU_PER_THREAD_DIR)
}

pub fn get_concat_log_path<P: AsRef<Path>>(out_dir: P) -> PathBuf {
    out_dir.as_ref().join(CONCAT_LOG_FILE)
}
