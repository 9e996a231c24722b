use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_cpu_threads() -> usize {
    8
}

/// Pre-processing configuration, e.g.
/// ```json
/// {
///   "cpu_dir": "profile/cpu",
///   "gpu_dir": "profile/gpu",
///   "out_dir": "analysis",
///   "cpu_threads": 8
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// CPU profile directory holding `T.{i}.bb`, unused with `gpu_only`
    pub cpu_dir: Option<PathBuf>,
    /// GPU profile directory holding `thread.bbv`
    pub gpu_dir: PathBuf,
    /// Output directory, defaults to `gpu_dir` with `gpu_only` and `cpu_dir` otherwise
    pub out_dir: Option<PathBuf>,
    /// Number of CPU threads
    #[serde(default = "default_cpu_threads")]
    pub cpu_threads: usize,
    /// Number of GPU threads, inferred from `thread.bbv` if absent
    #[serde(default)]
    pub gpu_threads: Option<usize>,
    /// Use only GPU slices for clustering
    #[serde(default)]
    pub gpu_only: bool,
}

impl PipelineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path).map_err(|err| Error::io(path, err))?;
        let config: PipelineConfig = serde_json::from_slice(&content).map_err(|err| {
            Error::config(format!("invalid configuration {}: {}", path.display(), err))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.gpu_dir.is_dir() {
            return Err(Error::config(format!(
                "GPU directory does not exist: {}",
                self.gpu_dir.display()
            )));
        }
        if !self.gpu_only {
            match &self.cpu_dir {
                Some(cpu_dir) if cpu_dir.is_dir() => {}
                Some(cpu_dir) => {
                    return Err(Error::config(format!(
                        "CPU directory does not exist: {}",
                        cpu_dir.display()
                    )));
                }
                None => return Err(Error::config("CPU directory is required")),
            }
            if self.cpu_threads == 0 {
                return Err(Error::config("CPU threads must be positive"));
            }
        }
        if self.gpu_threads == Some(0) {
            return Err(Error::config("GPU threads must be positive"));
        }
        Ok(())
    }

    pub fn out_dir(&self) -> PathBuf {
        match (&self.out_dir, &self.cpu_dir) {
            (Some(out_dir), _) => out_dir.clone(),
            (None, Some(cpu_dir)) if !self.gpu_only => cpu_dir.clone(),
            _ => self.gpu_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load() {
        let dir = tempfile::tempdir().unwrap();
        let cpu_dir = dir.path().join("cpu");
        let gpu_dir = dir.path().join("gpu");
        std::fs::create_dir_all(&cpu_dir).unwrap();
        std::fs::create_dir_all(&gpu_dir).unwrap();

        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            serde_json::json!({
                "cpu_dir": cpu_dir,
                "gpu_dir": gpu_dir,
            })
            .to_string(),
        )
        .unwrap();
        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.cpu_threads, 8);
        assert_eq!(config.gpu_threads, None);
        assert!(!config.gpu_only);
        assert_eq!(config.out_dir(), cpu_dir);

        let gpu_only = PipelineConfig {
            gpu_only: true,
            ..config.clone()
        };
        assert_eq!(gpu_only.out_dir(), gpu_dir);
    }

    #[test]
    fn test_validate() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            cpu_dir: None,
            gpu_dir: dir.path().to_path_buf(),
            out_dir: None,
            cpu_threads: 8,
            gpu_threads: None,
            gpu_only: true,
        };
        assert!(config.validate().is_ok());

        let needs_cpu = PipelineConfig {
            gpu_only: false,
            ..config.clone()
        };
        assert!(matches!(needs_cpu.validate(), Err(Error::Config { .. })));

        let zero_gpu = PipelineConfig {
            gpu_threads: Some(0),
            ..config.clone()
        };
        assert!(matches!(zero_gpu.validate(), Err(Error::Config { .. })));

        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ \"gpu_dir\": 3 }").unwrap();
        assert!(matches!(PipelineConfig::load(&path), Err(Error::Config { .. })));
    }
}
