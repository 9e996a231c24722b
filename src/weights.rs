//! Instruction-count weights of SimPoint regions
use crate::{
    BufReadLine, Error, INSTRUCTION_WEIGHTS_FILE, LABELS_FILE, Result, SIMPOINTS_FILE,
    SignatureLine, SliceKey, read_labels, read_simpoints, round_to,
};
use log::{info, warn};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

/// accepted distance of the weight sum from 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// One `T` line of a global signature file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SliceInfo {
    /// the marker preceding the slice, if any
    pub key: Option<SliceKey>,
    pub instructions: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusterWeight {
    pub weight: f64,
    pub region: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeightSummary {
    pub output: PathBuf,
    pub slices: usize,
    pub total_instructions: u64,
    pub weights: Vec<ClusterWeight>,
    pub weight_sum: f64,
}

/// Instruction count of every slice in a global signature file
pub fn read_slices<P: AsRef<Path>>(path: P) -> Result<Vec<SliceInfo>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::MissingFile {
            path: path.to_path_buf(),
        });
    }
    info!("Reading slice instruction counts...");
    let mut reader = BufReader::new(File::open(path).map_err(|err| Error::io(path, err))?);
    let mut slices = vec![];
    let mut key = None;
    let mut buffer = String::new();
    let mut line_no = 0;
    while let Some(line) = reader.next_line(&mut buffer) {
        let line = line.map_err(|err| Error::io(path, err))?;
        line_no += 1;
        match SignatureLine::parse(line).map_err(|err| err.at(path, line_no))? {
            SignatureLine::SliceEnd(marker) => key = Some(marker),
            SignatureLine::Record(record) => slices.push(SliceInfo {
                key: key.clone(),
                instructions: record.instructions(),
            }),
            _ => {}
        }
    }
    if slices.is_empty() {
        return Err(Error::data(format!(
            "no instruction counts found in {}",
            path.display()
        )));
    }
    info!("Found {} slices", slices.len());
    Ok(slices)
}

/// Fraction of all instructions executed in each slice, rounded to 9 digits
pub fn slice_weights(counts: &[u64]) -> Result<(Vec<f64>, u64)> {
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return Err(Error::data("total instruction count is zero"));
    }
    info!("Total instructions: {}", total);
    let weights = counts
        .iter()
        .map(|&count| round_to(count as f64 / total as f64, 9))
        .collect();
    Ok((weights, total))
}

/// Number of slices assigned to each cluster
pub fn count_regions(labels: &[u64]) -> BTreeMap<u64, u64> {
    let mut counts = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    info!("Found {} unique regions", counts.len());
    counts
}

/// Weight of every region: representative slice weight times cluster size,
/// rounded to 8 digits, sorted by region id
pub fn cluster_weights(
    slice_weights: &[f64],
    region_slices: &BTreeMap<u64, usize>,
    region_counts: &BTreeMap<u64, u64>,
) -> Vec<ClusterWeight> {
    let mut weights = vec![];
    for (&region, &count) in region_counts {
        let Some(&slice) = region_slices.get(&region) else {
            warn!("Region {} not found in slice map, skipping", region);
            continue;
        };
        let Some(&slice_weight) = slice_weights.get(slice) else {
            warn!("Slice {} not found in weights, skipping", slice);
            continue;
        };
        weights.push(ClusterWeight {
            weight: round_to(slice_weight * count as f64, 8),
            region,
        });
    }
    weights.sort_by_key(|weight| weight.region);
    info!("Generated {} cluster weights", weights.len());
    weights
}

pub fn write_weights<W: Write>(out: &mut W, weights: &[ClusterWeight]) -> std::io::Result<()> {
    for weight in weights {
        writeln!(out, "{} {}", weight.weight, weight.region)?;
    }
    Ok(())
}

/// Write `t.iweights` into `data_dir` from `t.simpoints`, `t.labels` and the
/// signature file the clustering ran on
pub fn gen_weights<P: AsRef<Path>, Q: AsRef<Path>>(
    data_dir: P,
    signature_path: Q,
) -> Result<WeightSummary> {
    let (data_dir, signature_path) = (data_dir.as_ref(), signature_path.as_ref());
    if !data_dir.is_dir() {
        return Err(Error::config(format!(
            "data directory not found: {}",
            data_dir.display()
        )));
    }
    info!("Generating cluster weights based on slice lengths");

    let slices = read_slices(signature_path)?;
    let counts: Vec<u64> = slices.iter().map(|slice| slice.instructions).collect();
    let (weights, total_instructions) = slice_weights(&counts)?;
    let region_slices = read_simpoints(data_dir.join(SIMPOINTS_FILE))?;
    let region_counts = count_regions(&read_labels(data_dir.join(LABELS_FILE))?);
    let weights = cluster_weights(&weights, &region_slices, &region_counts);
    let weight_sum: f64 = weights.iter().map(|weight| weight.weight).sum();

    let output = data_dir.join(INSTRUCTION_WEIGHTS_FILE);
    info!("Writing weights to: {}", output.display());
    let mut out = BufWriter::new(File::create(&output).map_err(|err| Error::io(&output, err))?);
    write_weights(&mut out, &weights)
        .and_then(|_| out.flush())
        .map_err(|err| Error::io(&output, err))?;

    info!("Sum of cluster weights: {}", weight_sum);
    if (weight_sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        warn!(
            "Weight sum ({}) deviates significantly from 1.0",
            weight_sum
        );
    }

    Ok(WeightSummary {
        output,
        slices: slices.len(),
        total_instructions,
        weights,
        weight_sum,
    })
}
