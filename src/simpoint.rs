use crate::{
    BufReadLine, Error, LABELS_FILE, Result, SIMPOINTS_FILE, SliceKey, WEIGHTS_FILE,
    cluster_weights, count_regions, read_slices, slice_weights,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    str::FromStr,
};

/// SimPoint phase: a phase is a cluster, represented by one slice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimPointPhase {
    /// the region (cluster) id
    pub region: u64,
    /// index of the representative slice
    pub slice: usize,
    /// kernel and call count the representative slice ends at
    pub slice_key: Option<SliceKey>,
    /// the number of slices in the phase
    pub slices: u64,
    /// weight reported by SimPoint
    pub simpoint_weight: Option<f64>,
    /// weight by instruction count
    pub instruction_weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimPointResult {
    /// Path to the global signature file used for clustering
    pub signature_path: PathBuf,
    /// Directory holding SimPoint outputs
    pub data_dir: PathBuf,
    pub num_slices: usize,
    pub total_instructions: u64,
    /// SimPoint phases, by region id
    pub phases: Vec<SimPointPhase>,
}

/// Read whitespace separated rows, passing the fields of every row with at
/// least `min_fields` fields to `f`
fn read_rows<T, F>(path: &Path, min_fields: usize, mut f: F) -> Result<Vec<T>>
where
    F: FnMut(&[&str]) -> std::result::Result<T, String>,
{
    if !path.is_file() {
        return Err(Error::MissingFile {
            path: path.to_path_buf(),
        });
    }
    let mut reader = BufReader::new(File::open(path).map_err(|err| Error::io(path, err))?);
    let mut rows = vec![];
    let mut buffer = String::new();
    let mut line_no = 0;
    while let Some(line) = reader.next_line(&mut buffer) {
        let line = line.map_err(|err| Error::io(path, err))?;
        line_no += 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < min_fields {
            continue;
        }
        rows.push(f(&fields).map_err(|message| Error::Parse {
            path: path.to_path_buf(),
            line: line_no,
            message,
        })?);
    }
    Ok(rows)
}

fn parse_field<T: FromStr>(field: &str, what: &str) -> std::result::Result<T, String> {
    field
        .parse()
        .map_err(|_| format!("invalid {} {:?}", what, field))
}

/// Representative slice of every region, from `t.simpoints` rows `<slice> <region>`
pub fn read_simpoints<P: AsRef<Path>>(path: P) -> Result<BTreeMap<u64, usize>> {
    let path = path.as_ref();
    let rows = read_rows(path, 2, |fields| {
        Ok((
            parse_field::<u64>(fields[1], "region id")?,
            parse_field::<usize>(fields[0], "slice id")?,
        ))
    })?;
    if rows.is_empty() {
        return Err(Error::data(format!(
            "no region mappings found in {}",
            path.display()
        )));
    }
    log::info!("Found {} region mappings", rows.len());
    Ok(rows.into_iter().collect())
}

/// Cluster id of every slice, from `t.labels` rows `<cluster> [distance]`
pub fn read_labels<P: AsRef<Path>>(path: P) -> Result<Vec<u64>> {
    let path = path.as_ref();
    let labels = read_rows(path, 1, |fields| parse_field(fields[0], "cluster id"))?;
    if labels.is_empty() {
        return Err(Error::data(format!(
            "no cluster labels found in {}",
            path.display()
        )));
    }
    Ok(labels)
}

/// Weight of every region, from `t.weights`/`t.iweights` rows `<weight> <region>`
pub fn read_weights<P: AsRef<Path>>(path: P) -> Result<BTreeMap<u64, f64>> {
    let rows = read_rows(path.as_ref(), 2, |fields| {
        Ok((
            parse_field::<u64>(fields[1], "region id")?,
            parse_field::<f64>(fields[0], "weight")?,
        ))
    })?;
    Ok(rows.into_iter().collect())
}

/// Combine SimPoint outputs in `data_dir` with the signature file they were
/// computed from
pub fn load_simpoint_result<P: AsRef<Path>, Q: AsRef<Path>>(
    data_dir: P,
    signature_path: Q,
) -> Result<SimPointResult> {
    let (data_dir, signature_path) = (data_dir.as_ref(), signature_path.as_ref());
    let slices = read_slices(signature_path)?;
    let counts: Vec<u64> = slices.iter().map(|slice| slice.instructions).collect();
    let (weights, total_instructions) = slice_weights(&counts)?;
    let region_slices = read_simpoints(data_dir.join(SIMPOINTS_FILE))?;
    let region_counts = count_regions(&read_labels(data_dir.join(LABELS_FILE))?);

    let instruction_weights: BTreeMap<u64, f64> =
        cluster_weights(&weights, &region_slices, &region_counts)
            .into_iter()
            .map(|weight| (weight.region, weight.weight))
            .collect();
    let simpoint_weights = match data_dir.join(WEIGHTS_FILE) {
        path if path.is_file() => read_weights(path)?,
        _ => BTreeMap::new(),
    };

    let phases = region_slices
        .iter()
        .map(|(&region, &slice)| SimPointPhase {
            region,
            slice,
            slice_key: slices.get(slice).and_then(|info| info.key.clone()),
            slices: region_counts.get(&region).copied().unwrap_or(0),
            simpoint_weight: simpoint_weights.get(&region).copied(),
            instruction_weight: instruction_weights.get(&region).copied(),
        })
        .collect();

    Ok(SimPointResult {
        signature_path: signature_path.to_path_buf(),
        data_dir: data_dir.to_path_buf(),
        num_slices: slices.len(),
        total_instructions,
        phases,
    })
}
