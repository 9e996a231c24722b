//! Concatenate per-thread basic block vectors into one global signature file
use crate::{
    BufReadLine, CPU_GLOBAL_FILE, Error, GPU_GLOBAL_FILE, Result, RoundRobin, SignatureLine,
    SignatureRecord, SliceKey, StreamEvent, XPU_GLOBAL_FILE, get_concat_log_path,
    get_per_thread_path,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt,
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// CPU threads only
    Cpu,
    /// GPU threads only
    Gpu,
    /// CPU threads plus the merged GPU vectors as one extra thread
    Xpu,
}

impl Mode {
    pub fn output_file_name(&self) -> &'static str {
        match self {
            Mode::Cpu => CPU_GLOBAL_FILE,
            Mode::Gpu => GPU_GLOBAL_FILE,
            Mode::Xpu => XPU_GLOBAL_FILE,
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cpu" => Ok(Mode::Cpu),
            "gpu" => Ok(Mode::Gpu),
            "xpu" => Ok(Mode::Xpu),
            _ => Err(Error::config(format!("invalid mode: {}", s))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Cpu => "cpu",
            Mode::Gpu => "gpu",
            Mode::Xpu => "xpu",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcatConfig {
    pub mode: Mode,
    /// number of input streams; in xpu mode this includes the GPU stream
    pub num_threads: usize,
    /// directory of CPU `T.{i}.bb` files, required in cpu and xpu mode
    pub cpu_dir: Option<PathBuf>,
    /// directory of GPU `T.{i}.bb` files (gpu mode) or of `global.bbv` (xpu mode)
    pub gpu_dir: Option<PathBuf>,
    pub out_dir: PathBuf,
}

impl ConcatConfig {
    fn required_dir<'a>(dir: &'a Option<PathBuf>, kind: &str) -> Result<&'a Path> {
        match dir {
            Some(dir) if dir.is_dir() => Ok(dir.as_path()),
            Some(dir) => Err(Error::config(format!(
                "{} directory not found: {}",
                kind,
                dir.display()
            ))),
            None => Err(Error::config(format!("{} directory is required", kind))),
        }
    }

    /// Resolve the ordered input files, the thread index of each file is its position
    pub fn input_files(&self) -> Result<Vec<PathBuf>> {
        if self.num_threads == 0 {
            return Err(Error::config("thread count must be positive"));
        }
        let paths: Vec<PathBuf> = match self.mode {
            Mode::Cpu => {
                let cpu_dir = Self::required_dir(&self.cpu_dir, "CPU")?;
                (0..self.num_threads)
                    .map(|thread| get_per_thread_path(cpu_dir, thread))
                    .collect()
            }
            Mode::Gpu => {
                let gpu_dir = Self::required_dir(&self.gpu_dir, "GPU")?;
                (0..self.num_threads)
                    .map(|thread| get_per_thread_path(gpu_dir, thread))
                    .collect()
            }
            Mode::Xpu => {
                let cpu_dir = Self::required_dir(&self.cpu_dir, "CPU")?;
                let gpu_dir = Self::required_dir(&self.gpu_dir, "GPU")?;
                (0..self.num_threads - 1)
                    .map(|thread| get_per_thread_path(cpu_dir, thread))
                    .chain(std::iter::once(gpu_dir.join(GPU_GLOBAL_FILE)))
                    .collect()
            }
        };
        if let Some(path) = paths.iter().find(|path| !path.is_file()) {
            return Err(Error::MissingFile { path: path.clone() });
        }
        Ok(paths)
    }

    pub fn output_path(&self) -> PathBuf {
        self.out_dir.join(self.mode.output_file_name())
    }
}

/// Rebased records keyed by slice, then by thread index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccumulationTable {
    slices: BTreeMap<SliceKey, BTreeMap<usize, SignatureRecord>>,
}

impl AccumulationTable {
    /// Store a record, returning the one it replaces
    pub fn insert(
        &mut self,
        key: SliceKey,
        thread: usize,
        record: SignatureRecord,
    ) -> Option<SignatureRecord> {
        self.slices.entry(key).or_default().insert(thread, record)
    }

    /// Records of a slice in ascending thread order
    pub fn slice(&self, key: &SliceKey) -> Option<&BTreeMap<usize, SignatureRecord>> {
        self.slices.get(key)
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

/// First pass: the largest local basic block id over all records of all streams
pub fn find_max_block_id<R: io::BufRead>(streams: &mut RoundRobin<R>) -> Result<u64> {
    info!("Finding maximum basic block ID...");
    let mut max_id = 0;
    for event in streams.by_ref() {
        if let SignatureLine::Record(record) = event?.line {
            max_id = max_id.max(record.max_id().unwrap_or(0));
        }
    }
    info!("max_bb: {}", max_id);
    Ok(max_id)
}

/// Second pass: rebase every record by `stride * thread` and file it under the
/// most recent slice marker seen on any stream
pub fn accumulate<R: io::BufRead>(
    streams: &mut RoundRobin<R>,
    stride: u64,
) -> Result<AccumulationTable> {
    info!("Processing basic block vectors...");
    let mut table = AccumulationTable::default();
    let mut current: Option<SliceKey> = None;
    while let Some(event) = streams.next() {
        let StreamEvent { stream, line } = event?;
        match line {
            SignatureLine::SliceEnd(key) => current = Some(key),
            SignatureLine::Record(record) => {
                let Some(key) = &current else {
                    warn!(
                        "Record of thread {} ({}) appears before any slice marker, skipping",
                        stream,
                        streams.path(stream).display()
                    );
                    continue;
                };
                let Some(rebased) = record.rebase(stride, stream) else {
                    return Err(Error::data(format!(
                        "basic block ids of thread {} ({}) overflow when rebased by {} in slice {}",
                        stream,
                        streams.path(stream).display(),
                        stride,
                        key
                    )));
                };
                if table.insert(key.clone(), stream, rebased).is_some() {
                    warn!(
                        "Thread {} ({}) has more than one record in slice {}, keeping the last",
                        stream,
                        streams.path(stream).display(),
                        key
                    );
                }
            }
            _ => {}
        }
    }
    debug!("Accumulated {} slices", table.len());
    Ok(table)
}

/// Collect slice markers of the reference stream in order of appearance
pub fn collect_markers<R: io::BufRead>(mut reader: R, path: &Path) -> Result<Vec<SliceKey>> {
    let mut markers = vec![];
    let mut buffer = String::new();
    let mut line_no = 0;
    while let Some(line) = reader.next_line(&mut buffer) {
        let line = line.map_err(|err| Error::io(path, err))?;
        line_no += 1;
        if let SignatureLine::SliceEnd(key) =
            SignatureLine::parse(line).map_err(|err| err.at(path, line_no))?
        {
            markers.push(key);
        }
    }
    info!("Found {} markers", markers.len());
    Ok(markers)
}

/// Write one `M:`, `#` and `T` line per marker; returns the instruction count
/// of each slice. Slices without instructions are reported to `side_log`.
pub fn write_global<W: Write, L: Write>(
    out: &mut W,
    side_log: &mut L,
    markers: &[SliceKey],
    table: &AccumulationTable,
    terminal: bool,
) -> io::Result<Vec<u64>> {
    let mut instructions = Vec::with_capacity(markers.len());
    for (i, key) in markers.iter().enumerate() {
        let transition = if i > 0 {
            markers[i - 1].transition_line()
        } else {
            SliceKey::initial().transition_line()
        };
        writeln!(out, "{}", transition)?;
        writeln!(out, "{}", key.marker_line())?;
        write!(out, "T")?;

        let mut total = 0;
        if let Some(threads) = table.slice(key) {
            for record in threads.values() {
                total += record.instructions();
                if record.is_empty() {
                    continue;
                }
                write!(out, "{} ", record)?;
            }
        }
        writeln!(out)?;

        if total == 0 {
            warn!("Found slice without instructions: {}", key);
            writeln!(side_log, "Found slice without instructions, icounts: {}", key)?;
        }
        instructions.push(total);
    }
    if terminal {
        writeln!(out, "{}", SliceKey::terminal().transition_line())?;
    }
    Ok(instructions)
}

#[derive(Debug, Clone, Serialize)]
pub struct ConcatSummary {
    pub mode: Mode,
    pub output: PathBuf,
    pub side_log: PathBuf,
    pub streams: usize,
    /// the stride used for rebasing
    pub max_block_id: u64,
    pub slices: usize,
    pub total_instructions: u64,
    /// slices written without any instructions
    pub empty_slices: Vec<SliceKey>,
}

pub fn concat_vectors(config: &ConcatConfig) -> Result<ConcatSummary> {
    let inputs = config.input_files()?;
    let out_dir = &config.out_dir;
    std::fs::create_dir_all(out_dir).map_err(|err| Error::io(out_dir, err))?;
    info!(
        "Concatenating {} streams in {} mode into {}",
        inputs.len(),
        config.mode,
        out_dir.display()
    );

    let (max_block_id, table) = {
        let mut streams = RoundRobin::open(&inputs)?;
        let max_block_id = find_max_block_id(&mut streams)?;
        streams.rewind()?;
        (max_block_id, accumulate(&mut streams, max_block_id)?)
    };

    info!("Using {} for event ordering", inputs[0].display());
    let reference = File::open(&inputs[0]).map_err(|err| Error::io(&inputs[0], err))?;
    let markers = collect_markers(BufReader::new(reference), &inputs[0])?;

    let output = config.output_path();
    let side_log = get_concat_log_path(out_dir);
    let instructions = {
        let mut out = BufWriter::new(File::create(&output).map_err(|err| Error::io(&output, err))?);
        let mut log =
            BufWriter::new(File::create(&side_log).map_err(|err| Error::io(&side_log, err))?);
        let instructions = write_global(
            &mut out,
            &mut log,
            &markers,
            &table,
            config.mode == Mode::Xpu,
        )
        .and_then(|instructions| out.flush().map(|_| instructions))
        .map_err(|err| Error::io(&output, err))?;
        log.flush().map_err(|err| Error::io(&side_log, err))?;
        instructions
    };
    info!("Output written to {}", output.display());

    let empty_slices = markers
        .iter()
        .zip(&instructions)
        .filter(|(_, total)| **total == 0)
        .map(|(key, _)| key.clone())
        .collect();
    Ok(ConcatSummary {
        mode: config.mode,
        output,
        side_log,
        streams: inputs.len(),
        max_block_id,
        slices: markers.len(),
        total_instructions: instructions.iter().sum(),
        empty_slices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn streams(contents: &[&str]) -> RoundRobin<Cursor<Vec<u8>>> {
        RoundRobin::new(
            contents
                .iter()
                .enumerate()
                .map(|(i, content)| {
                    (
                        PathBuf::from(format!("T.{}.bb", i)),
                        Cursor::new(content.as_bytes().to_vec()),
                    )
                })
                .collect(),
        )
    }

    const THREAD0: &str = "\
M: SYS_init 1
# Slice ending at kernel: foo call: 1
T:1:10 :2:5
M: foo 1
# Slice ending at kernel: bar call: 1
T:2:4
M: bar 1
";

    const THREAD1: &str = "\
M: SYS_init 1
# Slice ending at kernel: foo call: 1
T:1:7
M: foo 1
# Slice ending at kernel: bar call: 1
T:2:3
M: bar 1
";

    fn write_dir(dir: &Path, files: &[(&str, &str)]) {
        std::fs::create_dir_all(dir).unwrap();
        for (name, content) in files {
            std::fs::write(dir.join(name), content).unwrap();
        }
    }

    #[test]
    fn test_mode() {
        assert_eq!("xpu".parse::<Mode>().unwrap(), Mode::Xpu);
        assert!(matches!("npu".parse::<Mode>(), Err(Error::Config { .. })));
        assert_eq!(Mode::Cpu.output_file_name(), "T.global.cv");
        assert_eq!(Mode::Gpu.output_file_name(), "global.bbv");
        assert_eq!(Mode::Xpu.output_file_name(), "T.global.hv");
    }

    #[test]
    fn test_max_block_id() {
        let mut rr = streams(&[THREAD0, THREAD1, "T:9:1\n"]);
        assert_eq!(find_max_block_id(&mut rr).unwrap(), 9);

        let mut rr = streams(&["# nothing\n"]);
        assert_eq!(find_max_block_id(&mut rr).unwrap(), 0);
    }

    #[test]
    fn test_accumulate_rebases() {
        let mut rr = streams(&[THREAD0, THREAD1]);
        let max = find_max_block_id(&mut rr).unwrap();
        assert_eq!(max, 2);
        rr.rewind().unwrap();
        let table = accumulate(&mut rr, max).unwrap();
        assert_eq!(table.len(), 2);

        let foo = table.slice(&SliceKey::new("foo", 1)).unwrap();
        assert_eq!(foo[&0].to_string(), ":1:10 :2:5");
        assert_eq!(foo[&1].to_string(), ":3:7");
        let bar = table.slice(&SliceKey::new("bar", 1)).unwrap();
        assert_eq!(bar[&1].to_string(), ":4:3");
    }

    #[test]
    fn test_rebased_ranges_are_disjoint() {
        let max = 5;
        let mut seen = std::collections::HashSet::new();
        for thread in 0..4 {
            let record = SignatureRecord::parse(":1:1 :2:1 :3:1 :4:1 :5:1").unwrap();
            for block in record.rebase(max, thread).unwrap().blocks {
                assert!(seen.insert(block.id), "id {} reused", block.id);
            }
        }
        assert_eq!(seen.len(), 20);
    }

    #[test]
    fn test_unsynchronized_markers_follow_read_order() {
        // thread 1 carries no markers, its records take whatever slice thread 0
        // announced last in round-robin order
        let mut rr = streams(&[
            concat!(
                "# Slice ending at kernel a count 1\nT:1:1\n",
                "# Slice ending at kernel b count 1\nT:1:2\n",
            ),
            "T:1:5\nT:1:6\n",
        ]);
        let table = accumulate(&mut rr, 1).unwrap();
        assert_eq!(table.slice(&SliceKey::new("a", 1)).unwrap()[&1].to_string(), ":2:5");
        assert_eq!(table.slice(&SliceKey::new("b", 1)).unwrap()[&1].to_string(), ":2:6");
    }

    #[test]
    fn test_accumulate_rejects_id_overflow() {
        let mut rr = streams(&[
            "# Slice ending at kernel a count 1\nT:9223372036854775808:1\n",
            "T:1:1\n",
            "T:1:1\n",
        ]);
        let max = find_max_block_id(&mut rr).unwrap();
        rr.rewind().unwrap();
        match accumulate(&mut rr, max) {
            Err(Error::Data { message }) => {
                assert!(message.contains("thread 2"), "{}", message);
                assert!(message.contains("T.2.bb"), "{}", message);
                assert!(message.contains("(a, 1)"), "{}", message);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_accumulate_duplicates_and_orphans() {
        let mut rr = streams(&[
            "T:1:9\n# Slice ending at kernel a count 1\nT:1:1\nT:1:2\n",
        ]);
        let table = accumulate(&mut rr, 1).unwrap();
        assert_eq!(table.len(), 1);
        // last write wins
        assert_eq!(table.slice(&SliceKey::new("a", 1)).unwrap()[&0].to_string(), ":1:2");
    }

    #[test]
    fn test_collect_markers() {
        let markers = collect_markers(
            Cursor::new(format!("{}# Slice ending at kernel: foo call: 1\n", THREAD0)),
            Path::new("T.0.bb"),
        )
        .unwrap();
        assert_eq!(
            markers,
            vec![
                SliceKey::new("foo", 1),
                SliceKey::new("bar", 1),
                SliceKey::new("foo", 1)
            ]
        );
    }

    #[test]
    fn test_write_global() {
        let mut rr = streams(&[THREAD0, THREAD1]);
        let table = accumulate(&mut rr, 2).unwrap();
        let markers = vec![
            SliceKey::new("foo", 1),
            SliceKey::new("bar", 1),
            SliceKey::new("baz", 1),
        ];
        let mut out = vec![];
        let mut side_log = vec![];
        let instructions = write_global(&mut out, &mut side_log, &markers, &table, true).unwrap();
        assert_eq!(instructions, vec![22, 7, 0]);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "M: SYS_init 1\n\
             # Slice ending at kernel foo count 1\n\
             T:1:10 :2:5 :3:7 \n\
             M: foo 1\n\
             # Slice ending at kernel bar count 1\n\
             T:2:4 :4:3 \n\
             M: bar 1\n\
             # Slice ending at kernel baz count 1\n\
             T\n\
             M: SYS_exit 1\n"
        );
        assert_eq!(String::from_utf8(side_log).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_write_global_skips_unsequenced_slices() {
        let mut rr = streams(&[THREAD0, THREAD1]);
        let table = accumulate(&mut rr, 2).unwrap();
        assert!(table.slice(&SliceKey::new("foo", 1)).is_some());

        // foo is accumulated but absent from the marker sequence
        let markers = vec![SliceKey::new("bar", 1)];
        let mut out = vec![];
        let mut side_log = vec![];
        let instructions = write_global(&mut out, &mut side_log, &markers, &table, false).unwrap();
        assert_eq!(instructions, vec![7]);
        let output = String::from_utf8(out).unwrap();
        assert_eq!(
            output,
            "M: SYS_init 1\n# Slice ending at kernel bar count 1\nT:2:4 :4:3 \n"
        );
        assert!(!output.contains("foo"));
        assert!(side_log.is_empty());
    }

    #[test]
    fn test_concat_cpu_mode() {
        let dir = tempfile::tempdir().unwrap();
        let cpu_dir = dir.path().join("cpu");
        write_dir(&cpu_dir, &[("T.0.bb", THREAD0), ("T.1.bb", THREAD1)]);

        let summary = concat_vectors(&ConcatConfig {
            mode: Mode::Cpu,
            num_threads: 2,
            cpu_dir: Some(cpu_dir.clone()),
            gpu_dir: None,
            out_dir: dir.path().join("out"),
        })
        .unwrap();
        assert_eq!(summary.max_block_id, 2);
        assert_eq!(summary.slices, 2);
        assert_eq!(summary.total_instructions, 29);
        assert!(summary.empty_slices.is_empty());

        let output = std::fs::read_to_string(dir.path().join("out").join("T.global.cv")).unwrap();
        assert_eq!(
            output,
            "M: SYS_init 1\n\
             # Slice ending at kernel foo count 1\n\
             T:1:10 :2:5 :3:7 \n\
             M: foo 1\n\
             # Slice ending at kernel bar count 1\n\
             T:2:4 :4:3 \n"
        );
        let side_log =
            std::fs::read_to_string(dir.path().join("out").join("concat-vectors.log")).unwrap();
        assert!(side_log.is_empty());
    }

    #[test]
    fn test_concat_preserves_counts() {
        let dir = tempfile::tempdir().unwrap();
        let cpu_dir = dir.path().join("cpu");
        write_dir(&cpu_dir, &[("T.0.bb", THREAD0), ("T.1.bb", THREAD1)]);
        let summary = concat_vectors(&ConcatConfig {
            mode: Mode::Cpu,
            num_threads: 2,
            cpu_dir: Some(cpu_dir),
            gpu_dir: None,
            out_dir: dir.path().to_path_buf(),
        })
        .unwrap();

        let output = std::fs::read_to_string(&summary.output).unwrap();
        let totals: Vec<u64> = output
            .lines()
            .filter_map(|line| match SignatureLine::parse(line).unwrap() {
                SignatureLine::Record(record) => Some(record.instructions()),
                _ => None,
            })
            .collect();
        // per-thread raw sums: foo = 15 + 7, bar = 4 + 3
        assert_eq!(totals, vec![22, 7]);
    }

    #[test]
    fn test_concat_xpu_mode() {
        let dir = tempfile::tempdir().unwrap();
        let cpu_dir = dir.path().join("cpu");
        let gpu_dir = dir.path().join("gpu");
        write_dir(&cpu_dir, &[("T.0.bb", THREAD0)]);
        write_dir(
            &gpu_dir,
            &[(
                "global.bbv",
                "M: SYS_init 1\n# Slice ending at kernel foo count 1\nT:1:0 \nM: foo 1\n\
                 # Slice ending at kernel bar count 1\nT:1:8 \n",
            )],
        );

        let summary = concat_vectors(&ConcatConfig {
            mode: Mode::Xpu,
            num_threads: 2,
            cpu_dir: Some(cpu_dir),
            gpu_dir: Some(gpu_dir),
            out_dir: dir.path().join("out"),
        })
        .unwrap();
        let output = std::fs::read_to_string(&summary.output).unwrap();
        assert!(summary.output.ends_with("T.global.hv"));
        assert_eq!(
            output,
            "M: SYS_init 1\n\
             # Slice ending at kernel foo count 1\n\
             T:1:10 :2:5 :3:0 \n\
             M: foo 1\n\
             # Slice ending at kernel bar count 1\n\
             T:2:4 :3:8 \n\
             M: SYS_exit 1\n"
        );
    }

    #[test]
    fn test_zero_instruction_slice_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let cpu_dir = dir.path().join("cpu");
        let zero = "# Slice ending at kernel: foo call: 1\nT:1:0 :2:0 \n";
        write_dir(&cpu_dir, &[("T.0.bb", zero), ("T.1.bb", zero)]);

        let summary = concat_vectors(&ConcatConfig {
            mode: Mode::Cpu,
            num_threads: 2,
            cpu_dir: Some(cpu_dir),
            gpu_dir: None,
            out_dir: dir.path().to_path_buf(),
        })
        .unwrap();
        assert_eq!(summary.empty_slices, vec![SliceKey::new("foo", 1)]);
        let output = std::fs::read_to_string(&summary.output).unwrap();
        assert_eq!(output.lines().filter(|line| line.starts_with('T')).count(), 1);
        let side_log = std::fs::read_to_string(&summary.side_log).unwrap();
        assert_eq!(side_log.lines().count(), 1);
    }

    #[test]
    fn test_no_markers_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cpu_dir = dir.path().join("cpu");
        let gpu_dir = dir.path().join("gpu");
        write_dir(&cpu_dir, &[("T.0.bb", "M: SYS_init 1\nT:1:4\n")]);
        write_dir(&gpu_dir, &[("global.bbv", "M: SYS_init 1\nT:1:4\n")]);

        let summary = concat_vectors(&ConcatConfig {
            mode: Mode::Xpu,
            num_threads: 2,
            cpu_dir: Some(cpu_dir),
            gpu_dir: Some(gpu_dir),
            out_dir: dir.path().to_path_buf(),
        })
        .unwrap();
        assert_eq!(summary.slices, 0);
        let output = std::fs::read_to_string(&summary.output).unwrap();
        assert_eq!(output, "M: SYS_exit 1\n");
    }

    #[test]
    fn test_missing_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let cpu_dir = dir.path().join("cpu");
        let gpu_dir = dir.path().join("gpu");
        write_dir(&cpu_dir, &[("T.0.bb", THREAD0)]);
        std::fs::create_dir_all(&gpu_dir).unwrap();

        let config = ConcatConfig {
            mode: Mode::Xpu,
            num_threads: 2,
            cpu_dir: Some(cpu_dir.clone()),
            gpu_dir: Some(gpu_dir),
            out_dir: dir.path().join("out"),
        };
        match concat_vectors(&config) {
            Err(Error::MissingFile { path }) => assert!(path.ends_with("global.bbv")),
            other => panic!("unexpected {:?}", other),
        }

        let config = ConcatConfig {
            mode: Mode::Cpu,
            num_threads: 3,
            ..config
        };
        assert!(matches!(config.input_files(), Err(Error::MissingFile { .. })));

        let config = ConcatConfig {
            mode: Mode::Gpu,
            gpu_dir: Some(dir.path().join("nowhere")),
            ..config
        };
        assert!(matches!(config.input_files(), Err(Error::Config { .. })));

        let config = ConcatConfig {
            num_threads: 0,
            ..config
        };
        assert!(matches!(config.input_files(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_malformed_record_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let cpu_dir = dir.path().join("cpu");
        write_dir(&cpu_dir, &[("T.0.bb", "# Slice ending at kernel a count 1\nT:1:1 2:3\n")]);
        let config = ConcatConfig {
            mode: Mode::Cpu,
            num_threads: 1,
            cpu_dir: Some(cpu_dir),
            gpu_dir: None,
            out_dir: dir.path().join("out"),
        };
        assert!(matches!(concat_vectors(&config), Err(Error::Parse { .. })));
        assert!(!config.output_path().exists());
    }
}
