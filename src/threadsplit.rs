//! Split an interleaved multi-thread trace into per-thread streams
use crate::{BufReadLine, Error, Result, TraceLine, get_per_thread_path, get_tqdm_style};
use log::{debug, info, warn};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SplitSummary {
    /// number of per-thread streams written
    pub threads: usize,
    /// lines read from the interleaved trace
    pub lines: usize,
    /// lines copied to every stream
    pub broadcast_lines: usize,
    /// lines routed to exactly one stream
    pub tagged_lines: usize,
    /// tagged lines whose thread index is out of range
    pub dropped_lines: usize,
    pub blank_lines: usize,
    /// per-thread output files, empty for in-memory splits
    pub outputs: Vec<PathBuf>,
}

/// Scan the trace for the largest thread index, returning it plus one
pub fn count_threads<P: AsRef<Path>>(trace_path: P) -> Result<usize> {
    let trace_path = trace_path.as_ref();
    let file = open_trace(trace_path)?;
    let mut reader = BufReader::new(file);

    let mut max_index = None;
    let mut buffer = String::new();
    let mut line_no = 0;
    while let Some(line) = reader.next_line(&mut buffer) {
        let line = line.map_err(|err| Error::io(trace_path, err))?;
        line_no += 1;
        let text = line.trim_end_matches(['\n', '\r']);
        if let TraceLine::Tagged { tag, .. } =
            TraceLine::parse(text).map_err(|err| err.at(trace_path, line_no))?
        {
            max_index = max_index.max(Some(tag.index));
        }
    }

    let threads = max_index.map_or(1, |index| index + 1);
    info!("Found {} threads in {}", threads, trace_path.display());
    Ok(threads)
}

/// Route every line of `reader` to `outputs`: broadcast lines go to all
/// outputs, tagged lines go to the output of their thread index
pub fn split_lines<R: Read, W: Write>(
    reader: R,
    outputs: &mut [W],
    source: &Path,
    pbar: Option<&indicatif::ProgressBar>,
) -> Result<SplitSummary> {
    if outputs.is_empty() {
        return Err(Error::config("thread count must be positive"));
    }

    let mut reader = BufReader::new(reader);
    let mut summary = SplitSummary {
        threads: outputs.len(),
        ..Default::default()
    };
    let mut buffer = String::new();
    while let Some(line) = reader.next_line(&mut buffer) {
        let line = line.map_err(|err| Error::io(source, err))?;
        summary.lines += 1;
        if let Some(pbar) = pbar {
            pbar.inc(line.len() as u64);
        }

        let text = line.trim_end_matches(['\n', '\r']);
        match TraceLine::parse(text).map_err(|err| err.at(source, summary.lines))? {
            TraceLine::Broadcast => {
                for output in outputs.iter_mut() {
                    output
                        .write_all(line.as_bytes())
                        .map_err(|err| Error::io(source, err))?;
                }
                summary.broadcast_lines += 1;
            }
            TraceLine::Tagged { tag, payload } => {
                let Some(output) = outputs.get_mut(tag.index) else {
                    warn!(
                        "Thread ID {} exceeds expected threads {} at {}:{}",
                        tag.index,
                        summary.threads,
                        source.display(),
                        summary.lines
                    );
                    summary.dropped_lines += 1;
                    continue;
                };
                writeln!(output, "{}", payload).map_err(|err| Error::io(source, err))?;
                summary.tagged_lines += 1;
            }
            TraceLine::Blank => summary.blank_lines += 1,
        }

        if summary.lines % 100000 == 0 {
            debug!("Processed {} lines...", summary.lines);
        }
    }

    Ok(summary)
}

/// Split `trace_path` into `{out_dir}/T.{i}.bb` for `i` in `0..num_threads`
pub fn split_threads<P: AsRef<Path>, Q: AsRef<Path>>(
    trace_path: P,
    num_threads: usize,
    out_dir: Q,
) -> Result<SplitSummary> {
    let (trace_path, out_dir) = (trace_path.as_ref(), out_dir.as_ref());
    if num_threads == 0 {
        return Err(Error::config("thread count must be positive"));
    }
    let file = open_trace(trace_path)?;
    let trace_size = file
        .metadata()
        .map_err(|err| Error::io(trace_path, err))?
        .len();
    info!(
        "Splitting {} ({}) into {} threads",
        trace_path.display(),
        size::Size::from_bytes(trace_size),
        num_threads
    );

    std::fs::create_dir_all(out_dir).map_err(|err| Error::io(out_dir, err))?;
    let paths: Vec<PathBuf> = (0..num_threads)
        .map(|thread| get_per_thread_path(out_dir, thread))
        .collect();
    let mut outputs = vec![];
    for path in &paths {
        let output = File::create(path).map_err(|err| Error::io(path, err))?;
        outputs.push(BufWriter::new(output));
    }

    let pbar = indicatif::ProgressBar::new(trace_size);
    pbar.set_style(get_tqdm_style());
    let mut summary = split_lines(file, &mut outputs, trace_path, Some(&pbar))?;
    pbar.finish();

    for (output, path) in outputs.iter_mut().zip(&paths) {
        output.flush().map_err(|err| Error::io(path, err))?;
    }
    summary.outputs = paths;

    if summary.dropped_lines > 0 {
        warn!(
            "Dropped {} lines of threads beyond {}",
            summary.dropped_lines, num_threads
        );
    }
    info!(
        "Successfully processed {} lines: {} broadcast, {} tagged",
        summary.lines, summary.broadcast_lines, summary.tagged_lines
    );
    Ok(summary)
}

fn open_trace(trace_path: &Path) -> Result<File> {
    if !trace_path.is_file() {
        return Err(Error::config(format!(
            "thread trace not found: {}",
            trace_path.display()
        )));
    }
    File::open(trace_path).map_err(|err| Error::io(trace_path, err))
}
