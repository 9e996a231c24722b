//! Lockstep iteration over several signature streams
use crate::{BufReadLine, Error, Result, SignatureLine};
use std::{
    fs::File,
    io::{self, BufReader, Seek, SeekFrom},
    path::{Path, PathBuf},
};

/// One parsed line together with the index of the stream it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub stream: usize,
    pub line: SignatureLine,
}

struct Stream<R> {
    reader: R,
    path: PathBuf,
    /// lines consumed so far, for error locations
    line: usize,
    finished: bool,
}

/// Round-robin merge of signature streams.
///
/// Each stream is read up to and including its next `T` record, then the
/// turn passes to the next unfinished stream. Non-record lines met on the way
/// (markers, comments) are yielded as they are read. A stream that reaches end
/// of file drops out without blocking the others; iteration ends once every
/// stream is finished.
pub struct RoundRobin<R> {
    streams: Vec<Stream<R>>,
    current: usize,
    remaining: usize,
    buffer: String,
}

impl<R: io::BufRead> RoundRobin<R> {
    pub fn new(streams: Vec<(PathBuf, R)>) -> Self {
        let streams: Vec<Stream<R>> = streams
            .into_iter()
            .map(|(path, reader)| Stream {
                reader,
                path,
                line: 0,
                finished: false,
            })
            .collect();
        RoundRobin {
            remaining: streams.len(),
            streams,
            current: 0,
            buffer: String::new(),
        }
    }

    pub fn path(&self, stream: usize) -> &Path {
        &self.streams[stream].path
    }

    fn advance(&mut self) {
        self.current = (self.current + 1) % self.streams.len();
    }
}

impl<R: io::BufRead + Seek> RoundRobin<R> {
    /// Reset every stream to its start
    pub fn rewind(&mut self) -> Result<()> {
        for stream in &mut self.streams {
            stream
                .reader
                .seek(SeekFrom::Start(0))
                .map_err(|err| Error::io(&stream.path, err))?;
            stream.line = 0;
            stream.finished = false;
        }
        self.current = 0;
        self.remaining = self.streams.len();
        Ok(())
    }
}

impl RoundRobin<BufReader<File>> {
    pub fn open(paths: &[PathBuf]) -> Result<Self> {
        let mut streams = vec![];
        for path in paths {
            if !path.is_file() {
                return Err(Error::MissingFile { path: path.clone() });
            }
            let file = File::open(path).map_err(|err| Error::io(path, err))?;
            streams.push((path.clone(), BufReader::new(file)));
        }
        Ok(RoundRobin::new(streams))
    }
}

impl<R: io::BufRead> Iterator for RoundRobin<R> {
    type Item = Result<StreamEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            let index = self.current;
            let stream = &mut self.streams[index];
            if stream.finished {
                self.advance();
                continue;
            }

            let parsed = match stream.reader.next_line(&mut self.buffer) {
                None => {
                    stream.finished = true;
                    self.remaining -= 1;
                    self.advance();
                    continue;
                }
                Some(Err(err)) => Err(Error::io(&stream.path, err)),
                Some(Ok(line)) => {
                    stream.line += 1;
                    SignatureLine::parse(line).map_err(|err| err.at(&stream.path, stream.line))
                }
            };

            return match parsed {
                Ok(line @ SignatureLine::Record(_)) => {
                    self.advance();
                    Some(Ok(StreamEvent {
                        stream: index,
                        line,
                    }))
                }
                Ok(line) => Some(Ok(StreamEvent {
                    stream: index,
                    line,
                })),
                Err(err) => {
                    // a broken stream yields no further lines
                    stream.finished = true;
                    self.remaining -= 1;
                    Some(Err(err))
                }
            };
        }
        None
    }
}
