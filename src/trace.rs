//! Line grammar of profiler traces and basic block signature streams
use crate::LineError;
use serde::{Deserialize, Serialize};
use std::fmt;

// interleaved per-thread trace (thread.bbv):
//   M: SYS_init 1
//   # Slice ending at kernel: foo call: 1
//   tid0: T:1:10 :2:5
//   tid1: T:1:7
//   M: foo 1
//
// signature stream (T.<i>.bb, global.bbv, T.global.*):
//   M: SYS_init 1
//   # Slice ending at kernel foo count 1
//   T:1:10 :2:5 :3:7

pub const SLICE_MARKER_PREFIX: &str = "# Slice ending at";
pub const TRANSITION_PREFIX: &str = "M:";
const BROADCAST_PREFIXES: [&str; 3] = ["#", "M:", "S:"];

/// Thread tag of an interleaved trace line, e.g. `tid12`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadTag<'a> {
    /// the alphabetic prefix
    pub kind: &'a str,
    /// the numeric suffix
    pub index: usize,
}

impl<'a> ThreadTag<'a> {
    pub fn parse(token: &'a str) -> Result<Self, LineError> {
        let split = token
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(token.len());
        let (kind, digits) = token.split_at(split);
        if kind.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LineError(format!(
                "invalid thread tag {:?}, expected letters followed by digits",
                token
            )));
        }
        let index = digits
            .parse()
            .map_err(|err| LineError(format!("invalid thread index in tag {:?}: {}", token, err)))?;
        Ok(ThreadTag { kind, index })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceLine<'a> {
    /// header, comment or marker line shared by all threads
    Broadcast,
    /// per-thread content, tag already stripped
    Tagged {
        tag: ThreadTag<'a>,
        payload: &'a str,
    },
    Blank,
}

impl<'a> TraceLine<'a> {
    /// Classify one line of an interleaved trace, without its line terminator
    pub fn parse(line: &'a str) -> Result<Self, LineError> {
        if line.trim().is_empty() {
            return Ok(TraceLine::Blank);
        }
        if BROADCAST_PREFIXES
            .iter()
            .any(|prefix| line.starts_with(prefix))
        {
            return Ok(TraceLine::Broadcast);
        }
        let Some((token, rest)) = line.split_once(':') else {
            return Err(LineError(format!("missing thread tag in line {:?}", line)));
        };
        let tag = ThreadTag::parse(token.trim_start())?;
        Ok(TraceLine::Tagged {
            tag,
            payload: rest.trim_start(),
        })
    }
}

/// Execution count of one basic block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCount {
    pub id: u64,
    pub count: u64,
}

impl BlockCount {
    fn parse(token: &str) -> Result<Self, LineError> {
        let invalid = || {
            LineError(format!(
                "invalid block count {:?}, expected :<id>:<count>",
                token
            ))
        };
        let (id, count) = token
            .strip_prefix(':')
            .and_then(|pair| pair.split_once(':'))
            .ok_or_else(invalid)?;
        let id: u64 = id.parse().map_err(|_| invalid())?;
        let count: u64 = count.parse().map_err(|_| invalid())?;
        if id == 0 {
            return Err(LineError(format!(
                "basic block id must be positive in {:?}",
                token
            )));
        }
        Ok(BlockCount { id, count })
    }
}

impl fmt::Display for BlockCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}:{}", self.id, self.count)
    }
}

/// Basic block vector of one thread within one slice (a `T` line)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureRecord {
    pub blocks: Vec<BlockCount>,
}

impl SignatureRecord {
    /// Parse the content of a `T` line after the leading `T`
    pub fn parse(content: &str) -> Result<Self, LineError> {
        let blocks = content
            .split_whitespace()
            .map(BlockCount::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SignatureRecord { blocks })
    }

    pub fn max_id(&self) -> Option<u64> {
        self.blocks.iter().map(|block| block.id).max()
    }

    /// Sum of execution counts, i.e. instructions of the slice
    pub fn instructions(&self) -> u64 {
        self.blocks.iter().map(|block| block.count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Move thread-local ids into the global id space: `id + stride * thread`.
    /// Returns `None` if a global id does not fit in a `u64`.
    pub fn rebase(&self, stride: u64, thread: usize) -> Option<SignatureRecord> {
        let offset = stride.checked_mul(u64::try_from(thread).ok()?)?;
        let blocks = self
            .blocks
            .iter()
            .map(|block| {
                Some(BlockCount {
                    id: block.id.checked_add(offset)?,
                    count: block.count,
                })
            })
            .collect::<Option<Vec<_>>>()?;
        Some(SignatureRecord { blocks })
    }
}

impl fmt::Display for SignatureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", block)?;
        }
        Ok(())
    }
}

/// Identifies a synchronization slice: the kernel it ends at and the call count
/// of that kernel
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SliceKey {
    pub label: String,
    pub count: u64,
}

impl SliceKey {
    pub fn new(label: impl Into<String>, count: u64) -> Self {
        SliceKey {
            label: label.into(),
            count,
        }
    }

    /// transition before the first slice
    pub fn initial() -> Self {
        SliceKey::new("SYS_init", 1)
    }

    /// transition after the last slice
    pub fn terminal() -> Self {
        SliceKey::new("SYS_exit", 1)
    }

    /// Parse a slice-boundary marker; the last three tokens are label, keyword
    /// (`count` or `call:`) and the occurrence count
    pub fn parse_marker(line: &str) -> Result<Self, LineError> {
        let rest = line
            .strip_prefix(SLICE_MARKER_PREFIX)
            .ok_or_else(|| LineError(format!("not a slice marker: {:?}", line)))?;
        let tokens: Vec<&str> = rest.split_whitespace().collect();
        if tokens.len() < 3 {
            return Err(LineError(format!("truncated slice marker {:?}", line)));
        }
        let label = tokens[tokens.len() - 3];
        let count = tokens[tokens.len() - 1].parse().map_err(|_| {
            LineError(format!(
                "invalid occurrence count {:?} in slice marker",
                tokens[tokens.len() - 1]
            ))
        })?;
        Ok(SliceKey::new(label, count))
    }

    pub fn marker_line(&self) -> String {
        format!("{} kernel {} count {}", SLICE_MARKER_PREFIX, self.label, self.count)
    }

    pub fn transition_line(&self) -> String {
        format!("{} {} {}", TRANSITION_PREFIX, self.label, self.count)
    }
}

impl fmt::Display for SliceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.label, self.count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureLine {
    Record(SignatureRecord),
    SliceEnd(SliceKey),
    /// `M:` line, raw text after the prefix
    Transition(String),
    Comment,
    Other,
}

impl SignatureLine {
    pub fn parse(line: &str) -> Result<Self, LineError> {
        let line = line.trim_end();
        if let Some(content) = line.strip_prefix('T') {
            Ok(SignatureLine::Record(SignatureRecord::parse(content)?))
        } else if line.starts_with(SLICE_MARKER_PREFIX) {
            Ok(SignatureLine::SliceEnd(SliceKey::parse_marker(line)?))
        } else if line.starts_with('#') {
            Ok(SignatureLine::Comment)
        } else if let Some(rest) = line.strip_prefix(TRANSITION_PREFIX) {
            Ok(SignatureLine::Transition(rest.trim().to_string()))
        } else {
            Ok(SignatureLine::Other)
        }
    }
}
