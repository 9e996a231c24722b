use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid mode, thread count or missing input directory
    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("required file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    /// Malformed trace or companion file content, `line` is 1-based
    #[error("parse error at {}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("data error: {message}")]
    Data { message: String },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    pub fn data(message: impl Into<String>) -> Self {
        Error::Data {
            message: message.into(),
        }
    }

    pub fn io<P: AsRef<Path>>(path: P, source: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// A parse failure that does not know its location yet.
///
/// The line grammar in [`crate::trace`] reports these; readers attach the
/// file path and line number with [`LineError::at`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError(pub String);

impl LineError {
    pub fn at<P: AsRef<Path>>(self, path: P, line: usize) -> Error {
        Error::Parse {
            path: path.as_ref().to_path_buf(),
            line,
            message: self.0,
        }
    }
}

impl std::fmt::Display for LineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
