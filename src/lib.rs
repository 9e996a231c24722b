mod concat;
mod config;
mod error;
mod merge;
mod path;
mod pipeline;
mod simpoint;
mod threadsplit;
mod trace;
mod utils;
mod weights;

pub use concat::*;
pub use config::*;
pub use error::*;
pub use merge::*;
pub use path::*;
pub use pipeline::*;
pub use simpoint::*;
pub use threadsplit::*;
pub use trace::*;
pub use utils::*;
pub use weights::*;
