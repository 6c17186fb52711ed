//! Output of trace data.
//!
//! Pullers hand events to an [`EventConsumer`]. The stock consumer maps each
//! event to a line of text with an [`EventMapper`] and writes it to a shared
//! writer (stdout in the CLI):
//! - console mappers render a human readable summary
//! - JSON mappers emit the raw record, one object per line

mod console;
mod consumer;
mod event;
mod json;

pub use console::{ServiceGraphConsoleMapper, TraceConsoleMapper};
pub use consumer::{CollectingConsumer, MappedConsumer};
pub use event::TraceEvent;
pub use json::{ServiceGraphJsonMapper, TraceJsonMapper};

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

/// Writer shared by every consumer of a run so lines never interleave.
pub type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Turns an event into printable text.
pub trait EventMapper<E: ?Sized>: Send + Sync {
    fn map(&self, event: &E) -> Result<String, OutputError>;
}

/// Receives events from a puller.
pub trait EventConsumer<E: ?Sized>: Send + Sync {
    fn consume(&self, event: &E) -> Result<(), OutputError>;
}

pub fn stdout_writer() -> SharedWriter {
    Arc::new(Mutex::new(Box::new(std::io::stdout())))
}
