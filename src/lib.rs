pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod puller;
pub mod time;
pub mod traces;
pub mod xray;

pub use config::Settings;
pub use error::{ExitCode, TracesError, TracesResult};
pub use traces::{AwsToolkit, TraceToolkit, TracesRequest, do_traces};
