pub mod batch;
pub mod config;
pub mod error;
pub mod media;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stitch;
pub mod subtitle;
pub mod transcribe;

pub use config::{Config, JobConfig, Mode, OutputFormat, Source};
pub use error::{Result, SubgenError};
pub use pipeline::{format_elapsed, print_summary, run_job, run_job_with, JobResult};
pub use stitch::{stitch, MergedTimeline};
