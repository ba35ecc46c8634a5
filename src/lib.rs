pub mod cli;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod index;
mod metrics;
pub mod neighbors;
pub mod pairs;
pub mod quality;
pub mod rank;
pub mod report;
pub mod sink;
pub mod source;
pub mod utils;

pub use config::{MatchConfig, Opts};
pub use engine::MatchEngine;
pub use error::{MatchError, Stage};
pub use report::{MatchReport, Report, ReportEntry};
