//! Command-line front end for `wsinspector_core`

#![warn(clippy::all)]

pub mod logging;
pub mod output;
pub mod run;

pub use logging::{LogFile, init_logging};
pub use run::{RunOptions, execute, prepare, run};
