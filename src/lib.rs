pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod logging;
pub mod metrics;
pub mod pipeline;

// Domain data shapes shared across the pipeline stages
pub mod domain;
