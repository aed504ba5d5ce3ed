pub mod config;
pub mod detectors;
pub mod error;
pub mod filters;
pub mod io;
pub mod metrics;
pub mod plot;
pub mod report;
pub mod signal;

pub use config::EcgConfig;
pub use error::EcgError;
pub use signal::*;
