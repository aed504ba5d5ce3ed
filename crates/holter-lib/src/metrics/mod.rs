pub mod hrv;

pub use hrv::{summarize, RhythmSummary};
