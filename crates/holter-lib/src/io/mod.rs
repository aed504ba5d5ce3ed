pub mod export;
pub mod raw;

pub use raw::{RecordingInfo, SampleStream};
