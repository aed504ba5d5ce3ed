pub mod ecg;

pub use ecg::{detect, DetectorState};
