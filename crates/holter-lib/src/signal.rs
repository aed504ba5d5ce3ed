use serde::{Deserialize, Serialize};

/// Contiguous run of decoded samples, positioned by its first sample in the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleWindow {
    pub start_sample: usize,
    pub samples: Vec<i16>,
}

impl SampleWindow {
    pub fn new(start_sample: usize, samples: Vec<i16>) -> Self {
        Self {
            start_sample,
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_s(&self, fs: u32) -> f64 {
        if fs == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / fs as f64
    }
}

/// One detected R-peak on the filtered waveform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Beat {
    pub sample_index: usize,
    pub amplitude: f64,
}

/// Beats ordered by sample index, spaced by at least the refractory period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeatSet {
    pub beats: Vec<Beat>,
}

impl BeatSet {
    pub fn from_beats(beats: Vec<Beat>) -> Self {
        Self { beats }
    }

    pub fn len(&self) -> usize {
        self.beats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beats.is_empty()
    }

    pub fn indices(&self) -> Vec<usize> {
        self.beats.iter().map(|b| b.sample_index).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Beat> {
        self.beats.iter()
    }
}

/// RR intervals (milliseconds)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RRSeries {
    pub rr_ms: Vec<f64>,
}

impl RRSeries {
    pub fn from_beats(beats: &BeatSet, fs: u32) -> Self {
        let fs = fs.max(1) as f64;
        let rr_ms = beats
            .beats
            .windows(2)
            .map(|w| 1000.0 * (w[1].sample_index as f64 - w[0].sample_index as f64) / fs)
            .collect();
        Self { rr_ms }
    }

    pub fn len(&self) -> usize {
        self.rr_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rr_ms.is_empty()
    }
}
