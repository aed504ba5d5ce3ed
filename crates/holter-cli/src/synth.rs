use anyhow::{Context, Result};
use holter_lib::io::raw::encode_samples;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use std::{fs, path::Path};

/// Width (σ) of a synthetic R-wave in seconds.
const BEAT_WIDTH_S: f64 = 0.02;
/// Time of the first beat in seconds.
const FIRST_BEAT_S: f64 = 0.5;

pub struct SynthParams {
    pub fs: u32,
    pub seconds: u64,
    pub bpm: f64,
    pub amplitude: f64,
    pub noise: f64,
    pub seed: u64,
}

pub struct SynthRecording {
    pub fs: u32,
    pub samples: Vec<i16>,
    /// Sample index of every beat centre.
    pub beats: Vec<usize>,
}

#[derive(Serialize)]
pub struct SynthSummary {
    pub path: String,
    pub fs: u32,
    pub samples: usize,
    pub beats: usize,
    pub duration_s: f64,
}

impl SynthRecording {
    pub fn summary(&self, path: &Path) -> SynthSummary {
        SynthSummary {
            path: path.display().to_string(),
            fs: self.fs,
            samples: self.samples.len(),
            beats: self.beats.len(),
            duration_s: self.samples.len() as f64 / self.fs.max(1) as f64,
        }
    }
}

/// Gaussian R-waves at a fixed rate plus uniform noise, quantized to int16.
pub fn generate(params: &SynthParams) -> SynthRecording {
    let fs = params.fs.max(1) as f64;
    let len = (params.seconds as usize).saturating_mul(params.fs as usize);
    let period_s = if params.bpm > 0.0 { 60.0 / params.bpm } else { f64::INFINITY };
    let width = BEAT_WIDTH_S * fs;

    let mut centres = Vec::new();
    let mut t = FIRST_BEAT_S;
    while period_s.is_finite() && ((t * fs).round() as usize) < len {
        centres.push((t * fs).round() as usize);
        t += period_s;
    }

    let mut signal = vec![0.0f64; len];
    let reach = (4.0 * width).ceil() as usize;
    for &c in &centres {
        let lo = c.saturating_sub(reach);
        let hi = (c + reach + 1).min(len);
        for (i, v) in signal.iter_mut().enumerate().take(hi).skip(lo) {
            let d = (i as f64 - c as f64) / width;
            *v += params.amplitude * (-0.5 * d * d).exp();
        }
    }

    if params.noise > 0.0 {
        let mut rng = StdRng::seed_from_u64(params.seed);
        for v in signal.iter_mut() {
            *v += rng.gen_range(-params.noise..=params.noise);
        }
    }

    let samples = signal
        .iter()
        .map(|v| v.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16)
        .collect();
    SynthRecording {
        fs: params.fs,
        samples,
        beats: centres,
    }
}

pub fn write_raw(path: &Path, samples: &[i16]) -> Result<()> {
    fs::write(path, encode_samples(samples))
        .with_context(|| format!("writing {}", path.display()))
}
