use crate::config::FilterConfig;
use std::f64::consts::PI;

/// Feedback accumulators of the single-pole high-pass → low-pass cascade.
///
/// Built fresh for every window: output does not carry over between windows, so
/// the first ~200 ms of each window contain the filter's settling transient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterState {
    alpha_h: f64,
    alpha_l: f64,
    prev_input: f64,
    prev_hpf_output: f64,
    prev_lpf_output: f64,
}

impl FilterState {
    pub fn new(fs: u32, cfg: &FilterConfig) -> Self {
        let dt = 1.0 / fs.max(1) as f64;
        Self {
            alpha_h: decay_coefficient(cfg.highpass_hz, dt),
            alpha_l: decay_coefficient(cfg.lowpass_hz, dt),
            prev_input: 0.0,
            prev_hpf_output: 0.0,
            prev_lpf_output: 0.0,
        }
    }

    pub fn alpha_h(&self) -> f64 {
        self.alpha_h
    }

    pub fn alpha_l(&self) -> f64 {
        self.alpha_l
    }

    /// Push one sample through both stages.
    pub fn step(&mut self, x: f64) -> f64 {
        let hpf = self.alpha_h * (self.prev_hpf_output + x - self.prev_input);
        let lpf = (1.0 - self.alpha_l) * hpf + self.alpha_l * self.prev_lpf_output;
        self.prev_input = x;
        self.prev_hpf_output = hpf;
        self.prev_lpf_output = lpf;
        lpf
    }
}

fn decay_coefficient(corner_hz: f64, dt: f64) -> f64 {
    (-2.0 * PI * corner_hz * dt).exp()
}

/// Baseline-corrected, smoothed copy of `samples`, same length, one causal pass.
pub fn bandpass(samples: &[i16], fs: u32, cfg: &FilterConfig) -> Vec<f64> {
    let mut state = FilterState::new(fs, cfg);
    samples.iter().map(|&x| state.step(x as f64)).collect()
}

/// Same as [`bandpass`] for samples that are already floating point.
pub fn bandpass_f64(samples: &[f64], fs: u32, cfg: &FilterConfig) -> Vec<f64> {
    let mut state = FilterState::new(fs, cfg);
    samples.iter().map(|&x| state.step(x)).collect()
}
