use crate::error::EcgError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Raw stream layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Sampling rate in Hz.
    pub fs: u32,
    /// Opaque header skipped before the first sample.
    pub header_bytes: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            fs: 125,
            header_bytes: 0,
        }
    }
}

/// Corner frequencies of the high-pass/low-pass cascade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub highpass_hz: f64,
    pub lowpass_hz: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            highpass_hz: 0.67,
            lowpass_hz: 35.0,
        }
    }
}

/// Configurable parameters for the R-peak detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Moving window integration length (seconds).
    pub integration_window_s: f64,
    /// Per-sample decay of the energy envelope.
    pub envelope_decay: f64,
    /// Fraction of the envelope a candidate must exceed.
    pub threshold_gain: f64,
    /// Minimum spacing between accepted beats (seconds).
    pub refractory_s: f64,
    /// Half-width of the search for the true peak around a candidate (seconds).
    pub peak_search_s: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            integration_window_s: 0.100,
            envelope_decay: 0.995,
            threshold_gain: 0.45,
            refractory_s: 0.240,
            peak_search_s: 0.050,
        }
    }
}

impl DetectorConfig {
    pub fn integration_samples(&self, fs: u32) -> usize {
        ((self.integration_window_s * fs as f64).round() as usize).max(1)
    }

    pub fn refractory_samples(&self, fs: u32) -> usize {
        (self.refractory_s * fs as f64).round() as usize
    }

    pub fn peak_search_samples(&self, fs: u32) -> usize {
        (self.peak_search_s * fs as f64).round() as usize
    }
}

/// Geometry of one display page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub panel_count: usize,
    pub panel_seconds: u32,
    /// Hard ceiling for the shared amplitude scale, in raw units.
    pub amp_cap: f64,
    /// Horizontal grid rows; `grid_rows - 1` interior lines are drawn.
    pub grid_rows: usize,
    /// Blank margin above and below the trace, as a fraction of panel height.
    pub vertical_padding: f64,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            panel_count: 6,
            panel_seconds: 10,
            amp_cap: 1500.0,
            grid_rows: 5,
            vertical_padding: 0.03,
        }
    }
}

impl PageConfig {
    pub fn samples_per_panel(&self, fs: u32) -> usize {
        self.panel_seconds as usize * fs as usize
    }

    pub fn samples_per_page(&self, fs: u32) -> usize {
        self.panel_count * self.samples_per_panel(fs)
    }
}

/// Everything the pipeline needs, passed explicitly into every stage.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EcgConfig {
    pub stream: StreamConfig,
    pub filter: FilterConfig,
    pub detector: DetectorConfig,
    pub page: PageConfig,
}

impl EcgConfig {
    pub fn fs(&self) -> u32 {
        self.stream.fs
    }

    /// Parse a (possibly partial) TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let cfg: EcgConfig = toml::from_str(text).context("parsing configuration TOML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("loading {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), EcgError> {
        let fs = self.stream.fs;
        if fs == 0 {
            return Err(EcgError::InvalidConfig("fs must be positive".into()));
        }
        if !(self.filter.highpass_hz > 0.0) || !(self.filter.lowpass_hz > 0.0) {
            return Err(EcgError::InvalidConfig(
                "filter corner frequencies must be positive".into(),
            ));
        }
        if self.filter.highpass_hz >= self.filter.lowpass_hz {
            return Err(EcgError::InvalidConfig(format!(
                "high-pass corner {} Hz must sit below low-pass corner {} Hz",
                self.filter.highpass_hz, self.filter.lowpass_hz
            )));
        }
        let det = &self.detector;
        if !(det.envelope_decay > 0.0 && det.envelope_decay < 1.0) {
            return Err(EcgError::InvalidConfig(
                "envelope_decay must lie in (0, 1)".into(),
            ));
        }
        if !(det.threshold_gain > 0.0) || det.refractory_s < 0.0 || det.peak_search_s < 0.0 {
            return Err(EcgError::InvalidConfig(
                "detector gain must be positive and windows non-negative".into(),
            ));
        }
        let page = &self.page;
        if page.panel_count == 0 || page.panel_seconds == 0 {
            return Err(EcgError::InvalidConfig(
                "page geometry must have at least one panel of non-zero length".into(),
            ));
        }
        if !(page.amp_cap > 0.0) || !page.amp_cap.is_finite() {
            return Err(EcgError::InvalidConfig("amp_cap must be a positive number".into()));
        }
        if !(0.0..0.5).contains(&page.vertical_padding) {
            return Err(EcgError::InvalidConfig(
                "vertical_padding must lie in [0, 0.5)".into(),
            ));
        }
        Ok(())
    }
}
