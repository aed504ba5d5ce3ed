//! Backend-independent page geometry.
//!
//! Coordinates are normalized to the panel: `x` runs 0 → 1 left to right over the
//! nominal panel duration, `y` runs 0 → 1 top to bottom. Pixel sizes, device
//! ratios and colours belong to whatever implements [`PageRenderer`].

mod page;

pub use page::{layout_page, page_scale};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Vertical,
    Horizontal,
}

/// A full-length grid line at a normalized position along the other axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLine {
    pub orientation: Orientation,
    pub position: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trace {
    Polyline { points: Vec<[f64; 2]> },
    /// Drawn when a panel has fewer than two samples.
    FlatLine { y: f64 },
}

impl Trace {
    pub fn point_count(&self) -> usize {
        match self {
            Trace::Polyline { points } => points.len(),
            Trace::FlatLine { .. } => 0,
        }
    }
}

/// Vertical range shared by every panel of a page. Always `hi > lo`, both within `±amp_cap`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmplitudeScale {
    pub lo: f64,
    pub hi: f64,
}

impl AmplitudeScale {
    pub fn capped_default(amp_cap: f64) -> Self {
        Self {
            lo: -amp_cap,
            hi: amp_cap,
        }
    }

    pub fn span(&self) -> f64 {
        self.hi - self.lo
    }

    /// Position of `value` in the range, 0 at `lo` and 1 at `hi`.
    pub fn fraction(&self, value: f64, amp_cap: f64) -> f64 {
        let v = value.clamp(-amp_cap, amp_cap);
        ((v - self.lo) / self.span()).clamp(0.0, 1.0)
    }
}

/// Time span covered by a panel, in whole seconds from the page start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelLabel {
    pub start_s: usize,
    pub end_s: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    pub index: usize,
    pub segment_start: usize,
    /// Nominal panel length in samples; `x` is measured against this.
    pub segment_length: usize,
    /// Samples actually present, shorter on a partial final page.
    pub sample_count: usize,
    /// Beat indices relative to `segment_start`.
    pub local_beats: Vec<usize>,
    pub label: PanelLabel,
    pub grid: Vec<GridLine>,
    pub trace: Trace,
    /// Normalized `x` of each beat marker.
    pub beat_markers: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub fs: u32,
    pub amp_cap: f64,
    pub scale: AmplitudeScale,
    pub panels: Vec<Panel>,
}

/// Something that can put a page on a drawing surface.
pub trait PageRenderer {
    fn render(&mut self, page: &Page) -> anyhow::Result<()>;
}
