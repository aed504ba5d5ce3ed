use crate::{
    config::EcgConfig,
    detectors::ecg::detect,
    error::EcgError,
    filters::bandpass,
    io::raw::SampleStream,
    metrics::hrv::{summarize, RhythmSummary},
    plot::{layout_page, Page},
    signal::{BeatSet, RRSeries, SampleWindow},
};
use serde::{Deserialize, Serialize};

/// Seconds of filtered waveform returned up front by [`analyze_recording`].
pub const WAVE_HEAD_SECONDS: usize = 10;

/// Which waveform a page is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSource {
    Raw,
    #[default]
    Filtered,
}

/// Filter → detect → summarize over one window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowAnalysis {
    pub filtered: Vec<f64>,
    pub beats: BeatSet,
    pub rr: RRSeries,
    pub summary: RhythmSummary,
}

pub fn analyze_window(window: &SampleWindow, fs: u32, cfg: &EcgConfig) -> WindowAnalysis {
    let filtered = bandpass(&window.samples, fs, &cfg.filter);
    let beats = detect(&filtered, fs, &cfg.detector);
    let rr = RRSeries::from_beats(&beats, fs);
    let summary = summarize(&beats, window.duration_s(fs), fs);
    WindowAnalysis {
        filtered,
        beats,
        rr,
        summary,
    }
}

/// One minute of a recording with its beats, ready for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinutePage {
    pub fs: u32,
    pub current_minute: usize,
    pub total_minutes: usize,
    pub start_sample: usize,
    pub samples: Vec<i16>,
    pub filtered: Vec<f64>,
    /// Indices relative to `start_sample`.
    pub beats: BeatSet,
    pub summary: RhythmSummary,
}

impl MinutePage {
    pub fn window(&self) -> SampleWindow {
        SampleWindow::new(self.start_sample, self.samples.clone())
    }

    pub fn layout(&self, source: PageSource, cfg: &EcgConfig) -> Page {
        let beats = self.beats.indices();
        match source {
            PageSource::Raw => {
                let raw: Vec<f64> = self.samples.iter().map(|&s| s as f64).collect();
                layout_page(&raw, &beats, self.fs, &cfg.page)
            }
            PageSource::Filtered => layout_page(&self.filtered, &beats, self.fs, &cfg.page),
        }
    }
}

/// Decode, filter and detect minute `minute` (1-based, already clamped by the caller).
///
/// Filter and detector start from rest at the minute boundary. A minute past the
/// end of the stream gives an empty page rather than an error.
pub fn minute_page(
    stream: &SampleStream,
    minute: usize,
    cfg: &EcgConfig,
) -> Result<MinutePage, EcgError> {
    let fs = stream.fs();
    let window = stream.read_minute(minute)?;
    let analysis = analyze_window(&window, fs, cfg);
    Ok(MinutePage {
        fs,
        current_minute: minute,
        total_minutes: stream.total_minutes(),
        start_sample: window.start_sample,
        samples: window.samples,
        filtered: analysis.filtered,
        beats: analysis.beats,
        summary: analysis.summary,
    })
}

/// Beat detection and rhythm summary over a whole recording, or its first `seconds`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingAnalysis {
    pub fs: u32,
    pub duration_s: f64,
    pub beats: BeatSet,
    pub rr_ms: Vec<f64>,
    pub summary: RhythmSummary,
    /// First seconds of the filtered waveform, rounded.
    pub wave_head: Vec<i32>,
}

pub fn analyze_recording(
    stream: &SampleStream,
    seconds: Option<u64>,
    cfg: &EcgConfig,
) -> Result<RecordingAnalysis, EcgError> {
    let fs = stream.fs();
    let window = match seconds {
        Some(s) if s > 0 => stream.read_window(0, (s as usize).saturating_mul(fs as usize))?,
        _ => stream.read_all()?,
    };
    let analysis = analyze_window(&window, fs, cfg);
    let head_len = analysis.filtered.len().min(WAVE_HEAD_SECONDS * fs as usize);
    let wave_head = analysis.filtered[..head_len]
        .iter()
        .map(|v| v.round() as i32)
        .collect();
    Ok(RecordingAnalysis {
        fs,
        duration_s: window.duration_s(fs),
        beats: analysis.beats,
        rr_ms: analysis.rr.rr_ms,
        summary: analysis.summary,
        wave_head,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::raw::encode_samples;
    use crate::plot::Trace;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FS: usize = 125;

    /// Narrow R-waves every `period` samples on a flat baseline.
    fn pulse_train(len: usize, first: usize, period: usize, amp: i16) -> Vec<i16> {
        let mut out = vec![0i16; len];
        let mut center = first;
        while center + 4 < len {
            for k in 0..4usize {
                let v = amp / 4 * (4 - k as i16);
                out[center + k] = v;
                out[center - k] = v;
            }
            center += period;
        }
        out
    }

    fn write_stream(samples: &[i16]) -> (NamedTempFile, SampleStream) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&encode_samples(samples)).unwrap();
        file.flush().unwrap();
        let stream = SampleStream::open(file.path(), &EcgConfig::default().stream).unwrap();
        (file, stream)
    }

    #[test]
    fn minute_page_finds_beats_of_a_steady_rhythm() {
        let samples = pulse_train(FS * 90, 50, FS, 1200);
        let (_file, stream) = write_stream(&samples);
        let cfg = EcgConfig::default();

        let first = minute_page(&stream, 1, &cfg).unwrap();
        assert_eq!(first.total_minutes, 2);
        assert_eq!(first.samples.len(), FS * 60);
        assert_eq!(first.filtered.len(), FS * 60);
        assert_eq!(first.beats.len(), 60);
        assert!((first.summary.hr_bpm - 60.0).abs() < 1e-9);
        assert!(first.summary.sdnn_ms < 10.0);

        let second = minute_page(&stream, 2, &cfg).unwrap();
        assert_eq!(second.start_sample, FS * 60);
        assert_eq!(second.samples.len(), FS * 30);
        assert_eq!(second.beats.len(), 30);
        assert!(second.beats.indices().iter().all(|&b| b < FS * 30));
    }

    #[test]
    fn minute_past_the_end_is_empty() {
        let (_file, stream) = write_stream(&vec![0; FS * 10]);
        let page = minute_page(&stream, 5, &EcgConfig::default()).unwrap();
        assert!(page.samples.is_empty());
        assert!(page.beats.is_empty());
        assert_eq!(page.summary, RhythmSummary::default());
        let layout = page.layout(PageSource::Filtered, &EcgConfig::default());
        assert!(layout
            .panels
            .iter()
            .all(|p| p.trace == Trace::FlatLine { y: 0.5 }));
    }

    #[test]
    fn all_zero_recording_has_empty_rhythm() {
        let (_file, stream) = write_stream(&vec![0; FS * 30]);
        let analysis = analyze_recording(&stream, None, &EcgConfig::default()).unwrap();
        assert!(analysis.beats.is_empty());
        assert!(analysis.rr_ms.is_empty());
        assert_eq!(analysis.summary.hr_bpm, 0.0);
        assert_eq!(analysis.summary.sdnn_ms, 0.0);
        assert_eq!(analysis.summary.rmssd_ms, 0.0);
        assert_eq!(analysis.wave_head.len(), FS * 10);
    }

    #[test]
    fn recording_analysis_can_stop_early() {
        let samples = pulse_train(FS * 40, 50, FS, 1200);
        let (_file, stream) = write_stream(&samples);
        let cfg = EcgConfig::default();
        let head = analyze_recording(&stream, Some(20), &cfg).unwrap();
        assert!((head.duration_s - 20.0).abs() < 1e-12);
        assert_eq!(head.beats.len(), 20);
        assert_eq!(head.rr_ms.len(), 19);
        assert!(head.rr_ms.iter().all(|&rr| (rr - 1000.0).abs() < 1e-9));

        let whole = analyze_recording(&stream, None, &cfg).unwrap();
        assert!((whole.duration_s - 40.0).abs() < 1e-12);
        assert_eq!(whole.beats.len(), 40);
    }

    #[test]
    fn layout_source_selects_waveform() {
        let samples = pulse_train(FS * 60, 50, FS, 1200);
        let (_file, stream) = write_stream(&samples);
        let cfg = EcgConfig::default();
        let page = minute_page(&stream, 1, &cfg).unwrap();
        let raw = page.layout(PageSource::Raw, &cfg);
        let filtered = page.layout(PageSource::Filtered, &cfg);
        assert_eq!(raw.scale.lo, 0.0);
        assert_eq!(raw.scale.hi, 1200.0);
        assert!(filtered.scale.lo < 0.0);
        assert_eq!(raw.panels[0].local_beats, filtered.panels[0].local_beats);
        assert_eq!(raw.panels[0].local_beats.len(), 10);
    }
}
