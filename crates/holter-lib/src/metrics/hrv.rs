use crate::signal::{BeatSet, RRSeries};
use serde::{Deserialize, Serialize};

/// Heart rate and time-domain variability of one window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RhythmSummary {
    pub beat_count: usize,
    pub hr_bpm: f64,
    pub sdnn_ms: f64,
    pub rmssd_ms: f64,
    pub mean_rr_ms: f64,
    pub pnn50: f64,
}

impl RhythmSummary {
    /// Millisecond and bpm figures rounded to one decimal, for display.
    pub fn rounded(&self) -> Self {
        Self {
            beat_count: self.beat_count,
            hr_bpm: round1(self.hr_bpm),
            sdnn_ms: round1(self.sdnn_ms),
            rmssd_ms: round1(self.rmssd_ms),
            mean_rr_ms: round1(self.mean_rr_ms),
            pnn50: self.pnn50,
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn summarize(beats: &BeatSet, duration_s: f64, fs: u32) -> RhythmSummary {
    let rr = RRSeries::from_beats(beats, fs);
    let beat_count = beats.len();
    let hr_bpm = if duration_s > 0.0 {
        beat_count as f64 / duration_s * 60.0
    } else {
        0.0
    };
    RhythmSummary {
        beat_count,
        hr_bpm,
        sdnn_ms: sdnn(&rr),
        rmssd_ms: rmssd(&rr),
        mean_rr_ms: mean_rr(&rr),
        pnn50: pnn50(&rr),
    }
}

pub fn mean_rr(rr: &RRSeries) -> f64 {
    let n = rr.rr_ms.len();
    if n == 0 {
        return 0.0;
    }
    rr.rr_ms.iter().sum::<f64>() / n as f64
}

/// Sample standard deviation of the RR series.
pub fn sdnn(rr: &RRSeries) -> f64 {
    let n = rr.rr_ms.len();
    if n < 2 {
        return 0.0;
    }
    let mean = mean_rr(rr);
    (rr.rr_ms.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0)).sqrt()
}

/// Root mean square of successive differences, over the `n - 1` differences.
pub fn rmssd(rr: &RRSeries) -> f64 {
    let n = rr.rr_ms.len();
    if n < 2 {
        return 0.0;
    }
    let diffs = rr.rr_ms.windows(2).map(|w| (w[1] - w[0]).powi(2));
    (diffs.sum::<f64>() / (n as f64 - 1.0)).sqrt()
}

pub fn pnn50(rr: &RRSeries) -> f64 {
    let n = rr.rr_ms.len();
    if n < 2 {
        return 0.0;
    }
    let count = rr
        .rr_ms
        .windows(2)
        .filter(|w| (w[1] - w[0]).abs() > 50.0)
        .count();
    count as f64 / (n as f64 - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Beat;

    fn beats_at(indices: &[usize]) -> BeatSet {
        BeatSet::from_beats(
            indices
                .iter()
                .map(|&sample_index| Beat {
                    sample_index,
                    amplitude: 500.0,
                })
                .collect(),
        )
    }

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "expected {expected}, got {actual} (diff {diff} > tol {tol})"
        );
    }

    #[test]
    fn empty_beats_give_zero_summary() {
        let summary = summarize(&BeatSet::default(), 60.0, 125);
        assert_eq!(summary, RhythmSummary::default());
    }

    #[test]
    fn non_positive_duration_gives_zero_rate() {
        let summary = summarize(&beats_at(&[0, 125]), 0.0, 125);
        assert_eq!(summary.hr_bpm, 0.0);
        assert_eq!(summary.beat_count, 2);
    }

    #[test]
    fn steady_rhythm_has_no_variability() {
        let summary = summarize(&beats_at(&[10, 135, 260, 385, 510]), 5.0, 125);
        assert_eq!(summary.beat_count, 5);
        assert_close(summary.hr_bpm, 60.0, 1e-12);
        assert_close(summary.mean_rr_ms, 1000.0, 1e-9);
        assert_eq!(summary.sdnn_ms, 0.0);
        assert_eq!(summary.rmssd_ms, 0.0);
        assert_eq!(summary.pnn50, 0.0);
    }

    #[test]
    fn single_rr_interval_has_no_spread() {
        let summary = summarize(&beats_at(&[0, 100]), 2.0, 125);
        assert_eq!(summary.sdnn_ms, 0.0);
        assert_eq!(summary.rmssd_ms, 0.0);
    }

    #[test]
    fn variability_matches_hand_computation() {
        // RR = 800, 1000, 896 ms at fs = 125.
        let summary = summarize(&beats_at(&[0, 100, 225, 337]), 4.0, 125);
        let rr = [800.0, 1000.0, 896.0];
        let mean = rr.iter().sum::<f64>() / 3.0;
        let var = rr.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / 2.0;
        assert_close(summary.sdnn_ms, var.sqrt(), 1e-9);
        let ssd = (200.0f64).powi(2) + (104.0f64).powi(2);
        assert_close(summary.rmssd_ms, (ssd / 2.0).sqrt(), 1e-9);
        assert_close(summary.pnn50, 1.0, 1e-12);
        assert_close(summary.hr_bpm, 60.0, 1e-12);
    }

    #[test]
    fn rounding_keeps_one_decimal() {
        let summary = RhythmSummary {
            beat_count: 3,
            hr_bpm: 71.26,
            sdnn_ms: 12.349,
            rmssd_ms: 8.05,
            mean_rr_ms: 842.0,
            pnn50: 0.5,
        }
        .rounded();
        assert_close(summary.hr_bpm, 71.3, 1e-9);
        assert_close(summary.sdnn_ms, 12.3, 1e-9);
        assert_close(summary.mean_rr_ms, 842.0, 1e-9);
    }
}
