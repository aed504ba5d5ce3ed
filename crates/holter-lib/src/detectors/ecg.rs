use crate::{
    config::DetectorConfig,
    signal::{Beat, BeatSet},
};

/// Per-pass detector accumulators: the squared-derivative ring buffer behind the
/// moving-window integrator, the decaying energy envelope, and the last accepted beat.
#[derive(Debug, Clone)]
pub struct DetectorState {
    ring: Vec<f64>,
    pos: usize,
    sum: f64,
    envelope: f64,
    decay: f64,
    last_accepted: Option<usize>,
}

impl DetectorState {
    pub fn new(window: usize, decay: f64) -> Self {
        Self {
            ring: vec![0.0; window.max(1)],
            pos: 0,
            sum: 0.0,
            envelope: 0.0,
            decay,
            last_accepted: None,
        }
    }

    /// Push one derivative sample, returning the moving-window mean of its square.
    pub fn integrate(&mut self, derivative: f64) -> f64 {
        let sq = derivative * derivative;
        self.sum += sq - self.ring[self.pos];
        self.ring[self.pos] = sq;
        self.pos += 1;
        if self.pos == self.ring.len() {
            self.pos = 0;
            // Resync once per lap to shed rounding residue.
            self.sum = self.ring.iter().sum();
        }
        self.sum / self.ring.len() as f64
    }

    /// Advance the envelope with the latest integrated value.
    pub fn track(&mut self, integrated: f64) -> f64 {
        self.envelope = (self.envelope * self.decay).max(integrated);
        self.envelope
    }

    fn refractory_elapsed(&self, index: usize, refractory: usize) -> bool {
        match self.last_accepted {
            None => true,
            Some(last) => index >= last + refractory.max(1),
        }
    }
}

/// Find R-peaks on a band-passed waveform.
///
/// First difference, squared moving-window integration and a decaying envelope
/// produce an energy curve; local maxima above `threshold_gain × envelope` are
/// candidates, gated by the refractory period and then moved to the tallest
/// filtered sample within `peak_search_s` on either side.
pub fn detect(filtered: &[f64], fs: u32, cfg: &DetectorConfig) -> BeatSet {
    let n = filtered.len();
    if n < 3 {
        return BeatSet::default();
    }

    let mut state = DetectorState::new(cfg.integration_samples(fs), cfg.envelope_decay);
    let integrated = energy_curve(filtered, &mut state);
    let thresholds: Vec<f64> = integrated
        .iter()
        .map(|&mi| cfg.threshold_gain * state.track(mi))
        .collect();

    let refractory = cfg.refractory_samples(fs);
    let search = cfg.peak_search_samples(fs);
    let mut beats = Vec::new();

    for i in 1..n - 1 {
        let mi = integrated[i];
        let is_candidate = mi > thresholds[i] && mi >= integrated[i - 1] && mi >= integrated[i + 1];
        if !is_candidate || !state.refractory_elapsed(i, refractory) {
            continue;
        }
        let beat = localize_peak(filtered, i, search);
        // The refined peak may sit up to `search` samples before the candidate.
        if !state.refractory_elapsed(beat.sample_index, refractory) {
            continue;
        }
        state.last_accepted = Some(beat.sample_index);
        beats.push(beat);
    }

    BeatSet::from_beats(beats)
}

/// Moving-window integrated squared first difference (`d[0] = 0`).
fn energy_curve(filtered: &[f64], state: &mut DetectorState) -> Vec<f64> {
    let mut prev = filtered.first().copied().unwrap_or(0.0);
    filtered
        .iter()
        .map(|&x| {
            let d = x - prev;
            prev = x;
            state.integrate(d)
        })
        .collect()
}

fn localize_peak(filtered: &[f64], center: usize, search: usize) -> Beat {
    let start = center.saturating_sub(search);
    let end = (center + search).min(filtered.len() - 1);
    let mut best = Beat {
        sample_index: start,
        amplitude: filtered[start],
    };
    for (offset, &value) in filtered[start..=end].iter().enumerate() {
        if value > best.amplitude {
            best = Beat {
                sample_index: start + offset,
                amplitude: value,
            };
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::filters::bandpass_f64;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const FS: u32 = 125;

    fn cfg() -> DetectorConfig {
        DetectorConfig::default()
    }

    fn triangle_pulse(len: usize, center: usize, half_width: usize, amp: f64) -> Vec<f64> {
        (0..len)
            .map(|i| {
                let dist = (i as isize - center as isize).unsigned_abs();
                if dist >= half_width {
                    0.0
                } else {
                    amp * (1.0 - dist as f64 / half_width as f64)
                }
            })
            .collect()
    }

    fn synthetic_ecg(fs: u32, rr: &[f64]) -> (Vec<f64>, Vec<usize>) {
        let fs = fs as f64;
        let mut beats = Vec::with_capacity(rr.len() + 1);
        let mut t = 0.5;
        beats.push(t);
        for &interval in rr {
            t += interval;
            beats.push(t);
        }
        let duration = beats.last().copied().unwrap_or(1.0) + 1.0;
        let samples = (duration * fs) as usize;
        let mut data = Vec::with_capacity(samples);
        for i in 0..samples {
            let time = i as f64 / fs;
            let mut v = 0.0;
            for &bt in &beats {
                let width = 0.02;
                v += 1000.0 * (-0.5 * ((time - bt) / width).powi(2)).exp();
            }
            data.push(v);
        }
        let expected = beats.iter().map(|bt| (bt * fs).round() as usize).collect();
        (data, expected)
    }

    fn assert_refractory(beats: &BeatSet, refractory: usize) {
        for pair in beats.beats.windows(2) {
            let gap = pair[1].sample_index as isize - pair[0].sample_index as isize;
            assert!(
                gap >= refractory as isize,
                "beats {} and {} closer than {} samples",
                pair[0].sample_index,
                pair[1].sample_index,
                refractory
            );
        }
    }

    #[test]
    fn single_triangular_pulse_yields_one_beat() {
        let signal = triangle_pulse(FS as usize * 10, 625, 5, 1000.0);
        let beats = detect(&signal, FS, &cfg());
        assert_eq!(beats.len(), 1);
        let idx = beats.beats[0].sample_index;
        assert!((623..=627).contains(&idx), "beat at {idx}");
        assert_eq!(beats.beats[0].amplitude, 1000.0);
    }

    #[test]
    fn single_pulse_survives_the_bandpass() {
        let raw = triangle_pulse(FS as usize * 10, 625, 5, 1000.0);
        let filtered = bandpass_f64(&raw, FS, &FilterConfig::default());
        let beats = detect(&filtered, FS, &cfg());
        assert_eq!(beats.len(), 1);
        let idx = beats.beats[0].sample_index;
        assert!((623..=627).contains(&idx), "beat at {idx}");
    }

    #[test]
    fn all_zero_window_has_no_beats() {
        for len in [0, 1, 2, 3, 10, 7500] {
            assert!(detect(&vec![0.0; len], FS, &cfg()).is_empty());
        }
    }

    #[test]
    fn constant_window_has_no_beats() {
        assert!(detect(&vec![321.0; 5000], FS, &cfg()).is_empty());
    }

    #[test]
    fn windows_shorter_than_three_samples_are_empty() {
        assert!(detect(&[0.0, 900.0], FS, &cfg()).is_empty());
        assert!(detect(&[900.0], FS, &cfg()).is_empty());
    }

    #[test]
    fn detects_regular_beats() {
        let rr = [0.82, 0.78, 0.8, 0.79, 0.81, 0.77, 0.84, 0.88];
        let (raw, expected) = synthetic_ecg(FS, &rr);
        let filtered = bandpass_f64(&raw, FS, &FilterConfig::default());
        let beats = detect(&filtered, FS, &cfg());
        assert_eq!(beats.len(), rr.len() + 1);
        for (beat, want) in beats.indices().iter().zip(&expected) {
            let diff = (*beat as isize - *want as isize).abs();
            assert!(diff <= 3, "beat at {beat}, expected near {want}");
        }
        assert_refractory(&beats, cfg().refractory_samples(FS));
    }

    #[test]
    fn refractory_holds_on_noisy_input() {
        let refractory = cfg().refractory_samples(FS);
        for seed in 0..8u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut signal: Vec<f64> = (0..FS as usize * 60)
                .map(|_| rng.gen_range(-300.0..300.0))
                .collect();
            for _ in 0..200 {
                let at = rng.gen_range(0..signal.len());
                signal[at] += rng.gen_range(-4000.0..4000.0);
            }
            let filtered = bandpass_f64(&signal, FS, &FilterConfig::default());
            let beats = detect(&filtered, FS, &cfg());
            assert_refractory(&beats, refractory);
        }
    }

    #[test]
    fn closely_spaced_pulses_collapse_to_one_beat() {
        let mut signal = triangle_pulse(FS as usize * 5, 300, 4, 800.0);
        let second = triangle_pulse(FS as usize * 5, 315, 4, 1200.0);
        for (s, extra) in signal.iter_mut().zip(second) {
            *s += extra;
        }
        let beats = detect(&signal, FS, &cfg());
        assert_eq!(beats.len(), 1);
    }

    #[test]
    fn integrator_averages_over_window() {
        let mut state = DetectorState::new(4, 0.995);
        assert_eq!(state.integrate(2.0), 1.0);
        assert_eq!(state.integrate(2.0), 2.0);
        assert_eq!(state.integrate(0.0), 2.0);
        assert_eq!(state.integrate(0.0), 2.0);
        assert_eq!(state.integrate(0.0), 1.0);
        assert_eq!(state.integrate(0.0), 0.0);
    }

    #[test]
    fn envelope_decays_until_overtaken() {
        let mut state = DetectorState::new(1, 0.5);
        assert_eq!(state.track(8.0), 8.0);
        assert_eq!(state.track(1.0), 4.0);
        assert_eq!(state.track(1.0), 2.0);
        assert_eq!(state.track(3.0), 3.0);
    }
}
