use super::{AmplitudeScale, GridLine, Orientation, Page, Panel, PanelLabel, Trace};
use crate::config::PageConfig;
use log::warn;

/// Lay out one page of samples as `panel_count` panels sharing a single amplitude scale.
///
/// `beats` are indices into `samples`. Samples past the page extent are ignored;
/// a short page yields short or empty panels, never an error.
pub fn layout_page(samples: &[f64], beats: &[usize], fs: u32, cfg: &PageConfig) -> Page {
    let segment_length = cfg.samples_per_panel(fs).max(1);
    let page_len = samples.len().min(segment_length * cfg.panel_count);
    let amp_cap = cfg.amp_cap;
    let scale = page_scale(&samples[..page_len], amp_cap);

    let panels = (0..cfg.panel_count)
        .map(|index| {
            let segment_start = index * segment_length;
            let segment_end = (segment_start + segment_length).min(page_len);
            let segment = samples.get(segment_start..segment_end).unwrap_or(&[]);

            let local_beats: Vec<usize> = beats
                .iter()
                .filter(|&&b| b >= segment_start && b < segment_start + segment_length)
                .map(|&b| b - segment_start)
                .collect();
            let beat_markers = local_beats
                .iter()
                .map(|&b| b as f64 / segment_length as f64)
                .collect();

            let trace = if segment.len() < 2 {
                Trace::FlatLine { y: 0.5 }
            } else {
                let points = segment
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| {
                        let x = i as f64 / segment_length as f64;
                        [x, to_y(scale.fraction(v, amp_cap), cfg.vertical_padding)]
                    })
                    .collect();
                Trace::Polyline { points }
            };

            let fs_samples = fs.max(1) as usize;
            Panel {
                index,
                segment_start,
                segment_length,
                sample_count: segment.len(),
                local_beats,
                label: PanelLabel {
                    start_s: segment_start / fs_samples,
                    end_s: (segment_start + segment_length) / fs_samples,
                },
                grid: grid_lines(segment_start, segment_length, fs, cfg.grid_rows),
                trace,
                beat_markers,
            }
        })
        .collect();

    Page {
        fs,
        amp_cap,
        scale,
        panels,
    }
}

/// Page-wide scale from the min/max of `samples`, clamped to `±amp_cap`.
///
/// A range that is empty or collapses under clamping falls back to `[-amp_cap, amp_cap]`.
pub fn page_scale(samples: &[f64], amp_cap: f64) -> AmplitudeScale {
    let (min, max) = samples
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if min > max {
        warn!("amplitude scale degenerate: no samples on page, using ±{amp_cap}");
        return AmplitudeScale::capped_default(amp_cap);
    }
    let lo = min.clamp(-amp_cap, amp_cap);
    let hi = max.clamp(-amp_cap, amp_cap);
    if hi > lo {
        AmplitudeScale { lo, hi }
    } else {
        warn!("amplitude scale degenerate: range [{min}, {max}] collapses, using ±{amp_cap}");
        AmplitudeScale::capped_default(amp_cap)
    }
}

/// Inverted so larger amplitudes sit higher, inside the vertical padding.
fn to_y(fraction: f64, padding: f64) -> f64 {
    padding + (1.0 - fraction) * (1.0 - 2.0 * padding)
}

fn grid_lines(segment_start: usize, segment_length: usize, fs: u32, rows: usize) -> Vec<GridLine> {
    let fs = fs.max(1) as usize;
    let first = segment_start.div_ceil(fs);
    let last = (segment_start + segment_length) / fs;
    let mut lines: Vec<GridLine> = (first..=last)
        .map(|s| GridLine {
            orientation: Orientation::Vertical,
            position: (s * fs - segment_start) as f64 / segment_length as f64,
        })
        .collect();
    lines.extend((1..rows).map(|i| GridLine {
        orientation: Orientation::Horizontal,
        position: i as f64 / rows as f64,
    }));
    lines
}
