use crate::signal::{BeatSet, SampleWindow};
use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Header line of every export, also written when there are no rows.
pub const COLUMNS: [&str; 3] = [
    "global_sample_index",
    "sample_index_in_minute",
    "amplitude",
];

/// One exported sample: its position in the recording, in its minute, and its value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    pub global_sample_index: usize,
    pub sample_index_in_minute: usize,
    pub amplitude: f64,
}

/// Every sample of a window, in ascending index order.
pub fn sample_rows(window: &SampleWindow) -> Vec<SampleRow> {
    window
        .samples
        .iter()
        .enumerate()
        .map(|(i, &value)| SampleRow {
            global_sample_index: window.start_sample + i,
            sample_index_in_minute: i,
            amplitude: value as f64,
        })
        .collect()
}

/// Detected beats of a window. Beat indices are window-local; amplitudes are the
/// filtered values the detector recorded.
pub fn beat_rows(window: &SampleWindow, beats: &BeatSet) -> Vec<SampleRow> {
    let mut rows: Vec<SampleRow> = beats
        .iter()
        .filter(|beat| beat.sample_index < window.len())
        .map(|beat| SampleRow {
            global_sample_index: window.start_sample + beat.sample_index,
            sample_index_in_minute: beat.sample_index,
            amplitude: beat.amplitude,
        })
        .collect();
    rows.sort_by_key(|row| row.global_sample_index);
    rows
}

/// Write rows as CSV with a single header line of column names.
pub fn write_rows_csv<W: Write>(writer: W, rows: &[SampleRow]) -> Result<()> {
    let mut out = WriterBuilder::new().has_headers(false).from_writer(writer);
    out.write_record(COLUMNS).context("writing CSV header")?;
    for row in rows {
        out.serialize(row).context("writing CSV row")?;
    }
    out.flush().context("flushing CSV output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Beat;

    #[test]
    fn sample_rows_carry_global_and_local_index() {
        let window = SampleWindow::new(7500, vec![3, -4, 5]);
        let rows = sample_rows(&window);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].global_sample_index, 7501);
        assert_eq!(rows[1].sample_index_in_minute, 1);
        assert_eq!(rows[1].amplitude, -4.0);
    }

    #[test]
    fn beat_rows_skip_out_of_window_indices() {
        let window = SampleWindow::new(100, vec![0; 10]);
        let beats = BeatSet::from_beats(vec![
            Beat {
                sample_index: 2,
                amplitude: 9.5,
            },
            Beat {
                sample_index: 12,
                amplitude: 1.0,
            },
        ]);
        let rows = beat_rows(&window, &beats);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].global_sample_index, 102);
        assert_eq!(rows[0].amplitude, 9.5);
    }

    #[test]
    fn csv_has_header_and_one_line_per_row() {
        let window = SampleWindow::new(0, vec![10, 20]);
        let mut buf = Vec::new();
        write_rows_csv(&mut buf, &sample_rows(&window)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "global_sample_index,sample_index_in_minute,amplitude",
                "0,0,10.0",
                "1,1,20.0",
            ]
        );
    }

    #[test]
    fn empty_export_still_has_a_header() {
        let mut buf = Vec::new();
        write_rows_csv(&mut buf, &[]).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "global_sample_index,sample_index_in_minute,amplitude\n"
        );
    }
}
