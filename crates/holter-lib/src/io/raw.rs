//! Random-access decoding of raw little-endian `i16` sample streams.
//!
//! A stream is an optional opaque header followed by 2-byte samples at a fixed
//! rate. Windows are read with a seek plus bounded sequential reads, so paging
//! through a long recording never decodes the whole file.

use crate::config::StreamConfig;
use crate::error::EcgError;
use crate::signal::SampleWindow;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

pub const BYTES_PER_SAMPLE: u64 = 2;
pub const SECONDS_PER_MINUTE: usize = 60;

/// Upper bound for a single read call.
const READ_CHUNK_BYTES: usize = 8192;

/// Pre-allocation ceiling so an open-ended request does not reserve the world.
const MAX_PREALLOC_SAMPLES: usize = 1 << 20;

/// A raw recording on disk. Holds only layout metadata; every read reopens the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleStream {
    path: PathBuf,
    fs: u32,
    header_bytes: u64,
    byte_length: u64,
}

/// Summary of a stream's extent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingInfo {
    pub fs: u32,
    pub header_bytes: u64,
    pub byte_length: u64,
    pub total_samples: usize,
    pub total_minutes: usize,
    pub duration_s: u64,
    pub duration_hm: String,
    pub truncated_tail: bool,
}

impl SampleStream {
    pub fn open(path: &Path, cfg: &StreamConfig) -> Result<Self, EcgError> {
        let unreadable = |source: io::Error| EcgError::StorageUnreadable {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(unreadable)?;
        let meta = file.metadata().map_err(unreadable)?;
        if !meta.is_file() {
            return Err(unreadable(io::Error::new(
                ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }
        let stream = Self::with_len(path, meta.len(), cfg);
        if stream.has_truncated_tail() {
            debug!(
                "{}: dropping odd trailing byte after {} samples",
                path.display(),
                stream.total_samples()
            );
        }
        Ok(stream)
    }

    /// Describe a stream of known length without touching storage.
    pub fn with_len(path: &Path, byte_length: u64, cfg: &StreamConfig) -> Self {
        Self {
            path: path.to_path_buf(),
            fs: cfg.fs,
            header_bytes: cfg.header_bytes,
            byte_length,
        }
    }

    pub fn fs(&self) -> u32 {
        self.fs
    }

    pub fn byte_length(&self) -> u64 {
        self.byte_length
    }

    fn data_bytes(&self) -> u64 {
        self.byte_length.saturating_sub(self.header_bytes)
    }

    pub fn total_samples(&self) -> usize {
        (self.data_bytes() / BYTES_PER_SAMPLE) as usize
    }

    pub fn has_truncated_tail(&self) -> bool {
        self.data_bytes() % BYTES_PER_SAMPLE != 0
    }

    pub fn samples_per_minute(&self) -> usize {
        SECONDS_PER_MINUTE * self.fs as usize
    }

    /// Number of minute pages; an empty stream still has one (empty) page.
    pub fn total_minutes(&self) -> usize {
        let per_minute = self.samples_per_minute().max(1);
        self.total_samples().div_ceil(per_minute).max(1)
    }

    /// Clamp a 1-based minute request into `[1, total_minutes]`.
    pub fn clamp_minute(&self, requested: usize) -> usize {
        requested.clamp(1, self.total_minutes())
    }

    /// Sample range `(start_sample, length)` of 1-based minute `m`.
    pub fn minute_bounds(&self, minute: usize) -> (usize, usize) {
        let per_minute = self.samples_per_minute();
        (minute.saturating_sub(1) * per_minute, per_minute)
    }

    pub fn read_window(&self, start_sample: usize, length: usize) -> Result<SampleWindow, EcgError> {
        let mut file = File::open(&self.path).map_err(|source| EcgError::StorageUnreadable {
            path: self.path.clone(),
            source,
        })?;
        let window = decode_window(&mut file, self.header_bytes, start_sample, length)?;
        if window.len() < length && !window.is_empty() {
            debug!(
                "{}: short window at sample {} ({} of {} samples)",
                self.path.display(),
                start_sample,
                window.len(),
                length
            );
        }
        Ok(window)
    }

    pub fn read_minute(&self, minute: usize) -> Result<SampleWindow, EcgError> {
        let (start, length) = self.minute_bounds(minute);
        self.read_window(start, length)
    }

    /// Decode everything after the header.
    pub fn read_all(&self) -> Result<SampleWindow, EcgError> {
        self.read_window(0, self.total_samples())
    }

    pub fn info(&self) -> RecordingInfo {
        let total_samples = self.total_samples();
        let duration_s = (total_samples / self.fs.max(1) as usize) as u64;
        RecordingInfo {
            fs: self.fs,
            header_bytes: self.header_bytes,
            byte_length: self.byte_length,
            total_samples,
            total_minutes: self.total_minutes(),
            duration_s,
            duration_hm: format_hm(duration_s),
            truncated_tail: self.has_truncated_tail(),
        }
    }
}

/// `HH:MM` rendering of a duration, hours unbounded.
pub fn format_hm(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60)
}

/// Decode up to `length` samples starting at `start_sample` from any seekable source.
///
/// Stops early, without error, when the source runs out; a lone trailing byte is
/// dropped. Only a failing seek or read call produces an error.
pub fn decode_window<R: Read + Seek>(
    reader: &mut R,
    header_bytes: u64,
    start_sample: usize,
    length: usize,
) -> Result<SampleWindow, EcgError> {
    let offset = header_bytes.saturating_add((start_sample as u64).saturating_mul(BYTES_PER_SAMPLE));
    reader
        .seek(SeekFrom::Start(offset))
        .map_err(|source| EcgError::Read { offset, source })?;

    let mut samples = Vec::with_capacity(length.min(MAX_PREALLOC_SAMPLES));
    let mut chunk = [0u8; READ_CHUNK_BYTES];
    let mut pending: Option<u8> = None;
    let mut position = offset;

    while samples.len() < length {
        let remaining = (length - samples.len())
            .saturating_mul(BYTES_PER_SAMPLE as usize)
            .saturating_sub(usize::from(pending.is_some()));
        let want = remaining.min(READ_CHUNK_BYTES);
        let n = match reader.read(&mut chunk[..want]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(EcgError::Read {
                    offset: position,
                    source,
                })
            }
        };
        position += n as u64;

        let mut bytes = &chunk[..n];
        if let Some(lo) = pending.take() {
            samples.push(i16::from_le_bytes([lo, bytes[0]]));
            bytes = &bytes[1..];
        }
        let mut pairs = bytes.chunks_exact(2);
        samples.extend(pairs.by_ref().map(|p| i16::from_le_bytes([p[0], p[1]])));
        if let [odd] = pairs.remainder() {
            pending = Some(*odd);
        }
    }

    Ok(SampleWindow::new(start_sample, samples))
}

/// Little-endian encoding of samples, the inverse of [`decode_window`].
pub fn encode_samples(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
