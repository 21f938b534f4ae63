//! Chunked magic scanning over a read-only byte view.
//!
//! Capture files routinely run to gigabytes, so the scanner walks the view
//! in chunks and reports progress after each one. Chunking is purely a
//! reporting knob: adjacent chunks overlap by `pattern.len() - 1` bytes, so
//! a match straddling a chunk edge is found exactly where a single-pass
//! search would find it, for every chunk size.

use std::fmt;

/// Default chunk span per scan step.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024 * 1024;

/// Progress callback, invoked synchronously on the scanning thread with a
/// percentage and a short human-readable message. It must not block.
pub type ProgressFn<'a> = dyn FnMut(f64, &str) + 'a;

/// Chunked pattern scanner with optional progress reporting.
pub struct Scanner<'a> {
    chunk_size: usize,
    origin: Option<(usize, usize)>,
    high_water: f64,
    progress: Option<Box<ProgressFn<'a>>>,
}

impl fmt::Debug for Scanner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scanner")
            .field("chunk_size", &self.chunk_size)
            .field("origin", &self.origin)
            .field("has_progress", &self.progress.is_some())
            .finish()
    }
}

impl Default for Scanner<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Scanner<'a> {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            origin: None,
            high_water: 0.0,
            progress: None,
        }
    }

    /// Sets the chunk span. Values below one byte are raised to one.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_progress(mut self, callback: impl FnMut(f64, &str) + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Fixes the span percentages are computed against for a whole pass.
    ///
    /// Without an origin each `find` call reports relative to its own span,
    /// which restarts percentages on every call; a decoding pass sets the
    /// origin once so one scan's percentages never decrease.
    pub(crate) fn set_origin(&mut self, start: usize, end: usize) {
        self.origin = Some((start, end));
        self.high_water = 0.0;
    }

    pub(crate) fn percent_at(&self, at: usize) -> f64 {
        match self.origin {
            Some((start, end)) if end > start => {
                (at.saturating_sub(start) as f64 / (end - start) as f64) * 100.0
            }
            _ => 0.0,
        }
    }

    /// Reports progress, clamped into `[high water, 100]`.
    pub(crate) fn emit(&mut self, percent: f64, message: &str) {
        if let Some(callback) = self.progress.as_mut() {
            let percent = percent.clamp(0.0, 100.0).max(self.high_water);
            self.high_water = percent;
            callback(percent, message);
        }
    }

    /// Finds the first occurrence of `pattern` in `data[start..end)`.
    ///
    /// Returns the match offset into `data`, or `None` when the span is
    /// exhausted. The result is identical for every chunk size.
    pub fn find(
        &mut self,
        data: &[u8],
        pattern: &[u8; 4],
        start: usize,
        end: usize,
    ) -> Option<usize> {
        let end = end.min(data.len());
        let start = start.min(end);
        if end - start < pattern.len() {
            return None;
        }

        if end - start <= self.chunk_size {
            return find_in(&data[start..end], pattern).map(|i| start + i);
        }

        let (span_start, span_end) = self.origin.unwrap_or((start, end));
        let mut cursor = start;
        while cursor < end {
            let chunk_end = (cursor + self.chunk_size).min(end);
            // Overlap keeps a boundary-straddling match visible.
            let window_end = (chunk_end + pattern.len() - 1).min(end);
            let hit = find_in(&data[cursor..window_end], pattern).map(|i| cursor + i);

            let span = (span_end - span_start).max(1);
            let done = chunk_end.saturating_sub(span_start);
            self.emit(
                (done as f64 / span as f64) * 100.0,
                &format!("scanning {} / {} MB", done >> 20, span >> 20),
            );

            if hit.is_some() {
                return hit;
            }
            cursor = chunk_end;
        }

        None
    }
}

fn find_in(haystack: &[u8], pattern: &[u8; 4]) -> Option<usize> {
    haystack
        .windows(pattern.len())
        .position(|window| window == pattern)
}

#[cfg(test)]
const PATTERN: [u8; 4] = [0x86, 0xDA, 0xE9, 0xB7];

#[test]
fn finds_first_match() {
    let mut data = vec![0u8; 100];
    data[40..44].copy_from_slice(&PATTERN);
    data[80..84].copy_from_slice(&PATTERN);

    let mut scanner = Scanner::new();
    assert_eq!(scanner.find(&data, &PATTERN, 0, data.len()), Some(40));
    assert_eq!(scanner.find(&data, &PATTERN, 41, data.len()), Some(80));
    assert_eq!(scanner.find(&data, &PATTERN, 81, data.len()), None);
}

#[test]
fn chunk_size_does_not_change_the_result() {
    let mut data = vec![0u8; 4096];
    data[1022..1026].copy_from_slice(&PATTERN); // straddles the 1024 boundary

    for chunk_size in [1, 3, 4, 7, 64, 1000, 1024, 1025, 4096, 1 << 20] {
        let mut scanner = Scanner::new().with_chunk_size(chunk_size);
        assert_eq!(
            scanner.find(&data, &PATTERN, 0, data.len()),
            Some(1022),
            "chunk_size {chunk_size}"
        );
    }
}

#[test]
fn boundary_straddling_match_at_every_alignment() {
    let chunk_size = 16;
    for at in 0..64usize {
        let mut data = vec![0u8; 96];
        data[at..at + 4].copy_from_slice(&PATTERN);
        let mut scanner = Scanner::new().with_chunk_size(chunk_size);
        assert_eq!(scanner.find(&data, &PATTERN, 0, data.len()), Some(at));
    }
}

#[test]
fn empty_and_short_spans() {
    let mut scanner = Scanner::new();
    assert_eq!(scanner.find(&[], &PATTERN, 0, 0), None);
    assert_eq!(scanner.find(&PATTERN[..3].to_vec(), &PATTERN, 0, 3), None);
    // start/end beyond the buffer clamp instead of panicking
    assert_eq!(scanner.find(&[0u8; 8], &PATTERN, 100, 200), None);
}

#[test]
fn chunked_progress_is_monotone_and_reaches_the_hit() {
    let mut data = vec![0u8; 1000];
    data[700..704].copy_from_slice(&PATTERN);

    let mut seen: Vec<f64> = Vec::new();
    {
        let mut scanner = Scanner::new()
            .with_chunk_size(64)
            .with_progress(|pct, _msg| seen.push(pct));
        assert_eq!(scanner.find(&data, &PATTERN, 0, data.len()), Some(700));
    }

    assert!(!seen.is_empty());
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert!(seen.iter().all(|p| (0.0..=100.0).contains(p)));
}
