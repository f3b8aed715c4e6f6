//! Caption lookup by playback time

use crate::captions::CaptionPayload;
use crate::utils::error::{PlayerError, Result};
use std::ops::Range;

/// Immutable index over a transcript's cue start times.
///
/// Times are integer milliseconds as authored at 1.0x speed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptionIndex {
    /// Cue start times, non-decreasing
    start: Vec<i64>,

    /// Cue end times; empty when the transcript carried none
    end: Vec<i64>,

    /// Cue texts, parallel to `start`
    texts: Vec<String>,
}

impl CaptionIndex {
    /// Build an index from start times and texts.
    ///
    /// Fails when the arrays differ in length or the start times go
    /// backwards.
    pub fn new(start: Vec<i64>, texts: Vec<String>) -> Result<Self> {
        Self::build(start, Vec::new(), texts)
    }

    /// Build an index from a transcript payload
    pub fn from_payload(payload: CaptionPayload) -> Result<Self> {
        Self::build(payload.start, payload.end, payload.text)
    }

    fn build(start: Vec<i64>, end: Vec<i64>, texts: Vec<String>) -> Result<Self> {
        if start.len() != texts.len() {
            return Err(PlayerError::InvalidInput(format!(
                "Transcript has {} start times but {} texts",
                start.len(),
                texts.len()
            )));
        }

        if !end.is_empty() && end.len() != start.len() {
            return Err(PlayerError::InvalidInput(format!(
                "Transcript has {} start times but {} end times",
                start.len(),
                end.len()
            )));
        }

        if start.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(PlayerError::InvalidInput(
                "Transcript start times are not in order".to_string(),
            ));
        }

        Ok(Self { start, end, texts })
    }

    pub fn len(&self) -> usize {
        self.start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_empty()
    }

    pub fn start_time(&self, index: usize) -> Option<i64> {
        self.start.get(index).copied()
    }

    pub fn end_time(&self, index: usize) -> Option<i64> {
        self.end.get(index).copied()
    }

    pub fn text(&self, index: usize) -> Option<&str> {
        self.texts.get(index).map(String::as_str)
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn start_times(&self) -> &[i64] {
        &self.start
    }

    /// Index of the cue active at `time_ms`.
    ///
    /// Returns the last cue starting at or before `time_ms`. Times before
    /// the first cue resolve to the first cue; `None` only for an empty
    /// transcript.
    pub fn search(&self, time_ms: i64) -> Option<usize> {
        if self.start.is_empty() {
            return None;
        }

        let after = self.start.partition_point(|&s| s <= time_ms);
        Some(after.saturating_sub(1))
    }

    /// Like [`search`](Self::search), restricted to cues starting inside
    /// `[start_ms, end_ms]`. The result is relative to that subrange, so it
    /// lines up with the list returned by [`bounded`](Self::bounded).
    pub fn search_within(&self, time_ms: i64, start_ms: i64, end_ms: Option<i64>) -> Option<usize> {
        let range = self.bounded_range(start_ms, end_ms);
        if range.is_empty() {
            return None;
        }

        let slice = &self.start[range];
        let after = slice.partition_point(|&s| s <= time_ms);
        Some(after.saturating_sub(1))
    }

    /// The cues starting inside `[start_ms, end_ms]` as a new index.
    /// An open `end_ms` keeps everything from `start_ms` on.
    pub fn bounded(&self, start_ms: i64, end_ms: Option<i64>) -> CaptionIndex {
        let range = self.bounded_range(start_ms, end_ms);

        CaptionIndex {
            start: self.start[range.clone()].to_vec(),
            end: if self.end.is_empty() {
                Vec::new()
            } else {
                self.end[range.clone()].to_vec()
            },
            texts: self.texts[range].to_vec(),
        }
    }

    fn bounded_range(&self, start_ms: i64, end_ms: Option<i64>) -> Range<usize> {
        let lo = self.start.partition_point(|&s| s < start_ms);
        let hi = match end_ms {
            Some(end) => self.start.partition_point(|&s| s <= end),
            None => self.start.len(),
        };

        lo..hi.max(lo)
    }
}
