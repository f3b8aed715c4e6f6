//! Transcript data
//!
//! A transcript arrives from the host as parallel arrays of cue start times,
//! end times and texts. [`CaptionIndex`] turns that into a searchable index.

mod index;

pub use index::CaptionIndex;

use serde::{Deserialize, Serialize};

/// Transcript body as served by the host, times in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptionPayload {
    /// Cue start times
    pub start: Vec<i64>,

    /// Cue end times
    #[serde(default)]
    pub end: Vec<i64>,

    /// Cue texts
    pub text: Vec<String>,
}

impl CaptionPayload {
    pub fn is_empty(&self) -> bool {
        self.start.is_empty()
    }
}
