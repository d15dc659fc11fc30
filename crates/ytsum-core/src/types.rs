use crate::{format::join_segments, video_id::VideoId};

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub start: f64,
    pub duration: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub video_id: VideoId,
    pub language: Option<String>,
    pub segments: Vec<Segment>,
}

impl Transcript {
    /// Plain transcript text, segments joined by a single space.
    pub fn text(&self) -> String {
        join_segments(&self.segments)
    }

    pub fn duration_seconds(&self) -> f64 {
        self.segments
            .last()
            .map(|s| s.start + s.duration)
            .unwrap_or(0.0)
    }
}

/// A value produced by a pipeline stage, and whether it came from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub cached: bool,
}

impl<T> Resolved<T> {
    pub fn cached(value: T) -> Self {
        Self {
            value,
            cached: true,
        }
    }

    pub fn fresh(value: T) -> Self {
        Self {
            value,
            cached: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOutcome {
    pub video_id: VideoId,
    pub summary: String,
    pub transcript_cached: bool,
    pub summary_cached: bool,
}
