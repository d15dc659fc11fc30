//! Ytsum Core Library
//!
//! Fetches YouTube transcripts, summarizes them with a local Ollama model and
//! caches both on disk.

pub mod cache;
pub mod error;
pub mod format;
pub mod http;
pub mod pipeline;
pub mod summarizer;
pub mod transcript;
pub mod types;
pub mod video_id;

// Re-export commonly used items at crate root
pub use cache::{CacheStore, FsCache, MemoryCache, Purpose, cache_key, default_cache_dir};
pub use error::{
    CacheError, HttpError, Result, SummaryError, TranscriptError, VideoIdError, YtsumError,
};
pub use format::join_segments;
pub use http::{FakeBackend, HttpBackend, HttpResponse, ReqwestBackend};
pub use pipeline::Pipeline;
pub use summarizer::{OllamaConfig, OllamaSummarizer, Summarizer, build_summary_prompt};
pub use transcript::{TranscriptProvider, YoutubeTranscripts};
pub use types::{Resolved, Segment, SummaryOutcome, Transcript};
pub use video_id::{VideoId, extract_video_id};
