use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    cache::{CacheStore, Purpose, cache_key},
    error::Result,
    summarizer::Summarizer,
    transcript::TranscriptProvider,
    types::{Resolved, SummaryOutcome},
    video_id::{VideoId, extract_video_id},
};

/// Sequences id extraction, transcript resolution and summary resolution,
/// filling the cache after each successful fetch or generation.
pub struct Pipeline {
    cache: Arc<dyn CacheStore>,
    transcripts: Arc<dyn TranscriptProvider>,
    summarizer: Arc<dyn Summarizer>,
}

impl Pipeline {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        transcripts: Arc<dyn TranscriptProvider>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            cache,
            transcripts,
            summarizer,
        }
    }

    /// Cached transcript text, or fetch and cache it.
    pub async fn resolve_transcript(&self, video_id: &VideoId) -> Result<Resolved<String>> {
        let key = cache_key(video_id, Purpose::Transcript);

        if let Some(text) = self.cache.read(&key).await? {
            debug!(%video_id, "transcript cache hit");
            return Ok(Resolved::cached(text));
        }

        info!(%video_id, "fetching transcript");
        let transcript = self.transcripts.fetch(video_id).await?;
        info!(
            %video_id,
            language = transcript.language.as_deref().unwrap_or("unknown"),
            duration_seconds = transcript.duration_seconds(),
            segments = transcript.segments.len(),
            "fetched transcript"
        );
        let text = transcript.text();
        self.cache.write(&key, &text).await?;

        Ok(Resolved::fresh(text))
    }

    /// Cached summary, or generate and cache it. `force` drops the cached
    /// summary first; the transcript entry is never touched here.
    pub async fn resolve_summary(
        &self,
        video_id: &VideoId,
        transcript: &str,
        force: bool,
    ) -> Result<Resolved<String>> {
        let key = cache_key(video_id, Purpose::Summary);

        if force && self.cache.delete(&key).await? {
            debug!(%video_id, "dropped cached summary");
        }

        if let Some(summary) = self.cache.read(&key).await? {
            debug!(%video_id, "summary cache hit");
            return Ok(Resolved::cached(summary));
        }

        info!(%video_id, "generating summary");
        let summary = self.summarizer.summarize(transcript).await?;
        self.cache.write(&key, &summary).await?;

        Ok(Resolved::fresh(summary))
    }

    pub async fn run(&self, reference: &str, force: bool) -> Result<SummaryOutcome> {
        let video_id = extract_video_id(reference)?;
        let transcript = self.resolve_transcript(&video_id).await?;
        let summary = self
            .resolve_summary(&video_id, &transcript.value, force)
            .await?;

        Ok(SummaryOutcome {
            video_id,
            summary: summary.value,
            transcript_cached: transcript.cached,
            summary_cached: summary.cached,
        })
    }
}
