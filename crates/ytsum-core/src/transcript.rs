use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::TranscriptError,
    http::HttpBackend,
    types::{Segment, Transcript},
    video_id::VideoId,
};

pub const DEFAULT_YOUTUBE_URL: &str = "https://www.youtube.com";

const CAPTION_TRACKS_MARKER: &str = "\"captionTracks\":";

/// Source of raw transcripts.
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    async fn fetch(&self, video_id: &VideoId) -> Result<Transcript, TranscriptError>;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    #[serde(default)]
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimedTextEvent {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    d_duration_ms: u64,
    #[serde(default)]
    segs: Vec<TimedTextSeg>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSeg {
    #[serde(default)]
    utf8: String,
}

/// Fetches captions the way the YouTube web player does: read the caption
/// tracks from the watch page, then download the chosen track as json3.
pub struct YoutubeTranscripts {
    backend: Arc<dyn HttpBackend>,
    base_url: String,
    languages: Vec<String>,
}

impl YoutubeTranscripts {
    pub fn new(backend: Arc<dyn HttpBackend>) -> Self {
        Self {
            backend,
            base_url: DEFAULT_YOUTUBE_URL.to_string(),
            languages: vec!["en".to_string()],
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Preferred caption languages, most preferred first.
    pub fn with_languages(mut self, languages: Vec<String>) -> Self {
        if !languages.is_empty() {
            self.languages = languages;
        }
        self
    }

    async fn get_body(&self, url: &str) -> Result<String, TranscriptError> {
        let response = self.backend.get(url).await?;
        if !response.is_success() {
            return Err(TranscriptError::Status {
                status: response.status,
                url: url.to_string(),
            });
        }
        Ok(response.body)
    }

    fn select_track<'a>(&self, tracks: &'a [CaptionTrack]) -> Option<&'a CaptionTrack> {
        for lang in &self.languages {
            let mut matching = tracks.iter().filter(|t| t.language_code == *lang);
            let manual = matching.clone().find(|t| !t.is_generated());
            if let Some(track) = manual.or_else(|| matching.next()) {
                return Some(track);
            }
        }
        tracks.first()
    }
}

/// Decode the JSON array that follows `"captionTracks":` in a watch page.
fn parse_caption_tracks(page: &str) -> Result<Vec<CaptionTrack>, serde_json::Error> {
    let Some(start) = page.find(CAPTION_TRACKS_MARKER) else {
        return Ok(Vec::new());
    };
    let rest = &page[start + CAPTION_TRACKS_MARKER.len()..];

    serde_json::Deserializer::from_str(rest)
        .into_iter::<Vec<CaptionTrack>>()
        .next()
        .unwrap_or_else(|| Ok(Vec::new()))
}

fn parse_timed_text(body: &str) -> Result<Vec<Segment>, serde_json::Error> {
    let timed_text: TimedText = serde_json::from_str(body)?;

    Ok(timed_text
        .events
        .into_iter()
        .filter_map(|event| {
            let text = event
                .segs
                .iter()
                .map(|seg| seg.utf8.as_str())
                .collect::<String>()
                .replace('\n', " ");
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            Some(Segment {
                start: event.t_start_ms as f64 / 1000.0,
                duration: event.d_duration_ms as f64 / 1000.0,
                text: text.to_string(),
            })
        })
        .collect())
}

#[async_trait]
impl TranscriptProvider for YoutubeTranscripts {
    async fn fetch(&self, video_id: &VideoId) -> Result<Transcript, TranscriptError> {
        let unavailable = |reason: &str| TranscriptError::Unavailable {
            video_id: video_id.to_string(),
            reason: reason.to_string(),
        };

        let watch_url = format!("{}/watch?v={}", self.base_url, video_id);
        let page = self.get_body(&watch_url).await?;

        let tracks = parse_caption_tracks(&page)?;
        let track = self
            .select_track(&tracks)
            .ok_or_else(|| unavailable("video has no caption tracks"))?;
        debug!(
            video_id = %video_id,
            language = %track.language_code,
            generated = track.is_generated(),
            "selected caption track"
        );

        let captions_url = format!("{}&fmt=json3", track.base_url);
        let body = self.get_body(&captions_url).await?;
        // YouTube answers 200 with no body when the track needs a PO token
        if body.trim().is_empty() {
            return Err(unavailable("caption track is empty"));
        }
        let segments = parse_timed_text(&body)?;
        if segments.is_empty() {
            return Err(unavailable("caption track is empty"));
        }

        Ok(Transcript {
            video_id: video_id.clone(),
            language: Some(track.language_code.clone()),
            segments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{FakeBackend, HttpResponse, RecordedRequest};

    fn watch_page(tracks: &str) -> String {
        format!(
            r#"<html><script>var ytInitialPlayerResponse = {{"captions":{{"playerCaptionsTracklistRenderer":{{"captionTracks":{tracks},"audioTracks":[]}}}}}};</script></html>"#
        )
    }

    const TIMED_TEXT: &str = r#"{
        "events": [
            {"tStartMs": 0, "dDurationMs": 1500, "segs": [{"utf8": "Hello"}, {"utf8": " world"}]},
            {"tStartMs": 1500, "dDurationMs": 200, "segs": [{"utf8": "\n"}]},
            {"tStartMs": 1700, "dDurationMs": 2300, "segs": [{"utf8": "second\nline"}]},
            {"tStartMs": 4000, "dDurationMs": 100}
        ]
    }"#;

    fn provider(backend: Arc<FakeBackend>) -> YoutubeTranscripts {
        YoutubeTranscripts::new(backend).with_base_url("http://yt.test/")
    }

    fn video() -> VideoId {
        VideoId::parse("ABC123").unwrap()
    }

    #[test]
    fn caption_tracks_are_read_from_watch_page() {
        let page = watch_page(
            r#"[{"baseUrl":"http://yt.test/api/timedtext?v=ABC123&lang=en","languageCode":"en","kind":"asr"}]"#,
        );
        let tracks = parse_caption_tracks(&page).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].base_url, "http://yt.test/api/timedtext?v=ABC123&lang=en");
        assert!(tracks[0].is_generated());
    }

    #[test]
    fn page_without_captions_has_no_tracks() {
        assert!(parse_caption_tracks("<html></html>").unwrap().is_empty());
    }

    #[test]
    fn timed_text_drops_blank_events_and_flattens_newlines() {
        let segments = parse_timed_text(TIMED_TEXT).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Hello world");
        assert_eq!(segments[0].duration, 1.5);
        assert_eq!(segments[1].text, "second line");
        assert_eq!(segments[1].start, 1.7);
    }

    #[test]
    fn manual_track_in_preferred_language_wins() {
        let page = watch_page(
            r#"[
                {"baseUrl":"http://yt.test/de","languageCode":"de"},
                {"baseUrl":"http://yt.test/en-asr","languageCode":"en","kind":"asr"},
                {"baseUrl":"http://yt.test/en","languageCode":"en"}
            ]"#,
        );
        let tracks = parse_caption_tracks(&page).unwrap();
        let yt = provider(Arc::new(FakeBackend::new()));
        assert_eq!(yt.select_track(&tracks).unwrap().base_url, "http://yt.test/en");

        let yt = yt.with_languages(vec!["fr".to_string()]);
        assert_eq!(yt.select_track(&tracks).unwrap().base_url, "http://yt.test/de");
    }

    #[tokio::test]
    async fn fetch_downloads_selected_track() {
        let backend = Arc::new(FakeBackend::new());
        backend
            .push_response(HttpResponse::ok(watch_page(
                r#"[{"baseUrl":"http://yt.test/api/timedtext?v=ABC123&lang=en","languageCode":"en"}]"#,
            )))
            .push_response(HttpResponse::ok(TIMED_TEXT));

        let transcript = provider(backend.clone()).fetch(&video()).await.unwrap();

        assert_eq!(transcript.text(), "Hello world second line");
        assert_eq!(transcript.language.as_deref(), Some("en"));
        assert_eq!(
            backend.requests(),
            vec![
                RecordedRequest::Get {
                    url: "http://yt.test/watch?v=ABC123".to_string()
                },
                RecordedRequest::Get {
                    url: "http://yt.test/api/timedtext?v=ABC123&lang=en&fmt=json3".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn video_without_captions_is_unavailable() {
        let backend = Arc::new(FakeBackend::new());
        backend.push_response(HttpResponse::ok("<html>no captions here</html>"));

        let err = provider(backend).fetch(&video()).await.unwrap_err();
        assert!(matches!(err, TranscriptError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn empty_track_is_unavailable() {
        let backend = Arc::new(FakeBackend::new());
        backend
            .push_response(HttpResponse::ok(watch_page(
                r#"[{"baseUrl":"http://yt.test/t?v=ABC123","languageCode":"en"}]"#,
            )))
            .push_response(HttpResponse::ok(r#"{"events":[]}"#));

        let err = provider(backend).fetch(&video()).await.unwrap_err();
        assert!(matches!(err, TranscriptError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn blank_caption_body_is_unavailable() {
        let backend = Arc::new(FakeBackend::new());
        backend
            .push_response(HttpResponse::ok(watch_page(
                r#"[{"baseUrl":"http://yt.test/t?v=ABC123","languageCode":"en"}]"#,
            )))
            .push_response(HttpResponse::ok(" \n"));

        let err = provider(backend).fetch(&video()).await.unwrap_err();
        assert!(matches!(
            err,
            TranscriptError::Unavailable { ref reason, .. } if reason == "caption track is empty"
        ));
    }

    #[tokio::test]
    async fn error_status_is_surfaced() {
        let backend = Arc::new(FakeBackend::new());
        backend.push_response(HttpResponse {
            status: 404,
            body: String::new(),
        });

        let err = provider(backend).fetch(&video()).await.unwrap_err();
        assert!(matches!(err, TranscriptError::Status { status: 404, .. }));
    }
}
