use std::fmt;

use url::{Url, form_urlencoded};

use crate::error::VideoIdError;

/// Path prefixes that carry the id as the next path segment.
const PATH_ID_PREFIXES: [&str; 3] = ["shorts", "embed", "live"];

/// A validated YouTube video id, safe to use as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    pub fn parse(value: &str) -> Option<Self> {
        is_id_token(value).then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_id_token(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Extract the video id from a link, a bare query string or a bare id.
///
/// The `v` query parameter is looked up by name, so `?feature=share&v=ID`
/// works regardless of parameter order. Short links (`youtu.be/ID`) and the
/// `/shorts/`, `/embed/` and `/live/` forms are read from the path.
pub fn extract_video_id(reference: &str) -> Result<VideoId, VideoIdError> {
    let reference = reference.trim();

    if let Some(id) = VideoId::parse(reference) {
        return Ok(id);
    }

    let value = query_param(reference, "v").or_else(|| path_id(reference));

    match value {
        Some(value) => VideoId::parse(&value).ok_or_else(|| VideoIdError::Invalid {
            reference: reference.to_string(),
            value,
        }),
        None => Err(VideoIdError::Missing {
            reference: reference.to_string(),
        }),
    }
}

fn query_param(reference: &str, name: &str) -> Option<String> {
    let query = match reference.split_once('?') {
        Some((_, query)) => query,
        None => reference,
    };
    let query = query.split('#').next().unwrap_or_default();

    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn path_id(reference: &str) -> Option<String> {
    let url = Url::parse(reference)
        .or_else(|_| Url::parse(&format!("https://{reference}")))
        .ok()?;
    let host = url.host_str()?.trim_start_matches("www.");
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    match host {
        "youtu.be" => segments.next().map(str::to_string),
        "youtube.com" | "m.youtube.com" | "music.youtube.com" => {
            let prefix = segments.next()?;
            if PATH_ID_PREFIXES.contains(&prefix) {
                segments.next().map(str::to_string)
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(reference: &str) -> String {
        extract_video_id(reference).unwrap().to_string()
    }

    #[test]
    fn reads_v_from_watch_links() {
        assert_eq!(id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), "dQw4w9WgXcQ");
        assert_eq!(id("https://www.youtube.com/watch?v=ABC123&t=10"), "ABC123");
        assert_eq!(id("youtube.com/watch?v=ABC123#comments"), "ABC123");
    }

    #[test]
    fn reads_v_from_bare_query_string() {
        assert_eq!(id("v=ABC123&t=10"), "ABC123");
    }

    #[test]
    fn reads_v_by_name_not_position() {
        let link = "https://www.youtube.com/watch?feature=share&v=ABC123";
        assert_eq!(id(link), "ABC123");

        // Splitting on the first '=' and then '&' would have returned "share".
        let positional = link.split('=').nth(1).and_then(|s| s.split('&').next());
        assert_eq!(positional, Some("share"));
    }

    #[test]
    fn reads_id_from_path_forms() {
        assert_eq!(id("https://youtu.be/ABC123?si=xyz"), "ABC123");
        assert_eq!(id("https://www.youtube.com/shorts/ABC123"), "ABC123");
        assert_eq!(id("https://www.youtube.com/embed/ABC123"), "ABC123");
        assert_eq!(id("https://www.youtube.com/live/ABC123?feature=share"), "ABC123");
    }

    #[test]
    fn accepts_bare_id() {
        assert_eq!(id("  dQw4w9WgXcQ  "), "dQw4w9WgXcQ");
    }

    #[test]
    fn missing_parameter_is_reported() {
        let err = extract_video_id("https://www.youtube.com/feed/trending").unwrap_err();
        assert!(matches!(err, VideoIdError::Missing { .. }));

        let err = extract_video_id("https://example.com/watch?t=10").unwrap_err();
        assert!(matches!(err, VideoIdError::Missing { .. }));
    }

    #[test]
    fn path_unsafe_value_is_rejected() {
        let err = extract_video_id("https://www.youtube.com/watch?v=../../etc/passwd").unwrap_err();
        assert!(matches!(err, VideoIdError::Invalid { ref value, .. } if value == "../../etc/passwd"));

        let err = extract_video_id("https://www.youtube.com/watch?v=&t=10").unwrap_err();
        assert!(matches!(err, VideoIdError::Invalid { .. }));
    }
}
