use crate::types::Segment;

/// Join segment texts with single spaces, in order
pub fn join_segments(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|seg| seg.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
