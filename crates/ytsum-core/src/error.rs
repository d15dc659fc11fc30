use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VideoIdError {
    #[error("No video id found in {reference:?}")]
    Missing { reference: String },

    #[error("Invalid video id {value:?} in {reference:?}")]
    Invalid { reference: String, value: String },
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Invalid cache key {key:?}")]
    InvalidKey { key: String },

    #[error("Cache IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("No transcript available for {video_id}: {reason}")]
    Unavailable { video_id: String, reason: String },

    #[error("Transcript request failed with status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Transcript response could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),
}

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("Ollama API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Invalid Ollama response: {0}")]
    InvalidResponse(String),

    #[error("Ollama returned an empty summary")]
    Empty,

    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),
}

#[derive(Error, Debug)]
#[error("Request to {url} failed: {reason}")]
pub struct HttpError {
    pub url: String,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum YtsumError {
    #[error(transparent)]
    VideoId(#[from] VideoIdError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Transcript(#[from] TranscriptError),

    #[error(transparent)]
    Summary(#[from] SummaryError),
}

pub type Result<T> = std::result::Result<T, YtsumError>;
