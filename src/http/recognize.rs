//! Classification of client messages into the recognized request shapes.
//!
//! # Responsibilities
//! - Match the request line and headers against the four known shapes
//! - Extract the fields each shape carries
//! - Return explicit `Passthrough` rather than a silent default
//!
//! # Design Decisions
//! - All matching is case-insensitive
//! - A recognized shape missing a required header is an error scoped to the
//!   offending connection, never a process fault

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static FRAGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)POST\s*/on-fragment-received").unwrap());
static MANIFEST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)GET\s*(.*)/vid\.mpd").unwrap());
static SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)GET\s*(.*)/video/vid-\d+-seg-(\d+)\.m4s").unwrap());

static UUID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)x-489-uuid:\s([^\r\n]+)\r\n").unwrap());
static FRAGMENT_SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)x-fragment-size:\s*(\d+)\r\n").unwrap());
static TIMESTAMP_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)x-timestamp-start:\s*(\d+)\r\n").unwrap());
static TIMESTAMP_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)x-timestamp-end:\s*(\d+)\r\n").unwrap());

/// Error type for recognized-but-malformed requests.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecognizeError {
    #[error("recognized request is missing required header {0}")]
    MissingHeader(&'static str),

    #[error("header {0} does not hold a usable unsigned integer")]
    InvalidField(&'static str),

    #[error("fragment timestamps are not increasing")]
    InvalidTimestamps,
}

/// A fragment download report from the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentReport {
    pub uuid: String,
    pub fragment_size: u64,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// A manifest request for a video path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRequest {
    pub path: String,
    pub uuid: String,
}

/// A segment request; the bitrate in the request line is replaced on the
/// way out, the segment number is forwarded verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRequest {
    pub path: String,
    pub uuid: String,
    pub segment: String,
}

/// One classified client message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    FragmentReport(FragmentReport),
    Manifest(ManifestRequest),
    Segment(SegmentRequest),
    Passthrough,
}

fn required_header(text: &str, re: &Regex, name: &'static str) -> Result<String, RecognizeError> {
    re.captures(text)
        .map(|caps| caps[1].to_string())
        .ok_or(RecognizeError::MissingHeader(name))
}

fn required_number(text: &str, re: &Regex, name: &'static str) -> Result<u64, RecognizeError> {
    let caps = re.captures(text).ok_or(RecognizeError::MissingHeader(name))?;
    caps[1].parse().map_err(|_| RecognizeError::InvalidField(name))
}

/// Classify one fully-read message by its header block.
pub fn classify(text: &str) -> Result<ClientRequest, RecognizeError> {
    if FRAGMENT_RE.is_match(text) {
        let report = FragmentReport {
            uuid: required_header(text, &UUID_RE, "x-489-uuid")?,
            fragment_size: required_number(text, &FRAGMENT_SIZE_RE, "x-fragment-size")?,
            start_ms: required_number(text, &TIMESTAMP_START_RE, "x-timestamp-start")?,
            end_ms: required_number(text, &TIMESTAMP_END_RE, "x-timestamp-end")?,
        };
        if report.end_ms <= report.start_ms {
            return Err(RecognizeError::InvalidTimestamps);
        }
        return Ok(ClientRequest::FragmentReport(report));
    }

    if let Some(caps) = MANIFEST_RE.captures(text) {
        return Ok(ClientRequest::Manifest(ManifestRequest {
            path: caps[1].to_string(),
            uuid: required_header(text, &UUID_RE, "x-489-uuid")?,
        }));
    }

    if let Some(caps) = SEGMENT_RE.captures(text) {
        return Ok(ClientRequest::Segment(SegmentRequest {
            path: caps[1].to_string(),
            segment: caps[2].to_string(),
            uuid: required_header(text, &UUID_RE, "x-489-uuid")?,
        }));
    }

    Ok(ClientRequest::Passthrough)
}
