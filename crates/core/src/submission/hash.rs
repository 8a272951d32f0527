//! Content hash extraction for torrent files and magnet links.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde_bencode::value::Value;
use sha1::{Digest, Sha1};

use super::SubmissionError;

/// Length of a hex-encoded SHA-1 info-hash.
pub const INFO_HASH_LEN: usize = 40;

static BTIH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"xt=urn:btih:(.+?)(?:&|$)").expect("valid regex"));

/// SHA-1 of the canonical bencoding of the torrent's `info` dictionary.
pub fn torrent_info_hash(data: &[u8]) -> Result<String, SubmissionError> {
    let decoded: Value = serde_bencode::from_bytes(data)
        .map_err(|e| SubmissionError::InvalidTorrent(e.to_string()))?;

    let info = match decoded {
        Value::Dict(mut root) => root
            .remove(b"info".as_slice())
            .ok_or_else(|| SubmissionError::InvalidTorrent("missing info dictionary".into()))?,
        _ => {
            return Err(SubmissionError::InvalidTorrent(
                "top level is not a dictionary".into(),
            ))
        }
    };

    let encoded = serde_bencode::to_bytes(&info)
        .map_err(|e| SubmissionError::InvalidTorrent(e.to_string()))?;

    Ok(format!("{:x}", Sha1::digest(&encoded)))
}

/// The `btih` value of a magnet URI, as written.
pub fn magnet_hash(magnet: &str) -> Result<String, SubmissionError> {
    BTIH_PATTERN
        .captures(magnet.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or(SubmissionError::MissingMagnetHash)
}
