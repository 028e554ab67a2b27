//! Source URL validation and canonicalisation

use url::Url;

use crate::errors::{EngineError, EngineResult};

const YOUTUBE_HOSTS: &[&str] = &["youtube.com", "www.youtube.com", "m.youtube.com"];
const YOUTUBE_SHORT_HOST: &str = "youtu.be";
const VIDEO_ID_LEN: usize = 11;

/// Validate a source URL and canonicalise known video links
///
/// Only absolute http(s) URLs are accepted. YouTube watch, shorts and
/// `youtu.be` links are reduced to `https://www.youtube.com/watch?v=<id>`,
/// dropping playlist and timestamp parameters; everything else is returned
/// as parsed.
pub fn normalize_source_url(raw: &str) -> EngineResult<String> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).map_err(|e| EngineError::InvalidUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(EngineError::InvalidUrl {
            url: trimmed.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    Ok(youtube_video_id(&parsed)
        .map(|id| format!("https://www.youtube.com/watch?v={}", id))
        .unwrap_or_else(|| parsed.to_string()))
}

fn youtube_video_id(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();

    let candidate = if host == YOUTUBE_SHORT_HOST {
        url.path_segments()?.next().map(str::to_string)
    } else if YOUTUBE_HOSTS.contains(&host.as_str()) {
        let mut segments = url.path_segments()?;
        match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some("shorts") => segments.next().map(str::to_string),
            _ => None,
        }
    } else {
        None
    };

    candidate.filter(|id| is_video_id(id))
}

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == VIDEO_ID_LEN
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
