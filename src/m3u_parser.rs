//! M3U playlist parser with HTTP(S) download support

use std::io::Read;
use std::time::Duration;

use flate2::read::GzDecoder;

use crate::error::{CheckerError, Result};
use crate::models::{ChannelEntry, NO_GROUP};

const EXTINF_TAG: &str = "#EXTINF:";

/// Upper bound on a downloaded playlist body
const MAX_PLAYLIST_BYTES: u64 = 64 * 1024 * 1024;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Source of raw playlist text
pub trait PlaylistFetcher {
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Fetches playlists over HTTP and HTTPS, one attempt per call
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    user_agent: String,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            timeout,
        }
    }
}

impl PlaylistFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .build()
            .new_agent();

        let mut response = agent
            .get(url)
            .header("User-Agent", self.user_agent.as_str())
            .call()
            .map_err(|e| CheckerError::Network(format!("Request failed: {}", e)))?;

        if response.status() != 200 {
            return Err(CheckerError::Network(format!("HTTP error: {}", response.status())));
        }

        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_PLAYLIST_BYTES)
            .read_to_vec()
            .map_err(|e| CheckerError::Network(format!("Read failed: {}", e)))?;

        decode_body(&body)
    }
}

/// Turn a downloaded body into text, inflating it first when gzip-compressed
pub fn decode_body(body: &[u8]) -> Result<String> {
    if body.starts_with(&GZIP_MAGIC) {
        let mut text = String::new();
        GzDecoder::new(body)
            .read_to_string(&mut text)
            .map_err(|e| CheckerError::Network(format!("Decompress failed: {}", e)))?;
        return Ok(text);
    }
    Ok(String::from_utf8_lossy(body).into_owned())
}

/// Download and parse an M3U playlist
pub fn download_and_parse(fetcher: &dyn PlaylistFetcher, url: &str) -> Result<Vec<ChannelEntry>> {
    tracing::info!("Loading M3U from: {}", url);
    let content = fetcher.fetch(url)?;
    let channels = parse_m3u(&content);
    tracing::info!("Parsed {} channels", channels.len());
    Ok(channels)
}

/// Pending tag-line data waiting for its URL line
#[derive(Debug)]
struct PendingEntry {
    name: String,
    group: String,
    logo: String,
}

/// Parse M3U content and extract channels.
///
/// Only `#EXTINF:` lines followed by a URL line produce entries. A later tag
/// line replaces a pending one; URL lines with nothing pending are dropped.
pub fn parse_m3u(content: &str) -> Vec<ChannelEntry> {
    let mut channels = Vec::new();
    let mut pending: Option<PendingEntry> = None;

    for line in content.lines() {
        let line = line.trim();

        if line.starts_with(EXTINF_TAG) {
            pending = Some(parse_extinf(line));
        } else if !line.is_empty() && !line.starts_with('#') {
            if let Some(entry) = pending.take() {
                channels.push(ChannelEntry {
                    name: entry.name,
                    group: entry.group,
                    logo: entry.logo,
                    url: line.to_string(),
                });
            }
        }
    }

    channels
}

fn parse_extinf(line: &str) -> PendingEntry {
    let info = &line[EXTINF_TAG.len()..];

    // Channel name is everything after the last comma
    let name = info
        .rfind(',')
        .map(|pos| info[pos + 1..].trim().to_string())
        .unwrap_or_default();

    PendingEntry {
        name,
        group: extract_attr(line, "group-title").unwrap_or_else(|| NO_GROUP.to_string()),
        logo: extract_attr(line, "tvg-logo").unwrap_or_default(),
    }
}

/// Extract a quoted `name="value"` attribute from a tag line
fn extract_attr(line: &str, attr_name: &str) -> Option<String> {
    let search = format!("{}=\"", attr_name);
    // ASCII lowercasing keeps byte offsets aligned with `line`
    let start = line.to_ascii_lowercase().find(&search)?;
    let rest = &line[start + search.len()..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_m3u() {
        let content = r#"
#EXTM3U
#EXTINF:-1 tvg-id="cnn" group-title="News",CNN
http://example.com/live/user/pass/1.ts
#EXTINF:-1 tvg-id="bbc" group-title="News",BBC
http://example.com/live/user/pass/2.ts
"#;
        let channels = parse_m3u(content);
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].name, "CNN");
        assert_eq!(channels[0].group, "News");
    }

    #[test]
    fn test_extract_attr_case_insensitive_key() {
        let line = r#"#EXTINF:-1 Group-Title="Movies" TVG-LOGO="http://x/l.png",Film"#;
        assert_eq!(extract_attr(line, "group-title"), Some("Movies".to_string()));
        assert_eq!(extract_attr(line, "tvg-logo"), Some("http://x/l.png".to_string()));
        assert_eq!(extract_attr(line, "tvg-id"), None);
    }

    #[test]
    fn test_extract_attr_unterminated() {
        assert_eq!(extract_attr(r#"#EXTINF:-1 group-title="News,CNN"#, "group-title"), None);
    }

    #[test]
    fn test_decode_plain_body() {
        let text = decode_body(b"#EXTM3U\n").unwrap();
        assert_eq!(text, "#EXTM3U\n");
    }
}
