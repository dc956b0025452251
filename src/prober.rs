//! Stream probing through the `ffprobe` CLI
//!
//! [`StreamProber`] is the capability the checker depends on. [`FfprobeProber`]
//! shells out to ffprobe, bounds the call with a deadline and maps the JSON
//! output into a [`StreamInfo`]. [`probe_stream`] folds every failure into a
//! `Dead` result so nothing escapes to the caller.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;

use crate::config::CheckerConfig;
use crate::models::{StreamInfo, StreamStatus};

/// Extra wall time allowed on top of ffprobe's own timeout
pub const DEFAULT_GRACE: Duration = Duration::from_secs(5);

const STREAM_NOT_ACCESSIBLE: &str = "Stream not accessible";

/// Why a probe did not yield a live stream
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("Connection timeout")]
    Timeout,

    /// Inspector exited unsuccessfully or printed nothing; holds its diagnostic
    #[error("{0}")]
    Failed(String),

    #[error("No video stream found")]
    NoVideoStream,

    #[error("{0}")]
    Malformed(String),

    #[error("{0}")]
    Spawn(String),
}

impl ProbeError {
    pub fn failed(stderr: &str) -> Self {
        let stderr = stderr.trim();
        if stderr.is_empty() {
            ProbeError::Failed(STREAM_NOT_ACCESSIBLE.to_string())
        } else {
            ProbeError::Failed(stderr.to_string())
        }
    }
}

/// Inspects one stream URL within a timeout
pub trait StreamProber {
    fn probe(&self, url: &str, timeout_secs: u64) -> Result<StreamInfo, ProbeError>;
}

impl<T: StreamProber + ?Sized> StreamProber for &T {
    fn probe(&self, url: &str, timeout_secs: u64) -> Result<StreamInfo, ProbeError> {
        (**self).probe(url, timeout_secs)
    }
}

/// Probe a stream, folding any failure into a `Dead` result
pub fn probe_stream(prober: &dyn StreamProber, url: &str, timeout_secs: u64) -> StreamInfo {
    match prober.probe(url, timeout_secs) {
        Ok(info) => info,
        Err(e) => {
            tracing::debug!("Probe failed for {}: {}", url, e);
            StreamInfo::dead(e.to_string())
        }
    }
}

/// A prober backed by the `ffprobe` CLI
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe_path: PathBuf,
    user_agent: String,
    grace: Duration,
}

impl FfprobeProber {
    pub fn new(ffprobe_path: PathBuf, user_agent: &str) -> Self {
        Self {
            ffprobe_path,
            user_agent: user_agent.to_string(),
            grace: DEFAULT_GRACE,
        }
    }

    /// Build from config, resolving the binary on `PATH` when possible
    pub fn from_config(config: &CheckerConfig) -> Self {
        let ffprobe_path = which::which(&config.ffprobe_path)
            .unwrap_or_else(|_| PathBuf::from(&config.ffprobe_path));
        Self::new(ffprobe_path, &config.user_agent)
            .with_grace(Duration::from_secs(config.probe_grace_secs))
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    fn command(&self, url: &str, timeout_secs: u64) -> Command {
        let mut cmd = Command::new(&self.ffprobe_path);
        cmd.args([
            "-v", "quiet",
            "-print_format", "json",
            "-show_streams",
            "-show_format",
        ]);
        cmd.arg("-user_agent").arg(&self.user_agent);
        // ffprobe takes its network timeout in microseconds
        cmd.arg("-timeout").arg(timeout_secs.saturating_mul(1_000_000).to_string());
        cmd.arg(url);
        cmd
    }
}

impl StreamProber for FfprobeProber {
    fn probe(&self, url: &str, timeout_secs: u64) -> Result<StreamInfo, ProbeError> {
        let cmd = self.command(url, timeout_secs);
        tracing::debug!("Running {:?}", cmd.as_std());

        // No deadline when the timeout is too large to represent
        let limit = Duration::from_secs(timeout_secs).checked_add(self.grace);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ProbeError::Spawn(format!("Failed to start probe runtime: {}", e)))?;
        let output = runtime.block_on(run_with_deadline(cmd, limit))?;
        interpret_output(&output)
    }
}

/// What a finished inspector process produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Run a command to completion, killing it once `limit` has elapsed.
///
/// `None` waits for the process however long it takes.
pub async fn run_with_deadline(
    mut cmd: Command,
    limit: Option<Duration>,
) -> Result<CapturedOutput, ProbeError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|e| {
        ProbeError::Spawn(format!("Failed to launch {:?}: {}", cmd.as_std().get_program(), e))
    })?;

    // Dropping the wait future on timeout drops the child, which kills it
    let result = match limit {
        Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_elapsed| ProbeError::Timeout)?,
        None => child.wait_with_output().await,
    };
    let output =
        result.map_err(|e| ProbeError::Spawn(format!("Failed to wait for process: {}", e)))?;

    Ok(CapturedOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Map a finished ffprobe run onto a probe result
pub fn interpret_output(output: &CapturedOutput) -> Result<StreamInfo, ProbeError> {
    if !output.success || output.stdout.trim().is_empty() {
        return Err(ProbeError::failed(&output.stderr));
    }
    parse_probe_output(&output.stdout)
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    bit_rate: Option<String>,
}

/// Parse ffprobe's `-print_format json` output into a live [`StreamInfo`]
pub fn parse_probe_output(json: &str) -> Result<StreamInfo, ProbeError> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| ProbeError::Malformed(format!("Invalid ffprobe output: {}", e)))?;

    let first_of = |kind: &str| {
        output
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some(kind))
    };

    let video = first_of("video").ok_or(ProbeError::NoVideoStream)?;
    let audio = first_of("audio");

    let framerate_num = parse_framerate(video.r_frame_rate.as_deref().unwrap_or("0/1"));

    Ok(StreamInfo {
        status: StreamStatus::Alive,
        error: String::new(),
        codec: video.codec_name.clone().unwrap_or_default(),
        resolution: format!("{}x{}", video.width.unwrap_or(0), video.height.unwrap_or(0)),
        framerate: if framerate_num > 0.0 {
            format!("{:.2} fps", framerate_num)
        } else {
            String::new()
        },
        framerate_num,
        bitrate: audio.and_then(|a| a.bit_rate.clone()).unwrap_or_default(),
    })
}

/// Parse "30000/1001" or "25" into frames per second; 0 when unknown
pub fn parse_framerate(rate: &str) -> f64 {
    let rate = rate.trim();
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            match (num.trim().parse::<f64>(), den.trim().parse::<f64>()) {
                (Ok(_), Ok(den)) if den == 0.0 => 0.0,
                (Ok(num), Ok(den)) => num / den,
                _ => 0.0,
            }
        }
        None => rate.parse::<f64>().unwrap_or(0.0),
    };

    if value.is_finite() { value } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    const LIVE_JSON: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "audio", "codec_name": "aac", "bit_rate": "128000"},
            {"index": 1, "codec_type": "video", "codec_name": "h264",
             "width": 1920, "height": 1080, "r_frame_rate": "30000/1001"},
            {"index": 2, "codec_type": "audio", "codec_name": "ac3", "bit_rate": "384000"}
        ],
        "format": {"format_name": "mpegts"}
    }"#;

    #[test]
    fn test_parse_framerate() {
        assert!((parse_framerate("30000/1001") - 29.97).abs() < 0.01);
        assert_eq!(parse_framerate("0/0"), 0.0);
        assert_eq!(parse_framerate("25"), 25.0);
        assert_eq!(parse_framerate("25/1"), 25.0);
        assert_eq!(parse_framerate("garbage"), 0.0);
        assert_eq!(parse_framerate("a/b"), 0.0);
        assert_eq!(parse_framerate("1/2/3"), 0.0);
        assert_eq!(parse_framerate(""), 0.0);
        assert_eq!(parse_framerate("inf"), 0.0);
    }

    #[test]
    fn test_parse_live_output() {
        let info = parse_probe_output(LIVE_JSON).unwrap();
        assert_eq!(info.status, StreamStatus::Alive);
        assert_eq!(info.codec, "h264");
        assert_eq!(info.resolution, "1920x1080");
        assert_eq!(info.framerate, "29.97 fps");
        assert_eq!(info.bitrate, "128000");
        assert!(info.error.is_empty());
    }

    #[test]
    fn test_parse_no_video() {
        let json = r#"{"streams": [{"codec_type": "audio", "codec_name": "mp3"}]}"#;
        assert_eq!(parse_probe_output(json), Err(ProbeError::NoVideoStream));
        assert_eq!(parse_probe_output("{}"), Err(ProbeError::NoVideoStream));
    }

    #[test]
    fn test_parse_video_without_details() {
        let json = r#"{"streams": [{"codec_type": "video"}]}"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.resolution, "0x0");
        assert_eq!(info.framerate, "");
        assert_eq!(info.framerate_num, 0.0);
        assert_eq!(info.codec, "");
        assert_eq!(info.bitrate, "");
    }

    #[test]
    fn test_parse_malformed() {
        let err = parse_probe_output("not json").unwrap_err();
        assert!(matches!(err, ProbeError::Malformed(_)));
        assert!(err.to_string().starts_with("Invalid ffprobe output"));
    }

    #[test]
    fn test_interpret_failed_exit() {
        let output = CapturedOutput {
            success: false,
            stdout: String::new(),
            stderr: "Server returned 404 Not Found\n".into(),
        };
        assert_eq!(
            interpret_output(&output),
            Err(ProbeError::Failed("Server returned 404 Not Found".into()))
        );

        let quiet = CapturedOutput { success: false, stdout: String::new(), stderr: String::new() };
        assert_eq!(interpret_output(&quiet).unwrap_err().to_string(), "Stream not accessible");
    }

    #[test]
    fn test_interpret_empty_stdout() {
        let output = CapturedOutput { success: true, stdout: "  \n".into(), stderr: String::new() };
        assert_eq!(interpret_output(&output).unwrap_err().to_string(), "Stream not accessible");
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(ProbeError::Timeout.to_string(), "Connection timeout");
        assert_eq!(ProbeError::NoVideoStream.to_string(), "No video stream found");
    }

    struct FailingProber(ProbeError);

    impl StreamProber for FailingProber {
        fn probe(&self, _url: &str, _timeout_secs: u64) -> Result<StreamInfo, ProbeError> {
            Err(self.0.clone())
        }
    }

    #[test]
    fn test_probe_stream_fails_closed() {
        let info = probe_stream(&FailingProber(ProbeError::Timeout), "http://x/1.ts", 10);
        assert_eq!(info.status, StreamStatus::Dead);
        assert_eq!(info.error, "Connection timeout");
        assert!(info.resolution.is_empty());
    }

    #[test]
    fn test_command_arguments() {
        let prober = FfprobeProber::new(PathBuf::from("ffprobe"), "IPTVChecker 1.0");
        let cmd = prober.command("http://example.com/1.ts", 10);
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "-v", "quiet", "-print_format", "json", "-show_streams", "-show_format",
                "-user_agent", "IPTVChecker 1.0", "-timeout", "10000000",
                "http://example.com/1.ts",
            ]
        );
    }

    #[test]
    fn test_missing_binary_is_dead() {
        let prober = FfprobeProber::new(PathBuf::from("nonexistent_ffprobe_xyz_12345"), "ua");
        let info = probe_stream(&prober, "http://example.com/1.ts", 1);
        assert_eq!(info.status, StreamStatus::Dead);
        assert!(!info.error.is_empty());
    }

    #[test]
    fn test_huge_timeout_does_not_overflow() {
        // `sleep` rejects ffprobe's flags and exits at once
        let prober = FfprobeProber::new(PathBuf::from("sleep"), "ua");
        let info = probe_stream(&prober, "http://example.com/1.ts", u64::MAX);
        assert_eq!(info.status, StreamStatus::Dead);

        let prober = prober.with_grace(Duration::MAX);
        let info = probe_stream(&prober, "http://example.com/1.ts", 10);
        assert_eq!(info.status, StreamStatus::Dead);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_deadline_kills_hung_process() {
        let mut cmd = Command::new("sleep");
        cmd.arg("10");
        let started = Instant::now();
        let result = run_with_deadline(cmd, Some(Duration::from_millis(200))).await;
        assert_eq!(result, Err(ProbeError::Timeout));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_deadline_captures_output() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo out; echo err >&2; exit 3"]);
        let output = run_with_deadline(cmd, Some(Duration::from_secs(5))).await.unwrap();
        assert!(!output.success);
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_no_deadline_waits_for_exit() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo done"]);
        let output = run_with_deadline(cmd, None).await.unwrap();
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "done");
    }
}
