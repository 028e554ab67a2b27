//! `yt-dlp` subprocess adapter
//!
//! Runs the engine as a child process. Progress is read line by line from
//! stdout using a custom progress template, so no engine internals leak
//! into the rest of the service.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::config::EngineConfig;
use super::format::PostProcess;
use super::{FetchEngine, FetchOutcome, FetchRequest, MediaInfo};
use crate::app::progress::{EngineEvent, ProgressReporter};
use crate::constants::engine;
use crate::errors::{EngineError, EngineResult};

/// Stderr lines kept for error reporting
const STDERR_TAIL_LINES: usize = 20;

/// Lower-cased fragments of engine errors that mean the media cannot be fetched
const UNAVAILABLE_MARKERS: &[&str] = &[
    "private video",
    "video unavailable",
    "this video is unavailable",
    "is not available",
    "has been removed",
    "members-only",
    "join this channel",
    "sign in to confirm your age",
    "age-restricted",
    "unsupported url",
    "http error 404",
];

/// Subset of the engine's JSON metadata used by the service
#[derive(Debug, Deserialize)]
struct ProbeMetadata {
    title: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
}

impl From<ProbeMetadata> for MediaInfo {
    fn from(meta: ProbeMetadata) -> Self {
        MediaInfo {
            title: meta.title.filter(|t| !t.trim().is_empty()),
            duration_secs: meta
                .duration
                .filter(|d| d.is_finite() && *d >= 0.0)
                .map(|d| d as u64),
            thumbnail: meta.thumbnail.filter(|t| !t.is_empty()),
        }
    }
}

/// Engine backed by the `yt-dlp` executable
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    config: EngineConfig,
}

impl YtDlpEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.args(["--no-playlist", "--no-warnings"]);
        if let Some(cookies) = self.config.usable_cookies_file() {
            cmd.arg("--cookies").arg(cookies);
        }
        if let Some(ffmpeg) = &self.config.ffmpeg_location {
            cmd.arg("--ffmpeg-location").arg(ffmpeg);
        }
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }

    /// Command line for a fetch into `request.output_path`
    fn fetch_command(&self, request: &FetchRequest) -> Command {
        let selection = request.selection();
        let mut cmd = self.base_command();
        cmd.args(["--newline", "--progress"])
            .arg("--progress-template")
            .arg(format!(
                "download:{} %(progress.status)s %(progress._percent_str)s",
                engine::PROGRESS_LINE_PREFIX
            ))
            .arg("--print")
            .arg(format!("before_dl:{} %(title)s", engine::TITLE_LINE_PREFIX))
            .arg("--no-simulate")
            // The sweep ages artifacts by local mtime
            .arg("--no-mtime")
            .arg("-f")
            .arg(&selection.selector)
            .arg("-o")
            .arg(output_template(&request.output_path));

        match selection.post_process {
            PostProcess::RemuxVideo { container } => {
                cmd.args(["--merge-output-format", container, "--remux-video", container]);
            }
            PostProcess::ExtractAudio { codec, quality } => {
                cmd.args(["-x", "--audio-format", codec, "--audio-quality", quality]);
            }
        }
        cmd.arg("--").arg(&request.url);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd
    }

    /// Version string reported by the engine binary
    pub async fn version(&self) -> EngineResult<String> {
        let output = Command::new(&self.config.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;
        if !output.status.success() {
            return Err(EngineError::Failed {
                message: format!("--version exited with {}", output.status),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn spawn_error(&self, source: std::io::Error) -> EngineError {
        EngineError::Spawn {
            binary: self.config.binary.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl FetchEngine for YtDlpEngine {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn probe(&self, url: &str) -> EngineResult<MediaInfo> {
        let mut cmd = self.base_command();
        cmd.args(["--dump-single-json", "--skip-download"])
            .arg("--")
            .arg(url);

        debug!("Probing {}", url);
        let output = tokio::time::timeout(self.config.probe_timeout, cmd.output())
            .await
            .map_err(|_| EngineError::Timeout {
                seconds: self.config.probe_timeout.as_secs(),
            })?
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&stderr));
        }

        let metadata: ProbeMetadata = serde_json::from_slice(&output.stdout)?;
        Ok(metadata.into())
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        progress: ProgressReporter,
    ) -> EngineResult<FetchOutcome> {
        let mut cmd = self.fetch_command(request);
        let session_id = progress.session_id().clone();
        info!(session_id = %session_id, "Starting yt-dlp for {}", request.url);

        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Failed {
                message: "engine stdout unavailable".to_string(),
            })?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::Failed {
                message: "engine stderr unavailable".to_string(),
            })?;

        let stderr_task = tokio::spawn(collect_tail(stderr));
        let title = forward_progress(stdout, &progress).await?;
        let status = child.wait().await?;
        let stderr_tail = stderr_task.await.unwrap_or_default();

        if !status.success() {
            warn!(session_id = %session_id, "yt-dlp exited with {}", status);
            let err = classify_failure(&stderr_tail);
            // Availability problems surface mid-fetch too; report them as failures
            return Err(match err {
                EngineError::Unavailable { reason } => EngineError::Failed { message: reason },
                other => other,
            });
        }

        if !request.output_path.is_file() {
            return Err(EngineError::NoOutput {
                path: request.output_path.clone(),
            });
        }

        progress.report(EngineEvent::Finished).await;
        Ok(FetchOutcome { title })
    }
}

/// Output template with the engine choosing the intermediate extension
///
/// Post-processing renames the final file to `<stem>.<format>`, which is
/// exactly the requested output path.
fn output_template(output_path: &Path) -> PathBuf {
    let stem = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_path.with_file_name(format!("{}.%(ext)s", stem))
}

/// Translate stdout lines into engine events; returns the reported title
async fn forward_progress<R>(stdout: R, progress: &ProgressReporter) -> EngineResult<Option<String>>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    let mut title = None;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        match parse_output_line(&line) {
            Some(OutputLine::Progress(event)) => progress.report(event).await,
            Some(OutputLine::Title(value)) => {
                progress.report(EngineEvent::Title(value.clone())).await;
                title = Some(value);
            }
            None => {}
        }
    }

    Ok(title)
}

#[derive(Debug, PartialEq)]
enum OutputLine {
    Progress(EngineEvent),
    Title(String),
}

fn parse_output_line(line: &str) -> Option<OutputLine> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix(engine::PROGRESS_LINE_PREFIX) {
        let mut parts = rest.trim().splitn(2, char::is_whitespace);
        let phase = parts.next().unwrap_or_default();
        let percent = parts.next();
        let event = match EngineEvent::from_phase(phase, percent) {
            // Separate video and audio streams each report "finished"; only
            // process exit marks the artifact as done.
            EngineEvent::Finished => EngineEvent::Downloading {
                percent: Some("100%".to_string()),
            },
            other => other,
        };
        return Some(OutputLine::Progress(event));
    }
    if let Some(rest) = line.strip_prefix(engine::TITLE_LINE_PREFIX) {
        let title = rest.trim();
        if !title.is_empty() && title != "NA" {
            return Some(OutputLine::Title(title.to_string()));
        }
    }
    None
}

async fn collect_tail<R>(stderr: R) -> String
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stderr).lines();
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    while let Ok(Some(line)) = lines.next_line().await {
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    tail.into_iter().collect::<Vec<_>>().join("\n")
}

/// Map engine stderr to an error, preferring its last `ERROR:` line
fn classify_failure(stderr: &str) -> EngineError {
    let message = stderr
        .lines()
        .rev()
        .find_map(|line| line.trim().strip_prefix("ERROR:").map(str::trim))
        .or_else(|| stderr.lines().rev().map(str::trim).find(|l| !l.is_empty()))
        .unwrap_or("engine exited with an error")
        .to_string();

    let lowered = message.to_ascii_lowercase();
    if UNAVAILABLE_MARKERS.iter().any(|m| lowered.contains(m)) {
        EngineError::Unavailable { reason: message }
    } else {
        EngineError::Failed { message }
    }
}
