//! Output format, resolution and engine format selection rules

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::engine;
use crate::errors::ServiceError;

/// Container/codec of the produced artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    /// Best video up to the requested height, merged with best audio
    #[default]
    Mp4,
    /// Audio only
    Mp3,
}

impl MediaFormat {
    /// File extension of the final artifact
    pub fn extension(self) -> &'static str {
        match self {
            MediaFormat::Mp4 => "mp4",
            MediaFormat::Mp3 => "mp3",
        }
    }

    pub fn is_audio_only(self) -> bool {
        matches!(self, MediaFormat::Mp3)
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for MediaFormat {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "mp4" => Ok(MediaFormat::Mp4),
            "mp3" => Ok(MediaFormat::Mp3),
            other => Err(ServiceError::invalid_input(format!(
                "Unsupported format '{}', expected mp4 or mp3",
                other
            ))),
        }
    }
}

/// Maximum video height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution(u32);

impl Resolution {
    const MIN_HEIGHT: u32 = 144;
    const MAX_HEIGHT: u32 = 4320;

    /// Create a resolution from a pixel height
    pub fn new(height: u32) -> Result<Self, ServiceError> {
        if !(Self::MIN_HEIGHT..=Self::MAX_HEIGHT).contains(&height) {
            return Err(ServiceError::invalid_input(format!(
                "Resolution {}p is outside the supported range {}p-{}p",
                height,
                Self::MIN_HEIGHT,
                Self::MAX_HEIGHT
            )));
        }
        Ok(Self(height))
    }

    pub fn height(self) -> u32 {
        self.0
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self(engine::DEFAULT_RESOLUTION)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p", self.0)
    }
}

impl FromStr for Resolution {
    type Err = ServiceError;

    /// Accepts `720p`, `720P` or `720`; an empty string is the default
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let digits = trimmed.trim_end_matches(['p', 'P']);
        let height = digits.parse::<u32>().map_err(|_| {
            ServiceError::invalid_input(format!("Invalid resolution '{}'", trimmed))
        })?;
        Self::new(height)
    }
}

/// Post-processing applied after the transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcess {
    /// Merge/remux streams into a container
    RemuxVideo { container: &'static str },
    /// Extract audio and convert it
    ExtractAudio {
        codec: &'static str,
        quality: &'static str,
    },
}

/// Engine-level media selection for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSelection {
    /// Format selector expression understood by the engine
    pub selector: String,
    pub post_process: PostProcess,
}

impl FormatSelection {
    /// Selection rules for a requested format and resolution
    ///
    /// Video: best video not taller than the requested height combined with
    /// the best audio, falling back to the best single file under the same
    /// cap. Audio: best audio only.
    pub fn for_request(format: MediaFormat, resolution: Resolution) -> Self {
        match format {
            MediaFormat::Mp4 => {
                let height = resolution.height();
                Self {
                    selector: format!(
                        "bestvideo[height<={h}]+bestaudio/best[height<={h}]",
                        h = height
                    ),
                    post_process: PostProcess::RemuxVideo { container: "mp4" },
                }
            }
            MediaFormat::Mp3 => Self {
                selector: "bestaudio/best".to_string(),
                post_process: PostProcess::ExtractAudio {
                    codec: "mp3",
                    quality: engine::AUDIO_QUALITY,
                },
            },
        }
    }
}
