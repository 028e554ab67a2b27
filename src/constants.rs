//! Application constants for Media Fetcher
//!
//! This module centralizes the default values used throughout the service,
//! organized by functional domain.

use std::time::Duration;

/// Environment variable names
pub mod env {
    /// Listen port override
    pub const PORT: &str = "PORT";

    /// Listen host override
    pub const HOST: &str = "HOST";

    /// Artifact directory override
    pub const DOWNLOAD_DIR: &str = "DOWNLOAD_DIR";

    /// Engine binary override
    pub const ENGINE_BINARY: &str = "YT_DLP_PATH";

    /// ffmpeg location override
    pub const FFMPEG_LOCATION: &str = "FFMPEG_LOCATION";

    /// Raw cookie file contents written to the cookies file at startup
    pub const COOKIES_DATA: &str = "COOKIES_DATA";
}

/// HTTP server defaults
pub mod server {
    /// Default bind host
    pub const DEFAULT_HOST: &str = "0.0.0.0";

    /// Default bind port
    pub const DEFAULT_PORT: u16 = 5000;
}

/// Job runner defaults
pub mod jobs {
    use super::Duration;

    /// Default number of engine invocations allowed to run at once
    pub const DEFAULT_MAX_CONCURRENT: usize = 4;

    /// Upper bound accepted by configuration validation
    pub const MAX_CONCURRENT_LIMIT: usize = 64;

    /// Buffer size of the per-job progress channel
    pub const PROGRESS_CHANNEL_SIZE: usize = 64;

    /// How long shutdown waits for in-flight jobs
    pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);
}

/// Artifact lifecycle defaults
pub mod artifacts {
    use super::Duration;

    /// Default artifact directory, relative to the working directory
    pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads";

    /// Deletion delay measured from the first successful retrieval
    pub const RETENTION_AFTER_RETRIEVAL: Duration = Duration::from_secs(5 * 60);

    /// Maximum age of an artifact that was never retrieved
    pub const UNRETRIEVED_RETENTION: Duration = Duration::from_secs(60 * 60);

    /// Interval of the background reaper
    pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

    /// Attachment name used when no title is known
    pub const FALLBACK_DOWNLOAD_NAME: &str = "Downloaded_File";
}

/// External engine defaults
pub mod engine {
    use super::Duration;

    /// Engine binary looked up on PATH
    pub const DEFAULT_BINARY: &str = "yt-dlp";

    /// Default cookies file, relative to the working directory
    pub const DEFAULT_COOKIES_FILE: &str = "cookies.txt";

    /// Time budget for the pre-flight metadata probe
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

    /// Audio bitrate used for mp3 extraction
    pub const AUDIO_QUALITY: &str = "192K";

    /// Default requested resolution (height in pixels)
    pub const DEFAULT_RESOLUTION: u32 = 720;

    /// Prefix the progress template puts in front of every progress line
    pub const PROGRESS_LINE_PREFIX: &str = "[fetch-progress]";

    /// Prefix used to report the final title
    pub const TITLE_LINE_PREFIX: &str = "[fetch-title]";

    /// Title recorded when the engine never reports one
    pub const FALLBACK_TITLE: &str = "Downloaded File";

    /// Title reported by video info when metadata has none
    pub const UNKNOWN_TITLE: &str = "Unknown Title";
}

/// Logging defaults
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "info";

    /// Crate target used in the log filter
    pub const CRATE_TARGET: &str = "media_fetcher";
}

/// Configuration file location
pub mod config {
    /// Directory name under the platform config directory
    pub const APP_DIR_NAME: &str = "media-fetcher";

    /// Configuration file name
    pub const FILE_NAME: &str = "config.toml";
}

pub use jobs::DEFAULT_MAX_CONCURRENT;
pub use server::{DEFAULT_HOST, DEFAULT_PORT};
