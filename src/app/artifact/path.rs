//! Artifact naming
//!
//! Files in the shared download directory are named `<session id>.<ext>`,
//! which keeps concurrent jobs from ever touching each other's output and
//! lets sweeps map a file back to its session.

use std::path::{Path, PathBuf};

use crate::app::engine::MediaFormat;
use crate::app::session::SessionId;
use crate::constants::artifacts;

/// Characters replaced in attachment names
const UNSAFE_NAME_CHARS: &[char] = &['\\', '/', ':', '"', '*', '?', '<', '>', '|'];

/// Path of the artifact for a session and format
pub fn artifact_path(root: &Path, id: &SessionId, format: MediaFormat) -> PathBuf {
    root.join(format!("{}.{}", id, format.extension()))
}

/// Session id encoded in an artifact file name, if the file is one of ours
///
/// Only names starting with a generated id qualify; anything else in the
/// directory belongs to someone else.
pub fn session_id_from_path(path: &Path) -> Option<SessionId> {
    let name = path.file_name()?.to_str()?;
    // intermediate engine files look like `<id>.f137.mp4` or `<id>.mp4.part`
    let id = name.split('.').next()?;
    SessionId::parse_generated(id)
}

/// Attachment name `<title>.<ext>` with filesystem-hostile characters replaced
///
/// Each run of unsafe characters collapses into a single `_`.
pub fn download_name(title: &str, format: MediaFormat) -> String {
    let title = title.trim();
    let base = if title.is_empty() {
        artifacts::FALLBACK_DOWNLOAD_NAME
    } else {
        title
    };

    let mut sanitized = String::with_capacity(base.len());
    let mut in_run = false;
    for c in base.chars() {
        if UNSAFE_NAME_CHARS.contains(&c) || c.is_control() {
            if !in_run {
                sanitized.push('_');
            }
            in_run = true;
        } else {
            sanitized.push(c);
            in_run = false;
        }
    }

    format!("{}.{}", sanitized, format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_paths_are_distinct_per_session() {
        let root = Path::new("/srv/downloads");
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(
            artifact_path(root, &a, MediaFormat::Mp4),
            artifact_path(root, &b, MediaFormat::Mp4)
        );
        assert_eq!(
            artifact_path(root, &SessionId::from_raw("abc"), MediaFormat::Mp3),
            PathBuf::from("/srv/downloads/abc.mp3")
        );
    }

    #[test]
    fn test_session_id_round_trips_through_file_names() {
        let id = SessionId::generate();
        let path = artifact_path(Path::new("/tmp"), &id, MediaFormat::Mp4);
        assert_eq!(session_id_from_path(&path), Some(id.clone()));

        let part = PathBuf::from(format!("/tmp/{}.f137.mp4.part", id));
        assert_eq!(session_id_from_path(&part), Some(id));

        assert_eq!(session_id_from_path(Path::new("/tmp/.hidden")), None);
        assert_eq!(session_id_from_path(Path::new("/tmp/cookies.txt")), None);
        assert_eq!(session_id_from_path(Path::new("/tmp/notes.md")), None);
        assert_eq!(session_id_from_path(Path::new("/tmp/abc123.mp4")), None);
    }

    #[test]
    fn test_download_name_sanitizes_title() {
        assert_eq!(
            download_name("AC/DC: Live?? <2024>", MediaFormat::Mp3),
            "AC_DC_ Live_ _2024_.mp3"
        );
        assert_eq!(download_name("a//\\b", MediaFormat::Mp4), "a_b.mp4");
        assert_eq!(download_name("   ", MediaFormat::Mp4), "Downloaded_File.mp4");
    }
}
