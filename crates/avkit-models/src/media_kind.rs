//! Accepted media kinds and their extension allow-lists.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Extensions accepted for video inputs.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "m4v"];

/// Extensions accepted for audio inputs. `mov` is listed because
/// audio-only QuickTime files are common.
pub const AUDIO_EXTENSIONS: &[&str] = &["mov", "mp3", "wav", "aac", "m4a", "flac", "ogg", "wma"];

/// Kind of uploaded media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }

    /// Allowed extensions, lowercase and without the dot.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Video => VIDEO_EXTENSIONS,
            MediaKind::Audio => AUDIO_EXTENSIONS,
        }
    }

    /// Whether `filename` carries an allowed extension.
    ///
    /// The extension is the text after the last dot, compared
    /// case-insensitively. Names without a dot are never allowed.
    pub fn allows(&self, filename: &str) -> bool {
        extension_of(filename)
            .map(|ext| self.extensions().contains(&ext.as_str()))
            .unwrap_or(false)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lowercased extension of a file name, if it has one.
pub fn extension_of(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Lowercased extension of a path.
pub fn path_extension(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(extension_of)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_extensions() {
        assert!(MediaKind::Video.allows("clip.mp4"));
        assert!(MediaKind::Video.allows("CLIP.MKV"));
        assert!(MediaKind::Video.allows("my.holiday.webm"));
        assert!(!MediaKind::Video.allows("song.mp3"));
        assert!(!MediaKind::Video.allows("mp4"));
        assert!(!MediaKind::Video.allows("clip."));
    }

    #[test]
    fn test_audio_extensions() {
        assert!(MediaKind::Audio.allows("voice.wav"));
        assert!(MediaKind::Audio.allows("recording.MOV"));
        assert!(!MediaKind::Audio.allows("clip.mp4"));
        assert!(!MediaKind::Audio.allows("notes.txt"));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("a.b.C"), Some("c".to_string()));
        assert_eq!(extension_of("noext"), None);
        assert_eq!(path_extension(Path::new("/tmp/x/track.FLAC")), Some("flac".to_string()));
    }
}
