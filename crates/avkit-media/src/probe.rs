//! FFprobe media information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use avkit_models::format_bytes;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Video stream information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStreamInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Video codec
    pub codec: String,
}

/// Audio stream information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    /// Audio codec
    pub codec: String,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u32,
}

/// Media file information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration: f64,
    /// File size in bytes
    pub size: u64,
    /// First video stream, if any
    pub video: Option<VideoStreamInfo>,
    /// First audio stream, if any
    pub audio: Option<AudioStreamInfo>,
}

impl MediaInfo {
    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Labelled fields for display: duration, resolution, fps, audio, size.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("duration", format!("{:.2}s", self.duration))];

        if let Some(video) = &self.video {
            fields.push(("resolution", format!("{}x{}", video.width, video.height)));
            fields.push(("fps", format!("{:.2}", video.fps)));
            fields.push(("video codec", video.codec.clone()));
        }
        fields.push((
            "audio",
            match &self.audio {
                Some(audio) => format!(
                    "{}, {} Hz, {} ch",
                    audio.codec, audio.sample_rate, audio.channels
                ),
                None => "none".to_string(),
            },
        ));
        fields.push(("size", format_bytes(self.size)));

        fields
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    duration: Option<String>,
}

/// Probe a media file.
pub async fn probe_media(path: impl AsRef<Path>) -> MediaResult<MediaInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let ffprobe = check_ffprobe()?;

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::ffprobe_failed(
            format!("FFprobe could not read {}", path.display()),
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
        ));
    }

    parse_probe_output(&output.stdout)
}

/// Probe a file that must contain a decodable video stream.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<MediaInfo> {
    let info = probe_media(path).await?;
    match &info.video {
        Some(video) if video.width > 0 && video.height > 0 && info.duration > 0.0 => Ok(info),
        Some(_) => Err(MediaError::invalid_media("Video stream has no frames")),
        None => Err(MediaError::invalid_media("No video stream found")),
    }
}

/// Probe a file that must contain a decodable audio stream.
pub async fn probe_audio(path: impl AsRef<Path>) -> MediaResult<MediaInfo> {
    let info = probe_media(path).await?;
    if info.audio.is_none() {
        return Err(MediaError::invalid_media("No audio stream found"));
    }
    if info.duration <= 0.0 {
        return Err(MediaError::invalid_media("Audio track has no duration"));
    }
    Ok(info)
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output.
pub fn parse_probe_output(stdout: &[u8]) -> MediaResult<MediaInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let audio_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"));

    let format_duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok());

    // Some containers only report duration per stream
    let stream_duration = probe
        .streams
        .iter()
        .filter_map(|s| s.duration.as_deref())
        .filter_map(|d| d.parse::<f64>().ok())
        .fold(None, |max: Option<f64>, d| Some(max.map_or(d, |m| m.max(d))));

    let duration = format_duration
        .or(stream_duration)
        .filter(|d| d.is_finite())
        .unwrap_or(0.0);

    let size = probe
        .format
        .as_ref()
        .and_then(|f| f.size.as_deref())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    let video = video_stream.map(|s| VideoStreamInfo {
        width: s.width.unwrap_or(0),
        height: s.height.unwrap_or(0),
        fps: s
            .avg_frame_rate
            .as_deref()
            .and_then(parse_frame_rate)
            .or_else(|| s.r_frame_rate.as_deref().and_then(parse_frame_rate))
            .unwrap_or(30.0),
        codec: s.codec_name.clone().unwrap_or_default(),
    });

    let audio = audio_stream.map(|s| AudioStreamInfo {
        codec: s.codec_name.clone().unwrap_or_default(),
        sample_rate: s
            .sample_rate
            .as_deref()
            .and_then(|r| r.parse().ok())
            .unwrap_or(0),
        channels: s.channels.unwrap_or(0),
    });

    Ok(MediaInfo {
        duration,
        size,
        video,
        audio,
    })
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
///
/// Returns `None` for zero or undefined rates such as `0/0`.
pub fn parse_frame_rate(s: &str) -> Option<f64> {
    let rate = if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den <= 0.0 {
            return None;
        }
        num / den
    } else {
        s.parse().ok()?
    };

    (rate > 0.0 && rate.is_finite()).then_some(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIDEO_WITH_AUDIO: &str = r#"{
        "streams": [
            {"codec_type": "video", "codec_name": "h264", "width": 1280, "height": 720,
             "r_frame_rate": "30/1", "avg_frame_rate": "30000/1001", "duration": "5.000000"},
            {"codec_type": "audio", "codec_name": "aac", "sample_rate": "48000", "channels": 2}
        ],
        "format": {"duration": "5.005000", "size": "1048576"}
    }"#;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
        assert!(parse_frame_rate("garbage").is_none());
    }

    #[test]
    fn test_parse_video_with_audio() {
        let info = parse_probe_output(VIDEO_WITH_AUDIO.as_bytes()).unwrap();
        assert!((info.duration - 5.005).abs() < 1e-9);
        assert_eq!(info.size, 1_048_576);

        let video = info.video.unwrap();
        assert_eq!((video.width, video.height), (1280, 720));
        assert!((video.fps - 29.97).abs() < 0.01);
        assert_eq!(video.codec, "h264");

        let audio = info.audio.unwrap();
        assert_eq!(audio.sample_rate, 48_000);
        assert_eq!(audio.channels, 2);
    }

    #[test]
    fn test_summary() {
        let info = parse_probe_output(VIDEO_WITH_AUDIO.as_bytes()).unwrap();
        let summary = info.summary();

        let field = |name: &str| {
            summary
                .iter()
                .find(|(label, _)| *label == name)
                .map(|(_, value)| value.clone())
        };
        assert!(field("duration").unwrap().starts_with("5.0"));
        assert_eq!(field("resolution").as_deref(), Some("1280x720"));
        assert_eq!(field("fps").as_deref(), Some("29.97"));
        assert_eq!(field("audio").as_deref(), Some("aac, 48000 Hz, 2 ch"));
        assert_eq!(field("size").as_deref(), Some("1.00 MB"));

        let silent = MediaInfo {
            audio: None,
            video: None,
            ..info
        };
        let summary = silent.summary();
        assert!(summary.iter().all(|(label, _)| *label != "resolution"));
        assert!(summary.contains(&("audio", "none".to_string())));
    }

    #[test]
    fn test_parse_audio_only_stream_duration() {
        let json = r#"{
            "streams": [{"codec_type": "audio", "codec_name": "pcm_s16le",
                         "sample_rate": "44100", "channels": 1, "duration": "10.0"}],
            "format": {}
        }"#;
        let info = parse_probe_output(json.as_bytes()).unwrap();
        assert!(!info.has_video());
        assert!(info.has_audio());
        assert!((info.duration - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(parse_probe_output(b"not json").is_err());
    }
}
