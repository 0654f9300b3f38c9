//! FFmpeg filter graph builders for merging and synthesis.

use avkit_models::encoding::{DEFAULT_PIXEL_FORMAT, MERGE_SAMPLE_RATE};
use avkit_models::SynthesisParams;

use crate::probe::MediaInfo;

/// Maximum number of clips composited over the base in overlay mode.
pub const MAX_OVERLAYS: usize = 4;

/// Label of the final video stream in every graph.
pub const VIDEO_OUT: &str = "[outv]";
/// Label of the final audio stream in the concat graph.
pub const AUDIO_OUT: &str = "[outa]";

/// A built `-filter_complex` graph and the labels to map.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGraph {
    pub graph: String,
    pub video_out: String,
    /// Audio label produced by the graph, `None` when audio is mapped
    /// straight from an input or there is none.
    pub audio_out: Option<String>,
}

/// Round down to the nearest even number, never below 2.
///
/// yuv420p needs even dimensions.
pub fn even_floor(n: u32) -> u32 {
    (n - n % 2).max(2)
}

/// Format a frame rate for filter arguments without float noise.
fn format_rate(fps: f64) -> String {
    if (fps - fps.round()).abs() < 1e-6 {
        format!("{}", fps.round() as u64)
    } else {
        format!("{:.3}", fps)
    }
}

/// Common output geometry for a concatenation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConcatLayout {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

impl ConcatLayout {
    /// Largest width, height and frame rate among the inputs.
    pub fn from_inputs<'a>(inputs: impl IntoIterator<Item = &'a MediaInfo>) -> Self {
        let mut width = 0;
        let mut height = 0;
        let mut fps: f64 = 0.0;

        for video in inputs.into_iter().filter_map(|i| i.video.as_ref()) {
            width = width.max(video.width);
            height = height.max(video.height);
            fps = fps.max(video.fps);
        }

        Self {
            width: even_floor(width),
            height: even_floor(height),
            fps: if fps > 0.0 { fps } else { 30.0 },
        }
    }
}

/// One input of a concatenation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConcatSegment {
    /// FFmpeg input index
    pub input_index: usize,
    /// Probed duration in seconds
    pub duration: f64,
    /// Whether the input carries an audio stream
    pub has_audio: bool,
}

/// Build a concat graph joining `segments` in order.
///
/// Every segment is scaled into the layout (aspect preserved, centered
/// pad) and brought to the layout frame rate. When any segment has audio,
/// each segment contributes exactly its own duration of 44.1 kHz stereo
/// audio, generated as silence where the input has none, so the audio and
/// video stay aligned across joins. When no segment has audio the output
/// is video only.
pub fn concat_filter(segments: &[ConcatSegment], layout: &ConcatLayout) -> FilterGraph {
    let with_audio = segments.iter().any(|s| s.has_audio);
    let rate = format_rate(layout.fps);
    let (w, h) = (layout.width, layout.height);

    let mut chains = Vec::with_capacity(segments.len() * 2 + 1);
    let mut concat_inputs = String::new();

    for (n, segment) in segments.iter().enumerate() {
        let i = segment.input_index;
        chains.push(format!(
            "[{i}:v:0]scale={w}:{h}:force_original_aspect_ratio=decrease:force_divisible_by=2,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={rate},format={fmt},\
             setpts=PTS-STARTPTS[v{n}]",
            fmt = DEFAULT_PIXEL_FORMAT,
        ));
        concat_inputs.push_str(&format!("[v{n}]"));

        if with_audio {
            let d = format!("{:.3}", segment.duration);
            if segment.has_audio {
                chains.push(format!(
                    "[{i}:a:0]aresample={sr},aformat=sample_fmts=fltp:channel_layouts=stereo,\
                     apad,atrim=0:{d},asetpts=PTS-STARTPTS[a{n}]",
                    sr = MERGE_SAMPLE_RATE,
                ));
            } else {
                chains.push(format!(
                    "anullsrc=r={sr}:cl=stereo,aformat=sample_fmts=fltp,atrim=0:{d},\
                     asetpts=PTS-STARTPTS[a{n}]",
                    sr = MERGE_SAMPLE_RATE,
                ));
            }
            concat_inputs.push_str(&format!("[a{n}]"));
        }
    }

    let audio_flag = if with_audio { 1 } else { 0 };
    let outputs = if with_audio {
        format!("{VIDEO_OUT}{AUDIO_OUT}")
    } else {
        VIDEO_OUT.to_string()
    };
    chains.push(format!(
        "{concat_inputs}concat=n={}:v=1:a={audio_flag}{outputs}",
        segments.len()
    ));

    FilterGraph {
        graph: chains.join(";"),
        video_out: VIDEO_OUT.to_string(),
        audio_out: with_audio.then(|| AUDIO_OUT.to_string()),
    }
}

/// Corner an overlay clip is placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// Placement order of overlay clips.
    pub const ORDER: [Corner; MAX_OVERLAYS] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// `overlay` x/y expressions. `W`/`H` are the base size and `w`/`h`
    /// the size of this clip after scaling.
    pub fn position(&self) -> (&'static str, &'static str) {
        match self {
            Corner::TopLeft => ("0", "0"),
            Corner::TopRight => ("W-w", "0"),
            Corner::BottomLeft => ("0", "H-h"),
            Corner::BottomRight => ("W-w", "H-h"),
        }
    }
}

/// Build a picture-in-picture graph.
///
/// Input 0 is the base layer, inputs `1..=overlay_count` are scaled to a
/// quarter of the base size and placed in corners in input order. Extra
/// inputs beyond [`MAX_OVERLAYS`] are ignored. An overlay that ends early
/// disappears and the base continues on its own.
pub fn overlay_filter(base_width: u32, base_height: u32, overlay_count: usize) -> FilterGraph {
    let count = overlay_count.min(MAX_OVERLAYS);
    let qw = even_floor(base_width / 4);
    let qh = even_floor(base_height / 4);

    let mut chains = Vec::with_capacity(count * 2 + 1);
    let mut current = "[0:v:0]".to_string();

    for (n, corner) in Corner::ORDER.iter().take(count).enumerate() {
        let input = n + 1;
        let (x, y) = corner.position();
        chains.push(format!("[{input}:v:0]scale={qw}:{qh},setsar=1[ov{input}]"));
        let next = format!("[base{input}]");
        chains.push(format!(
            "{current}[ov{input}]overlay=x={x}:y={y}:eof_action=pass{next}"
        ));
        current = next;
    }

    chains.push(format!("{current}format={DEFAULT_PIXEL_FORMAT}{VIDEO_OUT}"));

    FilterGraph {
        graph: chains.join(";"),
        video_out: VIDEO_OUT.to_string(),
        audio_out: None,
    }
}

/// Constant-color `lavfi` source for audio-to-video synthesis.
pub fn color_source(params: &SynthesisParams) -> String {
    format!(
        "color=c={}:s={}x{}:r={}",
        params.color.to_ffmpeg_hex(),
        params.resolution.width,
        params.resolution.height,
        params.fps
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::VideoStreamInfo;
    use avkit_models::{Resolution, RgbColor};

    fn video(width: u32, height: u32, fps: f64) -> MediaInfo {
        MediaInfo {
            duration: 5.0,
            size: 0,
            video: Some(VideoStreamInfo {
                width,
                height,
                fps,
                codec: "h264".to_string(),
            }),
            audio: None,
        }
    }

    #[test]
    fn test_even_floor() {
        assert_eq!(even_floor(1080), 1080);
        assert_eq!(even_floor(481), 480);
        assert_eq!(even_floor(1), 2);
        assert_eq!(even_floor(0), 2);
    }

    #[test]
    fn test_concat_layout_takes_maximums() {
        let inputs = [video(1280, 720, 25.0), video(641, 1080, 30.0)];
        let layout = ConcatLayout::from_inputs(inputs.iter());
        assert_eq!(layout.width, 1280);
        assert_eq!(layout.height, 1080);
        assert!((layout.fps - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_concat_filter_with_silence_padding() {
        let layout = ConcatLayout {
            width: 1280,
            height: 720,
            fps: 30.0,
        };
        let segments = [
            ConcatSegment {
                input_index: 0,
                duration: 5.0,
                has_audio: true,
            },
            ConcatSegment {
                input_index: 1,
                duration: 3.0,
                has_audio: false,
            },
        ];

        let fg = concat_filter(&segments, &layout);
        assert!(fg.graph.contains("[0:v:0]scale=1280:720"));
        assert!(fg.graph.contains("fps=30,"));
        assert!(fg.graph.contains("[0:a:0]aresample=44100"));
        assert!(fg.graph.contains("anullsrc=r=44100:cl=stereo"));
        assert!(fg.graph.contains("atrim=0:3.000"));
        assert!(fg
            .graph
            .ends_with("[v0][a0][v1][a1]concat=n=2:v=1:a=1[outv][outa]"));
        assert_eq!(fg.audio_out.as_deref(), Some("[outa]"));
    }

    #[test]
    fn test_concat_filter_video_only() {
        let layout = ConcatLayout {
            width: 640,
            height: 480,
            fps: 29.97,
        };
        let segments = [
            ConcatSegment {
                input_index: 0,
                duration: 2.0,
                has_audio: false,
            },
            ConcatSegment {
                input_index: 1,
                duration: 2.0,
                has_audio: false,
            },
        ];

        let fg = concat_filter(&segments, &layout);
        assert!(fg.graph.contains("fps=29.970"));
        assert!(!fg.graph.contains("anullsrc"));
        assert!(fg.graph.ends_with("[v0][v1]concat=n=2:v=1:a=0[outv]"));
        assert!(fg.audio_out.is_none());
    }

    #[test]
    fn test_overlay_filter_corners() {
        let fg = overlay_filter(1920, 1080, 4);
        assert!(fg.graph.contains("[1:v:0]scale=480:270,setsar=1[ov1]"));
        assert!(fg.graph.contains("[0:v:0][ov1]overlay=x=0:y=0:eof_action=pass[base1]"));
        assert!(fg.graph.contains("[base1][ov2]overlay=x=W-w:y=0"));
        assert!(fg.graph.contains("[base2][ov3]overlay=x=0:y=H-h"));
        assert!(fg.graph.contains("[base3][ov4]overlay=x=W-w:y=H-h"));
        assert!(fg.graph.ends_with("[base4]format=yuv420p[outv]"));
    }

    #[test]
    fn test_overlay_filter_caps_overlays_and_rounds_even() {
        let fg = overlay_filter(1000, 750, 6);
        // 750 / 4 = 187 rounds down to 186
        assert!(fg.graph.contains("scale=250:186"));
        assert!(!fg.graph.contains("[5:v:0]"));
    }

    #[test]
    fn test_color_source() {
        let params = SynthesisParams {
            resolution: Resolution::new(640, 480),
            fps: 24,
            color: RgbColor::new(255, 0, 0),
        };
        assert_eq!(color_source(&params), "color=c=0xFF0000:s=640x480:r=24");
    }
}
