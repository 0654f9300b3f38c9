//! End-to-end operation tests against the real ffmpeg/ffprobe binaries.
//!
//! Inputs are generated with lavfi sources, so no media fixtures are needed.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use avkit_media::{
    probe_media, FfmpegCommand, FfmpegOperation, FfmpegRunner, MediaOperation, OperationRequest,
    PublishGate,
};
use avkit_models::{
    EncodingConfig, JobId, MergeMethod, OperationParams, Resolution, RgbColor, SynthesisParams,
};

async fn run(cmd: FfmpegCommand) {
    FfmpegRunner::new()
        .run_with_progress(&cmd, |_| {})
        .await
        .expect("Failed to generate test media");
}

/// H.264 test pattern, with a sine tone when `tone` is set.
async fn make_video(path: &Path, size: &str, seconds: f64, tone: bool) {
    let mut cmd = FfmpegCommand::new(path).lavfi(format!(
        "testsrc=size={}:rate=25:duration={}",
        size, seconds
    ));
    if tone {
        cmd = cmd
            .lavfi(format!("sine=frequency=440:duration={}", seconds))
            .map("0:v:0")
            .map("1:a:0")
            .audio_codec("aac");
    }
    run(cmd.video_codec("libx264").pixel_format("yuv420p")).await;
}

async fn make_tone(path: &Path, seconds: f64) {
    run(FfmpegCommand::new(path).lavfi(format!("sine=frequency=330:duration={}", seconds))).await;
}

async fn execute(inputs: Vec<PathBuf>, output: PathBuf, params: OperationParams) -> PathBuf {
    let operation = FfmpegOperation::new(EncodingConfig::default());
    let request = OperationRequest {
        job_id: JobId::new(),
        inputs,
        output_path: output,
        params,
        gate: PublishGate::new(),
    };
    operation.execute(request).await.expect("Operation failed")
}

fn red_640x480_24fps() -> OperationParams {
    OperationParams::AudioToVideo(SynthesisParams {
        resolution: Resolution::new(640, 480),
        fps: 24,
        color: RgbColor::new(255, 0, 0),
    })
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_concatenate_duration_is_sum_of_inputs() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.mp4");
    let b = dir.path().join("b.mp4");
    make_video(&a, "640x360", 5.0, true).await;
    make_video(&b, "320x240", 3.0, false).await;

    let broken = dir.path().join("broken.mp4");
    std::fs::write(&broken, b"not a video").unwrap();

    let output = dir.path().join("out").join("merged.mp4");
    let published = execute(
        vec![a, broken, b],
        output.clone(),
        OperationParams::Merge {
            method: MergeMethod::Concatenate,
        },
    )
    .await;
    assert_eq!(published, output);

    let info = probe_media(&output).await.unwrap();
    assert!((info.duration - 8.0).abs() < 0.3, "duration {}", info.duration);
    let video = info.video.unwrap();
    assert_eq!((video.width, video.height), (640, 360));
    assert!(info.audio.is_some());
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_overlay_keeps_base_duration_and_size() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("base.mp4");
    let corner = dir.path().join("corner.mp4");
    make_video(&base, "640x480", 4.0, true).await;
    make_video(&corner, "320x240", 2.0, false).await;

    let output = dir.path().join("overlay.mp4");
    execute(
        vec![base, corner],
        output.clone(),
        OperationParams::Merge {
            method: MergeMethod::Overlay,
        },
    )
    .await;

    let info = probe_media(&output).await.unwrap();
    assert!((info.duration - 4.0).abs() < 0.3, "duration {}", info.duration);
    let video = info.video.unwrap();
    assert_eq!((video.width, video.height), (640, 480));
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_audio_to_video_red_640x480_24fps() {
    let dir = TempDir::new().unwrap();
    let tone = dir.path().join("a.wav");
    make_tone(&tone, 3.0).await;

    let output = dir.path().join("a_video.mp4");
    execute(vec![tone.clone()], output.clone(), red_640x480_24fps()).await;

    let audio = probe_media(&tone).await.unwrap();
    let info = probe_media(&output).await.unwrap();
    assert!(
        (info.duration - audio.duration).abs() < 0.1,
        "video {} vs audio {}",
        info.duration,
        audio.duration
    );

    let video = info.video.unwrap();
    assert_eq!((video.width, video.height), (640, 480));
    assert!((video.fps - 24.0).abs() < 0.01, "fps {}", video.fps);
    assert_eq!(info.audio.unwrap().codec, "aac");

    // First frame as raw RGB: every pixel should be red after yuv420p round-trip
    let frame = dir.path().join("frame.rgb");
    run(FfmpegCommand::new(&frame)
        .input(&output)
        .output_args(["-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgb24"]))
    .await;
    let pixels = std::fs::read(&frame).unwrap();
    assert_eq!(pixels.len(), 640 * 480 * 3);
    assert!(pixels
        .chunks_exact(3)
        .all(|p| p[0] > 235 && p[1] < 20 && p[2] < 20));
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_audio_to_video_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let tone = dir.path().join("tone.wav");
    make_tone(&tone, 2.0).await;

    let first = dir.path().join("first.mp4");
    let second = dir.path().join("second.mp4");
    execute(vec![tone.clone()], first.clone(), red_640x480_24fps()).await;
    execute(vec![tone], second.clone(), red_640x480_24fps()).await;

    let first = std::fs::read(first).unwrap();
    let second = std::fs::read(second).unwrap();
    assert!(!first.is_empty());
    assert!(first == second, "outputs differ");
}
