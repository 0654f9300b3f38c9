use std::path::Path;
use std::process::Command;

use avkit_media::{check_ffmpeg, check_ffprobe};
use avkit_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "worker-selfcheck: starting with upload_dir={} output_dir={}",
        config.upload_dir.display(),
        config.output_dir.display()
    );
    ensure_writable(&config.upload_dir).await?;
    ensure_writable(&config.output_dir).await?;
    ensure_binary("ffmpeg", check_ffmpeg()?.as_path())?;
    ensure_binary("ffprobe", check_ffprobe()?.as_path())?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_writable(dir: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(dir).await?;

    let probe = dir.join(".avkit-selfcheck");
    tokio::fs::write(&probe, b"ok")
        .await
        .map_err(|e| anyhow::anyhow!("{} is not writable: {}", dir.display(), e))?;
    tokio::fs::remove_file(&probe).await?;
    Ok(())
}

fn ensure_binary(name: &str, path: &Path) -> anyhow::Result<()> {
    let output = Command::new(path)
        .arg("-version")
        .output()
        .map_err(|e| anyhow::anyhow!("{} not available: {}", name, e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "{} -version failed: {:?}",
            name,
            output.status
        ));
    }
    Ok(())
}
