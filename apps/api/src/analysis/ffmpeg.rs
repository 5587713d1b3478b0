use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use super::{AudioExtractor, FrameSampler, MediaError};

/// ffmpeg-backed media decoding. One subprocess per call, no shared state.
pub struct Ffmpeg;

async fn run_ffmpeg(args: Vec<std::ffi::OsString>) -> Result<(), MediaError> {
    let output = Command::new("ffmpeg").args(&args).output().await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::Failed(format!(
            "ffmpeg error: {}",
            stderr.trim()
        )));
    }
    Ok(())
}

#[async_trait]
impl AudioExtractor for Ffmpeg {
    async fn extract(&self, video: &Path, audio: &Path) -> Result<(), MediaError> {
        let meta = tokio::fs::metadata(video).await.map_err(|_| {
            MediaError::Failed(format!("Video file not found: {}", video.display()))
        })?;
        if meta.len() == 0 {
            return Err(MediaError::Failed(format!(
                "Video file is empty: {}",
                video.display()
            )));
        }

        info!(video = %video.display(), "extracting audio");
        run_ffmpeg(vec![
            "-y".into(),
            "-i".into(),
            video.as_os_str().to_os_string(),
            "-vn".into(),
            "-ac".into(),
            "1".into(),
            "-ar".into(),
            "16000".into(),
            audio.as_os_str().to_os_string(),
        ])
        .await
    }
}

#[async_trait]
impl FrameSampler for Ffmpeg {
    async fn sample(
        &self,
        video: &Path,
        out_dir: &Path,
        stride: u32,
    ) -> Result<Vec<PathBuf>, MediaError> {
        tokio::fs::create_dir_all(out_dir).await?;

        let pattern = out_dir.join("frame_%05d.jpg");
        let filter = format!("select=not(mod(n\\,{stride}))");
        run_ffmpeg(vec![
            "-i".into(),
            video.as_os_str().to_os_string(),
            "-vf".into(),
            filter.into(),
            "-vsync".into(),
            "vfr".into(),
            pattern.as_os_str().to_os_string(),
        ])
        .await?;

        let mut frames = Vec::new();
        let mut entries = tokio::fs::read_dir(out_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "jpg") {
                frames.push(path);
            }
        }
        frames.sort();
        Ok(frames)
    }
}
