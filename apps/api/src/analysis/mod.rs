//! External media-analysis collaborators, each behind a trait so the
//! pipeline can be exercised without ffmpeg or the inference services.

pub mod emotion;
pub mod ffmpeg;
pub mod transcribe;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Failed(String),
}

/// Derives a mono 16 kHz WAV from a video file.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    async fn extract(&self, video: &Path, audio: &Path) -> Result<(), MediaError>;
}

/// Produces a transcript from an audio file.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<String, MediaError>;
}

/// Dumps every `stride`-th decoded frame of a video as JPEG files into
/// `out_dir`, returning the frame paths in decode order.
#[async_trait]
pub trait FrameSampler: Send + Sync {
    async fn sample(
        &self,
        video: &Path,
        out_dir: &Path,
        stride: u32,
    ) -> Result<Vec<PathBuf>, MediaError>;
}

/// Classifies the dominant emotion of a single frame image.
#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    async fn classify(&self, frame: &[u8]) -> Result<String, MediaError>;
}
