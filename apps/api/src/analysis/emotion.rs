use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{EmotionClassifier, FrameSampler, MediaError};

/// Every Nth decoded frame is classified; the rest are dropped.
pub const FRAME_STRIDE: u32 = 15;

const FALLBACK_EMOTION: &str = "neutral";
const LOW_CONFIDENCE: &str = "low";
const HIGH_CONFIDENCE: &str = "high";

/// Facial-emotion classification service client. Sends one frame image as
/// multipart and expects `{"dominant_emotion": "..."}` back.
pub struct HttpEmotionClassifier {
    http: Client,
    url: String,
}

impl HttpEmotionClassifier {
    pub fn new(http: Client, url: String) -> Self {
        Self { http, url }
    }
}

#[derive(Debug, Deserialize)]
struct EmotionResponse {
    dominant_emotion: String,
}

#[async_trait]
impl EmotionClassifier for HttpEmotionClassifier {
    async fn classify(&self, frame: &[u8]) -> Result<String, MediaError> {
        let part = Part::bytes(frame.to_vec())
            .file_name("frame.jpg")
            .mime_str("image/jpeg")?;
        let form = Form::new().part("frame", part);

        let response = self.http.post(&self.url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::Failed(format!(
                "emotion service returned {status}"
            )));
        }

        let body: EmotionResponse = response.json().await?;
        Ok(body.dominant_emotion)
    }
}

/// Samples the video, classifies each sampled frame, and reduces to the mode
/// label. This never fails the caller: decode or classification problems
/// degrade to the neutral/low fallback.
pub async fn analyze(
    sampler: &dyn FrameSampler,
    classifier: &dyn EmotionClassifier,
    video: &Path,
    frames_dir: &Path,
) -> (String, String) {
    let frames = match sampler.sample(video, frames_dir, FRAME_STRIDE).await {
        Ok(frames) => frames,
        Err(e) => {
            warn!(error = %e, "frame sampling failed, defaulting emotion");
            return (FALLBACK_EMOTION.to_string(), LOW_CONFIDENCE.to_string());
        }
    };

    let mut labels = Vec::with_capacity(frames.len());
    for frame in &frames {
        let bytes = match tokio::fs::read(frame).await {
            Ok(bytes) => bytes,
            Err(_) => continue,
        };
        match classifier.classify(&bytes).await {
            Ok(label) => labels.push(label),
            Err(e) => {
                // Skipped, not retried.
                debug!(frame = %frame.display(), error = %e, "frame classification failed");
            }
        }
    }

    let (emotion, confidence) = dominant_emotion(&labels);
    info!(%emotion, %confidence, samples = labels.len(), "emotion analysis complete");
    (emotion, confidence)
}

/// Mode of the collected labels, ties broken by first occurrence. Zero
/// labels falls back to neutral with low confidence. Confidence is high only
/// for happy or neutral winners.
pub fn dominant_emotion(labels: &[String]) -> (String, String) {
    if labels.is_empty() {
        return (FALLBACK_EMOTION.to_string(), LOW_CONFIDENCE.to_string());
    }

    let mut counts: Vec<(&str, usize)> = Vec::new();
    for label in labels {
        match counts.iter_mut().find(|(seen, _)| *seen == label.as_str()) {
            Some((_, n)) => *n += 1,
            None => counts.push((label.as_str(), 1)),
        }
    }

    let mut winner = labels[0].as_str();
    let mut best = 0;
    for (label, n) in counts {
        if n > best {
            best = n;
            winner = label;
        }
    }

    let confidence = if winner == "happy" || winner == "neutral" {
        HIGH_CONFIDENCE
    } else {
        LOW_CONFIDENCE
    };
    (winner.to_string(), confidence.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn zero_samples_default_to_neutral_low() {
        assert_eq!(
            dominant_emotion(&[]),
            ("neutral".to_string(), "low".to_string())
        );
    }

    #[test]
    fn picks_the_most_frequent_label() {
        let labels = labels(&["sad", "happy", "happy", "angry", "happy"]);
        assert_eq!(
            dominant_emotion(&labels),
            ("happy".to_string(), "high".to_string())
        );
    }

    #[test]
    fn non_calm_winner_gets_low_confidence() {
        let labels = labels(&["angry", "angry", "neutral"]);
        assert_eq!(
            dominant_emotion(&labels),
            ("angry".to_string(), "low".to_string())
        );
    }

    #[test]
    fn neutral_winner_gets_high_confidence() {
        let labels = labels(&["neutral", "neutral", "sad"]);
        assert_eq!(
            dominant_emotion(&labels),
            ("neutral".to_string(), "high".to_string())
        );
    }

    #[test]
    fn ties_resolve_to_the_first_seen_label() {
        let labels = labels(&["sad", "angry", "sad", "angry"]);
        assert_eq!(dominant_emotion(&labels).0, "sad");
    }
}
