use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::{MediaError, Transcriber};

/// Whisper-style transcription service client. Sends the WAV as multipart
/// and expects `{"text": "..."}` back.
pub struct HttpTranscriber {
    http: Client,
    url: String,
}

impl HttpTranscriber {
    pub fn new(http: Client, url: String) -> Self {
        Self { http, url }
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio: &Path) -> Result<String, MediaError> {
        let bytes = tokio::fs::read(audio).await?;
        let part = Part::bytes(bytes)
            .file_name("answer.wav")
            .mime_str("audio/wav")?;
        let form = Form::new().part("file", part);

        let response = self.http.post(&self.url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::Failed(format!(
                "transcription service returned {status}: {body}"
            )));
        }

        let body: TranscriptionResponse = response.json().await?;
        let transcript = body.text.trim().to_string();
        info!(chars = transcript.len(), "transcription complete");
        Ok(transcript)
    }
}
