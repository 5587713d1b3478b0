//! Concrete LLM provider clients.
//!
//! ARCHITECTURAL RULE: No other module may call a provider API directly.
//! All LLM interactions go through `llm::JsonGenerator`, which walks these
//! clients in the resolved fallback order.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Instruction appended to the user prompt on the prompted-JSON retry.
pub const JSON_ONLY_SUFFIX: &str = "\n\nReturn STRICT JSON only. No markdown. No extra text.";

/// The closed set of supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Groq,
    Gemini,
    Azure,
}

impl ProviderKind {
    pub const DEFAULT_ORDER: [ProviderKind; 3] =
        [ProviderKind::Groq, ProviderKind::Gemini, ProviderKind::Azure];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Groq => "groq",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Azure => "azure",
        }
    }

    pub fn parse(name: &str) -> Option<ProviderKind> {
        match name.trim().to_ascii_lowercase().as_str() {
            "groq" => Some(ProviderKind::Groq),
            "gemini" => Some(ProviderKind::Gemini),
            "azure" => Some(ProviderKind::Azure),
            _ => None,
        }
    }
}

/// How JSON output is requested. `Native` uses the provider's structured
/// response mode; `Prompted` drops it and appends a plain-text instruction
/// instead, for models that reject the native mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonMode {
    Native,
    Prompted,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("provider returned empty content")]
    EmptyContent,

    #[error("no JSON object in provider response: {0}")]
    MalformedJson(String),
}

/// One text-generation backend. Implementations must be cheap to call
/// repeatedly; the fallback chain may try each one up to twice per request
/// (native mode, then the prompted retry).
#[async_trait]
pub trait JsonProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        mode: JsonMode,
    ) -> Result<String, ProviderError>;
}

// OpenAI-style chat completion response, shared by Groq and Azure.
#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

fn first_choice_text(completion: ChatCompletion) -> Result<String, ProviderError> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(ProviderError::EmptyContent)
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ProviderError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Groq Cloud, OpenAI-compatible chat completions.
pub struct GroqClient {
    http: Client,
    api_key: String,
    model: String,
}

impl GroqClient {
    pub fn new(http: Client, api_key: String, model: String) -> Self {
        Self {
            http,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl JsonProvider for GroqClient {
    fn name(&self) -> &'static str {
        ProviderKind::Groq.as_str()
    }

    async fn generate(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        mode: JsonMode,
    ) -> Result<String, ProviderError> {
        let user = match mode {
            JsonMode::Native => user.to_string(),
            JsonMode::Prompted => format!("{user}{JSON_ONLY_SUFFIX}"),
        };
        let mut body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": temperature,
        });
        if mode == JsonMode::Native {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let response = self
            .http
            .post(GROQ_API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let completion: ChatCompletion = error_for_status(response).await?.json().await?;
        first_choice_text(completion)
    }
}

/// Google Gemini via the generateContent REST endpoint.
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(http: Client, api_key: String, model: String) -> Self {
        // list_models() returns names like "models/gemini-2.0-flash" but the
        // endpoint path takes the bare model name. Normalize for safety.
        let model = model
            .strip_prefix("models/")
            .map(str::to_string)
            .unwrap_or(model);
        Self {
            http,
            api_key,
            model,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[async_trait]
impl JsonProvider for GeminiClient {
    fn name(&self) -> &'static str {
        ProviderKind::Gemini.as_str()
    }

    async fn generate(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        mode: JsonMode,
    ) -> Result<String, ProviderError> {
        let user = match mode {
            JsonMode::Native => user.to_string(),
            JsonMode::Prompted => format!("{user}{JSON_ONLY_SUFFIX}"),
        };
        let mut generation_config = json!({ "temperature": temperature });
        if mode == JsonMode::Native {
            generation_config["responseMimeType"] = json!("application/json");
        }
        let body = json!({
            "system_instruction": { "parts": [{ "text": system }] },
            "contents": [{ "parts": [{ "text": user }] }],
            "generationConfig": generation_config,
        });

        let url = format!(
            "{GEMINI_API_BASE}/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let response = self.http.post(&url).json(&body).send().await?;
        let parsed: GeminiResponse = error_for_status(response).await?.json().await?;

        parsed
            .candidates
            .and_then(|mut c| if c.is_empty() { None } else { Some(c.remove(0)) })
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .and_then(|p| p.into_iter().find_map(|part| part.text))
            .filter(|text| !text.trim().is_empty())
            .ok_or(ProviderError::EmptyContent)
    }
}

/// Azure OpenAI, deployment-scoped chat completions.
pub struct AzureClient {
    http: Client,
    endpoint: String,
    api_key: String,
    deployment: String,
    api_version: String,
}

impl AzureClient {
    pub fn new(
        http: Client,
        endpoint: String,
        api_key: String,
        deployment: String,
        api_version: String,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            deployment,
            api_version,
        }
    }
}

#[async_trait]
impl JsonProvider for AzureClient {
    fn name(&self) -> &'static str {
        ProviderKind::Azure.as_str()
    }

    async fn generate(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        mode: JsonMode,
    ) -> Result<String, ProviderError> {
        let user = match mode {
            JsonMode::Native => user.to_string(),
            JsonMode::Prompted => format!("{user}{JSON_ONLY_SUFFIX}"),
        };
        let mut body = json!({
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": temperature,
        });
        if mode == JsonMode::Native {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        );
        let response = self
            .http
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let completion: ChatCompletion = error_for_status(response).await?.json().await?;
        first_choice_text(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_known_names_case_insensitively() {
        assert_eq!(ProviderKind::parse("groq"), Some(ProviderKind::Groq));
        assert_eq!(ProviderKind::parse(" Gemini "), Some(ProviderKind::Gemini));
        assert_eq!(ProviderKind::parse("AZURE"), Some(ProviderKind::Azure));
    }

    #[test]
    fn parse_rejects_unknown_names() {
        assert_eq!(ProviderKind::parse("openai"), None);
        assert_eq!(ProviderKind::parse(""), None);
    }
}
