//! Provider-fallback JSON generation.
//!
//! `JsonGenerator` is the single entry point for structured LLM output: it
//! tries each configured provider in the resolved order, requesting native
//! strict-JSON mode first with one prompted retry per provider, and extracts
//! a JSON object from whatever text comes back.

pub mod providers;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

use self::providers::{
    AzureClient, GeminiClient, GroqClient, JsonMode, JsonProvider, ProviderError, ProviderKind,
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum LlmError {
    /// Every provider in the resolved order failed; carries the last error.
    #[error("all providers exhausted, last error from {provider}: {source}")]
    AllProvidersExhausted {
        provider: &'static str,
        #[source]
        source: ProviderError,
    },

    #[error("no LLM providers are configured")]
    NoProviders,
}

/// Moves the preferred provider to the front of the configured order,
/// prepending it if absent. The rest keep their relative order; nothing is
/// removed.
pub fn resolve_order(
    preferred: Option<ProviderKind>,
    configured: &[ProviderKind],
) -> Vec<ProviderKind> {
    let mut order = Vec::with_capacity(configured.len() + 1);
    if let Some(p) = preferred {
        order.push(p);
    }
    for &kind in configured {
        if !order.contains(&kind) {
            order.push(kind);
        }
    }
    order
}

/// The provider chain, resolved once at startup.
pub struct JsonGenerator {
    providers: Vec<Arc<dyn JsonProvider>>,
}

impl JsonGenerator {
    pub fn new(providers: Vec<Arc<dyn JsonProvider>>) -> Self {
        Self { providers }
    }

    /// Builds the chain from configuration. Providers without credentials are
    /// skipped with a warning; an unknown name in the order is skipped too.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(HTTP_TIMEOUT).build()?;

        let configured: Vec<ProviderKind> = match &config.ai_provider_order {
            Some(raw) => raw
                .split(',')
                .filter_map(|name| {
                    let kind = ProviderKind::parse(name);
                    if kind.is_none() && !name.trim().is_empty() {
                        warn!(name = name.trim(), "unknown provider in AI_PROVIDER_ORDER, skipping");
                    }
                    kind
                })
                .collect(),
            None => ProviderKind::DEFAULT_ORDER.to_vec(),
        };
        let preferred = config.ai_provider.as_deref().and_then(ProviderKind::parse);

        let mut providers: Vec<Arc<dyn JsonProvider>> = Vec::new();
        for kind in resolve_order(preferred, &configured) {
            match kind {
                ProviderKind::Groq => match &config.groq_api_key {
                    Some(key) => providers.push(Arc::new(GroqClient::new(
                        http.clone(),
                        key.clone(),
                        config.groq_model.clone(),
                    ))),
                    None => warn!("GROQ_API_KEY not set, skipping groq"),
                },
                ProviderKind::Gemini => match &config.gemini_api_key {
                    Some(key) => providers.push(Arc::new(GeminiClient::new(
                        http.clone(),
                        key.clone(),
                        config.gemini_model.clone(),
                    ))),
                    None => warn!("GEMINI_API_KEY not set, skipping gemini"),
                },
                ProviderKind::Azure => {
                    match (
                        &config.azure_openai_endpoint,
                        &config.azure_openai_key,
                        &config.azure_openai_deployment,
                    ) {
                        (Some(endpoint), Some(key), Some(deployment)) => {
                            providers.push(Arc::new(AzureClient::new(
                                http.clone(),
                                endpoint.clone(),
                                key.clone(),
                                deployment.clone(),
                                config.azure_openai_api_version.clone(),
                            )))
                        }
                        _ => warn!("Azure OpenAI settings incomplete, skipping azure"),
                    }
                }
            }
        }

        Ok(Self { providers })
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// (system, user, temperature) → parsed JSON object. Tries providers in
    /// order; the first success short-circuits. If all fail, only the last
    /// error is surfaced.
    pub async fn generate(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<Value, LlmError> {
        let mut last: Option<(&'static str, ProviderError)> = None;

        for provider in &self.providers {
            match try_provider(provider.as_ref(), system, user, temperature).await {
                Ok(value) => {
                    debug!(provider = provider.name(), "LLM call succeeded");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "LLM provider failed");
                    last = Some((provider.name(), e));
                }
            }
        }

        match last {
            Some((provider, source)) => Err(LlmError::AllProvidersExhausted { provider, source }),
            None => Err(LlmError::NoProviders),
        }
    }
}

/// One provider attempt: native strict-JSON mode, then at most one prompted
/// retry on the same provider. This is a mode-compatibility retry, not a
/// resilience retry.
async fn try_provider(
    provider: &dyn JsonProvider,
    system: &str,
    user: &str,
    temperature: f32,
) -> Result<Value, ProviderError> {
    let text = match provider
        .generate(system, user, temperature, JsonMode::Native)
        .await
    {
        Ok(text) => text,
        Err(e) => {
            warn!(
                provider = provider.name(),
                error = %e,
                "native JSON mode failed, retrying prompted"
            );
            provider
                .generate(system, user, temperature, JsonMode::Prompted)
                .await?
        }
    };

    extract_json_object(&text)
        .ok_or_else(|| ProviderError::MalformedJson(snippet(&text)))
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(200) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// Provider-agnostic extraction: direct parse, then markdown fence strip,
/// then the first balanced `{...}` span. Returns None unless the result is a
/// JSON object.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let raw = text.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(value) = parse_object(raw) {
        return Some(value);
    }
    let stripped = strip_json_fences(raw);
    if let Some(value) = parse_object(stripped) {
        return Some(value);
    }
    parse_object(balanced_object_span(stripped)?)
}

fn parse_object(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// The first `{...}` span with balanced braces, ignoring braces inside JSON
/// strings.
fn balanced_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in text.bytes().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    #[test]
    fn extracts_direct_json() {
        assert_eq!(extract_json_object("{\"a\":1}"), Some(json!({"a": 1})));
    }

    #[test]
    fn extracts_fenced_json() {
        let fenced = "```json\n{\"a\":1}\n```";
        assert_eq!(extract_json_object(fenced), Some(json!({"a": 1})));
    }

    #[test]
    fn extracts_object_after_leading_prose() {
        let noisy = "Sure, here is the result:\n{\"a\": 1, \"b\": \"x}y\"} trailing";
        assert_eq!(
            extract_json_object(noisy),
            Some(json!({"a": 1, "b": "x}y"}))
        );
    }

    #[test]
    fn rejects_non_objects() {
        assert_eq!(extract_json_object("[1, 2, 3]"), None);
        assert_eq!(extract_json_object("just words"), None);
        assert_eq!(extract_json_object(""), None);
    }

    #[test]
    fn preferred_provider_moves_to_front() {
        use ProviderKind::*;
        assert_eq!(
            resolve_order(Some(Gemini), &[Groq, Gemini, Azure]),
            vec![Gemini, Groq, Azure]
        );
    }

    #[test]
    fn preferred_provider_is_prepended_when_absent() {
        use ProviderKind::*;
        assert_eq!(
            resolve_order(Some(Azure), &[Groq, Gemini]),
            vec![Azure, Groq, Gemini]
        );
    }

    #[test]
    fn no_preference_keeps_configured_order() {
        use ProviderKind::*;
        assert_eq!(
            resolve_order(None, &[Groq, Gemini, Azure]),
            vec![Groq, Gemini, Azure]
        );
    }

    struct StubProvider {
        name: &'static str,
        payload: Option<String>,
        calls: AtomicUsize,
        fail_native: bool,
    }

    impl StubProvider {
        fn succeeding(name: &'static str, payload: &str) -> Arc<Self> {
            Arc::new(Self {
                name,
                payload: Some(payload.to_string()),
                calls: AtomicUsize::new(0),
                fail_native: false,
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                payload: None,
                calls: AtomicUsize::new(0),
                fail_native: false,
            })
        }

        fn native_incompatible(name: &'static str, payload: &str) -> Arc<Self> {
            Arc::new(Self {
                name,
                payload: Some(payload.to_string()),
                calls: AtomicUsize::new(0),
                fail_native: true,
            })
        }
    }

    #[async_trait]
    impl JsonProvider for StubProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn generate(
            &self,
            _system: &str,
            _user: &str,
            _temperature: f32,
            mode: JsonMode,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_native && mode == JsonMode::Native {
                return Err(ProviderError::Api {
                    status: 400,
                    message: "response_format not supported".to_string(),
                });
            }
            match &self.payload {
                Some(p) => Ok(p.clone()),
                None => Err(ProviderError::Api {
                    status: 500,
                    message: format!("{} is down", self.name),
                }),
            }
        }
    }

    #[tokio::test]
    async fn falls_back_to_the_first_succeeding_provider() {
        let third = StubProvider::succeeding("azure", "{\"winner\": \"azure\"}");
        let generator = JsonGenerator::new(vec![
            StubProvider::failing("groq"),
            StubProvider::failing("gemini"),
            third,
        ]);

        let value = generator.generate("sys", "user", 0.2).await.unwrap();
        assert_eq!(value, json!({"winner": "azure"}));
    }

    #[tokio::test]
    async fn surfaces_the_last_error_when_all_fail() {
        let generator = JsonGenerator::new(vec![
            StubProvider::failing("groq"),
            StubProvider::failing("gemini"),
        ]);

        let err = generator.generate("sys", "user", 0.2).await.unwrap_err();
        match err {
            LlmError::AllProvidersExhausted { provider, .. } => assert_eq!(provider, "gemini"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn retries_prompted_mode_once_on_the_same_provider() {
        let provider = StubProvider::native_incompatible("groq", "{\"ok\": true}");
        let generator = JsonGenerator::new(vec![provider.clone()]);

        let value = generator.generate("sys", "user", 0.2).await.unwrap();
        assert_eq!(value, json!({"ok": true}));
        // One native attempt plus exactly one prompted retry.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_chain_reports_no_providers() {
        let generator = JsonGenerator::new(vec![]);
        let err = generator.generate("sys", "user", 0.2).await.unwrap_err();
        assert!(matches!(err, LlmError::NoProviders));
    }
}
