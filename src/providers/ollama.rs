use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, error, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::app_config::ProviderConfig;
use crate::errors::{ProviderError, TranslationError};
use crate::translation::{Translation, TranslationClient, TranslationRequest};

/// Ollama client for the `/api/generate` endpoint
pub struct OllamaClient {
    /// Provider settings
    settings: ProviderConfig,
    /// Generate endpoint URL
    generate_url: Url,
    /// HTTP client for making requests
    client: Client,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    stream: bool,
    /// How long to keep the model loaded in memory
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<String>,
}

/// Generation options for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Generation response, or one NDJSON chunk of a streamed response
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub model: String,
    /// Generated text
    #[serde(default)]
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Why generation stopped, on the final chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    /// Number of prompt tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
    /// Error reported in place of a chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: None,
            stream: false,
            keep_alive: None,
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        match &mut self.options {
            Some(options) => options.temperature = Some(temperature),
            None => {
                self.options = Some(GenerationOptions {
                    temperature: Some(temperature),
                    num_predict: None,
                })
            }
        }
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

impl GenerationResponse {
    fn into_translation(self, text: String) -> Translation {
        let mut translation = Translation::new(text).with_usage(self.prompt_eval_count, self.eval_count);
        translation.finish_reason = self.done_reason;
        translation
    }
}

impl OllamaClient {
    /// Create a client for the configured endpoint
    ///
    /// Uses HTTP/1.1 with keep-alive; Ollama does not speak HTTP/2.
    pub fn new(settings: ProviderConfig) -> Result<Self, TranslationError> {
        let base = if settings.endpoint.is_empty() {
            "http://localhost:11434"
        } else {
            settings.endpoint.as_str()
        };
        let generate_url = Url::parse(base)
            .and_then(|url| url.join("api/generate"))
            .map_err(|e| TranslationError::fatal(format!("Invalid Ollama endpoint '{}': {}", base, e)))?;

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .http1_only()
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60));
        // A local server is never reached through a proxy
        if is_loopback(&generate_url) {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| TranslationError::fatal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            settings,
            generate_url,
            client,
        })
    }

    pub fn generate_url(&self) -> &Url {
        &self.generate_url
    }

    async fn post(&self, body: &GenerationRequest) -> Result<reqwest::Response, TranslationError> {
        let response = self
            .client
            .post(self.generate_url.clone())
            .json(body)
            .send()
            .await
            .map_err(ProviderError::from)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to get error response text".to_string());
        error!("Ollama API error ({}): {}", status, error_text);
        Err(ProviderError::ApiError {
            status_code: status.as_u16(),
            message: error_text,
        }
        .into())
    }

    /// Single JSON request and response
    async fn generate(&self, body: &GenerationRequest) -> Result<Translation, TranslationError> {
        let response = self.post(body).await?;
        let response_text = response.text().await.map_err(ProviderError::from)?;

        let generated: GenerationResponse = serde_json::from_str(&response_text).map_err(|e| {
            let preview: String = response_text.chars().take(500).collect();
            error!("Failed to parse Ollama API response: {}. Raw response (first 500 chars): {}", e, preview);
            TranslationError::fatal(format!("Failed to parse Ollama API response: {}", e))
        })?;

        if let Some(message) = &generated.error {
            return Err(TranslationError::fatal(format!("Ollama error: {}", message)));
        }

        let text = generated.response.clone();
        Ok(generated.into_translation(text))
    }

    /// NDJSON streaming; each chunk's text is fed to the request's accumulator
    async fn generate_streaming(
        &self,
        body: &GenerationRequest,
        request: &mut TranslationRequest,
    ) -> Result<Option<Translation>, TranslationError> {
        let response = self.post(body).await?;
        let mut stream = Box::pin(response.bytes_stream());
        let mut pending: Vec<u8> = Vec::new();
        let mut last_chunk: Option<GenerationResponse> = None;

        while let Some(item) = stream.next().await {
            if request.is_aborted() {
                debug!("Stream aborted after {} characters", request.accumulated_text().len());
                return Ok(None);
            }

            let bytes = match item {
                Ok(bytes) => bytes,
                Err(e) => return self.stream_failed(request, ProviderError::ConnectionError(e.to_string())),
            };
            pending.extend_from_slice(&bytes);

            while let Some(newline) = pending.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = pending.drain(..=newline).collect();
                if let Some(chunk) = parse_chunk(&line)? {
                    request.process_streaming_delta(&chunk.response);
                    last_chunk = Some(chunk);
                }
            }
        }

        if let Some(chunk) = parse_chunk(&pending)? {
            request.process_streaming_delta(&chunk.response);
            last_chunk = Some(chunk);
        }

        let text = request.take_streamed_text();
        let translation = match last_chunk {
            Some(chunk) => chunk.into_translation(text),
            None => Translation::new(text),
        };
        Ok(Some(translation))
    }

    /// A stream that breaks after delivering text returns what it has, marked truncated
    fn stream_failed(
        &self,
        request: &mut TranslationRequest,
        error: ProviderError,
    ) -> Result<Option<Translation>, TranslationError> {
        if request.accumulated_text().trim().is_empty() {
            return Err(error.into());
        }

        warn!("Ollama stream failed after partial response: {}", error);
        let mut translation = Translation::new(request.take_streamed_text());
        translation.truncated = true;
        Ok(Some(translation))
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(url::Host::Ipv4(address)) => address.is_loopback(),
        Some(url::Host::Ipv6(address)) => address.is_loopback(),
        None => false,
    }
}

fn parse_chunk(line: &[u8]) -> Result<Option<GenerationResponse>, TranslationError> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let chunk: GenerationResponse = serde_json::from_str(line)
        .map_err(|e| TranslationError::fatal(format!("Failed to parse Ollama stream chunk: {}", e)))?;
    if let Some(message) = &chunk.error {
        return Err(TranslationError::fatal(format!("Ollama error: {}", message)));
    }
    Ok(Some(chunk))
}

#[async_trait]
impl TranslationClient for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    fn settings(&self) -> &ProviderConfig {
        &self.settings
    }

    async fn send_request(
        &self,
        request: &mut TranslationRequest,
        temperature: f32,
    ) -> Result<Option<Translation>, TranslationError> {
        let streaming = request.is_streaming();
        let body = GenerationRequest::new(self.settings.model.clone(), request.prompt.content.clone())
            .system(request.prompt.instructions.clone())
            .temperature(temperature)
            .stream(streaming);

        debug!(
            "Sending {} lines to Ollama model {} (streaming: {})",
            request.prompt.lines.len(),
            self.settings.model,
            streaming
        );

        if streaming {
            return self.generate_streaming(&body, request).await;
        }

        let abort = request.abort_handle().clone();
        tokio::select! {
            result = self.generate(&body) => result.map(Some),
            _ = abort.aborted() => Ok(None),
        }
    }
}
