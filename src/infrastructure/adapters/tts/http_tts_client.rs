//! HTTP TTS Client - 调用外部 TTS HTTP 服务
//!
//! 实现 TtsEnginePort trait，通过 HTTP 调用 OpenAI 兼容的语音合成接口
//!
//! 外部 TTS API:
//! POST {base_url}/audio/speech
//! Request: {"model": "...", "input": "...", "voice": "...", "response_format": "mp3"}  (JSON)
//! Response: 直接返回音频（`audio/*`），或 JSON 包装（base64 音频或音频 URL）

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use once_cell::sync::Lazy;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::application::ports::{SpeechAudio, SpeechRequest, TtsEnginePort, TtsError};
use crate::domain::JsonPathExtractor;

static AUDIO_PATHS: Lazy<JsonPathExtractor> = Lazy::new(|| {
    JsonPathExtractor::new(vec![
        "audio",
        "data.audio",
        "output.audio.data",
        "output.audio.url",
        "audio_base64",
        "b64",
        "url",
    ])
});

static MIME_PATHS: Lazy<JsonPathExtractor> = Lazy::new(|| {
    JsonPathExtractor::new(vec!["mime_type", "mimeType", "content_type", "format"])
});

/// TTS 请求体 (JSON)
#[derive(Debug, Serialize)]
struct TtsHttpRequest<'a> {
    model: &'a str,
    /// 要合成的文本
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<&'a str>,
    response_format: &'a str,
}

/// HTTP TTS 客户端配置
#[derive(Debug, Clone)]
pub struct HttpTtsClientConfig {
    /// TTS 服务基础 URL
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// 默认音色
    pub voice: Option<String>,
    /// 请求的音频格式
    pub response_format: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpTtsClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1".to_string(),
            api_key: None,
            model: "tts-1".to_string(),
            voice: None,
            response_format: "mp3".to_string(),
            timeout_secs: 30,
        }
    }
}

impl HttpTtsClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }
}

/// 格式名转 MIME
fn format_to_mime(format: &str) -> String {
    if format.contains('/') {
        return format.to_string();
    }
    match format.to_lowercase().as_str() {
        "mp3" | "mpeg" => "audio/mpeg".to_string(),
        "wav" | "pcm" => "audio/wav".to_string(),
        "opus" | "ogg" => "audio/ogg".to_string(),
        "aac" => "audio/aac".to_string(),
        "flac" => "audio/flac".to_string(),
        other => format!("audio/{}", other),
    }
}

/// JSON 包装里找到的音频
#[derive(Debug, PartialEq, Eq)]
enum EnvelopeAudio {
    Bytes(Vec<u8>),
    Url(String),
}

fn parse_envelope(body: &serde_json::Value) -> Result<(EnvelopeAudio, Option<String>), TtsError> {
    let audio = AUDIO_PATHS
        .first_text(body)
        .ok_or_else(|| TtsError::InvalidResponse("No audio in response".to_string()))?;
    let audio = audio.trim();

    let mime = MIME_PATHS.first_text(body).map(|m| format_to_mime(&m));

    if audio.starts_with("http://") || audio.starts_with("https://") {
        return Ok((EnvelopeAudio::Url(audio.to_string()), mime));
    }

    // 可能带 data URL 前缀
    let (data_mime, payload) = match audio.strip_prefix("data:") {
        Some(rest) => match rest.split_once(";base64,") {
            Some((m, p)) => (Some(m.to_string()), p),
            None => (None, audio),
        },
        None => (None, audio),
    };
    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|e| TtsError::InvalidResponse(format!("Invalid base64 audio: {}", e)))?;
    Ok((EnvelopeAudio::Bytes(bytes), mime.or(data_mime)))
}

fn map_send_error(e: reqwest::Error) -> TtsError {
    if e.is_timeout() {
        TtsError::Timeout
    } else if e.is_connect() {
        TtsError::NetworkError(format!("Cannot connect to TTS service: {}", e))
    } else {
        TtsError::NetworkError(e.to_string())
    }
}

/// HTTP TTS 客户端
///
/// 通过 HTTP 调用外部 TTS 服务
pub struct HttpTtsClient {
    client: Client,
    config: HttpTtsClientConfig,
}

impl HttpTtsClient {
    /// 创建新的 HTTP TTS 客户端
    pub fn new(config: HttpTtsClientConfig) -> Result<Self, TtsError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &config.api_key {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", key))
                    .map_err(|e| TtsError::NetworkError(format!("Invalid API key header: {}", e)))?,
            );
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TtsError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// 获取合成 URL
    fn speech_url(&self) -> String {
        format!("{}/audio/speech", self.base_url())
    }

    /// 获取健康检查 URL
    fn health_url(&self) -> String {
        format!("{}/models", self.base_url())
    }

    /// 下载 JSON 包装中给出的音频 URL
    async fn download(&self, url: &str) -> Result<SpeechAudio, TtsError> {
        let response = self.client.get(url).send().await.map_err(map_send_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TtsError::ServiceError(format!(
                "Audio download failed: HTTP {}",
                status
            )));
        }
        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TtsError::InvalidResponse(format!("Failed to read audio: {}", e)))?
            .to_vec();
        Ok(SpeechAudio::new(
            bytes,
            mime.unwrap_or_else(|| format_to_mime(&self.config.response_format)),
        ))
    }
}

#[async_trait]
impl TtsEnginePort for HttpTtsClient {
    async fn synthesize(&self, request: SpeechRequest) -> Result<SpeechAudio, TtsError> {
        let voice = request.voice.as_deref().or(self.config.voice.as_deref());
        let http_request = TtsHttpRequest {
            model: &self.config.model,
            input: &request.text,
            voice,
            response_format: &self.config.response_format,
        };

        tracing::debug!(
            url = %self.speech_url(),
            attempt_id = ?request.attempt_id,
            text_len = request.text.len(),
            language = %request.language,
            voice = ?voice,
            "Sending TTS request"
        );

        let response = self
            .client
            .post(self.speech_url())
            .json(&http_request)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TtsError::ServiceError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| TtsError::InvalidResponse(format!("Failed to read audio: {}", e)))?;

        let audio = if content_type.starts_with("audio/") || content_type == "application/octet-stream" {
            let mime = if content_type.starts_with("audio/") {
                content_type
            } else {
                format_to_mime(&self.config.response_format)
            };
            SpeechAudio::new(body.to_vec(), mime)
        } else {
            let json: serde_json::Value = serde_json::from_slice(&body)
                .map_err(|e| TtsError::InvalidResponse(format!("Unexpected body: {}", e)))?;
            match parse_envelope(&json)? {
                (EnvelopeAudio::Bytes(bytes), mime) => SpeechAudio::new(
                    bytes,
                    mime.unwrap_or_else(|| format_to_mime(&self.config.response_format)),
                ),
                (EnvelopeAudio::Url(url), _) => self.download(&url).await?,
            }
        };

        if audio.bytes.is_empty() {
            return Err(TtsError::InvalidResponse("Empty audio".to_string()));
        }

        tracing::info!(
            attempt_id = ?request.attempt_id,
            mime_type = %audio.mime_type,
            audio_size = audio.size(),
            "TTS synthesis completed"
        );

        Ok(audio)
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.health_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::story::Language;
    use axum::{
        http::header,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;

    #[test]
    fn test_config_default() {
        let config = HttpTtsClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000/v1");
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_config_builder() {
        let config = HttpTtsClientConfig::new("http://example.com:9000").with_timeout(60);
        assert_eq!(config.base_url, "http://example.com:9000");
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_envelope_variants() {
        let (audio, mime) =
            parse_envelope(&json!({"data": {"audio": "AQID"}, "format": "wav"})).unwrap();
        assert_eq!(audio, EnvelopeAudio::Bytes(vec![1, 2, 3]));
        assert_eq!(mime.as_deref(), Some("audio/wav"));

        let (audio, mime) =
            parse_envelope(&json!({"audio_base64": "data:audio/ogg;base64,AQID"})).unwrap();
        assert_eq!(audio, EnvelopeAudio::Bytes(vec![1, 2, 3]));
        assert_eq!(mime.as_deref(), Some("audio/ogg"));

        let (audio, _) =
            parse_envelope(&json!({"output": {"audio": {"url": "https://cdn/x.mp3"}}})).unwrap();
        assert_eq!(audio, EnvelopeAudio::Url("https://cdn/x.mp3".to_string()));

        assert!(parse_envelope(&json!({"status": "ok"})).is_err());
    }

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_raw_audio_response() {
        let router = Router::new().route(
            "/audio/speech",
            post(|| async { ([(header::CONTENT_TYPE, "audio/mpeg")], vec![7u8, 8, 9]) }),
        );
        let base = spawn_server(router).await;
        let client = HttpTtsClient::new(HttpTtsClientConfig::new(base)).unwrap();
        let audio = client
            .synthesize(SpeechRequest::new("hi", Language::En))
            .await
            .unwrap();
        assert_eq!(audio, SpeechAudio::new(vec![7, 8, 9], "audio/mpeg"));
    }

    #[tokio::test]
    async fn test_url_envelope_is_downloaded() {
        // 先绑定端口，响应里才能给出真实的下载地址
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let file_url = format!("{}/files/a.wav", base);

        let router = Router::new()
            .route(
                "/audio/speech",
                post(move || {
                    let file_url = file_url.clone();
                    async move { Json(json!({"output": {"audio": {"url": file_url}}})) }
                }),
            )
            .route(
                "/files/a.wav",
                get(|| async { ([(header::CONTENT_TYPE, "audio/wav")], vec![1u8, 2]) }),
            );
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let client = HttpTtsClient::new(HttpTtsClientConfig::new(base)).unwrap();
        let audio = client
            .synthesize(SpeechRequest::new("hi", Language::Zh))
            .await
            .unwrap();
        assert_eq!(audio, SpeechAudio::new(vec![1, 2], "audio/wav"));
    }
}
