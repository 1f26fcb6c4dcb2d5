//! HTTP Chat Client - OpenAI 兼容的补全接口
//!
//! 实现 LlmPort trait，文本模型与语音模型共用
//!
//! 外部 API:
//! POST {base_url}/chat/completions
//! Request: {"model": "...", "messages": [...], "temperature": .., "top_p": .., "max_tokens": ..}
//! Response: JSON，文本与音频位置因服务商而异，按多路径提取

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::application::ports::{
    ChatMessage, ChatReply, ChatRequest, LlmError, LlmPort, ReplyAudio,
};
use crate::domain::JsonPathExtractor;

static TEXT_PATHS: Lazy<JsonPathExtractor> = Lazy::new(|| {
    JsonPathExtractor::new(vec![
        "choices.0.message.content",
        "choices.0.text",
        "output.text",
        "output.choices.0.message.content",
        "message.content",
        "content",
        "text",
        "result",
        "choices.0.message.audio.transcript",
    ])
});

static AUDIO_PATHS: Lazy<JsonPathExtractor> = Lazy::new(|| {
    JsonPathExtractor::new(vec![
        "choices.0.message.audio.data",
        "output.audio.data",
        "audio.data",
        "audio",
    ])
});

/// 请求语音输出时的参数
#[derive(Debug, Clone, Serialize)]
pub struct AudioOutputConfig {
    pub voice: String,
    /// 如 `wav`、`mp3`
    pub format: String,
}

/// HTTP Chat 客户端配置
#[derive(Debug, Clone)]
pub struct HttpChatClientConfig {
    /// 服务基础 URL（不含 `/chat/completions`）
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    /// 请求超时时间（秒），作为单次尝试超时之外的兜底
    pub timeout_secs: u64,
    /// 设置后请求中带 `modalities: ["text", "audio"]`
    pub audio_output: Option<AudioOutputConfig>,
}

impl Default for HttpChatClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 60,
            audio_output: None,
        }
    }
}

impl HttpChatClientConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_audio_output(mut self, audio_output: Option<AudioOutputConfig>) -> Self {
        self.audio_output = audio_output;
        self
    }
}

/// 补全请求体 (JSON)
#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modalities: Option<[&'static str; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio: Option<&'a AudioOutputConfig>,
}

/// HTTP Chat 客户端
pub struct HttpChatClient {
    client: Client,
    config: HttpChatClientConfig,
}

fn build_headers(api_key: Option<&str>) -> Result<HeaderMap, LlmError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(key) = api_key {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|e| LlmError::NetworkError(format!("Invalid API key header: {}", e)))?,
        );
    }
    Ok(headers)
}

fn map_send_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else if e.is_connect() {
        LlmError::NetworkError(format!("Cannot connect to model service: {}", e))
    } else {
        LlmError::NetworkError(e.to_string())
    }
}

/// 从响应 JSON 中提取文本与音频
pub fn parse_reply(body: &serde_json::Value, audio_mime: &str) -> Result<ChatReply, LlmError> {
    let text = TEXT_PATHS.first_text(body).ok_or(LlmError::EmptyReply)?;
    let audio = AUDIO_PATHS
        .first_value(body)
        .and_then(|v| v.as_str())
        .filter(|data| !data.is_empty())
        .map(|data| ReplyAudio {
            data: data.to_string(),
            mime_type: audio_mime.to_string(),
        });
    Ok(ChatReply {
        text: text.trim().to_string(),
        audio,
    })
}

impl HttpChatClient {
    /// 创建新的 HTTP Chat 客户端
    pub fn new(config: HttpChatClientConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .default_headers(build_headers(config.api_key.as_deref())?)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// 获取补全 URL
    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url())
    }

    /// 获取健康检查 URL
    fn models_url(&self) -> String {
        format!("{}/models", self.base_url())
    }

    fn audio_mime(&self) -> String {
        match &self.config.audio_output {
            Some(out) => format!("audio/{}", out.format),
            None => "audio/wav".to_string(),
        }
    }
}

#[async_trait]
impl LlmPort for HttpChatClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatReply, LlmError> {
        let body = CompletionBody {
            model: &self.config.model,
            messages: &request.messages,
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
            modalities: self.config.audio_output.as_ref().map(|_| ["text", "audio"]),
            audio: self.config.audio_output.as_ref(),
        };

        tracing::debug!(
            url = %self.completions_url(),
            model = %self.config.model,
            attempt_id = ?request.attempt_id,
            messages = request.messages.len(),
            with_audio = request.messages.iter().any(|m| m.has_audio()),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(self.completions_url())
            .json(&body)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::ServiceError(format!(
                "HTTP {}: {}",
                status,
                error_text.chars().take(300).collect::<String>()
            )));
        }

        let raw = response.text().await.map_err(map_send_error)?;
        let json: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| LlmError::InvalidResponse(format!("Response is not JSON: {}", e)))?;

        let reply = parse_reply(&json, &self.audio_mime())?;

        tracing::info!(
            model = %self.config.model,
            attempt_id = ?request.attempt_id,
            text_len = reply.text.len(),
            has_audio = reply.audio.is_some(),
            "Chat completion finished"
        );

        Ok(reply)
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.models_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
