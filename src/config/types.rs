//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::application::{OrchestratorSettings, StorySettings};

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 文本模型与语音模型
    #[serde(default)]
    pub llm: LlmConfig,

    /// TTS 服务配置
    #[serde(default)]
    pub tts: TtsConfig,

    /// 对话编排配置
    #[serde(default)]
    pub chat: ChatConfig,

    /// 故事生成配置
    #[serde(default)]
    pub story: StoryConfig,

    /// 录音规范化配置
    #[serde(default)]
    pub audio: AudioConfig,

    /// 生成/对话日志存储
    #[serde(default)]
    pub log_sink: LogSinkConfig,

    /// 管理端配置
    #[serde(default)]
    pub admin: AdminConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 请求体上限（字节），录音以 base64 放在 JSON 中
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    /// 静态文件服务配置（前端页面）
    #[serde(default)]
    pub static_files: StaticFilesConfig,
}

/// 静态文件服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct StaticFilesConfig {
    /// 是否启用静态文件服务
    #[serde(default)]
    pub enabled: bool,

    /// 静态文件目录
    #[serde(default = "default_static_dir")]
    pub dir: PathBuf,
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("web")
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: default_static_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5060
}

fn default_body_limit() -> usize {
    16 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
            static_files: StaticFilesConfig::default(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 模型服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// OpenAI 兼容服务基础 URL
    #[serde(default = "default_llm_url")]
    pub url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_text_model")]
    pub model: String,

    /// HTTP 客户端超时（秒）
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_text_model() -> String {
    "qwen-plus".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            url: default_llm_url(),
            api_key: None,
            model: default_text_model(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// 语音模型配置，未设置的连接参数沿用文本模型
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceModelConfig {
    #[serde(default = "default_voice_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_voice_model")]
    pub model: String,

    /// 回复音频的音色
    #[serde(default = "default_voice_name")]
    pub audio_voice: String,

    /// 回复音频格式
    #[serde(default = "default_voice_format")]
    pub audio_format: String,
}

fn default_voice_enabled() -> bool {
    true
}

fn default_voice_model() -> String {
    "qwen-omni-turbo".to_string()
}

fn default_voice_name() -> String {
    "Cherry".to_string()
}

fn default_voice_format() -> String {
    "wav".to_string()
}

impl Default for VoiceModelConfig {
    fn default() -> Self {
        Self {
            enabled: default_voice_enabled(),
            url: None,
            api_key: None,
            model: default_voice_model(),
            audio_voice: default_voice_name(),
            audio_format: default_voice_format(),
        }
    }
}

/// LLM 配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub text: ModelConfig,

    #[serde(default)]
    pub voice: VoiceModelConfig,
}

impl LlmConfig {
    /// 语音模型实际使用的 URL
    pub fn voice_url(&self) -> &str {
        self.voice.url.as_deref().unwrap_or(&self.text.url)
    }

    /// 语音模型实际使用的 API key
    pub fn voice_api_key(&self) -> Option<String> {
        self.voice
            .api_key
            .clone()
            .or_else(|| self.text.api_key.clone())
    }
}

/// TTS 服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    #[serde(default = "default_tts_enabled")]
    pub enabled: bool,

    /// TTS 服务基础 URL
    #[serde(default = "default_tts_url")]
    pub url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_tts_model")]
    pub model: String,

    /// 默认音色
    #[serde(default)]
    pub voice: Option<String>,

    #[serde(default = "default_tts_format")]
    pub response_format: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,

    /// 合成音频缓存上限（字节）
    #[serde(default = "default_tts_cache_bytes")]
    pub cache_max_bytes: u64,
}

fn default_tts_enabled() -> bool {
    true
}

fn default_tts_url() -> String {
    "http://localhost:8000/v1".to_string()
}

fn default_tts_model() -> String {
    "tts-1".to_string()
}

fn default_tts_format() -> String {
    "mp3".to_string()
}

fn default_tts_timeout() -> u64 {
    30
}

fn default_tts_cache_bytes() -> u64 {
    64 * 1024 * 1024
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            enabled: default_tts_enabled(),
            url: default_tts_url(),
            api_key: None,
            model: default_tts_model(),
            voice: None,
            response_format: default_tts_format(),
            timeout_secs: default_tts_timeout(),
            cache_max_bytes: default_tts_cache_bytes(),
        }
    }
}

/// 无服务器平台的环境标记
const SHORT_LIVED_MARKERS: &[&str] = &["VERCEL", "AWS_LAMBDA_FUNCTION_NAME", "NETLIFY"];

/// 根据环境变量判断是否运行在短生命周期平台
pub fn detect_short_lived(lookup: impl Fn(&str) -> Option<String>) -> bool {
    SHORT_LIVED_MARKERS
        .iter()
        .any(|key| lookup(key).is_some_and(|v| !v.is_empty()))
}

/// 对话编排配置
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// 未设置时按环境自动识别
    #[serde(default)]
    pub short_lived: Option<bool>,

    /// 各层超时（秒），未设置时按运行环境取默认值
    #[serde(default)]
    pub voice_timeout_secs: Option<u64>,
    #[serde(default)]
    pub text_timeout_secs: Option<u64>,
    #[serde(default)]
    pub tts_timeout_secs: Option<u64>,

    /// 保留的历史回合数
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// 会话空闲过期时间（秒）
    #[serde(default = "default_session_idle")]
    pub session_idle_secs: u64,

    /// 过期清理间隔（秒）
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    #[serde(default = "default_chat_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_chat_max_tokens")]
    pub max_tokens: u32,
}

fn default_history_window() -> usize {
    crate::domain::conversation::DEFAULT_HISTORY_WINDOW
}

fn default_session_idle() -> u64 {
    1800
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_chat_temperature() -> f32 {
    0.8
}

fn default_top_p() -> f32 {
    0.9
}

fn default_chat_max_tokens() -> u32 {
    300
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            short_lived: None,
            voice_timeout_secs: None,
            text_timeout_secs: None,
            tts_timeout_secs: None,
            history_window: default_history_window(),
            session_idle_secs: default_session_idle(),
            sweep_interval_secs: default_sweep_interval(),
            temperature: default_chat_temperature(),
            top_p: default_top_p(),
            max_tokens: default_chat_max_tokens(),
        }
    }
}

/// 三层超时（秒）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierTimeouts {
    pub voice_secs: u64,
    pub text_secs: u64,
    pub tts_secs: u64,
}

impl TierTimeouts {
    pub const LONG_LIVED: TierTimeouts = TierTimeouts {
        voice_secs: 25,
        text_secs: 20,
        tts_secs: 15,
    };

    pub const SHORT_LIVED: TierTimeouts = TierTimeouts {
        voice_secs: 8,
        text_secs: 7,
        tts_secs: 6,
    };
}

impl ChatConfig {
    pub fn is_short_lived(&self) -> bool {
        self.short_lived
            .unwrap_or_else(|| detect_short_lived(|key| std::env::var(key).ok()))
    }

    /// 显式配置优先，其余按运行环境取默认值
    pub fn timeouts(&self, short_lived: bool) -> TierTimeouts {
        let base = if short_lived {
            TierTimeouts::SHORT_LIVED
        } else {
            TierTimeouts::LONG_LIVED
        };
        TierTimeouts {
            voice_secs: self.voice_timeout_secs.unwrap_or(base.voice_secs),
            text_secs: self.text_timeout_secs.unwrap_or(base.text_secs),
            tts_secs: self.tts_timeout_secs.unwrap_or(base.tts_secs),
        }
    }
}

/// 故事生成配置
#[derive(Debug, Clone, Deserialize)]
pub struct StoryConfig {
    #[serde(default = "default_story_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_story_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_story_timeout")]
    pub timeout_secs: u64,
}

fn default_story_temperature() -> f32 {
    0.9
}

fn default_story_max_tokens() -> u32 {
    800
}

fn default_story_timeout() -> u64 {
    20
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            temperature: default_story_temperature(),
            top_p: default_top_p(),
            max_tokens: default_story_max_tokens(),
            timeout_secs: default_story_timeout(),
        }
    }
}

impl StoryConfig {
    pub fn settings(&self) -> StorySettings {
        StorySettings {
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// 录音规范化配置
#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// 录音输入上限（字节）
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: usize,
}

fn default_max_input_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: default_max_input_bytes(),
        }
    }
}

/// 日志存储类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSinkKind {
    #[default]
    None,
    File,
    Http,
}

/// 生成/对话日志存储配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogSinkConfig {
    #[serde(default)]
    pub kind: LogSinkKind,

    /// kind = file 时的 JSONL 文件路径
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// kind = http 时的远程地址
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,
}

/// 管理端配置
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Bearer token，未设置时管理接口全部拒绝
    #[serde(default)]
    pub token: Option<String>,

    /// 单次读取日志上限
    #[serde(default = "default_max_logs")]
    pub max_logs: usize,
}

fn default_max_logs() -> usize {
    500
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            token: None,
            max_logs: default_max_logs(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// 构建对话编排参数
    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        let timeouts = self.chat.timeouts(self.chat.is_short_lived());
        OrchestratorSettings {
            voice_enabled: self.llm.voice.enabled,
            voice_timeout: Duration::from_secs(timeouts.voice_secs),
            text_timeout: Duration::from_secs(timeouts.text_secs),
            tts_timeout: Duration::from_secs(timeouts.tts_secs),
            history_window: self.chat.history_window,
            temperature: self.chat.temperature,
            top_p: self.chat.top_p,
            max_tokens: self.chat.max_tokens,
            tts_voice: self.tts.voice.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5060);
        assert_eq!(config.llm.text.url, "http://localhost:11434/v1");
        assert!(config.llm.voice.enabled);
        assert_eq!(config.log_sink.kind, LogSinkKind::None);
        assert!(config.admin.token.is_none());
    }

    #[test]
    fn test_server_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:5060");
    }

    #[test]
    fn test_voice_model_inherits_text_connection() {
        let mut config = LlmConfig::default();
        config.text.url = "https://dashscope.example/v1".to_string();
        config.text.api_key = Some("sk-text".to_string());
        assert_eq!(config.voice_url(), "https://dashscope.example/v1");
        assert_eq!(config.voice_api_key().as_deref(), Some("sk-text"));

        config.voice.url = Some("https://voice.example/v1".to_string());
        assert_eq!(config.voice_url(), "https://voice.example/v1");
    }

    #[test]
    fn test_detect_short_lived() {
        assert!(detect_short_lived(|key| (key == "VERCEL").then(|| "1".to_string())));
        assert!(detect_short_lived(|key| {
            (key == "AWS_LAMBDA_FUNCTION_NAME").then(|| "fn".to_string())
        }));
        assert!(!detect_short_lived(|_| None));
        assert!(!detect_short_lived(|_| Some(String::new())));
    }

    #[test]
    fn test_timeouts_by_environment() {
        let mut chat = ChatConfig::default();
        assert_eq!(chat.timeouts(false), TierTimeouts::LONG_LIVED);
        assert_eq!(chat.timeouts(true), TierTimeouts::SHORT_LIVED);

        chat.text_timeout_secs = Some(3);
        let timeouts = chat.timeouts(true);
        assert_eq!(timeouts.text_secs, 3);
        assert_eq!(timeouts.voice_secs, TierTimeouts::SHORT_LIVED.voice_secs);
    }

    #[test]
    fn test_orchestrator_settings_follow_config() {
        let mut config = AppConfig::default();
        config.chat.short_lived = Some(false);
        config.llm.voice.enabled = false;
        config.tts.voice = Some("alloy".to_string());

        let settings = config.orchestrator_settings();
        assert!(!settings.voice_enabled);
        assert_eq!(settings.voice_timeout, Duration::from_secs(25));
        assert_eq!(settings.tts_voice.as_deref(), Some("alloy"));
    }
}
