//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, LogSinkKind};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `TALETALK_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `TALETALK_SERVER__PORT=8080`
/// - `TALETALK_LLM__TEXT__URL=https://dashscope.aliyuncs.com/compatible-mode/v1`
/// - `TALETALK_LLM__TEXT__API_KEY=sk-...`
/// - `TALETALK_LOG_SINK__KIND=file`
/// - `TALETALK_ADMIN__TOKEN=...`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5060)?
        .set_default("llm.text.url", "http://localhost:11434/v1")?
        .set_default("llm.voice.enabled", true)?
        .set_default("tts.enabled", true)?
        .set_default("tts.url", "http://localhost:8000/v1")?
        .set_default("tts.timeout_secs", 30)?
        .set_default("chat.session_idle_secs", 1800)?
        .set_default("chat.sweep_interval_secs", 60)?
        .set_default("log_sink.kind", "none")?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: TALETALK_TTS__URL=http://tts-server:8000/v1
    builder = builder.add_source(
        Environment::with_prefix("TALETALK")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("Server port cannot be 0"));
    }

    if config.llm.text.url.trim().is_empty() {
        return Err(invalid("LLM text URL cannot be empty"));
    }

    if config.llm.voice.enabled && config.llm.voice_url().trim().is_empty() {
        return Err(invalid("LLM voice URL cannot be empty when voice is enabled"));
    }

    if config.tts.enabled && config.tts.url.trim().is_empty() {
        return Err(invalid("TTS URL cannot be empty when TTS is enabled"));
    }

    if config.chat.history_window == 0 {
        return Err(invalid("Chat history window cannot be 0"));
    }

    let timeouts = config.chat.timeouts(config.chat.is_short_lived());
    if timeouts.voice_secs == 0 || timeouts.text_secs == 0 || timeouts.tts_secs == 0 {
        return Err(invalid("Chat tier timeouts cannot be 0"));
    }

    if config.story.timeout_secs == 0 || config.tts.timeout_secs == 0 {
        return Err(invalid("Story and TTS timeouts cannot be 0"));
    }

    if config.chat.sweep_interval_secs == 0 {
        return Err(invalid("Session sweep interval cannot be 0"));
    }

    match config.log_sink.kind {
        LogSinkKind::File if config.log_sink.path.is_none() => {
            return Err(invalid("Log sink kind 'file' requires log_sink.path"));
        }
        LogSinkKind::Http
            if config
                .log_sink
                .url
                .as_deref()
                .map_or(true, |u| u.trim().is_empty()) =>
        {
            return Err(invalid("Log sink kind 'http' requires log_sink.url"));
        }
        _ => {}
    }

    Ok(())
}

fn mask(secret: &Option<String>) -> &'static str {
    match secret {
        Some(s) if !s.is_empty() => "set",
        _ => "unset",
    }
}

/// 打印配置信息（用于启动时日志），不输出密钥
pub fn print_config(config: &AppConfig) {
    let short_lived = config.chat.is_short_lived();
    let timeouts = config.chat.timeouts(short_lived);

    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}:{}", config.server.host, config.server.port);
    tracing::info!(
        "Text Model: {} @ {} (api key {})",
        config.llm.text.model,
        config.llm.text.url,
        mask(&config.llm.text.api_key)
    );
    if config.llm.voice.enabled {
        tracing::info!(
            "Voice Model: {} @ {} (api key {})",
            config.llm.voice.model,
            config.llm.voice_url(),
            mask(&config.llm.voice_api_key())
        );
    } else {
        tracing::info!("Voice Model: disabled");
    }
    if config.tts.enabled {
        tracing::info!(
            "TTS: {} @ {} (cache {} bytes)",
            config.tts.model,
            config.tts.url,
            config.tts.cache_max_bytes
        );
    } else {
        tracing::info!("TTS: disabled");
    }
    tracing::info!(
        "Chat: short_lived={}, timeouts voice={}s text={}s tts={}s, history={}",
        short_lived,
        timeouts.voice_secs,
        timeouts.text_secs,
        timeouts.tts_secs,
        config.chat.history_window
    );
    tracing::info!("Session Idle Expiry: {}s", config.chat.session_idle_secs);
    tracing::info!("Log Sink: {:?}", config.log_sink.kind);
    tracing::info!("Admin Token: {}", mask(&config.admin.token));
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_llm_url() {
        let mut config = AppConfig::default();
        config.llm.text.url = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_history_window() {
        let mut config = AppConfig::default();
        config.chat.history_window = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_timeout() {
        let mut config = AppConfig::default();
        config.chat.voice_timeout_secs = Some(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_log_sink_requires_target() {
        let mut config = AppConfig::default();
        config.log_sink.kind = LogSinkKind::File;
        assert!(validate_config(&config).is_err());
        config.log_sink.path = Some(PathBuf::from("data/story.jsonl"));
        assert!(validate_config(&config).is_ok());

        config.log_sink.kind = LogSinkKind::Http;
        config.log_sink.url = Some("  ".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taletalk.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 8080

[llm.text]
url = "https://llm.example/v1"
model = "story-model"

[llm.voice]
enabled = false

[chat]
short_lived = true
history_window = 4

[log_sink]
kind = "file"
path = "data/story.jsonl"
"#,
        )
        .unwrap();

        let config = load_config_from_path(Some(&path)).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.llm.text.model, "story-model");
        assert!(!config.llm.voice.enabled);
        assert!(config.chat.is_short_lived());
        assert_eq!(config.chat.history_window, 4);
        assert_eq!(config.log_sink.kind, LogSinkKind::File);
        // 未配置的部分取默认值
        assert_eq!(config.tts.model, "tts-1");
    }
}
