//! TaleTalk - 儿童双语故事与语音对话服务
//!
//! 启动流程：配置 → 日志 → 出站适配器 → 应用状态 → 会话清理 → HTTP 服务

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use taletalk::application::ports::{LlmPort, StoryLogPort, TtsEnginePort};
use taletalk::application::LogDispatcher;
use taletalk::config::{load_config, print_config, AppConfig, LogSinkKind};
use taletalk::infrastructure::adapters::{
    AudioOutputConfig, HttpChatClient, HttpChatClientConfig, HttpLogSink, HttpLogSinkConfig,
    HttpTtsClient, HttpTtsClientConfig, JsonlFileLogSink, SymphoniaWavEncoder,
};
use taletalk::infrastructure::http::{AppPorts, AppSettings, AppState, HttpServer, ServerConfig};
use taletalk::infrastructure::memory::{InMemoryConversationStore, InMemoryTtsCache};
use taletalk::infrastructure::worker::{SessionSweeper, SessionSweeperConfig};

fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},taletalk={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn build_log_dispatcher(config: &AppConfig) -> anyhow::Result<LogDispatcher> {
    let sink: Arc<dyn StoryLogPort> = match config.log_sink.kind {
        LogSinkKind::None => return Ok(LogDispatcher::disabled()),
        LogSinkKind::File => {
            let path = config
                .log_sink
                .path
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("log_sink.path is required"))?;
            Arc::new(JsonlFileLogSink::new(path).await?)
        }
        LogSinkKind::Http => {
            let url = config
                .log_sink
                .url
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("log_sink.url is required"))?;
            let sink_config =
                HttpLogSinkConfig::new(url).with_api_key(config.log_sink.api_key.clone());
            Arc::new(HttpLogSink::new(sink_config)?)
        }
    };
    Ok(LogDispatcher::new(sink))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);

    tracing::info!("TaleTalk - 儿童双语故事与语音对话服务");
    print_config(&config);

    // 文本模型
    let text_config = HttpChatClientConfig::new(&config.llm.text.url, &config.llm.text.model)
        .with_api_key(config.llm.text.api_key.clone())
        .with_timeout(config.llm.text.timeout_secs);
    let text_model: Arc<dyn LlmPort> = Arc::new(HttpChatClient::new(text_config)?);

    // 语音模型（音频输入 + 音频输出）
    let voice_model: Option<Arc<dyn LlmPort>> = if config.llm.voice.enabled {
        let voice_config =
            HttpChatClientConfig::new(config.llm.voice_url(), &config.llm.voice.model)
                .with_api_key(config.llm.voice_api_key())
                .with_timeout(config.llm.text.timeout_secs)
                .with_audio_output(Some(AudioOutputConfig {
                    voice: config.llm.voice.audio_voice.clone(),
                    format: config.llm.voice.audio_format.clone(),
                }));
        Some(Arc::new(HttpChatClient::new(voice_config)?))
    } else {
        None
    };

    // TTS 引擎
    let tts: Option<Arc<dyn TtsEnginePort>> = if config.tts.enabled {
        let mut tts_config = HttpTtsClientConfig::new(&config.tts.url)
            .with_api_key(config.tts.api_key.clone())
            .with_timeout(config.tts.timeout_secs);
        tts_config.model = config.tts.model.clone();
        tts_config.voice = config.tts.voice.clone();
        tts_config.response_format = config.tts.response_format.clone();
        Some(Arc::new(HttpTtsClient::new(tts_config)?))
    } else {
        None
    };

    let conversations = InMemoryConversationStore::new().arc();
    let ports = AppPorts {
        text_model,
        voice_model,
        tts,
        tts_cache: InMemoryTtsCache::new(config.tts.cache_max_bytes).arc(),
        encoder: Arc::new(SymphoniaWavEncoder::new(config.audio.max_input_bytes)),
        conversations: conversations.clone(),
        log: build_log_dispatcher(&config).await?,
    };

    let settings = AppSettings {
        story: config.story.settings(),
        orchestrator: config.orchestrator_settings(),
        tts_timeout: Duration::from_secs(config.tts.timeout_secs),
        admin_token: config.admin.token.clone(),
        max_logs: config.admin.max_logs,
    };

    let state = AppState::new(ports, settings);

    // 启动会话清理
    let shutdown = CancellationToken::new();
    let sweeper = SessionSweeper::new(
        SessionSweeperConfig {
            interval: Duration::from_secs(config.chat.sweep_interval_secs),
            idle_secs: config.chat.session_idle_secs,
        },
        conversations,
        shutdown.clone(),
    );
    let sweeper_handle = tokio::spawn(sweeper.run());

    // 创建 HTTP 服务器
    let server_config = ServerConfig::from(&config.server);
    let server = HttpServer::new(server_config, state);

    tracing::info!("Starting HTTP server...");

    // 启动服务器（带优雅关闭）
    let server_shutdown = shutdown.clone();
    server
        .run_with_shutdown(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Received shutdown signal"),
                Err(e) => tracing::error!(error = %e, "Failed to listen for ctrl-c"),
            }
            server_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Err(e) = sweeper_handle.await {
        tracing::warn!(error = %e, "Session sweeper task failed");
    }

    tracing::info!("Server shutdown complete");

    Ok(())
}
