//! Application State
//!
//! 包含所有 Command/Query Handlers 的应用状态

use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{
    AudioEncoderPort, ConversationStorePort, LlmPort, TtsCachePort, TtsEnginePort,
};
use crate::application::{
    ConversationOrchestrator, GenerateStoryHandler, LogDispatcher, OrchestratorSettings,
    RecentLogsHandler, ResetConversationHandler, ServiceHealthHandler, StorySettings,
    SynthesizeSpeechHandler,
};

/// 出站端口集合
#[derive(Clone)]
pub struct AppPorts {
    pub text_model: Arc<dyn LlmPort>,
    /// 未启用语音层时为空
    pub voice_model: Option<Arc<dyn LlmPort>>,
    /// 未启用 TTS 时为空
    pub tts: Option<Arc<dyn TtsEnginePort>>,
    pub tts_cache: Arc<dyn TtsCachePort>,
    pub encoder: Arc<dyn AudioEncoderPort>,
    pub conversations: Arc<dyn ConversationStorePort>,
    pub log: LogDispatcher,
}

/// 用例参数
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub story: StorySettings,
    pub orchestrator: OrchestratorSettings,
    /// `/api/tts` 单次合成超时
    pub tts_timeout: Duration,
    pub admin_token: Option<String>,
    pub max_logs: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            story: StorySettings::default(),
            orchestrator: OrchestratorSettings::default(),
            tts_timeout: Duration::from_secs(15),
            admin_token: None,
            max_logs: 500,
        }
    }
}

/// 应用状态
pub struct AppState {
    // ========== Ports ==========
    pub conversations: Arc<dyn ConversationStorePort>,

    // ========== Command Handlers ==========
    pub generate_story_handler: GenerateStoryHandler,
    pub chat_turn_handler: ConversationOrchestrator,
    pub reset_conversation_handler: ResetConversationHandler,
    pub synthesize_speech_handler: SynthesizeSpeechHandler,

    // ========== Query Handlers ==========
    pub recent_logs_handler: RecentLogsHandler,
    pub service_health_handler: ServiceHealthHandler,
}

impl AppState {
    /// 创建应用状态
    pub fn new(ports: AppPorts, settings: AppSettings) -> Self {
        let tts_voice = settings.orchestrator.tts_voice.clone();

        Self {
            conversations: ports.conversations.clone(),

            // Command handlers
            generate_story_handler: GenerateStoryHandler::new(
                ports.text_model.clone(),
                ports.log.clone(),
                settings.story,
            ),
            chat_turn_handler: ConversationOrchestrator::new(
                ports.conversations.clone(),
                ports.voice_model.clone(),
                ports.text_model.clone(),
                ports.tts.clone(),
                ports.encoder.clone(),
                ports.log.clone(),
                settings.orchestrator,
            ),
            reset_conversation_handler: ResetConversationHandler::new(ports.conversations.clone()),
            synthesize_speech_handler: SynthesizeSpeechHandler::new(
                ports.tts.clone(),
                ports.tts_cache.clone(),
                tts_voice,
                settings.tts_timeout,
            ),

            // Query handlers
            recent_logs_handler: RecentLogsHandler::new(
                ports.log.clone(),
                settings.admin_token,
                settings.max_logs,
            ),
            service_health_handler: ServiceHealthHandler::new(
                ports.text_model,
                ports.voice_model,
                ports.tts,
            ),
        }
    }
}
