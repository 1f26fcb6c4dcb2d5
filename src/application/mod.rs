//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（LLM、TTS、AudioEncoder、ConversationStore、StoryLog 等）
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod log_dispatch;
pub mod ports;
pub mod queries;

// Re-exports
pub use commands::{
    // Story commands
    GenerateStoryCommand,
    GenerateStoryResponse,
    // Chat commands
    ChatTurnCommand,
    ChatTurnResponse,
    ReplyTier,
    ResetConversationCommand,
    ResetConversationResponse,
    VoiceInputMode,
    // TTS commands
    SynthesizeSpeechCommand,
    SynthesizeSpeechResponse,
    // Handlers
    handlers::{
        ConversationOrchestrator, GenerateStoryHandler, OrchestratorSettings,
        ResetConversationHandler, StorySettings, SynthesizeSpeechHandler,
    },
};

pub use error::ApplicationError;
pub use log_dispatch::LogDispatcher;

pub use queries::{
    handlers::{RecentLogsHandler, ServiceHealthHandler, ServiceHealthResponse},
    RecentLogs, ServiceHealth,
};
