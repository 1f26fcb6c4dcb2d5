//! TaleTalk - 儿童双语故事与语音对话服务
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Story Context: 种子、清洗规则、兜底故事、双语组装
//! - Conversation Context: 会话、回合、历史窗口
//!
//! 应用层 (application/):
//! - Ports: LLM、TTS、AudioEncoder、ConversationStore、StoryLog、TtsCache
//! - Commands: 故事生成、对话回合（语音 → 文本 → TTS 降级）、语音合成
//! - Queries: 管理端日志、上游健康检查
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API
//! - Memory: ConversationStore, TtsCache 内存实现
//! - Worker: 空闲会话清理
//! - Adapters: OpenAI 兼容 LLM/TTS 客户端、WAV 编码、日志存储
//!
//! 客户端 (client/):
//! - 手势延迟播放调度、录音会话、录音格式协商

pub mod application;
pub mod client;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
