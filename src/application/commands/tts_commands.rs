//! TTS Commands - 语音合成命令

use crate::application::ports::SpeechAudio;
use crate::domain::story::Language;

/// 合成语音命令
#[derive(Debug, Clone)]
pub struct SynthesizeSpeechCommand {
    pub text: String,
    pub language: Language,
    /// 为空时使用配置的默认音色
    pub voice: Option<String>,
}

/// 合成语音响应
#[derive(Debug, Clone)]
pub struct SynthesizeSpeechResponse {
    pub audio: SpeechAudio,
    /// 是否命中缓存
    pub cached: bool,
}
