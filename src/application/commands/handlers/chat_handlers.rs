//! Chat Command Handlers - 对话回合编排
//!
//! 每个回合按层级降级，总能在有限次尝试内结束：
//!
//! ```text
//! VoiceAttempt --(成功且文本非空)--> Done
//! VoiceAttempt --(失败 | 超时 | 空文本)--> TextFallback
//! TextFallback --(成功)--> HasTextNoAudio
//! HasTextNoAudio --(回复自带音频)--> Done
//! HasTextNoAudio --(没有音频)--> TtsAttempt
//! TtsAttempt --(成功 | 失败)--> Done
//! ```
//!
//! 只有文本层也失败时才算回合失败，此时撤回本回合的用户发言。

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::application::commands::chat_commands::*;
use crate::application::error::ApplicationError;
use crate::application::log_dispatch::LogDispatcher;
use crate::application::ports::{
    AudioClip, AudioEncoderPort, ChatMessage, ChatReply, ChatRequest, ConversationStoreError,
    ConversationStorePort, EncodeError, InputAudio, LlmError, LlmPort, LogRecord, ReplyAudio,
    SpeechRequest, TtsEnginePort, TtsError,
};
use crate::domain::conversation::{
    AudioContent, ConversationId, ConversationSession, ConversationTurn, Role,
};
use crate::domain::story::Language;

/// 编排参数
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// 是否尝试语音模型
    pub voice_enabled: bool,
    pub voice_timeout: Duration,
    pub text_timeout: Duration,
    pub tts_timeout: Duration,
    /// 保留的历史回合数
    pub history_window: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    /// TTS 音色
    pub tts_voice: Option<String>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            voice_enabled: true,
            voice_timeout: Duration::from_secs(25),
            text_timeout: Duration::from_secs(20),
            tts_timeout: Duration::from_secs(15),
            history_window: crate::domain::conversation::DEFAULT_HISTORY_WINDOW,
            temperature: 0.8,
            top_p: 0.9,
            max_tokens: 300,
            tts_voice: None,
        }
    }
}

/// 文本层听不到录音，纯语音回合用这句话代替
fn voice_placeholder(language: Language) -> &'static str {
    match language {
        Language::Zh => "（小朋友发来了一段语音消息。）",
        Language::En => "(The child sent a voice message.)",
    }
}

/// 语音层的文字提示
fn listen_instruction(language: Language) -> &'static str {
    match language {
        Language::Zh => "请听小朋友的语音并回答。",
        Language::En => "Please listen to the child's voice message and reply.",
    }
}

/// 所有层级都失败时返回给用户的提示
fn retry_message(language: Language) -> &'static str {
    match language {
        Language::Zh => "小助手暂时没有回应，请再试一次。",
        Language::En => "The story friend could not answer right now. Please try again.",
    }
}

fn system_prompt(language: Language, story: Option<&str>) -> String {
    let mut prompt = match language {
        Language::Zh => String::from(
            "你是一个温柔又有活力的故事伙伴，正在和一个小朋友聊刚刚讲过的故事。\
             请用简体中文回答，每次不超过三句话，语言简单，鼓励小朋友继续想象。",
        ),
        Language::En => String::from(
            "You are a warm, playful story friend talking with a young child about the story you just told. \
             Answer in simple English, at most three short sentences, and encourage the child to keep imagining.",
        ),
    };
    if let Some(story) = story.filter(|s| !s.trim().is_empty()) {
        match language {
            Language::Zh => prompt.push_str("\n\n故事：\n"),
            Language::En => prompt.push_str("\n\nThe story:\n"),
        }
        prompt.push_str(story.trim());
    }
    prompt
}

/// 准备好的语音输入
#[derive(Debug, Clone)]
struct VoiceInput {
    audio: InputAudio,
    mode: VoiceInputMode,
}

/// 一次失败的尝试
#[derive(Debug)]
struct AttemptFailure {
    tier: ReplyTier,
    attempt_id: String,
    error: String,
}

/// 回合守卫：未显式完成时，在 drop 时放弃回合并释放进行中标记
struct TurnGuard {
    store: Arc<dyn ConversationStorePort>,
    conversation_id: ConversationId,
    armed: bool,
}

impl TurnGuard {
    fn new(store: Arc<dyn ConversationStorePort>, conversation_id: ConversationId) -> Self {
        Self {
            store,
            conversation_id,
            armed: true,
        }
    }

    fn complete(mut self, assistant_turn: ConversationTurn) -> Result<(), ConversationStoreError> {
        self.armed = false;
        self.store.complete_turn(self.conversation_id, assistant_turn)
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        if self.armed {
            self.store.abandon_turn(self.conversation_id);
        }
    }
}

async fn with_timeout<T, E>(
    limit: Duration,
    fut: impl std::future::Future<Output = Result<T, E>>,
    on_timeout: E,
) -> Result<T, E> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout),
    }
}

/// ConversationOrchestrator - 语音 → 文本 → TTS 三级降级
pub struct ConversationOrchestrator {
    store: Arc<dyn ConversationStorePort>,
    voice_model: Option<Arc<dyn LlmPort>>,
    text_model: Arc<dyn LlmPort>,
    tts: Option<Arc<dyn TtsEnginePort>>,
    encoder: Arc<dyn AudioEncoderPort>,
    log: LogDispatcher,
    settings: OrchestratorSettings,
}

impl ConversationOrchestrator {
    pub fn new(
        store: Arc<dyn ConversationStorePort>,
        voice_model: Option<Arc<dyn LlmPort>>,
        text_model: Arc<dyn LlmPort>,
        tts: Option<Arc<dyn TtsEnginePort>>,
        encoder: Arc<dyn AudioEncoderPort>,
        log: LogDispatcher,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            store,
            voice_model,
            text_model,
            tts,
            encoder,
            log,
            settings,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// 找到已有会话，或者创建新会话
    fn resolve_session(&self, cmd: &ChatTurnCommand) -> Result<ConversationId, ApplicationError> {
        if let Some(id) = cmd.conversation_id {
            match self.store.get(id) {
                Ok(_) => return Ok(id),
                Err(ConversationStoreError::NotFound(_)) => {
                    tracing::warn!(
                        conversation_id = %id,
                        "Conversation not found (expired or reset), starting a new one"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        let session = ConversationSession::new(
            cmd.generation_id,
            cmd.language,
            cmd.story.clone(),
            self.settings.history_window,
        );
        Ok(self.store.create(session)?)
    }

    /// 规范化录音，无法解码时原样转发
    async fn prepare_voice(&self, clip: &AudioClip) -> Result<VoiceInput, ApplicationError> {
        match self.encoder.encode(clip).await {
            Ok(encoded) => Ok(VoiceInput {
                audio: InputAudio {
                    data: encoded.to_base64(),
                    format: "wav".to_string(),
                    mime_type: encoded.mime_type().to_string(),
                },
                mode: VoiceInputMode::Encoded,
            }),
            Err(e @ (EncodeError::DecodeError(_) | EncodeError::EncodingError(_))) => {
                tracing::info!(
                    mime_type = %clip.mime_type,
                    size = clip.bytes.len(),
                    error = %e,
                    "Recording not decodable, forwarding original bytes"
                );
                Ok(VoiceInput {
                    audio: InputAudio {
                        data: clip.to_base64(),
                        format: clip.container_format(),
                        mime_type: clip.mime_type.clone(),
                    },
                    mode: VoiceInputMode::Forwarded,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 系统提示 + 历史窗口（不含本回合）
    fn context_messages(&self, session: &ConversationSession) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(system_prompt(
            session.language(),
            session.story(),
        ))];
        let history: Vec<&ConversationTurn> = session.history().collect();
        let previous = history.len().saturating_sub(1);
        for turn in &history[..previous] {
            let text = if turn.text().trim().is_empty() {
                voice_placeholder(session.language())
            } else {
                turn.text()
            };
            messages.push(match turn.role() {
                Role::User => ChatMessage::user(text),
                Role::Assistant => ChatMessage::assistant(text),
            });
        }
        messages
    }

    fn request(&self, messages: Vec<ChatMessage>, attempt_id: &str) -> ChatRequest {
        ChatRequest::new(messages)
            .with_sampling(
                self.settings.temperature,
                self.settings.top_p,
                self.settings.max_tokens,
            )
            .with_attempt_id(attempt_id)
    }

    async fn voice_attempt(
        &self,
        model: &Arc<dyn LlmPort>,
        mut messages: Vec<ChatMessage>,
        user_text: &str,
        voice: Option<&VoiceInput>,
        language: Language,
        attempt_id: &str,
    ) -> Result<ChatReply, LlmError> {
        messages.push(match voice {
            Some(voice) => {
                let text = if user_text.is_empty() {
                    listen_instruction(language)
                } else {
                    user_text
                };
                ChatMessage::user_with_audio(text, voice.audio.clone())
            }
            None => ChatMessage::user(user_text),
        });
        let reply = with_timeout(
            self.settings.voice_timeout,
            model.complete(self.request(messages, attempt_id)),
            LlmError::Timeout,
        )
        .await?;
        if reply.text.trim().is_empty() {
            return Err(LlmError::EmptyReply);
        }
        Ok(reply)
    }

    async fn text_attempt(
        &self,
        mut messages: Vec<ChatMessage>,
        user_text: &str,
        language: Language,
        attempt_id: &str,
    ) -> Result<ChatReply, LlmError> {
        let text = if user_text.is_empty() {
            voice_placeholder(language)
        } else {
            user_text
        };
        messages.push(ChatMessage::user(text));
        let reply = with_timeout(
            self.settings.text_timeout,
            self.text_model.complete(self.request(messages, attempt_id)),
            LlmError::Timeout,
        )
        .await?;
        if reply.text.trim().is_empty() {
            return Err(LlmError::EmptyReply);
        }
        Ok(reply)
    }

    async fn tts_attempt(
        &self,
        tts: &Arc<dyn TtsEnginePort>,
        text: &str,
        language: Language,
        attempt_id: &str,
    ) -> Result<ReplyAudio, TtsError> {
        let request = SpeechRequest::new(text, language)
            .with_voice(self.settings.tts_voice.clone())
            .with_attempt_id(attempt_id);
        let audio = with_timeout(
            self.settings.tts_timeout,
            tts.synthesize(request),
            TtsError::Timeout,
        )
        .await?;
        if audio.bytes.is_empty() {
            return Err(TtsError::InvalidResponse("Empty audio".to_string()));
        }
        Ok(ReplyAudio {
            data: BASE64.encode(&audio.bytes),
            mime_type: audio.mime_type,
        })
    }

    pub async fn handle(&self, cmd: ChatTurnCommand) -> Result<ChatTurnResponse, ApplicationError> {
        let user_text = cmd
            .text
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if user_text.is_empty() && cmd.audio.is_none() {
            return Err(ApplicationError::validation(
                "A chat turn needs text or audio",
            ));
        }

        let voice = match &cmd.audio {
            Some(clip) => Some(self.prepare_voice(clip).await?),
            None => None,
        };
        let voice_input = voice
            .as_ref()
            .map(|v| v.mode)
            .unwrap_or(VoiceInputMode::None);

        let conversation_id = self.resolve_session(&cmd)?;
        let user_turn = ConversationTurn::user(
            user_text.clone(),
            voice.as_ref().map(|v| AudioContent {
                data: v.audio.data.clone(),
                mime_type: v.audio.mime_type.clone(),
            }),
        )
        .map_err(ApplicationError::validation)?;

        // 用户发言在第一个请求之前入历史
        let session = self.store.begin_turn(conversation_id, user_turn)?;
        let guard = TurnGuard::new(self.store.clone(), conversation_id);
        let language = session.language();
        let context = self.context_messages(&session);

        let mut failures: Vec<AttemptFailure> = Vec::new();
        let mut outcome: Option<(ChatReply, ReplyTier, String)> = None;

        // VoiceAttempt
        if let Some(model) = self.voice_model.as_ref().filter(|_| self.settings.voice_enabled) {
            let attempt_id = ReplyTier::Voice.attempt_id();
            match self
                .voice_attempt(
                    model,
                    context.clone(),
                    &user_text,
                    voice.as_ref(),
                    language,
                    &attempt_id,
                )
                .await
            {
                Ok(reply) => outcome = Some((reply, ReplyTier::Voice, attempt_id)),
                Err(e) => {
                    tracing::warn!(
                        conversation_id = %conversation_id,
                        attempt_id = %attempt_id,
                        error = %e,
                        "Voice tier failed, falling back to text"
                    );
                    failures.push(AttemptFailure {
                        tier: ReplyTier::Voice,
                        attempt_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        // TextFallback
        let (reply, mut tier, mut attempt_id) = match outcome {
            Some(done) => done,
            None => {
                let attempt_id = ReplyTier::Text.attempt_id();
                match self
                    .text_attempt(context, &user_text, language, &attempt_id)
                    .await
                {
                    Ok(reply) => (reply, ReplyTier::Text, attempt_id),
                    Err(e) => {
                        tracing::error!(
                            conversation_id = %conversation_id,
                            attempt_id = %attempt_id,
                            error = %e,
                            "Text tier failed, all tiers exhausted"
                        );
                        failures.push(AttemptFailure {
                            tier: ReplyTier::Text,
                            attempt_id,
                            error: e.to_string(),
                        });
                        self.log_turn(&session, &user_text, None, voice_input, &failures);
                        // guard 在此 drop，撤回用户发言
                        drop(guard);
                        return Err(ApplicationError::upstream(retry_message(language)));
                    }
                }
            }
        };

        // HasTextNoAudio -> TtsAttempt
        let mut audio = reply.audio.clone();
        if tier == ReplyTier::Text && audio.is_none() {
            if let Some(tts) = &self.tts {
                let tts_attempt_id = ReplyTier::Tts.attempt_id();
                match self
                    .tts_attempt(tts, &reply.text, language, &tts_attempt_id)
                    .await
                {
                    Ok(synthesized) => {
                        audio = Some(synthesized);
                        tier = ReplyTier::Tts;
                        attempt_id = tts_attempt_id;
                    }
                    Err(e) => {
                        tracing::warn!(
                            conversation_id = %conversation_id,
                            attempt_id = %tts_attempt_id,
                            error = %e,
                            "TTS tier failed, replying with text only"
                        );
                        failures.push(AttemptFailure {
                            tier: ReplyTier::Tts,
                            attempt_id: tts_attempt_id,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        let text = reply.text.trim().to_string();
        let stored_audio = audio.as_ref().map(|a| AudioContent {
            data: a.data.clone(),
            mime_type: a.mime_type.clone(),
        });
        let assistant_turn = ConversationTurn::assistant(text.clone(), stored_audio)
            .map_err(ApplicationError::internal)?;
        guard.complete(assistant_turn)?;

        tracing::info!(
            conversation_id = %conversation_id,
            tier = %tier,
            attempt_id = %attempt_id,
            voice_input = ?voice_input,
            has_audio = audio.is_some(),
            failed_attempts = failures.len(),
            "Chat turn completed"
        );

        self.log_turn(
            &session,
            &user_text,
            Some((&text, tier, &attempt_id)),
            voice_input,
            &failures,
        );

        Ok(ChatTurnResponse {
            conversation_id,
            text,
            audio,
            tier,
            attempt_id,
            voice_input,
        })
    }

    fn log_turn(
        &self,
        session: &ConversationSession,
        user_text: &str,
        reply: Option<(&str, ReplyTier, &str)>,
        voice_input: VoiceInputMode,
        failures: &[AttemptFailure],
    ) {
        let failures: Vec<serde_json::Value> = failures
            .iter()
            .map(|f| {
                serde_json::json!({
                    "tier": f.tier,
                    "attempt_id": f.attempt_id,
                    "error": f.error,
                })
            })
            .collect();
        let payload = serde_json::json!({
            "user_text": user_text,
            "voice_input": voice_input,
            "reply": reply.map(|(text, tier, attempt_id)| serde_json::json!({
                "text": text,
                "tier": tier,
                "attempt_id": attempt_id,
            })),
            "failures": failures,
        });
        self.log.dispatch(LogRecord::chat_turn(
            session.generation_id(),
            session.id(),
            session.language(),
            payload,
        ));
    }
}

/// ResetConversation Handler - 清除会话（幂等）
pub struct ResetConversationHandler {
    store: Arc<dyn ConversationStorePort>,
}

impl ResetConversationHandler {
    pub fn new(store: Arc<dyn ConversationStorePort>) -> Self {
        Self { store }
    }

    pub async fn handle(
        &self,
        cmd: ResetConversationCommand,
    ) -> Result<ResetConversationResponse, ApplicationError> {
        let existed = match self.store.remove(cmd.conversation_id) {
            Ok(()) => true,
            Err(ConversationStoreError::NotFound(_)) => false,
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            conversation_id = %cmd.conversation_id,
            existed = existed,
            "Conversation reset"
        );

        Ok(ResetConversationResponse {
            conversation_id: cmd.conversation_id,
            existed,
        })
    }
}
