//! Story Command Handlers

use std::sync::Arc;
use std::time::Duration;

use crate::application::commands::story_commands::*;
use crate::application::error::ApplicationError;
use crate::application::log_dispatch::LogDispatcher;
use crate::application::ports::{ChatMessage, ChatRequest, LlmError, LlmPort, LogRecord};
use crate::domain::story::{compose_stories, GenerationId, Seed, StorySource, MAX_SENTENCES};

/// 故事生成参数
#[derive(Debug, Clone)]
pub struct StorySettings {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for StorySettings {
    fn default() -> Self {
        Self {
            temperature: 0.9,
            top_p: 0.9,
            max_tokens: 800,
            timeout: Duration::from_secs(20),
        }
    }
}

fn story_system_prompt() -> String {
    format!(
        "You write very short, cheerful stories for young children. \
         Turn the child's words into one story told twice: once in simplified Chinese and once in English. \
         Each version has at most {max} short sentences. \
         The Chinese version uses only Chinese characters, the full stop 。 and the comma ，. \
         The English version uses only letters, spaces, commas and full stops. \
         Do not end with sleeping, bedtime or good night; end with energy and fun. \
         Reply with a single JSON object and nothing else: {{\"zh\": \"...\", \"en\": \"...\"}}",
        max = MAX_SENTENCES
    )
}

/// GenerateStory Handler - 一次调用生成中英文故事
///
/// 上游失败、超时或内容不合规都不会让请求失败，对应语言改用兜底故事
pub struct GenerateStoryHandler {
    text_model: Arc<dyn LlmPort>,
    log: LogDispatcher,
    settings: StorySettings,
}

impl GenerateStoryHandler {
    pub fn new(text_model: Arc<dyn LlmPort>, log: LogDispatcher, settings: StorySettings) -> Self {
        Self {
            text_model,
            log,
            settings,
        }
    }

    async fn request_story(&self, seed: &Seed, attempt_id: &str) -> Result<String, LlmError> {
        let request = ChatRequest::new(vec![
            ChatMessage::system(story_system_prompt()),
            ChatMessage::user(seed.as_str()),
        ])
        .with_sampling(
            self.settings.temperature,
            self.settings.top_p,
            self.settings.max_tokens,
        )
        .with_attempt_id(attempt_id);

        match tokio::time::timeout(self.settings.timeout, self.text_model.complete(request)).await
        {
            Ok(Ok(reply)) => Ok(reply.text),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(LlmError::Timeout),
        }
    }

    pub async fn handle(
        &self,
        cmd: GenerateStoryCommand,
    ) -> Result<GenerateStoryResponse, ApplicationError> {
        let seed = Seed::new(&cmd.seed)?;
        let generation_id = GenerationId::new();
        let attempt_id = format!("story-{}", uuid::Uuid::new_v4());

        let reply = match self.request_story(&seed, &attempt_id).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(
                    generation_id = %generation_id,
                    attempt_id = %attempt_id,
                    error = %e,
                    "Story generation failed, using fallback stories"
                );
                None
            }
        };

        let stories = compose_stories(seed.as_str(), reply.as_deref());

        tracing::info!(
            generation_id = %generation_id,
            seed_units = seed.utf16_len(),
            upstream_ok = reply.is_some(),
            sources = ?stories.iter().map(|s| s.source.as_str()).collect::<Vec<_>>(),
            "Stories generated"
        );

        self.log.dispatch(LogRecord::generation(
            generation_id,
            seed.as_str(),
            serde_json::json!({
                "attempt_id": attempt_id,
                "upstream_ok": reply.is_some(),
                "raw": reply,
                "stories": stories,
                "fallback_used": stories.iter().any(|s| s.source == StorySource::Fallback),
            }),
        ));

        Ok(GenerateStoryResponse {
            generation_id,
            seed: seed.as_str().to_string(),
            stories,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::ChatReply;
    use crate::domain::story::{fallback, Language};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedModel {
        reply: Mutex<Option<Result<ChatReply, LlmError>>>,
        delay: Duration,
        last_request: Mutex<Option<ChatRequest>>,
    }

    impl ScriptedModel {
        fn new(reply: Result<ChatReply, LlmError>) -> Self {
            Self {
                reply: Mutex::new(Some(reply)),
                delay: Duration::ZERO,
                last_request: Mutex::new(None),
            }
        }

        fn text(text: &str) -> Self {
            Self::new(Ok(ChatReply {
                text: text.to_string(),
                audio: None,
            }))
        }
    }

    #[async_trait]
    impl LlmPort for ScriptedModel {
        async fn complete(&self, request: ChatRequest) -> Result<ChatReply, LlmError> {
            *self.last_request.lock().unwrap() = Some(request);
            tokio::time::sleep(self.delay).await;
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Err(LlmError::EmptyReply))
        }
    }

    fn handler(model: Arc<ScriptedModel>, timeout: Duration) -> GenerateStoryHandler {
        GenerateStoryHandler::new(
            model,
            LogDispatcher::disabled(),
            StorySettings {
                timeout,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_model_story_used_when_valid() {
        let model = Arc::new(ScriptedModel::text(
            r#"{"zh": "小熊找到了蜂蜜。它开心地跳舞。", "en": "The bear found honey. It danced."}"#,
        ));
        let handler = handler(model.clone(), Duration::from_secs(5));
        let resp = handler
            .handle(GenerateStoryCommand {
                seed: "honey".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(resp.stories.len(), 2);
        assert!(resp.stories.iter().all(|s| s.source == StorySource::Model));
        assert_eq!(resp.stories[1].text, "The bear found honey. It danced.");

        let request = model.last_request.lock().unwrap().take().unwrap();
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.max_tokens, Some(800));
    }

    #[tokio::test]
    async fn test_upstream_error_falls_back() {
        let model = Arc::new(ScriptedModel::new(Err(LlmError::ServiceError(
            "HTTP 500".to_string(),
        ))));
        let resp = handler(model, Duration::from_secs(5))
            .handle(GenerateStoryCommand {
                seed: "asdf😀".to_string(),
            })
            .await
            .unwrap();

        for story in &resp.stories {
            assert_eq!(story.source, StorySource::Fallback);
            assert_eq!(story.text, fallback("asdf😀", story.language));
        }
        // 7 句
        assert_eq!(resp.stories[0].text.matches('。').count(), 7);
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let mut model = ScriptedModel::text(r#"{"zh": "太慢了。", "en": "Too slow."}"#);
        model.delay = Duration::from_millis(500);
        let resp = handler(Arc::new(model), Duration::from_millis(20))
            .handle(GenerateStoryCommand {
                seed: "turtle".to_string(),
            })
            .await
            .unwrap();
        assert!(resp
            .stories
            .iter()
            .all(|s| s.source == StorySource::Fallback));
    }

    #[tokio::test]
    async fn test_blank_seed_rejected() {
        let model = Arc::new(ScriptedModel::text("{}"));
        let err = handler(model, Duration::from_secs(1))
            .handle(GenerateStoryCommand {
                seed: "  \n ".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_long_seed_truncated() {
        let model = Arc::new(ScriptedModel::new(Err(LlmError::Timeout)));
        let resp = handler(model, Duration::from_secs(1))
            .handle(GenerateStoryCommand {
                seed: "a".repeat(500),
            })
            .await
            .unwrap();
        assert_eq!(resp.seed.len(), 200);
        assert_eq!(resp.stories[1].language, Language::En);
    }
}
