//! Health Query Handlers

use std::sync::Arc;

use serde::Serialize;

use crate::application::error::ApplicationError;
use crate::application::ports::{LlmPort, TtsEnginePort};
use crate::application::queries::ServiceHealth;

/// 上游健康状态，`None` 表示未启用
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealthResponse {
    pub text_model: bool,
    pub voice_model: Option<bool>,
    pub tts: Option<bool>,
}

/// ServiceHealth Handler
pub struct ServiceHealthHandler {
    text_model: Arc<dyn LlmPort>,
    voice_model: Option<Arc<dyn LlmPort>>,
    tts: Option<Arc<dyn TtsEnginePort>>,
}

impl ServiceHealthHandler {
    pub fn new(
        text_model: Arc<dyn LlmPort>,
        voice_model: Option<Arc<dyn LlmPort>>,
        tts: Option<Arc<dyn TtsEnginePort>>,
    ) -> Self {
        Self {
            text_model,
            voice_model,
            tts,
        }
    }

    pub async fn handle(
        &self,
        _query: ServiceHealth,
    ) -> Result<ServiceHealthResponse, ApplicationError> {
        let voice = async {
            match &self.voice_model {
                Some(model) => Some(model.health_check().await),
                None => None,
            }
        };
        let tts = async {
            match &self.tts {
                Some(tts) => Some(tts.health_check().await),
                None => None,
            }
        };
        let (text_model, voice_model, tts) =
            tokio::join!(self.text_model.health_check(), voice, tts);

        Ok(ServiceHealthResponse {
            text_model,
            voice_model,
            tts,
        })
    }
}
