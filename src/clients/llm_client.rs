/// LLM API 客户端
///
/// 封装发音生成的提示词和 API 调用，兼容 OpenAI API 的服务（如 Gemini）
use crate::config::Config;
use crate::error::{GenerationError, GenerationResult};
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use super::PronunciationGenerator;

/// LLM 客户端
///
/// 未配置 API 密钥时 `client` 为 `None`，所有生成请求直接返回 `NotConfigured`
pub struct LlmClient {
    client: Option<Client<OpenAIConfig>>,
    model_name: String,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(config: &Config) -> Self {
        let client = match &config.llm_api_key {
            Some(api_key) => {
                let openai_config = OpenAIConfig::new()
                    .with_api_key(api_key)
                    .with_api_base(&config.llm_api_base_url);
                Some(Client::with_config(openai_config))
            }
            None => {
                warn!("未设置 GEMINI_API_KEY / LLM_API_KEY，发音生成功能已停用");
                None
            }
        };

        Self {
            client,
            model_name: config.llm_model_name.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// 发送单条用户消息，返回去除首尾空白的回复
    pub async fn chat(&self, user_message: &str) -> GenerationResult<String> {
        let client = self.client.as_ref().ok_or(GenerationError::NotConfigured)?;

        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息: {}", user_message);

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(|source| self.request_error(source))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .build()
            .map_err(|source| self.request_error(source))?;

        let response = client
            .chat()
            .create(request)
            .await
            .map_err(|source| self.request_error(source))?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| GenerationError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content)
    }

    fn request_error(&self, source: async_openai::error::OpenAIError) -> GenerationError {
        GenerationError::Request {
            model: self.model_name.clone(),
            source,
        }
    }
}

/// 发音提示词
pub fn pronunciation_prompt(scientific_name: &str) -> String {
    format!(
        "Pronounce {} using English Scientific Latin with explanation",
        scientific_name
    )
}

#[async_trait]
impl PronunciationGenerator for LlmClient {
    async fn generate(&self, scientific_name: &str) -> GenerationResult<String> {
        self.chat(&pronunciation_prompt(scientific_name)).await
    }
}
