//! OpenAI 兼容的 LLM 客户端
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use tracing::{debug, warn};

use super::llm_client::{ChatRole, CompletionRequest, LlmClient};
use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError, LlmError};

/// OpenAI 兼容客户端
///
/// 职责：
/// - 把 `CompletionRequest` 转换为 chat completion 请求
/// - 应用默认温度 / token 上限 / 超时
/// - 不解析 JSON，不关心评估流程
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model_name: String,
    default_temperature: f32,
    default_max_tokens: u32,
    timeout: Duration,
}

impl OpenAiClient {
    /// 创建新的客户端
    ///
    /// API Key 为空时返回配置错误，而不是等到第一次调用才失败。
    pub fn new(config: &Config) -> AppResult<Self> {
        if config.llm_api_key.trim().is_empty() {
            return Err(ConfigError::MissingValue {
                key: "LLM_API_KEY".to_string(),
            }
            .into());
        }

        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Ok(Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            default_temperature: config.llm_temperature,
            default_max_tokens: config.llm_max_tokens,
            timeout: Duration::from_secs(config.llm_timeout_secs),
        })
    }

    fn build_failed(label: &str, err: impl std::fmt::Display) -> AppError {
        AppError::Llm(LlmError::RequestBuildFailed {
            label: label.to_string(),
            message: err.to_string(),
        })
    }
}

impl LlmClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> AppResult<String> {
        let label = request.label.as_str();
        debug!("调用 LLM API，模型: {}, 调用: {}", self.model_name, label);
        debug!("用户消息长度: {} 字符", request.user_prompt().len());

        // 构建消息列表
        let mut messages = Vec::with_capacity(request.messages.len());
        for message in &request.messages {
            let converted = match message.role {
                ChatRole::System => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(message.content.as_str())
                        .build()
                        .map_err(|e| Self::build_failed(label, e))?,
                ),
                ChatRole::User => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(message.content.as_str())
                        .build()
                        .map_err(|e| Self::build_failed(label, e))?,
                ),
            };
            messages.push(converted);
        }

        // 构建请求
        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(request.temperature.unwrap_or(self.default_temperature))
            .max_tokens(request.max_tokens.unwrap_or(self.default_max_tokens))
            .build()
            .map_err(|e| Self::build_failed(label, e))?;

        // 调用 API（带超时）
        let response = tokio::time::timeout(self.timeout, self.client.chat().create(chat_request))
            .await
            .map_err(|_| {
                warn!("LLM API 调用超时: {}", label);
                AppError::Llm(LlmError::Timeout {
                    model: self.model_name.clone(),
                    label: label.to_string(),
                    seconds: self.timeout.as_secs(),
                })
            })?
            .map_err(|e| {
                warn!("LLM API 调用失败: {}", e);
                AppError::llm_api_failed(&self.model_name, label, e)
            })?;

        debug!("LLM API 调用成功: {}", label);

        // 提取响应内容
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                AppError::Llm(LlmError::EmptyContent {
                    model: self.model_name.clone(),
                    label: label.to_string(),
                })
            })?;

        Ok(content.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::ChatMessage;

    fn create_test_client() -> OpenAiClient {
        let config = Config::from_env();
        OpenAiClient::new(&config).expect("需要设置 LLM_API_KEY")
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let config = Config {
            llm_api_key: "   ".to_string(),
            ..Config::default()
        };
        let err = OpenAiClient::new(&config).err().unwrap();
        assert_eq!(err.kind(), "config_error");
    }

    #[test]
    fn test_model_name_from_config() {
        let config = Config {
            llm_api_key: "sk-test".to_string(),
            llm_model_name: "gpt-test".to_string(),
            ..Config::default()
        };
        let client = OpenAiClient::new(&config).unwrap();
        assert_eq!(client.model_name(), "gpt-test");
    }

    #[tokio::test]
    #[ignore] // 需要真实的 API 密钥
    async fn test_complete_live() {
        let client = create_test_client();
        let request = CompletionRequest::new(
            "live_smoke",
            vec![
                ChatMessage::system("Reply with JSON only."),
                ChatMessage::user("Return {\"ok\": true}"),
            ],
        );

        let result = client.complete(request).await;
        assert!(result.is_ok(), "LLM 调用应该成功: {:?}", result.err());
    }
}
