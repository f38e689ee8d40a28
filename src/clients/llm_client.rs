//! LLM 客户端抽象
//!
//! 评估流水线只依赖 `LlmClient` trait，具体实现由调用方在构造时注入，
//! 测试中用脚本化的假客户端替换。

use std::future::Future;

use serde::Serialize;

use crate::error::AppResult;

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

/// 单条对话消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// 一次补全请求
///
/// `label` 标识调用方（例如 `coherence_cohesion_score`），用于日志和错误信息。
/// 温度和 token 上限为空时使用客户端的默认值。
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub label: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(label: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            label: label.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// 系统消息内容（如果有）
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
    }

    /// 所有用户消息内容拼接
    pub fn user_prompt(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// LLM 补全能力
///
/// 实现方负责网络调用、超时与重试策略；返回原始文本，JSON 解析由调用方完成。
pub trait LlmClient: Send + Sync {
    /// 发送补全请求，返回模型输出的原始文本
    fn complete(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = AppResult<String>> + Send;

    /// 模型标识，写入评估结果的 meta 中
    fn model_name(&self) -> &str;
}
