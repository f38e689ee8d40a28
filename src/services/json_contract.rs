//! LLM 响应的 JSON 契约
//!
//! 每个调用点只期望一种结构：
//! 1. 空响应 → `ParseError`
//! 2. 严格解析；失败时去掉 markdown 代码块 / 截取最外层 `{...}` 再试，仍失败 → `ParseError`
//! 3. 反序列化为目标类型，缺字段或枚举越界 → `SchemaViolation`

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, ParseError, SchemaViolation};
use crate::utils::logging::truncate_text;

/// 解析为任意 JSON 对象
pub fn parse_json_value(label: &str, raw: &str) -> AppResult<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::EmptyResponse {
            label: label.to_string(),
        }
        .into());
    }

    let strict_err = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if let Some(candidate) = extract_json_block(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            warn!("{}: 响应不是纯 JSON，已从包裹文本中提取", label);
            return Ok(value);
        }
    }

    debug!("{}: 无法解析的响应: {}", label, truncate_text(trimmed, 500));
    Err(ParseError::InvalidJson {
        label: label.to_string(),
        preview: truncate_text(trimmed, 120),
        source: strict_err,
    }
    .into())
}

/// 解析并反序列化为目标类型
pub fn parse_llm_json<T: DeserializeOwned>(label: &str, raw: &str) -> AppResult<T> {
    let value = parse_json_value(label, raw)?;
    serde_json::from_value(value).map_err(|source| {
        AppError::Schema(SchemaViolation::Shape {
            label: label.to_string(),
            source,
        })
    })
}

/// 从被包裹的文本中找出 JSON 对象
///
/// 优先取 ```json 代码块的内容，否则取第一个 `{` 到最后一个 `}`。
pub fn extract_json_block(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```") {
        let after_fence = &text[start + 3..];
        // 跳过语言标记（例如 json）
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        if let Some(end) = body.find("```") {
            let inner = body[..end].trim();
            if !inner.is_empty() {
                return Some(inner);
            }
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// 紧凑 JSON，用于拼接提示词
pub fn to_prompt_json<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| "{}".to_string())
}
