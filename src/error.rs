use serde::Serialize;
use thiserror::Error;

use crate::models::Criterion;

/// 应用程序错误类型
///
/// 评估流水线里的每一个阶段都返回 `AppResult`，编排层据此决定是否继续。
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入错误（在任何 LLM 调用之前就能发现）
    #[error("输入错误: {0}")]
    Input(#[from] InputError),
    /// LLM 服务错误（上游调用失败 / 超时 / 空内容）
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// LLM 返回内容无法解析为 JSON
    #[error("解析错误: {0}")]
    Parse(#[from] ParseError),
    /// JSON 可以解析，但不符合约定的结构
    #[error("结构校验失败: {0}")]
    Schema(#[from] SchemaViolation),
    /// 某个评分项的子流程失败
    #[error("评分项 {criterion} 失败: {source}")]
    CriterionFailed {
        criterion: Criterion,
        #[source]
        source: Box<AppError>,
    },
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
}

/// 输入错误
#[derive(Debug, Error)]
pub enum InputError {
    /// 作文内容为空
    #[error("作文内容为空 (attempt: {attempt_id})")]
    EmptyAnswer { attempt_id: String },
    /// 缺少题目类型
    #[error("缺少 task_type (attempt: {attempt_id})")]
    MissingTaskType { attempt_id: String },
    /// 不支持的题目类型
    #[error("不支持的 task_type: '{value}'")]
    UnsupportedTaskType { value: String },
    /// 请求文件中没有作文
    #[error("请求文件为空: {path}")]
    EmptyRequestFile { path: String },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 请求构建失败
    #[error("构建 LLM 请求失败 ({label}): {message}")]
    RequestBuildFailed { label: String, message: String },
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}, 调用: {label}): {source}")]
    ApiCallFailed {
        model: String,
        label: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 调用超时
    #[error("LLM 调用超时 (模型: {model}, 调用: {label}, {seconds}秒)")]
    Timeout {
        model: String,
        label: String,
        seconds: u64,
    },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model}, 调用: {label})")]
    EmptyContent { model: String, label: String },
}

/// LLM 响应解析错误
#[derive(Debug, Error)]
pub enum ParseError {
    /// 响应为空
    #[error("LLM 响应为空 ({label})")]
    EmptyResponse { label: String },
    /// 响应不是合法 JSON
    #[error("无法解析 JSON ({label}): {source}; 响应预览: {preview}")]
    InvalidJson {
        label: String,
        preview: String,
        source: serde_json::Error,
    },
}

/// 结构校验错误
#[derive(Debug, Error)]
pub enum SchemaViolation {
    /// 缺少字段 / 枚举值越界 / 类型不符
    #[error("JSON 结构不符 ({label}): {source}")]
    Shape {
        label: String,
        source: serde_json::Error,
    },
    /// 引用了不存在的句子 ID
    #[error("引用了不存在的句子 ID ({label}): {sid}")]
    UnknownSid { label: String, sid: String },
    /// 引用了不存在的段落 ID
    #[error("引用了不存在的段落 ID ({label}): {pid}")]
    UnknownPid { label: String, pid: String },
    /// 片段不是原句的子串
    #[error("片段不在句子 {sid} 中 ({label}): '{span}'")]
    SpanNotInSentence {
        label: String,
        sid: String,
        span: String,
    },
    /// 字段取值不合法
    #[error("字段 {field} 取值不合法 ({label}): {reason}")]
    InvalidValue {
        label: String,
        field: String,
        reason: String,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置值不合法
    #[error("配置项 {key} 取值不合法 '{value}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
    /// 缺少必要配置
    #[error("缺少配置项 {key}")]
    MissingValue { key: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        source: toml::de::Error,
    },
    /// 目录不存在
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },
}

// ========== 从常见错误类型转换 ==========

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: err,
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Schema(SchemaViolation::Shape {
            label: "json".to_string(),
            source: err,
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: err,
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建 LLM API 调用错误
    pub fn llm_api_failed(
        model: impl Into<String>,
        label: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            label: label.into(),
            source: Box::new(source),
        })
    }

    /// 创建字段取值错误
    pub fn invalid_value(
        label: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        AppError::Schema(SchemaViolation::InvalidValue {
            label: label.into(),
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// 创建未知句子 ID 错误
    pub fn unknown_sid(label: impl Into<String>, sid: impl Into<String>) -> Self {
        AppError::Schema(SchemaViolation::UnknownSid {
            label: label.into(),
            sid: sid.into(),
        })
    }

    /// 把错误包装为某个评分项的失败
    ///
    /// 已经包装过的错误保持原样，避免出现嵌套的 CriterionFailed。
    pub fn criterion_failed(criterion: Criterion, err: AppError) -> Self {
        match err {
            AppError::CriterionFailed { .. } => err,
            other => AppError::CriterionFailed {
                criterion,
                source: Box::new(other),
            },
        }
    }

    /// 错误类别（结构化失败原因）
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Input(_) => "input_error",
            AppError::Llm(_) => "upstream_service_error",
            AppError::Parse(_) => "parse_error",
            AppError::Schema(_) => "schema_violation",
            AppError::CriterionFailed { source, .. } => source.kind(),
            AppError::Config(_) => "config_error",
            AppError::File(_) => "file_error",
        }
    }

    /// 失败的评分项（如果有）
    pub fn criterion(&self) -> Option<Criterion> {
        match self {
            AppError::CriterionFailed { criterion, .. } => Some(*criterion),
            _ => None,
        }
    }

    /// 转换为可序列化的失败原因，交给调用方处理
    pub fn failure_reason(&self) -> FailureReason {
        FailureReason {
            kind: self.kind().to_string(),
            criterion: self.criterion(),
            message: self.to_string(),
        }
    }
}

/// 结构化失败原因
///
/// 本模块不生成面向用户的错误文案，只输出这一结构。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureReason {
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criterion: Option<Criterion>,
    pub message: String,
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criterion_failed_keeps_inner_kind() {
        let inner = AppError::unknown_sid("grammar_evidence", "P9S9");
        let err = AppError::criterion_failed(Criterion::Grammar, inner);

        assert_eq!(err.kind(), "schema_violation");
        assert_eq!(err.criterion(), Some(Criterion::Grammar));
        assert!(err.to_string().contains("P9S9"));
    }

    #[test]
    fn test_criterion_failed_is_not_nested() {
        let inner = AppError::criterion_failed(
            Criterion::LexicalResource,
            AppError::Parse(ParseError::EmptyResponse {
                label: "lexical_resource_score".to_string(),
            }),
        );
        let err = AppError::criterion_failed(Criterion::Grammar, inner);

        assert_eq!(err.criterion(), Some(Criterion::LexicalResource));
        assert_eq!(err.kind(), "parse_error");
    }

    #[test]
    fn test_failure_reason_serializes_without_criterion() {
        let err = AppError::Input(InputError::EmptyAnswer {
            attempt_id: "a-1".to_string(),
        });
        let json = serde_json::to_value(err.failure_reason()).unwrap();

        assert_eq!(json["kind"], "input_error");
        assert!(json.get("criterion").is_none());
    }
}
