use crate::error::{AppResult, ConfigError};

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 同时评估的作文数量
    pub max_concurrent_essays: usize,
    /// 待评估请求（TOML）存放目录
    pub request_folder: String,
    /// 评估结果输出目录
    pub output_folder: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 默认采样温度（各阶段可以覆盖）
    pub llm_temperature: f32,
    /// 默认最大输出 token 数
    pub llm_max_tokens: u32,
    /// 单次 LLM 调用超时（秒）
    pub llm_timeout_secs: u64,
    // --- 附加功能 ---
    /// 评估完成后是否生成范文
    pub generate_model_essay: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_essays: 4,
            request_folder: "essay_requests".to_string(),
            output_folder: "evaluation_results".to_string(),
            verbose_logging: false,
            output_log_file: "evaluation_log.txt".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            llm_temperature: 0.2,
            llm_max_tokens: 2000,
            llm_timeout_secs: 90,
            generate_model_essay: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_concurrent_essays: std::env::var("MAX_CONCURRENT_ESSAYS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_essays),
            request_folder: std::env::var("REQUEST_FOLDER").unwrap_or(default.request_folder),
            output_folder: std::env::var("OUTPUT_FOLDER").unwrap_or(default.output_folder),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            llm_temperature: std::env::var("LLM_TEMPERATURE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.llm_temperature),
            llm_max_tokens: std::env::var("LLM_MAX_TOKENS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.llm_max_tokens),
            llm_timeout_secs: std::env::var("LLM_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.llm_timeout_secs),
            generate_model_essay: std::env::var("GENERATE_MODEL_ESSAY").ok().and_then(|v| v.parse().ok()).unwrap_or(default.generate_model_essay),
        }
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> AppResult<()> {
        if self.max_concurrent_essays == 0 {
            return Err(ConfigError::InvalidValue {
                key: "MAX_CONCURRENT_ESSAYS".to_string(),
                value: self.max_concurrent_essays.to_string(),
                reason: "并发数必须大于 0".to_string(),
            }
            .into());
        }
        if !(0.0..=2.0).contains(&self.llm_temperature) {
            return Err(ConfigError::InvalidValue {
                key: "LLM_TEMPERATURE".to_string(),
                value: self.llm_temperature.to_string(),
                reason: "温度必须在 0.0 到 2.0 之间".to_string(),
            }
            .into());
        }
        if self.llm_max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                key: "LLM_MAX_TOKENS".to_string(),
                value: self.llm_max_tokens.to_string(),
                reason: "最大 token 数必须大于 0".to_string(),
            }
            .into());
        }
        if self.llm_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "LLM_TIMEOUT_SECS".to_string(),
                value: self.llm_timeout_secs.to_string(),
                reason: "超时时间必须大于 0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_concurrent_essays, 4);
        assert!(!config.generate_model_essay);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = Config {
            max_concurrent_essays: 0,
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), "config_error");
    }

    #[test]
    fn test_temperature_out_of_range_rejected() {
        let config = Config {
            llm_temperature: 3.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
