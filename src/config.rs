use crate::error::{AppError, AppResult, ConfigError};

/// 程序配置
///
/// 进程启动时从环境变量构造一次，之后显式传递给各客户端，
/// 不使用任何模块级全局状态。
#[derive(Clone, Debug)]
pub struct Config {
    // --- 生成模型 API 配置 ---
    /// 生成模型 API 密钥（必填）
    pub gemini_api_key: String,
    /// 生成模型 API 基础 URL
    pub gemini_base_url: String,
    /// 洞察聚合使用的模型
    pub insight_model_name: String,
    /// 文档转写使用的模型
    pub transcribe_model_name: String,
    // --- 文件轮询配置 ---
    /// 轮询间隔（秒）
    pub poll_interval_secs: u64,
    /// 最大轮询次数，超过后报超时错误
    pub poll_max_attempts: u32,
    // --- 数据存储配置（仅洞察流程需要）---
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// # 错误
    /// 缺少 `GEMINI_API_KEY` 时返回配置错误，调用方应立即退出。
    /// 数据存储的 URL / 密钥是可选的，由 `require_supabase` 在
    /// 洞察流程入口处检查。
    pub fn from_env() -> AppResult<Self> {
        let gemini_api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
            AppError::Config(ConfigError::EnvVarNotFound {
                var_name: "GEMINI_API_KEY".to_string(),
            })
        })?;

        Ok(Self {
            gemini_api_key,
            gemini_base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
            insight_model_name: std::env::var("INSIGHT_MODEL_NAME")
                .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            transcribe_model_name: std::env::var("TRANSCRIBE_MODEL_NAME")
                .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            poll_interval_secs: parse_env("FILE_POLL_INTERVAL_SECS", 10)?,
            poll_max_attempts: parse_env("FILE_POLL_MAX_ATTEMPTS", 60)?,
            // 两组变量名都支持，优先使用前者
            supabase_url: std::env::var("NEXT_PUBLIC_SUPABASE_URL")
                .or_else(|_| std::env::var("SUPABASE_URL"))
                .ok(),
            supabase_key: std::env::var("SUPABASE_SERVICE_ROLE_KEY")
                .or_else(|_| std::env::var("NEXT_PUBLIC_SUPABASE_ANON_KEY"))
                .ok(),
        })
    }

    /// 获取数据存储的 URL 和密钥
    ///
    /// # 错误
    /// 任一缺失时返回配置错误。
    pub fn require_supabase(&self) -> AppResult<(&str, &str)> {
        let url = self.supabase_url.as_deref().ok_or_else(|| {
            AppError::Config(ConfigError::EnvVarNotFound {
                var_name: "NEXT_PUBLIC_SUPABASE_URL / SUPABASE_URL".to_string(),
            })
        })?;
        let key = self.supabase_key.as_deref().ok_or_else(|| {
            AppError::Config(ConfigError::EnvVarNotFound {
                var_name: "SUPABASE_SERVICE_ROLE_KEY / NEXT_PUBLIC_SUPABASE_ANON_KEY".to_string(),
            })
        })?;
        Ok((url, key))
    }
}

/// 解析数值型环境变量，未设置时使用默认值，设置但无法解析时报错
fn parse_env<T: std::str::FromStr>(var_name: &str, default: T) -> AppResult<T> {
    match std::env::var(var_name) {
        Ok(value) => value.parse().map_err(|_| {
            AppError::Config(ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            })
        }),
        Err(_) => Ok(default),
    }
}
