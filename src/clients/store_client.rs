//! 数据存储 REST 客户端
//!
//! 封装所有与数据存储（Supabase 风格 REST 接口）相关的调用逻辑：
//! 按作业 ID 拉取批改结果、写回洞察报告。

use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, AppResult, StoreError};

/// 批改结果存储能力
#[allow(async_fn_in_trait)]
pub trait ResultsStore {
    /// 拉取指定作业的全部批改记录（每条为不透明 JSON）
    async fn fetch_results(&self, assignment_id: &str) -> AppResult<Vec<Value>>;

    /// 写入洞察报告；非 2xx 响应时返回错误，由调用方决定是否忽略
    async fn store_insights(&self, assignment_id: &str, report: &Value) -> AppResult<()>;
}

/// 数据存储客户端
pub struct StoreClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl StoreClient {
    /// 创建新的数据存储客户端
    ///
    /// # 错误
    /// 配置中缺少数据存储的 URL 或密钥时返回配置错误。
    pub fn new(config: &Config) -> AppResult<Self> {
        let (url, key) = config.require_supabase()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::store_request_failed("client", e))?;

        Ok(Self {
            http,
            base_url: url.trim_end_matches('/').to_string(),
            api_key: key.to_string(),
        })
    }

    fn rest_endpoint(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }
}

impl ResultsStore for StoreClient {
    async fn fetch_results(&self, assignment_id: &str) -> AppResult<Vec<Value>> {
        let endpoint = self.rest_endpoint("results");
        debug!("拉取批改结果，作业: {}", assignment_id);

        let id_filter = format!("eq.{}", assignment_id);
        let response = self
            .http
            .get(&endpoint)
            .query(&[("select", "*"), ("assignment_id", id_filter.as_str())])
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AppError::store_request_failed(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Store(StoreError::BadStatus {
                endpoint,
                status: status.as_u16(),
                body,
            }));
        }

        let rows = response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| AppError::store_request_failed(&endpoint, e))?;

        debug!("拉取到 {} 条批改记录", rows.len());
        Ok(rows)
    }

    async fn store_insights(&self, assignment_id: &str, report: &Value) -> AppResult<()> {
        let endpoint = self.rest_endpoint("insights");
        let payload = json!({
            "assignment_id": assignment_id,
            "insights_json": report,
        });

        let response = self
            .http
            .post(&endpoint)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::store_request_failed(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Store(StoreError::BadStatus {
                endpoint,
                status: status.as_u16(),
                body,
            }));
        }

        debug!("洞察报告已写入，作业: {}", assignment_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> StoreClient {
        StoreClient {
            http: reqwest::Client::new(),
            base_url: "https://project.supabase.co".to_string(),
            api_key: "service-role-key".to_string(),
        }
    }

    #[test]
    fn test_rest_endpoint() {
        let store = test_store();
        assert_eq!(
            store.rest_endpoint("results"),
            "https://project.supabase.co/rest/v1/results"
        );
        assert_eq!(
            store.rest_endpoint("insights"),
            "https://project.supabase.co/rest/v1/insights"
        );
    }

    #[test]
    fn test_new_requires_supabase_config() {
        let config = Config {
            gemini_api_key: "k".to_string(),
            gemini_base_url: "https://example.com".to_string(),
            insight_model_name: "m".to_string(),
            transcribe_model_name: "m".to_string(),
            poll_interval_secs: 10,
            poll_max_attempts: 60,
            supabase_url: None,
            supabase_key: None,
        };
        assert!(StoreClient::new(&config).is_err());
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let config = Config {
            gemini_api_key: "k".to_string(),
            gemini_base_url: "https://example.com".to_string(),
            insight_model_name: "m".to_string(),
            transcribe_model_name: "m".to_string(),
            poll_interval_secs: 10,
            poll_max_attempts: 60,
            supabase_url: Some("https://project.supabase.co/".to_string()),
            supabase_key: Some("key".to_string()),
        };
        let store = StoreClient::new(&config).unwrap();
        assert_eq!(
            store.rest_endpoint("results"),
            "https://project.supabase.co/rest/v1/results"
        );
    }
}
