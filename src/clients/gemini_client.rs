//! 生成模型 API 客户端
//!
//! 封装所有与生成模型 REST 接口相关的调用逻辑：
//! 内容生成、文件上传（两步续传协议）、文件状态查询、文件删除。

use std::path::Path;

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, GeminiError};
use crate::models::gemini::{
    GenerateContentRequest, GenerateContentResponse, RemoteFile, UploadFileResponse,
};

/// 生成模型后端能力
///
/// 业务层只依赖这个 trait，测试中用脚本化的假实现替换真实客户端。
#[allow(async_fn_in_trait)]
pub trait GenerativeApi {
    /// 发起一次生成调用
    async fn generate_content(
        &self,
        model: &str,
        request: GenerateContentRequest,
    ) -> AppResult<GenerateContentResponse>;

    /// 上传本地文件，返回远端文件句柄（通常处于 PROCESSING 状态）
    async fn upload_file(&self, path: &Path, display_name: &str) -> AppResult<RemoteFile>;

    /// 按资源名查询文件的最新状态
    async fn get_file(&self, name: &str) -> AppResult<RemoteFile>;

    /// 删除远端文件
    async fn delete_file(&self, name: &str) -> AppResult<()>;
}

/// 生成模型客户端
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// 创建新的客户端
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.gemini_api_key.clone(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn model_endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        )
    }

    fn file_endpoint(&self, name: &str) -> String {
        // name 形如 "files/abc-123"
        format!("{}/v1beta/{}?key={}", self.base_url, name, self.api_key)
    }

    fn upload_endpoint(&self) -> String {
        format!("{}/upload/v1beta/files?key={}", self.base_url, self.api_key)
    }

    /// 检查响应状态码，非 2xx 时取出响应体构造错误
    async fn check_status(
        endpoint: &str,
        response: reqwest::Response,
    ) -> AppResult<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Gemini(GeminiError::BadStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            }));
        }
        Ok(response)
    }
}

/// 按扩展名推断 MIME 类型
fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

impl GenerativeApi for GeminiClient {
    async fn generate_content(
        &self,
        model: &str,
        request: GenerateContentRequest,
    ) -> AppResult<GenerateContentResponse> {
        let endpoint = self.model_endpoint(model);
        debug!("调用生成接口，模型: {}", model);

        let response = self
            .http
            .post(&endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("生成接口调用失败: {}", e);
                AppError::gemini_request_failed(format!("models/{}:generateContent", model), e)
            })?;

        let response = Self::check_status(&endpoint, response).await?;
        let parsed = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| {
                AppError::gemini_request_failed(format!("models/{}:generateContent", model), e)
            })?;

        debug!("生成接口调用成功，候选数量: {}", parsed.candidates.len());
        Ok(parsed)
    }

    async fn upload_file(&self, path: &Path, display_name: &str) -> AppResult<RemoteFile> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        let mime_type = mime_for_path(path);
        let endpoint = self.upload_endpoint();

        debug!(
            "开始上传文件: {} ({} 字节, {})",
            path.display(),
            data.len(),
            mime_type
        );

        // 第一步：创建上传会话，续传 URL 在响应头里返回
        let metadata = serde_json::json!({ "file": { "display_name": display_name } });
        let response = self
            .http
            .post(&endpoint)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", data.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&metadata)
            .send()
            .await
            .map_err(|e| AppError::gemini_request_failed("upload/v1beta/files", e))?;

        let response = Self::check_status(&endpoint, response).await?;
        let upload_url = response
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
            .ok_or_else(|| {
                AppError::Gemini(GeminiError::UploadUrlMissing {
                    endpoint: "upload/v1beta/files".to_string(),
                })
            })?;

        // 第二步：一次性上传全部字节并结束会话
        let response = self
            .http
            .post(&upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(data)
            .send()
            .await
            .map_err(|e| AppError::gemini_request_failed("upload/v1beta/files (finalize)", e))?;

        let response = Self::check_status(&upload_url, response).await?;
        let parsed = response
            .json::<UploadFileResponse>()
            .await
            .map_err(|e| AppError::gemini_request_failed("upload/v1beta/files (finalize)", e))?;

        debug!(
            "文件已上传: {} (状态: {})",
            parsed.file.name,
            parsed.file.state.as_str()
        );
        Ok(parsed.file)
    }

    async fn get_file(&self, name: &str) -> AppResult<RemoteFile> {
        let endpoint = self.file_endpoint(name);
        let response = self
            .http
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| AppError::gemini_request_failed(name.to_string(), e))?;

        let response = Self::check_status(&endpoint, response).await?;
        let file = response
            .json::<RemoteFile>()
            .await
            .map_err(|e| AppError::gemini_request_failed(name.to_string(), e))?;

        debug!("查询文件状态: {} -> {}", file.name, file.state.as_str());
        Ok(file)
    }

    async fn delete_file(&self, name: &str) -> AppResult<()> {
        let endpoint = self.file_endpoint(name);
        let response = self
            .http
            .delete(&endpoint)
            .send()
            .await
            .map_err(|e| AppError::gemini_request_failed(name.to_string(), e))?;

        Self::check_status(&endpoint, response).await?;
        debug!("已删除远端文件: {}", name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_client() -> GeminiClient {
        GeminiClient {
            http: reqwest::Client::new(),
            api_key: "test-key".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
        }
    }

    #[test]
    fn test_model_endpoint() {
        let client = test_client();
        assert_eq!(
            client.model_endpoint("gemini-2.5-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent?key=test-key"
        );
    }

    #[test]
    fn test_file_endpoint_uses_resource_name() {
        let client = test_client();
        assert_eq!(
            client.file_endpoint("files/abc-123"),
            "https://generativelanguage.googleapis.com/v1beta/files/abc-123?key=test-key"
        );
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = Config {
            gemini_api_key: "k".to_string(),
            gemini_base_url: "https://example.com/".to_string(),
            insight_model_name: "m".to_string(),
            transcribe_model_name: "m".to_string(),
            poll_interval_secs: 10,
            poll_max_attempts: 60,
            supabase_url: None,
            supabase_key: None,
        };
        let client = GeminiClient::new(&config);
        assert_eq!(
            client.upload_endpoint(),
            "https://example.com/upload/v1beta/files?key=k"
        );
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(&PathBuf::from("exam.pdf")), "application/pdf");
        assert_eq!(mime_for_path(&PathBuf::from("EXAM.PDF")), "application/pdf");
        assert_eq!(mime_for_path(&PathBuf::from("photo.JPG")), "image/jpeg");
        assert_eq!(
            mime_for_path(&PathBuf::from("unknown.bin")),
            "application/octet-stream"
        );
        assert_eq!(
            mime_for_path(&PathBuf::from("no_extension")),
            "application/octet-stream"
        );
    }
}
