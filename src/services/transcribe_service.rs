//! 文档转写服务 - 业务能力层
//!
//! 负责"上传 → 轮询到终态 → 生成 → 清理"的完整序列。
//!
//! ## 资源语义
//! 远端文件句柄由一次调用独占，上传成功后无论后续哪一步失败，
//! 都恰好发起一次删除；删除失败只记录警告（远端会在过期后自动回收）。

use std::path::Path;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::clients::GenerativeApi;
use crate::config::Config;
use crate::error::{AppError, AppResult, GeminiError};
use crate::models::gemini::{GenerateContentRequest, GenerationConfig, RemoteFile};
use crate::prompts;

/// 转写时的采样温度（确定性输出）
const TRANSCRIBE_TEMPERATURE: f32 = 0.0;
/// 转写输出长度上限
const TRANSCRIBE_MAX_OUTPUT_TOKENS: u32 = 15_000;

/// 文档转写服务
pub struct TranscribeService<G> {
    api: G,
    model_name: String,
    poll_interval: Duration,
    poll_max_attempts: u32,
}

impl<G: GenerativeApi> TranscribeService<G> {
    /// 创建新的转写服务
    pub fn new(api: G, config: &Config) -> Self {
        Self {
            api,
            model_name: config.transcribe_model_name.clone(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            poll_max_attempts: config.poll_max_attempts,
        }
    }

    /// 转写一个本地 PDF 文件
    ///
    /// # 参数
    /// - `pdf_path`: 可读的本地文件路径
    ///
    /// # 返回
    /// 转写出的纯文本
    pub async fn transcribe(&self, pdf_path: &Path) -> AppResult<String> {
        let display_name = pdf_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "document.pdf".to_string());

        info!("📤 正在上传文件: {}", pdf_path.display());
        let uploaded = self.api.upload_file(pdf_path, &display_name).await?;
        info!(
            "✓ 文件已上传: {} (URI: {})",
            uploaded.name,
            uploaded.uri.as_deref().unwrap_or("-")
        );

        let result = self.run_with_file(&uploaded).await;

        // 无论成败都清理远端文件，删除失败只记录
        match self.api.delete_file(&uploaded.name).await {
            Ok(()) => info!("🗑️ 已清理远端文件: {}", uploaded.name),
            Err(e) => warn!("⚠️ 删除远端文件失败 ({}): {}", uploaded.name, e),
        }

        result
    }

    /// 等待就绪后发起转写生成
    async fn run_with_file(&self, uploaded: &RemoteFile) -> AppResult<String> {
        let file = self.wait_until_active(uploaded.clone()).await?;
        info!("✓ 文件已就绪，发送转写请求...");

        let request =
            GenerateContentRequest::from_file_and_text(&file, prompts::TRANSCRIBE_USER_PROMPT)
                .with_system_instruction(prompts::TRANSCRIBE_SYSTEM_PROMPT)
                .with_generation_config(GenerationConfig {
                    temperature: Some(TRANSCRIBE_TEMPERATURE),
                    max_output_tokens: Some(TRANSCRIBE_MAX_OUTPUT_TOKENS),
                });

        let response = self.api.generate_content(&self.model_name, request).await?;

        let text = response.first_text().ok_or_else(|| {
            AppError::Gemini(GeminiError::EmptyContent {
                model: self.model_name.clone(),
            })
        })?;

        Ok(text.trim().to_string())
    }

    /// 轮询远端文件直到离开 PROCESSING 状态
    ///
    /// 每轮休眠固定间隔后重新按资源名查询最新状态，绝不复用上一次的响应。
    /// 超过最大轮询次数仍未到达终态时返回超时错误（区别于处理失败）。
    async fn wait_until_active(&self, file: RemoteFile) -> AppResult<RemoteFile> {
        let mut file = file;
        let mut attempts = 0u32;

        debug!("当前文件状态: {}", file.state.as_str());
        while file.state.is_processing() {
            if attempts >= self.poll_max_attempts {
                return Err(AppError::Gemini(GeminiError::PollTimeout {
                    name: file.name,
                    attempts,
                }));
            }
            debug!(
                "文件处理中，{} 秒后重新查询...",
                self.poll_interval.as_secs()
            );
            sleep(self.poll_interval).await;
            attempts += 1;

            file = self.api.get_file(&file.name).await?;
            debug!("当前文件状态: {}", file.state.as_str());
        }

        if !file.state.is_active() {
            return Err(AppError::Gemini(GeminiError::ProcessingFailed {
                state: file.state.as_str().to_string(),
                name: file.name,
            }));
        }

        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::models::gemini::{
        Candidate, Content, FileState, FinishReason, GenerateContentResponse, Part,
    };

    /// 脚本化的生成模型假实现
    ///
    /// `states` 依次作为每轮 `get_file` 的返回状态，
    /// 耗尽后一直返回 PROCESSING（模拟卡住的远端文件）。
    struct FakeApi {
        initial_state: FileState,
        states: Mutex<VecDeque<FileState>>,
        generate_ok: bool,
        upload_calls: AtomicUsize,
        get_calls: AtomicUsize,
        delete_calls: AtomicUsize,
        generate_calls: AtomicUsize,
    }

    impl FakeApi {
        fn new(initial_state: FileState, script: Vec<FileState>, generate_ok: bool) -> Self {
            Self {
                initial_state,
                states: Mutex::new(script.into()),
                generate_ok,
                upload_calls: AtomicUsize::new(0),
                get_calls: AtomicUsize::new(0),
                delete_calls: AtomicUsize::new(0),
                generate_calls: AtomicUsize::new(0),
            }
        }

        fn remote_file(&self, state: FileState) -> RemoteFile {
            RemoteFile {
                name: "files/fake-123".to_string(),
                display_name: Some("exam.pdf".to_string()),
                uri: Some("https://example.com/v1beta/files/fake-123".to_string()),
                mime_type: Some("application/pdf".to_string()),
                state,
            }
        }
    }

    impl GenerativeApi for FakeApi {
        async fn generate_content(
            &self,
            _model: &str,
            _request: GenerateContentRequest,
        ) -> AppResult<GenerateContentResponse> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            if self.generate_ok {
                Ok(GenerateContentResponse {
                    candidates: vec![Candidate {
                        content: Some(Content {
                            role: Some("model".to_string()),
                            parts: vec![Part::text("Question: 1+1=?\nAnswer: $2$")],
                        }),
                        finish_reason: Some(FinishReason::Stop),
                        safety_ratings: Vec::new(),
                    }],
                })
            } else {
                Err(AppError::Other("模拟的生成失败".to_string()))
            }
        }

        async fn upload_file(&self, _path: &Path, _display_name: &str) -> AppResult<RemoteFile> {
            self.upload_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.remote_file(self.initial_state))
        }

        async fn get_file(&self, _name: &str) -> AppResult<RemoteFile> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            let state = self
                .states
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(FileState::Processing);
            Ok(self.remote_file(state))
        }

        async fn delete_file(&self, _name: &str) -> AppResult<()> {
            self.delete_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_service(api: FakeApi) -> TranscribeService<FakeApi> {
        TranscribeService {
            api,
            model_name: "test-model".to_string(),
            poll_interval: Duration::from_millis(1),
            poll_max_attempts: 5,
        }
    }

    #[tokio::test]
    async fn test_two_processing_polls_then_generation() {
        // 状态序列 [PROCESSING, PROCESSING, ACTIVE]：恰好 2 次等待后才发起生成
        let service = test_service(FakeApi::new(
            FileState::Processing,
            vec![FileState::Processing, FileState::Active],
            true,
        ));

        let text = service
            .transcribe(&PathBuf::from("exam.pdf"))
            .await
            .unwrap();

        assert!(text.starts_with("Question:"));
        assert_eq!(service.api.get_calls.load(Ordering::SeqCst), 2);
        assert_eq!(service.api.generate_calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.api.delete_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_immediately_active_skips_polling() {
        let service = test_service(FakeApi::new(FileState::Active, vec![], true));

        let result = service.transcribe(&PathBuf::from("exam.pdf")).await;

        assert!(result.is_ok());
        assert_eq!(service.api.get_calls.load(Ordering::SeqCst), 0);
        assert_eq!(service.api.delete_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stuck_processing_hits_poll_timeout() {
        // 脚本为空，get_file 一直返回 PROCESSING
        let service = test_service(FakeApi::new(FileState::Processing, vec![], true));

        let err = service
            .transcribe(&PathBuf::from("exam.pdf"))
            .await
            .unwrap_err();

        match err {
            AppError::Gemini(GeminiError::PollTimeout { attempts, .. }) => {
                assert_eq!(attempts, 5)
            }
            other => panic!("意外的错误: {}", other),
        }
        assert_eq!(service.api.generate_calls.load(Ordering::SeqCst), 0);
        assert_eq!(service.api.delete_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_terminal_state_is_processing_failure() {
        let service = test_service(FakeApi::new(
            FileState::Processing,
            vec![FileState::Failed],
            true,
        ));

        let err = service
            .transcribe(&PathBuf::from("exam.pdf"))
            .await
            .unwrap_err();

        match err {
            AppError::Gemini(GeminiError::ProcessingFailed { state, .. }) => {
                assert_eq!(state, "FAILED")
            }
            other => panic!("意外的错误: {}", other),
        }
        assert_eq!(service.api.generate_calls.load(Ordering::SeqCst), 0);
        assert_eq!(service.api.delete_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cleanup_still_happens_when_generation_fails() {
        let service = test_service(FakeApi::new(FileState::Active, vec![], false));

        let result = service.transcribe(&PathBuf::from("exam.pdf")).await;

        assert!(result.is_err());
        assert_eq!(service.api.generate_calls.load(Ordering::SeqCst), 1);
        // 生成失败后仍然恰好清理一次
        assert_eq!(service.api.delete_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unspecified_terminal_state_also_fails() {
        // 既不是 PROCESSING 也不是 ACTIVE 的状态一律按失败处理
        let service = test_service(FakeApi::new(FileState::StateUnspecified, vec![], true));

        let err = service
            .transcribe(&PathBuf::from("exam.pdf"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Gemini(GeminiError::ProcessingFailed { .. })
        ));
        assert_eq!(service.api.delete_calls.load(Ordering::SeqCst), 1);
    }
}
