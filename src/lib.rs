//! # Grading Insights
//!
//! 围绕两个外部服务的轻量编排工具：
//!
//! 1. **洞察聚合（insights）**：从数据存储拉取批改结果 → 拼接成提示词 →
//!    调用生成模型做一次班级级别的总结 → 尽力写回数据存储
//! 2. **文档转写（transcribe）**：上传 PDF 到生成模型的文件服务 →
//!    轮询处理状态直到终态 → 带文件引用调用生成 → 删除远端文件
//!
//! ## 架构设计
//!
//! 本系统采用三层结构：
//!
//! ### ① 客户端层（Clients）
//! - `clients/` - 封装外部服务的 REST 调用，不含业务逻辑
//! - `GeminiClient` - 生成模型 API（生成 / 文件上传 / 状态查询 / 删除）
//! - `StoreClient` - 数据存储 REST API（拉取结果 / 写回洞察）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，持有客户端
//! - `InsightService` - 聚合批改结果并生成洞察报告
//! - `TranscribeService` - 上传、轮询、转写、清理的完整序列
//!
//! ### ③ 入口层（Binaries）
//! - `src/bin/insights.rs` - 洞察聚合命令行入口
//! - `src/bin/transcribe.rs` - PDF 转写命令行入口
//!
//! 所有外部调用均显式持有配置对象（`Config`），进程启动时构造一次，
//! 不使用模块级全局状态。

pub mod clients;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod prompts;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use clients::{GeminiClient, GenerativeApi, ResultsStore, StoreClient};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::gemini::{FileState, FinishReason, RemoteFile};
pub use models::insight::{GenerationOutcome, InsightOutcome};
pub use services::{InsightService, TranscribeService};
