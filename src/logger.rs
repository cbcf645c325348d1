//! 日志初始化
//!
//! 通过 `RUST_LOG` 环境变量控制日志级别，默认 `info`。

use tracing_subscriber::EnvFilter;

/// 初始化 tracing 日志
///
/// 在二进制入口处调用一次；重复调用时静默忽略（方便测试）。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
