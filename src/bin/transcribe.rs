//! PDF 转写命令行入口
//!
//! 用法：`transcribe <file.pdf>`
//!
//! 成功时在当前目录写出 `<uuid>_<原文件名>_output.txt`；
//! 参数缺失、文件不存在或缺少 API 密钥时打印诊断信息并以非零码退出。

use std::path::{Path, PathBuf};
use std::process;

use tracing::{error, info};
use uuid::Uuid;

use grading_insights::utils::logging::{log_finished, log_startup};
use grading_insights::{logger, Config, GeminiClient, TranscribeService};

#[tokio::main]
async fn main() {
    logger::init();

    let pdf_path = match parse_args() {
        Some(path) => path,
        None => {
            eprintln!("用法: transcribe <file.pdf>");
            process::exit(1);
        }
    };

    if !pdf_path.exists() {
        eprintln!("错误: 文件不存在: {}", pdf_path.display());
        process::exit(1);
    }

    // 缺少凭证属于致命配置错误，立即退出
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("错误: {}", e);
            eprintln!("请在 Google AI Studio 获取 API 密钥并设置:");
            eprintln!("export GEMINI_API_KEY='your-api-key-here'");
            process::exit(1);
        }
    };

    log_startup("PDF 转写");
    info!("开始转写: {}", pdf_path.display());

    let service = TranscribeService::new(GeminiClient::new(&config), &config);

    let text = match service.transcribe(&pdf_path).await {
        Ok(text) => text,
        Err(e) => {
            error!("❌ 转写失败: {}", e);
            process::exit(1);
        }
    };

    println!("\n{}", "=".repeat(30));
    println!("=== 转写结果开始 ===");
    println!("{}\n", "=".repeat(30));
    println!("{}", text);
    println!("\n{}", "=".repeat(30));
    println!("=== 转写结果结束 ===");
    println!("{}", "=".repeat(30));

    match write_output_file(&pdf_path, &text) {
        Ok(output_path) => info!("💾 转写结果已保存至: {}", output_path.display()),
        Err(e) => {
            error!("❌ 保存转写结果失败: {}", e);
            process::exit(1);
        }
    }

    log_finished("PDF 转写");
}

fn parse_args() -> Option<PathBuf> {
    std::env::args().nth(1).map(PathBuf::from)
}

/// 写出转写结果文件，命名格式：`<uuid>_<原文件名去扩展名>_output.txt`
fn write_output_file(pdf_path: &Path, text: &str) -> std::io::Result<PathBuf> {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    let output_path = PathBuf::from(format!("{}_{}_output.txt", Uuid::new_v4(), stem));
    std::fs::write(&output_path, text)?;
    Ok(output_path)
}
