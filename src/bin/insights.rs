//! 洞察聚合命令行入口
//!
//! 用法：`insights <assignment-id>`
//!
//! 拉取指定作业的全部批改结果，调用生成模型总结班级级别的
//! 共性误区，并尽力把报告写回数据存储，最后打印流程结果 JSON。

use std::process;

use tracing::{error, info};

use grading_insights::utils::logging::{log_finished, log_startup};
use grading_insights::{logger, Config, GeminiClient, InsightService, StoreClient};

#[tokio::main]
async fn main() {
    logger::init();

    let assignment_id = match std::env::args().nth(1) {
        Some(id) => id,
        None => {
            eprintln!("用法: insights <assignment-id>");
            process::exit(1);
        }
    };

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("错误: {}", e);
            process::exit(1);
        }
    };

    // 洞察流程必须有数据存储凭证
    let store = match StoreClient::new(&config) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("错误: {}", e);
            process::exit(1);
        }
    };

    log_startup("洞察聚合");
    info!("目标作业: {}", assignment_id);

    let service = InsightService::new(GeminiClient::new(&config), store, &config);

    let outcome = match service.run(&assignment_id).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("❌ 洞察聚合失败: {}", e);
            process::exit(1);
        }
    };

    println!("{}", outcome.to_json());

    log_finished("洞察聚合");
}
