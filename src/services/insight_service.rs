//! 洞察聚合服务 - 业务能力层
//!
//! 负责"拉取批改结果 → 生成洞察报告 → 尽力写回"的完整序列。
//!
//! ## 失败语义
//! - 拉取失败：向上传播，不触碰生成接口
//! - 生成失败：收敛为 `GenerationOutcome` 的结构化变体，绝不向上抛
//! - 写回失败：记录警告后继续，不影响整体结果

use serde_json::Value;
use tracing::{info, warn};

use crate::clients::{GenerativeApi, ResultsStore};
use crate::config::Config;
use crate::error::AppResult;
use crate::models::gemini::{FinishReason, GenerateContentRequest, GenerationConfig};
use crate::models::insight::{GenerationOutcome, InsightOutcome};
use crate::prompts;
use crate::utils::logging::truncate_text;

/// 洞察聚合时的采样温度
const INSIGHT_TEMPERATURE: f32 = 0.1;
/// 洞察报告的输出长度上限
const INSIGHT_MAX_OUTPUT_TOKENS: u32 = 2_000_000;

/// 洞察聚合服务
pub struct InsightService<G, S> {
    gemini: G,
    store: S,
    model_name: String,
}

impl<G: GenerativeApi, S: ResultsStore> InsightService<G, S> {
    /// 创建新的洞察聚合服务
    pub fn new(gemini: G, store: S, config: &Config) -> Self {
        Self {
            gemini,
            store,
            model_name: config.insight_model_name.clone(),
        }
    }

    /// 执行一次完整的洞察聚合流程
    ///
    /// # 参数
    /// - `assignment_id`: 作业标识（不透明字符串 / UUID）
    ///
    /// # 返回
    /// 带标签的流程结果；只有拉取批改结果失败时才返回 `Err`。
    pub async fn run(&self, assignment_id: &str) -> AppResult<InsightOutcome> {
        let rows = self.store.fetch_results(assignment_id).await?;
        info!("📥 拉取到 {} 条批改记录", rows.len());

        if rows.is_empty() {
            info!("该作业没有已批改的提交记录，流程结束");
            return Ok(InsightOutcome::NoResults);
        }

        // 只关心 result_json 字段是否有实际内容，内容原样透传
        let grading_data: Vec<&Value> = rows
            .iter()
            .filter_map(|row| row.get("result_json"))
            .filter(|value| has_payload(value))
            .collect();

        if grading_data.is_empty() {
            info!("记录中没有可分析的批改数据，流程结束");
            return Ok(InsightOutcome::NoGradingData);
        }

        let formatted_results = serde_json::to_string_pretty(&grading_data)?;

        info!("🔍 正在生成洞察报告...");
        let report = self.generate_report(&formatted_results).await;
        info!(
            "洞察报告生成完毕: {}",
            truncate_text(&report.to_json().to_string(), 200)
        );

        // 尽力写回，失败不影响整体结果
        if let Err(e) = self
            .store
            .store_insights(assignment_id, &report.to_json())
            .await
        {
            warn!("⚠️ 写回洞察报告失败: {}", e);
        }

        Ok(InsightOutcome::Completed {
            assignment_id: assignment_id.to_string(),
            report,
        })
    }

    /// 调用生成模型产出洞察报告
    ///
    /// 所有失败形态都收敛为 `GenerationOutcome`，本函数不返回 `Err`。
    pub async fn generate_report(&self, formatted_results: &str) -> GenerationOutcome {
        let request =
            GenerateContentRequest::from_text(&prompts::build_insight_prompt(formatted_results))
                .with_generation_config(GenerationConfig {
                    temperature: Some(INSIGHT_TEMPERATURE),
                    max_output_tokens: Some(INSIGHT_MAX_OUTPUT_TOKENS),
                })
                .with_safety_settings(prompts::default_safety_settings());

        let response = match self.gemini.generate_content(&self.model_name, request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("生成调用失败: {}", e);
                return GenerationOutcome::Failed {
                    detail: e.to_string(),
                };
            }
        };

        // 整体被安全过滤拦截时不会返回任何候选
        let Some(candidate) = response.candidates.first() else {
            return GenerationOutcome::Blocked {
                finish_reason: FinishReason::Safety,
                safety_ratings: Vec::new(),
                detail: Some("未返回任何候选".to_string()),
            };
        };

        // 只有 STOP 视为正常完成
        let finish_reason = candidate
            .finish_reason
            .unwrap_or(FinishReason::FinishReasonUnspecified);
        if finish_reason != FinishReason::Stop {
            return GenerationOutcome::Blocked {
                finish_reason,
                safety_ratings: candidate.safety_ratings.clone(),
                detail: None,
            };
        }

        match response.first_text() {
            Some(text) => GenerationOutcome::Text(text.trim().to_string()),
            None => GenerationOutcome::Failed {
                detail: "正常完成但候选中没有文本内容".to_string(),
            },
        }
    }
}

/// 判断一条 result_json 是否携带可分析的批改数据
///
/// null、空对象、空数组、空字符串、0、false 都视为没有数据。
fn has_payload(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map_or(true, |n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
