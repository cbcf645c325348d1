//! 洞察流程的结果类型
//!
//! 用带标签的枚举取代"带 error 键的字典 / 裸字符串"两种返回形态，
//! 调用方只能通过模式匹配消费结果。

use serde_json::{json, Value};

use crate::models::gemini::{FinishReason, SafetyRating};

/// 一次生成调用的结果
///
/// 洞察流程中的生成失败不作为错误向上传播，而是收敛成结构化变体。
#[derive(Clone, Debug)]
pub enum GenerationOutcome {
    /// 正常完成，携带生成文本
    Text(String),
    /// 未正常完成（安全拦截 / 长度截断 / 引用拦截等）
    Blocked {
        finish_reason: FinishReason,
        safety_ratings: Vec<SafetyRating>,
        detail: Option<String>,
    },
    /// 调用本身失败（网络 / 接口错误）
    Failed { detail: String },
}

impl GenerationOutcome {
    /// 序列化为可持久化的 JSON 值
    ///
    /// 正常完成时为文本字符串，其余为带 `error` 键的对象。
    pub fn to_json(&self) -> Value {
        match self {
            GenerationOutcome::Text(text) => json!(text),
            GenerationOutcome::Blocked {
                finish_reason,
                safety_ratings,
                detail,
            } => {
                let mut value = json!({
                    "error": "Response not completed normally",
                    "finish_reason": finish_reason.as_str(),
                    "safety_ratings": safety_ratings,
                });
                if let Some(detail) = detail {
                    value["detail"] = json!(detail);
                }
                value
            }
            GenerationOutcome::Failed { detail } => json!({
                "error": "Exception during generation",
                "detail": detail,
            }),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, GenerationOutcome::Text(_))
    }
}

/// 洞察聚合流程的整体结果
#[derive(Clone, Debug)]
pub enum InsightOutcome {
    /// 该作业没有任何批改记录
    NoResults,
    /// 有记录但都不含批改数据
    NoGradingData,
    /// 流程走完（报告本身可能是失败变体）
    Completed {
        assignment_id: String,
        report: GenerationOutcome,
    },
}

impl InsightOutcome {
    /// 序列化为命令行输出的 JSON
    pub fn to_json(&self) -> Value {
        match self {
            InsightOutcome::NoResults => json!({
                "status": "no_results",
                "message": "该作业没有已批改的提交记录",
            }),
            InsightOutcome::NoGradingData => json!({
                "status": "no_grading_data",
                "message": "没有可分析的批改数据",
            }),
            InsightOutcome::Completed {
                assignment_id,
                report,
            } => json!({
                "status": "success",
                "assignment_id": assignment_id,
                "insights_report": report.to_json(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_outcome_serializes_to_string() {
        let outcome = GenerationOutcome::Text("报告内容".to_string());
        assert_eq!(outcome.to_json(), json!("报告内容"));
        assert!(outcome.is_text());
    }

    #[test]
    fn test_blocked_outcome_carries_reason_name() {
        let outcome = GenerationOutcome::Blocked {
            finish_reason: FinishReason::Safety,
            safety_ratings: vec![SafetyRating {
                category: "HARM_CATEGORY_HARASSMENT".to_string(),
                probability: "HIGH".to_string(),
            }],
            detail: None,
        };
        let value = outcome.to_json();
        assert_eq!(value["finish_reason"], "SAFETY");
        assert_eq!(
            value["safety_ratings"][0]["category"],
            "HARM_CATEGORY_HARASSMENT"
        );
        assert!(value.get("error").is_some());
    }

    #[test]
    fn test_no_results_status_shape() {
        let value = InsightOutcome::NoResults.to_json();
        assert_eq!(value["status"], "no_results");
    }

    #[test]
    fn test_no_grading_data_status_shape() {
        let value = InsightOutcome::NoGradingData.to_json();
        assert_eq!(value["status"], "no_grading_data");
    }

    #[test]
    fn test_completed_status_shape() {
        let outcome = InsightOutcome::Completed {
            assignment_id: "0a54f3a4".to_string(),
            report: GenerationOutcome::Text("ok".to_string()),
        };
        let value = outcome.to_json();
        assert_eq!(value["status"], "success");
        assert_eq!(value["insights_report"], "ok");
    }
}
