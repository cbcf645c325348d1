//! 提示词与内容过滤设置
//!
//! 所有提示词文本集中在这里维护，业务代码只引用。

use crate::models::gemini::SafetySetting;

/// 转写流程的系统指令
pub const TRANSCRIBE_SYSTEM_PROMPT: &str = "\
你是一名擅长手写文档的专业转写员。\
请转写所附 PDF 中的手写问答内容，输出干净的纯文本。\
严格遵守以下规则：\
1. 保留问答（Q&A）格式。\
2. 每个问题另起一行，以 'Question:' 前缀开头。\
3. 每个答案另起一行，以 'Answer:' 前缀开头。\
4. 手写数学公式一律转写为清晰可读的 LaTeX（如 $E = mc^2$、$\\frac{a}{b}$）。";

/// 转写流程的用户消息（系统指令已随模型配置传入）
pub const TRANSCRIBE_USER_PROMPT: &str = "请按照全部指令转写这份文档。";

/// 构建洞察聚合的提示词
///
/// # 参数
/// - `formatted_results`: 已拼接好的批改结果 JSON 文本
pub fn build_insight_prompt(formatted_results: &str) -> String {
    format!(
        r#"你是一名资深的学术批改与教学法分析专家，面向机器学习、高级 NLP、博弈论等研究生课程。请保持专业、精确、客观的语气。

批改结果如下：
{}

任务：
1. 评估每份提交中各题的正确性，接受表述差异，关注数学、过程与概念上的准确性。
2. 统计各题的错误率，找出错误率最高的题目与主题。
3. 归纳背后的概念性缺口与常见推理错误。

最终输出必须且只能是一个合法的 JSON 对象，结构如下：
{{
  "overview": {{
    "overall_accuracy_rate": <number>,
    "total_submissions": <number>,
    "average_score": <number>
  }},
  "most_missed_questions": [
    {{
      "question_number": "1.a",
      "incorrect_rate": <number>,
      "related_topic": <string>,
      "summary_of_difficulty": <string>
    }}
  ],
  "misunderstood_topics": [
    {{
      "topic": <string>,
      "reason_for_difficulty": <string>
    }}
  ],
  "recommended_review_topics": [
    {{
      "topic": <string>,
      "instructional_impact_reason": <string>
    }}
  ]
}}

附加要求：
- 输出必须是合法 JSON，JSON 之外不得有任何评论。
- 不得包含学生姓名、学号等任何个人标识。
- 数据缺失时填 null，不要省略字段。
- 默认学生诚信作答，聚焦可落地的教学改进建议。"#,
        formatted_results
    )
}

/// 默认的内容过滤设置
///
/// 批改结果里可能出现被误判的措辞，四类标准类别全部放宽到不拦截。
pub fn default_safety_settings() -> Vec<SafetySetting> {
    [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ]
    .iter()
    .map(|category| SafetySetting {
        category: category.to_string(),
        threshold: "BLOCK_NONE".to_string(),
    })
    .collect()
}
