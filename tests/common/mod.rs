//! 集成测试共用的脚本化 LLM 替身和作文样本

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::Barrier;

use ielts_writing_eval::clients::{CompletionRequest, LlmClient};
use ielts_writing_eval::error::{AppResult, LlmError};
use ielts_writing_eval::models::EssayStructure;
use serde_json::{json, Value};

pub const MODEL_NAME: &str = "scripted-model";

/// 五段、293 词的 Task 2 作文
pub const ESSAY_TASK2: &str = r#"Many people believe that governments should spend more money on public transport than on new roads. I strongly agree with this view because better buses and trains benefit the whole of society. In this essay I will explain the environmental and social reasons for my opinion.

The first reason is that public transport reduces pollution in crowded cities. When thousands of commuters leave their cars at home, the amount of exhaust gas in the air falls sharply. Cities such as Copenhagen have shown that cleaner air leads to fewer breathing problems among children and elderly residents. For example, a single bus can carry as many passengers as forty private cars. Building more roads, in contrast, usually encourages people to drive even more.

The second reason is that affordable transport gives everyone the same chance to reach work and education. Young people without a driving licence depend on buses to attend college. Low-income families often cannot afford to run a car, so cheap and reliable trains allow them to accept jobs in other districts. As a result, more people can improve their skills and incomes. This makes the economy fairer and more productive.

Admittedly, some people argue that new roads are necessary for businesses that deliver goods. It is true that lorries need good motorways to move products between regions. However, if more commuters travel by train, the existing roads become less congested, which also helps delivery companies to save time and fuel.

In conclusion, I firmly believe that investment in public transport is a wiser choice than building additional roads. It protects the environment, supports social equality and even reduces traffic for essential road users. Governments should therefore make buses and trains faster, cheaper and more comfortable so that citizens choose them willingly."#;

/// 含项目符号、280 词的 Task 2 作文
pub const ESSAY_BULLETS: &str = r#"Many people believe that governments should spend more money on public transport than on new roads. I strongly agree with this view because better buses and trains benefit the whole of society. In this essay I will explain the environmental and social reasons for my opinion.

My two main reasons are as follows:
- Public transport reduces pollution because thousands of commuters leave their cars at home.
- Cleaner air leads to fewer breathing problems among children and elderly residents.
- Affordable buses give young people without a driving licence the chance to attend college.
- Cheap and reliable trains allow low-income families to accept jobs in other districts.

The second reason is that affordable transport gives everyone the same chance to reach work and education. Young people without a driving licence depend on buses to attend college. Low-income families often cannot afford to run a car, so cheap and reliable trains allow them to accept jobs in other districts. As a result, more people can improve their skills and incomes. This makes the economy fairer and more productive.

Admittedly, some people argue that new roads are necessary for businesses that deliver goods. It is true that lorries need good motorways to move products between regions. However, if more commuters travel by train, the existing roads become less congested, which also helps delivery companies to save time and fuel.

In conclusion, I firmly believe that investment in public transport is a wiser choice than building additional roads. It protects the environment, supports social equality and even reduces traffic for essential road users. Governments should therefore make buses and trains faster, cheaper and more comfortable so that citizens choose them willingly."#;

/// 单句 10 词
pub const ESSAY_TEN_WORDS: &str = "Cities should invest much more money in public transport today.";

/// 一次被记录的调用
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub label: String,
    pub system: String,
    pub user: String,
}

enum Reply {
    Text(String),
    Timeout,
    /// 永远不返回
    Stall,
}

/// 按调用标签返回预设响应的 LLM 替身
pub struct ScriptedLlm {
    replies: HashMap<String, Reply>,
    calls: Mutex<Vec<RecordedCall>>,
    /// 证据调用在这里汇合，串行执行会一直等下去
    evidence_barrier: Option<Barrier>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            evidence_barrier: None,
        }
    }

    pub fn reply(mut self, label: &str, body: impl Into<String>) -> Self {
        self.replies.insert(label.to_string(), Reply::Text(body.into()));
        self
    }

    pub fn reply_json(self, label: &str, value: Value) -> Self {
        self.reply(label, value.to_string())
    }

    /// 该标签的调用返回超时
    pub fn timeout(mut self, label: &str) -> Self {
        self.replies.insert(label.to_string(), Reply::Timeout);
        self
    }

    /// 该标签的调用永远挂起
    pub fn stall(mut self, label: &str) -> Self {
        self.replies.insert(label.to_string(), Reply::Stall);
        self
    }

    /// 所有 `*_evidence` 调用要等 `parties` 个同时到达才返回
    pub fn gate_evidence(mut self, parties: usize) -> Self {
        self.evidence_barrier = Some(Barrier::new(parties));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.label).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels().iter().position(|l| l == label)
    }
}

impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: CompletionRequest) -> AppResult<String> {
        self.calls.lock().unwrap().push(RecordedCall {
            label: request.label.clone(),
            system: request.system_prompt().unwrap_or_default().to_string(),
            user: request.user_prompt(),
        });

        if let Some(barrier) = &self.evidence_barrier {
            if request.label.ends_with("_evidence") {
                barrier.wait().await;
            }
        }

        match self.replies.get(&request.label) {
            Some(Reply::Text(body)) => Ok(body.clone()),
            Some(Reply::Stall) => std::future::pending().await,
            Some(Reply::Timeout) => Err(LlmError::Timeout {
                model: MODEL_NAME.to_string(),
                label: request.label,
                seconds: 90,
            }
            .into()),
            None => Err(LlmError::EmptyContent {
                model: MODEL_NAME.to_string(),
                label: request.label,
            }
            .into()),
        }
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }
}

// ========== 响应样本 ==========

pub fn first_sid(essay: &EssayStructure) -> String {
    essay.paragraphs[0].sentences[0].sid.clone()
}

pub fn last_sid(essay: &EssayStructure) -> String {
    essay
        .sentences()
        .last()
        .map(|s| s.sid.clone())
        .unwrap_or_default()
}

pub fn task_spec(task_type: &str) -> Value {
    json!({
        "task_type": task_type,
        "required_parts": [],
        "checklist": [],
        "topic_keywords": ["public transport", "roads"],
        "confidence": 0.9,
        "alternatives": [],
        "evidence_signals": ["I strongly agree"]
    })
}

/// Task 2 证据（agree_disagree 只有一个检查项 C1）
pub fn task2_evidence(essay: &EssayStructure, with_position: bool) -> Value {
    let first = first_sid(essay);
    let position = if with_position { vec![first.clone()] } else { vec![] };
    json!({
        "position_sentence_ids": position,
        "conclusion_sentence_ids": [last_sid(essay)],
        "body_paragraphs": [],
        "coverage_map": {
            "C1": {"checklist_desc": "state and support an opinion", "covered_by_sentence_ids": [first]}
        },
        "irrelevant_sentence_ids": [],
        "weak_or_risky_sentence_ids": [],
        "under_developed_sentence_ids": []
    })
}

/// Task 1 证据（line_graph 有四个检查项）
pub fn task1_evidence(essay: &EssayStructure, with_overview: bool) -> Value {
    let first = first_sid(essay);
    let overview = if with_overview { vec![first.clone()] } else { vec![] };
    let coverage: serde_json::Map<String, Value> = (1..=4)
        .map(|n| {
            (
                format!("C{}", n),
                json!({"checklist_desc": "", "covered_by_sentence_ids": [first.clone()]}),
            )
        })
        .collect();
    json!({
        "intro_sentence_ids": [first],
        "overview_sentence_ids": overview,
        "body_paragraphs": [],
        "coverage_map": coverage,
        "missing_or_weak_areas": [],
        "speculative_or_irrelevant_sentence_ids": [],
        "inaccurate_or_unsupported_claims": []
    })
}

pub fn coherence_evidence(essay: &EssayStructure) -> Value {
    let last = essay.paragraphs.len();
    let functions: Vec<Value> = essay
        .paragraphs
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let function = match i {
                0 => "thesis",
                i if i + 1 == last => "conclusion",
                _ => "reason",
            };
            json!({
                "pid": p.pid,
                "function": function,
                "main_point_sid": p.sentences[0].sid,
                "link_from_prev": null,
                "transition_sids": []
            })
        })
        .collect();
    json!({
        "paragraph_functions": functions,
        "cohesive_devices": [],
        "reference_chains": [],
        "issues": [],
        "overall_flow": "clear"
    })
}

pub fn lexical_evidence() -> Value {
    json!({
        "repetition": [],
        "vocabulary_highlights": [],
        "lexical_errors": [],
        "summaries": {
            "range_level": "wide",
            "precision_level": "high",
            "collocation_control": "strong",
            "error_density": "low",
            "error_impact_overall": "minimal"
        }
    })
}

pub fn grammar_evidence(essay: &EssayStructure) -> Value {
    let analysis: Vec<Value> = essay
        .sentences()
        .map(|s| {
            json!({
                "sid": s.sid,
                "sentence_type": "complex",
                "complex_features": ["subordinate_clause"],
                "is_error_free": true
            })
        })
        .collect();
    json!({
        "sentence_analysis": analysis,
        "grammar_errors": [],
        "punctuation_issues": [],
        "summaries": {
            "structure_range": "wide",
            "complex_sentence_share": "high",
            "error_density": "low",
            "error_impact_overall": "minimal",
            "punctuation_control": "strong"
        }
    })
}

/// 打分响应；锚点取不超过 band 的整数
pub fn score(band: f64) -> Value {
    let anchor = (band.floor() as u8).max(1);
    json!({
        "band": band,
        "band_anchor": anchor.to_string(),
        "feedback": {
            "summary": "The response is relevant and well organised overall.",
            "strengths": ["Clear position throughout.", "Ideas are logically sequenced."],
            "weaknesses": ["Some supporting points need fuller development."],
            "next_step": "Add one specific example to every body paragraph."
        }
    })
}

pub fn synthesis(essay: &EssayStructure) -> Value {
    let sid = first_sid(essay);
    let suggestion = |category: &str, original: &str| {
        json!({
            "original_text": original,
            "suggested_text": "A more precise alternative",
            "category": category,
            "explanation": "Improves precision for the examiner.",
            "evidence_sids": [sid]
        })
    };
    json!({
        "overall_feedback": {
            "overall_evaluation": "A clear, well-argued essay that would benefit from richer examples.",
            "what_you_did_well": ["Consistent position", "Logical paragraphing"],
            "what_hurt_your_score": ["Underdeveloped support"],
            "band7_to_band8_focus": ["Extend every main idea with evidence"]
        },
        "suggestions": [
            suggestion("task", "Limited development of the second reason"),
            suggestion("coherence_and_cohesion", "Mechanical linking"),
            suggestion("lexical_resource", "Many people"),
            suggestion("grammar", "Run-on sentence in the conclusion")
        ]
    })
}

pub fn model_essay() -> Value {
    json!({
        "target_score": 8.0,
        "content": "Governments ought to prioritise public transport over new roads.",
        "analysis": "Sharper topic sentences and more precise vocabulary."
    })
}

/// 四个评分项都能顺利完成的 Task 2 脚本
pub fn healthy_task2(essay: &EssayStructure, bands: [f64; 4]) -> ScriptedLlm {
    ScriptedLlm::new()
        .reply_json("task_spec", task_spec("agree_disagree"))
        .reply_json("task_response_evidence", task2_evidence(essay, true))
        .reply_json("task_response_score", score(bands[0]))
        .reply_json("coherence_cohesion_evidence", coherence_evidence(essay))
        .reply_json("coherence_cohesion_score", score(bands[1]))
        .reply_json("lexical_resource_evidence", lexical_evidence())
        .reply_json("lexical_resource_score", score(bands[2]))
        .reply_json("grammar_evidence", grammar_evidence(essay))
        .reply_json("grammar_score", score(bands[3]))
        .reply_json("overall_feedback", synthesis(essay))
        .reply_json("model_essay", model_essay())
}
