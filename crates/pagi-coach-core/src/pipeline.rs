//! Modern assistant pipeline: classify, run tools, retrieve, compose, generate.
//!
//! Tool and generation failures degrade inside their own stages. Telemetry is
//! recorded by the rollout router, which sees the final path.

use crate::composer::compose;
use crate::contract::{AssistantRequest, CandidateResponse, ContractViolation, EMPTY_INPUT_PROMPT, SAFETY_MESSAGE};
use crate::generation::GenerationInvoker;
use crate::intent::{self, ActivityKind, ActivityVerb, Intent};
use crate::knowledge::{KnowledgeBase, DEFAULT_TOP_K};
use crate::rollout::ModernAssistant;
use crate::store::date_key;
use crate::tools::{ToolCall, ToolName, ToolOutcome, ToolRegistry};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("modern response rejected: {0}")]
    Contract(#[from] ContractViolation),

    #[error("modern pipeline exceeded its {0:?} deadline")]
    DeadlineExceeded(Duration),

    #[error("modern pipeline panicked: {0}")]
    Panicked(String),

    #[error("modern pipeline failed: {0}")]
    Internal(String),
}

pub struct ModernPipeline {
    knowledge: KnowledgeBase,
    tools: ToolRegistry,
    generation: GenerationInvoker,
    top_k: usize,
    today: Option<NaiveDate>,
}

impl ModernPipeline {
    pub fn new(knowledge: KnowledgeBase, tools: ToolRegistry, generation: GenerationInvoker) -> Self {
        Self {
            knowledge,
            tools,
            generation,
            top_k: DEFAULT_TOP_K,
            today: None,
        }
    }

    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// Pin the date used for challenge tools (local date otherwise).
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Tool calls for one classified utterance, as `(name, args)` pairs still to be validated.
    fn plan_tools(&self, intent: Intent, text: &str) -> Vec<(ToolName, Value)> {
        let today = date_key(self.today());
        match intent {
            Intent::Navigate => {
                let args = intent::extract_destination(text)
                    .map(|d| json!({ "destination": d.label() }))
                    .unwrap_or_else(|| json!({}));
                vec![(ToolName::Navigate, args)]
            }
            Intent::Do => {
                if let Some(item) = intent::extract_list_item(text) {
                    return vec![(
                        ToolName::AddToShoppingList,
                        json!({ "item": item.item, "quantity": item.quantity, "unit": item.unit }),
                    )];
                }
                match intent::extract_activity(text) {
                    Some((ActivityVerb::Complete, ActivityKind::Challenge)) => {
                        vec![(ToolName::CompleteChallenge, json!({ "date": today }))]
                    }
                    Some((ActivityVerb::Start, kind)) => {
                        vec![(ToolName::StartActivity, json!({ "activity": kind.slug() }))]
                    }
                    _ => Vec::new(),
                }
            }
            Intent::QnaHealth => {
                let lower = text.to_lowercase();
                let mut calls = Vec::new();
                if lower.contains("protein") {
                    calls.push((ToolName::ProteinTarget, json!({})));
                }
                if lower.contains("today") && (lower.contains("plan") || lower.contains("meal") || lower.contains("eat")) {
                    calls.push((ToolName::TodaysPlan, json!({})));
                }
                if lower.contains("challenge") {
                    calls.push((ToolName::DailyChallenge, json!({ "date": today })));
                }
                calls
            }
            Intent::SmallTalk | Intent::Blocked => Vec::new(),
        }
    }

    async fn run_tools(&self, user_id: &str, intent: Intent, text: &str) -> Vec<ToolOutcome> {
        let mut outcomes = Vec::new();
        for (name, args) in self.plan_tools(intent, text) {
            match intent {
                // Lookups are optional context; a call that fails validation is skipped.
                Intent::QnaHealth => {
                    if let Ok(call) = ToolCall::validate(name.as_str(), &args) {
                        outcomes.push(self.tools.execute(user_id, &call).await);
                    }
                }
                _ => outcomes.push(self.tools.invoke(user_id, name, &args).await),
            }
        }
        outcomes
    }

    pub async fn run(&self, request: &AssistantRequest) -> Result<CandidateResponse, PipelineError> {
        let text = request.message.trim();
        if text.is_empty() {
            return Ok(CandidateResponse {
                text: EMPTY_INPUT_PROMPT.to_string(),
                ..Default::default()
            });
        }

        let intent = intent::classify(text);
        if intent == Intent::Blocked {
            info!(target: "pagi::coach", user_id = %request.user_id, "safety override");
            return Ok(CandidateResponse {
                text: SAFETY_MESSAGE.to_string(),
                intent: Some(Intent::Blocked),
                ..Default::default()
            });
        }

        let outcomes = self.run_tools(&request.user_id, intent, text).await;
        let docs = self.knowledge.retrieve(text, self.top_k);
        debug!(
            target: "pagi::coach",
            user_id = %request.user_id,
            intent = %intent,
            tools = outcomes.len(),
            docs = docs.len(),
            "composing generation context"
        );
        let context = compose(text, &docs, &outcomes, request.mode(), &request.context);
        let reply = self.generation.invoke(&context).await;

        let navigate_to = outcomes
            .iter()
            .filter(|o| o.result.ok)
            .find_map(|o| o.result.navigate_to.clone());
        Ok(CandidateResponse {
            text: reply,
            captions: None,
            navigate_to,
            intent: Some(intent),
            tools_used: outcomes.iter().map(|o| o.tool).collect(),
        })
    }
}

#[async_trait]
impl ModernAssistant for ModernPipeline {
    async fn respond(&self, request: &AssistantRequest) -> Result<CandidateResponse, PipelineError> {
        self.run(request).await
    }
}
