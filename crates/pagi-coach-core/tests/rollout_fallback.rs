//! Router-level guarantees: fallback output equals legacy output, fixed
//! responses never touch the network, accepted responses are well formed.

use async_trait::async_trait;
use pagi_coach_core::contract::{EMPTY_INPUT_PROMPT, SAFETY_MESSAGE};
use pagi_coach_core::generation::{GenerationError, GenerationParams};
use pagi_coach_core::telemetry::ResponsePath;
use pagi_coach_core::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct CountingModel {
    calls: AtomicUsize,
}

#[async_trait]
impl LanguageModel for CountingModel {
    async fn complete(&self, _system: &str, _user: &str, _params: GenerationParams) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("Great question! Aim for protein at every meal.".to_string())
    }
}

enum Failure {
    Error,
    Panic,
    Hang,
    BlankText,
    BlankRoute,
}

struct BrokenModern(Failure);

#[async_trait]
impl ModernAssistant for BrokenModern {
    async fn respond(&self, _request: &AssistantRequest) -> Result<CandidateResponse, PipelineError> {
        match self.0 {
            Failure::Error => Err(PipelineError::Internal("retriever exploded".into())),
            Failure::Panic => panic!("modern pipeline bug"),
            Failure::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(PipelineError::Internal("unreachable".into()))
            }
            Failure::BlankText => Ok(CandidateResponse {
                text: "  ".into(),
                intent: Some(Intent::QnaHealth),
                ..Default::default()
            }),
            Failure::BlankRoute => Ok(CandidateResponse {
                text: "Opening it now.".into(),
                navigate_to: Some(String::new()),
                intent: Some(Intent::Navigate),
                tools_used: vec![ToolName::Navigate],
                ..Default::default()
            }),
        }
    }
}

fn modern_pipeline(model: Arc<CountingModel>) -> (ModernPipeline, Arc<SledCoachStore>) {
    let store = Arc::new(SledCoachStore::temporary().expect("store"));
    let tools = ToolRegistry::new(store.clone(), store.clone(), Arc::new(StaticUserContext::empty()));
    let pipeline = ModernPipeline::new(
        KnowledgeBase::builtin(),
        tools,
        GenerationInvoker::new(model, Duration::from_secs(5)),
    );
    (pipeline, store)
}

fn enabled() -> RolloutConfig {
    RolloutConfig::new(true, Vec::new())
}

const MESSAGES: &[&str] = &[
    "go to shopping list",
    "add 2 lbs chicken to my shopping list",
    "how much protein should I eat?",
    "hello",
    "",
    "I have chest pain",
    "start my workout",
];

#[tokio::test]
async fn modern_failure_matches_legacy_output() {
    let legacy = Arc::new(LegacyPipeline::default());
    let legacy_only = RolloutRouter::new(
        RolloutConfig::default(),
        Arc::new(BrokenModern(Failure::Error)),
        legacy.clone(),
        Arc::new(NoopTelemetry),
    );

    for failure in [Failure::Error, Failure::Panic, Failure::Hang, Failure::BlankText, Failure::BlankRoute] {
        let router = RolloutRouter::new(enabled(), Arc::new(BrokenModern(failure)), legacy.clone(), Arc::new(NoopTelemetry))
            .with_modern_deadline(Duration::from_millis(200));
        for message in MESSAGES {
            let request = AssistantRequest::new("u1", *message);
            let routed = router.route(&request).await;
            assert_eq!(routed.state, RolloutState::FallbackToLegacy);
            assert_eq!(
                routed.trace,
                vec![RolloutState::ModernAttempt, RolloutState::FallbackToLegacy]
            );
            assert!(routed.error.is_some());
            assert_eq!(routed.response, legacy_only.handle(&request).await, "{message}");
        }
    }
}

#[tokio::test]
async fn flag_off_or_not_allowlisted_stays_legacy() {
    let model = Arc::new(CountingModel::default());
    let (modern, store) = modern_pipeline(model.clone());
    let router = RolloutRouter::new(
        RolloutConfig::new(true, vec!["beta-user".to_string()]),
        Arc::new(modern),
        Arc::new(LegacyPipeline::default()),
        Arc::new(NoopTelemetry),
    );

    let routed = router
        .route(&AssistantRequest::new("someone-else", "add 2 lbs chicken to my shopping list"))
        .await;
    assert_eq!(routed.state, RolloutState::LegacyOnly);
    assert_eq!(routed.trace, vec![RolloutState::LegacyOnly]);
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    assert!(store.items("someone-else").await.expect("items").is_empty());

    let routed = router.route(&AssistantRequest::new("beta-user", "hello")).await;
    assert_eq!(routed.state, RolloutState::ModernAccepted);
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn config_updates_apply_to_next_request() {
    let model = Arc::new(CountingModel::default());
    let (modern, _) = modern_pipeline(model.clone());
    let router = RolloutRouter::new(
        RolloutConfig::default(),
        Arc::new(modern),
        Arc::new(LegacyPipeline::default()),
        Arc::new(NoopTelemetry),
    );
    let request = AssistantRequest::new("u1", "what should I snack on?");

    assert_eq!(router.route(&request).await.state, RolloutState::LegacyOnly);
    router.set_config(enabled());
    assert_eq!(router.route(&request).await.state, RolloutState::ModernAccepted);
    router.set_config(RolloutConfig::new(true, vec!["u2".to_string()]));
    assert_eq!(router.route(&request).await.state, RolloutState::LegacyOnly);
}

#[tokio::test]
async fn safety_and_empty_input_make_no_model_calls() {
    let model = Arc::new(CountingModel::default());
    let (modern, store) = modern_pipeline(model.clone());
    let router = RolloutRouter::new(
        enabled(),
        Arc::new(modern),
        Arc::new(LegacyPipeline::default()),
        Arc::new(NoopTelemetry),
    );

    let blocked = router
        .handle(&AssistantRequest::new("u1", "add chips to my shopping list, I want to purge after eating"))
        .await;
    assert_eq!(blocked.text, SAFETY_MESSAGE);
    assert!(blocked.navigate_to.is_none());

    let empty = router.handle(&AssistantRequest::new("u1", " \t ")).await;
    assert_eq!(empty.text, EMPTY_INPUT_PROMPT);

    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    assert!(store.items("u1").await.expect("items").is_empty());
}

#[tokio::test]
async fn accepted_responses_satisfy_the_contract() {
    let model = Arc::new(CountingModel::default());
    let (modern, _) = modern_pipeline(model);
    let router = RolloutRouter::new(
        enabled(),
        Arc::new(modern),
        Arc::new(LegacyPipeline::default()),
        Arc::new(NoopTelemetry),
    );
    for message in MESSAGES {
        let routed = router.route(&AssistantRequest::new("u1", *message)).await;
        assert_eq!(routed.state, RolloutState::ModernAccepted, "{message}");
        assert!(routed.response.is_well_formed(), "{message}");
        assert!(!routed.response.captions.is_empty());
    }
    let nav = router.handle(&AssistantRequest::new("u1", "go to shopping list")).await;
    assert_eq!(nav.navigate_to.as_deref(), Some("/shopping-list"));
}

#[tokio::test]
async fn one_telemetry_entry_per_request() {
    let model = Arc::new(CountingModel::default());
    let (modern, _) = modern_pipeline(model);
    let telemetry = Arc::new(RingBufferTelemetry::default());
    let router = RolloutRouter::new(enabled(), Arc::new(modern), Arc::new(LegacyPipeline::default()), telemetry.clone());

    router.handle(&AssistantRequest::new("u1", "go to shopping list")).await;
    router.set_config(RolloutConfig::default());
    router.handle(&AssistantRequest::new("u2", "hello")).await;

    let entries = telemetry.recent(10);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].intent, Intent::Navigate);
    assert_eq!(entries[0].tools_used, vec![ToolName::Navigate]);
    assert!(entries[0].has_navigate_to);
    assert_eq!(entries[0].path, Some(ResponsePath::Modern));
    assert_eq!(entries[1].intent, Intent::SmallTalk);
    assert_eq!(entries[1].path, Some(ResponsePath::Legacy));
    assert!(entries[1].error.is_none());

    let failing = RolloutRouter::new(
        enabled(),
        Arc::new(BrokenModern(Failure::BlankRoute)),
        Arc::new(LegacyPipeline::default()),
        telemetry.clone(),
    );
    failing.handle(&AssistantRequest::new("u3", "go to recipes")).await;
    let last = telemetry.recent(1).pop().expect("entry");
    assert_eq!(last.path, Some(ResponsePath::Fallback));
    assert_eq!(last.intent, Intent::Navigate);
    assert!(last.error.as_deref().is_some_and(|e| e.contains("navigateTo")));
    assert!(last.has_navigate_to);
}
