//! Wires the core from an [`AssistantConfig`]: sled store, user-context client,
//! language model, both pipelines and the rollout router.

use crate::config::AssistantConfig;
use crate::generation::{GenerationInvoker, OpenRouterModel};
use crate::knowledge::KnowledgeBase;
use crate::legacy::LegacyPipeline;
use crate::pipeline::ModernPipeline;
use crate::rollout::RolloutRouter;
use crate::store::{SledCoachStore, StoreError};
use crate::telemetry::TelemetrySink;
use crate::tools::ToolRegistry;
use crate::user_context::{HttpUserContext, StaticUserContext, UserContextSource};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const USER_CONTEXT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn build_router(config: &AssistantConfig, telemetry: Arc<dyn TelemetrySink>) -> Result<RolloutRouter, StoreError> {
    let store = Arc::new(SledCoachStore::open(Some(&config.data_path))?);

    let user_context: Arc<dyn UserContextSource> = match &config.user_context_url {
        Some(url) => Arc::new(HttpUserContext::new(url.clone(), USER_CONTEXT_TIMEOUT)),
        None => Arc::new(StaticUserContext::empty()),
    };

    let generation = match config.llm.api_key.as_deref() {
        Some(key) => {
            let model = OpenRouterModel::new(key)
                .with_model(&config.llm.model)
                .with_api_base(&config.llm.api_url);
            info!(target: "pagi::coach", model = %model.model(), "language model configured");
            GenerationInvoker::new(Arc::new(model), config.llm.timeout())
        }
        None => {
            warn!(target: "pagi::coach", "no OPENROUTER_API_KEY / PAGI_LLM_API_KEY; modern replies will use the fallback text");
            GenerationInvoker::unconfigured()
        }
    };

    let tools = ToolRegistry::new(store.clone(), store, user_context);
    let modern = ModernPipeline::new(KnowledgeBase::builtin(), tools, generation);
    let legacy = LegacyPipeline::new(KnowledgeBase::builtin());

    Ok(RolloutRouter::new(config.rollout(), Arc::new(modern), Arc::new(legacy), telemetry))
}
