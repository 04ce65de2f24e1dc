//! PAGI Coach core library.
//! Intent routing, knowledge retrieval, tools, generation and the modern/legacy rollout.

pub mod assistant;
pub mod composer;
pub mod config;
pub mod contract;
pub mod generation;
pub mod intent;
pub mod knowledge;
pub mod legacy;
pub mod pipeline;
pub mod rollout;
pub mod store;
pub mod telemetry;
pub mod tools;
pub mod user_context;

pub use assistant::build_router;
pub use composer::{compose, AccessibilityMode, ComposedContext};
pub use config::{AssistantConfig, ConfigError, LlmConfig};
pub use contract::{AssistantRequest, AssistantResponse, CandidateResponse, ClientContext, ContractViolation};
pub use generation::{GenerationError, GenerationInvoker, LanguageModel, OpenRouterModel, GENERATION_FALLBACK};
pub use intent::{classify, Destination, Intent};
pub use knowledge::{Document, KnowledgeBase};
pub use legacy::LegacyPipeline;
pub use pipeline::{ModernPipeline, PipelineError};
pub use rollout::{LegacyAssistant, ModernAssistant, RolloutConfig, RolloutRouter, RolloutState, RoutedResponse};
pub use store::{ChallengeStore, ListStore, SledCoachStore, StoreError};
pub use telemetry::{NoopTelemetry, RingBufferTelemetry, TelemetryLogEntry, TelemetrySink, TELEMETRY_CAPACITY};
pub use tools::{ToolCall, ToolName, ToolRegistry, ToolResult, ToolValidationError};
pub use user_context::{HttpUserContext, StaticUserContext, UserContextSource};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
