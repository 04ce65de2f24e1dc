//! Rollout router: per-user gate between the modern pipeline and the legacy responder.
//!
//! Each request walks an explicit state machine:
//!
//! ```text
//! LegacyOnly                         (flag off, or user not allowlisted)
//! ModernAttempt -> ModernAccepted    (modern ok and shape check passes)
//! ModernAttempt -> FallbackToLegacy  (error, panic, deadline or contract violation)
//! ```
//!
//! The config lives behind a lock and is read once per request, so updates apply
//! to the next request without a restart.

use crate::contract::{AssistantRequest, AssistantResponse, CandidateResponse};
use crate::intent::{self, Intent};
use crate::pipeline::PipelineError;
use crate::telemetry::{ResponsePath, TelemetryLogEntry, TelemetrySink};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{error, info, warn};

/// Upper bound on a whole modern attempt (generation has its own, shorter timeout).
pub const DEFAULT_MODERN_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolloutConfig {
    #[serde(default)]
    pub modern_enabled: bool,
    /// Empty means every user.
    #[serde(default)]
    pub allowlist: BTreeSet<String>,
}

impl RolloutConfig {
    pub fn new(modern_enabled: bool, allowlist: impl IntoIterator<Item = String>) -> Self {
        Self {
            modern_enabled,
            allowlist: allowlist
                .into_iter()
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())
                .collect(),
        }
    }

    /// Comma-separated user ids; blanks ignored.
    pub fn parse_allowlist(raw: &str) -> BTreeSet<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn decide(&self, user_id: &str) -> RolloutDecision {
        if !self.modern_enabled {
            return RolloutDecision::Legacy;
        }
        if self.allowlist.is_empty() || self.allowlist.contains(user_id.trim()) {
            RolloutDecision::Modern
        } else {
            RolloutDecision::Legacy
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RolloutDecision {
    Legacy,
    Modern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloutState {
    LegacyOnly,
    ModernAttempt,
    ModernAccepted,
    FallbackToLegacy,
}

impl RolloutState {
    fn initial(decision: RolloutDecision) -> Self {
        match decision {
            RolloutDecision::Legacy => RolloutState::LegacyOnly,
            RolloutDecision::Modern => RolloutState::ModernAttempt,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RolloutState::ModernAttempt)
    }

    pub fn path(&self) -> ResponsePath {
        match self {
            RolloutState::LegacyOnly => ResponsePath::Legacy,
            RolloutState::ModernAttempt | RolloutState::ModernAccepted => ResponsePath::Modern,
            RolloutState::FallbackToLegacy => ResponsePath::Fallback,
        }
    }
}

#[async_trait]
pub trait ModernAssistant: Send + Sync {
    async fn respond(&self, request: &AssistantRequest) -> Result<CandidateResponse, PipelineError>;
}

pub trait LegacyAssistant: Send + Sync {
    fn respond(&self, request: &AssistantRequest) -> AssistantResponse;
}

/// Router output with the path it took.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedResponse {
    pub response: AssistantResponse,
    pub state: RolloutState,
    pub trace: Vec<RolloutState>,
    pub request_id: String,
    pub error: Option<String>,
}

pub struct RolloutRouter {
    config: RwLock<RolloutConfig>,
    modern: Arc<dyn ModernAssistant>,
    legacy: Arc<dyn LegacyAssistant>,
    telemetry: Arc<dyn TelemetrySink>,
    modern_deadline: Duration,
}

impl RolloutRouter {
    pub fn new(
        config: RolloutConfig,
        modern: Arc<dyn ModernAssistant>,
        legacy: Arc<dyn LegacyAssistant>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            config: RwLock::new(config),
            modern,
            legacy,
            telemetry,
            modern_deadline: DEFAULT_MODERN_DEADLINE,
        }
    }

    pub fn with_modern_deadline(mut self, deadline: Duration) -> Self {
        self.modern_deadline = deadline;
        self
    }

    pub fn config(&self) -> RolloutConfig {
        self.config.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_config(&self, config: RolloutConfig) {
        info!(
            target: "pagi::coach::rollout",
            modern_enabled = config.modern_enabled,
            allowlist = config.allowlist.len(),
            "rollout config updated"
        );
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    pub fn telemetry(&self) -> &Arc<dyn TelemetrySink> {
        &self.telemetry
    }

    /// Always returns a well-formed response.
    pub async fn handle(&self, request: &AssistantRequest) -> AssistantResponse {
        self.route(request).await.response
    }

    pub async fn route(&self, request: &AssistantRequest) -> RoutedResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        let decision = self.config().decide(&request.user_id);

        let mut state = RolloutState::initial(decision);
        let mut trace = vec![state];
        let mut accepted: Option<(AssistantResponse, CandidateResponse)> = None;
        let mut failure: Option<PipelineError> = None;
        let mut partial: Option<CandidateResponse> = None;

        while !state.is_terminal() {
            state = match state {
                RolloutState::ModernAttempt => match self.attempt_modern(request).await {
                    Ok(candidate) => match candidate.clone().accept() {
                        Ok(response) => {
                            accepted = Some((response, candidate));
                            RolloutState::ModernAccepted
                        }
                        Err(violation) => {
                            error!(
                                target: "pagi::coach::rollout",
                                request_id = %request_id,
                                user_id = %request.user_id,
                                violation = %violation,
                                "modern response violated the contract"
                            );
                            partial = Some(candidate);
                            failure = Some(violation.into());
                            RolloutState::FallbackToLegacy
                        }
                    },
                    Err(e) => {
                        warn!(
                            target: "pagi::coach::rollout",
                            request_id = %request_id,
                            user_id = %request.user_id,
                            error = %e,
                            "modern pipeline failed, falling back to legacy"
                        );
                        failure = Some(e);
                        RolloutState::FallbackToLegacy
                    }
                },
                terminal => terminal,
            };
            trace.push(state);
        }

        let mut entry = TelemetryLogEntry::new(request.user_id.clone(), Intent::QnaHealth);
        let response = match (state, accepted) {
            (RolloutState::ModernAccepted, Some((response, candidate))) => {
                entry.intent = candidate.intent.unwrap_or_else(|| intent::classify(&request.message));
                entry.tools_used = candidate.tools_used;
                response
            }
            _ => {
                entry.intent = partial
                    .as_ref()
                    .and_then(|c| c.intent)
                    .unwrap_or_else(|| intent::classify(&request.message));
                entry.tools_used = partial.map(|c| c.tools_used).unwrap_or_default();
                self.legacy.respond(request)
            }
        };

        let error = failure.map(|e| e.to_string());
        entry.has_navigate_to = response.navigate_to.is_some();
        entry.error = error.clone();
        entry.path = Some(state.path());
        entry.request_id = Some(request_id.clone());
        self.telemetry.record(entry);

        info!(
            target: "pagi::coach::rollout",
            request_id = %request_id,
            user_id = %request.user_id,
            state = ?state,
            "request routed"
        );

        RoutedResponse {
            response,
            state,
            trace,
            request_id,
            error,
        }
    }

    /// Runs the modern pipeline on its own task so a panic surfaces as an error.
    async fn attempt_modern(&self, request: &AssistantRequest) -> Result<CandidateResponse, PipelineError> {
        let modern = self.modern.clone();
        let owned = request.clone();
        let task = tokio::spawn(async move { modern.respond(&owned).await });
        let abort = task.abort_handle();
        match tokio::time::timeout(self.modern_deadline, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) if join.is_panic() => Err(PipelineError::Panicked(panic_message(join.into_panic()))),
            Ok(Err(join)) => Err(PipelineError::Internal(join.to_string())),
            Err(_) => {
                abort.abort();
                Err(PipelineError::DeadlineExceeded(self.modern_deadline))
            }
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_table() {
        let off = RolloutConfig::new(false, vec!["u1".to_string()]);
        assert_eq!(off.decide("u1"), RolloutDecision::Legacy);

        let everyone = RolloutConfig::new(true, Vec::new());
        assert_eq!(everyone.decide("anyone"), RolloutDecision::Modern);

        let some = RolloutConfig {
            modern_enabled: true,
            allowlist: RolloutConfig::parse_allowlist(" u1, ,u2 "),
        };
        assert_eq!(some.allowlist.len(), 2);
        assert_eq!(some.decide("u2"), RolloutDecision::Modern);
        assert_eq!(some.decide("u3"), RolloutDecision::Legacy);
    }

    #[test]
    fn state_paths() {
        assert!(RolloutState::LegacyOnly.is_terminal());
        assert!(!RolloutState::ModernAttempt.is_terminal());
        assert_eq!(RolloutState::FallbackToLegacy.path(), ResponsePath::Fallback);
        assert_eq!(RolloutState::initial(RolloutDecision::Modern), RolloutState::ModernAttempt);
    }

    #[test]
    fn config_wire_format() {
        let c: RolloutConfig = serde_json::from_str(r#"{"modernEnabled":true,"allowlist":["a","b"]}"#).expect("parse");
        assert!(c.modern_enabled);
        assert_eq!(c.allowlist.len(), 2);
        let d: RolloutConfig = serde_json::from_str("{}").expect("parse");
        assert_eq!(d, RolloutConfig::default());
    }
}
