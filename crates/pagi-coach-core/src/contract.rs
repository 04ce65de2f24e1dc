//! Inbound request and outbound response contract.
//!
//! Every response that leaves the core is an [`AssistantResponse`]: non-empty
//! `text`, non-empty `captions` (defaults to `text`), and `navigateTo` either
//! absent or a non-empty route. Modern pipeline output arrives as a
//! [`CandidateResponse`] and only becomes an `AssistantResponse` after
//! [`CandidateResponse::accept`] checks its shape.

use crate::composer::AccessibilityMode;
use crate::intent::Intent;
use crate::tools::ToolName;
use serde::{Deserialize, Serialize};

/// Reply for an empty or whitespace-only message.
pub const EMPTY_INPUT_PROMPT: &str = "I'm here to help with meals, workouts and your progress. What would you like to do?";

/// Reply for utterances that trip the safety override.
pub const SAFETY_MESSAGE: &str = "That sounds like it could be serious, and I'm not able to help with it here. \
If you are in danger or having a medical emergency, call 911 or your local emergency number now. \
If you are struggling with thoughts of self-harm or with eating, please reach out to a doctor or a crisis line such as 988 in the US.";

/// Client-supplied page and profile hints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streak: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub badges: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct A11yOptions {
    pub plain_language: bool,
    /// Passed through for the client's speech layer; the core does not use it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts_rate: Option<f32>,
}

impl A11yOptions {
    pub fn mode(&self) -> AccessibilityMode {
        if self.plain_language {
            AccessibilityMode::PlainLanguage
        } else {
            AccessibilityMode::Standard
        }
    }
}

/// `POST /api/v1/assistant` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub context: ClientContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a11y: Option<A11yOptions>,
}

impl AssistantRequest {
    pub fn new(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: ClientContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_a11y(mut self, a11y: A11yOptions) -> Self {
        self.a11y = Some(a11y);
        self
    }

    pub fn mode(&self) -> AccessibilityMode {
        self.a11y.as_ref().map(A11yOptions::mode).unwrap_or_default()
    }
}

/// The only response shape the core returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantResponse {
    pub text: String,
    pub captions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigate_to: Option<String>,
}

impl AssistantResponse {
    /// Captions default to the text.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            captions: text.clone(),
            text,
            navigate_to: None,
        }
    }

    /// Blank routes are dropped.
    pub fn with_navigate_to(mut self, route: impl Into<String>) -> Self {
        let route = route.into();
        self.navigate_to = Some(route).filter(|r| !r.trim().is_empty());
        self
    }

    pub fn empty_input() -> Self {
        Self::new(EMPTY_INPUT_PROMPT)
    }

    pub fn safety() -> Self {
        Self::new(SAFETY_MESSAGE)
    }

    /// True when the response satisfies the outbound invariants.
    pub fn is_well_formed(&self) -> bool {
        !self.text.trim().is_empty()
            && !self.captions.trim().is_empty()
            && self.navigate_to.as_deref().map_or(true, |r| !r.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    #[error("response text is empty")]
    EmptyText,

    #[error("navigateTo is present but empty")]
    EmptyNavigateTo,
}

/// Unchecked modern pipeline output, plus the diagnostics it was built from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CandidateResponse {
    pub text: String,
    pub captions: Option<String>,
    pub navigate_to: Option<String>,
    pub intent: Option<Intent>,
    pub tools_used: Vec<ToolName>,
}

impl CandidateResponse {
    pub fn check_shape(&self) -> Result<(), ContractViolation> {
        if self.text.trim().is_empty() {
            return Err(ContractViolation::EmptyText);
        }
        if matches!(&self.navigate_to, Some(r) if r.trim().is_empty()) {
            return Err(ContractViolation::EmptyNavigateTo);
        }
        Ok(())
    }

    /// Shape check, then normalization (`captions` falls back to `text`).
    pub fn accept(self) -> Result<AssistantResponse, ContractViolation> {
        self.check_shape()?;
        let captions = self
            .captions
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| self.text.clone());
        Ok(AssistantResponse {
            text: self.text,
            captions,
            navigate_to: self.navigate_to,
        })
    }
}
