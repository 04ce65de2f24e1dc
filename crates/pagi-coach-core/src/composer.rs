//! Context composer: assembles the bounded prompt for the generation call.
//!
//! Block order is fixed: persona, utterance, knowledge, tool summary.

use crate::contract::ClientContext;
use crate::knowledge::Document;
use crate::tools::ToolOutcome;
use serde::{Deserialize, Serialize};

/// Marker used when the request ran no tools.
pub const NO_TOOLS_MARKER: &str = "No tools were used.";

/// Knowledge excerpts longer than this are cut at a char boundary.
const EXCERPT_MAX_CHARS: usize = 600;

/// The user's message is cut to this many chars before it reaches the prompt.
pub const UTTERANCE_MAX_CHARS: usize = 2_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessibilityMode {
    #[default]
    Standard,
    PlainLanguage,
}

impl AccessibilityMode {
    pub fn temperature(&self) -> f32 {
        match self {
            AccessibilityMode::Standard => 0.7,
            AccessibilityMode::PlainLanguage => 0.3,
        }
    }

    pub fn max_tokens(&self) -> u32 {
        match self {
            AccessibilityMode::Standard => 300,
            AccessibilityMode::PlainLanguage => 180,
        }
    }

    fn style(&self) -> &'static str {
        match self {
            AccessibilityMode::Standard => {
                "Answer warmly and concisely in two to four sentences. Be specific and practical."
            }
            AccessibilityMode::PlainLanguage => {
                "Use plain language: short sentences, common words, one idea per sentence. No more than three sentences. No jargon."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContextBlock {
    Persona(String),
    Utterance(String),
    Knowledge(Vec<(String, String)>),
    ToolSummary(Vec<String>),
}

impl ContextBlock {
    fn render(&self) -> String {
        match self {
            ContextBlock::Persona(p) => p.clone(),
            ContextBlock::Utterance(u) => format!("User message:\n{}", u),
            ContextBlock::Knowledge(excerpts) => {
                let mut out = String::from("Relevant knowledge:");
                for (title, text) in excerpts {
                    out.push_str(&format!("\n- {}: {}", title, text));
                }
                out
            }
            ContextBlock::ToolSummary(lines) if lines.is_empty() => format!("Tool results:\n{}", NO_TOOLS_MARKER),
            ContextBlock::ToolSummary(lines) => {
                let mut out = String::from("Tool results:");
                for line in lines {
                    out.push_str(&format!("\n- {}", line));
                }
                out
            }
        }
    }
}

/// Request-scoped prompt material, in block order.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedContext {
    pub mode: AccessibilityMode,
    pub blocks: Vec<ContextBlock>,
}

impl ComposedContext {
    /// The persona block.
    pub fn system_prompt(&self) -> String {
        self.blocks
            .iter()
            .filter(|b| matches!(b, ContextBlock::Persona(_)))
            .map(ContextBlock::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Everything after the persona, in order.
    pub fn user_prompt(&self) -> String {
        self.blocks
            .iter()
            .filter(|b| !matches!(b, ContextBlock::Persona(_)))
            .map(ContextBlock::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

pub fn compose(
    utterance: &str,
    docs: &[&Document],
    tools: &[ToolOutcome],
    mode: AccessibilityMode,
    client: &ClientContext,
) -> ComposedContext {
    let excerpts = docs
        .iter()
        .map(|d| (d.title.to_string(), truncate_chars(d.text, EXCERPT_MAX_CHARS)))
        .collect();
    let tool_lines = tools
        .iter()
        .map(|o| format!("{}: {}", o.tool, o.result.summary()))
        .collect();
    ComposedContext {
        mode,
        blocks: vec![
            ContextBlock::Persona(persona(mode, client)),
            ContextBlock::Utterance(truncate_chars(utterance.trim(), UTTERANCE_MAX_CHARS)),
            ContextBlock::Knowledge(excerpts),
            ContextBlock::ToolSummary(tool_lines),
        ],
    }
}

fn persona(mode: AccessibilityMode, client: &ClientContext) -> String {
    let mut p = String::from(
        "You are PAGI Coach, a friendly nutrition and fitness coach inside a health app. \
Give general wellness guidance only; never diagnose, prescribe, or give medical advice. \
Only describe actions that the tool results below confirm.",
    );
    p.push(' ');
    p.push_str(mode.style());

    let mut facts = Vec::new();
    if let Some(name) = client.user_name.as_deref().filter(|n| !n.trim().is_empty()) {
        facts.push(format!("The user's name is {}.", name.trim()));
    }
    if let Some(page) = client.current_page.as_deref().filter(|p| !p.trim().is_empty()) {
        facts.push(format!("They are on the {} page.", page.trim()));
    }
    if let Some(streak) = client.streak {
        facts.push(format!("Their current streak is {} days.", streak));
    }
    if !client.badges.is_empty() {
        facts.push(format!("Badges earned: {}.", client.badges.join(", ")));
    }
    if !facts.is_empty() {
        p.push('\n');
        p.push_str(&facts.join(" "));
    }
    p
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
