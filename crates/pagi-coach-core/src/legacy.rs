//! Legacy responder: deterministic, offline, side-effect free.
//!
//! This is the fallback target for every modern failure, so it must always
//! return a well-formed response and must never write to a store.

use crate::contract::{AssistantRequest, AssistantResponse};
use crate::intent::{self, ActivityVerb};
use crate::knowledge::KnowledgeBase;
use crate::rollout::LegacyAssistant;
use crate::store::ShoppingListItem;

#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyPipeline {
    knowledge: KnowledgeBase,
}

impl LegacyPipeline {
    pub fn new(knowledge: KnowledgeBase) -> Self {
        Self { knowledge }
    }

    pub fn respond(&self, request: &AssistantRequest) -> AssistantResponse {
        let text = request.message.trim();
        if text.is_empty() {
            return AssistantResponse::empty_input();
        }
        if intent::is_dangerous(text) {
            return AssistantResponse::safety();
        }
        if let Some(dest) = intent::extract_destination(text) {
            return AssistantResponse::new(format!("Opening your {}.", dest.label())).with_navigate_to(dest.route());
        }
        if let Some(args) = intent::extract_list_item(text) {
            let item = ShoppingListItem::new(args.item, args.quantity, args.unit);
            return AssistantResponse::new(format!(
                "You can add {} on your shopping list page. I've opened it for you.",
                item.describe()
            ))
            .with_navigate_to("/shopping-list");
        }
        if let Some((verb, kind)) = intent::extract_activity(text) {
            let noun = kind.slug().replace('_', " ");
            let line = match verb {
                ActivityVerb::Start => format!("Let's get your {} started.", noun),
                ActivityVerb::Complete => format!("You can mark your {} complete here.", noun),
            };
            return AssistantResponse::new(line).with_navigate_to(kind.page());
        }
        if intent::is_small_talk(text) {
            return AssistantResponse::new(small_talk_reply(text, request.context.user_name.as_deref()));
        }
        match self.knowledge.retrieve(text, 1).first() {
            Some(doc) => AssistantResponse::new(doc.text),
            None => AssistantResponse::new("I can help with meals, workouts and your progress. Could you tell me a bit more?"),
        }
    }
}

fn small_talk_reply(text: &str, user_name: Option<&str>) -> String {
    let lower = text.to_lowercase();
    if lower.starts_with("thank") || lower.starts_with("thx") || lower.starts_with("ty") {
        return "You're welcome! Anything else I can help with?".to_string();
    }
    if ["bye", "goodbye", "good bye", "see you", "see ya", "later", "good night"]
        .iter()
        .any(|t| lower.starts_with(t))
    {
        return "Talk soon. Keep up the good work!".to_string();
    }
    match user_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("Hi {}! How can I help with your health goals today?", name),
        None => "Hi! How can I help with your health goals today?".to_string(),
    }
}

impl LegacyAssistant for LegacyPipeline {
    fn respond(&self, request: &AssistantRequest) -> AssistantResponse {
        LegacyPipeline::respond(self, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{ClientContext, EMPTY_INPUT_PROMPT, SAFETY_MESSAGE};

    fn ask(message: &str) -> AssistantResponse {
        LegacyPipeline::default().respond(&AssistantRequest::new("u1", message))
    }

    #[test]
    fn fixed_responses() {
        assert_eq!(ask("  ").text, EMPTY_INPUT_PROMPT);
        assert_eq!(ask("I think I'm having a heart attack").text, SAFETY_MESSAGE);
    }

    #[test]
    fn navigation_and_list_requests_point_to_pages() {
        let nav = ask("take me to my progress");
        assert_eq!(nav.navigate_to.as_deref(), Some("/progress"));

        let list = ask("add 2 lbs chicken to my shopping list");
        assert!(list.text.contains("2 lbs chicken"));
        assert_eq!(list.navigate_to.as_deref(), Some("/shopping-list"));

        let start = ask("start my workout");
        assert_eq!(start.navigate_to.as_deref(), Some("/workouts"));
    }

    #[test]
    fn greetings_use_name() {
        let req = AssistantRequest::new("u1", "hello").with_context(ClientContext {
            user_name: Some("Ana".into()),
            ..Default::default()
        });
        assert!(LegacyPipeline::default().respond(&req).text.starts_with("Hi Ana!"));
        assert!(ask("thanks!").text.starts_with("You're welcome"));
    }

    #[test]
    fn questions_answer_from_knowledge_and_are_deterministic() {
        let a = ask("how much protein do I need?");
        assert!(a.text.contains("grams of protein"));
        assert!(a.navigate_to.is_none());
        for msg in ["what about carbs", "hi", "go to recipes", "random words"] {
            let first = ask(msg);
            assert!(first.is_well_formed());
            assert_eq!(ask(msg), first);
        }
    }
}
