//! Intent classification for coach utterances.
//!
//! Precedence is fixed: safety override, navigation, action, health keywords,
//! exact small-talk tokens, then the health default. The coach is
//! nutrition/fitness-first, so unmatched input is treated as a domain question.
//!
//! This module also owns argument extraction for the navigation and action
//! branches (destination, shopping list item, activity), so the classifier and
//! the tools it feeds agree on the same patterns.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Classified purpose of a user utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    #[serde(rename = "NAVIGATE")]
    Navigate,
    #[serde(rename = "DO")]
    Do,
    #[serde(rename = "QNA_HEALTH")]
    QnaHealth,
    #[serde(rename = "SMALLTALK")]
    SmallTalk,
    #[serde(rename = "BLOCKED")]
    Blocked,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Navigate => "NAVIGATE",
            Intent::Do => "DO",
            Intent::QnaHealth => "QNA_HEALTH",
            Intent::SmallTalk => "SMALLTALK",
            Intent::Blocked => "BLOCKED",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known in-app destinations the navigation tool can signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    ShoppingList,
    MealPlan,
    Recipes,
    Progress,
    Challenges,
    Workouts,
    Profile,
    Settings,
    Dashboard,
}

impl Destination {
    pub const ALL: [Destination; 9] = [
        Destination::ShoppingList,
        Destination::MealPlan,
        Destination::Recipes,
        Destination::Progress,
        Destination::Challenges,
        Destination::Workouts,
        Destination::Profile,
        Destination::Settings,
        Destination::Dashboard,
    ];

    /// Client route consumed by the UI layer.
    pub fn route(&self) -> &'static str {
        match self {
            Destination::ShoppingList => "/shopping-list",
            Destination::MealPlan => "/meal-plan",
            Destination::Recipes => "/recipes",
            Destination::Progress => "/progress",
            Destination::Challenges => "/challenges",
            Destination::Workouts => "/workouts",
            Destination::Profile => "/profile",
            Destination::Settings => "/settings",
            Destination::Dashboard => "/dashboard",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Destination::ShoppingList => "shopping list",
            Destination::MealPlan => "meal plan",
            Destination::Recipes => "recipes",
            Destination::Progress => "progress",
            Destination::Challenges => "challenges",
            Destination::Workouts => "workouts",
            Destination::Profile => "profile",
            Destination::Settings => "settings",
            Destination::Dashboard => "dashboard",
        }
    }

    /// Accepts a spoken phrase ("grocery list", "my recipes") or a route ("/progress").
    pub fn from_phrase(phrase: &str) -> Option<Self> {
        let p = phrase.trim().to_lowercase();
        let p = p
            .trim_start_matches('/')
            .trim_start_matches("my ")
            .trim_start_matches("the ")
            .replace('-', " ");
        match p.trim() {
            "shopping list" | "grocery list" | "shopping" | "groceries" => Some(Destination::ShoppingList),
            "meal plan" | "meal planner" | "meals" => Some(Destination::MealPlan),
            "recipe" | "recipes" => Some(Destination::Recipes),
            "progress" => Some(Destination::Progress),
            "challenge" | "challenges" | "daily challenge" => Some(Destination::Challenges),
            "workout" | "workouts" => Some(Destination::Workouts),
            "profile" => Some(Destination::Profile),
            "settings" => Some(Destination::Settings),
            "dashboard" | "home" => Some(Destination::Dashboard),
            _ => None,
        }
    }
}

/// Verb family of the start/complete action branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityVerb {
    Start,
    Complete,
}

/// Nouns the action branch understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Workout,
    Challenge,
    MealPlan,
    CheckIn,
    Journal,
}

impl ActivityKind {
    pub fn slug(&self) -> &'static str {
        match self {
            ActivityKind::Workout => "workout",
            ActivityKind::Challenge => "challenge",
            ActivityKind::MealPlan => "meal_plan",
            ActivityKind::CheckIn => "check_in",
            ActivityKind::Journal => "journal",
        }
    }

    pub fn page(&self) -> &'static str {
        match self {
            ActivityKind::Workout => Destination::Workouts.route(),
            ActivityKind::Challenge => Destination::Challenges.route(),
            ActivityKind::MealPlan => Destination::MealPlan.route(),
            ActivityKind::CheckIn | ActivityKind::Journal => Destination::Progress.route(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let n = name.trim().to_lowercase().replace(['-', '_'], " ");
        match n.as_str() {
            "workout" => Some(ActivityKind::Workout),
            "challenge" | "daily challenge" => Some(ActivityKind::Challenge),
            "meal plan" => Some(ActivityKind::MealPlan),
            "check in" | "checkin" => Some(ActivityKind::CheckIn),
            "journal" | "journal entry" => Some(ActivityKind::Journal),
            _ => None,
        }
    }
}

/// Shopping list arguments pulled out of an "add ... to my shopping list" utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItemArgs {
    pub item: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

static DANGER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(chest pains?|heart attack|faint(ed|ing)?|pass(ed)? out|can'?t breathe|cannot breathe|trouble breathing|short(ness)? of breath|suicid(e|al)|kill myself|end my life|self[- ]?harm|hurt(ing)? myself|cut(ting)? myself|anorexi[ac]|bulimi[ac]|purg(e|ed|ing)|starv(e|ing) myself|throw(ing)? up after (eating|meals)|overdos(e|ed|ing)|emergency|911)\b",
    )
    .expect("danger pattern")
});

const DESTINATION_GROUP: &str = r"(shopping list|grocery list|meal plan(?:ner)?|recipes?|progress|challenges?|workouts?|profile|settings|dashboard|home)";

static NAVIGATE_TO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:go|take me|navigate|bring me|switch|head|jump)\b.*?\b(?:to|into)\s+(?:the\s+|my\s+)?{}\b",
        DESTINATION_GROUP
    ))
    .expect("navigation pattern")
});

static NAVIGATE_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:open|show|view|pull up)\s+(?:me\s+)?(?:the\s+|my\s+)?{}\b",
        DESTINATION_GROUP
    ))
    .expect("open pattern")
});

static LIST_ADD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:add|put|throw)\s+(.+?)\s+(?:to|on|onto|in|into)\s+(?:my\s+|the\s+|our\s+)?(?:shopping|grocery)\s+list\b")
        .expect("list pattern")
});

static QUANTITY_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:(\d+\s+\d+/\d+|\d+/\d+|\d+(?:\.\d+)?|an?|one|two|three|four|five|six|seven|eight|nine|ten|twelve)\s+)?(?:(lbs?|pounds?|oz|ounces?|g|grams?|kg|kilos?|cups?|cans?|bags?|box(?:es)?|bottles?|packs?|packages?|dozen|loaf|loaves|bunch(?:es)?|cartons?|jars?|heads?)\s+)?(?:of\s+)?(.+)$",
    )
    .expect("quantity pattern")
});

static ACTIVITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(start|begin|create|complete|finish|log)\s+(?:(?:a|an|my|the|today'?s|new|this)\s+)*(daily challenge|challenge|workout|meal plan|check-?in|journal(?: entry)?)\b",
    )
    .expect("activity pattern")
});

static HEALTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(protein|calories?|carbs?|carbohydrates?|fats?|macros?|nutrition|nutrients?|diet|meals?|eat|eating|food|fib(er|re)|vitamins?|hydrat\w*|water|workouts?|exercis\w*|fitness|muscles?|weight|strength|cardio|sleep|stress|mindset|motivat\w*|habits?|recipes?|snacks?|breakfast|lunch|dinner|sugar|energy|steps)\b",
    )
    .expect("health pattern")
});

static NAVIGATION_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(go|open|show|take|navigate|bring|switch|view)\b").expect("nav verb pattern")
});

static ACTION_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(add|put|start|begin|create|complete|finish|log|track)\b").expect("action verb pattern")
});

const SMALL_TALK_TOKENS: &[&str] = &[
    "hi", "hello", "hey", "hiya", "yo", "howdy", "thanks", "thank you", "thx", "ty", "bye",
    "goodbye", "good bye", "see you", "see ya", "later", "good morning", "good afternoon",
    "good evening", "good night", "how are you", "what's up", "whats up", "sup",
];

/// Classifies an utterance. Pure and total: the same input always yields the same intent.
pub fn classify(utterance: &str) -> Intent {
    let text = utterance.trim();
    if is_dangerous(text) {
        return Intent::Blocked;
    }
    if extract_destination(text).is_some() {
        return Intent::Navigate;
    }
    if LIST_ADD.is_match(text) || ACTIVITY.is_match(text) {
        return Intent::Do;
    }
    if HEALTH.is_match(text) {
        return Intent::QnaHealth;
    }
    if is_small_talk(text) {
        return Intent::SmallTalk;
    }
    Intent::QnaHealth
}

/// Safety override: danger or emergency language anywhere in the utterance.
pub fn is_dangerous(utterance: &str) -> bool {
    DANGER.is_match(utterance)
}

/// Exact greeting/farewell token (case and trailing punctuation ignored).
pub fn is_small_talk(utterance: &str) -> bool {
    let normalized = utterance
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .to_lowercase();
    SMALL_TALK_TOKENS.contains(&normalized.as_str())
}

/// Destination named by a navigation phrase ("go to shopping list", "open my progress").
pub fn extract_destination(utterance: &str) -> Option<Destination> {
    NAVIGATE_TO
        .captures(utterance)
        .or_else(|| NAVIGATE_OPEN.captures(utterance))
        .and_then(|c| c.get(1))
        .and_then(|m| Destination::from_phrase(m.as_str()))
}

/// Item, quantity and unit from an "add/put ... to my shopping list" utterance.
pub fn extract_list_item(utterance: &str) -> Option<ListItemArgs> {
    let raw = LIST_ADD.captures(utterance)?.get(1)?.as_str().trim();
    let caps = QUANTITY_UNIT.captures(raw)?;
    let quantity = caps.get(1).and_then(|m| parse_quantity(m.as_str()));
    let unit = caps.get(2).map(|m| m.as_str().to_lowercase());
    let item = caps
        .get(3)
        .map(|m| clean_item(m.as_str()))
        .unwrap_or_default();
    if item.is_empty() {
        return None;
    }
    Some(ListItemArgs { item, quantity, unit })
}

/// Verb family and noun from a start/complete utterance ("start my workout").
pub fn extract_activity(utterance: &str) -> Option<(ActivityVerb, ActivityKind)> {
    let caps = ACTIVITY.captures(utterance)?;
    let verb = match caps.get(1)?.as_str().to_lowercase().as_str() {
        "complete" | "finish" | "log" => ActivityVerb::Complete,
        _ => ActivityVerb::Start,
    };
    let kind = ActivityKind::from_name(caps.get(2)?.as_str())?;
    Some((verb, kind))
}

pub(crate) fn has_navigation_verb(query: &str) -> bool {
    NAVIGATION_VERB.is_match(query)
}

pub(crate) fn has_action_verb(query: &str) -> bool {
    ACTION_VERB.is_match(query)
}

fn parse_quantity(s: &str) -> Option<f64> {
    match s.to_lowercase().as_str() {
        "a" | "an" | "one" => Some(1.0),
        "two" => Some(2.0),
        "three" => Some(3.0),
        "four" => Some(4.0),
        "five" => Some(5.0),
        "six" => Some(6.0),
        "seven" => Some(7.0),
        "eight" => Some(8.0),
        "nine" => Some(9.0),
        "ten" => Some(10.0),
        "twelve" => Some(12.0),
        other => parse_number(other).filter(|q| q.is_finite() && *q > 0.0),
    }
}

/// "2", "2.5", "1/2" or "1 1/2".
fn parse_number(s: &str) -> Option<f64> {
    let mut parts = s.split_whitespace();
    let (whole, frac) = match (parts.next(), parts.next()) {
        (Some(f), None) if f.contains('/') => ("0", f),
        (Some(n), None) => return n.parse().ok(),
        (Some(w), Some(f)) => (w, f),
        _ => return None,
    };
    let (num, den) = frac.split_once('/')?;
    let (num, den): (f64, f64) = (num.parse().ok()?, den.parse().ok()?);
    Some(whole.parse::<f64>().ok()? + num / den)
}

fn clean_item(s: &str) -> String {
    let t = s.trim().trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());
    let lower = t.to_lowercase();
    let stripped = ["some ", "the "]
        .iter()
        .find(|p| lower.starts_with(*p))
        .map(|p| &t[p.len()..])
        .unwrap_or(t);
    stripped.trim().to_string()
}
