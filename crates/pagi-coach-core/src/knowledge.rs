//! Knowledge retrieval over the built-in coach corpus.
//!
//! The corpus is a fixed `'static` slice built at compile time; no runtime
//! mutation, no versioning. Scoring is keyword-weight overlap plus two fixed
//! bonuses. Zero-score documents are never filtered out: when nothing matches,
//! the first `k` documents in corpus order are still returned.

use crate::intent::{has_action_verb, has_navigation_verb};
use serde::Serialize;

/// Bonus when the query has a navigation verb and the document carries a route.
pub const NAVIGATION_BONUS: u32 = 3;
/// Bonus when the query has an action verb.
pub const ACTION_BONUS: u32 = 1;
/// Default number of documents handed to the composer.
pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeDomain {
    Nutrition,
    Fitness,
    Mindset,
    App,
}

/// A short knowledge snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub id: &'static str,
    pub domain: KnowledgeDomain,
    pub title: &'static str,
    pub text: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<&'static str>,
}

/// Document with its relevance score for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredDocument {
    pub document: &'static Document,
    pub score: u32,
}

/// Domain keyword → weight. A keyword counts when it appears in both the query and the document.
const KEYWORD_WEIGHTS: &[(&str, u32)] = &[
    ("protein", 3),
    ("macro", 3),
    ("calorie", 2),
    ("carb", 2),
    ("fat", 1),
    ("fiber", 2),
    ("water", 2),
    ("hydrat", 2),
    ("meal", 2),
    ("prep", 2),
    ("shopping", 3),
    ("grocer", 3),
    ("recipe", 3),
    ("breakfast", 2),
    ("snack", 2),
    ("strength", 3),
    ("muscle", 2),
    ("workout", 3),
    ("cardio", 3),
    ("recovery", 2),
    ("sleep", 2),
    ("stress", 2),
    ("mindset", 3),
    ("habit", 2),
    ("motivation", 2),
    ("streak", 2),
    ("badge", 2),
    ("challenge", 3),
    ("progress", 3),
    ("weight", 2),
];

static CORPUS: [Document; 12] = [
    Document {
        id: "nutrition-protein-basics",
        domain: KnowledgeDomain::Nutrition,
        title: "Protein basics",
        text: "Most active adults do well with 1.6 to 2.2 grams of protein per kilogram of body weight each day, spread over 3 to 5 meals. Eggs, Greek yogurt, chicken, fish, tofu and lentils are easy protein sources that also support muscle recovery.",
        route: None,
    },
    Document {
        id: "nutrition-macros",
        domain: KnowledgeDomain::Nutrition,
        title: "Balancing your macros",
        text: "Your meal plan balances protein, carbs and fat. Carbs fuel training, fat supports hormones, and protein keeps you full. Build each meal around a protein, add a fiber-rich carb and a thumb of healthy fat.",
        route: Some("/meal-plan"),
    },
    Document {
        id: "nutrition-hydration",
        domain: KnowledgeDomain::Nutrition,
        title: "Hydration",
        text: "Aim for roughly 30 to 35 ml of water per kilogram of body weight, more on training days. Pale yellow urine is a simple hydration check. Start the day with a glass of water.",
        route: None,
    },
    Document {
        id: "nutrition-meal-prep",
        domain: KnowledgeDomain::Nutrition,
        title: "Meal prep and your shopping list",
        text: "Plan three to four meals for the week, then add every ingredient to your shopping list in one pass. Batch-cook a protein and a grain on Sunday to make weekday meals quick.",
        route: Some("/shopping-list"),
    },
    Document {
        id: "nutrition-recipes",
        domain: KnowledgeDomain::Nutrition,
        title: "High-protein recipes",
        text: "The recipes page lists high-protein breakfast, lunch, dinner and snack ideas with macros per serving. Overnight oats with Greek yogurt and a turkey chili are member favourites.",
        route: Some("/recipes"),
    },
    Document {
        id: "fitness-strength",
        domain: KnowledgeDomain::Fitness,
        title: "Strength training",
        text: "Two to four strength workouts a week build muscle and protect metabolism. Focus on squats, hinges, pushes and pulls, and add a little weight or a rep each week.",
        route: Some("/workouts"),
    },
    Document {
        id: "fitness-cardio-recovery",
        domain: KnowledgeDomain::Fitness,
        title: "Cardio and recovery",
        text: "Mix easy cardio such as brisk walks with one or two harder sessions. Recovery matters as much as training: sleep, protein and rest days let your muscle adapt.",
        route: None,
    },
    Document {
        id: "mindset-habits",
        domain: KnowledgeDomain::Mindset,
        title: "Building habits",
        text: "Small daily habits beat big resets. Keep your streak alive with one easy win per day, and celebrate each badge. Motivation follows action, not the other way round.",
        route: None,
    },
    Document {
        id: "mindset-stress-sleep",
        domain: KnowledgeDomain::Mindset,
        title: "Stress and sleep",
        text: "High stress and short sleep raise cravings. Aim for 7 to 9 hours of sleep, keep a wind-down routine, and try two minutes of slow breathing when stress spikes.",
        route: None,
    },
    Document {
        id: "app-daily-challenge",
        domain: KnowledgeDomain::App,
        title: "Daily challenges",
        text: "Each day brings a small challenge such as drinking eight glasses of water or a ten minute walk. Completing it extends your streak and can unlock a badge.",
        route: Some("/challenges"),
    },
    Document {
        id: "app-progress",
        domain: KnowledgeDomain::App,
        title: "Tracking progress",
        text: "The progress page charts your weight, streak and weekly check-ins. Look at the weekly trend rather than daily swings.",
        route: Some("/progress"),
    },
    Document {
        id: "app-shopping-list",
        domain: KnowledgeDomain::App,
        title: "Using the shopping list",
        text: "Ask the coach to add items to your shopping list, including a quantity and unit such as 2 lbs chicken. Items sync to the shopping list page for your next grocery run.",
        route: Some("/shopping-list"),
    },
];

/// Read-only handle over a document corpus.
#[derive(Debug, Clone, Copy)]
pub struct KnowledgeBase {
    documents: &'static [Document],
}

impl KnowledgeBase {
    /// The built-in coach corpus.
    pub fn builtin() -> Self {
        Self { documents: &CORPUS }
    }

    pub fn from_static(documents: &'static [Document]) -> Self {
        Self { documents }
    }

    pub fn documents(&self) -> &'static [Document] {
        self.documents
    }

    pub fn get(&self, id: &str) -> Option<&'static Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Top `k` documents for `query`, highest score first, ties in corpus order.
    pub fn retrieve(&self, query: &str, k: usize) -> Vec<&'static Document> {
        self.retrieve_scored(query, k)
            .into_iter()
            .map(|s| s.document)
            .collect()
    }

    /// Same as [`retrieve`](Self::retrieve) but keeps the scores.
    pub fn retrieve_scored(&self, query: &str, k: usize) -> Vec<ScoredDocument> {
        let q = query.to_lowercase();
        let nav = has_navigation_verb(&q);
        let action = has_action_verb(&q);
        let mut scored: Vec<ScoredDocument> = self
            .documents
            .iter()
            .map(|document| ScoredDocument {
                document,
                score: score_document(&q, document, nav, action),
            })
            .collect();
        // sort_by is stable: equal scores keep corpus order.
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored.truncate(k);
        scored
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::builtin()
    }
}

fn score_document(query_lower: &str, doc: &Document, nav: bool, action: bool) -> u32 {
    let haystack = format!("{} {}", doc.title, doc.text).to_lowercase();
    let mut score: u32 = KEYWORD_WEIGHTS
        .iter()
        .filter(|(kw, _)| query_lower.contains(kw) && haystack.contains(kw))
        .map(|(_, w)| *w)
        .sum();
    if nav && doc.route.is_some() {
        score += NAVIGATION_BONUS;
    }
    if action {
        score += ACTION_BONUS;
    }
    score
}
