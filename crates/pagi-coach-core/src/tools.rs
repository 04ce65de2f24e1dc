//! Tool registry: a closed set of coach tools with one validate-then-execute interface.
//!
//! Validation turns a wire-level `{name, args}` pair into a typed [`ToolCall`] or a
//! [`ToolValidationError`]; execution never fails. Tools that touch a collaborator
//! (user context, list store, challenge store) catch that failure themselves and
//! return a best-effort [`ToolResult`].

use crate::intent::{ActivityKind, Destination};
use crate::store::{date_key, ChallengeStore, DailyChallenge, ListStore, ShoppingListItem};
use crate::user_context::{fetch_or_empty, UserContextSource};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default protein range (grams per day) when the user context has nothing better.
pub const DEFAULT_PROTEIN_RANGE: (u32, u32) = (100, 150);

/// Tool identifiers as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    Navigate,
    AddToShoppingList,
    TodaysPlan,
    ProteinTarget,
    DailyChallenge,
    CompleteChallenge,
    StartActivity,
}

impl ToolName {
    pub const ALL: [ToolName; 7] = [
        ToolName::Navigate,
        ToolName::AddToShoppingList,
        ToolName::TodaysPlan,
        ToolName::ProteinTarget,
        ToolName::DailyChallenge,
        ToolName::CompleteChallenge,
        ToolName::StartActivity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::Navigate => "navigate",
            ToolName::AddToShoppingList => "add_to_shopping_list",
            ToolName::TodaysPlan => "todays_plan",
            ToolName::ProteinTarget => "protein_target",
            ToolName::DailyChallenge => "daily_challenge",
            ToolName::CompleteChallenge => "complete_challenge",
            ToolName::StartActivity => "start_activity",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == name.trim())
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolValidationError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("{tool}: missing argument '{field}'")]
    MissingArgument { tool: ToolName, field: &'static str },

    #[error("{tool}: invalid argument '{field}': {reason}")]
    InvalidArgument {
        tool: ToolName,
        field: &'static str,
        reason: String,
    },
}

/// A validated tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    Navigate { destination: Destination },
    AddToShoppingList { item: String, quantity: Option<f64>, unit: Option<String> },
    TodaysPlan,
    ProteinTarget,
    DailyChallenge { date: NaiveDate },
    CompleteChallenge { date: NaiveDate },
    StartActivity { activity: ActivityKind },
}

impl ToolCall {
    pub fn name(&self) -> ToolName {
        match self {
            ToolCall::Navigate { .. } => ToolName::Navigate,
            ToolCall::AddToShoppingList { .. } => ToolName::AddToShoppingList,
            ToolCall::TodaysPlan => ToolName::TodaysPlan,
            ToolCall::ProteinTarget => ToolName::ProteinTarget,
            ToolCall::DailyChallenge { .. } => ToolName::DailyChallenge,
            ToolCall::CompleteChallenge { .. } => ToolName::CompleteChallenge,
            ToolCall::StartActivity { .. } => ToolName::StartActivity,
        }
    }

    /// Validate a `{name, args}` pair. Missing or malformed arguments never reach execution.
    pub fn validate(name: &str, args: &Value) -> Result<ToolCall, ToolValidationError> {
        let tool = ToolName::from_name(name).ok_or_else(|| ToolValidationError::UnknownTool(name.to_string()))?;
        match tool {
            ToolName::Navigate => {
                let raw = required_str(tool, args, "destination")?;
                let destination = Destination::from_phrase(raw).ok_or_else(|| ToolValidationError::InvalidArgument {
                    tool,
                    field: "destination",
                    reason: format!("unknown destination '{}'", raw),
                })?;
                Ok(ToolCall::Navigate { destination })
            }
            ToolName::AddToShoppingList => {
                let item = required_str(tool, args, "item")?.to_string();
                let quantity = match args.get("quantity") {
                    None | Some(Value::Null) => None,
                    Some(v) => match v.as_f64() {
                        Some(q) if q.is_finite() && q > 0.0 => Some(q),
                        _ => {
                            return Err(ToolValidationError::InvalidArgument {
                                tool,
                                field: "quantity",
                                reason: format!("expected a positive number, got {}", v),
                            })
                        }
                    },
                };
                let unit = optional_str(tool, args, "unit")?.map(str::to_string);
                Ok(ToolCall::AddToShoppingList { item, quantity, unit })
            }
            ToolName::TodaysPlan => Ok(ToolCall::TodaysPlan),
            ToolName::ProteinTarget => Ok(ToolCall::ProteinTarget),
            ToolName::DailyChallenge => Ok(ToolCall::DailyChallenge {
                date: required_date(tool, args)?,
            }),
            ToolName::CompleteChallenge => Ok(ToolCall::CompleteChallenge {
                date: required_date(tool, args)?,
            }),
            ToolName::StartActivity => {
                let raw = required_str(tool, args, "activity")?;
                let activity = ActivityKind::from_name(raw).ok_or_else(|| ToolValidationError::InvalidArgument {
                    tool,
                    field: "activity",
                    reason: format!("unknown activity '{}'", raw),
                })?;
                Ok(ToolCall::StartActivity { activity })
            }
        }
    }
}

fn required_str<'a>(tool: ToolName, args: &'a Value, field: &'static str) -> Result<&'a str, ToolValidationError> {
    match args.get(field) {
        None | Some(Value::Null) => Err(ToolValidationError::MissingArgument { tool, field }),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim()),
        Some(Value::String(_)) => Err(ToolValidationError::MissingArgument { tool, field }),
        Some(other) => Err(ToolValidationError::InvalidArgument {
            tool,
            field,
            reason: format!("expected a string, got {}", other),
        }),
    }
}

fn optional_str<'a>(tool: ToolName, args: &'a Value, field: &'static str) -> Result<Option<&'a str>, ToolValidationError> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim()).filter(|s| !s.is_empty())),
        Some(other) => Err(ToolValidationError::InvalidArgument {
            tool,
            field,
            reason: format!("expected a string, got {}", other),
        }),
    }
}

fn required_date(tool: ToolName, args: &Value) -> Result<NaiveDate, ToolValidationError> {
    let raw = required_str(tool, args, "date")?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| ToolValidationError::InvalidArgument {
        tool,
        field: "date",
        reason: format!("expected YYYY-MM-DD: {}", e),
    })
}

/// Outcome of one tool execution.
///
/// `ok == false` always carries a `message` and never a `navigate_to`; build
/// results through [`ToolResult::success`] and [`ToolResult::failure`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigate_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_event: Option<String>,
}

impl ToolResult {
    pub fn success() -> Self {
        Self {
            ok: true,
            data: None,
            message: None,
            navigate_to: None,
            action: None,
            page: None,
            client_event: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: Some(message.into()),
            ..Self::success()
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Ignored on failed results.
    pub fn with_navigate_to(mut self, route: impl Into<String>) -> Self {
        if self.ok {
            self.navigate_to = Some(route.into());
        }
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        self
    }

    pub fn with_client_event(mut self, event: impl Into<String>) -> Self {
        self.client_event = Some(event.into());
        self
    }

    /// One-line human-readable summary for the generation context.
    pub fn summary(&self) -> String {
        let mut parts = vec![if self.ok { "ok".to_string() } else { "failed".to_string() }];
        if let Some(m) = &self.message {
            parts.push(m.clone());
        }
        if let Some(route) = &self.navigate_to {
            parts.push(format!("opened {}", route));
        }
        if let Some(data) = &self.data {
            let mut d = data.to_string();
            if d.len() > 300 {
                let cut = (0..=300).rev().find(|i| d.is_char_boundary(*i)).unwrap_or(0);
                d.truncate(cut);
                d.push_str("...");
            }
            parts.push(format!("data {}", d));
        }
        parts.join("; ")
    }
}

/// A tool result tagged with the tool that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutcome {
    pub tool: ToolName,
    pub result: ToolResult,
}

/// Executes validated tool calls against the injected collaborators.
#[derive(Clone)]
pub struct ToolRegistry {
    lists: Arc<dyn ListStore>,
    challenges: Arc<dyn ChallengeStore>,
    user_context: Arc<dyn UserContextSource>,
}

impl ToolRegistry {
    pub fn new(
        lists: Arc<dyn ListStore>,
        challenges: Arc<dyn ChallengeStore>,
        user_context: Arc<dyn UserContextSource>,
    ) -> Self {
        Self {
            lists,
            challenges,
            user_context,
        }
    }

    /// Validate, then execute. Validation failure degrades to `ok: false` without executing.
    pub async fn invoke(&self, user_id: &str, tool: ToolName, args: &Value) -> ToolOutcome {
        match ToolCall::validate(tool.as_str(), args) {
            Ok(call) => self.execute(user_id, &call).await,
            Err(e) => {
                warn!(target: "pagi::coach::tools", user_id = %user_id, error = %e, "tool validation failed");
                ToolOutcome {
                    tool,
                    result: ToolResult::failure(validation_message(&e)),
                }
            }
        }
    }

    pub async fn execute(&self, user_id: &str, call: &ToolCall) -> ToolOutcome {
        debug!(target: "pagi::coach::tools", user_id = %user_id, tool = %call.name(), "executing tool");
        let result = match call {
            ToolCall::Navigate { destination } => ToolResult::success()
                .with_message(format!("Opening your {}.", destination.label()))
                .with_navigate_to(destination.route())
                .with_page(destination.route())
                .with_data(json!({ "destination": destination.label() })),
            ToolCall::AddToShoppingList { item, quantity, unit } => {
                self.add_to_list(user_id, item, *quantity, unit.clone()).await
            }
            ToolCall::TodaysPlan => self.todays_plan(user_id).await,
            ToolCall::ProteinTarget => self.protein_target(user_id).await,
            ToolCall::DailyChallenge { date } => self.daily_challenge(user_id, *date).await,
            ToolCall::CompleteChallenge { date } => self.complete_challenge(user_id, *date).await,
            ToolCall::StartActivity { activity } => ToolResult::success()
                .with_message(format!("Starting your {}.", activity.slug().replace('_', " ")))
                .with_action("start")
                .with_page(activity.page())
                .with_navigate_to(activity.page())
                .with_client_event(format!("start_{}", activity.slug())),
        };
        ToolOutcome {
            tool: call.name(),
            result,
        }
    }

    async fn add_to_list(&self, user_id: &str, item: &str, quantity: Option<f64>, unit: Option<String>) -> ToolResult {
        let entry = ShoppingListItem::new(item, quantity, unit);
        match self.lists.append(user_id, &entry).await {
            Ok(()) => ToolResult::success()
                .with_message(format!("Added {} to your shopping list.", entry.describe()))
                .with_action("list_add")
                .with_page(Destination::ShoppingList.route())
                .with_client_event("shopping_list_updated")
                .with_data(json!({
                    "item": entry.item,
                    "quantity": entry.quantity,
                    "unit": entry.unit,
                })),
            Err(e) => {
                warn!(target: "pagi::coach::tools", user_id = %user_id, error = %e, "shopping list store unavailable");
                ToolResult::failure(format!(
                    "I couldn't reach your shopping list just now, so {} wasn't added.",
                    entry.describe()
                ))
            }
        }
    }

    async fn todays_plan(&self, user_id: &str) -> ToolResult {
        let ctx = fetch_or_empty(self.user_context.as_ref(), user_id).await;
        let meals = ctx
            .get("todaysPlan")
            .or_else(|| ctx.get("meals"))
            .filter(|v| v.is_array())
            .cloned()
            .unwrap_or_else(|| json!([]));
        ToolResult::success().with_data(json!({ "meals": meals }))
    }

    async fn protein_target(&self, user_id: &str) -> ToolResult {
        let ctx = fetch_or_empty(self.user_context.as_ref(), user_id).await;
        let (min, max, source) = protein_range_from_context(&ctx);
        ToolResult::success().with_data(json!({
            "minGrams": min,
            "maxGrams": max,
            "source": source,
        }))
    }

    async fn daily_challenge(&self, user_id: &str, date: NaiveDate) -> ToolResult {
        let challenge = match self.challenges.challenge(user_id, date).await {
            Ok(c) => c,
            Err(e) => {
                warn!(target: "pagi::coach::tools", user_id = %user_id, error = %e, "challenge store unavailable");
                DailyChallenge::default_for(date)
            }
        };
        ToolResult::success()
            .with_page(Destination::Challenges.route())
            .with_data(serde_json::to_value(&challenge).unwrap_or(Value::Null))
    }

    async fn complete_challenge(&self, user_id: &str, date: NaiveDate) -> ToolResult {
        match self.challenges.mark_complete(user_id, date).await {
            Ok(c) => ToolResult::success()
                .with_message(format!("Marked \"{}\" complete for {}.", c.title, c.date))
                .with_action("challenge_complete")
                .with_page(Destination::Challenges.route())
                .with_client_event("challenge_completed")
                .with_data(serde_json::to_value(&c).unwrap_or(Value::Null)),
            Err(e) => {
                warn!(target: "pagi::coach::tools", user_id = %user_id, error = %e, "challenge store unavailable");
                ToolResult::failure(format!(
                    "I couldn't mark the challenge for {} complete right now.",
                    date_key(date)
                ))
            }
        }
    }
}

fn validation_message(e: &ToolValidationError) -> String {
    match e {
        ToolValidationError::UnknownTool(_) => "I can't do that from here yet.".to_string(),
        ToolValidationError::MissingArgument { tool: ToolName::Navigate, .. }
        | ToolValidationError::InvalidArgument { tool: ToolName::Navigate, .. } => {
            "I'm not sure which page you meant.".to_string()
        }
        ToolValidationError::MissingArgument { tool: ToolName::AddToShoppingList, .. }
        | ToolValidationError::InvalidArgument { tool: ToolName::AddToShoppingList, .. } => {
            "I didn't catch what to add to your shopping list.".to_string()
        }
        other => format!("That request didn't look right ({}).", other),
    }
}

/// Protein range from user context: an explicit target, else 1.6-2.2 g/kg body weight, else the default.
fn protein_range_from_context(ctx: &Value) -> (u32, u32, &'static str) {
    if let Some(target) = ctx.get("proteinTarget") {
        if let (Some(min), Some(max)) = (
            target.get("min").and_then(Value::as_f64),
            target.get("max").and_then(Value::as_f64),
        ) {
            if min > 0.0 && max >= min {
                return (min.round() as u32, max.round() as u32, "profile");
            }
        }
        if let Some(g) = target.as_f64().filter(|g| *g > 0.0) {
            return (g.round() as u32, g.round() as u32, "profile");
        }
    }
    if let Some(kg) = ctx.get("weightKg").and_then(Value::as_f64).filter(|kg| *kg > 0.0) {
        return ((kg * 1.6).round() as u32, (kg * 2.2).round() as u32, "body_weight");
    }
    (DEFAULT_PROTEIN_RANGE.0, DEFAULT_PROTEIN_RANGE.1, "default")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{SledCoachStore, StoreError};
    use crate::user_context::{StaticUserContext, UserContextError};
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl ListStore for BrokenStore {
        async fn append(&self, _user_id: &str, _item: &ShoppingListItem) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("list service down".into()))
        }
        async fn items(&self, _user_id: &str) -> Result<Vec<ShoppingListItem>, StoreError> {
            Err(StoreError::Unavailable("list service down".into()))
        }
    }

    #[async_trait]
    impl ChallengeStore for BrokenStore {
        async fn challenge(&self, _user_id: &str, _date: NaiveDate) -> Result<DailyChallenge, StoreError> {
            Err(StoreError::Unavailable("challenge service down".into()))
        }
        async fn mark_complete(&self, _user_id: &str, _date: NaiveDate) -> Result<DailyChallenge, StoreError> {
            Err(StoreError::Unavailable("challenge service down".into()))
        }
    }

    struct ContextDown;

    #[async_trait]
    impl UserContextSource for ContextDown {
        async fn fetch(&self, _user_id: &str) -> Result<Value, UserContextError> {
            Err(UserContextError::Status(500))
        }
    }

    fn registry(ctx: Value) -> (ToolRegistry, Arc<SledCoachStore>) {
        let store = Arc::new(SledCoachStore::temporary().expect("store"));
        let reg = ToolRegistry::new(store.clone(), store.clone(), Arc::new(StaticUserContext::new(ctx)));
        (reg, store)
    }

    fn broken_registry() -> ToolRegistry {
        ToolRegistry::new(Arc::new(BrokenStore), Arc::new(BrokenStore), Arc::new(ContextDown))
    }

    #[test]
    fn validation_rejects_missing_and_malformed_arguments() {
        assert_eq!(
            ToolCall::validate("navigate", &json!({})),
            Err(ToolValidationError::MissingArgument { tool: ToolName::Navigate, field: "destination" })
        );
        assert!(matches!(
            ToolCall::validate("navigate", &json!({ "destination": 42 })),
            Err(ToolValidationError::InvalidArgument { field: "destination", .. })
        ));
        assert!(matches!(
            ToolCall::validate("add_to_shopping_list", &json!({ "item": "  " })),
            Err(ToolValidationError::MissingArgument { field: "item", .. })
        ));
        assert!(matches!(
            ToolCall::validate("add_to_shopping_list", &json!({ "item": "eggs", "quantity": -1 })),
            Err(ToolValidationError::InvalidArgument { field: "quantity", .. })
        ));
        assert!(matches!(
            ToolCall::validate("complete_challenge", &json!({ "date": "yesterday" })),
            Err(ToolValidationError::InvalidArgument { field: "date", .. })
        ));
        assert_eq!(
            ToolCall::validate("launch_rocket", &json!({})),
            Err(ToolValidationError::UnknownTool("launch_rocket".into()))
        );
    }

    #[test]
    fn validation_builds_typed_calls() {
        assert_eq!(
            ToolCall::validate("navigate", &json!({ "destination": "shopping list" })),
            Ok(ToolCall::Navigate { destination: Destination::ShoppingList })
        );
        assert_eq!(
            ToolCall::validate("add_to_shopping_list", &json!({ "item": "chicken", "quantity": 2, "unit": "lbs" })),
            Ok(ToolCall::AddToShoppingList {
                item: "chicken".into(),
                quantity: Some(2.0),
                unit: Some("lbs".into())
            })
        );
        for name in ToolName::ALL {
            assert_eq!(ToolName::from_name(name.as_str()), Some(name));
        }
    }

    #[tokio::test]
    async fn invalid_call_degrades_without_executing() {
        let (reg, store) = registry(json!({}));
        let out = reg.invoke("u1", ToolName::AddToShoppingList, &json!({ "quantity": 2 })).await;
        assert!(!out.result.ok);
        assert!(out.result.message.is_some());
        assert!(out.result.navigate_to.is_none());
        assert!(store.items("u1").await.expect("items").is_empty());
    }

    #[tokio::test]
    async fn navigate_only_signals() {
        let (reg, _) = registry(json!({}));
        let out = reg
            .execute("u1", &ToolCall::Navigate { destination: Destination::Progress })
            .await;
        assert!(out.result.ok);
        assert_eq!(out.result.navigate_to.as_deref(), Some("/progress"));
        assert_eq!(out.tool, ToolName::Navigate);
    }

    #[tokio::test]
    async fn add_to_list_persists_item() {
        let (reg, store) = registry(json!({}));
        let out = reg
            .invoke("u1", ToolName::AddToShoppingList, &json!({ "item": "chicken", "quantity": 2, "unit": "lbs" }))
            .await;
        assert!(out.result.ok);
        assert_eq!(out.result.message.as_deref(), Some("Added 2 lbs chicken to your shopping list."));
        assert_eq!(out.result.client_event.as_deref(), Some("shopping_list_updated"));
        let items = store.items("u1").await.expect("items");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit.as_deref(), Some("lbs"));
    }

    #[tokio::test]
    async fn collaborator_failures_return_best_effort_defaults() {
        let reg = broken_registry();

        let add = reg
            .execute("u1", &ToolCall::AddToShoppingList { item: "oats".into(), quantity: None, unit: None })
            .await;
        assert!(!add.result.ok);
        assert!(add.result.message.is_some());
        assert!(add.result.navigate_to.is_none());

        let plan = reg.execute("u1", &ToolCall::TodaysPlan).await;
        assert!(plan.result.ok);
        assert_eq!(plan.result.data, Some(json!({ "meals": [] })));

        let protein = reg.execute("u1", &ToolCall::ProteinTarget).await;
        assert_eq!(
            protein.result.data,
            Some(json!({ "minGrams": 100, "maxGrams": 150, "source": "default" }))
        );

        let date = NaiveDate::from_ymd_opt(2026, 1, 5).expect("date");
        let challenge = reg.execute("u1", &ToolCall::DailyChallenge { date }).await;
        assert!(challenge.result.ok);
        assert_eq!(challenge.result.data.as_ref().and_then(|d| d.get("date")), Some(&json!("2026-01-05")));

        let complete = reg.execute("u1", &ToolCall::CompleteChallenge { date }).await;
        assert!(!complete.result.ok);
        assert!(complete.result.navigate_to.is_none());
    }

    #[tokio::test]
    async fn protein_target_uses_context() {
        let (reg, _) = registry(json!({ "weightKg": 80 }));
        let out = reg.execute("u1", &ToolCall::ProteinTarget).await;
        assert_eq!(
            out.result.data,
            Some(json!({ "minGrams": 128, "maxGrams": 176, "source": "body_weight" }))
        );

        let (reg, _) = registry(json!({ "proteinTarget": { "min": 120, "max": 140 } }));
        let out = reg.execute("u1", &ToolCall::ProteinTarget).await;
        assert_eq!(out.result.data.as_ref().and_then(|d| d.get("source")), Some(&json!("profile")));
    }

    #[tokio::test]
    async fn todays_plan_reads_context_meals() {
        let (reg, _) = registry(json!({ "todaysPlan": [{ "name": "Overnight oats" }] }));
        let out = reg.execute("u1", &ToolCall::TodaysPlan).await;
        assert_eq!(out.result.data, Some(json!({ "meals": [{ "name": "Overnight oats" }] })));
    }

    #[tokio::test]
    async fn non_object_context_is_treated_as_empty() {
        let (reg, _) = registry(json!([{ "todaysPlan": ["ignored"] }]));
        let plan = reg.execute("u1", &ToolCall::TodaysPlan).await;
        assert_eq!(plan.result.data, Some(json!({ "meals": [] })));

        let (reg, _) = registry(json!(82));
        let protein = reg.execute("u1", &ToolCall::ProteinTarget).await;
        assert_eq!(
            protein.result.data,
            Some(json!({ "minGrams": 100, "maxGrams": 150, "source": "default" }))
        );
    }

    #[test]
    fn failure_never_carries_navigation() {
        let r = ToolResult::failure("nope").with_navigate_to("/x");
        assert!(!r.ok);
        assert!(r.navigate_to.is_none());
        assert_eq!(r.message.as_deref(), Some("nope"));
    }
}
