//! Tool-backed data stores: shopping list and daily challenges.
//!
//! Sled-backed, direct host filesystem. Keys:
//! - `list/{user}/{id:020}`: one shopping list item (JSON), ordered by insertion.
//! - `challenge/{user}/{YYYY-MM-DD}`: the user's challenge for that day (JSON).
//!
//! `{user}` is `{byte_len}:{user_id}`, so no user's prefix can cover another's
//! even when ids contain `/`.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

const COACH_DEFAULT_PATH: &str = "./data/coach";

/// Rotating default challenges, indexed by day of year.
const DAILY_CHALLENGES: &[&str] = &[
    "Drink eight glasses of water",
    "Take a ten minute walk after a meal",
    "Add a serving of vegetables to lunch",
    "Hit your protein target",
    "Get to bed 30 minutes earlier",
    "Try two minutes of slow breathing",
    "Prep tomorrow's breakfast tonight",
];

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("data store: {0}")]
    Sled(#[from] sled::Error),

    #[error("record encoding: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// One shopping list entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingListItem {
    pub item: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl ShoppingListItem {
    pub fn new(item: impl Into<String>, quantity: Option<f64>, unit: Option<String>) -> Self {
        Self {
            item: item.into(),
            quantity,
            unit,
            added_at: Utc::now(),
        }
    }

    /// "2 lbs chicken", "3 eggs", "spinach".
    pub fn describe(&self) -> String {
        let qty = self.quantity.map(|q| {
            if q.fract() == 0.0 {
                format!("{}", q as i64)
            } else {
                format!("{}", q)
            }
        });
        [qty, self.unit.clone(), Some(self.item.clone())]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A user's challenge for one date key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyChallenge {
    pub date: String,
    pub title: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl DailyChallenge {
    /// The rotating challenge for `date` when nothing has been stored yet.
    pub fn default_for(date: NaiveDate) -> Self {
        let idx = date.ordinal0() as usize % DAILY_CHALLENGES.len();
        Self {
            date: date_key(date),
            title: DAILY_CHALLENGES[idx].to_string(),
            completed: false,
            completed_at: None,
        }
    }
}

/// `YYYY-MM-DD` date key used by the challenge store.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// List-storage collaborator.
#[async_trait]
pub trait ListStore: Send + Sync {
    /// Persist a new item at the end of the user's list.
    async fn append(&self, user_id: &str, item: &ShoppingListItem) -> Result<(), StoreError>;

    /// All items in insertion order.
    async fn items(&self, user_id: &str) -> Result<Vec<ShoppingListItem>, StoreError>;
}

/// Daily-challenge collaborator.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    async fn challenge(&self, user_id: &str, date: NaiveDate) -> Result<DailyChallenge, StoreError>;

    async fn mark_complete(&self, user_id: &str, date: NaiveDate) -> Result<DailyChallenge, StoreError>;
}

/// Sled-backed store for shopping lists and daily challenges.
#[derive(Clone)]
pub struct SledCoachStore {
    db: sled::Db,
}

impl SledCoachStore {
    /// Open the store at the given path (default `./data/coach`).
    pub fn open(path: Option<impl AsRef<Path>>) -> Result<Self, StoreError> {
        let p = path
            .map(|x| x.as_ref().to_path_buf())
            .unwrap_or_else(|| Path::new(COACH_DEFAULT_PATH).to_path_buf());
        let db = sled::open(p)?;
        Ok(Self { db })
    }

    /// In-memory store that is discarded on drop.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    fn user_segment(user_id: &str) -> String {
        format!("{}:{}", user_id.len(), user_id)
    }

    fn list_prefix(user_id: &str) -> String {
        format!("list/{}/", Self::user_segment(user_id))
    }

    fn challenge_key(user_id: &str, date: NaiveDate) -> String {
        format!("challenge/{}/{}", Self::user_segment(user_id), date_key(date))
    }

    fn load_challenge(&self, user_id: &str, date: NaiveDate) -> Result<DailyChallenge, StoreError> {
        match self.db.get(Self::challenge_key(user_id, date).as_bytes())? {
            Some(raw) => Ok(serde_json::from_slice(&raw)?),
            None => Ok(DailyChallenge::default_for(date)),
        }
    }
}

#[async_trait]
impl ListStore for SledCoachStore {
    async fn append(&self, user_id: &str, item: &ShoppingListItem) -> Result<(), StoreError> {
        let id = self.db.generate_id()?;
        let key = format!("{}{:020}", Self::list_prefix(user_id), id);
        let value = serde_json::to_vec(item)?;
        self.db.insert(key.as_bytes(), value)?;
        self.db.flush()?;
        Ok(())
    }

    async fn items(&self, user_id: &str) -> Result<Vec<ShoppingListItem>, StoreError> {
        let mut out = Vec::new();
        for entry in self.db.scan_prefix(Self::list_prefix(user_id).as_bytes()) {
            let (_, v) = entry?;
            out.push(serde_json::from_slice(&v)?);
        }
        Ok(out)
    }
}

#[async_trait]
impl ChallengeStore for SledCoachStore {
    async fn challenge(&self, user_id: &str, date: NaiveDate) -> Result<DailyChallenge, StoreError> {
        self.load_challenge(user_id, date)
    }

    async fn mark_complete(&self, user_id: &str, date: NaiveDate) -> Result<DailyChallenge, StoreError> {
        let mut challenge = self.load_challenge(user_id, date)?;
        if !challenge.completed {
            challenge.completed = true;
            challenge.completed_at = Some(Utc::now());
            let value = serde_json::to_vec(&challenge)?;
            self.db
                .insert(Self::challenge_key(user_id, date).as_bytes(), value)?;
            self.db.flush()?;
        }
        Ok(challenge)
    }
}
