use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub occupation: String,
    pub email: String,
    /// Never leaves the server: skipped on serialization, empty when deserialized.
    #[serde(skip)]
    pub pwd_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub amount: f64,
    pub category: String,
    pub date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /expenses`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub title: String,
    pub amount: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub date: Option<NaiveDate>,
}

/// Body of `PATCH /expenses/:id`. Absent fields are left untouched; an empty or
/// null `date` clears it.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct ExpenseChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_date_change",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<Option<NaiveDate>>,
}

impl ExpenseChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.amount.is_none() && self.category.is_none() && self.date.is_none()
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (only the calendar day is kept).
pub fn parse_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
}

fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_date(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

// Only called when the field is present, so `Some(None)` means "clear".
fn deserialize_date_change<'de, D>(deserializer: D) -> Result<Option<Option<NaiveDate>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_optional_date(deserializer).map(Some)
}

/// Fixed expense classification. Stored categories stay free strings; this enum
/// only drives presentation, with `Other` as the fallback for anything unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Food,
    Transport,
    Bills,
    Shopping,
    Entertainment,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Food,
        Category::Transport,
        Category::Bills,
        Category::Shopping,
        Category::Entertainment,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Transport => "Transport",
            Category::Bills => "Bills",
            Category::Shopping => "Shopping",
            Category::Entertainment => "Entertainment",
            Category::Other => "Other",
        }
    }

    /// Lenient lookup used for display.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or(Category::Other)
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Category::Food => "utensils",
            Category::Transport => "car",
            Category::Bills => "file-invoice",
            Category::Shopping => "shopping-bag",
            Category::Entertainment => "film",
            Category::Other => "question-circle",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Category::Food => "#22c55e",
            Category::Transport => "#38bdf8",
            Category::Bills => "#facc15",
            Category::Shopping => "#a78bfa",
            Category::Entertainment => "#fb7185",
            Category::Other => "#94a3b8",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_owned()))
    }
}
