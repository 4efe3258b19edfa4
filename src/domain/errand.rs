use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Errand {
    pub id: Uuid,
    pub municipality_id: String,
    pub namespace: String,
    pub errand_number: String,
    pub title: String,
    pub description: Option<String>,
    pub case_type: String,
    pub status: String,
    pub priority: Priority,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

pub const DEFAULT_STATUS: &str = "NEW";

/// Builds `<ABBR>-<year>-<sequence>` where ABBR comes from the namespace.
pub fn format_errand_number(namespace: &str, year: i32, sequence: i64) -> String {
    let abbreviation: String = namespace
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase();
    let abbreviation = if abbreviation.is_empty() {
        "ERR".to_string()
    } else {
        abbreviation
    };
    format!("{}-{}-{:06}", abbreviation, year, sequence)
}
