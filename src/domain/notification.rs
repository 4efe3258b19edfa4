use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Owner value used by producers that could not resolve who the alert is for.
pub const UNKNOWN_OWNER: &str = "UNKNOWN";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub municipality_id: String,
    pub namespace: String,
    pub errand_id: Uuid,
    pub owner_id: Option<String>,
    pub created_by: Option<String>,
    pub notification_type: String,
    pub description: String,
    pub content: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires: Option<OffsetDateTime>,
    pub acknowledged: bool,
    pub global_acknowledged: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Notification {
    /// True when the owner is missing, blank, or the `UNKNOWN` sentinel.
    pub fn has_unknown_owner(&self) -> bool {
        match self.owner_id.as_deref().map(str::trim) {
            None => true,
            Some(owner) => owner.is_empty() || owner.eq_ignore_ascii_case(UNKNOWN_OWNER),
        }
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires.is_some_and(|expires| expires < now)
    }

    /// Retention rule: expired, globally acknowledged, and either
    /// acknowledged by its owner or without an identifiable owner.
    pub fn is_removable_at(&self, now: OffsetDateTime) -> bool {
        self.is_expired_at(now)
            && self.global_acknowledged
            && (self.acknowledged || self.has_unknown_owner())
    }
}
