use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datetime::wire_date_serde;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "urgent" => Ok(Priority::Urgent),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(anyhow::anyhow!("invalid priority: {other}")),
        }
    }
}

/// Unrecognized wire values collapse to `Unknown`, matching how stored
/// profiles with stale profession strings are tolerated on load.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Profession {
    Developer,
    Designer,
    Manager,
    Qa,
    #[serde(other)]
    #[default]
    Unknown,
}

impl Profession {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profession::Developer => "developer",
            Profession::Designer => "designer",
            Profession::Manager => "manager",
            Profession::Qa => "qa",
            Profession::Unknown => "unknown",
        }
    }
}

impl std::str::FromStr for Profession {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "developer" => Ok(Profession::Developer),
            "designer" => Ok(Profession::Designer),
            "manager" => Ok(Profession::Manager),
            "qa" => Ok(Profession::Qa),
            "unknown" => Ok(Profession::Unknown),
            other => Err(anyhow::anyhow!("invalid profession: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    #[default]
    Participant,
    Observer,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,

    pub name: String,

    pub email: String,

    #[serde(default)]
    pub profession: Profession,

    #[serde(default)]
    pub avatar: String,

    #[serde(default)]
    pub role: Role,

    #[serde(default)]
    pub telegram_id: Option<String>,

    #[serde(default)]
    pub telegram_username: Option<String>,

    #[serde(default)]
    pub telegram_chat_id: Option<String>,

    #[serde(default)]
    pub telegram_linked: bool,

    #[serde(with = "wire_date_serde")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "wire_date_serde")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, profession: Profession, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            profession,
            avatar: String::new(),
            role: Role::Owner,
            telegram_id: None,
            telegram_username: None,
            telegram_chat_id: None,
            telegram_linked: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    pub column_id: String,

    pub board_id: String,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub profession: Option<Profession>,

    #[serde(default)]
    pub labels: Vec<String>,

    #[serde(default)]
    pub assignee: Option<User>,

    #[serde(default, with = "wire_date_serde::option")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(with = "wire_date_serde")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "wire_date_serde")]
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub comments: u32,

    #[serde(default)]
    pub attachments: u32,

    #[serde(default)]
    pub references: Option<String>,
}

impl Task {
    pub fn new(
        title: String,
        board_id: String,
        column_id: String,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            description: None,
            column_id,
            board_id,
            priority,
            profession: None,
            labels: vec![],
            assignee: None,
            due_date: None,
            created_at: now,
            updated_at: now,
            comments: 0,
            attachments: 0,
            references: None,
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.due_date.map(|due| due < now).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,

    pub title: String,

    pub board_id: String,

    #[serde(default)]
    pub order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub members: Vec<User>,

    #[serde(default)]
    pub member_emails: Vec<String>,

    #[serde(with = "wire_date_serde")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "wire_date_serde")]
    pub updated_at: DateTime<Utc>,
}

impl Board {
    pub fn has_member(&self, email: &str) -> bool {
        self.member_emails.iter().any(|e| e == email)
    }
}
