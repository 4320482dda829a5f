// Records stored in the users, tuits and messages tables

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::strong_types::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    Personal,
    Academic,
    Professional,
}

impl AccountType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::Personal => "PERSONAL",
            AccountType::Academic => "ACADEMIC",
            AccountType::Professional => "PROFESSIONAL",
        }
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PERSONAL" => Ok(AccountType::Personal),
            "ACADEMIC" => Ok(AccountType::Academic),
            "PROFESSIONAL" => Ok(AccountType::Professional),
            other => Err(format!("Unknown account type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MaritalStatus {
    Married,
    Single,
    Widowed,
}

impl MaritalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MaritalStatus::Married => "MARRIED",
            MaritalStatus::Single => "SINGLE",
            MaritalStatus::Widowed => "WIDOWED",
        }
    }
}

impl FromStr for MaritalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MARRIED" => Ok(MaritalStatus::Married),
            "SINGLE" => Ok(MaritalStatus::Single),
            "WIDOWED" => Ok(MaritalStatus::Widowed),
            other => Err(format!("Unknown marital status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

pub const DEFAULT_SALARY: f64 = 50000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: EntityId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub profile_photo: Option<String>,
    pub header_image: Option<String>,
    pub account_type: AccountType,
    pub marital_status: Option<MaritalStatus>,
    pub biography: Option<String>,
    pub date_of_birth: Option<DateTime<Utc>>,
    pub joined: DateTime<Utc>,
    pub location: Location,
    pub salary: f64,
}

/// Body of `POST /users`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_photo: Option<String>,
    pub header_image: Option<String>,
    pub account_type: Option<AccountType>,
    pub marital_status: Option<MaritalStatus>,
    pub biography: Option<String>,
    pub date_of_birth: Option<DateTime<Utc>>,
    pub location: Option<Location>,
    pub salary: Option<f64>,
}

impl NewUser {
    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("username", &self.username),
            ("password", &self.password),
            ("email", &self.email),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Body of `PUT /users/:uid`; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_photo: Option<String>,
    pub header_image: Option<String>,
    pub account_type: Option<AccountType>,
    pub marital_status: Option<MaritalStatus>,
    pub biography: Option<String>,
    pub date_of_birth: Option<DateTime<Utc>>,
    pub location: Option<Location>,
    pub salary: Option<f64>,
}

/// Denormalized engagement counters carried on every tuit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuitStats {
    pub replies: u64,
    pub retuits: u64,
    pub likes: u64,
    pub dislikes: u64,
}

/// New values for a subset of the stats fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsUpdate {
    pub likes: Option<u64>,
    pub dislikes: Option<u64>,
    pub replies: Option<u64>,
    pub retuits: Option<u64>,
}

impl StatsUpdate {
    pub fn zeroed() -> Self {
        Self {
            likes: Some(0),
            dislikes: Some(0),
            replies: Some(0),
            retuits: Some(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.likes.is_none()
            && self.dislikes.is_none()
            && self.replies.is_none()
            && self.retuits.is_none()
    }

    pub fn apply(&self, stats: &mut TuitStats) {
        if let Some(likes) = self.likes {
            stats.likes = likes;
        }
        if let Some(dislikes) = self.dislikes {
            stats.dislikes = dislikes;
        }
        if let Some(replies) = self.replies {
            stats.replies = replies;
        }
        if let Some(retuits) = self.retuits {
            stats.retuits = retuits;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tuit {
    pub id: EntityId,
    pub tuit: String,
    pub posted_by: EntityId,
    pub posted_on: DateTime<Utc>,
    pub stats: TuitStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTuit {
    pub tuit: String,
    pub posted_on: Option<DateTime<Utc>>,
}

impl NewTuit {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        if self.tuit.trim().is_empty() {
            vec!["tuit"]
        } else {
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TuitUpdate {
    pub tuit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: EntityId,
    pub from_user: EntityId,
    pub to_user: EntityId,
    pub message: String,
    pub sent_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub message: String,
}

impl NewMessage {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        if self.message.trim().is_empty() {
            vec!["message"]
        } else {
            Vec::new()
        }
    }
}

/// Selects messages by sender, recipient or both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageFilter {
    pub from_user: Option<EntityId>,
    pub to_user: Option<EntityId>,
}
