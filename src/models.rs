use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const STATUS_NOT_STARTED: &str = "Not Started";
pub const STATUS_APPLIED: &str = "Applied";
pub const STATUS_INTERVIEW_SCHEDULED: &str = "Interview Scheduled";
pub const STATUS_OFFER_RECEIVED: &str = "Offer Received";
pub const STATUS_REJECTED: &str = "Rejected";

/// Statuses offered by the CLI. Nothing stops a caller from storing others.
pub const KNOWN_STATUSES: [&str; 5] = [
    STATUS_NOT_STARTED,
    STATUS_APPLIED,
    STATUS_INTERVIEW_SCHEDULED,
    STATUS_OFFER_RECEIVED,
    STATUS_REJECTED,
];

/// Status that counts as a successful outcome.
pub const SUCCESS_STATUS: &str = STATUS_OFFER_RECEIVED;

pub type Fields = BTreeMap<String, String>;

/// A job application is an untyped bag of string fields. The well-known
/// ones get accessors; anything else ("summary", "culture_notes", ...) is
/// carried along untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobApplication {
    fields: Fields,
}

impl JobApplication {
    pub fn new(fields: Fields) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Shallow merge: every field in `partial` overwrites ours.
    pub fn merge(&mut self, partial: Fields) {
        self.fields.extend(partial);
    }

    pub fn company(&self) -> &str {
        self.get("company").unwrap_or_default()
    }

    pub fn position(&self) -> &str {
        self.get("position").unwrap_or_default()
    }

    pub fn description(&self) -> &str {
        self.get("description").unwrap_or_default()
    }

    pub fn company_info(&self) -> &str {
        self.get("company_info").unwrap_or_default()
    }

    pub fn status(&self) -> &str {
        self.get("status").unwrap_or(STATUS_NOT_STARTED)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeVersion {
    pub version: u32,
    pub content: String,
    pub last_edited: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resume {
    pub content: String,
    pub version: u32,
    pub last_edited: DateTime<Utc>,
    #[serde(default)]
    pub ai_suggestions: Vec<String>,
    /// Superseded versions, oldest first.
    #[serde(default)]
    pub history: Vec<ResumeVersion>,
}

impl Default for Resume {
    fn default() -> Self {
        Self {
            content: String::new(),
            version: 0,
            last_edited: Utc::now(),
            ai_suggestions: Vec::new(),
            history: Vec::new(),
        }
    }
}

impl Resume {
    pub fn current_version(&self) -> ResumeVersion {
        ResumeVersion {
            version: self.version,
            content: self.content.clone(),
            last_edited: self.last_edited,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Add,
    Update,
    ResumeUpdate,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Action::Add => "add",
            Action::Update => "update",
            Action::ResumeUpdate => "resume_update",
        };
        f.write_str(tag)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl ActionLogEntry {
    pub fn now(action: Action, job_id: Option<&str>) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            job_id: job_id.map(str::to_string),
        }
    }
}

pub type GlobalInsights = BTreeMap<String, serde_json::Value>;
