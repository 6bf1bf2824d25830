use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::metrics;
use crate::models::{
    Action, ActionLogEntry, Fields, GlobalInsights, JobApplication, Resume, ResumeVersion,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Job application with ID {0} not found")]
    NotFound(String),
    #[error("Job application with ID {0} already exists")]
    AlreadyExists(String),
    #[error("Resume version {0} not found")]
    UnknownVersion(u32),
    #[error("Invalid store snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// In-memory state: applications, the master resume, the action log and
/// free-form insights. Single owner, no locking; last write wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextStore {
    #[serde(default)]
    job_applications: BTreeMap<String, JobApplication>,
    #[serde(default)]
    master_resume: Resume,
    #[serde(default)]
    global_insights: GlobalInsights,
    #[serde(default)]
    application_history: Vec<ActionLogEntry>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Job applications ---

    pub fn add_application(&mut self, key: &str, fields: Fields) -> StoreResult<()> {
        if self.job_applications.contains_key(key) {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        self.job_applications
            .insert(key.to_string(), JobApplication::new(fields));
        self.log(Action::Add, Some(key));
        debug!(job_id = key, "added job application");
        Ok(())
    }

    pub fn update_application(&mut self, key: &str, partial: Fields) -> StoreResult<()> {
        let app = self
            .job_applications
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        app.merge(partial);
        self.log(Action::Update, Some(key));
        debug!(job_id = key, "updated job application");
        Ok(())
    }

    pub fn get_application(&self, key: &str) -> Option<&JobApplication> {
        self.job_applications.get(key)
    }

    /// Like `get_application`, for callers that cannot proceed without it.
    pub fn require_application(&self, key: &str) -> StoreResult<&JobApplication> {
        self.get_application(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    pub fn list_applications(&self) -> &BTreeMap<String, JobApplication> {
        &self.job_applications
    }

    pub fn application_count(&self) -> usize {
        self.job_applications.len()
    }

    /// All applications as pretty JSON, the form prompts quote them in.
    pub fn applications_json(&self) -> String {
        serde_json::to_string_pretty(&self.job_applications).unwrap_or_else(|_| "{}".to_string())
    }

    // --- Resume ---

    pub fn set_resume(&mut self, content: &str) {
        let resume = &mut self.master_resume;
        if resume.version > 0 || !resume.content.is_empty() {
            resume.history.push(resume.current_version());
        }
        resume.content = content.to_string();
        resume.version += 1;
        resume.last_edited = Utc::now();
        let version = resume.version;
        self.log(Action::ResumeUpdate, None);
        debug!(version, "resume updated");
    }

    pub fn get_resume(&self) -> &Resume {
        &self.master_resume
    }

    pub fn resume_content(&self) -> &str {
        &self.master_resume.content
    }

    /// Every recorded version, oldest first, ending with the current one.
    pub fn resume_versions(&self) -> Vec<ResumeVersion> {
        let mut versions = self.master_resume.history.clone();
        versions.push(self.master_resume.current_version());
        versions
    }

    /// Restores the content of `version` as a new version.
    pub fn rollback_resume(&mut self, version: u32) -> StoreResult<u32> {
        let content = self
            .resume_versions()
            .into_iter()
            .find(|v| v.version == version)
            .map(|v| v.content)
            .ok_or(StoreError::UnknownVersion(version))?;
        self.set_resume(&content);
        Ok(self.master_resume.version)
    }

    pub fn add_resume_suggestion(&mut self, suggestion: &str) {
        self.master_resume
            .ai_suggestions
            .push(suggestion.to_string());
    }

    pub fn clear_resume_suggestions(&mut self) {
        self.master_resume.ai_suggestions.clear();
    }

    // --- Insights & history ---

    pub fn add_global_insight(&mut self, key: &str, value: serde_json::Value) {
        self.global_insights.insert(key.to_string(), value);
    }

    pub fn global_insight(&self, key: &str) -> Option<&serde_json::Value> {
        self.global_insights.get(key)
    }

    pub fn global_insights(&self) -> &GlobalInsights {
        &self.global_insights
    }

    pub fn history(&self) -> &[ActionLogEntry] {
        &self.application_history
    }

    pub fn success_rate(&self) -> f64 {
        metrics::success_rate(self.job_applications.values())
    }

    // --- Snapshot ---

    pub fn to_json(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> StoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Replaces applications and resume text wholesale, as when loading the
    /// plain flat files. The action log is left alone.
    pub(crate) fn replace_contents(
        &mut self,
        applications: BTreeMap<String, JobApplication>,
        resume: Option<String>,
    ) {
        self.job_applications = applications;
        if let Some(content) = resume {
            self.master_resume.content = content;
        }
    }

    fn log(&mut self, action: Action, job_id: Option<&str>) {
        self.application_history
            .push(ActionLogEntry::now(action, job_id));
    }
}
