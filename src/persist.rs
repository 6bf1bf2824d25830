use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::ai::ChatMessage;
use crate::models::JobApplication;
use crate::store::ContextStore;

pub const RESUME_FILE: &str = "resume.md";
pub const JOB_APPLICATIONS_FILE: &str = "job_applications.json";
pub const SNAPSHOT_FILE: &str = "captain.json";
pub const CONVERSATION_FILE: &str = "conversation.json";

/// Flat-file persistence rooted at a data directory.
///
/// Every save rewrites each file wholesale. There is no temp-file rename,
/// so a failed write can leave disk and memory out of step.
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create data directory: {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn resume_path(&self) -> PathBuf {
        self.root.join(RESUME_FILE)
    }

    pub fn applications_path(&self) -> PathBuf {
        self.root.join(JOB_APPLICATIONS_FILE)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.root.join(SNAPSHOT_FILE)
    }

    pub fn conversation_path(&self) -> PathBuf {
        self.root.join(CONVERSATION_FILE)
    }

    pub fn save_state(&self, store: &ContextStore) -> Result<()> {
        self.save_resume(store)?;
        self.save_job_applications(store)?;
        self.save_snapshot(store)?;
        info!(dir = %self.root.display(), "state saved");
        Ok(())
    }

    /// Loads the full snapshot when present, otherwise whatever flat files
    /// exist. Nothing on disk yields an empty store.
    pub fn load_state(&self) -> Result<ContextStore> {
        let snapshot = self.snapshot_path();
        if snapshot.exists() {
            let json = fs::read_to_string(&snapshot)
                .with_context(|| format!("Failed to read {}", snapshot.display()))?;
            let store = ContextStore::from_json(&json)
                .with_context(|| format!("Failed to parse {}", snapshot.display()))?;
            debug!(
                applications = store.application_count(),
                "loaded state snapshot"
            );
            return Ok(store);
        }

        let mut store = ContextStore::new();
        let applications = self.load_job_applications()?;
        let resume = self.load_resume()?;
        store.replace_contents(applications, resume);
        debug!(
            applications = store.application_count(),
            "loaded state from flat files"
        );
        Ok(store)
    }

    pub fn save_resume(&self, store: &ContextStore) -> Result<()> {
        let path = self.resume_path();
        fs::write(&path, store.resume_content())
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn load_resume(&self) -> Result<Option<String>> {
        let path = self.resume_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(content))
    }

    pub fn save_job_applications(&self, store: &ContextStore) -> Result<()> {
        let path = self.applications_path();
        let json = serde_json::to_string_pretty(store.list_applications())?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn load_job_applications(&self) -> Result<BTreeMap<String, JobApplication>> {
        let path = self.applications_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Chat memory lives apart from the store so it can be reset alone.
    pub fn save_conversation(&self, memory: &[ChatMessage]) -> Result<()> {
        let path = self.conversation_path();
        let json = serde_json::to_string_pretty(memory)?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn load_conversation(&self) -> Result<Vec<ChatMessage>> {
        let path = self.conversation_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn clear_conversation(&self) -> Result<()> {
        let path = self.conversation_path();
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }

    fn save_snapshot(&self, store: &ContextStore) -> Result<()> {
        let path = self.snapshot_path();
        fs::write(&path, store.to_json()?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Fields;

    fn fields(pairs: &[(&str, &str)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn sample_store() -> ContextStore {
        let mut store = ContextStore::new();
        store
            .add_application(
                "acme",
                fields(&[("company", "Acme"), ("position", "SRE"), ("status", "Applied")]),
            )
            .unwrap();
        store
            .add_application("globex", fields(&[("company", "Globex"), ("notes", "ünïcode ✓")]))
            .unwrap();
        store.set_resume("# Resume\n\n- line one\n- line two\n");
        store
    }

    #[test]
    fn test_load_from_empty_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let data = DataDir::open(tmp.path()).unwrap();
        let store = data.load_state().unwrap();
        assert_eq!(store.application_count(), 0);
        assert_eq!(store.resume_content(), "");
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let data = DataDir::open(tmp.path().join("nested")).unwrap();
        let store = sample_store();

        data.save_state(&store).unwrap();
        assert!(data.resume_path().exists());
        assert!(data.applications_path().exists());

        let loaded = data.load_state().unwrap();
        assert_eq!(loaded.list_applications(), store.list_applications());
        assert_eq!(loaded.resume_content(), store.resume_content());
        assert_eq!(loaded.get_resume().version, 1);
        assert_eq!(loaded.history().len(), store.history().len());
    }

    #[test]
    fn test_flat_files_alone_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let data = DataDir::open(tmp.path()).unwrap();
        let store = sample_store();

        data.save_state(&store).unwrap();
        fs::remove_file(data.snapshot_path()).unwrap();

        let loaded = data.load_state().unwrap();
        assert_eq!(loaded.list_applications(), store.list_applications());
        assert_eq!(loaded.resume_content(), store.resume_content());
    }

    #[test]
    fn test_resume_file_is_plain_text() {
        let tmp = tempfile::tempdir().unwrap();
        let data = DataDir::open(tmp.path()).unwrap();
        data.save_state(&sample_store()).unwrap();

        let raw = fs::read_to_string(data.resume_path()).unwrap();
        assert!(raw.starts_with("# Resume"));
    }

    #[test]
    fn test_conversation_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let data = DataDir::open(tmp.path()).unwrap();
        assert!(data.load_conversation().unwrap().is_empty());

        let memory = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
        data.save_conversation(&memory).unwrap();
        assert_eq!(data.load_conversation().unwrap(), memory);

        data.clear_conversation().unwrap();
        assert!(data.load_conversation().unwrap().is_empty());
        data.clear_conversation().unwrap();
    }

    #[test]
    fn test_corrupt_applications_file_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let data = DataDir::open(tmp.path()).unwrap();
        fs::write(data.applications_path(), "{ not json").unwrap();

        let err = data.load_state().unwrap_err();
        assert!(format!("{:#}", err).contains(JOB_APPLICATIONS_FILE));
    }
}
