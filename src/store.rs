//! Record store boundary.
//!
//! `RecordStore` is implemented by the hosted PostgREST client and by the
//! local SQLite fallback. Views never talk to a store directly: they go
//! through `StoreAdapter`, which turns every failure into a message.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{NewQa, Project, ProjectRecord, QaEntry, QaScope, SurveyAnswers, Tombstone};

/// Shape of the Q&A table. Only `SoftDelete` is supported at runtime;
/// stores on `Legacy` are migrated when opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QaSchema {
    Legacy,
    SoftDelete,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn user_projects(&self) -> Result<Vec<ProjectRecord>>;
    async fn find_user_project(&self, name: &str) -> Result<Option<ProjectRecord>>;
    async fn insert_user_project(&self, record: &ProjectRecord) -> Result<()>;
    async fn update_survey(&self, name: &str, survey: &SurveyAnswers) -> Result<()>;
    async fn delete_user_project(&self, name: &str) -> Result<()>;

    async fn tombstones(&self) -> Result<Vec<Tombstone>>;
    async fn find_tombstone(&self, name: &str) -> Result<Option<Tombstone>>;
    async fn insert_tombstone(&self, name: &str) -> Result<()>;
    async fn delete_tombstone(&self, name: &str) -> Result<()>;
    async fn clear_tombstones(&self) -> Result<()>;

    async fn qa_entries(&self, scope: QaScope) -> Result<Vec<QaEntry>>;
    async fn insert_qa(&self, qa: &NewQa) -> Result<QaEntry>;
    async fn update_qa(&self, id: i64, qa: &NewQa) -> Result<()>;
    async fn set_qa_removed(&self, id: i64, removed: bool) -> Result<()>;
    async fn delete_qa(&self, id: i64) -> Result<()>;
}

/// Result of a read through the adapter. On failure `rows` is empty and
/// `error` carries the message.
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub rows: Vec<T>,
    pub error: Option<String>,
}

impl<T> Fetched<T> {
    fn from_result(result: Result<Vec<T>>, what: &str) -> Self {
        match result {
            Ok(rows) => Self { rows, error: None },
            Err(e) => {
                tracing::error!("Error fetching {}: {}", what, e);
                Self {
                    rows: Vec::new(),
                    error: Some(format!("Error fetching {what}: {e}")),
                }
            }
        }
    }
}

/// Result of a write through the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub ok: bool,
    pub message: String,
}

impl WriteOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }

    fn from_result(result: Result<()>, success: String, action: &str) -> Self {
        match result {
            Ok(()) => Self::success(success),
            Err(e) => {
                tracing::error!("Error {}: {}", action, e);
                Self::failure(format!("Error {action}: {e}"))
            }
        }
    }
}

pub struct StoreAdapter {
    store: Box<dyn RecordStore>,
}

impl StoreAdapter {
    pub fn new(store: Box<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    // Projects

    pub async fn user_projects(&self) -> Fetched<ProjectRecord> {
        Fetched::from_result(self.store.user_projects().await, "user projects")
    }

    pub async fn removed_projects(&self) -> Fetched<Tombstone> {
        Fetched::from_result(self.store.tombstones().await, "removed projects")
    }

    pub async fn removed_names(&self) -> (HashSet<String>, Option<String>) {
        let fetched = self.removed_projects().await;
        let names = fetched.rows.into_iter().map(|t| t.project).collect();
        (names, fetched.error)
    }

    pub async fn add_user_project(&self, record: &ProjectRecord) -> WriteOutcome {
        let result = self.store.insert_user_project(record).await;
        WriteOutcome::from_result(
            result,
            format!("Project '{}' added", record.project),
            "adding project",
        )
    }

    /// Tombstones any project, baseline or user-added, so it can be restored.
    pub async fn remove_project(&self, name: &str) -> WriteOutcome {
        let result: Result<bool> = async {
            if self.store.find_tombstone(name).await?.is_some() {
                return Ok(false);
            }
            self.store.insert_tombstone(name).await?;
            Ok(true)
        }
        .await;

        match result {
            Ok(true) => WriteOutcome::success(format!(
                "Project '{name}' removed (can be restored later)"
            )),
            Ok(false) => WriteOutcome::failure("Project already removed"),
            Err(e) => {
                tracing::error!("Error removing project {}: {}", name, e);
                WriteOutcome::failure(format!("Error: {e}"))
            }
        }
    }

    pub async fn restore_project(&self, name: &str) -> WriteOutcome {
        let result = self.store.delete_tombstone(name).await;
        WriteOutcome::from_result(
            result,
            format!("Project '{name}' restored"),
            "restoring project",
        )
    }

    pub async fn restore_all_projects(&self) -> WriteOutcome {
        let result = self.store.clear_tombstones().await;
        WriteOutcome::from_result(
            result,
            "All projects restored".to_string(),
            "restoring all projects",
        )
    }

    /// Drops a user-added row and any tombstone for it.
    pub async fn delete_user_project(&self, name: &str) -> WriteOutcome {
        let result: Result<()> = async {
            self.store.delete_user_project(name).await?;
            self.store.delete_tombstone(name).await
        }
        .await;
        WriteOutcome::from_result(
            result,
            format!("Project '{name}' deleted permanently"),
            "deleting project",
        )
    }

    /// Updates the answers of a user-added row, or copies a baseline project
    /// into the store together with its answers.
    pub async fn save_survey(&self, project: &Project, survey: &SurveyAnswers) -> WriteOutcome {
        let result: Result<()> = async {
            if self.store.find_user_project(&project.name).await?.is_some() {
                self.store.update_survey(&project.name, survey).await
            } else {
                let mut record = ProjectRecord::from_project(project);
                record.survey = survey.clone();
                self.store.insert_user_project(&record).await
            }
        }
        .await;
        WriteOutcome::from_result(
            result,
            format!("Survey responses saved for '{}'", project.name),
            "saving survey",
        )
    }

    // Public hearing Q&A

    pub async fn qa(&self, scope: QaScope) -> Fetched<QaEntry> {
        let what = match scope {
            QaScope::Active => "active Q&A items",
            QaScope::Removed => "removed Q&A items",
            QaScope::All => "Q&A items",
        };
        Fetched::from_result(self.store.qa_entries(scope).await, what)
    }

    pub async fn add_qa(&self, qa: &NewQa) -> WriteOutcome {
        let result = self.store.insert_qa(qa).await.map(|_| ());
        WriteOutcome::from_result(result, "Q&A added".to_string(), "adding Q&A item")
    }

    pub async fn update_qa(&self, id: i64, qa: &NewQa) -> WriteOutcome {
        let result = self.store.update_qa(id, qa).await;
        WriteOutcome::from_result(result, "Q&A updated".to_string(), "updating Q&A item")
    }

    pub async fn remove_qa(&self, id: i64) -> WriteOutcome {
        let result = self.store.set_qa_removed(id, true).await;
        WriteOutcome::from_result(
            result,
            "Q&A removed (restore it from the removed view)".to_string(),
            "removing Q&A item",
        )
    }

    pub async fn restore_qa(&self, id: i64) -> WriteOutcome {
        let result = self.store.set_qa_removed(id, false).await;
        WriteOutcome::from_result(result, "Q&A restored".to_string(), "restoring Q&A item")
    }

    pub async fn delete_qa(&self, id: i64) -> WriteOutcome {
        let result = self.store.delete_qa(id).await;
        WriteOutcome::from_result(
            result,
            "Q&A permanently deleted".to_string(),
            "deleting Q&A item",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::LocalStore;
    use crate::models::{Origin, Sentiment};

    async fn adapter() -> StoreAdapter {
        let store = LocalStore::open_in_memory().await.unwrap();
        StoreAdapter::new(Box::new(store))
    }

    #[tokio::test]
    async fn duplicate_tombstone_is_rejected() {
        let adapter = adapter().await;

        let first = adapter.remove_project("Sample Project 1").await;
        assert!(first.ok, "{}", first.message);

        let second = adapter.remove_project("Sample Project 1").await;
        assert!(!second.ok);
        assert_eq!(second.message, "Project already removed");

        let (names, error) = adapter.removed_names().await;
        assert!(error.is_none());
        assert_eq!(names.len(), 1);
    }

    #[tokio::test]
    async fn restore_removes_exactly_one_name() {
        let adapter = adapter().await;
        adapter.remove_project("A").await;
        adapter.remove_project("B").await;

        assert!(adapter.restore_project("A").await.ok);
        let (names, _) = adapter.removed_names().await;
        assert_eq!(names, HashSet::from(["B".to_string()]));

        assert!(adapter.restore_all_projects().await.ok);
        let (names, _) = adapter.removed_names().await;
        assert!(names.is_empty());
    }

    #[tokio::test]
    async fn survey_on_baseline_project_copies_row() {
        let adapter = adapter().await;
        let mut project = Project::new("Sample Project 1", Origin::Baseline);
        project.state = Some("CA".to_string());
        project.sentiment = Sentiment::Good;

        let answers = SurveyAnswers::from_values(["Packed hearing"]);
        let outcome = adapter.save_survey(&project, &answers).await;
        assert!(outcome.ok, "{}", outcome.message);

        let rows = adapter.user_projects().await.rows;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].state.as_deref(), Some("CA"));
        assert_eq!(rows[0].survey.get(0), Some("Packed hearing"));

        // A second save updates in place instead of inserting again.
        let answers = SurveyAnswers::from_values(["Calmer second hearing"]);
        assert!(adapter.save_survey(&project, &answers).await.ok);
        let rows = adapter.user_projects().await.rows;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].survey.get(0), Some("Calmer second hearing"));
    }

    #[tokio::test]
    async fn delete_user_project_clears_tombstone() {
        let adapter = adapter().await;
        let record = ProjectRecord {
            project: "Ridge Storage".to_string(),
            ..Default::default()
        };
        assert!(adapter.add_user_project(&record).await.ok);
        adapter.remove_project("Ridge Storage").await;

        assert!(adapter.delete_user_project("Ridge Storage").await.ok);
        assert!(adapter.user_projects().await.rows.is_empty());
        assert!(adapter.removed_projects().await.rows.is_empty());
    }

    #[tokio::test]
    async fn qa_soft_delete_round_trip() {
        let adapter = adapter().await;
        let qa = NewQa {
            topic: "Health Concerns".to_string(),
            question: "Do panels leach chemicals?".to_string(),
            response: "Modern panels are sealed.".to_string(),
            sources: None,
        };
        assert!(adapter.add_qa(&qa).await.ok);
        let id = adapter.qa(QaScope::Active).await.rows[0].id;

        assert!(adapter.remove_qa(id).await.ok);
        assert!(adapter.qa(QaScope::Active).await.rows.is_empty());
        assert_eq!(adapter.qa(QaScope::Removed).await.rows.len(), 1);

        assert!(adapter.restore_qa(id).await.ok);
        assert_eq!(adapter.qa(QaScope::Active).await.rows.len(), 1);

        assert!(adapter.delete_qa(id).await.ok);
        assert!(adapter.qa(QaScope::All).await.rows.is_empty());
    }
}
