//! Builds the unified project table from the baseline file and the record
//! store.

mod baseline;
mod cache;
mod merge;

use std::collections::HashSet;

pub use baseline::{load_baseline, sample_projects, Baseline, BaselineSource};
pub use cache::TtlCache;
pub use merge::{column_labels, merge, write_csv};

use crate::config::Config;
use crate::models::{Notice, Project};
use crate::store::StoreAdapter;

/// Unified table plus whatever went wrong while building it.
#[derive(Debug, Clone)]
pub struct UnifiedTable {
    pub projects: Vec<Project>,
    pub source: Option<BaselineSource>,
    pub notices: Vec<Notice>,
}

impl UnifiedTable {
    pub fn find(&self, name: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.name == name)
    }
}

pub struct Dataset {
    config: Config,
    cache: TtlCache<Baseline>,
}

impl Dataset {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            cache: TtlCache::new(config.cache_ttl()),
        }
    }

    fn baseline(&mut self) -> Result<Baseline, String> {
        if let Some(cached) = self.cache.get() {
            return Ok(cached.clone());
        }
        match load_baseline(&self.config) {
            Ok(baseline) => {
                self.cache.put(baseline.clone());
                Ok(baseline)
            }
            Err(e) => {
                tracing::error!("Error loading baseline: {}", e);
                Err(format!("Error loading data: {e}"))
            }
        }
    }

    /// Called after every successful write so the next load sees it.
    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    /// Never fails: read problems become notices and the table degrades.
    pub async fn load(&mut self, store: &StoreAdapter) -> UnifiedTable {
        let mut notices = Vec::new();

        let baseline = match self.baseline() {
            Ok(baseline) => baseline,
            Err(message) => {
                return UnifiedTable {
                    projects: Vec::new(),
                    source: None,
                    notices: vec![Notice::Error(message)],
                }
            }
        };
        if baseline.source == BaselineSource::Sample {
            notices.push(Notice::Warning(
                "No baseline data file found; showing sample projects".to_string(),
            ));
        }

        let (tombstones, tombstone_error) = store.removed_names().await;
        if let Some(error) = tombstone_error {
            // Without the tombstone set no row can be shown safely.
            notices.push(Notice::Error(error));
            return UnifiedTable {
                projects: Vec::new(),
                source: Some(baseline.source),
                notices,
            };
        }

        let user = store.user_projects().await;
        if let Some(error) = user.error {
            notices.push(Notice::Error(error));
        }
        let user: Vec<Project> = user.rows.into_iter().map(Project::from).collect();

        let projects = merge(&baseline.projects, user, &tombstones);
        tracing::debug!(
            "Unified table: {} rows ({} tombstoned names)",
            projects.len(),
            tombstones.len()
        );

        UnifiedTable {
            projects,
            source: Some(baseline.source),
            notices,
        }
    }

    /// Baseline names only, for the restore view.
    pub fn baseline_names(&mut self) -> HashSet<String> {
        self.baseline()
            .map(|b| b.projects.into_iter().map(|p| p.name).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::LocalStore;
    use crate::error::{AppError, Result};
    use crate::models::{NewQa, ProjectRecord, QaEntry, QaScope, SurveyAnswers, Tombstone};
    use crate::store::RecordStore;
    use async_trait::async_trait;

    /// Store whose project reads can be made to fail.
    struct UnreliableStore {
        tombstones_fail: bool,
        user_rows_fail: bool,
    }

    fn unavailable<T>() -> Result<T> {
        Err(AppError::StoreApi("service unavailable".to_string()))
    }

    #[async_trait]
    impl RecordStore for UnreliableStore {
        fn backend_name(&self) -> &'static str {
            "unreliable"
        }

        async fn user_projects(&self) -> Result<Vec<ProjectRecord>> {
            if self.user_rows_fail {
                return unavailable();
            }
            Ok(vec![ProjectRecord {
                project: "Cedar Wind".to_string(),
                state: Some("KS".to_string()),
                ..Default::default()
            }])
        }
        async fn find_user_project(&self, _name: &str) -> Result<Option<ProjectRecord>> {
            Ok(None)
        }
        async fn insert_user_project(&self, _record: &ProjectRecord) -> Result<()> {
            unavailable()
        }
        async fn update_survey(&self, _name: &str, _survey: &SurveyAnswers) -> Result<()> {
            unavailable()
        }
        async fn delete_user_project(&self, _name: &str) -> Result<()> {
            unavailable()
        }

        async fn tombstones(&self) -> Result<Vec<Tombstone>> {
            if self.tombstones_fail {
                return unavailable();
            }
            Ok(Vec::new())
        }
        async fn find_tombstone(&self, _name: &str) -> Result<Option<Tombstone>> {
            Ok(None)
        }
        async fn insert_tombstone(&self, _name: &str) -> Result<()> {
            unavailable()
        }
        async fn delete_tombstone(&self, _name: &str) -> Result<()> {
            unavailable()
        }
        async fn clear_tombstones(&self) -> Result<()> {
            unavailable()
        }

        async fn qa_entries(&self, _scope: QaScope) -> Result<Vec<QaEntry>> {
            Ok(Vec::new())
        }
        async fn insert_qa(&self, _qa: &NewQa) -> Result<QaEntry> {
            unavailable()
        }
        async fn update_qa(&self, _id: i64, _qa: &NewQa) -> Result<()> {
            unavailable()
        }
        async fn set_qa_removed(&self, _id: i64, _removed: bool) -> Result<()> {
            unavailable()
        }
        async fn delete_qa(&self, _id: i64) -> Result<()> {
            unavailable()
        }
    }

    fn unreliable(tombstones_fail: bool, user_rows_fail: bool) -> StoreAdapter {
        StoreAdapter::new(Box::new(UnreliableStore {
            tombstones_fail,
            user_rows_fail,
        }))
    }

    fn sample_dataset() -> (tempfile::TempDir, Dataset) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        (dir, Dataset::new(&config))
    }

    fn errors(table: &UnifiedTable) -> Vec<&str> {
        table
            .notices
            .iter()
            .filter_map(|n| match n {
                Notice::Error(m) => Some(m.as_str()),
                _ => None,
            })
            .collect()
    }

    async fn fixture() -> (tempfile::TempDir, Dataset, StoreAdapter) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            cache_ttl_ms: 60_000,
            ..Config::default()
        };
        let store = StoreAdapter::new(Box::new(LocalStore::open_in_memory().await.unwrap()));
        (dir, Dataset::new(&config), store)
    }

    #[tokio::test]
    async fn sample_baseline_plus_user_rows() {
        let (_dir, mut dataset, store) = fixture().await;
        let record = ProjectRecord {
            project: "Cedar Wind".to_string(),
            state: Some("KS".to_string()),
            ..Default::default()
        };
        store.add_user_project(&record).await;

        let table = dataset.load(&store).await;
        let names: Vec<_> = table.projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Sample Project 1", "Sample Project 2", "Cedar Wind"]);
        assert!(matches!(table.notices.as_slice(), [Notice::Warning(_)]));
    }

    #[tokio::test]
    async fn remove_and_restore_cycle() {
        let (_dir, mut dataset, store) = fixture().await;

        store.remove_project("Sample Project 1").await;
        let table = dataset.load(&store).await;
        assert!(table.find("Sample Project 1").is_none());

        store.restore_project("Sample Project 1").await;
        let table = dataset.load(&store).await;
        let restored = table.find("Sample Project 1").unwrap();
        assert_eq!(restored.state.as_deref(), Some("CA"));
        assert_eq!(restored, &sample_projects()[0]);
    }

    #[tokio::test]
    async fn cache_serves_until_invalidated() {
        let (dir, mut dataset, store) = fixture().await;
        assert_eq!(dataset.load(&store).await.source, Some(BaselineSource::Sample));

        std::fs::write(dir.path().join("projects.csv"), "Project,State\nOnly Row,NV\n").unwrap();
        assert_eq!(dataset.load(&store).await.projects.len(), 2);

        dataset.invalidate();
        let table = dataset.load(&store).await;
        assert_eq!(table.projects.len(), 1);
        assert!(table.notices.is_empty());
    }

    #[tokio::test]
    async fn tombstone_failure_hides_every_row() {
        let (_dir, mut dataset) = sample_dataset();
        let table = dataset.load(&unreliable(true, false)).await;

        assert!(table.projects.is_empty());
        assert_eq!(table.source, Some(BaselineSource::Sample));
        assert_eq!(errors(&table).len(), 1);
        assert!(errors(&table)[0].contains("service unavailable"));
    }

    #[tokio::test]
    async fn user_row_failure_keeps_baseline() {
        let (_dir, mut dataset) = sample_dataset();
        let table = dataset.load(&unreliable(false, true)).await;

        let names: Vec<_> = table.projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Sample Project 1", "Sample Project 2"]);
        assert_eq!(errors(&table).len(), 1);
        assert!(table.notices.iter().any(|n| matches!(n, Notice::Warning(_))));

        let healthy = dataset.load(&unreliable(false, false)).await;
        assert!(healthy.find("Cedar Wind").is_some());
        assert!(errors(&healthy).is_empty());
    }

    #[tokio::test]
    async fn corrupt_workbook_degrades_to_empty_table() {
        let (dir, mut dataset) = sample_dataset();
        std::fs::write(dir.path().join(&Config::default().baseline_workbook), "not a zip").unwrap();

        let table = dataset.load(&unreliable(false, false)).await;
        assert!(table.projects.is_empty());
        assert_eq!(table.source, None);
        assert_eq!(table.notices.len(), 1);
        assert!(errors(&table)[0].starts_with("Error loading data"));
        assert!(dataset.baseline_names().is_empty());
    }
}
