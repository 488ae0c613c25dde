use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{NewQa, ProjectRecord, QaEntry, QaScope, SurveyAnswers, Tombstone};
use crate::store::{QaSchema, RecordStore};

use super::schema::{QA_SOFT_DELETE_MIGRATION, SCHEMA};

const PROJECT_COLUMNS: &str = "id, project, state, county, type, status, latitude, longitude, \
     system_size_mw_ac, system_size_mw_dc, sentiment, sentiment_detail, mentions_of_moratoria, \
     recent_projects, survey_q1, survey_q2, survey_q3, survey_q4, survey_q5, survey_q6, \
     survey_q7, survey_q8";

const QA_COLUMNS: &str = "id, topic, question, response, sources, is_removed";

/// SQLite-backed record store used when no hosted credentials are configured.
pub struct LocalStore {
    conn: Connection,
}

impl LocalStore {
    pub async fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    #[allow(dead_code)]
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        let store = Self { conn };
        if store.qa_schema().await? == QaSchema::Legacy {
            tracing::info!("Migrating public_hearing_qa to soft-delete schema");
            store
                .conn
                .call(|conn| {
                    conn.execute(QA_SOFT_DELETE_MIGRATION, [])?;
                    Ok(())
                })
                .await?;
        }
        Ok(store)
    }

    pub async fn qa_schema(&self) -> Result<QaSchema> {
        let has_flag = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("PRAGMA table_info(public_hearing_qa)")?;
                let columns = stmt
                    .query_map([], |row| row.get::<_, String>(1))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(columns.iter().any(|c| c == "is_removed"))
            })
            .await?;
        Ok(if has_flag {
            QaSchema::SoftDelete
        } else {
            QaSchema::Legacy
        })
    }
}

#[async_trait]
impl RecordStore for LocalStore {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    // Project operations

    async fn user_projects(&self) -> Result<Vec<ProjectRecord>> {
        let records = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {PROJECT_COLUMNS} FROM user_added_projects ORDER BY created_at DESC, id DESC"
                ))?;
                let records = stmt
                    .query_map([], record_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await?;
        Ok(records)
    }

    async fn find_user_project(&self, name: &str) -> Result<Option<ProjectRecord>> {
        let name = name.to_string();
        let record = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {PROJECT_COLUMNS} FROM user_added_projects WHERE project = ?1 LIMIT 1"
                ))?;
                let record = stmt.query_row(params![name], record_from_row).optional()?;
                Ok(record)
            })
            .await?;
        Ok(record)
    }

    async fn insert_user_project(&self, record: &ProjectRecord) -> Result<()> {
        let r = record.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO user_added_projects (project, state, county, type, status,
                           latitude, longitude, system_size_mw_ac, system_size_mw_dc, sentiment,
                           sentiment_detail, mentions_of_moratoria, recent_projects,
                           survey_q1, survey_q2, survey_q3, survey_q4, survey_q5, survey_q6,
                           survey_q7, survey_q8)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                               ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)"#,
                    params![
                        r.project,
                        r.state,
                        r.county,
                        r.facility_type,
                        r.status,
                        r.latitude,
                        r.longitude,
                        r.system_size_mw_ac,
                        r.system_size_mw_dc,
                        r.sentiment,
                        r.sentiment_detail,
                        r.mentions_of_moratoria,
                        r.recent_projects,
                        r.survey.survey_q1,
                        r.survey.survey_q2,
                        r.survey.survey_q3,
                        r.survey.survey_q4,
                        r.survey.survey_q5,
                        r.survey.survey_q6,
                        r.survey.survey_q7,
                        r.survey.survey_q8,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn update_survey(&self, name: &str, survey: &SurveyAnswers) -> Result<()> {
        let name = name.to_string();
        let s = survey.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"UPDATE user_added_projects SET
                           survey_q1 = ?1, survey_q2 = ?2, survey_q3 = ?3, survey_q4 = ?4,
                           survey_q5 = ?5, survey_q6 = ?6, survey_q7 = ?7, survey_q8 = ?8
                       WHERE project = ?9"#,
                    params![
                        s.survey_q1,
                        s.survey_q2,
                        s.survey_q3,
                        s.survey_q4,
                        s.survey_q5,
                        s.survey_q6,
                        s.survey_q7,
                        s.survey_q8,
                        name,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn delete_user_project(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM user_added_projects WHERE project = ?1",
                    params![name],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Tombstone operations

    async fn tombstones(&self) -> Result<Vec<Tombstone>> {
        let rows = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, project, created_at FROM removed_projects ORDER BY created_at DESC, id DESC",
                )?;
                let rows = stmt
                    .query_map([], tombstone_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows)
    }

    async fn find_tombstone(&self, name: &str) -> Result<Option<Tombstone>> {
        let name = name.to_string();
        let row = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT id, project, created_at FROM removed_projects WHERE project = ?1",
                        params![name],
                        tombstone_from_row,
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;
        Ok(row)
    }

    async fn insert_tombstone(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO removed_projects (project) VALUES (?1)",
                    params![name],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn delete_tombstone(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM removed_projects WHERE project = ?1", params![name])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn clear_tombstones(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute("DELETE FROM removed_projects", [])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Q&A operations

    async fn qa_entries(&self, scope: QaScope) -> Result<Vec<QaEntry>> {
        let filter = match scope {
            QaScope::Active => "WHERE is_removed = 0 OR is_removed IS NULL",
            QaScope::Removed => "WHERE is_removed = 1",
            QaScope::All => "",
        };
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {QA_COLUMNS} FROM public_hearing_qa {filter} ORDER BY topic, id"
                ))?;
                let rows = stmt
                    .query_map([], qa_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows)
    }

    async fn insert_qa(&self, qa: &NewQa) -> Result<QaEntry> {
        let qa = qa.clone();
        let entry = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO public_hearing_qa (topic, question, response, sources, is_removed) VALUES (?1, ?2, ?3, ?4, 0)",
                    params![qa.topic, qa.question, qa.response, qa.sources],
                )?;
                let id = conn.last_insert_rowid();
                let entry = conn.query_row(
                    &format!("SELECT {QA_COLUMNS} FROM public_hearing_qa WHERE id = ?1"),
                    params![id],
                    qa_from_row,
                )?;
                Ok(entry)
            })
            .await?;
        Ok(entry)
    }

    async fn update_qa(&self, id: i64, qa: &NewQa) -> Result<()> {
        let qa = qa.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE public_hearing_qa SET topic = ?1, question = ?2, response = ?3, sources = ?4 WHERE id = ?5",
                    params![qa.topic, qa.question, qa.response, qa.sources, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn set_qa_removed(&self, id: i64, removed: bool) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE public_hearing_qa SET is_removed = ?1 WHERE id = ?2",
                    params![removed, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn delete_qa(&self, id: i64) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM public_hearing_qa WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite datetime('now') format
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn record_from_row(row: &Row) -> rusqlite::Result<ProjectRecord> {
    Ok(ProjectRecord {
        id: row.get(0)?,
        project: row.get(1)?,
        state: row.get(2)?,
        county: row.get(3)?,
        facility_type: row.get(4)?,
        status: row.get(5)?,
        latitude: row.get(6)?,
        longitude: row.get(7)?,
        system_size_mw_ac: row.get(8)?,
        system_size_mw_dc: row.get(9)?,
        sentiment: row.get(10)?,
        sentiment_detail: row.get(11)?,
        mentions_of_moratoria: row.get(12)?,
        recent_projects: row.get(13)?,
        survey: SurveyAnswers {
            survey_q1: row.get(14)?,
            survey_q2: row.get(15)?,
            survey_q3: row.get(16)?,
            survey_q4: row.get(17)?,
            survey_q5: row.get(18)?,
            survey_q6: row.get(19)?,
            survey_q7: row.get(20)?,
            survey_q8: row.get(21)?,
        },
    })
}

fn tombstone_from_row(row: &Row) -> rusqlite::Result<Tombstone> {
    Ok(Tombstone {
        id: row.get(0)?,
        project: row.get(1)?,
        created_at: row
            .get::<_, Option<String>>(2)?
            .and_then(|s| parse_datetime(&s)),
    })
}

fn qa_from_row(row: &Row) -> rusqlite::Result<QaEntry> {
    Ok(QaEntry {
        id: row.get(0)?,
        topic: row.get(1)?,
        question: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        response: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        sources: row.get(4)?,
        is_removed: row.get::<_, Option<i64>>(5)?.map(|flag| flag != 0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn legacy_qa_table_is_migrated_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        let path = path.to_str().unwrap().to_string();

        {
            let conn = rusqlite::Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE public_hearing_qa (
                     id INTEGER PRIMARY KEY AUTOINCREMENT,
                     topic TEXT, question TEXT NOT NULL, response TEXT NOT NULL, sources TEXT
                 );
                 INSERT INTO public_hearing_qa (topic, question, response)
                 VALUES ('Noise', 'How loud are inverters?', 'Quieter than a fridge at the fence line.');",
            )
            .unwrap();
        }

        let store = LocalStore::open(&path).await.unwrap();
        assert_eq!(store.qa_schema().await.unwrap(), QaSchema::SoftDelete);

        let active = store.qa_entries(QaScope::Active).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].is_removed, Some(false));
        assert_eq!(active[0].topic.as_deref(), Some("Noise"));
    }

    #[tokio::test]
    async fn reopening_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        let path = path.to_str().unwrap().to_string();

        let store = LocalStore::open(&path).await.unwrap();
        let record = ProjectRecord {
            project: "Cedar Wind".to_string(),
            state: Some("KS".to_string()),
            latitude: Some(38.5),
            longitude: Some(-98.0),
            sentiment: Some("MIXED".to_string()),
            ..Default::default()
        };
        store.insert_user_project(&record).await.unwrap();
        store.insert_tombstone("Sample Project 2").await.unwrap();
        drop(store);

        let store = LocalStore::open(&path).await.unwrap();
        let rows = store.user_projects().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].project, "Cedar Wind");
        assert_eq!(rows[0].latitude, Some(38.5));
        assert!(rows[0].id.is_some());

        let tombstones = store.tombstones().await.unwrap();
        assert_eq!(tombstones.len(), 1);
        assert!(tombstones[0].created_at.is_some());
    }

    #[tokio::test]
    async fn tombstone_names_are_unique() {
        let store = LocalStore::open_in_memory().await.unwrap();
        store.insert_tombstone("Mesa Solar").await.unwrap();
        assert!(store.insert_tombstone("Mesa Solar").await.is_err());
        assert!(store.find_tombstone("Mesa Solar").await.unwrap().is_some());
        assert!(store.find_tombstone("Other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_survey_touches_only_named_row() {
        let store = LocalStore::open_in_memory().await.unwrap();
        for name in ["A", "B"] {
            let record = ProjectRecord {
                project: name.to_string(),
                ..Default::default()
            };
            store.insert_user_project(&record).await.unwrap();
        }

        let answers = SurveyAnswers::from_values(["", "Traffic"]);
        store.update_survey("B", &answers).await.unwrap();

        let a = store.find_user_project("A").await.unwrap().unwrap();
        let b = store.find_user_project("B").await.unwrap().unwrap();
        assert_eq!(a.survey.get(1), None);
        assert_eq!(b.survey.get(1), Some("Traffic"));
    }
}
