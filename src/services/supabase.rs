use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{NewQa, ProjectRecord, QaEntry, QaScope, SurveyAnswers, Tombstone};
use crate::store::RecordStore;

const USER_PROJECTS: &str = "user_added_projects";
const REMOVED_PROJECTS: &str = "removed_projects";
const HEARING_QA: &str = "public_hearing_qa";

#[derive(Debug, Serialize)]
struct TombstoneRequest<'a> {
    project: &'a str,
}

#[derive(Debug, Serialize)]
struct RemovedFlag {
    is_removed: bool,
}

#[derive(Debug, Serialize)]
struct NewQaRequest<'a> {
    #[serde(flatten)]
    qa: &'a NewQa,
    is_removed: bool,
}

/// Hosted record store speaking PostgREST (`<project>/rest/v1/<table>`).
pub struct SupabaseStore {
    client: Client,
    rest_url: Url,
    api_key: String,
}

impl SupabaseStore {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        let mut base = Url::parse(base_url.trim())?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let rest_url = base.join("rest/v1/")?;

        Ok(Self {
            client,
            rest_url,
            api_key: api_key.to_string(),
        })
    }

    fn request(&self, method: Method, table: &str) -> Result<RequestBuilder> {
        let url = self.rest_url.join(table)?;
        Ok(self
            .client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key))
    }

    async fn send(builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::StoreApi(format!("{status}: {error_text}")));
        }
        Ok(response)
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        let builder = self
            .request(Method::GET, table)?
            .query(&[("select", "*")])
            .query(query);
        let rows = Self::send(builder).await?.json().await?;
        Ok(rows)
    }

    async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(&self, table: &str, body: &B) -> Result<Vec<T>> {
        let builder = self
            .request(Method::POST, table)?
            .header("Prefer", "return=representation")
            .json(body);
        let rows = Self::send(builder).await?.json().await?;
        Ok(rows)
    }

    async fn update<B: Serialize + ?Sized>(&self, table: &str, filter: (&str, String), body: &B) -> Result<()> {
        let builder = self
            .request(Method::PATCH, table)?
            .query(&[filter])
            .json(body);
        Self::send(builder).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, filter: (&str, String)) -> Result<()> {
        let builder = self.request(Method::DELETE, table)?.query(&[filter]);
        Self::send(builder).await?;
        Ok(())
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

#[async_trait]
impl RecordStore for SupabaseStore {
    fn backend_name(&self) -> &'static str {
        "supabase"
    }

    async fn user_projects(&self) -> Result<Vec<ProjectRecord>> {
        self.select(USER_PROJECTS, &[("order", "created_at.desc".to_string())])
            .await
    }

    async fn find_user_project(&self, name: &str) -> Result<Option<ProjectRecord>> {
        let rows: Vec<ProjectRecord> = self
            .select(
                USER_PROJECTS,
                &[("project", eq(name)), ("limit", "1".to_string())],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_user_project(&self, record: &ProjectRecord) -> Result<()> {
        let _: Vec<ProjectRecord> = self.insert(USER_PROJECTS, record).await?;
        Ok(())
    }

    async fn update_survey(&self, name: &str, survey: &SurveyAnswers) -> Result<()> {
        self.update(USER_PROJECTS, ("project", eq(name)), survey).await
    }

    async fn delete_user_project(&self, name: &str) -> Result<()> {
        self.delete(USER_PROJECTS, ("project", eq(name))).await
    }

    async fn tombstones(&self) -> Result<Vec<Tombstone>> {
        self.select(REMOVED_PROJECTS, &[("order", "created_at.desc".to_string())])
            .await
    }

    async fn find_tombstone(&self, name: &str) -> Result<Option<Tombstone>> {
        let rows: Vec<Tombstone> = self
            .select(REMOVED_PROJECTS, &[("project", eq(name))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_tombstone(&self, name: &str) -> Result<()> {
        let _: Vec<Tombstone> = self
            .insert(REMOVED_PROJECTS, &TombstoneRequest { project: name })
            .await?;
        Ok(())
    }

    async fn delete_tombstone(&self, name: &str) -> Result<()> {
        self.delete(REMOVED_PROJECTS, ("project", eq(name))).await
    }

    async fn clear_tombstones(&self) -> Result<()> {
        // PostgREST refuses an unfiltered DELETE.
        self.delete(REMOVED_PROJECTS, ("id", "neq.0".to_string())).await
    }

    async fn qa_entries(&self, scope: QaScope) -> Result<Vec<QaEntry>> {
        let mut query = vec![("order", "topic.asc,id.asc".to_string())];
        match scope {
            QaScope::Active => {
                query.push(("or", "(is_removed.is.null,is_removed.eq.false)".to_string()))
            }
            QaScope::Removed => query.push(("is_removed", "eq.true".to_string())),
            QaScope::All => {}
        }
        self.select(HEARING_QA, &query).await
    }

    async fn insert_qa(&self, qa: &NewQa) -> Result<QaEntry> {
        let rows: Vec<QaEntry> = self
            .insert(HEARING_QA, &NewQaRequest { qa, is_removed: false })
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::StoreApi("No row returned from insert".to_string()))
    }

    async fn update_qa(&self, id: i64, qa: &NewQa) -> Result<()> {
        self.update(HEARING_QA, ("id", eq(id)), qa).await
    }

    async fn set_qa_removed(&self, id: i64, removed: bool) -> Result<()> {
        self.update(HEARING_QA, ("id", eq(id)), &RemovedFlag { is_removed: removed })
            .await
    }

    async fn delete_qa(&self, id: i64) -> Result<()> {
        self.delete(HEARING_QA, ("id", eq(id))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> SupabaseStore {
        SupabaseStore::new(&server.uri(), "anon-key").unwrap()
    }

    #[tokio::test]
    async fn select_sends_auth_headers_and_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/removed_projects"))
            .and(query_param("project", "eq.Sample Project 1"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer anon-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 4, "project": "Sample Project 1", "created_at": "2025-06-01T10:00:00+00:00"}
            ])))
            .mount(&server)
            .await;

        let found = store(&server)
            .find_tombstone("Sample Project 1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, Some(4));
    }

    #[tokio::test]
    async fn active_qa_uses_null_or_false_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/public_hearing_qa"))
            .and(query_param("or", "(is_removed.is.null,is_removed.eq.false)"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 7, "topic": "Health Concerns", "question": "EMF?", "response": "• No", "sources": null, "is_removed": null}
            ])))
            .mount(&server)
            .await;

        let rows = store(&server).qa_entries(QaScope::Active).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_active());
    }

    #[tokio::test]
    async fn insert_qa_returns_representation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/public_hearing_qa"))
            .and(header("prefer", "return=representation"))
            .and(body_json(json!({
                "topic": "Land Use",
                "question": "Is farmland lost?",
                "response": "Grazing continues.",
                "sources": null,
                "is_removed": false
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([
                {"id": 31, "topic": "Land Use", "question": "Is farmland lost?", "response": "Grazing continues.", "sources": null, "is_removed": false}
            ])))
            .mount(&server)
            .await;

        let qa = NewQa {
            topic: "Land Use".to_string(),
            question: "Is farmland lost?".to_string(),
            response: "Grazing continues.".to_string(),
            sources: None,
        };
        let entry = store(&server).insert_qa(&qa).await.unwrap();
        assert_eq!(entry.id, 31);
    }

    #[tokio::test]
    async fn clear_tombstones_sends_filtered_delete() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/removed_projects"))
            .and(query_param("id", "neq.0"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        store(&server).clear_tombstones().await.unwrap();
    }

    #[tokio::test]
    async fn error_status_becomes_store_error() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/public_hearing_qa"))
            .respond_with(ResponseTemplate::new(400).set_body_string("column is_removed does not exist"))
            .mount(&server)
            .await;

        let err = store(&server).set_qa_removed(7, true).await.unwrap_err();
        match err {
            AppError::StoreApi(message) => assert!(message.contains("is_removed")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn base_url_with_path_keeps_prefix() {
        let store = SupabaseStore::new("https://proxy.example/tenant", "k").unwrap();
        assert_eq!(store.rest_url.as_str(), "https://proxy.example/tenant/rest/v1/");
    }
}
