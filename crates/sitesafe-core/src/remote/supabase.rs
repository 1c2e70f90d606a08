//! Hosted backend client: PostgREST tables, Storage objects and RPCs.

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use super::{parse_api_error, ObjectStore, RecordReview, RecordStore, Table};
use crate::config::BackendConfig;
use crate::models::{
    FileBlob, FormRecord, FormRecordRow, NewFormRecord, Project, ProjectRow, StatusUpdate, User,
};
use crate::{Error, Result};

const SUBMITTER_EXPANSION: &str = "*,submitted_by_id(id,full_name)";
const CREATOR_EXPANSION: &str = "*,created_by(id,full_name)";

/// Which error variant a failed request maps to.
#[derive(Debug, Clone, Copy)]
enum Failure {
    Upload,
    Insert,
    Remote,
}

impl Failure {
    fn into_error(self, message: String) -> Error {
        match self {
            Self::Upload => Error::Upload(message),
            Self::Insert => Error::Insert(message),
            Self::Remote => Error::Remote(message),
        }
    }
}

/// reqwest client for one backend project.
#[derive(Clone, Debug)]
pub struct SupabaseBackend {
    config: BackendConfig,
    client: Client,
    access_token: Option<String>,
}

impl SupabaseBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|error| Error::Remote(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            config: config.clone(),
            client,
            access_token: None,
        })
    }

    /// Send requests as the signed-in user instead of the anon role.
    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    pub const fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        let bearer = self
            .access_token
            .as_deref()
            .unwrap_or(&self.config.anon_key);
        self.client
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer)
    }

    async fn send(request: RequestBuilder, failure: Failure) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|error| failure.into_error(error.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(failure.into_error(parse_api_error(status, &body)));
        }
        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let body = response
            .text()
            .await
            .map_err(|error| Error::Remote(format!("failed to read response body: {error}")))?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn insert_row<T: Serialize + ?Sized>(
        &self,
        table: Table,
        row: &T,
        failure: Failure,
    ) -> Result<()> {
        let request = self
            .request(Method::POST, self.config.rest_url(table.as_str()))
            .header("Prefer", "return=minimal")
            .json(row);
        Self::send(request, failure).await?;
        Ok(())
    }

    /// Insert one row.
    pub async fn insert<T: Serialize + ?Sized>(&self, table: Table, row: &T) -> Result<()> {
        self.insert_row(table, row, Failure::Remote).await
    }

    /// Select rows with PostgREST query parameters such as `("id", "eq.1")`.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: Table,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let request = self
            .request(Method::GET, self.config.rest_url(table.as_str()))
            .query(query);
        let response = Self::send(request, Failure::Remote).await?;
        Self::read_json(response).await
    }

    /// Patch rows matching `filter`.
    pub async fn update<T: Serialize + ?Sized>(
        &self,
        table: Table,
        filter: (&str, &str),
        changes: &T,
    ) -> Result<()> {
        let request = self
            .request(Method::PATCH, self.config.rest_url(table.as_str()))
            .query(&[filter])
            .header("Prefer", "return=minimal")
            .json(changes);
        Self::send(request, Failure::Remote).await?;
        Ok(())
    }

    /// Delete rows matching `filter`.
    pub async fn delete(&self, table: Table, filter: (&str, &str)) -> Result<()> {
        let request = self
            .request(Method::DELETE, self.config.rest_url(table.as_str()))
            .query(&[filter]);
        Self::send(request, Failure::Remote).await?;
        Ok(())
    }

    /// Call a database function and decode its JSON result.
    pub async fn rpc<A: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        function: &str,
        args: &A,
    ) -> Result<R> {
        let request = self
            .request(Method::POST, self.config.rpc_url(function))
            .json(args);
        let response = Self::send(request, Failure::Remote).await?;
        Self::read_json(response).await
    }

    /// Call a database function that returns nothing.
    pub async fn rpc_void<A: Serialize + ?Sized>(&self, function: &str, args: &A) -> Result<()> {
        let request = self
            .request(Method::POST, self.config.rpc_url(function))
            .json(args);
        Self::send(request, Failure::Remote).await?;
        Ok(())
    }

    pub async fn fetch_user(&self, user_id: &str) -> Result<Option<User>> {
        let filter = format!("eq.{user_id}");
        let mut users: Vec<User> = self
            .select(Table::Users, &[("select", "*"), ("id", &filter)])
            .await?;
        Ok(users.pop())
    }
}

impl ObjectStore for SupabaseBackend {
    async fn upload(&self, path: &str, blob: &FileBlob) -> Result<()> {
        let content_type = blob
            .content_type
            .as_deref()
            .unwrap_or("application/octet-stream");
        let request = self
            .request(Method::POST, self.config.object_url(path))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(blob.bytes.clone());

        Self::send(request, Failure::Upload).await?;
        tracing::debug!("Uploaded {} bytes to {path}", blob.len());
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        self.config.public_object_url(path)
    }
}

impl RecordStore for SupabaseBackend {
    async fn insert_form_record(&self, record: &NewFormRecord) -> Result<()> {
        self.insert_row(Table::FormRecords, record, Failure::Insert)
            .await
    }
}

impl RecordReview for SupabaseBackend {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let rows: Vec<ProjectRow> = self
            .select(
                Table::Projects,
                &[("select", CREATOR_EXPANSION), ("order", "created_at.desc")],
            )
            .await?;
        Ok(rows.into_iter().map(|row| row.resolve(|_| None)).collect())
    }

    async fn list_form_records(&self, project_id: Option<&str>) -> Result<Vec<FormRecord>> {
        let project_filter = project_id.map(|id| format!("eq.{id}"));
        let mut query = vec![
            ("select", SUBMITTER_EXPANSION),
            ("order", "submitted_at.desc"),
        ];
        if let Some(filter) = project_filter.as_deref() {
            query.push(("project_id", filter));
        }

        let rows: Vec<FormRecordRow> = self.select(Table::FormRecords, &query).await?;
        Ok(rows.into_iter().map(|row| row.resolve(|_| None)).collect())
    }

    async fn fetch_form_record(&self, record_id: &str) -> Result<Option<FormRecord>> {
        let filter = format!("eq.{record_id}");
        let mut rows: Vec<FormRecordRow> = self
            .select(
                Table::FormRecords,
                &[("select", SUBMITTER_EXPANSION), ("id", &filter)],
            )
            .await?;
        Ok(rows.pop().map(|row| row.resolve(|_| None)))
    }

    async fn update_record_status(
        &self,
        record: &mut FormRecord,
        update: StatusUpdate,
    ) -> Result<()> {
        let mut updated = record.clone();
        updated.apply_status_update(update);
        let filter = format!("eq.{}", updated.id);
        self.update(
            Table::FormRecords,
            ("id", &filter),
            &json!({ "status": updated.status, "updates": updated.updates }),
        )
        .await?;
        *record = updated;
        Ok(())
    }

    /// Privileged delete that bypasses row-level policies.
    async fn delete_form_record(&self, record_id: &str) -> Result<()> {
        self.rpc_void("delete_form_record_by_id", &json!({ "record_id": record_id }))
            .await
    }
}
