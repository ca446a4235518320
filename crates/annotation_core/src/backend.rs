//! Course persistence collaborator and its REST implementation.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::ExportFormat,
    error::ApiException,
    protocol::{
        Course, CourseQuery, CreateCourseRequest, ExportFile, ExportResponse,
        SubmitTestingRequest, TestingCourse, TestingResult,
    },
};
use tracing::debug;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

#[async_trait]
pub trait CourseBackend: Send + Sync {
    async fn create_course(&self, request: &CreateCourseRequest) -> Result<Course>;
    async fn random_testing_course(&self) -> Result<TestingCourse>;
    async fn submit_testing_result(&self, request: &SubmitTestingRequest)
        -> Result<TestingResult>;
    async fn export_csv(&self, format: ExportFormat) -> Result<ExportResponse>;
}

pub struct HttpCourseBackend {
    http: Client,
    base_url: String,
}

impl HttpCourseBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn list_courses(&self, query: &CourseQuery) -> Result<Vec<Course>> {
        let response = self
            .http
            .get(format!("{}/courses", self.base_url))
            .query(query)
            .send()
            .await
            .context("failed to list courses")?;
        decode(response).await
    }

    /// Aggregate guessing statistics. The shape is backend-defined.
    pub async fn testing_stats(&self) -> Result<serde_json::Value> {
        let response = self
            .http
            .get(format!("{}/export/testing-stats", self.base_url))
            .send()
            .await
            .context("failed to fetch testing statistics")?;
        decode(response).await
    }

    /// Export download links are host-relative; resolve them against the API host.
    pub fn download_url(&self, file: &ExportFile) -> Result<Url> {
        let base = Url::parse(&self.base_url)
            .with_context(|| format!("invalid API base url '{}'", self.base_url))?;
        base.join(&file.download_url)
            .map_err(|err| anyhow!("invalid download url '{}': {err}", file.download_url))
    }
}

#[async_trait]
impl CourseBackend for HttpCourseBackend {
    async fn create_course(&self, request: &CreateCourseRequest) -> Result<Course> {
        debug!(points = request.points.len(), "posting course");
        let response = self
            .http
            .post(format!("{}/courses", self.base_url))
            .json(request)
            .send()
            .await
            .context("failed to save course")?;
        decode(response).await
    }

    async fn random_testing_course(&self) -> Result<TestingCourse> {
        let response = self
            .http
            .get(format!("{}/courses/random/testing", self.base_url))
            .send()
            .await
            .context("failed to load testing course")?;
        decode(response).await
    }

    async fn submit_testing_result(
        &self,
        request: &SubmitTestingRequest,
    ) -> Result<TestingResult> {
        let response = self
            .http
            .post(format!("{}/export/testing-session", self.base_url))
            .json(request)
            .send()
            .await
            .context("failed to submit testing result")?;
        decode(response).await
    }

    async fn export_csv(&self, format: ExportFormat) -> Result<ExportResponse> {
        let response = self
            .http
            .get(format!("{}/export/csv", self.base_url))
            .query(&[("format", format.as_str())])
            .send()
            .await
            .context("failed to export data")?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiException::from_body(status.as_u16(), &body).into());
    }
    response
        .json::<T>()
        .await
        .context("malformed response from course backend")
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;
