use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::transport_helpers::truncate_for_error;
use crate::{GithubIssue, GithubIssueLabel, RepoRef};

const ERROR_BODY_MAX_CHARS: usize = 800;

#[async_trait]
/// Write side of the issue tracker.
pub trait IssueTracker: Send + Sync {
    /// Posts one comment and returns its id.
    async fn create_comment(&self, issue_number: u64, body: &str) -> Result<u64>;

    async fn add_labels(&self, issue_number: u64, labels: &[String]) -> Result<()>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubCommentCreateResponse {
    pub id: u64,
    pub html_url: Option<String>,
}

#[derive(Clone)]
/// GitHub REST client scoped to one repository. Requests are sent once; a
/// failed request is reported to the caller without retrying.
pub struct GithubApiClient {
    http: reqwest::Client,
    api_base: String,
    repo: RepoRef,
}

impl GithubApiClient {
    pub fn new(
        api_base: String,
        token: String,
        repo: RepoRef,
        request_timeout_ms: u64,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("issue-triage"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static("2022-11-28"),
        );
        let auth_header = format!("Bearer {}", token.trim());
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&auth_header)
                .context("invalid github authorization header")?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create github api client")?;
        Ok(Self {
            http: client,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo,
        })
    }

    fn issue_url(&self, issue_number: u64) -> String {
        format!(
            "{}/repos/{}/{}/issues/{}",
            self.api_base, self.repo.owner, self.repo.name, issue_number
        )
    }

    pub async fn get_issue(&self, issue_number: u64) -> Result<GithubIssue> {
        self.request_json("get issue", self.http.get(self.issue_url(issue_number)))
            .await
    }

    pub async fn create_issue_comment(
        &self,
        issue_number: u64,
        body: &str,
    ) -> Result<GithubCommentCreateResponse> {
        let payload = json!({ "body": body });
        self.request_json(
            "create issue comment",
            self.http
                .post(format!("{}/comments", self.issue_url(issue_number)))
                .json(&payload),
        )
        .await
    }

    pub async fn add_issue_labels(
        &self,
        issue_number: u64,
        labels: &[String],
    ) -> Result<Vec<GithubIssueLabel>> {
        let payload = json!({ "labels": labels });
        self.request_json(
            "add issue labels",
            self.http
                .post(format!("{}/labels", self.issue_url(issue_number)))
                .json(&payload),
        )
        .await
    }

    async fn request_json<T>(&self, operation: &str, request: reqwest::RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = request
            .send()
            .await
            .with_context(|| format!("github api {operation} request failed"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "github api {operation} failed with status {}: {}",
                status.as_u16(),
                truncate_for_error(&body, ERROR_BODY_MAX_CHARS)
            );
        }
        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode github {operation}"))
    }
}

#[async_trait]
impl IssueTracker for GithubApiClient {
    async fn create_comment(&self, issue_number: u64, body: &str) -> Result<u64> {
        let created = self.create_issue_comment(issue_number, body).await?;
        tracing::debug!(
            issue_number,
            comment_id = created.id,
            html_url = created.html_url.as_deref().unwrap_or("unknown"),
            "github issue comment created"
        );
        Ok(created.id)
    }

    async fn add_labels(&self, issue_number: u64, labels: &[String]) -> Result<()> {
        self.add_issue_labels(issue_number, labels).await?;
        Ok(())
    }
}
