//! GitHub issue model, issue sources, and the tracker write client used by
//! the issue triage runtime.

pub mod github_api_client;
pub mod issue_model;
pub mod issue_source;
pub mod transport_helpers;

pub use github_api_client::{GithubApiClient, GithubCommentCreateResponse, IssueTracker};
pub use issue_model::{GithubIssue, GithubIssueLabel, GithubUser, RepoRef};
pub use issue_source::load_issue_from_event_payload;
