use std::path::PathBuf;
use std::time::Duration;

use triage_ai::OpenAiConfig;
use triage_core::TriageError;
use triage_github::RepoRef;

use crate::cli_args::Cli;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueSelector {
    Number(u64),
    EventPayload(PathBuf),
}

#[derive(Debug, Clone)]
pub struct GithubSettings {
    pub api_base: String,
    pub token: Option<String>,
    pub repo: RepoRef,
}

#[derive(Debug, Clone)]
/// Validated settings for one run. Built before any network call.
pub struct RunConfig {
    pub openai: OpenAiConfig,
    pub model: Option<String>,
    pub turn_delay: Duration,
    pub github: GithubSettings,
    pub issue: IssueSelector,
    pub repo_root: PathBuf,
    pub system_prompt_path: PathBuf,
    pub agents_path: PathBuf,
    pub output_file: Option<PathBuf>,
    pub github_output: Option<PathBuf>,
    pub dry_run: bool,
    pub request_timeout_ms: u64,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Cli {
    pub fn into_run_config(self) -> Result<RunConfig, TriageError> {
        let api_url = non_blank(self.openai_url)
            .ok_or_else(|| TriageError::Config("OPENAI_URL must be set".to_string()))?;
        let api_key = non_blank(self.openai_key)
            .or_else(|| non_blank(self.ai_token))
            .ok_or_else(|| {
                TriageError::Config("OPENAI_KEY (or AI_TOKEN) must be set".to_string())
            })?;
        let repo = non_blank(self.repo)
            .ok_or_else(|| TriageError::Config("GITHUB_REPOSITORY must be set".to_string()))?;
        let repo = RepoRef::parse(&repo).map_err(|error| TriageError::Config(error.to_string()))?;

        let issue = match (self.issue_number, self.event_path) {
            (Some(number), _) => IssueSelector::Number(number),
            (None, Some(path)) => IssueSelector::EventPayload(path),
            (None, None) => {
                return Err(TriageError::Config(
                    "either --issue-number or --event-path must be provided".to_string(),
                ))
            }
        };

        let token = non_blank(self.github_token);
        let needs_token = !self.dry_run || matches!(issue, IssueSelector::Number(_));
        if token.is_none() && needs_token {
            return Err(TriageError::Config(
                "GITHUB_TOKEN must be set unless --dry-run reads the issue from --event-path"
                    .to_string(),
            ));
        }

        let repo_root = match self.repo_root {
            Some(root) => root,
            None => std::env::current_dir().map_err(|error| {
                TriageError::Config(format!("failed to resolve working directory: {error}"))
            })?,
        };

        Ok(RunConfig {
            openai: OpenAiConfig {
                api_url,
                api_key,
                auth_scheme: self.openai_auth_scheme.into(),
                request_timeout_ms: self.request_timeout_ms,
            },
            model: non_blank(self.openai_model),
            turn_delay: Duration::from_millis(self.rate_limit_delay_ms),
            github: GithubSettings {
                api_base: self.github_api_base.trim().trim_end_matches('/').to_string(),
                token,
                repo,
            },
            issue,
            repo_root,
            system_prompt_path: self.system_prompt_path,
            agents_path: self.agents_path,
            output_file: self.output_file,
            github_output: self.github_output,
            dry_run: self.dry_run,
            request_timeout_ms: self.request_timeout_ms,
        })
    }
}
