use anyhow::Result;
use triage_ai::OpenAiClient;
use triage_core::{
    append_github_output, load_system_prompt, run_issue_triage, write_output_file, ContentGuard,
    TokioTurnDelay, TriageError, TriageRunReport, TriageRunRequest, TurnProtocolConfig,
};
use triage_github::{load_issue_from_event_payload, GithubApiClient, GithubIssue, IssueTracker};

use crate::cli_args::Cli;
use crate::run_config::{IssueSelector, RunConfig};

pub(crate) async fn run_cli(cli: Cli) -> Result<()> {
    let config = cli.into_run_config()?;
    let report = execute_triage(&config).await?;
    if config.dry_run {
        println!("{}", report.comment_body);
    }
    Ok(())
}

fn github_client(config: &RunConfig) -> Result<Option<GithubApiClient>> {
    let Some(token) = config.github.token.clone() else {
        return Ok(None);
    };
    let client = GithubApiClient::new(
        config.github.api_base.clone(),
        token,
        config.github.repo.clone(),
        config.request_timeout_ms,
    )?;
    Ok(Some(client))
}

async fn load_issue(
    config: &RunConfig,
    github: Option<&GithubApiClient>,
) -> Result<GithubIssue, TriageError> {
    match &config.issue {
        IssueSelector::EventPayload(path) => {
            load_issue_from_event_payload(path).map_err(TriageError::IssueSource)
        }
        IssueSelector::Number(number) => {
            let github = github.ok_or_else(|| {
                TriageError::Config("fetching an issue by number requires GITHUB_TOKEN".to_string())
            })?;
            github
                .get_issue(*number)
                .await
                .map_err(TriageError::IssueSource)
        }
    }
}

/// The comment is already posted when this runs, so a failed report write is
/// logged and the run still succeeds.
fn write_run_reports(config: &RunConfig, report: &TriageRunReport) {
    if let Some(path) = &config.output_file {
        if let Err(error) = write_output_file(path, &report.comment_body) {
            tracing::warn!(
                path = %path.display(),
                error = %format!("{error:#}"),
                "failed to write triage output file"
            );
        }
    }
    if let Some(path) = &config.github_output {
        if let Err(error) = append_github_output(path, report.classification) {
            tracing::warn!(
                path = %path.display(),
                error = %format!("{error:#}"),
                "failed to append github step outputs"
            );
        }
    }
}

/// Runs one triage end to end and writes the optional run reports.
pub(crate) async fn execute_triage(config: &RunConfig) -> Result<TriageRunReport> {
    let system_prompt = load_system_prompt(&config.system_prompt_path, &config.agents_path)?;
    let client = OpenAiClient::new(config.openai.clone()).map_err(TriageError::from)?;
    let github = github_client(config)?;
    let issue = load_issue(config, github.as_ref()).await?;
    tracing::info!(
        repo = %config.github.repo.as_slug(),
        issue_number = issue.number,
        endpoint = client.chat_completions_url(),
        dry_run = config.dry_run,
        "starting issue triage"
    );

    let guard = ContentGuard::new(config.repo_root.clone());
    let protocol = TurnProtocolConfig {
        system_prompt,
        model: config.model.clone(),
        turn_delay: config.turn_delay,
    };
    let tracker = if config.dry_run {
        None
    } else {
        github.as_ref().map(|client| client as &dyn IssueTracker)
    };

    let report = run_issue_triage(TriageRunRequest {
        issue: &issue,
        client: &client,
        guard: &guard,
        delay: &TokioTurnDelay,
        tracker,
        config: &protocol,
    })
    .await?;

    write_run_reports(config, &report);
    tracing::info!(
        issue_number = report.issue_number,
        classification = report
            .classification
            .map(|label| label.as_str())
            .unwrap_or("none"),
        comment_id = report.comment_id,
        label_applied = report.label_applied,
        "issue triage finished"
    );
    Ok(report)
}
