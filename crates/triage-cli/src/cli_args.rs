use std::path::PathBuf;

use clap::Parser;
use triage_core::DEFAULT_TURN_DELAY_MS;

use crate::cli_types::CliOpenAiAuthScheme;

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "issue-triage",
    about = "Triage one GitHub issue with a bounded three-turn LLM exchange",
    version
)]
pub struct Cli {
    #[arg(
        long = "openai-url",
        env = "OPENAI_URL",
        help = "Chat completions endpoint. /chat/completions is appended when missing; query parameters such as api-version are kept"
    )]
    pub openai_url: Option<String>,

    #[arg(long = "openai-key", env = "OPENAI_KEY", hide_env_values = true)]
    pub openai_key: Option<String>,

    #[arg(
        long = "ai-token",
        env = "AI_TOKEN",
        hide = true,
        hide_env_values = true,
        help = "Fallback API key used when --openai-key is unset"
    )]
    pub ai_token: Option<String>,

    #[arg(
        long = "openai-auth-scheme",
        env = "OPENAI_AUTH_SCHEME",
        value_enum,
        default_value = "api-key",
        help = "Send the key as an api-key header or as a bearer token"
    )]
    pub openai_auth_scheme: CliOpenAiAuthScheme,

    #[arg(
        long = "openai-model",
        env = "OPENAI_MODEL",
        help = "Model name sent in the request body. Omitted when unset"
    )]
    pub openai_model: Option<String>,

    #[arg(
        long = "request-timeout-ms",
        env = "OPENAI_REQUEST_TIMEOUT_MS",
        default_value_t = 120_000,
        value_parser = parse_positive_u64,
        help = "Timeout in milliseconds for one chat or GitHub request"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "rate-limit-delay-ms",
        env = "RATE_LIMIT_DELAY_MS",
        default_value_t = DEFAULT_TURN_DELAY_MS,
        help = "Pause in milliseconds before the second and third turns"
    )]
    pub rate_limit_delay_ms: u64,

    #[arg(long = "github-token", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    #[arg(
        long = "github-api-base",
        env = "GITHUB_API_URL",
        default_value = "https://api.github.com"
    )]
    pub github_api_base: String,

    #[arg(long = "repo", env = "GITHUB_REPOSITORY", help = "Repository as owner/name")]
    pub repo: Option<String>,

    #[arg(
        long = "issue-number",
        env = "ISSUE_NUMBER",
        value_parser = parse_positive_u64,
        help = "Fetch this issue through the GitHub API. Takes precedence over --event-path"
    )]
    pub issue_number: Option<u64>,

    #[arg(
        long = "event-path",
        env = "GITHUB_EVENT_PATH",
        help = "Webhook event payload file whose `issue` object is triaged"
    )]
    pub event_path: Option<PathBuf>,

    #[arg(
        long = "repo-root",
        env = "TRIAGE_REPO_ROOT",
        help = "Directory requested files are served from. Defaults to the working directory"
    )]
    pub repo_root: Option<PathBuf>,

    #[arg(
        long = "system-prompt-path",
        env = "TRIAGE_SYSTEM_PROMPT_PATH",
        default_value = ".github/prompts/issue-assistant.md"
    )]
    pub system_prompt_path: PathBuf,

    #[arg(
        long = "agents-path",
        env = "TRIAGE_AGENTS_PATH",
        default_value = "AGENTS.md",
        help = "Markdown file providing the {{DirectoryStructure}} block"
    )]
    pub agents_path: PathBuf,

    #[arg(
        long = "output-file",
        env = "TRIAGE_OUTPUT_FILE",
        help = "Also write the final comment body to this file"
    )]
    pub output_file: Option<PathBuf>,

    #[arg(
        long = "github-output",
        env = "GITHUB_OUTPUT",
        help = "Append response and classification step outputs to this file"
    )]
    pub github_output: Option<PathBuf>,

    #[arg(
        long = "dry-run",
        env = "TRIAGE_DRY_RUN",
        default_value_t = false,
        help = "Run every turn but print the comment instead of posting it"
    )]
    pub dry_run: bool,
}
