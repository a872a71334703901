use std::path::Path;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use triage_ai::{OpenAiAuthScheme, OpenAiClient, OpenAiConfig};
use triage_core::{
    run_issue_triage, Classification, ContentGuard, FallbackReason, TokioTurnDelay, TriageError,
    TriageRunReport, TriageRunRequest, TurnProtocolConfig,
};
use triage_github::{GithubApiClient, IssueTracker, RepoRef};

const ISSUE_NUMBER: u64 = 7;
const FILE_BLOCK_MARKER: &str = "## Requested File Contents";

struct Harness {
    chat: MockServer,
    github: MockServer,
    repo: TempDir,
}

impl Harness {
    fn new() -> Self {
        let repo = tempdir().expect("tempdir");
        write_file(repo.path(), "src/a.py", "def update():\n    return 'v6'\n");
        let harness = Self {
            chat: MockServer::start(),
            github: MockServer::start(),
            repo,
        };
        harness.github.mock(|when, then| {
            when.method(GET)
                .path(format!("/repos/acme/ddns/issues/{ISSUE_NUMBER}"))
                .header("authorization", "Bearer gh-token");
            then.status(200).json_body(json!({
                "number": ISSUE_NUMBER,
                "title": "IPv6 record not updated",
                "body": "The AAAA record keeps the old address.",
                "user": {"login": "reporter"},
                "labels": [{"name": "needs-triage"}]
            }));
        });
        harness
    }

    fn github_client(&self) -> GithubApiClient {
        GithubApiClient::new(
            self.github.base_url(),
            "gh-token".to_string(),
            RepoRef::parse("acme/ddns").expect("repo"),
            5_000,
        )
        .expect("github client")
    }

    fn chat_client(&self) -> OpenAiClient {
        OpenAiClient::new(OpenAiConfig {
            api_url: format!("{}/openai/deployments/triage", self.chat.base_url()),
            api_key: "ai-key".to_string(),
            auth_scheme: OpenAiAuthScheme::ApiKeyHeader,
            request_timeout_ms: 5_000,
        })
        .expect("chat client")
    }

    async fn run(&self) -> Result<TriageRunReport, TriageError> {
        let github = self.github_client();
        let issue = github.get_issue(ISSUE_NUMBER).await.expect("issue");
        let client = self.chat_client();
        let guard = ContentGuard::new(self.repo.path());
        let config = TurnProtocolConfig {
            system_prompt: "You are the issue assistant.".to_string(),
            model: None,
            turn_delay: Duration::ZERO,
        };
        run_issue_triage(TriageRunRequest {
            issue: &issue,
            client: &client,
            guard: &guard,
            delay: &TokioTurnDelay,
            tracker: Some(&github as &dyn IssueTracker),
            config: &config,
        })
        .await
    }
}

fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(path, contents).expect("write fixture");
}

fn chat_reply(content: &str) -> Value {
    json!({
        "choices": [{"message": {"role": "assistant", "content": content}, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

const CHAT_PATH: &str = "/openai/deployments/triage/chat/completions";

#[tokio::test]
async fn integration_scenario_files_then_answer_posts_comment_and_label() {
    let harness = Harness::new();
    let first_turn = harness.chat.mock(|when, then| {
        when.method(POST)
            .path(CHAT_PATH)
            .header("api-key", "ai-key")
            .body_includes("IPv6 record not updated")
            .body_excludes(FILE_BLOCK_MARKER);
        then.status(200)
            .json_body(chat_reply(r#"{"requested_files": ["src/a.py"]}"#));
    });
    let second_turn = harness.chat.mock(|when, then| {
        when.method(POST)
            .path(CHAT_PATH)
            .body_includes(FILE_BLOCK_MARKER)
            .body_includes("def update():");
        then.status(200).json_body(chat_reply(
            r#"{"classification": "bug", "response": "Fixed in v2"}"#,
        ));
    });
    let comment = harness.github.mock(|when, then| {
        when.method(POST)
            .path(format!("/repos/acme/ddns/issues/{ISSUE_NUMBER}/comments"))
            .json_body(json!({"body": "Fixed in v2"}));
        then.status(201)
            .json_body(json!({"id": 501, "html_url": "https://github.com/acme/ddns/issues/7#c501"}));
    });
    let labels = harness.github.mock(|when, then| {
        when.method(POST)
            .path(format!("/repos/acme/ddns/issues/{ISSUE_NUMBER}/labels"))
            .json_body(json!({"labels": ["bug"]}));
        then.status(200).json_body(json!([{"name": "bug"}]));
    });

    let report = harness.run().await.expect("triage run");

    first_turn.assert_hits(1);
    second_turn.assert_hits(1);
    comment.assert_hits(1);
    labels.assert_hits(1);
    assert_eq!(report.comment_body, "Fixed in v2");
    assert_eq!(report.classification, Some(Classification::Bug));
    assert_eq!(report.comment_id, Some(501));
    assert!(report.label_applied);
}

#[tokio::test]
async fn integration_scenario_empty_first_turn_posts_fallback_without_label() {
    let harness = Harness::new();
    let chat = harness.chat.mock(|when, then| {
        when.method(POST).path(CHAT_PATH);
        then.status(200).json_body(chat_reply("{}"));
    });
    let comment = harness.github.mock(|when, then| {
        when.method(POST)
            .path(format!("/repos/acme/ddns/issues/{ISSUE_NUMBER}/comments"))
            .json_body(json!({"body": FallbackReason::NoRelevantFiles.message()}));
        then.status(201).json_body(json!({"id": 502}));
    });
    let labels = harness.github.mock(|when, then| {
        when.method(POST)
            .path(format!("/repos/acme/ddns/issues/{ISSUE_NUMBER}/labels"));
        then.status(200).json_body(json!([]));
    });

    let report = harness.run().await.expect("triage run");

    chat.assert_hits(1);
    comment.assert_hits(1);
    labels.assert_hits(0);
    assert_eq!(
        report.comment_body,
        "Unable to determine relevant files for this issue. Please provide more details."
    );
    assert_eq!(report.classification, None);
}

#[tokio::test]
async fn integration_scenario_malformed_second_turn_posts_raw_text_and_regex_label() {
    let harness = Harness::new();
    let raw = "Looks like a bug to me. Classification: bug";
    harness.chat.mock(|when, then| {
        when.method(POST)
            .path(CHAT_PATH)
            .body_excludes(FILE_BLOCK_MARKER);
        then.status(200)
            .json_body(chat_reply(r#"{"requested_files": ["src/a.py"]}"#));
    });
    harness.chat.mock(|when, then| {
        when.method(POST)
            .path(CHAT_PATH)
            .body_includes(FILE_BLOCK_MARKER);
        then.status(200).json_body(chat_reply(raw));
    });
    let comment = harness.github.mock(|when, then| {
        when.method(POST)
            .path(format!("/repos/acme/ddns/issues/{ISSUE_NUMBER}/comments"))
            .json_body(json!({"body": raw}));
        then.status(201).json_body(json!({"id": 503}));
    });
    let labels = harness.github.mock(|when, then| {
        when.method(POST)
            .path(format!("/repos/acme/ddns/issues/{ISSUE_NUMBER}/labels"))
            .json_body(json!({"labels": ["bug"]}));
        then.status(200).json_body(json!([{"name": "bug"}]));
    });

    let report = harness.run().await.expect("triage run");

    comment.assert_hits(1);
    labels.assert_hits(1);
    assert_eq!(report.comment_body, raw);
    assert_eq!(report.classification, Some(Classification::Bug));
}

#[tokio::test]
async fn integration_scenario_chat_server_error_fails_run_without_comment() {
    let harness = Harness::new();
    let chat = harness.chat.mock(|when, then| {
        when.method(POST).path(CHAT_PATH);
        then.status(500).body("upstream unavailable");
    });
    let comment = harness.github.mock(|when, then| {
        when.method(POST)
            .path(format!("/repos/acme/ddns/issues/{ISSUE_NUMBER}/comments"));
        then.status(201).json_body(json!({"id": 504}));
    });

    let error = harness.run().await.expect_err("server error is fatal");

    chat.assert_hits(1);
    comment.assert_hits(0);
    assert!(
        error.to_string().contains("500"),
        "unexpected error: {error}"
    );
}

#[tokio::test]
async fn integration_label_rejection_keeps_run_successful() {
    let harness = Harness::new();
    harness.chat.mock(|when, then| {
        when.method(POST).path(CHAT_PATH);
        then.status(200).json_body(chat_reply(
            r#"{"classification": "feature", "response": "Planned for the next release"}"#,
        ));
    });
    let comment = harness.github.mock(|when, then| {
        when.method(POST)
            .path(format!("/repos/acme/ddns/issues/{ISSUE_NUMBER}/comments"));
        then.status(201).json_body(json!({"id": 505}));
    });
    let labels = harness.github.mock(|when, then| {
        when.method(POST)
            .path(format!("/repos/acme/ddns/issues/{ISSUE_NUMBER}/labels"));
        then.status(422).json_body(json!({"message": "Validation Failed"}));
    });

    let report = harness.run().await.expect("triage run");

    comment.assert_hits(1);
    labels.assert_hits(1);
    assert_eq!(report.classification, Some(Classification::Feature));
    assert!(!report.label_applied);
}
