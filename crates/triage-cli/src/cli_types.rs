use clap::ValueEnum;
use triage_ai::OpenAiAuthScheme;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliOpenAiAuthScheme {
    ApiKey,
    Bearer,
}

impl From<CliOpenAiAuthScheme> for OpenAiAuthScheme {
    fn from(value: CliOpenAiAuthScheme) -> Self {
        match value {
            CliOpenAiAuthScheme::ApiKey => OpenAiAuthScheme::ApiKeyHeader,
            CliOpenAiAuthScheme::Bearer => OpenAiAuthScheme::Bearer,
        }
    }
}
