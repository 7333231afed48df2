use thiserror::Error;

/// Failure talking to the chat-completions endpoint.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM API key not set")]
    MissingApiKey,
    #[error("LLM request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("LLM HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("LLM response had no message content")]
    EmptyChoice,
}

/// Failure opening the store or running a statement against it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot open database {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("SQL error: {source} (query: {query})")]
    Query {
        query: String,
        #[source]
        source: rusqlite::Error,
    },
}

/// Outcomes of a request that are not a table or a scalar.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No user message provided")]
    MissingMessage,
    #[error("No valid SQL query found in the response")]
    NoValidQuery { raw: String },
    #[error("No results found for the SQL query")]
    NoResults,
    #[error("result set is missing column(s): {}", .missing.join(", "))]
    MalformedRecords { missing: Vec<String> },
    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl PipelineError {
    /// Machine-readable reason carried in error responses.
    pub fn reason(&self) -> &'static str {
        match self {
            PipelineError::MissingMessage => "missing_message",
            PipelineError::NoValidQuery { .. } => "no_valid_query",
            PipelineError::NoResults => "no_results",
            PipelineError::MalformedRecords { .. } => "malformed_records",
            PipelineError::Llm(_) => "llm_failure",
        }
    }
}
