// backend.rs — Collaborators the router dispatches to.
//
// ExecutionBackend : performs tasks (commands, conversation replies, …)
// SearchBackend    : read-only code/doc search for Query intents
//
// Both are optional: an absent backend is "unavailable" and the router
// answers deterministically instead.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RouterError;

/// One unit of work handed to the execution backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionTask {
    /// Category name, e.g. `"command"` or `"conversation"`.
    #[serde(rename = "type")]
    pub task_type: String,
    pub task: String,
    /// Route that produced the task.
    pub source: String,
    pub sender: String,
    pub channel: String,
    #[serde(rename = "targetFiles")]
    pub target_files: Vec<String>,
    /// Resolved autonomy tier.
    pub tier: String,
}

/// Performs a dispatched task and returns reply text.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn execute(&self, task: &ExecutionTask) -> Result<String, RouterError>;

    fn name(&self) -> &str;
}

/// A single search match: where it is and a short excerpt.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    /// File path or document title.
    pub location: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchResults {
    #[serde(rename = "codeHits", default)]
    pub code_hits: Vec<SearchHit>,
    #[serde(rename = "docHits", default)]
    pub doc_hits: Vec<SearchHit>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.code_hits.is_empty() && self.doc_hits.is_empty()
    }
}

/// Read-only code and documentation search.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<SearchResults, RouterError>;
}

#[derive(Debug, Deserialize)]
struct ExecuteReply {
    #[serde(default)]
    text: String,
}

/// Execution backend reached over HTTP.
///
/// POSTs the task as JSON and returns the `text` field of the reply.
pub struct HttpExecutionBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpExecutionBackend {
    /// POST tasks as JSON to `endpoint`; the reply's `text` field is the answer.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ExecutionBackend for HttpExecutionBackend {
    async fn execute(&self, task: &ExecutionTask) -> Result<String, RouterError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(task)
            .send()
            .await
            .map_err(|e| RouterError::Backend(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RouterError::Backend(format!("backend returned {status}")));
        }

        let reply: ExecuteReply = response
            .json()
            .await
            .map_err(|e| RouterError::Backend(format!("unreadable reply: {e}")))?;
        Ok(reply.text)
    }

    fn name(&self) -> &str {
        "http"
    }
}
