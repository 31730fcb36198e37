use std::fmt;

use thiserror::Error;

/// Failure of one upstream call. Recovered by the fan-out aggregator,
/// request-fatal everywhere else.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamFetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("upstream responded with status {0}")]
    Status(u16),
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl UpstreamFetchError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }

    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Status(_) => "status",
            Self::Malformed(_) => "malformed",
        }
    }
}

/// A task that did not produce a value, keyed by its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub id: String,
    pub error: UpstreamFetchError,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.error)
    }
}

/// Every task of a non-empty aggregation failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("all {} fetch tasks failed: {}", .failures.len(), join_failures(.failures))]
pub struct AggregateError {
    pub failures: Vec<TaskFailure>,
}

impl AggregateError {
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failures.iter().map(|failure| failure.id.as_str()).collect()
    }
}

fn join_failures(failures: &[TaskFailure]) -> String {
    failures
        .iter()
        .map(|failure| failure.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
