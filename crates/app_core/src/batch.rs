//! Per-item results of best-effort batch operations

use crate::AppError;

/// One item that could not be processed
#[derive(Debug)]
pub struct BatchFailure {
    pub id: String,
    pub error: AppError,
}

/// Result of a batch call. A batch never aborts on a single item.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Items processed successfully
    pub completed: Vec<String>,
    /// Items that no longer existed; not an error from the user's view
    pub skipped: Vec<String>,
    pub failed: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn complete(&mut self, id: impl Into<String>) {
        self.completed.push(id.into());
    }

    pub fn skip(&mut self, id: impl Into<String>) {
        self.skipped.push(id.into());
    }

    pub fn fail(&mut self, id: impl Into<String>, error: impl Into<AppError>) {
        self.failed.push(BatchFailure {
            id: id.into(),
            error: error.into(),
        });
    }

    /// Fold another outcome into this one
    pub fn merge(&mut self, other: BatchOutcome) {
        self.completed.extend(other.completed);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// First failure, for callers that surface a single message
    pub fn first_error(&self) -> Option<&AppError> {
        self.failed.first().map(|f| &f.error)
    }
}
