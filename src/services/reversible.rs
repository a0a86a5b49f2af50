//! Undo tokens for destructive operations.

use async_trait::async_trait;
use serde::Serialize;

use crate::types::errors::BookmarkError;

/// Outcome of a best-effort reversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReverseReport {
    /// Rows written back.
    pub restored: usize,
    /// Rows left out because they conflicted with the current state.
    pub skipped: usize,
}

impl ReverseReport {
    pub fn is_complete(&self) -> bool {
        self.skipped == 0
    }
}

/// A handle that puts back what an operation removed.
///
/// Restoration is best-effort per item: items that can no longer be restored
/// are skipped and counted in the report instead of failing the whole call.
#[async_trait]
pub trait ReversibleHandle: Send + Sync {
    async fn reverse(&self) -> Result<ReverseReport, BookmarkError>;
}
