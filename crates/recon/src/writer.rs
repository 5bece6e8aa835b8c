use std::fmt;

use crate::planner::UpsertBatch;

/// A batch the destination refused or never acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    /// HTTP status when the destination answered at all.
    pub status: Option<u16>,
    pub message: String,
}

impl WriteFailure {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(f, "HTTP {code}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for WriteFailure {}

/// Destination for upsert batches.
///
/// Implementations must treat a batch as an upsert on the batch's conflict
/// key: existing rows with the same key are overwritten, never summed.
pub trait FactWriter {
    fn write_batch(&mut self, table: &str, batch: &UpsertBatch) -> Result<(), WriteFailure>;
}

/// Keeps every batch it is given, in memory.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    pub batches: Vec<UpsertBatch>,
    /// Batch indices to refuse, for exercising failure paths.
    pub fail_on: Vec<usize>,
}

impl FactWriter for MemoryWriter {
    fn write_batch(&mut self, _table: &str, batch: &UpsertBatch) -> Result<(), WriteFailure> {
        if self.fail_on.contains(&batch.index) {
            return Err(WriteFailure::new(Some(500), "refused"));
        }
        self.batches.push(batch.clone());
        Ok(())
    }
}
