use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::driver::SnapshotProvider;
use crate::models::CycleSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Failed to read snapshot file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Malformed snapshot record on line {line}: {source}")]
    ParseError {
        line: usize,
        source: serde_json::Error,
    },
    #[error("Snapshot file contains no records")]
    Empty,
}

/// Feeds the control loop from a recording of cycle snapshots, one JSON
/// object per line. When the recording runs out it wraps around to the start.
pub struct ReplayProvider {
    snapshots: Vec<CycleSnapshot>,
    next: AtomicUsize,
}

impl ReplayProvider {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ReplayError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_jsonl(&content)
    }

    pub fn from_jsonl(content: &str) -> Result<Self, ReplayError> {
        let mut snapshots = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let snapshot = serde_json::from_str(line)
                .map_err(|source| ReplayError::ParseError { line: idx + 1, source })?;
            snapshots.push(snapshot);
        }
        if snapshots.is_empty() {
            return Err(ReplayError::Empty);
        }
        Ok(Self {
            snapshots,
            next: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl SnapshotProvider for ReplayProvider {
    fn snapshot(&self) -> CycleSnapshot {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.snapshots.len();
        self.snapshots[idx].clone()
    }
}
