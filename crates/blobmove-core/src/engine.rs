//! Bulk copy engine: enumerate, stream each object across, isolate per-item
//! failures, report one outcome per enumerated object.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use log::{info, warn};

use crate::errors::{ActivityError, ActivityResult};
use crate::store::{DestinationStore, ObjectRef, SourceStore};

/// One copy attempt. Ephemeral; built per enumerated object.
#[derive(Debug, Clone)]
pub struct TransferTask {
    pub source: ObjectRef,
    pub destination_path: String,
}

#[derive(Debug, Clone)]
pub enum TransferStatus {
    Success,
    Failed(ActivityError),
}

/// Outcome of one task. The batch produces exactly one per enumerated object.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub task: TransferTask,
    pub status: TransferStatus,
    pub bytes_copied: u64,
}

impl TransferOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, TransferStatus::Success)
    }
}

/// Aggregate report of one run. Outcomes are in enumeration order and
/// `succeeded + failed == total == outcomes.len()` always holds.
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub bytes_copied: u64,
    pub outcomes: Vec<TransferOutcome>,
    pub duration: Duration,
}

impl RunResult {
    fn from_outcomes(outcomes: Vec<TransferOutcome>, duration: Duration) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.succeeded()).count();
        let bytes_copied = outcomes.iter().map(|o| o.bytes_copied).sum();
        Self {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            bytes_copied,
            outcomes,
            duration,
        }
    }

    /// Failure reasons, one line per failed object.
    pub fn failure_lines(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.status {
                TransferStatus::Failed(err) => {
                    Some(format!("{}: {err}", o.task.source.path))
                }
                TransferStatus::Success => None,
            })
            .collect()
    }
}

/// Destination key for one object: the destination prefix plus the object's
/// relative name. An empty relative name (the prefix itself names an object)
/// maps to the destination prefix unchanged, with no trailing separator.
fn destination_path_for(destination_prefix: &str, relative_name: &str) -> String {
    let prefix = destination_prefix.trim_end_matches('/');
    if relative_name.is_empty() {
        prefix.to_string()
    } else if prefix.is_empty() {
        relative_name.to_string()
    } else {
        format!("{prefix}/{relative_name}")
    }
}

/// Orchestrates one bulk copy. Store handles are shared read-only across
/// tasks; the per-task read stream is the only owned mutable resource.
pub struct TransferEngine {
    source: Arc<dyn SourceStore>,
    destination: Arc<dyn DestinationStore>,
    parallelism: usize,
}

impl TransferEngine {
    pub fn new(source: Arc<dyn SourceStore>, destination: Arc<dyn DestinationStore>) -> Self {
        Self {
            source,
            destination,
            parallelism: 1,
        }
    }

    /// Allow up to `parallelism` tasks in flight. Outcomes stay in
    /// enumeration order regardless.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Copy every object under `source_prefix` to `destination_prefix`.
    ///
    /// A listing failure fails the whole run with no partial result. After
    /// that, each task's failure is captured in its outcome and the batch
    /// continues; nothing a single object does can abort its siblings.
    pub async fn copy_all(
        &self,
        source_prefix: &str,
        destination_prefix: &str,
    ) -> ActivityResult<RunResult> {
        let start = Instant::now();
        let objects = self.source.list(source_prefix).await?;
        info!(
            "copying {} objects from '{source_prefix}' to '{destination_prefix}'",
            objects.len()
        );

        let tasks: Vec<TransferTask> = objects
            .into_iter()
            .map(|object| TransferTask {
                destination_path: destination_path_for(
                    destination_prefix,
                    object.relative_name(source_prefix),
                ),
                source: object,
            })
            .collect();

        let outcomes = if self.parallelism > 1 {
            // buffered() preserves input order, so the outcome sequence
            // matches enumeration order even when completions interleave.
            futures::stream::iter(tasks)
                .map(|task| self.run_task(task))
                .buffered(self.parallelism)
                .collect()
                .await
        } else {
            let mut outcomes = Vec::with_capacity(tasks.len());
            for task in tasks {
                outcomes.push(self.run_task(task).await);
            }
            outcomes
        };

        let result = RunResult::from_outcomes(outcomes, start.elapsed());
        info!(
            "run finished: {} succeeded, {} failed, {} bytes in {:?}",
            result.succeeded, result.failed, result.bytes_copied, result.duration
        );
        Ok(result)
    }

    async fn run_task(&self, task: TransferTask) -> TransferOutcome {
        match self.copy_object(&task).await {
            Ok(bytes_copied) => TransferOutcome {
                task,
                status: TransferStatus::Success,
                bytes_copied,
            },
            Err(err) => {
                warn!("failed to copy {}: {err}", task.source.path);
                TransferOutcome {
                    task,
                    status: TransferStatus::Failed(err),
                    bytes_copied: 0,
                }
            }
        }
    }

    async fn copy_object(&self, task: &TransferTask) -> ActivityResult<u64> {
        let stream = self.source.open_read_stream(&task.source).await?;
        // write_stream takes ownership of the stream; it is dropped and its
        // handle released on every exit path, including a failing write.
        self.destination
            .write_stream(&task.destination_path, stream)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_path_joins_relative_name() {
        assert_eq!(destination_path_for("dst", "a.txt"), "dst/a.txt");
        assert_eq!(destination_path_for("dst/", "b/c.txt"), "dst/b/c.txt");
    }

    #[test]
    fn empty_relative_name_uses_prefix_unchanged() {
        assert_eq!(destination_path_for("dst/report.csv", ""), "dst/report.csv");
        assert_eq!(destination_path_for("dst/", ""), "dst");
    }

    #[test]
    fn empty_destination_prefix_keeps_relative_name() {
        assert_eq!(destination_path_for("", "a/b.txt"), "a/b.txt");
    }

    #[test]
    fn run_result_counts_are_consistent() {
        let object = crate::store::ObjectRef {
            container: "c".into(),
            path: "a.txt".into(),
            size_hint: None,
        };
        let task = TransferTask {
            source: object,
            destination_path: "dst/a.txt".into(),
        };
        let outcomes = vec![
            TransferOutcome {
                task: task.clone(),
                status: TransferStatus::Success,
                bytes_copied: 5,
            },
            TransferOutcome {
                task,
                status: TransferStatus::Failed(ActivityError::not_found("a.txt")),
                bytes_copied: 0,
            },
        ];
        let result = RunResult::from_outcomes(outcomes, Duration::from_millis(1));
        assert_eq!(result.total, 2);
        assert_eq!(result.succeeded + result.failed, result.total);
        assert_eq!(result.total, result.outcomes.len());
        assert_eq!(result.bytes_copied, 5);
        assert_eq!(result.failure_lines().len(), 1);
    }
}
