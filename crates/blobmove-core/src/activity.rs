//! Execution boundary the orchestrator invokes.
//!
//! One activity value serves exactly one trigger: configuration is extracted
//! once, stores are opened once, the engine runs to completion, and the result
//! becomes the orchestrator's completion signal — an ordered string map on
//! success, a typed error on fatal failure. No state survives across
//! invocations; the host may run this as a plain call, a worker process, or a
//! request handler without changing the contract.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{info, warn};

use crate::config::{FailurePolicy, RunConfig};
use crate::credentials::{Credential, CredentialProvider};
use crate::engine::{RunResult, TransferEngine};
use crate::errors::{ActivityError, ActivityResult};
use crate::store::{DestinationStore, SourceStore};

/// Lifecycle of one invocation. Completed and Failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityState {
    Idle,
    Configuring,
    Running,
    Completed,
    Failed,
}

/// Resolves store handles for a run. The seam between the boundary and
/// concrete backends; cloud and filesystem providers both fit behind it.
#[async_trait::async_trait]
pub trait StoreProvider: Send + Sync {
    async fn open_source(
        &self,
        config: &RunConfig,
        credential: &Credential,
    ) -> ActivityResult<Arc<dyn SourceStore>>;

    async fn open_destination(
        &self,
        config: &RunConfig,
        credential: &Credential,
    ) -> ActivityResult<Arc<dyn DestinationStore>>;
}

/// The bulk-move activity.
pub struct MoveActivity<P, C> {
    provider: P,
    credentials: C,
    state: ActivityState,
}

impl<P: StoreProvider, C: CredentialProvider> MoveActivity<P, C> {
    pub fn new(provider: P, credentials: C) -> Self {
        Self {
            provider,
            credentials,
            state: ActivityState::Idle,
        }
    }

    pub fn state(&self) -> ActivityState {
        self.state
    }

    /// Run the activity against orchestrator-supplied properties.
    ///
    /// Item failures leave the run Completed under the default policy; the
    /// summary reports them. Configuration, connection, and credential errors
    /// fail the activity outright, and the first two happen before any byte
    /// moves.
    pub async fn execute(
        &mut self,
        properties: &serde_json::Value,
    ) -> ActivityResult<BTreeMap<String, String>> {
        if self.state != ActivityState::Idle {
            return Err(ActivityError::configuration(
                "activity already executed; one invocation per trigger",
            ));
        }

        self.state = ActivityState::Configuring;
        let result = self.run(properties).await;
        match &result {
            Ok(_) => self.state = ActivityState::Completed,
            Err(err) => {
                warn!("activity failed: {err}");
                self.state = ActivityState::Failed;
            }
        }
        result
    }

    async fn run(
        &mut self,
        properties: &serde_json::Value,
    ) -> ActivityResult<BTreeMap<String, String>> {
        let config = RunConfig::from_properties(properties)?;

        self.state = ActivityState::Running;
        let source_credential = self.credentials.resolve(&config.source.connection)?;
        let destination_credential = self.credentials.resolve(&config.destination.connection)?;

        let source = self.provider.open_source(&config, &source_credential).await?;
        let destination = self
            .provider
            .open_destination(&config, &destination_credential)
            .await?;

        let engine =
            TransferEngine::new(source, destination).with_parallelism(config.parallelism);
        let result = engine
            .copy_all(&config.source.path, &config.destination.path)
            .await?;

        if config.failure_policy == FailurePolicy::FailOnAnyItem && result.failed > 0 {
            let first = result
                .failure_lines()
                .into_iter()
                .next()
                .unwrap_or_default();
            return Err(ActivityError::write(format!(
                "{} of {} transfers failed, first: {first}",
                result.failed, result.total
            )));
        }

        for line in result.failure_lines() {
            warn!("item failed: {line}");
        }
        info!(
            "activity completed: {}/{} objects copied",
            result.succeeded, result.total
        );
        Ok(summarize(&result))
    }
}

/// Completion signal: the counts the orchestrator records for the run.
fn summarize(result: &RunResult) -> BTreeMap<String, String> {
    let mut summary = BTreeMap::new();
    summary.insert("total".to_string(), result.total.to_string());
    summary.insert("succeeded".to_string(), result.succeeded.to_string());
    summary.insert("failed".to_string(), result.failed.to_string());
    summary.insert("bytesCopied".to_string(), result.bytes_copied.to_string());
    summary.insert(
        "durationMs".to_string(),
        result.duration.as_millis().to_string(),
    );
    summary
}
