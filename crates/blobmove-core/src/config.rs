//! Run configuration, extracted once from the orchestrator's property map.
//!
//! The orchestrator hands over a flat JSON object of already-resolved values.
//! Extraction happens exactly once, before any store is opened; after that the
//! run never branches on metadata shape again.

use serde::Deserialize;

use crate::errors::{ActivityError, ActivityResult};

/// How the boundary treats per-item failures in an otherwise finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailurePolicy {
    /// Item failures are reported in the summary; the run still completes.
    #[default]
    TolerateItemFailures,
    /// Any item failure fails the whole activity.
    FailOnAnyItem,
}

/// Connection descriptor for one store. The orchestrator's polymorphic
/// linked-service shapes collapse into this tagged form during extraction.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ConnectionDescriptor {
    /// Full connection string, credentials embedded.
    #[serde(rename_all = "camelCase")]
    ConnectionString { connection_string: String },
    /// Service-principal identity; the secret is resolved through the
    /// credential provider by reference, never carried in the metadata.
    #[serde(rename_all = "camelCase")]
    ServicePrincipal {
        account: String,
        tenant: String,
        client_id: String,
        secret_ref: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SourceSpec {
    pub connection: ConnectionDescriptor,
    pub container: String,
    /// Key prefix to enumerate. Empty means the whole container.
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DestinationSpec {
    pub connection: ConnectionDescriptor,
    pub path: String,
}

fn default_parallelism() -> usize {
    1
}

/// Immutable configuration for one run.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RunConfig {
    pub source: SourceSpec,
    pub destination: DestinationSpec,
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl RunConfig {
    /// Extract a run configuration from the orchestrator-supplied properties.
    /// Any missing or malformed required field is a `Configuration` error
    /// naming the problem; no store has been opened at that point.
    pub fn from_properties(properties: &serde_json::Value) -> ActivityResult<Self> {
        let config: RunConfig = serde_json::from_value(properties.clone())
            .map_err(|err| ActivityError::configuration(format!("invalid properties: {err}")))?;
        if config.parallelism == 0 {
            return Err(ActivityError::configuration(
                "parallelism must be at least 1",
            ));
        }
        Ok(config)
    }
}
