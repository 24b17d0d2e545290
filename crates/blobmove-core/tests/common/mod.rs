use std::sync::Arc;

use blobmove_core::activity::StoreProvider;
use blobmove_core::config::RunConfig;
use blobmove_core::credentials::Credential;
use blobmove_core::errors::ActivityResult;
use blobmove_core::memory::MemoryStore;
use blobmove_core::store::{DestinationStore, SourceStore};

/// Provider over a fixed pair of in-memory stores.
pub struct MemoryProvider {
    pub source: Arc<MemoryStore>,
    pub destination: Arc<MemoryStore>,
}

#[async_trait::async_trait]
impl StoreProvider for MemoryProvider {
    async fn open_source(
        &self,
        _config: &RunConfig,
        _credential: &Credential,
    ) -> ActivityResult<Arc<dyn SourceStore>> {
        Ok(self.source.clone())
    }

    async fn open_destination(
        &self,
        _config: &RunConfig,
        _credential: &Credential,
    ) -> ActivityResult<Arc<dyn DestinationStore>> {
        Ok(self.destination.clone())
    }
}

/// Orchestrator-style properties: connection-string source,
/// service-principal destination.
pub fn properties(source_path: &str, destination_path: &str) -> serde_json::Value {
    serde_json::json!({
        "source": {
            "connection": {
                "kind": "connectionString",
                "connectionString": "AccountName=srcacct;AccountKey=unused"
            },
            "container": "landing",
            "path": source_path
        },
        "destination": {
            "connection": {
                "kind": "servicePrincipal",
                "account": "lake",
                "tenant": "contoso.example",
                "clientId": "app-1",
                "secretRef": "lake-secret"
            },
            "path": destination_path
        }
    })
}
