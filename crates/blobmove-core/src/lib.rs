//! One-shot bulk copy of objects from a flat source store to a hierarchical
//! destination, driven by an external orchestrator. Enumerates everything
//! under a source prefix, streams each object across, isolates per-item
//! failures, and reports an aggregate result.

pub mod activity;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod errors;
pub mod fs_store;
pub mod memory;
pub mod store;

pub use activity::{ActivityState, MoveActivity, StoreProvider};
pub use config::{ConnectionDescriptor, FailurePolicy, RunConfig};
pub use credentials::{Credential, CredentialProvider, StaticCredentialProvider};
pub use engine::{RunResult, TransferEngine, TransferOutcome, TransferStatus, TransferTask};
pub use errors::{ActivityError, ActivityResult};
pub use store::{ByteStream, DestinationStore, ObjectRef, SourceStore};
