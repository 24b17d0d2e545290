//! Credential acquisition against the identity collaborator.
//!
//! The boundary calls this once per store at setup. Real deployments back it
//! with a token service; tests and filesystem deployments use the static
//! provider.

use std::collections::HashMap;

use log::info;

use crate::config::ConnectionDescriptor;
use crate::errors::{ActivityError, ActivityResult};

/// Resolved credential usable to open a store. Opaque to everything but the
/// store provider; `Debug` deliberately omits the secret.
#[derive(Clone)]
pub struct Credential {
    pub account: String,
    pub secret: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

/// Turns a connection descriptor into a usable credential, or fails with an
/// `Auth` error. Black box from the core's point of view.
pub trait CredentialProvider: Send + Sync {
    fn resolve(&self, descriptor: &ConnectionDescriptor) -> ActivityResult<Credential>;
}

/// Provider backed by a fixed map of secret references.
#[derive(Default)]
pub struct StaticCredentialProvider {
    secrets: HashMap<String, String>,
}

impl StaticCredentialProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, secret_ref: impl Into<String>, secret: impl Into<String>) -> Self {
        self.secrets.insert(secret_ref.into(), secret.into());
        self
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn resolve(&self, descriptor: &ConnectionDescriptor) -> ActivityResult<Credential> {
        match descriptor {
            ConnectionDescriptor::ConnectionString { connection_string } => {
                let account = parse_account(connection_string).ok_or_else(|| {
                    ActivityError::auth("connection string carries no account name")
                })?;
                info!("resolved connection-string credential for {account}");
                Ok(Credential {
                    account,
                    secret: connection_string.clone(),
                })
            }
            ConnectionDescriptor::ServicePrincipal {
                account,
                tenant,
                client_id,
                secret_ref,
            } => {
                let secret = self.secrets.get(secret_ref).ok_or_else(|| {
                    ActivityError::auth(format!(
                        "no secret for reference '{secret_ref}' (tenant {tenant}, client {client_id})"
                    ))
                })?;
                info!("resolved service-principal credential for {account}");
                Ok(Credential {
                    account: account.clone(),
                    secret: secret.clone(),
                })
            }
        }
    }
}

/// Pull the account name out of a `key=value;...` connection string.
fn parse_account(connection_string: &str) -> Option<String> {
    connection_string.split(';').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("accountname") || key.trim().eq_ignore_ascii_case("acct")
        {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}
