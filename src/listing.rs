//! Remote repository listing abstraction
//!
//! This module defines the boundary between the reconciliation engine and
//! whatever service enumerates an account's remote repositories. The engine
//! only ever sees [`RemoteRepository`] values; the production implementation
//! lives in [`crate::github`] and tests substitute an in-memory lister.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::Account;

/// One remote repository as reported by a listing call.
///
/// Transient: rebuilt on every listing, never persisted. The `full_name`
/// (e.g. "owner/repo") is the addressing key into the mirror store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepository {
    pub full_name: String,
    pub clone_url: String,
}

/// Failure to enumerate one account's repositories.
///
/// Authentication failures are distinguished from transport failures so the
/// driver can attribute them to the account.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("authentication failed for account {account}: {message}")]
    Auth { account: String, message: String },

    #[error("failed to list repositories for account {account}: {reason:#}")]
    Transport {
        account: String,
        reason: anyhow::Error,
    },
}

impl ListingError {
    /// The account this failure is attributed to
    pub fn account(&self) -> &str {
        match self {
            ListingError::Auth { account, .. } => account,
            ListingError::Transport { account, .. } => account,
        }
    }
}

/// Provider-agnostic repository lister
#[async_trait]
pub trait RepositoryLister: Send + Sync {
    /// Enumerate every remote repository owned by `account`
    async fn list_repositories(
        &self,
        account: &Account,
    ) -> Result<Vec<RemoteRepository>, ListingError>;
}
