//! Repository reconciliation engine
//!
//! One reconciliation brings a single local mirror in line with its remote
//! counterpart: clone when the mirror is absent, fetch when it is present,
//! report "up to date" when the remote had nothing new. Whether to clone or
//! fetch is decided purely from local filesystem presence; a directory that
//! exists but is not a valid mirror is a reported failure, never repaired or
//! deleted here. Each invocation is self-contained: it touches exactly one
//! mirror path and shares no state with sibling reconciliations.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Account;
use crate::git::{FetchStatus, GitClient};
use crate::listing::RemoteRepository;
use crate::store::{MirrorState, MirrorStore};

/// Per-repository reconciliation failure, recovered at the repository
/// boundary and retried on the next scheduled pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("invalid repository name {full_name}: {message}")]
    Address { full_name: String, message: String },

    #[error("cannot check for existence of {}", path.display())]
    Probe {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot clone {url}: {reason:#}")]
    Clone { url: String, reason: anyhow::Error },

    /// The path exists but is not a valid mirror. Recurs on every pass until
    /// externally corrected.
    #[error("existing directory {} is not a valid mirror", path.display())]
    DegenerateMirror { path: PathBuf },

    #[error("cannot fetch {full_name}: {reason:#}")]
    Fetch {
        full_name: String,
        reason: anyhow::Error,
    },
}

/// Outcome of reconciling one repository
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// A new mirror was cloned
    Created,
    /// The existing mirror received new refs
    Refreshed,
    /// The remote had nothing new since the last pass
    UpToDate,
    /// Reconciliation failed; the mirror's state is unchanged
    Failed(ReconcileError),
}

impl ReconcileOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ReconcileOutcome::Failed(_))
    }
}

/// Per-repository result of one reconciliation pass
#[derive(Debug)]
pub struct RunResult {
    pub full_name: String,
    /// Resolved mirror path; `None` only when the name itself was invalid
    pub path: Option<PathBuf>,
    pub outcome: ReconcileOutcome,
}

/// The reconciliation engine for one (account, repository) pair at a time
#[derive(Debug, Clone)]
pub struct Reconciler {
    store: MirrorStore,
    git: GitClient,
}

impl Reconciler {
    pub fn new(store: MirrorStore, git: GitClient) -> Self {
        Self { store, git }
    }

    pub fn store(&self) -> &MirrorStore {
        &self.store
    }

    /// Reconcile one remote repository against the mirror store.
    ///
    /// Never panics and never returns `Err`: every failure is folded into
    /// the result so sibling reconciliations are unaffected.
    pub async fn reconcile(&self, account: &Account, remote: &RemoteRepository) -> RunResult {
        let path = match self.store.mirror_path(&remote.full_name) {
            Ok(path) => path,
            Err(e) => {
                let error = ReconcileError::Address {
                    full_name: remote.full_name.clone(),
                    message: format!("{:#}", e),
                };
                warn!("Reconciliation of {} failed: {:#}", remote.full_name, error);
                return RunResult {
                    full_name: remote.full_name.clone(),
                    path: None,
                    outcome: ReconcileOutcome::Failed(error),
                };
            }
        };

        let outcome = match self.run(account, remote, &path).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!("Reconciliation of {} failed: {:#}", remote.full_name, error);
                ReconcileOutcome::Failed(error)
            }
        };

        RunResult {
            full_name: remote.full_name.clone(),
            path: Some(path),
            outcome,
        }
    }

    async fn run(
        &self,
        account: &Account,
        remote: &RemoteRepository,
        path: &Path,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let state = self
            .store
            .probe(path)
            .map_err(|source| ReconcileError::Probe {
                path: path.to_path_buf(),
                source,
            })?;

        match state {
            MirrorState::Absent => {
                debug!("Mirror absent, cloning: {}", remote.full_name);

                self.store
                    .ensure_parent(path)
                    .await
                    .map_err(|e| ReconcileError::Clone {
                        url: remote.clone_url.clone(),
                        reason: anyhow::Error::new(e)
                            .context("Failed to create parent directory"),
                    })?;

                self.git
                    .clone_mirror(account, &remote.clone_url, path)
                    .await
                    .map_err(|reason| ReconcileError::Clone {
                        url: remote.clone_url.clone(),
                        reason,
                    })?;

                info!("Created mirror: {}", remote.full_name);
                Ok(ReconcileOutcome::Created)
            }

            MirrorState::Present => {
                if !self.store.looks_like_mirror(path) {
                    return Err(ReconcileError::DegenerateMirror {
                        path: path.to_path_buf(),
                    });
                }

                let status = self
                    .git
                    .fetch_mirror(account, &remote.clone_url, path)
                    .await
                    .map_err(|reason| ReconcileError::Fetch {
                        full_name: remote.full_name.clone(),
                        reason,
                    })?;

                match status {
                    FetchStatus::Updated => {
                        info!("Refreshed mirror: {}", remote.full_name);
                        Ok(ReconcileOutcome::Refreshed)
                    }
                    FetchStatus::UpToDate => {
                        debug!("Mirror already up to date: {}", remote.full_name);
                        Ok(ReconcileOutcome::UpToDate)
                    }
                }
            }
        }
    }
}
