//! Synchronization driver
//!
//! Fans the reconciler out over every account and every repository. Accounts
//! run concurrently; within an account, repository reconciliations run
//! concurrently under a shared parallelism bound. A listing failure ends only
//! that account's pass, a reconciliation failure affects only its repository,
//! and the driver drains every outstanding future before compiling the
//! summary, so completion of `run_all` means all work has finished.

use anyhow::Result;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::config::{Account, Config};
use crate::git::GitClient;
use crate::github::GitHubLister;
use crate::listing::{ListingError, RepositoryLister};
use crate::reconcile::{ReconcileOutcome, Reconciler, RunResult};
use crate::store::MirrorStore;

/// Results from one complete reconciliation pass
#[derive(Debug)]
pub struct SyncSummary {
    pub accounts: usize,
    pub total_repositories: usize,
    pub created: usize,
    pub refreshed: usize,
    pub up_to_date: usize,
    pub failed: usize,
    pub listing_failures: Vec<ListingError>,
    pub duration: Duration,
    pub results: Vec<RunResult>,
}

impl SyncSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || !self.listing_failures.is_empty()
    }
}

/// The synchronization driver that orchestrates a full pass
#[derive(Clone)]
pub struct SyncEngine {
    config: Arc<Config>,
    accounts: Vec<Account>,
    lister: Arc<dyn RepositoryLister>,
    reconciler: Reconciler,
}

impl SyncEngine {
    /// Create an engine backed by the GitHub lister.
    ///
    /// Fails when the credential set is malformed or missing: the process
    /// does not start without at least one well-formed account.
    pub fn new(config: Config) -> Result<Self> {
        let accounts = config.accounts()?;
        Ok(Self::with_lister(
            config,
            accounts,
            Arc::new(GitHubLister::new()),
        ))
    }

    /// Create an engine with an explicit account set and lister
    pub fn with_lister(
        config: Config,
        accounts: Vec<Account>,
        lister: Arc<dyn RepositoryLister>,
    ) -> Self {
        let reconciler = Reconciler::new(MirrorStore::new(&config.mirror_root), GitClient::new());

        Self {
            config: Arc::new(config),
            accounts,
            lister,
            reconciler,
        }
    }

    /// Run one full reconciliation pass over every account.
    ///
    /// Returns only after every spawned unit of work has finished, success
    /// or failure.
    pub async fn run_all(&self) -> SyncSummary {
        let start_time = Instant::now();

        info!(
            "Starting reconciliation pass for {} accounts",
            self.accounts.len()
        );

        let semaphore = Arc::new(Semaphore::new(self.config.sync.max_parallel.max(1)));

        let mut account_futures = FuturesUnordered::new();
        for account in &self.accounts {
            let lister = Arc::clone(&self.lister);
            let reconciler = self.reconciler.clone();
            let semaphore = Arc::clone(&semaphore);
            let account = account.clone();

            account_futures
                .push(async move { Self::run_account(account, lister, reconciler, semaphore).await });
        }

        let mut results = Vec::new();
        let mut listing_failures = Vec::new();

        while let Some(account_results) = account_futures.next().await {
            match account_results {
                Ok(mut account_results) => results.append(&mut account_results),
                Err(e) => {
                    error!("Skipping account {}: {:#}", e.account(), e);
                    listing_failures.push(e);
                }
            }
        }

        let summary = self.compile_summary(results, listing_failures, start_time.elapsed());

        info!(
            "Pass completed in {:.2}s: {} repositories, {} created, {} refreshed, {} up to date, {} failed",
            summary.duration.as_secs_f64(),
            summary.total_repositories,
            summary.created,
            summary.refreshed,
            summary.up_to_date,
            summary.failed
        );

        summary
    }

    /// List and reconcile every repository of one account.
    ///
    /// A listing failure aborts this account only; reconciliation failures
    /// are already folded into their `RunResult`.
    async fn run_account(
        account: Account,
        lister: Arc<dyn RepositoryLister>,
        reconciler: Reconciler,
        semaphore: Arc<Semaphore>,
    ) -> Result<Vec<RunResult>, ListingError> {
        let repositories = lister.list_repositories(&account).await?;

        info!(
            "Account {}: reconciling {} repositories",
            account.username,
            repositories.len()
        );

        let mut futures = FuturesUnordered::new();
        for repository in repositories {
            let reconciler = reconciler.clone();
            let semaphore = Arc::clone(&semaphore);
            let account = account.clone();

            futures.push(async move {
                let _permit = semaphore.acquire().await.expect("Semaphore closed");
                reconciler.reconcile(&account, &repository).await
            });
        }

        let mut results = Vec::new();
        while let Some(result) = futures.next().await {
            results.push(result);
        }

        Ok(results)
    }

    /// Compile the pass summary from per-repository results
    fn compile_summary(
        &self,
        results: Vec<RunResult>,
        listing_failures: Vec<ListingError>,
        duration: Duration,
    ) -> SyncSummary {
        let total_repositories = results.len();
        let mut created = 0;
        let mut refreshed = 0;
        let mut up_to_date = 0;
        let mut failed = 0;

        for result in &results {
            match result.outcome {
                ReconcileOutcome::Created => created += 1,
                ReconcileOutcome::Refreshed => refreshed += 1,
                ReconcileOutcome::UpToDate => up_to_date += 1,
                ReconcileOutcome::Failed(_) => failed += 1,
            }
        }

        SyncSummary {
            accounts: self.accounts.len(),
            total_repositories,
            created,
            refreshed,
            up_to_date,
            failed,
            listing_failures,
            duration,
            results,
        }
    }

    /// Get configuration for external inspection
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The account set this engine drives
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// The lister this engine enumerates repositories with
    pub fn lister(&self) -> &Arc<dyn RepositoryLister> {
        &self.lister
    }
}
