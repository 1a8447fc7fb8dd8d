//! MirrorKeep - Git Repository Mirror Backup Daemon
//!
//! MirrorKeep keeps bare mirror copies of every repository owned by a set of
//! GitHub accounts on local disk, cloning new repositories and fetching
//! existing ones on a schedule without re-downloading history that is
//! already present.
//!
//! ## Core Features
//!
//! - **Reconciliation Engine**: per-repository clone / fetch / up-to-date
//!   decisions driven by local mirror state
//! - **Failure Isolation**: one bad repository or account never blocks its
//!   siblings
//! - **Multi-Account**: an ordered credential set, each account mirrored
//!   concurrently
//! - **Scheduling**: immediate pass at startup, then daily-at-midnight or a
//!   configured interval
//!
//! ## Modules
//!
//! - [`config`]: Configuration management and credential parsing
//! - [`listing`]: Remote repository listing boundary
//! - [`github`]: GitHub API lister
//! - [`store`]: Mirror store addressing and state probing
//! - [`git`]: Git transport (mirror clone / fetch)
//! - [`reconcile`]: The per-repository reconciliation engine
//! - [`sync`]: The synchronization driver
//! - [`daemon`]: Trigger loop and graceful shutdown

pub mod config;
pub mod daemon;
pub mod git;
pub mod github;
pub mod health;
pub mod listing;
pub mod reconcile;
pub mod store;
pub mod sync;

pub use config::{Account, Config};
pub use daemon::Daemon;
pub use git::{FetchStatus, GitClient};
pub use github::GitHubLister;
pub use health::HealthCheck;
pub use listing::{ListingError, RemoteRepository, RepositoryLister};
pub use reconcile::{ReconcileError, ReconcileOutcome, Reconciler, RunResult};
pub use store::{MirrorState, MirrorStore};
pub use sync::{SyncEngine, SyncSummary};
