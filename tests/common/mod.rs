/// Common test utilities and helpers for MirrorKeep tests
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use mirrorkeep::config::{Account, Config};
use mirrorkeep::listing::{ListingError, RemoteRepository, RepositoryLister};
use mirrorkeep::sync::SyncEngine;

/// Test fixture: a temp directory holding upstream repositories and the
/// mirror store root, plus real git invocations to build history.
pub struct Fixture {
    pub temp_dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::create_dir_all(temp_dir.path().join("mirrors"))
            .expect("Failed to create mirror root");
        Self { temp_dir }
    }

    pub fn mirror_root(&self) -> PathBuf {
        self.temp_dir.path().join("mirrors")
    }

    /// Create an upstream repository with one commit, returning its path
    pub fn create_upstream(&self, name: &str) -> PathBuf {
        let path = self.temp_dir.path().join("upstreams").join(name);
        std::fs::create_dir_all(&path).expect("Failed to create upstream dir");

        git(&path, &["init", "-q"]);
        std::fs::write(path.join("README.md"), format!("# {}\n", name))
            .expect("Failed to write README");
        git(&path, &["add", "."]);
        commit(&path, "initial commit");

        path
    }

    /// Add a new commit to an existing upstream repository
    pub fn add_commit(&self, upstream: &Path, file: &str) {
        std::fs::write(upstream.join(file), "more content\n").expect("Failed to write file");
        git(upstream, &["add", "."]);
        commit(upstream, &format!("add {}", file));
    }
}

/// Run a git command in `cwd`, panicking with stderr on failure
pub fn git(cwd: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("Failed to execute git");

    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );

    String::from_utf8_lossy(&output.stdout).to_string()
}

fn commit(cwd: &Path, message: &str) {
    git(
        cwd,
        &[
            "-c",
            "user.name=mirrorkeep-test",
            "-c",
            "user.email=test@mirrorkeep.invalid",
            "commit",
            "-q",
            "-m",
            message,
        ],
    );
}

/// Snapshot of every ref in a repository, for idempotence assertions
pub fn refs_snapshot(repo: &Path) -> String {
    git(repo, &["for-each-ref"])
}

pub fn account(username: &str) -> Account {
    Account {
        username: username.to_string(),
        secret: format!("{}-secret", username),
    }
}

pub fn remote(full_name: &str, clone_url: &Path) -> RemoteRepository {
    RemoteRepository {
        full_name: full_name.to_string(),
        clone_url: clone_url.display().to_string(),
    }
}

/// In-memory lister: fixed repository sets per account, with optional
/// per-account listing failures
#[derive(Default)]
pub struct StaticLister {
    repos: HashMap<String, Vec<RemoteRepository>>,
    failing: HashSet<String>,
}

impl StaticLister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repos(mut self, username: &str, repos: Vec<RemoteRepository>) -> Self {
        self.repos.insert(username.to_string(), repos);
        self
    }

    pub fn with_failure(mut self, username: &str) -> Self {
        self.failing.insert(username.to_string());
        self
    }
}

#[async_trait]
impl RepositoryLister for StaticLister {
    async fn list_repositories(
        &self,
        account: &Account,
    ) -> Result<Vec<RemoteRepository>, ListingError> {
        if self.failing.contains(&account.username) {
            return Err(ListingError::Auth {
                account: account.username.clone(),
                message: "credentials rejected".to_string(),
            });
        }

        Ok(self
            .repos
            .get(&account.username)
            .cloned()
            .unwrap_or_default())
    }
}

/// Build a sync engine over the fixture's mirror root with a static lister
pub fn engine(fixture: &Fixture, accounts: Vec<Account>, lister: StaticLister) -> SyncEngine {
    let mut config = Config::default();
    config.mirror_root = fixture.mirror_root().display().to_string();

    SyncEngine::with_lister(config, accounts, std::sync::Arc::new(lister))
}
