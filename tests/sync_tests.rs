//! End-to-end reconciliation tests
//!
//! These tests drive the full engine (driver -> reconciler -> mirror store)
//! against real local git repositories created in a tempdir, with an
//! in-memory lister standing in for the GitHub API.

mod common;

use common::{account, engine, refs_snapshot, remote, Fixture, StaticLister};
use mirrorkeep::reconcile::{ReconcileError, ReconcileOutcome};

#[tokio::test]
async fn test_first_pass_creates_mirror() {
    let fixture = Fixture::new();
    let upstream = fixture.create_upstream("widgets");

    let lister =
        StaticLister::new().with_repos("alice", vec![remote("acme/widgets", &upstream)]);
    let engine = engine(&fixture, vec![account("alice")], lister);

    let summary = engine.run_all().await;

    assert_eq!(summary.total_repositories, 1);
    assert_eq!(summary.created, 1);
    assert_eq!(summary.failed, 0);
    assert!(!summary.has_failures());

    assert_eq!(summary.results[0].full_name, "acme/widgets");
    assert_eq!(
        summary.results[0].path.as_deref(),
        Some(fixture.mirror_root().join("acme").join("widgets").as_path())
    );
    assert!(matches!(
        summary.results[0].outcome,
        ReconcileOutcome::Created
    ));

    // The mirror lives at the deterministic path and is a bare repository
    let mirror = fixture.mirror_root().join("acme").join("widgets");
    assert!(mirror.is_dir());
    let bare = common::git(&mirror, &["rev-parse", "--is-bare-repository"]);
    assert_eq!(bare.trim(), "true");
}

#[tokio::test]
async fn test_second_pass_is_up_to_date_and_idempotent() {
    let fixture = Fixture::new();
    let upstream = fixture.create_upstream("widgets");

    let lister =
        StaticLister::new().with_repos("alice", vec![remote("acme/widgets", &upstream)]);
    let engine = engine(&fixture, vec![account("alice")], lister);

    let first = engine.run_all().await;
    assert_eq!(first.created, 1);

    let mirror = fixture.mirror_root().join("acme").join("widgets");
    let refs_before = refs_snapshot(&mirror);

    let second = engine.run_all().await;

    assert_eq!(second.up_to_date, 1);
    assert_eq!(second.created, 0);
    assert_eq!(second.failed, 0);
    assert!(matches!(
        second.results[0].outcome,
        ReconcileOutcome::UpToDate
    ));

    // No remote change means no local change
    assert_eq!(refs_snapshot(&mirror), refs_before);
}

#[tokio::test]
async fn test_upstream_change_refreshes_mirror() {
    let fixture = Fixture::new();
    let upstream = fixture.create_upstream("widgets");

    let lister =
        StaticLister::new().with_repos("alice", vec![remote("acme/widgets", &upstream)]);
    let engine = engine(&fixture, vec![account("alice")], lister);

    engine.run_all().await;
    fixture.add_commit(&upstream, "feature.txt");

    let summary = engine.run_all().await;

    assert_eq!(summary.refreshed, 1);
    assert!(matches!(
        summary.results[0].outcome,
        ReconcileOutcome::Refreshed
    ));

    // The mirror's head now matches the upstream's
    let mirror = fixture.mirror_root().join("acme").join("widgets");
    let upstream_head = common::git(&upstream, &["rev-parse", "HEAD"]);
    let mirror_head = common::git(&mirror, &["rev-parse", "HEAD"]);
    assert_eq!(mirror_head, upstream_head);
}

#[tokio::test]
async fn test_degenerate_directory_is_reported_and_untouched() {
    let fixture = Fixture::new();
    let upstream = fixture.create_upstream("widgets");

    // Something that exists but is not a repository
    let mirror = fixture.mirror_root().join("acme").join("widgets");
    std::fs::create_dir_all(&mirror).unwrap();
    std::fs::write(mirror.join("leftover.txt"), "interrupted write").unwrap();

    let lister =
        StaticLister::new().with_repos("alice", vec![remote("acme/widgets", &upstream)]);
    let engine = engine(&fixture, vec![account("alice")], lister);

    let summary = engine.run_all().await;

    assert_eq!(summary.failed, 1);
    assert!(matches!(
        summary.results[0].outcome,
        ReconcileOutcome::Failed(ReconcileError::DegenerateMirror { .. })
    ));

    // No repair, no deletion
    assert!(mirror.join("leftover.txt").is_file());
}

#[tokio::test]
async fn test_failing_repository_does_not_affect_siblings() {
    let fixture = Fixture::new();
    let upstream = fixture.create_upstream("widgets");
    let missing = fixture.temp_dir.path().join("upstreams").join("ghost");

    let lister = StaticLister::new().with_repos(
        "alice",
        vec![
            remote("acme/widgets", &upstream),
            remote("acme/ghost", &missing),
        ],
    );
    let engine = engine(&fixture, vec![account("alice")], lister);

    let summary = engine.run_all().await;

    assert_eq!(summary.total_repositories, 2);
    assert_eq!(summary.created, 1);
    assert_eq!(summary.failed, 1);

    let widgets = summary
        .results
        .iter()
        .find(|r| r.full_name == "acme/widgets")
        .unwrap();
    assert!(matches!(widgets.outcome, ReconcileOutcome::Created));

    let ghost = summary
        .results
        .iter()
        .find(|r| r.full_name == "acme/ghost")
        .unwrap();
    assert!(matches!(
        ghost.outcome,
        ReconcileOutcome::Failed(ReconcileError::Clone { .. })
    ));

    assert!(fixture.mirror_root().join("acme").join("widgets").is_dir());
}

#[tokio::test]
async fn test_failing_account_does_not_affect_siblings() {
    let fixture = Fixture::new();
    let upstream = fixture.create_upstream("tools");

    let lister = StaticLister::new()
        .with_failure("alice")
        .with_repos("bob", vec![remote("bob/tools", &upstream)]);
    let engine = engine(&fixture, vec![account("alice"), account("bob")], lister);

    let summary = engine.run_all().await;

    // Alice's listing failure is attributed and confined to her account
    assert_eq!(summary.listing_failures.len(), 1);
    assert_eq!(summary.listing_failures[0].account(), "alice");
    assert!(summary.has_failures());

    // Bob's repositories were still fully reconciled
    assert_eq!(summary.created, 1);
    assert!(fixture.mirror_root().join("bob").join("tools").is_dir());
}

#[tokio::test]
async fn test_many_repositories_reconcile_concurrently() {
    let fixture = Fixture::new();

    let repos: Vec<_> = (0..6)
        .map(|i| {
            let name = format!("repo-{}", i);
            let upstream = fixture.create_upstream(&name);
            remote(&format!("acme/{}", name), &upstream)
        })
        .collect();

    let lister = StaticLister::new().with_repos("alice", repos);
    let engine = engine(&fixture, vec![account("alice")], lister);

    let summary = engine.run_all().await;

    assert_eq!(summary.total_repositories, 6);
    assert_eq!(summary.created, 6);
    assert_eq!(summary.failed, 0);

    for i in 0..6 {
        assert!(fixture
            .mirror_root()
            .join("acme")
            .join(format!("repo-{}", i))
            .is_dir());
    }
}
