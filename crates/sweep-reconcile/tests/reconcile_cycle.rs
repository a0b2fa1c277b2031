//! Single-cycle behaviour: gating, filtering, pagination, and removal.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use common::*;
use sweep_cluster::{ClusterError, RemovalError};
use sweep_core::{ManagedTypes, NodeIdentity, Settings, UpgradeState};
use sweep_health::{HealthBoard, Severity};
use sweep_reconcile::*;

fn settings(managed: &str) -> Settings {
    Settings {
        scan_interval: Duration::from_secs(60),
        operation_timeout: Duration::from_secs(30),
        down_grace_interval: Duration::from_secs(120),
        skip_during_upgrade: true,
        managed_types: ManagedTypes::parse(managed),
    }
}

fn reconciler(cluster: &Arc<FakeCluster>, board: &Arc<HealthBoard>, settings: Settings) -> Reconciler {
    Reconciler::new(
        settings,
        cluster.clone(),
        board.clone(),
        Arc::new(NodeIdentity::new("system")),
    )
    .with_clock(fixed_clock)
}

fn removed(summary: &CycleSummary) -> Vec<(String, RemovalOutcome)> {
    match summary {
        CycleSummary::Completed { removals } => removals
            .iter()
            .map(|r| (r.node.clone(), r.outcome.clone()))
            .collect(),
        other => panic!("expected completed cycle, got {other:?}"),
    }
}

#[tokio::test]
async fn removes_only_eligible_nodes() {
    let cluster = Arc::new(FakeCluster::with_nodes(vec![
        down("worker_0", "worker", 600),
        down("worker_1", "Worker", 121),
        down("worker_2", "worker", 120),
        up("worker_3", "worker"),
        down("gpu_0", "gpu", 600),
        down("system_0", "system", 600),
    ]));
    let board = Arc::new(HealthBoard::new());
    let r = reconciler(&cluster, &board, settings("worker, system"));
    let (_tx, mut rx) = watch::channel(false);

    let summary = r.run_cycle(&mut rx).await.unwrap();

    assert_eq!(
        removed(&summary),
        vec![
            ("worker_0".to_string(), RemovalOutcome::Succeeded),
            ("worker_1".to_string(), RemovalOutcome::Succeeded),
        ]
    );
    assert_eq!(cluster.removal_calls(), vec!["worker_0", "worker_1"]);

    let scan = board.get(HEALTH_SOURCE, "Scan").unwrap();
    assert_eq!(scan.severity, Severity::Ok);
    assert!(scan.description.contains("Found 2 nodes"));
    assert_eq!(board.get(HEALTH_SOURCE, "worker_0").unwrap().severity, Severity::Ok);
    assert!(board.get(HEALTH_SOURCE, "system_0").is_none());
}

#[tokio::test]
async fn pagination_matches_unpaginated_result() {
    let pages = vec![
        vec![down("a", "worker", 500), up("b", "worker")],
        vec![down("c", "worker", 10), down("d", "worker", 900)],
        vec![],
        vec![down("d", "worker", 900), down("e", "batch", 300), down("f", "system", 900)],
    ];
    let flat: Vec<_> = pages.iter().flatten().cloned().collect();
    let managed = ManagedTypes::parse("worker,batch");
    let grace = Duration::from_secs(120);

    let expected: BTreeSet<String> = flat
        .iter()
        .filter(|n| is_eligible(n, "system", &managed, grace, NOW))
        .map(|n| n.name.clone())
        .collect();

    let cluster = Arc::new(FakeCluster::with_pages(pages));
    let filter = NodeFilter::new(cluster.clone(), Duration::from_secs(30));
    let (_tx, mut rx) = watch::channel(false);

    let eligible = filter
        .select_eligible("system", &managed, grace, NOW, &mut rx)
        .await
        .unwrap();
    let names: Vec<String> = eligible.iter().map(|n| n.name.clone()).collect();

    assert_eq!(names, vec!["a", "d", "e"]);
    assert_eq!(names.iter().cloned().collect::<BTreeSet<_>>(), expected);
    assert_eq!(cluster.membership_calls(), 4);
    assert_eq!(
        cluster.calls()[1],
        Call::Membership(Some("page-1".to_string()))
    );
}

#[tokio::test]
async fn failed_removal_does_not_stop_batch() {
    let cluster = Arc::new(FakeCluster::with_nodes(vec![
        down("worker_0", "worker", 600),
        down("worker_1", "worker", 600),
        down("worker_2", "worker", 600),
    ]));
    cluster.fail_removal("worker_1", RemovalError::Transport("connection reset".into()));
    let board = Arc::new(HealthBoard::new());
    let r = reconciler(&cluster, &board, settings("worker"));
    let (_tx, mut rx) = watch::channel(false);

    let summary = r.run_cycle(&mut rx).await.unwrap();
    let outcomes = removed(&summary);

    assert_eq!(cluster.removal_calls().len(), 3);
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].1, RemovalOutcome::Succeeded);
    assert!(outcomes[1].1.is_failure());
    assert_eq!(outcomes[2].1, RemovalOutcome::Succeeded);

    let warning = board.get(HEALTH_SOURCE, "worker_1").unwrap();
    assert_eq!(warning.severity, Severity::Warning);
    assert!(warning.description.contains("connection reset"));
    assert_eq!(board.warning_count(), 1);
}

#[tokio::test]
async fn missing_record_is_reported_as_already_removed() {
    let cluster = Arc::new(FakeCluster::with_nodes(vec![down("worker_0", "worker", 600)]));
    cluster.fail_removal("worker_0", RemovalError::NotFound("worker_0".into()));
    let board = Arc::new(HealthBoard::new());
    let r = reconciler(&cluster, &board, settings("worker"));
    let (_tx, mut rx) = watch::channel(false);

    let summary = r.run_cycle(&mut rx).await.unwrap();

    assert_eq!(
        removed(&summary),
        vec![("worker_0".to_string(), RemovalOutcome::AlreadyRemoved)]
    );
    assert_eq!(board.get(HEALTH_SOURCE, "worker_0").unwrap().severity, Severity::Ok);
}

#[tokio::test]
async fn rolling_upgrade_defers_all_removals() {
    let cluster = Arc::new(FakeCluster::with_nodes(vec![down("worker_0", "worker", 600)]));
    cluster.set_upgrade(Ok(UpgradeState::RollingForwardInProgress));
    let board = Arc::new(HealthBoard::new());
    let r = reconciler(&cluster, &board, settings("worker"));
    let (_tx, mut rx) = watch::channel(false);

    let summary = r.run_cycle(&mut rx).await.unwrap();

    assert_eq!(summary, CycleSummary::DeferredForUpgrade);
    assert!(cluster.removal_calls().is_empty());
    assert_eq!(cluster.membership_calls(), 0);
    assert_eq!(
        board.get(HEALTH_SOURCE, "FabricUpgrade").unwrap().severity,
        Severity::Ok
    );
}

#[tokio::test]
async fn idle_upgrade_state_allows_removal() {
    let cluster = Arc::new(FakeCluster::with_nodes(vec![down("worker_0", "worker", 600)]));
    cluster.set_upgrade(Ok(UpgradeState::Other));
    let board = Arc::new(HealthBoard::new());
    let r = reconciler(&cluster, &board, settings("worker"));
    let (_tx, mut rx) = watch::channel(false);

    r.run_cycle(&mut rx).await.unwrap();

    assert_eq!(cluster.upgrade_calls(), 1);
    assert_eq!(cluster.removal_calls(), vec!["worker_0"]);
}

#[tokio::test]
async fn disabled_guard_skips_upgrade_query() {
    let cluster = Arc::new(FakeCluster::with_nodes(vec![down("worker_0", "worker", 600)]));
    cluster.set_upgrade(Ok(UpgradeState::RollingBackInProgress));
    let board = Arc::new(HealthBoard::new());
    let mut s = settings("worker");
    s.skip_during_upgrade = false;
    let r = reconciler(&cluster, &board, s);
    let (_tx, mut rx) = watch::channel(false);

    r.run_cycle(&mut rx).await.unwrap();

    assert_eq!(cluster.upgrade_calls(), 0);
    assert_eq!(cluster.removal_calls(), vec!["worker_0"]);
}

#[tokio::test]
async fn upgrade_query_failure_aborts_cycle() {
    let cluster = Arc::new(FakeCluster::with_nodes(vec![down("worker_0", "worker", 600)]));
    cluster.set_upgrade(Err(ClusterError::Transport("unreachable".into())));
    let board = Arc::new(HealthBoard::new());
    let r = reconciler(&cluster, &board, settings("worker"));
    let (_tx, mut rx) = watch::channel(false);

    let err = r.run_cycle(&mut rx).await.unwrap_err();

    assert_eq!(
        err,
        CycleError::UpgradeState(ClusterError::Transport("unreachable".into()))
    );
    assert_eq!(cluster.membership_calls(), 0);
    assert!(cluster.removal_calls().is_empty());
}

#[tokio::test]
async fn membership_failure_aborts_cycle_before_removal() {
    let cluster = Arc::new(FakeCluster::with_nodes(vec![down("worker_0", "worker", 600)]));
    cluster.fail_membership(ClusterError::Transport("reset".into()));
    let board = Arc::new(HealthBoard::new());
    let r = reconciler(&cluster, &board, settings("worker"));
    let (_tx, mut rx) = watch::channel(false);

    let err = r.run_cycle(&mut rx).await.unwrap_err();

    assert!(matches!(err, CycleError::Membership(_)));
    assert!(cluster.removal_calls().is_empty());
    assert!(board.get(HEALTH_SOURCE, "Scan").is_none());
}

#[tokio::test(start_paused = true)]
async fn hung_upgrade_query_times_out() {
    let cluster = Arc::new(FakeCluster::with_nodes(vec![]));
    cluster.hang_upgrade();
    let board = Arc::new(HealthBoard::new());
    let r = reconciler(&cluster, &board, settings("worker"));
    let (_tx, mut rx) = watch::channel(false);

    let err = r.run_cycle(&mut rx).await.unwrap_err();

    assert_eq!(
        err,
        CycleError::UpgradeState(ClusterError::Timeout(Duration::from_secs(30)))
    );
}

#[tokio::test(start_paused = true)]
async fn hung_removals_time_out_individually() {
    let cluster = Arc::new(FakeCluster::with_nodes(vec![
        down("worker_0", "worker", 600),
        down("worker_1", "worker", 600),
    ]));
    cluster.hang_removal();
    let board = Arc::new(HealthBoard::new());
    let r = reconciler(&cluster, &board, settings("worker"));
    let (_tx, mut rx) = watch::channel(false);

    let summary = r.run_cycle(&mut rx).await.unwrap();
    let outcomes = removed(&summary);

    assert_eq!(outcomes.len(), 2);
    for (_, outcome) in outcomes {
        assert_eq!(
            outcome,
            RemovalOutcome::Failed(RemovalError::Timeout(Duration::from_secs(30)))
        );
    }
    assert_eq!(board.warning_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_removal_batch() {
    let cluster = Arc::new(FakeCluster::with_nodes(vec![
        down("worker_0", "worker", 600),
        down("worker_1", "worker", 600),
    ]));
    cluster.hang_removal();
    let board = Arc::new(HealthBoard::new());
    let r = reconciler(&cluster, &board, settings("worker"));
    let (tx, mut rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let _ = tx.send(true);
    });

    let err = r.run_cycle(&mut rx).await.unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(cluster.removal_calls(), vec!["worker_0"]);
    assert_eq!(r.state(), LoopState::Removing);
}

#[tokio::test]
async fn empty_managed_types_warns_and_skips() {
    let cluster = Arc::new(FakeCluster::with_nodes(vec![down("worker_0", "worker", 600)]));
    let board = Arc::new(HealthBoard::new());
    let r = reconciler(&cluster, &board, settings(" , "));
    let (_tx, mut rx) = watch::channel(false);

    let summary = r.tick(&mut rx).await.unwrap();

    assert_eq!(summary, CycleSummary::Misconfigured);
    assert!(cluster.calls().is_empty());
    let warning = board.get(HEALTH_SOURCE, "NodeManagerSettings").unwrap();
    assert_eq!(warning.severity, Severity::Warning);
    assert_eq!(warning.ttl, Duration::from_secs(60));
    assert!(warning.description.contains("NodeTypesToManage"));
}
