use ism_config::{ModuleConfig, ModuleKind, MultisigConfig, RootMode};
use ism_deploy::{
    CancellationHandle, DeployError, DeploymentCache, DeploymentExecutor, DeploymentSession,
    EngineConfig, ProviderError,
};
use ism_test_utils::{
    addrs, aggregation, aggregation_scenario, multisig, test1, RecordingDeployer, TEST1_DOMAIN,
};
use std::time::Duration;

const STEP: Duration = Duration::from_millis(50);

fn wide_aggregation(members: u8) -> ModuleConfig {
    aggregation((1..=members).map(|n| multisig(&[n], 1)).collect(), 1)
}

#[tokio::test(start_paused = true)]
async fn concurrency_is_bounded() {
    let cache = DeploymentCache::new();
    let deployer = RecordingDeployer::new().with_delay(STEP);
    let config = EngineConfig::default().with_max_concurrent_deployments(3);

    let result = DeploymentSession::new(&cache, &deployer)
        .with_config(config)
        .run(&wide_aggregation(6), &test1())
        .await
        .unwrap();

    assert_eq!(result.deploy_calls, 7);
    assert_eq!(deployer.max_in_flight(), 3);
}

#[tokio::test(start_paused = true)]
async fn single_slot_follows_plan_order() {
    let cache = DeploymentCache::new();
    let deployer = RecordingDeployer::new().with_delay(STEP);
    let root = wide_aggregation(4);
    let plan = ism_planner::plan(&root, TEST1_DOMAIN).unwrap();

    DeploymentExecutor::new(&cache, &deployer)
        .execute(&plan, &test1())
        .await
        .unwrap();

    assert_eq!(deployer.max_in_flight(), 1);
    let called: Vec<ModuleKind> = deployer.calls().iter().map(|c| c.kind).collect();
    let planned: Vec<ModuleKind> = plan.steps().iter().map(|s| s.kind()).collect();
    assert_eq!(called, planned);
}

#[tokio::test(start_paused = true)]
async fn concurrent_sessions_deploy_each_node_once() {
    let cache = DeploymentCache::new();
    let deployer = RecordingDeployer::new().with_delay(STEP);
    let root = aggregation_scenario();
    let chain = test1();

    let one = DeploymentSession::new(&cache, &deployer);
    let two = DeploymentSession::new(&cache, &deployer);
    let (a, b) = tokio::join!(one.run(&root, &chain), two.run(&root, &chain));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(deployer.call_count(), 3);
    assert_eq!(a.root_address, b.root_address);
    assert_eq!(a.deploy_calls + b.deploy_calls, 3);
    assert_eq!(a.reused() + b.reused(), 3);
}

#[tokio::test(start_paused = true)]
async fn slow_deployments_time_out() {
    let cache = DeploymentCache::new();
    let deployer = RecordingDeployer::new().with_delay(STEP * 4);
    let plan = ism_planner::plan(&multisig(&[1, 2], 2), TEST1_DOMAIN).unwrap();

    let err = DeploymentExecutor::new(&cache, &deployer)
        .with_timeout(STEP)
        .execute(&plan, &test1())
        .await
        .unwrap_err();

    match err {
        DeployError::NodeFailed { cause, .. } => assert_eq!(cause, ProviderError::Timeout(STEP)),
        other => panic!("unexpected error: {other}"),
    }
    assert!(cache.is_empty());

    deployer.set_delay(None);
    DeploymentExecutor::new(&cache, &deployer)
        .with_timeout(STEP)
        .execute(&plan, &test1())
        .await
        .unwrap();
    assert_eq!(cache.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_drains_in_flight_calls() {
    let cache = DeploymentCache::new();
    let deployer = RecordingDeployer::new().with_delay(STEP);
    let cancel = CancellationHandle::new();
    let plan = ism_planner::plan(&aggregation_scenario(), TEST1_DOMAIN).unwrap();
    let executor = DeploymentExecutor::new(&cache, &deployer).with_cancellation(cancel.clone());
    let chain = test1();

    let (outcome, ()) = tokio::join!(executor.execute(&plan, &chain), async {
        // Second member is in flight at this point.
        tokio::time::sleep(STEP + STEP / 2).await;
        cancel.cancel();
    });

    assert!(matches!(outcome, Err(DeployError::Cancelled { completed: 2 })));
    assert_eq!(deployer.call_count(), 2);
    assert_eq!(deployer.calls_for(ModuleKind::Aggregation), 0);
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn cancelled_session_starts_nothing() {
    let cache = DeploymentCache::new();
    let deployer = RecordingDeployer::new();
    let cancel = CancellationHandle::new();
    cancel.cancel();

    let err = DeploymentSession::new(&cache, &deployer)
        .with_cancellation(cancel)
        .run(&aggregation_scenario(), &test1())
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::Cancelled { completed: 0 }));
    assert!(err.is_retryable());
    assert_eq!(deployer.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn failure_stops_new_steps_but_keeps_finished_ones() {
    let cache = DeploymentCache::new();
    let deployer = RecordingDeployer::new().with_delay(STEP);
    deployer.fail_kind(
        ModuleKind::MerkleRootMultisig,
        ProviderError::Rejected("out of gas".into()),
    );
    let merkle: ModuleConfig = MultisigConfig::new(addrs(&[1, 2]), 1, RootMode::MerkleRoot)
        .unwrap()
        .into();
    let root = aggregation(vec![merkle, multisig(&[3], 1)], 1);
    let config = EngineConfig::default().with_max_concurrent_deployments(2);

    let err = DeploymentSession::new(&cache, &deployer)
        .with_config(config)
        .run(&root, &test1())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DeployError::NodeFailed {
            kind: ModuleKind::MerkleRootMultisig,
            ..
        }
    ));
    assert_eq!(deployer.calls_for(ModuleKind::Aggregation), 0);
    assert_eq!(deployer.calls_for(ModuleKind::MessageIdMultisig), 1);
    assert_eq!(cache.len(), 1);
}
