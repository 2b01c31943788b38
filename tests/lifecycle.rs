use std::time::Duration;

use chaincode_tx::{ChaincodeId, Config, EndorsementPolicy, Error};
use eyre::Result;

use net::{endorse, fabcar, init, Behaviour, Emit, Net, PackageStore, CHANNEL};

const SECOND: Duration = Duration::from_secs(1);

#[tokio::test(start_paused = true)]
async fn test_invoke_commits_when_all_peers_agree() -> Result<()> {
    init();
    let net = Net::new(
        [endorse("moved"), endorse("moved"), endorse("moved")],
        Emit::Valid(SECOND),
    );
    let lifecycle = net.lifecycle();

    let event = lifecycle
        .try_invoke(fabcar(), "move", &["a", "b", "10"])
        .await?;
    assert!(event.is_valid);

    let submissions = net.orderer.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].tx_id, event.tx_id);
    assert_eq!(submissions[0].endorsements.len(), 3);
    assert_eq!(net.peer_calls(), vec![1, 1, 1]);
    assert_eq!(net.hub.pending(), 0);

    assert!(lifecycle.invoke(fabcar(), "move", &["a", "b", "10"]).await);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_invoke_divergent_endorsement_is_never_submitted() {
    init();
    let net = Net::new(
        [endorse("moved"), endorse("moved"), endorse("forked")],
        Emit::Valid(SECOND),
    );
    let lifecycle = net.lifecycle();

    let res = lifecycle.try_invoke(fabcar(), "move", &["a", "b", "10"]).await;
    assert!(matches!(res, Err(Error::EndorsementMismatch { sets: 2 })));
    assert!(net.orderer.submissions().is_empty());
    assert!(!lifecycle.invoke(fabcar(), "move", &["a", "b", "10"]).await);
}

#[tokio::test(start_paused = true)]
async fn test_invoke_single_rejection_aborts() {
    init();
    let net = Net::new(
        [
            endorse("moved"),
            Behaviour::Reject("chaincode error: insufficient funds".to_string()),
            endorse("forked"),
        ],
        Emit::Valid(SECOND),
    );
    let lifecycle = net.lifecycle();

    // rejection takes precedence, the mismatching third peer is never looked at
    let res = lifecycle.try_invoke(fabcar(), "move", &["a", "b", "10"]).await;
    match res {
        Err(Error::ProposalRejected { message }) => {
            assert_eq!(message, "chaincode error: insufficient funds")
        }
        other => panic!("unexpected result {other:?}"),
    }
    assert!(net.orderer.submissions().is_empty());
    assert_eq!(net.peer_calls(), vec![1, 1, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_peer_is_a_rejection() {
    init();
    let net = Net::new(
        [
            endorse("moved"),
            endorse("moved"),
            Behaviour::Unreachable("connection refused".to_string()),
        ],
        Emit::Valid(SECOND),
    );

    let res = net.lifecycle().try_invoke(fabcar(), "move", &["a"]).await;
    assert!(matches!(
        res,
        Err(Error::ProposalRejected { message }) if message.contains("connection refused")
    ));
    assert!(net.orderer.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_invoke_times_out_without_commit_event() {
    init();
    let net = Net::new(
        [endorse("moved"), endorse("moved"), endorse("moved")],
        Emit::Never,
    );
    let lifecycle = net.lifecycle();
    assert_eq!(lifecycle.config().commit_timeout, Duration::from_secs(30));

    let started = tokio::time::Instant::now();
    let res = lifecycle.try_invoke(fabcar(), "move", &["a", "b", "10"]).await;
    assert!(matches!(
        &res,
        Err(Error::CommitTimeout { timeout, .. }) if *timeout == Duration::from_secs(30)
    ));
    assert!(res.err().map(|e| e.is_retryable()).unwrap_or(false));
    assert_eq!(started.elapsed(), Duration::from_secs(30));
    // submitted exactly once, never resubmitted
    assert_eq!(net.orderer.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_commit_is_a_result_not_an_error() -> Result<()> {
    init();
    let net = Net::new([endorse("moved"), endorse("moved")], Emit::Invalid(SECOND));
    let lifecycle = net.lifecycle();

    let event = lifecycle.try_invoke(fabcar(), "move", &["a", "b", "10"]).await?;
    assert!(!event.is_valid);
    assert_eq!(event.validation_code.as_deref(), Some("MVCC_READ_CONFLICT"));

    assert!(!lifecycle.invoke(fabcar(), "move", &["a", "b", "10"]).await);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_orderer_failure_fails_invoke() {
    init();
    let net = Net::new(
        [endorse("moved"), endorse("moved")],
        Emit::Fail("SERVICE_UNAVAILABLE".to_string()),
    );
    let lifecycle = net.lifecycle();

    let started = tokio::time::Instant::now();
    let res = lifecycle.try_invoke(fabcar(), "move", &["a", "b", "10"]).await;
    assert!(matches!(res, Err(Error::Transport(_))));
    assert!(started.elapsed() < lifecycle.config().commit_timeout);

    assert!(!lifecycle.invoke(fabcar(), "move", &["a", "b", "10"]).await);
    // one broadcast per proposal, never retried
    assert_eq!(net.orderer.submissions().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_commit_timeout_is_configurable() {
    init();
    let net = Net::new([endorse("moved")], Emit::Valid(Duration::from_secs(5)));
    let lifecycle = net.lifecycle_with(Config::new(CHANNEL).with_commit_timeout(SECOND));

    let res = lifecycle.try_invoke(fabcar(), "move", &["a"]).await;
    assert!(matches!(res, Err(Error::CommitTimeout { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_install_is_propose_only() -> Result<()> {
    init();
    let net = Net::new([endorse("installed"), endorse("installed")], Emit::Never);
    let lifecycle = net.lifecycle();

    let endorsements = lifecycle.try_install(fabcar(), &PackageStore).await?;
    assert_eq!(endorsements.responses().len(), 2);
    assert!(net.orderer.submissions().is_empty());
    assert!(lifecycle.install(fabcar(), &PackageStore).await);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_install_fails_if_any_peer_fails() {
    init();
    let net = Net::new(
        [endorse("installed"), Behaviour::Reject("already installed".to_string())],
        Emit::Never,
    );
    assert!(!net.lifecycle().install(fabcar(), &PackageStore).await);
}

#[tokio::test(start_paused = true)]
async fn test_instantiate_routes_through_commit() -> Result<()> {
    init();
    let net = Net::new([endorse("init"), endorse("init")], Emit::Valid(SECOND));
    let lifecycle = net.lifecycle();
    let policy = EndorsementPolicy::from_bytes("OR('Org1MSP.member')")?;

    let event = lifecycle
        .try_instantiate(fabcar(), "init", &["a", "500", "b", "200"], policy.clone())
        .await?;
    assert!(event.is_valid);
    assert_eq!(net.orderer.submissions().len(), 1);

    assert!(lifecycle.instantiate(fabcar(), "init", &["a", "500"], policy).await);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_configuration_faults_surface_before_any_peer_call() {
    init();
    let net = Net::new([endorse("moved")], Emit::Valid(SECOND));

    let unknown_channel = net.lifecycle_with(Config::new("nochannel"));
    let res = unknown_channel.try_invoke(fabcar(), "move", &["a"]).await;
    assert!(matches!(res, Err(Error::ConfigurationFault(_))));

    let res = net
        .lifecycle()
        .try_invoke(ChaincodeId::new("", "1.0"), "move", &["a"])
        .await;
    assert!(matches!(res, Err(Error::ConfigurationFault(_))));

    assert_eq!(net.peer_calls(), vec![0]);
    assert!(net.orderer.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_empty_channel_is_a_configuration_fault() {
    init();
    let net = Net::new(Vec::<Behaviour>::new(), Emit::Valid(SECOND));
    let res = net.lifecycle().try_invoke(fabcar(), "move", &["a"]).await;
    assert!(matches!(res, Err(Error::ConfigurationFault(_))));
    assert!(net.orderer.submissions().is_empty());
}
