//! Behavioural tests for `volumes smarter_delete` against a scripted array.

use flashctl::ArrayError;
use flashctl::test_support::{ArrayCall, ScriptedArray, connection};
use flashctl::volumes::{TeardownSummary, smarter_delete};
use rstest::{fixture, rstest};

const VOLUME: &str = "vol-a";

#[fixture]
fn array() -> ScriptedArray {
    let array = ScriptedArray::new();
    array.set_volume_connections(vec![
        connection("esx-01", VOLUME, 1),
        connection("esx-02", VOLUME, 1),
        connection("esx-03", "vol-other", 2),
    ]);
    array
}

fn listed_then(steps: &[ArrayCall]) -> Vec<ArrayCall> {
    let mut calls = vec![ArrayCall::ListVolumeConnections(VOLUME.to_owned())];
    calls.extend_from_slice(steps);
    calls
}

fn destroy() -> ArrayCall {
    ArrayCall::DestroyVolume(VOLUME.to_owned())
}

fn eradicate() -> ArrayCall {
    ArrayCall::EradicateVolume(VOLUME.to_owned())
}

#[rstest]
#[tokio::test]
async fn disconnects_every_host_before_destroying(array: ScriptedArray) {
    let summary = smarter_delete(&array, VOLUME).await.expect("teardown");

    assert_eq!(
        summary,
        TeardownSummary {
            disconnected: vec![String::from("esx-01"), String::from("esx-02")],
            ..TeardownSummary::default()
        }
    );
    assert_eq!(
        array.calls(),
        listed_then(&[
            ArrayCall::disconnect("esx-01", VOLUME),
            ArrayCall::disconnect("esx-02", VOLUME),
            destroy(),
            eradicate(),
        ])
    );
}

#[tokio::test]
async fn volume_without_hosts_skips_disconnects() {
    let array = ScriptedArray::new();

    let summary = smarter_delete(&array, VOLUME).await.expect("teardown");

    assert!(summary.disconnected.is_empty());
    assert_eq!(array.calls(), listed_then(&[destroy(), eradicate()]));
}

#[rstest]
#[tokio::test]
async fn already_disconnected_host_is_not_an_error(array: ScriptedArray) {
    array.fail_on(
        ArrayCall::disconnect("esx-01", VOLUME),
        ArrayError::api(400, "Host esx-01 is not connected to volume vol-a."),
    );

    let summary = smarter_delete(&array, VOLUME).await.expect("teardown");

    assert_eq!(summary.already_disconnected, [String::from("esx-01")]);
    assert_eq!(summary.disconnected, [String::from("esx-02")]);
    assert!(array.calls().contains(&eradicate()));
}

#[rstest]
#[case::forbidden(ArrayError::api(403, "Insufficient privileges."))]
#[case::other_bad_request(ArrayError::api(400, "Volume is protected."))]
#[case::transport(ArrayError::Transport {
    target: String::from("array01"),
    message: String::from("connection reset"),
})]
#[tokio::test]
async fn other_disconnect_failures_abort_before_destroy(
    array: ScriptedArray,
    #[case] failure: ArrayError,
) {
    array.fail_on(ArrayCall::disconnect("esx-01", VOLUME), failure.clone());

    let err = smarter_delete(&array, VOLUME)
        .await
        .expect_err("teardown should stop");

    assert_eq!(err, failure);
    assert_eq!(
        array.calls(),
        listed_then(&[ArrayCall::disconnect("esx-01", VOLUME)])
    );
}

#[rstest]
#[case::missing("Volume does not exist.")]
#[case::destroyed("Volume has been destroyed.")]
#[tokio::test]
async fn destroy_of_missing_volume_still_eradicates(array: ScriptedArray, #[case] message: &str) {
    array.fail_on(destroy(), ArrayError::api(400, message));

    let summary = smarter_delete(&array, VOLUME).await.expect("teardown");

    assert!(summary.destroy_skipped);
    assert!(!summary.eradicate_skipped);
    assert_eq!(array.calls().last(), Some(&eradicate()));
}

#[rstest]
#[tokio::test]
async fn eradicate_of_missing_volume_succeeds(array: ScriptedArray) {
    array.fail_on(eradicate(), ArrayError::api(400, "Volume does not exist."));

    let summary = smarter_delete(&array, VOLUME).await.expect("teardown");

    assert!(summary.eradicate_skipped);
    assert!(!summary.destroy_skipped);
}

#[rstest]
#[case::destroy_forbidden(destroy(), ArrayError::api(403, "Volume does not exist."))]
#[case::eradicate_unrelated(eradicate(), ArrayError::api(400, "Volume is pending replication."))]
#[tokio::test]
async fn unrelated_removal_failures_propagate(
    array: ScriptedArray,
    #[case] step: ArrayCall,
    #[case] failure: ArrayError,
) {
    array.fail_on(step, failure.clone());

    let err = smarter_delete(&array, VOLUME)
        .await
        .expect_err("teardown should fail");

    assert_eq!(err, failure);
}

#[tokio::test]
async fn failed_connection_listing_touches_nothing() {
    let array = ScriptedArray::new();
    array.fail_on(
        ArrayCall::ListVolumeConnections(VOLUME.to_owned()),
        ArrayError::api(400, "Volume does not exist."),
    );

    let err = smarter_delete(&array, VOLUME)
        .await
        .expect_err("listing failure should propagate");

    assert!(matches!(err, ArrayError::Api { status: 400, .. }));
    assert_eq!(array.calls(), listed_then(&[]));
}
