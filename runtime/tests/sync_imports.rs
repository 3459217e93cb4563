//! Synchronous bridge paths: argument passing, the `log`, `now` and
//! `random` imports, and early resolution before the guest call returns.

mod common;

use gangplank_hostapi::Timestamp;

#[tokio::test]
async fn test_argument_round_trip() {
    let (mut runtime, _stub) = common::load_runtime();
    let greeting: Option<String> = runtime
        .invoke("greet", &[common::encode(&"hi")])
        .await
        .unwrap();
    assert_eq!(greeting.as_deref(), Some("done"));
    assert_eq!(runtime.pending_calls(), 0);
}

#[tokio::test]
async fn test_log_delivers_decoded_string() {
    let (mut runtime, stub) = common::load_runtime();
    let result: Option<()> = runtime.invoke("shout", &[]).await.unwrap();
    assert_eq!(result, Some(()));
    assert_eq!(stub.logs(), vec!["ahoy".to_string()]);
}

#[tokio::test]
async fn test_now_answers_before_the_call_returns() {
    let (mut runtime, _stub) = common::load_runtime();
    let stamp: Option<Timestamp> = runtime.invoke("stamp", &[]).await.unwrap();
    assert_eq!(stamp, Some(Timestamp(1_700_000_000_000)));
}

#[tokio::test]
async fn test_random_answers_requested_length() {
    let (mut runtime, _stub) = common::load_runtime();
    let bytes: Option<Vec<u8>> = runtime.invoke("roll", &[]).await.unwrap();
    assert_eq!(bytes, Some(vec![0, 1, 2, 3, 4, 5, 6, 7]));
}

#[test]
fn test_early_resolution_is_buffered() {
    let (mut runtime, _stub) = common::load_runtime();

    // The guest resolves its own placeholder before returning; the
    // resolution must be held until registration and still reach the
    // awaitable, leaving no entry behind.
    let mut pending = runtime.invoke_raw("greet", &[common::encode(&"hi")]).unwrap().unwrap();
    let payload = pending.try_take().unwrap().expect("already resolved");
    let greeting: String = gangplank_runtime::codec::decode(&payload).unwrap();
    assert_eq!(greeting, "done");
    assert_eq!(runtime.pending_calls(), 0);
}

#[tokio::test]
async fn test_sync_imports_leave_no_pending_entries() {
    let (mut runtime, _stub) = common::load_runtime();
    let _: Option<Timestamp> = runtime.invoke("stamp", &[]).await.unwrap();
    let _: Option<Vec<u8>> = runtime.invoke("roll", &[]).await.unwrap();
    assert_eq!(runtime.pending_calls(), 0);
}
